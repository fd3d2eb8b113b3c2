//! Code message templates

use chrono::Duration;

use otp_core::domain::entities::OtpType;

/// Text of one code delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeMessage {
    pub subject: String,
    pub body: String,
}

impl CodeMessage {
    pub fn render(sender_name: &str, otp_type: OtpType, code: &str, expires_in: Duration) -> Self {
        Self {
            subject: format!("Your {} {}", sender_name, purpose(otp_type)),
            body: format!(
                "Your {} {} is {}. It expires in {}. Never share this code with anyone.",
                sender_name,
                purpose(otp_type),
                code,
                describe_duration(expires_in)
            ),
        }
    }
}

fn purpose(otp_type: OtpType) -> &'static str {
    match otp_type {
        OtpType::EmailVerification => "email verification code",
        OtpType::PhoneVerification => "phone verification code",
        OtpType::PasswordReset => "password reset code",
        OtpType::Login2fa => "sign-in code",
        OtpType::Transaction => "transaction confirmation code",
        OtpType::Withdrawal => "withdrawal confirmation code",
        OtpType::AccountRecovery => "account recovery code",
        OtpType::ChangeEmail => "email change code",
        OtpType::ChangePhone => "phone change code",
        OtpType::DeleteAccount => "account deletion code",
    }
}

/// Whole minutes, rounded up, or seconds below one minute
fn describe_duration(duration: Duration) -> String {
    let seconds = duration.num_seconds().max(0);
    if seconds < 60 {
        return format!("{} seconds", seconds);
    }

    let minutes = (seconds + 59) / 60;
    if minutes == 1 {
        "1 minute".to_string()
    } else {
        format!("{} minutes", minutes)
    }
}
