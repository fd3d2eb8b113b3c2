//! Request types for the OTP service

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::otp_record::{CodeType, CreationContext, OtpType};

/// Default code length
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Default verification attempts per code
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Input of [`super::OtpService::create`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOtpRequest {
    /// Email address or phone number, normalized by the service
    pub identifier: String,
    pub otp_type: OtpType,
    pub user_id: Option<Uuid>,
    pub length: usize,
    pub code_type: CodeType,
    pub max_attempts: u32,
    pub context: CreationContext,
    /// Deliver the code right away
    pub auto_send: bool,
}

impl CreateOtpRequest {
    pub fn new(identifier: impl Into<String>, otp_type: OtpType) -> Self {
        Self {
            identifier: identifier.into(),
            otp_type,
            user_id: None,
            length: DEFAULT_CODE_LENGTH,
            code_type: CodeType::Numeric,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            context: CreationContext::default(),
            auto_send: true,
        }
    }

    pub fn for_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_code(mut self, length: usize, code_type: CodeType) -> Self {
        self.length = length;
        self.code_type = code_type;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_context(mut self, context: CreationContext) -> Self {
        self.context = context;
        self
    }

    pub fn without_delivery(mut self) -> Self {
        self.auto_send = false;
        self
    }
}
