//! Common utility functions

pub mod identifier;

pub use identifier::{classify_identifier, mask_identifier, normalize_identifier, IdentifierKind};
