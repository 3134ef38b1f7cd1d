//! Input validation helpers.
//!
//! Each check returns `ValidationResult`: `Ok(())` or the first failure
//! message, ready to be wrapped in `AppError::Validation`.

pub mod data;
pub mod file;
pub mod string;

pub use data::{sanitize_input, validate_numeric_range, validate_required_fields, validate_string_length};
pub use file::{
    sniff_image_format, validate_file_extension, validate_file_size, validate_image_file,
    validate_mime_type,
};
pub use string::{validate_email, validate_password_strength, validate_phone_number, PasswordRules};

/// `Ok(())` or a human readable reason.
pub type ValidationResult = Result<(), String>;

