//! Checks for operator- and client-supplied fields.
//!
//! Identity fields (`horseId`, `questionId`) are deliberately not validated
//! here: an unknown identity is a silent no-op, not a client error.

use crate::error::ValidationError;

/// Maximum length of a horse display name, in characters.
pub const MAX_NAME_LEN: usize = 64;

/// Maximum length of a model identifier, in characters.
pub const MAX_MODEL_LEN: usize = 128;

/// Validate a horse display name.
///
/// Rules:
/// - At most `MAX_NAME_LEN` characters (empty clears the name).
/// - No control characters.
pub fn validate_horse_name(name: &str) -> Result<(), ValidationError> {
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError(format!(
            "Horse name must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(ValidationError(
            "Horse name must not contain control characters".to_string(),
        ));
    }
    Ok(())
}

/// Validate a model identifier such as `gpt-4o` or `claude-3-5-sonnet-latest`.
///
/// Rules:
/// - At most `MAX_MODEL_LEN` characters (empty means "unassigned").
/// - Only alphanumeric, hyphen, underscore, dot, colon or slash characters.
pub fn validate_model_value(model: &str) -> Result<(), ValidationError> {
    if model.len() > MAX_MODEL_LEN {
        return Err(ValidationError(format!(
            "Model identifier must not exceed {MAX_MODEL_LEN} characters"
        )));
    }
    if !model
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '/'))
    {
        return Err(ValidationError(
            "Model identifier may only contain alphanumeric, hyphen, underscore, dot, colon or slash characters"
                .to_string(),
        ));
    }
    Ok(())
}
