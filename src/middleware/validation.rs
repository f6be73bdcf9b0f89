use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::error::{AppError, AppResult};

/// Decode and validate an optional JSON body.
/// Only an empty body falls back to `T::default()`; anything that fails to
/// parse is rejected.
pub fn parse_optional_json<T>(body: &[u8]) -> AppResult<T>
where
    T: DeserializeOwned + Default + Validate,
{
    let value = if body.iter().all(u8::is_ascii_whitespace) {
        T::default()
    } else {
        serde_json::from_slice(body)
            .map_err(|e| AppError::InvalidInput(format!("Invalid JSON: {}", e)))?
    };

    validate_request(&value)?;
    Ok(value)
}

/// Run `validator` rules and fold field errors into one `InvalidInput` message
pub fn validate_request<T: Validate>(value: &T) -> AppResult<()> {
    value
        .validate()
        .map_err(|e| AppError::InvalidInput(format!("Validation failed: {}", describe(&e))))
}

fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errors)| {
            let messages: Vec<String> = errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            format!("{}: {}", field, messages.join(", "))
        })
        .collect();
    fields.sort();
    fields.join("; ")
}
