use crate::error::{RegistryError, Result};

/// Remove every whitespace character from `input`.
///
/// Prompts are read a whole line at a time, so this drops the trailing
/// newline as well as any spaces the user typed inside a value.
pub fn strip_whitespace(input: &str) -> String {
    input.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Normalize a name typed at a prompt. `field` names the value in the error.
pub fn normalize_name(field: &str, input: &str) -> Result<String> {
    let name = strip_whitespace(input);
    if name.is_empty() {
        return Err(RegistryError::Validation(format!(
            "Please input a valid {field}"
        )));
    }
    Ok(name)
}

/// Parse an age typed at a prompt. Negative and non-numeric input is rejected.
pub fn parse_age(input: &str) -> Result<u32> {
    let age = strip_whitespace(input);
    age.parse::<u32>().map_err(|_| {
        RegistryError::Validation(format!("Please input a valid age, got '{age}'"))
    })
}

/// Parse a student ID typed at a prompt. IDs start at 1.
pub fn parse_id(input: &str) -> Result<u32> {
    let id = strip_whitespace(input);
    match id.parse::<u32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(RegistryError::Validation(format!(
            "Please input a valid ID number, got '{id}'"
        ))),
    }
}

/// Store-side name check. The value is trimmed first and must then be
/// non-empty and free of inner whitespace, which the record format cannot
/// represent.
pub fn check_name<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::Validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(RegistryError::Validation(format!(
            "{field} '{trimmed}' must not contain whitespace"
        )));
    }
    Ok(trimmed)
}
