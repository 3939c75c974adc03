use std::{fmt::Display, str::FromStr};

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parse a numeric setting. Missing values yield `Ok(None)`, so that the caller can decide on the default. Invalid
/// values return the parser's error message.
pub fn parse_number<T>(value: Option<String>) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: Display,
{
    match value {
        None => Ok(None),
        Some(s) => s.trim().parse::<T>().map(Some).map_err(|e| format!("'{s}' is not a valid number. {e}")),
    }
}
