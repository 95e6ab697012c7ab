use crate::core::error::DothttpError;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NAME_REGEX: Regex = Regex::new(r"^[a-zA-Z_*][a-zA-Z0-9_./-]*$").unwrap();
}

pub fn validate_name(name: &str) -> Result<String, String> {
    if name.len() > 50 {
        return Err("Name must be 50 characters or less".to_string());
    }
    if !NAME_REGEX.is_match(name) {
        return Err("Name must match pattern: ^[a-zA-Z_*][a-zA-Z0-9_./-]*$".to_string());
    }
    Ok(name.to_string())
}

/// Splits `key=value` at the first `=`.
pub fn parse_property(property: &str) -> Result<(String, String), DothttpError> {
    match property.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(DothttpError::CommandLinePropMalformed(property.to_string())),
    }
}

pub fn validate_property(property: &str) -> Result<(String, String), String> {
    parse_property(property).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("prod").is_ok());
        assert!(validate_name("eu-west.staging").is_ok());
        assert!(validate_name("*").is_ok());

        assert!(validate_name("1invalid").is_err());
        assert!(validate_name("-invalid").is_err());
        assert!(validate_name("invalid name").is_err());
    }

    #[test]
    fn test_parse_property() {
        assert_eq!(
            parse_property("token=a=b").unwrap(),
            ("token".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_property("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
        assert!(matches!(
            parse_property("novalue"),
            Err(DothttpError::CommandLinePropMalformed(_))
        ));
        assert!(parse_property("=v").is_err());
    }

    #[test]
    fn test_validate_property_message() {
        assert_eq!(
            validate_property("oops").unwrap_err(),
            "command line property `oops` is malformed, expected key=value"
        );
    }
}
