use std::path::Path;

pub const APPLICATION_JSON: &str = "application/json";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const TEXT_PLAIN: &str = "text/plain";
pub const CONTENT_TYPE: &str = "content-type";

pub fn is_json_content(content: &str) -> bool {
    let trimmed = content.trim();
    (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
}

/// Sniffs a MIME type for inline text payloads.
pub fn from_content(content: &str) -> Option<String> {
    if content.is_empty() {
        return None;
    }
    if is_json_content(content) && serde_json::from_str::<serde_json::Value>(content).is_ok() {
        Some(APPLICATION_JSON.to_string())
    } else {
        Some(TEXT_PLAIN.to_string())
    }
}

pub fn from_path(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

/// Strips parameters such as `; charset=utf-8`.
pub fn essence(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_json_content_object() {
        assert!(is_json_content(r#"{"key": "value"}"#));
        assert!(is_json_content(r#"  {"key": "value"}  "#));
        assert!(is_json_content("{}"));
    }

    #[test]
    fn test_is_json_content_array() {
        assert!(is_json_content(r#"["item1", "item2"]"#));
        assert!(is_json_content("[]"));
    }

    #[test]
    fn test_is_json_content_not_json() {
        assert!(!is_json_content("plain text"));
        assert!(!is_json_content("{not closed"));
        assert!(!is_json_content("closed]"));
    }

    #[test]
    fn test_from_content() {
        assert_eq!(from_content(r#"{"a": 1}"#).as_deref(), Some(APPLICATION_JSON));
        assert_eq!(from_content("{not json}").as_deref(), Some(TEXT_PLAIN));
        assert_eq!(from_content(""), None);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(from_path(Path::new("a.json")).as_deref(), Some(APPLICATION_JSON));
        assert_eq!(from_path(Path::new("a.txt")).as_deref(), Some(TEXT_PLAIN));
        assert_eq!(from_path(Path::new("noextension")), None);
    }

    #[test]
    fn test_essence() {
        assert_eq!(essence("application/json; charset=utf-8"), APPLICATION_JSON);
        assert_eq!(essence("text/plain"), TEXT_PLAIN);
    }
}
