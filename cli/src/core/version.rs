pub fn app_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn user_agent() -> String {
    format!("dothttp/{}", app_version())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_version_format() {
        let version = app_version();
        assert!(
            version.contains('.'),
            "Version should be in semantic format"
        );
    }

    #[test]
    fn test_user_agent() {
        assert!(user_agent().starts_with("dothttp/"));
    }
}
