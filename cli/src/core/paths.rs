use std::path::{Path, PathBuf};

pub fn clean_path_str(s: &str) -> &str {
    #[cfg(windows)]
    {
        if let Some(stripped) = s.strip_prefix(r"\\?\") {
            return stripped;
        }
    }
    s
}

pub fn clean_path(path: &Path) -> String {
    let s = path.display().to_string();
    clean_path_str(&s).to_string()
}

fn home_file(name: &str) -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(name)
}

pub fn azure_cli_token_cache() -> PathBuf {
    home_file(".dothttp.azure-cli.json")
}

pub fn azure_sp_token_cache() -> PathBuf {
    home_file(".dothttp.msal_token_cache.json")
}

/// Resolves `path` against the directory of `source`, leaving absolute paths alone.
pub fn relative_to(source: Option<&Path>, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        return candidate.to_path_buf();
    }
    match source.and_then(|s| s.parent()) {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(candidate),
        _ => candidate.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_to() {
        let source = Path::new("/tmp/project/api.http");
        assert_eq!(
            relative_to(Some(source), "body.json"),
            PathBuf::from("/tmp/project/body.json")
        );
        assert_eq!(
            relative_to(Some(source), "/etc/hosts"),
            PathBuf::from("/etc/hosts")
        );
        assert_eq!(relative_to(None, "body.json"), PathBuf::from("body.json"));
        assert_eq!(
            relative_to(Some(Path::new("api.http")), "body.json"),
            PathBuf::from("body.json")
        );
    }

    #[test]
    fn test_token_cache_paths_live_in_home() {
        assert!(azure_cli_token_cache().ends_with(".dothttp.azure-cli.json"));
        assert!(azure_sp_token_cache().ends_with(".dothttp.msal_token_cache.json"));
    }
}
