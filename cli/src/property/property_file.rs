use crate::core::error::{DothttpError, FileKind};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const HEADERS_SECTION: &str = "headers";
pub const ALWAYS_SECTION: &str = "*";
pub const COMMANDS_SECTION: &str = "$commands";

pub const DEFAULT_NAMES: &[&str] = &[
    ".dothttp.json",
    ".dothttp.yaml",
    ".dothttp.yml",
    ".dothttp.toml",
];

#[derive(Debug, Clone, Default)]
pub struct PropertyFile {
    pub path: Option<PathBuf>,
    sections: Map<String, Value>,
}

impl PropertyFile {
    /// First default property file next to the source file, if any.
    pub fn discover(source: Option<&Path>) -> Option<PathBuf> {
        let dir = source
            .and_then(|s| s.parent())
            .filter(|d| !d.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        DEFAULT_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.is_file())
    }

    pub fn load(path: &Path) -> Result<Self, DothttpError> {
        if !path.is_file() {
            return Err(DothttpError::file_not_found(
                FileKind::Property,
                path.to_string_lossy().to_string(),
            ));
        }
        let content = std::fs::read_to_string(path)?;
        let sections = Self::parse(path, &content)?;
        tracing::debug!("loaded property file {}", path.display());
        Ok(Self {
            path: Some(path.to_path_buf()),
            sections,
        })
    }

    fn parse(path: &Path, content: &str) -> Result<Map<String, Value>, DothttpError> {
        let invalid = |message: String| DothttpError::PropertyFileInvalid {
            path: path.to_string_lossy().to_string(),
            message,
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let value: Value = if file_name.ends_with(".yaml") || file_name.ends_with(".yml") {
            serde_yaml::from_str(content).map_err(|e| invalid(e.to_string()))?
        } else if file_name.ends_with(".toml") {
            toml::from_str(content).map_err(|e| invalid(e.to_string()))?
        } else if content.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?
        };
        match value {
            Value::Object(map) => {
                for (name, section) in &map {
                    if !section.is_object() {
                        return Err(invalid(format!("section `{name}` must be an object")));
                    }
                }
                Ok(map)
            }
            Value::Null => Ok(Map::new()),
            _ => Err(invalid("top level must be an object".into())),
        }
    }

    pub fn display_name(&self) -> String {
        self.path
            .as_ref()
            .map(|p| crate::core::paths::clean_path(p))
            .unwrap_or_else(|| "not specified".into())
    }

    pub fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        self.sections.get(name).and_then(Value::as_object)
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        self.section(HEADERS_SECTION)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), value_text(v))).collect())
            .unwrap_or_default()
    }

    pub fn commands(&self) -> Vec<(String, String)> {
        self.section(COMMANDS_SECTION)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), value_text(v))).collect())
            .unwrap_or_default()
    }

    /// Properties of the `*` section followed by each named env in order.
    pub fn env_properties(&self, envs: &[String]) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let mut names = vec![ALWAYS_SECTION.to_string()];
        names.extend(envs.iter().cloned());
        for name in &names {
            match self.section(name) {
                Some(section) => {
                    out.extend(section.iter().map(|(k, v)| (k.clone(), value_text(v))));
                }
                None if name != ALWAYS_SECTION => {
                    tracing::warn!("env `{name}` is not defined in {}", self.display_name());
                }
                None => {}
            }
        }
        out
    }
}

/// Strings are used as is, everything else as JSON text.
pub fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
