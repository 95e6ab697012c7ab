use super::{expression, generators};
use crate::core::error::DothttpError;
use indexmap::{IndexMap, IndexSet};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;

pub const DOTHTTP_ENV_PREFIX: &str = "DOTHTTP_ENV_";
pub const SYSTEM_COMMAND_DISABLED: &str =
    "running system command is disabled, enable it by adding @insecure";

lazy_static! {
    static ref PLACEHOLDER_REGEX: Regex = Regex::new(r"(?s)\{\{(.*?)\}\}").unwrap();
    static ref TEMPLATE_MARKER_REGEX: Regex = Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Unset,
    Value(String),
    /// Defaulted with two or more different values.
    Conflict,
}

/// An in-file property and every placeholder text it was written as.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: String,
    pub text: Vec<String>,
    pub value: PropertyValue,
    /// Set by a `var` declaration rather than mined from `{{name=default}}`.
    pub from_var: bool,
}

/// Maps placeholder names to values across the property tiers.
#[derive(Debug, Default)]
pub struct PropertyResolver {
    command_line: IndexMap<String, String>,
    env: IndexMap<String, String>,
    in_file: IndexMap<String, Property>,
    system_commands: IndexMap<String, String>,
    property_file: Option<String>,
    system_command_enabled: bool,
    lenient: bool,
    pub errors: Vec<DothttpError>,
}

/// Splits a placeholder body into its key and optional default.
fn split_placeholder(body: &str) -> (String, Option<String>) {
    if generators::is_special(body) {
        return (body.trim().to_string(), None);
    }
    match body.split_once('=') {
        Some((key, value)) => (key.trim().to_string(), Some(value.trim().to_string())),
        None => (body.trim().to_string(), None),
    }
}

fn strip_matching_quotes(value: &str) -> Option<&str> {
    let first = value.chars().next()?;
    if value.len() >= 2 && (first == '"' || first == '\'') && value.ends_with(first) {
        return Some(&value[1..value.len() - 1]);
    }
    None
}

impl PropertyResolver {
    pub fn new(property_file: Option<String>) -> Self {
        Self {
            property_file,
            ..Default::default()
        }
    }

    /// Collects unresolved names into `errors` instead of failing.
    pub fn lenient(mut self) -> Self {
        self.lenient = true;
        self
    }

    pub fn enable_system_command(&mut self) {
        self.system_command_enabled = true;
    }

    pub fn add_command_line_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.command_line.insert(key.into(), value.into());
    }

    pub fn add_env_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env.insert(key.into(), value.into());
    }

    pub fn add_system_command(&mut self, key: impl Into<String>, command: impl Into<String>) {
        self.system_commands.insert(key.into(), command.into());
    }

    pub fn command_line_properties(&self) -> &IndexMap<String, String> {
        &self.command_line
    }

    /// Every named property with a value, higher tiers shadowing lower ones.
    pub fn all_properties(&self) -> IndexMap<String, String> {
        let mut all = IndexMap::new();
        for (k, p) in &self.in_file {
            if let PropertyValue::Value(v) = &p.value {
                all.insert(k.clone(), v.clone());
            }
        }
        for (k, v) in self.env.iter().chain(self.command_line.iter()) {
            all.insert(k.clone(), v.clone());
        }
        all
    }

    /// Value of a `var` declaration. A var replaces a mined default of the same name.
    pub fn add_infile_property_from_var(&mut self, key: &str, value: String, can_override: bool) {
        if !can_override {
            if let Some(p) = self.in_file.get(key) {
                if p.value != PropertyValue::Unset {
                    return;
                }
            }
        }
        self.in_file.insert(
            key.to_string(),
            Property {
                key: key.to_string(),
                text: Vec::new(),
                value: PropertyValue::Value(value),
                from_var: true,
            },
        );
    }

    /// Records the `{{name=default}}` defaults found in `content`.
    pub fn add_infile_properties(&mut self, content: &str) {
        let bodies: Vec<String> = PLACEHOLDER_REGEX
            .captures_iter(content)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .filter(|b| !b.is_empty())
            .collect();
        for body in bodies {
            self.mine(&body);
        }
    }

    fn mine(&mut self, body: &str) {
        let (key, default) = split_placeholder(body);
        let default = default.map(|d| self.expand_default(&d));
        let entry = self.in_file.entry(key.clone()).or_insert_with(|| Property {
            key: key.clone(),
            text: Vec::new(),
            value: PropertyValue::Unset,
            from_var: false,
        });
        if !entry.text.iter().any(|t| t == body) {
            entry.text.push(body.to_string());
        }
        let Some(default) = default else {
            return;
        };
        if entry.from_var {
            return;
        }
        match &entry.value {
            PropertyValue::Unset => entry.value = PropertyValue::Value(default.value),
            PropertyValue::Value(existing) if !default.generated && *existing != default.value => {
                tracing::debug!("property `{key}` is defaulted with different values");
                entry.value = PropertyValue::Conflict;
            }
            _ => {}
        }
    }

    fn expand_default(&self, raw: &str) -> MinedDefault {
        if let Some(inner) = strip_matching_quotes(raw) {
            return MinedDefault::plain(inner.to_string());
        }
        let template = raw
            .strip_prefix("p'")
            .and_then(|t| t.strip_suffix('\''))
            .or_else(|| raw.strip_prefix("p\"").and_then(|t| t.strip_suffix('"')));
        let value = match template {
            Some(t) => self.format_template(t),
            None => raw.to_string(),
        };
        if generators::is_generator(&value) {
            return MinedDefault {
                value: generators::generate(&value),
                generated: true,
            };
        }
        MinedDefault::plain(value)
    }

    /// Substitutes `{name}` markers from the command line, env and in-file tiers.
    /// Unknown markers are left as written.
    pub fn format_template(&self, template: &str) -> String {
        TEMPLATE_MARKER_REGEX
            .replace_all(template, |caps: &Captures| {
                let name = &caps[1];
                self.command_line
                    .get(name)
                    .or_else(|| self.env.get(name))
                    .cloned()
                    .or_else(|| match self.in_file.get(name).map(|p| &p.value) {
                        Some(PropertyValue::Value(v)) => Some(v.clone()),
                        _ => None,
                    })
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .to_string()
    }

    fn os_env(key: &str) -> Option<String> {
        std::env::var(format!("{DOTHTTP_ENV_PREFIX}{key}")).ok()
    }

    fn is_available(&self, key: &str) -> bool {
        generators::is_special(key)
            || self.command_line.contains_key(key)
            || self.env.contains_key(key)
            || self
                .in_file
                .get(key)
                .map(|p| p.value != PropertyValue::Unset)
                .unwrap_or(false)
            || Self::os_env(key).is_some()
            || self.system_commands.contains_key(key)
    }

    fn run_system_command(&self, key: &str) -> Option<String> {
        let command = self.system_commands.get(key)?;
        if !self.system_command_enabled {
            tracing::error!("system command is disabled, enable it by adding '@insecure'");
            return Some(SYSTEM_COMMAND_DISABLED.to_string());
        }
        tracing::debug!("running system command for property `{key}`");
        match std::process::Command::new("sh").arg("-c").arg(command).output() {
            Ok(out) if out.status.success() => {
                Some(String::from_utf8_lossy(&out.stdout).trim().to_string())
            }
            Ok(out) => {
                tracing::error!(
                    "system command `{command}` failed: {}",
                    String::from_utf8_lossy(&out.stderr).trim()
                );
                Some(String::new())
            }
            Err(e) => {
                tracing::error!("system command `{command}` failed: {e}");
                Some(String::new())
            }
        }
    }

    /// Looks a name up: command line, env, in-file, `DOTHTTP_ENV_*`, shell commands.
    /// Generated names produce a fresh value on every call.
    pub fn resolve_property_string(&self, key: &str) -> Result<Option<String>, DothttpError> {
        let key = key.trim();
        if let Some(expr) = key.strip_prefix(generators::EXPR_PREFIX) {
            return Ok(Some(expression::evaluate(expr).unwrap_or_else(|e| {
                tracing::warn!("error evaluating expression `{expr}`: {e}");
                expr.to_string()
            })));
        }
        if generators::is_special(key) {
            return Ok(Some(generators::generate(key)));
        }
        if let Some(v) = self.command_line.get(key) {
            return Ok(Some(v.clone()));
        }
        if let Some(v) = self.env.get(key) {
            return Ok(Some(v.clone()));
        }
        match self.in_file.get(key).map(|p| &p.value) {
            Some(PropertyValue::Value(v)) => return Ok(Some(v.clone())),
            Some(PropertyValue::Conflict) => {
                return Err(DothttpError::PropertyConflict(key.to_string()))
            }
            _ => {}
        }
        if let Some(v) = Self::os_env(key) {
            return Ok(Some(v));
        }
        Ok(self.run_system_command(key))
    }

    fn missing_names(&self, content: &str) -> Vec<String> {
        let mut missing = IndexSet::new();
        for caps in PLACEHOLDER_REGEX.captures_iter(content) {
            let (key, _) = split_placeholder(&caps[1]);
            if key.is_empty() {
                continue;
            }
            if !self.is_available(&key) {
                missing.insert(key);
            }
        }
        missing.into_iter().collect()
    }

    fn not_found(&self, names: Vec<String>) -> DothttpError {
        DothttpError::PropertyNotFound {
            names,
            property_file: self
                .property_file
                .clone()
                .unwrap_or_else(|| "not specified".into()),
        }
    }

    /// Expands every `{{...}}` in `content`. Each occurrence is resolved on its own,
    /// so generators yield a distinct value per occurrence. Substituted text is not
    /// scanned again.
    pub fn get_updated_content(&mut self, content: &str) -> Result<String, DothttpError> {
        if !content.contains("{{") {
            return Ok(content.to_string());
        }
        self.add_infile_properties(content);
        let missing = self.missing_names(content);
        if !missing.is_empty() {
            let err = self.not_found(missing);
            if self.lenient {
                self.errors.push(err);
                return Ok(content.to_string());
            }
            return Err(err);
        }

        let mut failure = None;
        let updated = PLACEHOLDER_REGEX.replace_all(content, |caps: &Captures| {
            let (key, _) = split_placeholder(&caps[1]);
            if key.is_empty() {
                return caps[0].to_string();
            }
            match self.resolve_property_string(&key) {
                Ok(Some(v)) => {
                    tracing::debug!("using `{v}` for property {key}");
                    v
                }
                Ok(None) => caps[0].to_string(),
                Err(e) => {
                    failure.get_or_insert(e);
                    caps[0].to_string()
                }
            }
        });
        let updated = updated.to_string();
        match failure {
            Some(e) if self.lenient => {
                self.errors.push(e);
                Ok(updated)
            }
            Some(e) => Err(e),
            None => Ok(updated),
        }
    }

    /// Like `get_updated_content`, but a content that is exactly one placeholder
    /// yields the property value parsed as JSON when it is valid JSON.
    pub fn get_updated_obj_content(&mut self, content: &str) -> Result<Value, DothttpError> {
        let trimmed = content.trim();
        let single = PLACEHOLDER_REGEX
            .captures(trimmed)
            .filter(|c| c.get(0).map(|m| m.as_str().len()) == Some(trimmed.len()));
        let Some(caps) = single else {
            return Ok(Value::String(self.get_updated_content(content)?));
        };
        let resolved = self.get_updated_content(trimmed)?;
        if resolved == trimmed && !generators::is_special(&caps[1]) {
            // lenient mode left it unresolved
            return Ok(Value::String(resolved));
        }
        Ok(match serde_json::from_str::<Value>(&resolved) {
            Ok(v) => v,
            Err(_) => {
                tracing::debug!("property `{}` value is not json decodable", &caps[1]);
                Value::String(resolved)
            }
        })
    }

    /// Names used in `content` that no tier can resolve.
    pub fn check_properties(&self, content: &str) -> Result<(), DothttpError> {
        let missing = self.missing_names(content);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(self.not_found(missing))
        }
    }
}

struct MinedDefault {
    value: String,
    generated: bool,
}

impl MinedDefault {
    fn plain(value: String) -> Self {
        Self {
            value,
            generated: false,
        }
    }
}
