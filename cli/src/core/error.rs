use crate::syntax::error::SyntaxError;
use std::fmt;
use std::io;
use thiserror::Error;

/// What kind of file a `FileNotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Http,
    Import,
    Property,
    Payload,
    Certificate,
    Output,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileKind::Http => "http file",
            FileKind::Import => "import file",
            FileKind::Property => "property file",
            FileKind::Payload => "payload file",
            FileKind::Certificate => "certificate file",
            FileKind::Output => "output file",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Error)]
pub enum DothttpError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("{kind}: `{}` not found", crate::core::paths::clean_path_str(.path))]
    FileNotFound { kind: FileKind, path: String },

    #[error("property file `{path}` is invalid: {message}")]
    PropertyFileInvalid { path: String, message: String },

    #[error("property {} not defined in `{property_file}`", join_names(.names))]
    PropertyNotFound {
        names: Vec<String>,
        property_file: String,
    },

    #[error("property: `{0}` is defaulted with two/more different values")]
    PropertyConflict(String),

    #[error("command line property `{0}` is malformed, expected key=value")]
    CommandLinePropMalformed(String),

    #[error("target: `{0}` appeared twice or more")]
    DuplicateTarget(String),

    #[error("target `{0}` is not spelled correctly or does not exist")]
    TargetNotFound(String),

    #[error("request `{name}` extends `{base}`, which is not defined")]
    UndefinedBase { name: String, base: String },

    #[error("circular inheritance detected: {}", .chain.join(" -> "))]
    CircularBase { chain: Vec<String> },

    #[error("payload is invalid: {0}")]
    PayloadInvalid(String),

    #[error("script compilation failed: {message}")]
    ScriptCompile { message: String, stdout: String },

    #[error("script execution failed in `{function}`: {message}")]
    ScriptRuntime {
        function: String,
        message: String,
        stdout: String,
    },

    #[error("auth configuration is incomplete: {0}")]
    AuthConfigIncomplete(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Generic(String),
}

fn join_names(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("`{n}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl DothttpError {
    pub fn file_not_found(kind: FileKind, path: impl Into<String>) -> Self {
        DothttpError::FileNotFound {
            kind,
            path: path.into(),
        }
    }

    /// Source position hint shown with `--debug`.
    pub fn position_hint(&self) -> Option<String> {
        match self {
            DothttpError::Syntax(err) => Some(format!(
                "at byte {}..{} (line {}, column {})",
                err.span.start, err.span.end, err.line, err.column
            )),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DothttpError {
    fn from(err: reqwest::Error) -> Self {
        DothttpError::Network(err.to_string())
    }
}

impl From<String> for DothttpError {
    fn from(msg: String) -> Self {
        DothttpError::Generic(msg)
    }
}

impl From<&str> for DothttpError {
    fn from(msg: &str) -> Self {
        DothttpError::Generic(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_not_found_message() {
        let err = DothttpError::PropertyNotFound {
            names: vec!["a".into(), "b".into()],
            property_file: "not specified".into(),
        };
        assert_eq!(
            err.to_string(),
            "property `a`, `b` not defined in `not specified`"
        );
    }

    #[test]
    fn test_file_not_found_message() {
        let err = DothttpError::file_not_found(FileKind::Payload, "data.bin");
        assert_eq!(err.to_string(), "payload file: `data.bin` not found");
    }

    #[test]
    fn test_position_hint_only_for_syntax() {
        let syntax = SyntaxError::new("bad".into(), 2, 3, 10..12);
        assert!(DothttpError::from(syntax).position_hint().is_some());
        assert!(DothttpError::Generic("x".into()).position_hint().is_none());
    }
}
