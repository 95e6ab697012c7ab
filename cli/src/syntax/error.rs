#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub span: std::ops::Range<usize>,
    pub file_path: Option<String>,
}

impl SyntaxError {
    pub fn new(message: String, line: usize, column: usize, span: std::ops::Range<usize>) -> Self {
        Self {
            message,
            line,
            column,
            span,
            file_path: None,
        }
    }

    pub fn with_file(
        message: String,
        line: usize,
        column: usize,
        span: std::ops::Range<usize>,
        file_path: String,
    ) -> Self {
        Self {
            message,
            line,
            column,
            span,
            file_path: Some(file_path),
        }
    }
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(file) = &self.file_path {
            let path = std::path::Path::new(file);
            let display_path = match std::env::current_dir() {
                Ok(cwd) => match path.strip_prefix(&cwd) {
                    Ok(stripped) => stripped.display().to_string(),
                    Err(_) => crate::core::paths::clean_path(path),
                },
                Err(_) => crate::core::paths::clean_path(path),
            };
            write!(
                f,
                "http file: `{}` http syntax at line {}, column {}: {}",
                display_path, self.line, self.column, self.message
            )
        } else {
            write!(
                f,
                "http syntax at line {}, column {}: {}",
                self.line, self.column, self.message
            )
        }
    }
}

impl std::error::Error for SyntaxError {}
