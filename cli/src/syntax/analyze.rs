use super::{
    ast::Document,
    error::SyntaxError,
    parsers::{ImportParser, Parse, RequestParser, VariableParser},
    reader::TokenReader,
    tokenize::{normalize_line_endings, tokenize},
};
use crate::core::error::{DothttpError, FileKind};
use std::path::{Path, PathBuf};

pub fn analyze(
    tokens: &[super::token::Token],
    file_path: Option<&Path>,
    source: &str,
) -> Result<Document, SyntaxError> {
    let mut r = TokenReader::new(
        tokens.to_vec(),
        file_path.map(Path::to_path_buf).unwrap_or_default(),
        source.to_string(),
    );
    let mut doc = Document {
        source_path: file_path.map(Path::to_path_buf),
        ..Default::default()
    };

    let parsers: Vec<Box<dyn Parse>> = vec![
        Box::new(ImportParser),
        Box::new(VariableParser),
        Box::new(RequestParser),
    ];

    while !r.is_end() {
        r.skip_ignorable();
        if r.is_end() {
            break;
        }

        let mut parsed = false;
        for parser in &parsers {
            if parser.can_parse(&r) {
                parser.parse(&mut r, &mut doc)?;
                parsed = true;
                break;
            }
        }

        if !parsed {
            if let Some(tok) = r.cur() {
                return Err(r.create_error_with_file(
                    format!("Unexpected token '{}'", tok.value),
                    tok.span.clone(),
                ));
            } else {
                return Err(r.eof_error("Unexpected end of tokens"));
            }
        }
    }
    Ok(doc)
}

/// Parses DSL text. Line endings are normalized first so spans refer to the
/// normalized text.
pub fn parse(text: &str, file_path: Option<&Path>) -> Result<Document, SyntaxError> {
    let source = normalize_line_endings(text);
    let tokens = tokenize(&source).map_err(|mut e| {
        e.file_path = file_path.map(|p| p.to_string_lossy().to_string());
        e
    })?;
    analyze(&tokens, file_path, &source)
}

pub fn parse_file(path: &Path) -> Result<Document, DothttpError> {
    let content = read_source(path, FileKind::Http)?;
    let canonical: PathBuf = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    Ok(parse(&content, Some(&canonical))?)
}

pub fn read_source(path: &Path, kind: FileKind) -> Result<String, DothttpError> {
    if !path.is_file() {
        return Err(DothttpError::file_not_found(
            kind,
            path.to_string_lossy().to_string(),
        ));
    }
    Ok(std::fs::read_to_string(path)?)
}
