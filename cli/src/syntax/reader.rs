use super::{
    error::SyntaxError,
    token::{Token, TokenType},
};
use std::path::PathBuf;

#[derive(Clone)]
pub struct TokenReader {
    pub tokens: Vec<Token>,
    pub idx: usize,
    pub file_path: PathBuf,
    pub source: String,
}

impl TokenReader {
    pub fn new(tokens: Vec<Token>, file_path: PathBuf, source: String) -> Self {
        Self {
            tokens,
            idx: 0,
            file_path,
            source,
        }
    }

    pub fn cur(&self) -> Option<&Token> {
        self.tokens.get(self.idx)
    }

    pub fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.idx + offset)
    }

    /// The next token after the current one that is not whitespace, newline or comment.
    pub fn peek_significant(&self) -> Option<&Token> {
        self.tokens[(self.idx + 1).min(self.tokens.len())..]
            .iter()
            .find(|t| !is_ignorable(t))
    }

    pub fn advance(&mut self) {
        if self.idx < self.tokens.len() {
            self.idx += 1;
        }
    }

    pub fn is_end(&self) -> bool {
        self.idx >= self.tokens.len()
    }

    /// End offset of the last significant token before the cursor.
    pub fn last_end(&self) -> usize {
        self.tokens[..self.idx.min(self.tokens.len())]
            .iter()
            .rev()
            .find(|t| !is_ignorable(t))
            .map(|t| t.span.end)
            .unwrap_or(0)
    }

    pub fn create_error(&self, message: String, span: std::ops::Range<usize>) -> SyntaxError {
        self.create_error_with_file(message, span)
    }

    pub fn create_error_with_file(
        &self,
        message: String,
        span: std::ops::Range<usize>,
    ) -> SyntaxError {
        let (line, column) = self.get_line_col(span.start);
        if self.file_path.as_os_str().is_empty() {
            SyntaxError::new(message, line, column, span)
        } else {
            SyntaxError::with_file(
                message,
                line,
                column,
                span,
                self.file_path.to_string_lossy().to_string(),
            )
        }
    }

    pub fn eof_error(&self, message: impl Into<String>) -> SyntaxError {
        let end = self.source.len();
        self.create_error(message.into(), end..end)
    }

    pub fn get_line_col(&self, pos: usize) -> (usize, usize) {
        if pos > self.source.len() {
            return (1, 1);
        }
        super::tokenize::get_line_col(&self.source, pos)
    }

    pub fn skip_ignorable(&mut self) {
        while let Some(t) = self.cur() {
            if !is_ignorable(t) {
                break;
            }
            self.advance();
        }
    }

    /// Skips whitespace and comments but stops at a newline.
    pub fn skip_inline(&mut self) {
        while let Some(t) = self.cur() {
            match t.token_type {
                TokenType::Whitespace => self.advance(),
                TokenType::Comment if t.value.starts_with("/*") => self.advance(),
                _ => break,
            }
        }
    }

    pub fn is_keyword(&self, kw: &str) -> bool {
        self.cur()
            .map(|t| t.token_type == TokenType::Keyword && t.value == kw)
            .unwrap_or(false)
    }

    pub fn is_punct(&self, p: &str) -> bool {
        self.cur()
            .map(|t| t.token_type == TokenType::Punctuation && t.value == p)
            .unwrap_or(false)
    }

    /// Line comments directly above the current token, separated from it only by
    /// single newlines. Shebang lines are skipped.
    pub fn leading_comments(&self) -> Option<String> {
        let mut lines = Vec::new();
        let mut newlines = 0;
        let mut i = self.idx;
        while i > 0 {
            i -= 1;
            let tok = &self.tokens[i];
            match tok.token_type {
                TokenType::Whitespace => {}
                TokenType::Newline => {
                    newlines += 1;
                    if newlines > 1 {
                        break;
                    }
                }
                TokenType::Comment if !tok.value.starts_with("#!") => {
                    let text = tok
                        .value
                        .strip_prefix("//")
                        .or_else(|| tok.value.strip_prefix('#'))
                        .unwrap_or(&tok.value);
                    if tok.value.starts_with("/*") {
                        break;
                    }
                    lines.push(text.strip_prefix(' ').unwrap_or(text).to_string());
                    newlines = 0;
                }
                _ => break,
            }
        }
        if lines.is_empty() {
            return None;
        }
        lines.reverse();
        Some(lines.join("\n"))
    }
}

pub fn is_ignorable(t: &Token) -> bool {
    matches!(
        t.token_type,
        TokenType::Whitespace | TokenType::Newline | TokenType::Comment
    )
}

pub fn make_error<S: Into<String>>(r: &TokenReader, t: &Token, msg: S) -> SyntaxError {
    let msg = msg.into();

    // For "missing separator" cases point at the newline after the last valid token.
    if r.idx < r.tokens.len() && r.tokens[r.idx].span == t.span {
        let mut i = r.idx;
        let mut candidate_span = None;
        while i > 0 {
            i -= 1;
            let tok = &r.tokens[i];
            match tok.token_type {
                TokenType::Newline => {
                    candidate_span = Some(tok.span.clone());
                }
                TokenType::Whitespace | TokenType::Comment => {}
                _ => break,
            }
        }
        if let Some(s) = candidate_span {
            return r.create_error_with_file(msg, s);
        }
    }

    r.create_error(msg, t.span.clone())
}

pub fn expect<F, S>(r: &mut TokenReader, pred: F, msg: S) -> Result<Token, SyntaxError>
where
    F: Fn(&Token) -> bool,
    S: Into<String>,
{
    let msg = msg.into();
    if let Some(t) = r.cur() {
        if pred(t) {
            return Ok(t.clone());
        }
        return Err(make_error(r, t, msg));
    }

    let end = r.last_end();
    Err(r.create_error_with_file(msg, end..end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::tokenize::tokenize;

    fn reader(src: &str) -> TokenReader {
        TokenReader::new(tokenize(src).unwrap(), PathBuf::new(), src.to_string())
    }

    #[test]
    fn test_leading_comments() {
        let src = "// first line\n// second line\nGET \"x\"";
        let mut r = reader(src);
        r.skip_ignorable();
        assert_eq!(
            r.leading_comments().as_deref(),
            Some("first line\nsecond line")
        );
    }

    #[test]
    fn test_leading_comments_stop_at_blank_line() {
        let src = "// detached\n\nGET \"x\"";
        let mut r = reader(src);
        r.skip_ignorable();
        assert_eq!(r.leading_comments(), None);
    }

    #[test]
    fn test_expect_at_eof_points_to_last_token() {
        let src = "GET";
        let mut r = reader(src);
        r.advance();
        let err = expect(&mut r, |t| t.is_string(), "Expected URL").unwrap_err();
        assert_eq!(err.span, 3..3);
        assert_eq!(err.file_path, None);
    }

    #[test]
    fn test_peek_significant() {
        let r = reader("\"k\"  \n : \"v\"");
        assert_eq!(r.peek_significant().map(|t| t.value.as_str()), Some(":"));
    }
}
