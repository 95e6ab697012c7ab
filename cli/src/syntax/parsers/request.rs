use super::{
    auth::{can_parse_auth, can_parse_certificate, parse_auth, parse_certificate},
    parse_trait::Parse,
    payload::{can_parse_payload, parse_payload},
    utils::{parse_text_value, unquote},
};
use crate::syntax::{
    ast::{Document, RequestNode, ScriptAst, ScriptLang},
    error::SyntaxError,
    http_method::HttpMethod,
    keywords::{
        ANN_CLEAR, ANN_INSECURE, ANN_NAME, ANN_NO_PARENT_SCRIPT, FN_OUTPUT, LANG_JAVASCRIPT,
        LANG_PYTHON, OP_APPEND, OP_ASSIGN, OP_GT, OP_QUERY, PUNC_COLON, PUNC_LPAREN,
        PUNC_RPAREN,
    },
    reader::{expect, make_error, TokenReader},
    token::{Token, TokenType},
};

pub struct RequestParser;
impl Parse for RequestParser {
    fn can_parse(&self, r: &TokenReader) -> bool {
        match r.cur() {
            Some(t) => match t.token_type {
                TokenType::Annotation => true,
                TokenType::Identifier => HttpMethod::from_str(&t.value).is_some(),
                TokenType::String | TokenType::TripleString => !is_header_line(r),
                _ => false,
            },
            None => false,
        }
    }
    fn parse(&self, r: &mut TokenReader, doc: &mut Document) -> Result<(), SyntaxError> {
        let mut req = parse_request(r)?;
        req.source_path = doc.source_path.clone();
        doc.requests.push(req);
        Ok(())
    }
}

fn is_header_line(r: &TokenReader) -> bool {
    r.peek_significant()
        .map(|n| n.is(TokenType::Punctuation, PUNC_COLON))
        .unwrap_or(false)
}

fn next_is_lparen(r: &TokenReader) -> bool {
    r.peek(1)
        .map(|n| n.is(TokenType::Punctuation, PUNC_LPAREN))
        .unwrap_or(false)
}

pub fn parse_request(r: &mut TokenReader) -> Result<RequestNode, SyntaxError> {
    let start = r.cur().map(|t| t.span.start).unwrap_or(0);
    let mut req = RequestNode {
        description: r.leading_comments(),
        ..Default::default()
    };

    while let Some(tok) = r.cur().cloned() {
        if tok.token_type != TokenType::Annotation {
            break;
        }
        parse_annotation(r, &tok, &mut req)?;
        r.skip_ignorable();
    }

    let Some(tok) = r.cur().cloned() else {
        return Err(r.eof_error("Expected URL"));
    };
    if tok.token_type == TokenType::Identifier {
        let method = HttpMethod::from_str(&tok.value)
            .ok_or_else(|| make_error(r, &tok, format!("Unknown http method '{}'", tok.value)))?;
        req.method = Some(method);
        r.advance();
        r.skip_inline();
    }
    let url_start = r.cur().map(|t| t.span.start).unwrap_or(r.source.len());
    req.url = parse_text_value(r, "URL")?;
    req.spans.url = url_start..r.last_end();

    loop {
        r.skip_ignorable();
        let Some(tok) = r.cur().cloned() else {
            break;
        };
        let line_start = tok.span.start;

        if can_parse_auth(r) {
            if req.auth.is_some() {
                return Err(make_error(r, &tok, "Auth is declared twice"));
            }
            req.auth = Some(parse_auth(r)?);
            req.spans.auth = Some(line_start..r.last_end());
        } else if can_parse_certificate(r) {
            if req.certificate.is_some() {
                return Err(make_error(r, &tok, "Certificate is declared twice"));
            }
            req.certificate = Some(parse_certificate(r)?);
            req.spans.certificate = Some(line_start..r.last_end());
        } else if tok.is(TokenType::Operator, OP_QUERY) {
            r.advance();
            r.skip_inline();
            let key = parse_text_value(r, "query key")?;
            r.skip_inline();
            expect(
                r,
                |t| t.is(TokenType::Operator, OP_ASSIGN) || t.is(TokenType::Punctuation, PUNC_COLON),
                format!("Expected '{OP_ASSIGN}'"),
            )?;
            r.advance();
            r.skip_inline();
            let value = parse_text_value(r, "query value")?;
            req.queries.push((key, value));
            req.spans.queries.push(line_start..r.last_end());
        } else if tok.is_string() && is_header_line(r) {
            let key = unquote(&tok).value;
            r.advance();
            r.skip_ignorable();
            r.advance();
            r.skip_inline();
            let value = parse_text_value(r, "header value")?;
            req.headers.push((key, value));
            req.spans.headers.push(line_start..r.last_end());
        } else if can_parse_payload(r) {
            if req.payload.is_some() {
                return Err(make_error(r, &tok, "Payload is declared twice"));
            }
            req.payload = Some(parse_payload(r)?);
            req.spans.payload = Some(line_start..r.last_end());
        } else if tok.is(TokenType::Identifier, FN_OUTPUT) && next_is_lparen(r) {
            r.advance();
            r.advance();
            r.skip_ignorable();
            req.output = Some(parse_text_value(r, "output path")?);
            r.skip_ignorable();
            expect(
                r,
                |t| t.is(TokenType::Punctuation, PUNC_RPAREN),
                format!("Expected '{PUNC_RPAREN}'"),
            )?;
            r.advance();
            req.spans.output = Some(line_start..r.last_end());
        } else if tok.is(TokenType::Operator, OP_APPEND) {
            r.advance();
            r.skip_inline();
            req.output = Some(parse_bare_path(r)?);
            req.spans.output = Some(line_start..r.last_end());
        } else if tok.is(TokenType::Operator, OP_GT) {
            r.advance();
            r.skip_inline();
            let script_tok = expect(
                r,
                |t| t.token_type == TokenType::Script,
                "Expected script block '{% ... %}'",
            )?;
            r.advance();
            let mut script = parse_script_block(&script_tok.value);
            r.skip_inline();
            let trailing = r
                .cur()
                .filter(|t| t.token_type == TokenType::Identifier)
                .and_then(|t| lang_of(&t.value));
            if let Some(lang) = trailing {
                script.lang = lang;
                r.advance();
            }
            req.script = Some(script);
            req.spans.script = Some(line_start..r.last_end());
            break;
        } else {
            break;
        }
    }

    req.spans.whole = start..r.last_end();
    Ok(req)
}

fn parse_annotation(
    r: &mut TokenReader,
    tok: &Token,
    req: &mut RequestNode,
) -> Result<(), SyntaxError> {
    match tok.value.as_str() {
        ANN_NAME => {
            if req.name.is_some() {
                return Err(make_error(r, tok, "Request is named twice"));
            }
            r.advance();
            r.skip_inline();
            expect(
                r,
                |t| t.is(TokenType::Punctuation, PUNC_LPAREN),
                format!("Expected '{PUNC_LPAREN}'"),
            )?;
            r.advance();
            r.skip_ignorable();
            let name_start = r.cur().map(|t| t.span.start).unwrap_or(0);
            req.name = Some(parse_text_value(r, "request name")?);
            req.spans.name = Some(name_start..r.last_end());
            r.skip_ignorable();
            if r.is_punct(PUNC_COLON) {
                r.advance();
                r.skip_ignorable();
                req.base = Some(parse_text_value(r, "base request name")?);
                r.skip_ignorable();
            }
            expect(
                r,
                |t| t.is(TokenType::Punctuation, PUNC_RPAREN),
                format!("Expected '{PUNC_RPAREN}'"),
            )?;
            r.advance();
            r.skip_inline();
            if req.base.is_none() && r.is_punct(PUNC_COLON) {
                r.advance();
                r.skip_inline();
                req.base = Some(parse_text_value(r, "base request name")?);
            }
        }
        ANN_CLEAR => {
            req.flags.clear = true;
            r.advance();
        }
        ANN_INSECURE => {
            req.flags.insecure = true;
            r.advance();
        }
        ANN_NO_PARENT_SCRIPT => {
            req.flags.no_parent_script = true;
            r.advance();
        }
        other => {
            let arg_start = tok.span.start;
            r.advance();
            if !r.is_punct(PUNC_LPAREN) {
                return Err(make_error(r, tok, format!("Unknown annotation '{other}'")));
            }
            r.advance();
            r.skip_ignorable();
            let value = parse_text_value(r, "annotation value")?;
            r.skip_ignorable();
            expect(
                r,
                |t| t.is(TokenType::Punctuation, PUNC_RPAREN),
                format!("Expected '{PUNC_RPAREN}'"),
            )?;
            r.advance();
            req.named_args
                .push((other.trim_start_matches('@').to_string(), value));
            req.spans.named_args.push(arg_start..r.last_end());
        }
    }
    Ok(())
}

/// `>> path` accepts a quoted path or the raw text up to the end of the line.
fn parse_bare_path(r: &mut TokenReader) -> Result<String, SyntaxError> {
    if r.cur().map(|t| t.is_string()).unwrap_or(false) {
        return parse_text_value(r, "output path");
    }
    let start = r.cur().map(|t| t.span.start).unwrap_or(r.source.len());
    while let Some(t) = r.cur() {
        if matches!(t.token_type, TokenType::Newline | TokenType::Comment) {
            break;
        }
        r.advance();
    }
    let path = r.source[start..r.last_end().max(start)].trim().to_string();
    if path.is_empty() {
        return Err(r.eof_error("Expected output path"));
    }
    Ok(path)
}

fn lang_of(word: &str) -> Option<ScriptLang> {
    match word {
        LANG_JAVASCRIPT | "js" => Some(ScriptLang::JavaScript),
        LANG_PYTHON | "py" => Some(ScriptLang::Python),
        _ => None,
    }
}

/// Splits `{% lang? body %}` into language and body. Leading blank lines and
/// trailing whitespace of the body are dropped; indentation is kept.
pub fn parse_script_block(raw: &str) -> ScriptAst {
    let inner = raw
        .strip_prefix("{%")
        .and_then(|s| s.strip_suffix("%}"))
        .unwrap_or(raw);
    let trimmed = inner.trim_start();
    let word_len = trimmed
        .find(|c: char| c.is_whitespace())
        .unwrap_or(trimmed.len());
    let (lang, body) = match lang_of(&trimmed[..word_len]) {
        Some(lang) => (lang, &trimmed[word_len..]),
        None => (ScriptLang::default(), inner),
    };
    let mut lines: Vec<&str> = body.lines().collect();
    while lines.first().map(|l| l.trim().is_empty()).unwrap_or(false) {
        lines.remove(0);
    }
    let source = lines.join("\n").trim_end().to_string();
    ScriptAst { lang, source }
}
