use super::{
    json::parse_json_value,
    utils::{parse_text_value, unquote},
};
use crate::syntax::{
    ast::{MultipartPart, PayloadAst},
    error::SyntaxError,
    keywords::{
        FN_DATA, FN_FILEINPUT, FN_FILES, FN_JSON, FN_MULTIPART, FN_TEXT, FN_URLENCODED, OP_LT,
        PAYLOAD_FUNCTIONS, PUNC_COMMA, PUNC_LBRACE, PUNC_LPAREN, PUNC_RPAREN, PUNC_SEMI,
    },
    reader::{expect, TokenReader},
    token::TokenType,
};

pub fn can_parse_payload(r: &TokenReader) -> bool {
    match r.cur() {
        Some(t) if t.token_type == TokenType::Identifier => {
            PAYLOAD_FUNCTIONS.contains(&t.value.as_str())
                && r
                    .peek_significant()
                    .map(|n| n.is(TokenType::Punctuation, PUNC_LPAREN))
                    .unwrap_or(false)
        }
        Some(t) => t.is(TokenType::Operator, OP_LT),
        None => false,
    }
}

pub fn parse_payload(r: &mut TokenReader) -> Result<PayloadAst, SyntaxError> {
    let Some(func) = r.cur().cloned() else {
        return Err(r.eof_error("Expected payload"));
    };
    if func.is(TokenType::Operator, OP_LT) {
        r.advance();
        r.skip_inline();
        let path = parse_text_value(r, "file path")?;
        let mime = parse_mime_suffix(r, PUNC_SEMI)?;
        return Ok(PayloadAst::File { path, mime });
    }

    r.advance();
    r.skip_ignorable();
    expect(
        r,
        |t| t.is(TokenType::Punctuation, PUNC_LPAREN),
        format!("Expected '{PUNC_LPAREN}'"),
    )?;
    r.advance();
    r.skip_ignorable();

    let payload = match func.value.as_str() {
        FN_JSON => PayloadAst::Json(parse_json_value(r)?),
        FN_URLENCODED => PayloadAst::FormEncoded(parse_json_value(r)?),
        FN_DATA if r.is_punct(PUNC_LBRACE) => PayloadAst::FormEncoded(parse_json_value(r)?),
        FN_TEXT | FN_DATA => parse_raw(r)?,
        FN_FILEINPUT => {
            let path = parse_text_value(r, "file path")?;
            let mime = parse_mime_suffix(r, PUNC_COMMA)?;
            PayloadAst::File { path, mime }
        }
        FN_MULTIPART | FN_FILES => PayloadAst::Multipart(parse_multipart(r)?),
        other => {
            return Err(r.create_error_with_file(
                format!("Unknown payload function '{other}'"),
                func.span.clone(),
            ))
        }
    };

    r.skip_ignorable();
    expect(
        r,
        |t| t.is(TokenType::Punctuation, PUNC_RPAREN),
        format!("Expected '{PUNC_RPAREN}'"),
    )?;
    r.advance();
    Ok(payload)
}

fn parse_raw(r: &mut TokenReader) -> Result<PayloadAst, SyntaxError> {
    let mut chunks = Vec::new();
    loop {
        r.skip_ignorable();
        match r.cur() {
            Some(t) if t.is_string() => {
                chunks.push(unquote(t));
                r.advance();
            }
            _ => break,
        }
    }
    if chunks.is_empty() {
        expect(r, |t| t.is_string(), "Expected text")?;
    }
    let mime = parse_mime_suffix(r, PUNC_COMMA)?;
    Ok(PayloadAst::Raw { chunks, mime })
}

/// Optional `<sep> "mime"` after a payload value.
fn parse_mime_suffix(r: &mut TokenReader, sep: &str) -> Result<Option<String>, SyntaxError> {
    r.skip_inline();
    if !r.is_punct(sep) {
        return Ok(None);
    }
    r.advance();
    r.skip_inline();
    Ok(Some(parse_text_value(r, "mime type")?))
}

fn parse_multipart(r: &mut TokenReader) -> Result<Vec<MultipartPart>, SyntaxError> {
    let mut parts = Vec::new();
    loop {
        r.skip_ignorable();
        if r.is_punct(PUNC_RPAREN) || r.is_end() {
            break;
        }
        let name = parse_text_value(r, "multipart field name")?;
        r.skip_ignorable();
        expect(
            r,
            |t| t.is(TokenType::Operator, OP_LT),
            format!("Expected '{OP_LT}'"),
        )?;
        r.advance();
        r.skip_ignorable();
        let source = parse_text_value(r, "file path or content")?;
        let mime = parse_mime_suffix(r, PUNC_SEMI)?;
        parts.push(MultipartPart { name, source, mime });
        r.skip_ignorable();
        if r.is_punct(PUNC_COMMA) {
            r.advance();
            continue;
        }
        break;
    }
    Ok(parts)
}
