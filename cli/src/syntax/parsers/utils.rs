use crate::syntax::{
    ast::{QuoteKind, StrLit},
    error::SyntaxError,
    keywords::{OP_ASSIGN, PUNC_COMMA, PUNC_LPAREN, PUNC_RPAREN},
    reader::{expect, make_error, TokenReader},
    token::{Token, TokenType},
};

/// Strips the quotes of a string token and decodes escapes.
/// Triple-quoted content is taken verbatim.
pub fn unquote(tok: &Token) -> StrLit {
    let v = tok.value.as_str();
    if tok.token_type == TokenType::TripleString && v.len() >= 6 {
        return StrLit {
            value: v[3..v.len() - 3].to_string(),
            quote: QuoteKind::Triple,
        };
    }
    let quote = if v.starts_with('\'') {
        QuoteKind::Single
    } else {
        QuoteKind::Double
    };
    let inner = if v.len() >= 2 { &v[1..v.len() - 1] } else { "" };
    StrLit {
        value: decode_escapes(inner),
        quote,
    }
}

pub fn decode_escapes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// A value written as a string literal or a bare `{{placeholder}}`.
pub fn parse_text_value(r: &mut TokenReader, what: &str) -> Result<String, SyntaxError> {
    let tok = expect(
        r,
        |t| t.is_string() || t.token_type == TokenType::Placeholder,
        format!("Expected {what}"),
    )?;
    r.advance();
    if tok.token_type == TokenType::Placeholder {
        Ok(tok.value)
    } else {
        Ok(unquote(&tok).value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallArg {
    pub name: Option<String>,
    pub value: String,
    pub span: std::ops::Range<usize>,
}

/// Parses `( arg, name = arg, ... )` where every argument is a string or placeholder.
pub fn parse_call_args(r: &mut TokenReader) -> Result<Vec<CallArg>, SyntaxError> {
    expect(
        r,
        |t| t.is(TokenType::Punctuation, PUNC_LPAREN),
        format!("Expected '{PUNC_LPAREN}'"),
    )?;
    r.advance();
    let mut args = Vec::new();
    loop {
        r.skip_ignorable();
        if r.is_punct(PUNC_RPAREN) {
            r.advance();
            break;
        }
        let start = r.cur().map(|t| t.span.start).unwrap_or(r.source.len());
        let mut name = None;
        if let Some(t) = r.cur() {
            if t.token_type == TokenType::Identifier
                && r
                    .peek_significant()
                    .map(|n| n.is(TokenType::Operator, OP_ASSIGN) || n.value == ":")
                    .unwrap_or(false)
            {
                name = Some(t.value.clone());
                r.advance();
                r.skip_ignorable();
                r.advance();
                r.skip_ignorable();
            }
        }
        let value = parse_text_value(r, "string argument")?;
        args.push(CallArg {
            name,
            value,
            span: start..r.last_end(),
        });
        r.skip_ignorable();
        if r.is_punct(PUNC_COMMA) {
            r.advance();
            continue;
        }
        match r.cur() {
            Some(t) if t.is(TokenType::Punctuation, PUNC_RPAREN) => {}
            Some(t) => {
                let t = t.clone();
                return Err(make_error(
                    r,
                    &t,
                    format!("Expected '{PUNC_COMMA}' or '{PUNC_RPAREN}'"),
                ));
            }
            None => return Err(r.eof_error(format!("Expected '{PUNC_RPAREN}'"))),
        }
    }
    Ok(args)
}

/// Picks an argument by name, falling back to its position among unnamed ones.
pub fn arg(args: &[CallArg], name: &str, position: usize) -> Option<String> {
    if let Some(a) = args.iter().find(|a| a.name.as_deref() == Some(name)) {
        return Some(a.value.clone());
    }
    args.iter()
        .filter(|a| a.name.is_none())
        .nth(position)
        .map(|a| a.value.clone())
}

pub fn required_arg(
    r: &TokenReader,
    args: &[CallArg],
    name: &str,
    position: usize,
    func: &Token,
) -> Result<String, SyntaxError> {
    arg(args, name, position).ok_or_else(|| {
        r.create_error_with_file(
            format!("{}: missing argument `{name}`", func.value),
            func.span.clone(),
        )
    })
}
