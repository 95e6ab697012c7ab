use super::utils::unquote;
use crate::syntax::{
    ast::{JsonAst, JsonKey},
    error::SyntaxError,
    keywords::{
        PUNC_COLON, PUNC_COMMA, PUNC_LBRACE, PUNC_LBRACKET, PUNC_LPAREN, PUNC_RBRACE,
        PUNC_RBRACKET, PUNC_RPAREN,
    },
    reader::{expect, make_error, TokenReader},
    token::{Token, TokenType},
};

const ARITHMETIC: &[&str] = &["+", "-", "*", "/", "%", "**"];

fn is_arithmetic(t: &Token) -> bool {
    t.token_type == TokenType::Operator && ARITHMETIC.contains(&t.value.as_str())
}

fn is_operand(t: &Token) -> bool {
    matches!(
        t.token_type,
        TokenType::Number | TokenType::Identifier | TokenType::Placeholder
    )
}

/// Parses a JSON-like value: JSON literals plus placeholders, bare names and arithmetic.
pub fn parse_json_value(r: &mut TokenReader) -> Result<JsonAst, SyntaxError> {
    r.skip_ignorable();
    let Some(tok) = r.cur().cloned() else {
        return Err(r.eof_error("Expected JSON value"));
    };

    let starts_expr = tok.is(TokenType::Punctuation, PUNC_LPAREN)
        || tok.is(TokenType::Operator, "-")
        || (is_operand(&tok) && r.peek_significant().map(is_arithmetic).unwrap_or(false));
    if starts_expr {
        return parse_expression(r);
    }

    match tok.token_type {
        TokenType::Punctuation if tok.value == PUNC_LBRACE => parse_object(r),
        TokenType::Punctuation if tok.value == PUNC_LBRACKET => parse_array(r),
        TokenType::String | TokenType::TripleString => {
            r.advance();
            Ok(JsonAst::Str(unquote(&tok)))
        }
        TokenType::Number => {
            r.advance();
            Ok(JsonAst::Number(tok.value))
        }
        TokenType::Placeholder => {
            r.advance();
            Ok(JsonAst::VarRef(tok.value))
        }
        TokenType::Identifier => {
            r.advance();
            Ok(match tok.value.as_str() {
                "true" | "True" => JsonAst::Bool(true),
                "false" | "False" => JsonAst::Bool(false),
                "null" | "None" => JsonAst::Null,
                _ => JsonAst::VarRef(tok.value),
            })
        }
        _ => Err(make_error(r, &tok, "Expected JSON value")),
    }
}

fn parse_object(r: &mut TokenReader) -> Result<JsonAst, SyntaxError> {
    r.advance();
    let mut members = Vec::new();
    loop {
        r.skip_ignorable();
        if r.is_punct(PUNC_RBRACE) {
            r.advance();
            break;
        }
        let key_tok = expect(
            r,
            |t| t.is_string() || t.token_type == TokenType::Placeholder,
            "Expected object key",
        )?;
        let key = if key_tok.token_type == TokenType::Placeholder {
            JsonKey::Var(key_tok.value.clone())
        } else {
            JsonKey::Str(unquote(&key_tok))
        };
        r.advance();
        r.skip_ignorable();
        expect(
            r,
            |t| t.is(TokenType::Punctuation, PUNC_COLON),
            format!("Expected '{PUNC_COLON}'"),
        )?;
        r.advance();
        let value = parse_json_value(r)?;
        members.push((key, value));
        r.skip_ignorable();
        if r.is_punct(PUNC_COMMA) {
            r.advance();
            continue;
        }
        expect(
            r,
            |t| t.is(TokenType::Punctuation, PUNC_RBRACE),
            format!("Expected '{PUNC_COMMA}' or '{PUNC_RBRACE}'"),
        )?;
    }
    Ok(JsonAst::Object(members))
}

fn parse_array(r: &mut TokenReader) -> Result<JsonAst, SyntaxError> {
    r.advance();
    let mut items = Vec::new();
    loop {
        r.skip_ignorable();
        if r.is_punct(PUNC_RBRACKET) {
            r.advance();
            break;
        }
        items.push(parse_json_value(r)?);
        r.skip_ignorable();
        if r.is_punct(PUNC_COMMA) {
            r.advance();
            continue;
        }
        expect(
            r,
            |t| t.is(TokenType::Punctuation, PUNC_RBRACKET),
            format!("Expected '{PUNC_COMMA}' or '{PUNC_RBRACKET}'"),
        )?;
    }
    Ok(JsonAst::Array(items))
}

/// Collects an arithmetic expression and keeps it as written.
fn parse_expression(r: &mut TokenReader) -> Result<JsonAst, SyntaxError> {
    let start = r.cur().map(|t| t.span.start).unwrap_or(r.source.len());
    let mut depth = 0usize;
    let mut expect_operand = true;
    while let Some(tok) = r.cur().cloned() {
        if matches!(tok.token_type, TokenType::Whitespace | TokenType::Comment) {
            r.advance();
            continue;
        }
        if tok.token_type == TokenType::Newline {
            if depth == 0 && !expect_operand {
                break;
            }
            r.advance();
            continue;
        }
        if tok.is(TokenType::Punctuation, PUNC_LPAREN) {
            depth += 1;
            expect_operand = true;
        } else if tok.is(TokenType::Punctuation, PUNC_RPAREN) {
            if depth == 0 {
                break;
            }
            depth -= 1;
            expect_operand = false;
        } else if is_arithmetic(&tok) {
            expect_operand = true;
        } else if is_operand(&tok) {
            if !expect_operand {
                break;
            }
            expect_operand = false;
        } else {
            break;
        }
        r.advance();
    }
    let end = r.last_end();
    if depth != 0 || expect_operand {
        return Err(r.create_error_with_file(
            "Incomplete arithmetic expression".into(),
            start..end.max(start),
        ));
    }
    let text = r.source[start..end].to_string();
    // A lone negative number stays a number.
    if text.starts_with('-') && text[1..].trim().parse::<f64>().is_ok() {
        return Ok(JsonAst::Number(format!("-{}", text[1..].trim())));
    }
    Ok(JsonAst::Expr(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{ast::StrLit, tokenize::tokenize};
    use std::path::PathBuf;

    fn parse(src: &str) -> JsonAst {
        let mut r = TokenReader::new(tokenize(src).unwrap(), PathBuf::new(), src.to_string());
        parse_json_value(&mut r).unwrap()
    }

    #[test]
    fn test_nested_object_and_array() {
        let ast = parse(r#"{"a": [1, {"b": true}], "c": null}"#);
        assert_eq!(
            ast,
            JsonAst::Object(vec![
                (
                    JsonKey::Str(StrLit::double("a")),
                    JsonAst::Array(vec![
                        JsonAst::Number("1".into()),
                        JsonAst::Object(vec![(
                            JsonKey::Str(StrLit::double("b")),
                            JsonAst::Bool(true)
                        )]),
                    ])
                ),
                (JsonKey::Str(StrLit::double("c")), JsonAst::Null),
            ])
        );
    }

    #[test]
    fn test_placeholder_key_and_value() {
        let ast = parse(r#"{ {{key}}: {{value}} }"#);
        assert_eq!(
            ast,
            JsonAst::Object(vec![(
                JsonKey::Var("{{key}}".into()),
                JsonAst::VarRef("{{value}}".into())
            )])
        );
    }

    #[test]
    fn test_expression_is_kept_as_text() {
        let ast = parse(r#"{"sum": 1 + 2 * (3 - 1), "n": 4}"#);
        let JsonAst::Object(members) = ast else {
            panic!("expected object");
        };
        assert_eq!(members[0].1, JsonAst::Expr("1 + 2 * (3 - 1)".into()));
        assert_eq!(members[1].1, JsonAst::Number("4".into()));
    }

    #[test]
    fn test_negative_number() {
        assert_eq!(parse("-12"), JsonAst::Number("-12".into()));
    }

    #[test]
    fn test_trailing_comma_allowed() {
        assert_eq!(
            parse("[1, 2,]"),
            JsonAst::Array(vec![JsonAst::Number("1".into()), JsonAst::Number("2".into())])
        );
    }

    #[test]
    fn test_missing_colon_is_error() {
        let src = r#"{"a" 1}"#;
        let mut r = TokenReader::new(tokenize(src).unwrap(), PathBuf::new(), src.to_string());
        let err = parse_json_value(&mut r).unwrap_err();
        assert!(err.message.contains("Expected ':'"));
    }
}
