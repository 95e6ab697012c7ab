use super::{json::parse_json_value, parse_trait::Parse, utils::unquote};
use crate::syntax::{
    ast::{Document, VarBody, VarDecl},
    error::SyntaxError,
    keywords::{KW_VAR, OP_ASSIGN, PUNC_COMMA, PUNC_LPAREN, PUNC_RPAREN, PUNC_SEMI},
    reader::{expect, make_error, TokenReader},
    token::TokenType,
};

pub struct VariableParser;
impl Parse for VariableParser {
    fn can_parse(&self, r: &TokenReader) -> bool {
        r.is_keyword(KW_VAR)
    }
    fn parse(&self, r: &mut TokenReader, doc: &mut Document) -> Result<(), SyntaxError> {
        let var = parse_variable_declaration(r)?;
        doc.vars.push(var);
        Ok(())
    }
}

pub fn parse_variable_declaration(r: &mut TokenReader) -> Result<VarDecl, SyntaxError> {
    let start = expect(
        r,
        |t| t.token_type == TokenType::Keyword && t.value == KW_VAR,
        format!("Expected '{KW_VAR}'"),
    )?
    .span
    .start;
    r.advance();
    r.skip_ignorable();
    let name_tok = expect(
        r,
        |t| t.token_type == TokenType::Identifier && !t.value.starts_with('$'),
        "Expected identifier",
    )?;
    let name = name_tok.value.clone();
    r.advance();
    r.skip_ignorable();
    expect(
        r,
        |t| t.is(TokenType::Operator, OP_ASSIGN),
        format!("Expected '{OP_ASSIGN}'"),
    )?;
    r.advance();
    r.skip_ignorable();
    let body = parse_variable_body(r)?;
    r.skip_ignorable();
    expect(
        r,
        |t| t.is(TokenType::Punctuation, PUNC_SEMI),
        format!("Expected '{PUNC_SEMI}'"),
    )?;
    r.advance();

    Ok(VarDecl {
        name,
        body,
        span: start..r.last_end(),
    })
}

fn parse_variable_body(r: &mut TokenReader) -> Result<VarBody, SyntaxError> {
    let Some(tok) = r.cur().cloned() else {
        return Err(r.eof_error("Expected variable value"));
    };

    // `$name(args)`
    if tok.token_type == TokenType::Identifier
        && tok.value.starts_with('$')
        && r
            .peek(1)
            .map(|n| n.is(TokenType::Punctuation, PUNC_LPAREN))
            .unwrap_or(false)
    {
        r.advance();
        r.advance();
        let mut args = Vec::new();
        loop {
            r.skip_ignorable();
            let Some(t) = r.cur().cloned() else {
                return Err(r.eof_error(format!("Expected '{PUNC_RPAREN}'")));
            };
            if t.is(TokenType::Punctuation, PUNC_RPAREN) {
                r.advance();
                break;
            }
            match t.token_type {
                TokenType::String | TokenType::TripleString => args.push(unquote(&t).value),
                TokenType::Number | TokenType::Identifier | TokenType::Placeholder => {
                    args.push(t.value.clone())
                }
                _ => return Err(make_error(r, &t, "Expected function argument")),
            }
            r.advance();
            r.skip_ignorable();
            if r.is_punct(PUNC_COMMA) {
                r.advance();
            }
        }
        return Ok(VarBody::Function {
            name: tok.value[1..].to_string(),
            args,
        });
    }

    // `p"template"` with no space between the prefix and the string
    if tok.is(TokenType::Identifier, "p") {
        if let Some(next) = r.peek(1).cloned() {
            if next.is_string() && next.span.start == tok.span.end {
                r.advance();
                r.advance();
                return Ok(VarBody::Template(unquote(&next).value));
            }
        }
    }

    Ok(VarBody::Value(parse_json_value(r)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{
        ast::{JsonAst, JsonKey, StrLit},
        tokenize::tokenize,
    };
    use std::path::PathBuf;

    fn parse(src: &str) -> Result<VarDecl, SyntaxError> {
        let mut r = TokenReader::new(tokenize(src).unwrap(), PathBuf::new(), src.to_string());
        parse_variable_declaration(&mut r)
    }

    #[test]
    fn test_literal() {
        let var = parse(r#"var token = "abc";"#).unwrap();
        assert_eq!(var.name, "token");
        assert_eq!(var.body, VarBody::Value(JsonAst::Str(StrLit::double("abc"))));
    }

    #[test]
    fn test_json_with_reference() {
        let var = parse(r#"var obj = {"a": token};"#).unwrap();
        assert_eq!(
            var.body,
            VarBody::Value(JsonAst::Object(vec![(
                JsonKey::Str(StrLit::double("a")),
                JsonAst::VarRef("token".into())
            )]))
        );
    }

    #[test]
    fn test_expression() {
        let var = parse("var sec = 60 * 60;").unwrap();
        assert_eq!(var.body, VarBody::Value(JsonAst::Expr("60 * 60".into())));
    }

    #[test]
    fn test_function() {
        let var = parse("var id = $randomStr(8);").unwrap();
        assert_eq!(
            var.body,
            VarBody::Function {
                name: "randomStr".into(),
                args: vec!["8".into()]
            }
        );
    }

    #[test]
    fn test_template() {
        let var = parse(r#"var greeting = p"hello {name}";"#).unwrap();
        assert_eq!(var.body, VarBody::Template("hello {name}".into()));
    }

    #[test]
    fn test_missing_semicolon() {
        let err = parse(r#"var a = "x""#).unwrap_err();
        assert_eq!(err.message, "Expected ';'");
    }
}
