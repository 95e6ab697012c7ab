use super::{parse_trait::Parse, utils::parse_text_value};
use crate::syntax::{
    ast::{Document, Import},
    error::SyntaxError,
    keywords::{KW_IMPORT, PUNC_SEMI},
    reader::{expect, TokenReader},
    token::TokenType,
};

/// Records `import "path";`. Loading the imported file happens after parsing.
pub struct ImportParser;
impl Parse for ImportParser {
    fn can_parse(&self, r: &TokenReader) -> bool {
        r.is_keyword(KW_IMPORT)
    }
    fn parse(&self, r: &mut TokenReader, doc: &mut Document) -> Result<(), SyntaxError> {
        let start = expect(
            r,
            |t| t.token_type == TokenType::Keyword && t.value == KW_IMPORT,
            format!("Expected '{KW_IMPORT}'"),
        )?
        .span
        .start;
        r.advance();
        r.skip_ignorable();
        let path = parse_text_value(r, "import path")?;
        r.skip_inline();
        if r.is_punct(PUNC_SEMI) {
            r.advance();
        }
        doc.imports.push(Import {
            path,
            span: start..r.last_end(),
        });
        Ok(())
    }
}
