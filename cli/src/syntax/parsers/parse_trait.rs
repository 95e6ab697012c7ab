use crate::syntax::{ast::Document, error::SyntaxError, reader::TokenReader};

pub trait Parse {
    fn can_parse(&self, r: &TokenReader) -> bool;
    fn parse(&self, r: &mut TokenReader, doc: &mut Document) -> Result<(), SyntaxError>;
}
