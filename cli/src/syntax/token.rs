#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    Keyword,
    Identifier,
    Annotation,
    Number,
    String,
    TripleString,
    Placeholder,
    Script,
    Operator,
    Punctuation,
    Whitespace,
    Newline,
    Comment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub span: std::ops::Range<usize>,
}

impl Token {
    pub fn is(&self, token_type: TokenType, value: &str) -> bool {
        self.token_type == token_type && self.value == value
    }

    pub fn is_string(&self) -> bool {
        matches!(self.token_type, TokenType::String | TokenType::TripleString)
    }
}
