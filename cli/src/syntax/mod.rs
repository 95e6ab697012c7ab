pub mod analyze;
pub mod ast;
pub mod error;
pub mod format;
pub mod http_method;
pub mod keywords;
pub mod parsers;
pub mod position;
pub mod reader;
pub mod token;
pub mod tokenize;

pub use analyze::{parse, parse_file};
pub use ast::{Document, RequestNode};
pub use error::SyntaxError;
pub use http_method::HttpMethod;
