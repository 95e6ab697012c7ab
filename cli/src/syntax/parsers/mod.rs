pub mod auth;
pub mod import;
pub mod json;
pub mod parse_trait;
pub mod payload;
pub mod request;
pub mod utils;
pub mod variable;

pub use import::ImportParser;
pub use parse_trait::Parse;
pub use request::RequestParser;
pub use variable::VariableParser;
