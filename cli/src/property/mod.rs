pub mod expression;
pub mod generators;
pub mod json_eval;
pub mod property_file;
pub mod resolver;

pub use property_file::PropertyFile;
pub use resolver::PropertyResolver;
