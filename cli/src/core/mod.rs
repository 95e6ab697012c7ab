pub mod error;
pub mod exit_code;
pub mod logger;
pub mod mime;
pub mod paths;
pub mod version;
