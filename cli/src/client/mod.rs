pub mod auth;
pub mod curl;
pub mod dothttp_client;
pub mod dothttp_client_models;
pub mod request;
pub mod session;

pub use dothttp_client::DothttpClient;
pub use dothttp_client_models::{DothttpConfig, Execution, Source};
pub use session::Session;
