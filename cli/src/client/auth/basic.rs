use super::{AuthFuture, AuthProvider};
use crate::client::request::PreparedRequest;
use base64::{engine::general_purpose::STANDARD, Engine as _};

pub struct BasicProvider {
    user: String,
    pass: String,
}

impl BasicProvider {
    pub fn new(user: &str, pass: &str) -> Self {
        Self {
            user: user.to_string(),
            pass: pass.to_string(),
        }
    }

    pub fn header_value(&self) -> String {
        format!(
            "Basic {}",
            STANDARD.encode(format!("{}:{}", self.user, self.pass))
        )
    }
}

impl AuthProvider for BasicProvider {
    fn auth_type(&self) -> &str {
        "basic"
    }

    fn apply<'a>(&'a self, request: &'a mut PreparedRequest) -> AuthFuture<'a> {
        Box::pin(async move {
            request
                .headers
                .insert(reqwest::header::AUTHORIZATION.as_str(), self.header_value());
            Ok(())
        })
    }
}
