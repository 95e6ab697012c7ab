use crate::{
    compiler::{
        headers::Headers,
        model::{HttpDef, Payload},
    },
    core::error::DothttpError,
    syntax::HttpMethod,
};
use url::Url;

/// The wire-level view of an [`HttpDef`] that auth providers sign.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    /// `None` for bodiless requests and for multipart, which is encoded by the transport.
    pub body: Option<Vec<u8>>,
}

impl PreparedRequest {
    pub fn from_def(def: &HttpDef) -> Self {
        Self {
            method: def.method,
            url: def.full_url(),
            headers: def.headers.clone(),
            body: def.payload.as_ref().and_then(Payload::body),
        }
    }

    pub fn parsed_url(&self) -> Result<Url, DothttpError> {
        Url::parse(&self.url)
            .map_err(|e| DothttpError::Network(format!("invalid url `{}`: {e}", self.url)))
    }

    pub fn body_bytes(&self) -> &[u8] {
        self.body.as_deref().unwrap_or_default()
    }
}
