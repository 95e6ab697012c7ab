pub mod aws_sigv4;
pub mod azure;
pub mod basic;
pub mod digest;
pub mod hawk;

use super::request::PreparedRequest;
use crate::{core::error::DothttpError, syntax::ast::AuthAst};
use std::future::Future;
use std::pin::Pin;

pub use aws_sigv4::AwsSigV4Provider;
pub use azure::AzureProvider;
pub use basic::BasicProvider;
pub use digest::DigestProvider;
pub use hawk::HawkProvider;

pub type AuthFuture<'a> = Pin<Box<dyn Future<Output = Result<(), DothttpError>> + Send + 'a>>;

pub trait AuthProvider: Send + Sync {
    #[allow(dead_code)]
    fn auth_type(&self) -> &str;

    /// Mutates the request before it is sent.
    fn apply<'a>(&'a self, request: &'a mut PreparedRequest) -> AuthFuture<'a>;

    /// Called with the `WWW-Authenticate` value of a 401. Returns true when the
    /// request was updated and should be sent again.
    fn answer_challenge(
        &self,
        _challenge: &str,
        _request: &mut PreparedRequest,
    ) -> Result<bool, DothttpError> {
        Ok(false)
    }
}

pub struct NtlmProvider;

impl AuthProvider for NtlmProvider {
    fn auth_type(&self) -> &str {
        "ntlm"
    }

    fn apply<'a>(&'a self, _request: &'a mut PreparedRequest) -> AuthFuture<'a> {
        Box::pin(async move {
            Err(DothttpError::Network(
                "ntlm authentication is not supported by this transport, use --curl".into(),
            ))
        })
    }
}

pub fn provider_for(auth: &AuthAst) -> Box<dyn AuthProvider> {
    match auth {
        AuthAst::Basic { user, pass } => Box::new(BasicProvider::new(user, pass)),
        AuthAst::Digest { user, pass } => Box::new(DigestProvider::new(user, pass)),
        AuthAst::Ntlm { .. } => Box::new(NtlmProvider),
        AuthAst::Hawk { id, key, algorithm } => {
            Box::new(HawkProvider::new(id, key, algorithm.as_deref()))
        }
        AuthAst::AwsV4 {
            access_id,
            secret_key,
            service,
            region,
            session_token,
        } => Box::new(AwsSigV4Provider {
            access_id: access_id.clone(),
            secret_key: secret_key.clone(),
            service: service.clone().unwrap_or_default(),
            region: region
                .clone()
                .unwrap_or_else(|| crate::compiler::aws::DEFAULT_REGION.to_string()),
            session_token: session_token.clone(),
        }),
        AuthAst::Azure(azure) => Box::new(AzureProvider::new(azure.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compiler::headers::Headers, syntax::HttpMethod};

    fn request() -> PreparedRequest {
        PreparedRequest {
            method: HttpMethod::GET,
            url: "http://localhost/".into(),
            headers: Headers::new(),
            body: None,
        }
    }

    #[test]
    fn test_provider_for_kinds() {
        let basic = provider_for(&AuthAst::Basic {
            user: "u".into(),
            pass: "p".into(),
        });
        assert_eq!(basic.auth_type(), "basic");
        let ntlm = provider_for(&AuthAst::Ntlm {
            user: "u".into(),
            pass: "p".into(),
        });
        assert_eq!(ntlm.auth_type(), "ntlm");
    }

    #[tokio::test]
    async fn test_ntlm_is_rejected() {
        let mut req = request();
        let err = NtlmProvider.apply(&mut req).await.unwrap_err();
        assert!(matches!(err, DothttpError::Network(_)));
        assert!(err.to_string().contains("ntlm"));
    }
}
