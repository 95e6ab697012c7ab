use super::{AuthFuture, AuthProvider};
use crate::{client::request::PreparedRequest, core::error::DothttpError};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

lazy_static! {
    static ref PARAM_REGEX: Regex =
        Regex::new(r#"([A-Za-z][A-Za-z0-9_-]*)\s*=\s*(?:"([^"]*)"|([^,\s]*))"#).unwrap();
}

/// HTTP digest authentication (RFC 7616), answered after the first 401.
pub struct DigestProvider {
    user: String,
    pass: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Algorithm {
    Md5,
    Sha256,
}

impl Algorithm {
    fn parse(value: Option<&str>) -> Option<Self> {
        match value.map(|v| v.to_ascii_uppercase()).as_deref() {
            None | Some("MD5") => Some(Algorithm::Md5),
            Some("SHA-256") => Some(Algorithm::Sha256),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Sha256 => "SHA-256",
        }
    }

    fn hash(&self, data: &str) -> String {
        match self {
            Algorithm::Md5 => format!("{:x}", md5::compute(data.as_bytes())),
            Algorithm::Sha256 => hex::encode(Sha256::digest(data.as_bytes())),
        }
    }
}

fn parse_challenge(challenge: &str) -> Option<HashMap<String, String>> {
    let rest = challenge.trim();
    let (scheme, params) = rest.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("digest") {
        return None;
    }
    Some(
        PARAM_REGEX
            .captures_iter(params)
            .map(|c| {
                let value = c.get(2).or_else(|| c.get(3)).map_or("", |m| m.as_str());
                (c[1].to_ascii_lowercase(), value.to_string())
            })
            .collect(),
    )
}

impl DigestProvider {
    pub fn new(user: &str, pass: &str) -> Self {
        Self {
            user: user.to_string(),
            pass: pass.to_string(),
        }
    }

    /// Builds the `Authorization` value answering `challenge`.
    pub fn authorization(
        &self,
        challenge: &str,
        method: &str,
        uri: &str,
        cnonce: &str,
    ) -> Result<Option<String>, DothttpError> {
        let Some(params) = parse_challenge(challenge) else {
            return Ok(None);
        };
        let realm = params.get("realm").cloned().unwrap_or_default();
        let nonce = params.get("nonce").cloned().ok_or_else(|| {
            DothttpError::Network("digest challenge without a nonce".to_string())
        })?;
        let algorithm = Algorithm::parse(params.get("algorithm").map(String::as_str))
            .ok_or_else(|| {
                DothttpError::Network(format!(
                    "unsupported digest algorithm `{}`",
                    params.get("algorithm").map_or("", String::as_str)
                ))
            })?;
        let qop = params
            .get("qop")
            .filter(|q| q.split(',').any(|v| v.trim() == "auth"))
            .map(|_| "auth");

        let ha1 = algorithm.hash(&format!("{}:{realm}:{}", self.user, self.pass));
        let ha2 = algorithm.hash(&format!("{method}:{uri}"));
        let nc = "00000001";
        let response = match qop {
            Some(qop) => algorithm.hash(&format!("{ha1}:{nonce}:{nc}:{cnonce}:{qop}:{ha2}")),
            None => algorithm.hash(&format!("{ha1}:{nonce}:{ha2}")),
        };

        let mut header = format!(
            "Digest username=\"{}\", realm=\"{realm}\", nonce=\"{nonce}\", uri=\"{uri}\", response=\"{response}\", algorithm={}",
            self.user,
            algorithm.name()
        );
        if let Some(qop) = qop {
            header.push_str(&format!(", qop={qop}, nc={nc}, cnonce=\"{cnonce}\""));
        }
        if let Some(opaque) = params.get("opaque") {
            header.push_str(&format!(", opaque=\"{opaque}\""));
        }
        Ok(Some(header))
    }
}

impl AuthProvider for DigestProvider {
    fn auth_type(&self) -> &str {
        "digest"
    }

    fn apply<'a>(&'a self, _request: &'a mut PreparedRequest) -> AuthFuture<'a> {
        Box::pin(async move { Ok(()) })
    }

    fn answer_challenge(
        &self,
        challenge: &str,
        request: &mut PreparedRequest,
    ) -> Result<bool, DothttpError> {
        let url = request.parsed_url()?;
        let uri = match url.query() {
            Some(q) => format!("{}?{q}", url.path()),
            None => url.path().to_string(),
        };
        let cnonce = uuid::Uuid::new_v4().simple().to_string();
        match self.authorization(challenge, request.method.as_str(), &uri, &cnonce[..16])? {
            Some(value) => {
                request
                    .headers
                    .insert(reqwest::header::AUTHORIZATION.as_str(), value);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compiler::headers::Headers, syntax::HttpMethod};

    const CHALLENGE: &str = r#"Digest realm="testrealm@host.com", qop="auth,auth-int", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c403ebaf9f0171e9517f40e41""#;

    #[test]
    fn test_known_md5_response() {
        let provider = DigestProvider::new("Mufasa", "Circle Of Life");
        let header = provider
            .authorization(CHALLENGE, "GET", "/dir/index.html", "0a4f113b")
            .unwrap()
            .unwrap();
        assert!(header.contains(r#"response="6629fae49393a05397450978507c4ef1""#));
        assert!(header.contains("qop=auth, nc=00000001, cnonce=\"0a4f113b\""));
        assert!(header.ends_with(r#"opaque="5ccc069c403ebaf9f0171e9517f40e41""#));
    }

    #[test]
    fn test_non_digest_challenge_is_ignored() {
        let provider = DigestProvider::new("u", "p");
        assert_eq!(
            provider
                .authorization("Basic realm=\"x\"", "GET", "/", "c")
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_unknown_algorithm() {
        let provider = DigestProvider::new("u", "p");
        let err = provider
            .authorization(r#"Digest realm="r", nonce="n", algorithm=SHA-512"#, "GET", "/", "c")
            .unwrap_err();
        assert!(err.to_string().contains("SHA-512"));
    }

    #[test]
    fn test_answer_challenge_sets_header() {
        let provider = DigestProvider::new("u", "p");
        let mut req = PreparedRequest {
            method: HttpMethod::GET,
            url: "http://localhost/a?b=1".into(),
            headers: Headers::new(),
            body: None,
        };
        let challenge = r#"Digest realm="r", nonce="n", algorithm=SHA-256, qop="auth""#;
        assert!(provider.answer_challenge(challenge, &mut req).unwrap());
        let value = req.headers.get("authorization").unwrap();
        assert!(value.contains("uri=\"/a?b=1\""));
        assert!(value.contains("algorithm=SHA-256"));
    }
}
