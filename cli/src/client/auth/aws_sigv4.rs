use super::{AuthFuture, AuthProvider};
use crate::{
    client::request::PreparedRequest,
    core::{error::DothttpError, mime},
};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub const AMZ_DATE: &str = "x-amz-date";
pub const AMZ_CONTENT_SHA256: &str = "x-amz-content-sha256";
pub const AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";

/// AWS Signature Version 4 request signing.
pub struct AwsSigV4Provider {
    pub access_id: String,
    pub secret_key: String,
    pub service: String,
    pub region: String,
    pub session_token: Option<String>,
}

fn hmac_sha256(key: &[u8], data: &str) -> Result<Vec<u8>, DothttpError> {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(key).map_err(|e| DothttpError::Generic(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Percent-encodes everything except the RFC 3986 unreserved set.
fn uri_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

fn canonical_query(url: &url::Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k), uri_encode(&v)))
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

impl AwsSigV4Provider {
    fn scope(&self, date: &str) -> String {
        format!("{date}/{}/{}/aws4_request", self.region, self.service)
    }

    fn signing_key(&self, date: &str) -> Result<Vec<u8>, DothttpError> {
        let k_date = hmac_sha256(format!("AWS4{}", self.secret_key).as_bytes(), date)?;
        let k_region = hmac_sha256(&k_date, &self.region)?;
        let k_service = hmac_sha256(&k_region, &self.service)?;
        hmac_sha256(&k_service, "aws4_request")
    }

    /// Signs `request` as if sent at `now`.
    pub fn sign_at(
        &self,
        request: &mut PreparedRequest,
        now: DateTime<Utc>,
    ) -> Result<(), DothttpError> {
        let url = request.parsed_url()?;
        let host = match (url.host_str(), url.port()) {
            (Some(h), Some(p)) => format!("{h}:{p}"),
            (Some(h), None) => h.to_string(),
            (None, _) => {
                return Err(DothttpError::Network(format!(
                    "url `{}` has no host to sign",
                    request.url
                )))
            }
        };
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let payload_hash = hex::encode(Sha256::digest(request.body_bytes()));

        request.headers.insert(AMZ_DATE, amz_date.clone());
        request
            .headers
            .insert(AMZ_CONTENT_SHA256, payload_hash.clone());
        if let Some(token) = &self.session_token {
            request.headers.insert(AMZ_SECURITY_TOKEN, token.clone());
        }

        let mut signed: Vec<(String, String)> = request
            .headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.trim().to_string()))
            .filter(|(k, _)| k == mime::CONTENT_TYPE || k.starts_with("x-amz-"))
            .collect();
        signed.push(("host".to_string(), host));
        signed.sort();

        let canonical_headers: String = signed.iter().map(|(k, v)| format!("{k}:{v}\n")).collect();
        let signed_headers = signed
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let canonical_request = format!(
            "{}\n{}\n{}\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
            request.method.as_str(),
            url.path(),
            canonical_query(&url),
        );

        let scope = self.scope(&date);
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );
        let signature = hex::encode(hmac_sha256(&self.signing_key(&date)?, &string_to_sign)?);

        request.headers.insert(
            reqwest::header::AUTHORIZATION.as_str(),
            format!(
                "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
                self.access_id
            ),
        );
        Ok(())
    }
}

impl AuthProvider for AwsSigV4Provider {
    fn auth_type(&self) -> &str {
        "aws"
    }

    fn apply<'a>(&'a self, request: &'a mut PreparedRequest) -> AuthFuture<'a> {
        Box::pin(async move { self.sign_at(request, Utc::now()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compiler::headers::Headers, syntax::HttpMethod};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn provider(token: Option<&str>) -> AwsSigV4Provider {
        AwsSigV4Provider {
            access_id: "AKIDEXAMPLE".into(),
            secret_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".into(),
            service: "s3".into(),
            region: "us-west-2".into(),
            session_token: token.map(String::from),
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn test_uri_encode() {
        assert_eq!(uri_encode("a b/c~"), "a%20b%2Fc~");
    }

    #[test]
    fn test_sign_get() {
        let mut req = PreparedRequest {
            method: HttpMethod::GET,
            url: "https://s3.us-west-2.amazonaws.com/bucket/key?prefix=photos&list-type=2".into(),
            headers: Headers::new(),
            body: None,
        };
        provider(None).sign_at(&mut req, at()).unwrap();
        assert_eq!(req.headers.get(AMZ_DATE), Some("20240102T030405Z"));
        assert_eq!(
            req.headers.get(AMZ_CONTENT_SHA256),
            Some("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
        assert_eq!(
            req.headers.get("authorization"),
            Some("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240102/us-west-2/s3/aws4_request, SignedHeaders=host;x-amz-content-sha256;x-amz-date, Signature=80a9dbcf285703fed39d7ccb7f3d07d22a966156ef8eceb16778c1014273a6aa")
        );
    }

    #[test]
    fn test_sign_post_with_token() {
        let body = br#"{"a": 1}"#.to_vec();
        let mut req = PreparedRequest {
            method: HttpMethod::POST,
            url: "https://s3.us-west-2.amazonaws.com/bucket".into(),
            headers: [("Content-Type", "application/json")]
                .into_iter()
                .collect::<Headers>(),
            body: Some(body),
        };
        provider(Some("TOKEN")).sign_at(&mut req, at()).unwrap();
        assert_eq!(req.headers.get(AMZ_SECURITY_TOKEN), Some("TOKEN"));
        assert_eq!(
            req.headers.get("authorization"),
            Some("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240102/us-west-2/s3/aws4_request, SignedHeaders=content-type;host;x-amz-content-sha256;x-amz-date;x-amz-security-token, Signature=48318f72368d9c72d1854a15adba6076badf9c989f83eb38a33718c624d38a45")
        );
    }
}
