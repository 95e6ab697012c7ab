use super::{AuthFuture, AuthProvider};
use crate::{
    client::request::PreparedRequest,
    compiler::DEFAULT_HAWK_ALGORITHM,
    core::{error::DothttpError, mime},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Digest, Sha256};

pub struct HawkProvider {
    id: String,
    key: String,
    algorithm: String,
}

impl HawkProvider {
    pub fn new(id: &str, key: &str, algorithm: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            key: key.to_string(),
            algorithm: algorithm
                .unwrap_or(DEFAULT_HAWK_ALGORITHM)
                .to_ascii_lowercase(),
        }
    }

    fn hash(&self, data: &[u8]) -> Result<Vec<u8>, DothttpError> {
        match self.algorithm.as_str() {
            "sha256" => Ok(Sha256::digest(data).to_vec()),
            "sha1" => Ok(Sha1::digest(data).to_vec()),
            other => Err(unsupported(other)),
        }
    }

    fn mac(&self, data: &[u8]) -> Result<Vec<u8>, DothttpError> {
        let key = self.key.as_bytes();
        match self.algorithm.as_str() {
            "sha256" => {
                let mut mac = Hmac::<Sha256>::new_from_slice(key)
                    .map_err(|e| DothttpError::Generic(e.to_string()))?;
                mac.update(data);
                Ok(mac.finalize().into_bytes().to_vec())
            }
            "sha1" => {
                let mut mac = Hmac::<Sha1>::new_from_slice(key)
                    .map_err(|e| DothttpError::Generic(e.to_string()))?;
                mac.update(data);
                Ok(mac.finalize().into_bytes().to_vec())
            }
            other => Err(unsupported(other)),
        }
    }

    /// `Authorization` value for a fixed timestamp and nonce.
    pub fn header_at(
        &self,
        request: &PreparedRequest,
        ts: i64,
        nonce: &str,
    ) -> Result<String, DothttpError> {
        let url = request.parsed_url()?;
        let resource = match url.query() {
            Some(q) => format!("{}?{q}", url.path()),
            None => url.path().to_string(),
        };
        let host = url.host_str().unwrap_or_default();
        let port = url.port_or_known_default().unwrap_or(80);

        let payload_hash = match &request.body {
            Some(body) => {
                let content_type = request
                    .headers
                    .get(mime::CONTENT_TYPE)
                    .map(mime::essence)
                    .unwrap_or_default();
                let mut normalized = format!("hawk.1.payload\n{content_type}\n").into_bytes();
                normalized.extend_from_slice(body);
                normalized.push(b'\n');
                Some(STANDARD.encode(self.hash(&normalized)?))
            }
            None => None,
        };

        let normalized = format!(
            "hawk.1.header\n{ts}\n{nonce}\n{}\n{resource}\n{host}\n{port}\n{}\n\n",
            request.method.as_str(),
            payload_hash.as_deref().unwrap_or_default()
        );
        let mac = STANDARD.encode(self.mac(normalized.as_bytes())?);

        let mut header = format!("Hawk id=\"{}\", ts=\"{ts}\", nonce=\"{nonce}\"", self.id);
        if let Some(hash) = payload_hash {
            header.push_str(&format!(", hash=\"{hash}\""));
        }
        header.push_str(&format!(", mac=\"{mac}\""));
        Ok(header)
    }
}

fn unsupported(algorithm: &str) -> DothttpError {
    DothttpError::AuthConfigIncomplete(format!(
        "hawk algorithm `{algorithm}` is not supported, use sha256 or sha1"
    ))
}

impl AuthProvider for HawkProvider {
    fn auth_type(&self) -> &str {
        "hawk"
    }

    fn apply<'a>(&'a self, request: &'a mut PreparedRequest) -> AuthFuture<'a> {
        Box::pin(async move {
            let ts = chrono::Utc::now().timestamp();
            let nonce = crate::property::generators::random_str(Some(6));
            let header = self.header_at(request, ts, &nonce)?;
            request
                .headers
                .insert(reqwest::header::AUTHORIZATION.as_str(), header);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compiler::headers::Headers, syntax::HttpMethod};

    const KEY: &str = "werxhqb98rpaxn39848xrunpaw3489ruxnpa98w4rxn";

    fn request(method: HttpMethod, body: Option<&str>) -> PreparedRequest {
        let mut headers = Headers::new();
        if body.is_some() {
            headers.insert("Content-Type", "text/plain");
        }
        PreparedRequest {
            method,
            url: "http://example.com:8000/resource/1?b=1&a=2".into(),
            headers,
            body: body.map(|b| b.as_bytes().to_vec()),
        }
    }

    #[test]
    fn test_header_without_payload() {
        let provider = HawkProvider::new("dh37fgj492je", KEY, None);
        let header = provider
            .header_at(&request(HttpMethod::GET, None), 1353832234, "j4h3g2")
            .unwrap();
        assert_eq!(
            header,
            r#"Hawk id="dh37fgj492je", ts="1353832234", nonce="j4h3g2", mac="nfp3t5BVkMvjhU3PrD0ftTp7NcVpETEX2HEi/Fo4S2g=""#
        );
    }

    #[test]
    fn test_header_with_payload_hash() {
        let provider = HawkProvider::new("dh37fgj492je", KEY, Some("sha256"));
        let header = provider
            .header_at(
                &request(HttpMethod::POST, Some("Thank you for flying Hawk")),
                1353832234,
                "j4h3g2",
            )
            .unwrap();
        assert!(header.contains(r#"hash="Yi9LfIIFRtBEPt74PVmbTF/xVAwPn7ub15ePICfgnuY=""#));
        assert!(header.ends_with(r#"mac="xMQacUaeJiezHpLu67V4Zc90BK53KGSS4VNYp2M3E3o=""#));
    }

    #[test]
    fn test_sha1_and_unknown_algorithm() {
        let sha1 = HawkProvider::new("dh37fgj492je", KEY, Some("SHA1"));
        let header = sha1
            .header_at(&request(HttpMethod::GET, None), 1353832234, "j4h3g2")
            .unwrap();
        assert!(header.ends_with(r#"mac="ic6931LDf4AXFTV+ikHjEoHh5AM=""#));

        let md5 = HawkProvider::new("id", KEY, Some("md5"));
        assert!(md5
            .header_at(&request(HttpMethod::GET, None), 1, "n")
            .is_err());
    }
}
