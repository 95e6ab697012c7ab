use super::{AuthFuture, AuthProvider};
use crate::{
    client::request::PreparedRequest,
    core::{error::DothttpError, paths},
    syntax::ast::AzureAuthAst,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use indexmap::IndexMap;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use openssl::pkcs12::Pkcs12;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Seconds of validity a cached token must still have to be reused.
const EXPIRY_MARGIN: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_on: i64,
}

/// Access tokens persisted in a JSON file under the home directory.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> IndexMap<String, CachedToken> {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let now = chrono::Utc::now().timestamp();
        self.read_all()
            .get(key)
            .filter(|t| t.expires_on > now + EXPIRY_MARGIN)
            .map(|t| t.access_token.clone())
    }

    pub fn store(&self, key: &str, token: CachedToken) -> Result<(), DothttpError> {
        let mut all = self.read_all();
        all.insert(key.to_string(), token);
        let text = serde_json::to_string_pretty(&all)
            .map_err(|e| DothttpError::Generic(e.to_string()))?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    #[serde(default, rename = "expires_on")]
    expires_on: Option<i64>,
}

pub struct AzureProvider {
    auth: AzureAuthAst,
    authority: String,
    sp_cache: TokenCache,
    cli_cache: TokenCache,
}

fn auth_error(message: impl Into<String>) -> DothttpError {
    DothttpError::Network(format!("azure auth failed: {}", message.into()))
}

/// DER certificate and PEM private key from a PEM bundle or a PKCS#12 archive.
fn load_certificate(path: &Path, password: Option<&str>) -> Result<(Vec<u8>, Vec<u8>), DothttpError> {
    let content = std::fs::read(path)
        .map_err(|_| DothttpError::file_not_found(crate::core::error::FileKind::Certificate, paths::clean_path(path)))?;
    if String::from_utf8_lossy(&content).contains("-----BEGIN") {
        let pems = pem::parse_many(&content)
            .map_err(|e| auth_error(format!("failed to parse PEM file: {e}")))?;
        let cert = pems
            .iter()
            .find(|p| p.tag() == "CERTIFICATE")
            .ok_or_else(|| auth_error("no CERTIFICATE found in PEM file"))?;
        let key = pems
            .iter()
            .find(|p| p.tag().contains("PRIVATE KEY"))
            .ok_or_else(|| auth_error("no unencrypted PRIVATE KEY found in PEM file"))?;
        Ok((cert.contents().to_vec(), pem::encode(key).into_bytes()))
    } else {
        let parsed = Pkcs12::from_der(&content)
            .and_then(|p12| p12.parse2(password.unwrap_or("")))
            .map_err(|e| auth_error(format!("failed to parse P12: {e}")))?;
        let cert = parsed
            .cert
            .ok_or_else(|| auth_error("no certificate found in P12"))?;
        let key = parsed
            .pkey
            .ok_or_else(|| auth_error("no private key found in P12"))?;
        let der = cert
            .to_der()
            .map_err(|e| auth_error(format!("failed to export certificate: {e}")))?;
        let key_pem = key
            .private_key_to_pem_pkcs8()
            .map_err(|e| auth_error(format!("failed to export private key: {e}")))?;
        Ok((der, key_pem))
    }
}

/// Signed `private_key_jwt` client assertion for `token_url`.
pub fn client_assertion(
    client_id: &str,
    token_url: &str,
    cert_der: &[u8],
    key_pem: &[u8],
) -> Result<String, DothttpError> {
    let x5t = URL_SAFE_NO_PAD.encode(Sha1::digest(cert_der));
    let now = chrono::Utc::now().timestamp();
    let claims = serde_json::json!({
        "iss": client_id,
        "sub": client_id,
        "aud": token_url,
        "jti": Uuid::new_v4().to_string(),
        "nbf": now - 60,
        "exp": now + 300
    });
    let mut header = Header::new(Algorithm::RS256);
    header.x5t = Some(x5t);
    header.typ = Some("JWT".to_string());
    let key = EncodingKey::from_rsa_pem(key_pem)
        .map_err(|e| auth_error(format!("failed to load private key: {e}")))?;
    encode(&header, &claims, &key).map_err(|e| auth_error(format!("failed to sign JWT: {e}")))
}

impl AzureProvider {
    pub fn new(auth: AzureAuthAst) -> Self {
        Self {
            auth,
            authority: DEFAULT_AUTHORITY.to_string(),
            sp_cache: TokenCache::new(paths::azure_sp_token_cache()),
            cli_cache: TokenCache::new(paths::azure_cli_token_cache()),
        }
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    pub fn with_caches(mut self, sp_cache: TokenCache, cli_cache: TokenCache) -> Self {
        self.sp_cache = sp_cache;
        self.cli_cache = cli_cache;
        self
    }

    fn token_url(&self, tenant_id: &str) -> String {
        format!(
            "{}/{tenant_id}/oauth2/v2.0/token",
            self.authority.trim_end_matches('/')
        )
    }

    async fn client_credentials(
        &self,
        tenant_id: &str,
        client_id: &str,
        credential: (&str, String),
        scope: &str,
    ) -> Result<String, DothttpError> {
        let key = format!("{tenant_id}:{client_id}:{scope}");
        if let Some(token) = self.sp_cache.get(&key) {
            debug!("using cached azure token for `{client_id}`");
            return Ok(token);
        }
        let token_url = self.token_url(tenant_id);
        let mut params = vec![
            ("grant_type", "client_credentials".to_string()),
            ("client_id", client_id.to_string()),
            ("scope", scope.to_string()),
        ];
        match credential {
            ("client_secret", secret) => params.push(("client_secret", secret)),
            (_, assertion) => {
                params.push((
                    "client_assertion_type",
                    "urn:ietf:params:oauth:client-assertion-type:jwt-bearer".to_string(),
                ));
                params.push(("client_assertion", assertion));
            }
        }

        let client = reqwest::Client::builder()
            .user_agent(crate::core::version::user_agent())
            .build()?;
        let response = client.post(&token_url).form(&params).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(auth_error(format!(
                "token request to {token_url} for client {client_id} returned {status}: {text}"
            )));
        }
        let token: TokenResponse = response.json().await?;
        let expires_on = chrono::Utc::now().timestamp() + token.expires_in.unwrap_or(300);
        if let Err(e) = self.sp_cache.store(
            &key,
            CachedToken {
                access_token: token.access_token.clone(),
                expires_on,
            },
        ) {
            warn!("could not write azure token cache: {e}");
        }
        Ok(token.access_token)
    }

    async fn cli_token(&self, scope: &str) -> Result<String, DothttpError> {
        if let Some(token) = self.cli_cache.get(scope) {
            debug!("using cached azure cli token for `{scope}`");
            return Ok(token);
        }
        let output = tokio::process::Command::new("az")
            .args(["account", "get-access-token", "--scope", scope, "-o", "json"])
            .output()
            .await
            .map_err(|e| auth_error(format!("could not run `az`: {e}")))?;
        if !output.status.success() {
            return Err(auth_error(format!(
                "`az account get-access-token` failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let token: CliToken = serde_json::from_slice(&output.stdout)
            .map_err(|e| auth_error(format!("unexpected `az` output: {e}")))?;
        let expires_on = token
            .expires_on
            .unwrap_or_else(|| chrono::Utc::now().timestamp() + 300);
        if let Err(e) = self.cli_cache.store(
            scope,
            CachedToken {
                access_token: token.access_token.clone(),
                expires_on,
            },
        ) {
            warn!("could not write azure token cache: {e}");
        }
        Ok(token.access_token)
    }

    pub async fn access_token(&self) -> Result<String, DothttpError> {
        let default_scope = crate::compiler::DEFAULT_AZURE_SCOPE;
        match &self.auth {
            AzureAuthAst::ServicePrincipal {
                tenant_id,
                client_id,
                client_secret,
                scope,
            } => {
                self.client_credentials(
                    tenant_id,
                    client_id,
                    ("client_secret", client_secret.clone()),
                    scope.as_deref().unwrap_or(default_scope),
                )
                .await
            }
            AzureAuthAst::Certificate {
                tenant_id,
                client_id,
                certificate_path,
                certificate_password,
                scope,
            } => {
                let (der, key) =
                    load_certificate(Path::new(certificate_path), certificate_password.as_deref())?;
                let assertion = client_assertion(client_id, &self.token_url(tenant_id), &der, &key)?;
                self.client_credentials(
                    tenant_id,
                    client_id,
                    ("client_assertion", assertion),
                    scope.as_deref().unwrap_or(default_scope),
                )
                .await
            }
            AzureAuthAst::Cli { scope } | AzureAuthAst::DeviceCode { scope } => {
                self.cli_token(scope.as_deref().unwrap_or(default_scope)).await
            }
        }
    }
}

impl AuthProvider for AzureProvider {
    fn auth_type(&self) -> &str {
        "azure"
    }

    fn apply<'a>(&'a self, request: &'a mut PreparedRequest) -> AuthFuture<'a> {
        Box::pin(async move {
            let token = self.access_token().await?;
            request.headers.insert(
                reqwest::header::AUTHORIZATION.as_str(),
                format!("Bearer {token}"),
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compiler::headers::Headers, syntax::HttpMethod};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn caches(dir: &tempfile::TempDir) -> (TokenCache, TokenCache) {
        (
            TokenCache::new(dir.path().join("sp.json")),
            TokenCache::new(dir.path().join("cli.json")),
        )
    }

    #[test]
    fn test_token_cache_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("cache.json"));
        let now = chrono::Utc::now().timestamp();
        cache
            .store(
                "fresh",
                CachedToken {
                    access_token: "a".into(),
                    expires_on: now + 3600,
                },
            )
            .unwrap();
        cache
            .store(
                "stale",
                CachedToken {
                    access_token: "b".into(),
                    expires_on: now + 10,
                },
            )
            .unwrap();
        assert_eq!(cache.get("fresh"), Some("a".to_string()));
        assert_eq!(cache.get("stale"), None);
        assert_eq!(cache.get("missing"), None);
    }

    #[tokio::test]
    async fn test_service_principal_secret_flow() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .and(body_string_contains("client_secret=s3cret"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (sp, cli) = caches(&dir);
        let provider = AzureProvider::new(AzureAuthAst::ServicePrincipal {
            tenant_id: "tenant".into(),
            client_id: "client".into(),
            client_secret: "s3cret".into(),
            scope: None,
        })
        .with_authority(server.uri())
        .with_caches(sp, cli);

        let mut req = PreparedRequest {
            method: HttpMethod::GET,
            url: "https://management.azure.com/subscriptions".into(),
            headers: Headers::new(),
            body: None,
        };
        provider.apply(&mut req).await.unwrap();
        assert_eq!(req.headers.get("authorization"), Some("Bearer tok"));

        // second call is served from the cache
        assert_eq!(provider.access_token().await.unwrap(), "tok");
    }

    #[tokio::test]
    async fn test_token_endpoint_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let (sp, cli) = caches(&dir);
        let provider = AzureProvider::new(AzureAuthAst::ServicePrincipal {
            tenant_id: "t".into(),
            client_id: "c".into(),
            client_secret: "s".into(),
            scope: Some("api://x/.default".into()),
        })
        .with_authority(server.uri())
        .with_caches(sp, cli);
        let err = provider.access_token().await.unwrap_err();
        assert!(err.to_string().contains("invalid_client"));
    }

    #[test]
    fn test_missing_certificate_file() {
        let err = load_certificate(Path::new("/nonexistent/cert.pem"), None).unwrap_err();
        assert!(matches!(err, DothttpError::FileNotFound { .. }));
    }
}
