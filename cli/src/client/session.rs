use super::{
    auth::{self, AuthProvider},
    request::PreparedRequest,
};
use crate::{
    compiler::model::{HttpDef, Payload},
    core::{
        error::{DothttpError, FileKind},
        paths::clean_path,
        version,
    },
    syntax::ast::CertAst,
};
use reqwest::{cookie::Jar, multipart, Client, Identity, StatusCode};
use std::{path::Path, sync::Arc};
use tracing::debug;

pub const UNIX_SCHEME: &str = "http+unix://";

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub version: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Cookie state shared by every request of one process.
#[derive(Clone)]
pub struct Session {
    jar: Arc<Jar>,
    use_cookies: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(true)
    }
}

fn read(path: &str, kind: FileKind) -> Result<Vec<u8>, DothttpError> {
    std::fs::read(path).map_err(|_| DothttpError::file_not_found(kind, path))
}

fn identity(cert: &CertAst) -> Result<Identity, DothttpError> {
    match cert {
        CertAst::Pem {
            cert_path,
            key_path,
        } => {
            let cert = read(cert_path, FileKind::Certificate)?;
            let key = match key_path {
                Some(k) => read(k, FileKind::Certificate)?,
                None => cert.clone(),
            };
            Ok(Identity::from_pkcs8_pem(&cert, &key)?)
        }
        CertAst::P12 { path, password } => {
            let der = read(path, FileKind::Certificate)?;
            Ok(Identity::from_pkcs12_der(
                &der,
                password.as_deref().unwrap_or(""),
            )?)
        }
    }
}

fn multipart_form(parts: &[crate::compiler::model::Part]) -> Result<multipart::Form, DothttpError> {
    let mut form = multipart::Form::new();
    for part in parts {
        let mut body = multipart::Part::bytes(part.content.clone());
        if let Some(filename) = &part.filename {
            body = body.file_name(filename.clone());
        }
        if let Some(mime) = &part.mime {
            body = body.mime_str(mime)?;
        }
        form = form.part(part.name.clone(), body);
    }
    Ok(form)
}

impl Session {
    pub fn new(use_cookies: bool) -> Self {
        Self {
            jar: Arc::new(Jar::default()),
            use_cookies,
        }
    }

    fn client_for(&self, def: &HttpDef) -> Result<Client, DothttpError> {
        let mut builder = Client::builder()
            .user_agent(version::user_agent())
            .danger_accept_invalid_certs(def.allow_insecure);
        if self.use_cookies && !def.session_clear {
            builder = builder.cookie_provider(self.jar.clone());
        }
        if let Some(cert) = &def.certificate {
            builder = builder.identity(identity(cert)?);
        }
        if let Some(proxy) = &def.proxy.http {
            builder = builder.proxy(reqwest::Proxy::http(proxy)?);
        }
        if let Some(proxy) = &def.proxy.https {
            builder = builder.proxy(reqwest::Proxy::https(proxy)?);
        }
        Ok(builder.build()?)
    }

    async fn send(
        &self,
        client: &Client,
        request: &PreparedRequest,
        payload: Option<&Payload>,
    ) -> Result<reqwest::Response, DothttpError> {
        let mut builder = client.request(request.method.to_reqwest_method(), &request.url);
        for (k, v) in request.headers.iter() {
            builder = builder.header(k, v);
        }
        match payload {
            Some(Payload::Multipart(parts)) => builder = builder.multipart(multipart_form(parts)?),
            _ => {
                if let Some(body) = &request.body {
                    builder = builder.body(body.clone());
                }
            }
        }
        Ok(builder.send().await?)
    }

    /// Sends `def`, applying its auth and answering one auth challenge.
    pub async fn execute(&self, def: &HttpDef) -> Result<HttpResponse, DothttpError> {
        if def.url.starts_with(UNIX_SCHEME) {
            return Err(DothttpError::Network(
                "http+unix urls are not supported by this transport, use --curl".into(),
            ));
        }
        let client = self.client_for(def)?;
        let mut request = PreparedRequest::from_def(def);
        let provider: Option<Box<dyn AuthProvider>> = def.auth.as_ref().map(auth::provider_for);
        if let Some(provider) = &provider {
            provider.apply(&mut request).await?;
        }

        debug!("sending {} {}", request.method.as_str(), request.url);
        let mut response = self.send(&client, &request, def.payload.as_ref()).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            let challenge = response
                .headers()
                .get(reqwest::header::WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            if let (Some(provider), Some(challenge)) = (&provider, challenge) {
                if provider.answer_challenge(&challenge, &mut request)? {
                    debug!("retrying with {} credentials", provider.auth_type());
                    response = self.send(&client, &request, def.payload.as_ref()).await?;
                }
            }
        }

        let status = response.status();
        let version = format!("{:?}", response.version());
        let url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).to_string()))
            .collect();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            version,
            url,
            headers,
            body,
        })
    }
}

/// Writes the response body to `path`.
pub fn write_output(path: &Path, body: &[u8]) -> Result<(), DothttpError> {
    std::fs::write(path, body)
        .map_err(|_| DothttpError::file_not_found(FileKind::Output, clean_path(path)))
}
