pub mod aws;
pub mod headers;
pub mod model;
pub mod target;

use crate::{
    core::{
        error::{DothttpError, FileKind},
        mime,
        paths::relative_to,
    },
    property::{json_eval, property_file::value_text, PropertyResolver},
    syntax::{
        ast::{AuthAst, AzureAuthAst, CertAst, PayloadAst, QuoteKind, ScriptAst},
        position::display_name,
        HttpMethod, RequestNode,
    },
};
use headers::Headers;
use indexmap::IndexMap;
use model::{HttpDef, Part, Payload, Proxy};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_AZURE_SCOPE: &str = "https://management.azure.com/.default";
pub const DEFAULT_HAWK_ALGORITHM: &str = "sha256";

/// Property updates produced by a pre-request script.
pub type PreRequestUpdates = Vec<(String, String)>;

fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Turns a target's request chain into an [`HttpDef`].
pub struct Compiler<'a> {
    requests: &'a [RequestNode],
    resolver: &'a mut PropertyResolver,
    default_headers: Vec<(String, String)>,
}

impl<'a> Compiler<'a> {
    pub fn new(requests: &'a [RequestNode], resolver: &'a mut PropertyResolver) -> Self {
        Self {
            requests,
            resolver,
            default_headers: Vec::new(),
        }
    }

    pub fn with_default_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.default_headers = headers;
        self
    }

    pub fn compile(&mut self, target: &str) -> Result<HttpDef, DothttpError> {
        self.compile_with(target, |_| Ok(Vec::new()))
    }

    /// Compiles `target`, running `pre_request` on its script first. The
    /// updates it returns take command-line priority.
    pub fn compile_with<F>(&mut self, target: &str, pre_request: F) -> Result<HttpDef, DothttpError>
    where
        F: FnOnce(&ScriptAst) -> Result<PreRequestUpdates, DothttpError>,
    {
        let requests = self.requests;
        let index = target::select_target(requests, target)?;
        let chain: Vec<&RequestNode> = target::resolve_chain(requests, index)?
            .into_iter()
            .map(|i| &requests[i])
            .collect();
        let child = chain[0];
        let name = display_name(child, index);
        debug!("compiling `{name}` with chain of {}", chain.len());

        let session_clear = chain.iter().any(|r| r.flags.clear);
        let allow_insecure = chain.iter().any(|r| r.flags.insecure);
        if allow_insecure {
            self.resolver.enable_system_command();
        }

        let script = if child.flags.no_parent_script {
            child.script.clone()
        } else {
            chain.iter().find_map(|r| r.script.clone())
        };
        if let Some(script) = &script {
            for (k, v) in pre_request(script)? {
                debug!("pre-request script set property `{k}`");
                self.resolver.add_command_line_property(k, v);
            }
        }

        let url = self.compile_url(&chain)?;
        let payload_node = chain.iter().find(|r| r.payload.is_some()).copied();
        let payload = match payload_node {
            Some(node) => match &node.payload {
                Some(p) => Some(self.compile_payload(p, node.source_path.as_deref())?),
                None => None,
            },
            None => None,
        };
        let method = child
            .method
            .or_else(|| child.payload.as_ref().map(|_| HttpMethod::POST))
            .or_else(|| chain.iter().find_map(|r| r.method))
            .unwrap_or(if payload.is_some() {
                HttpMethod::POST
            } else {
                HttpMethod::GET
            });

        let mut headers = self.compile_headers(&chain)?;
        if let Some(mime) = payload.as_ref().and_then(Payload::mime) {
            if !headers.contains(mime::CONTENT_TYPE) {
                headers.insert(mime::CONTENT_TYPE, mime);
            }
        }

        let mut query: IndexMap<String, Vec<String>> = IndexMap::new();
        for node in chain.iter().rev() {
            for (k, v) in &node.queries {
                let k = self.interp(k)?;
                let v = self.interp(v)?;
                query.entry(k).or_default().push(v);
            }
        }

        let auth = match chain.iter().find(|r| r.auth.is_some()) {
            Some(node) => match &node.auth {
                Some(a) => Some(self.compile_auth(a, &url, node.source_path.as_deref())?),
                None => None,
            },
            None => None,
        };
        let certificate = match chain.iter().find(|r| r.certificate.is_some()) {
            Some(node) => match &node.certificate {
                Some(c) => Some(self.compile_certificate(c, node.source_path.as_deref())?),
                None => None,
            },
            None => None,
        };

        let mut proxy = Proxy::default();
        for node in chain.iter().rev() {
            for (k, v) in &node.named_args {
                match k.as_str() {
                    "http.proxy" => proxy.http = Some(self.interp(v)?),
                    "https.proxy" => proxy.https = Some(self.interp(v)?),
                    _ => {}
                }
            }
        }

        let output = match chain.iter().find(|r| r.output.is_some()) {
            Some(node) => match &node.output {
                Some(o) => {
                    let o = self.interp(o)?;
                    Some(relative_to(node.source_path.as_deref(), &o))
                }
                None => None,
            },
            None => None,
        };

        Ok(HttpDef {
            name,
            description: child.description.clone(),
            method,
            url,
            headers,
            query,
            payload,
            auth,
            certificate,
            output,
            proxy,
            allow_insecure,
            session_clear,
            no_parent_script: child.flags.no_parent_script,
            script,
        })
    }

    fn interp(&mut self, text: &str) -> Result<String, DothttpError> {
        self.resolver.get_updated_content(text)
    }

    fn interp_opt(&mut self, text: &Option<String>) -> Result<Option<String>, DothttpError> {
        text.as_deref().map(|t| self.interp(t)).transpose()
    }

    fn compile_url(&mut self, chain: &[&RequestNode]) -> Result<String, DothttpError> {
        let mut url = String::new();
        for node in chain.iter().rev() {
            let segment = self.interp(&node.url)?;
            url = target::join_url(&url, segment.trim());
        }
        Ok(target::with_default_scheme(&url))
    }

    fn compile_headers(&mut self, chain: &[&RequestNode]) -> Result<Headers, DothttpError> {
        let mut headers = Headers::new();
        let defaults = self.default_headers.clone();
        for (k, v) in &defaults {
            let k = self.interp(k)?;
            let v = self.interp(v)?;
            headers.insert(k, v);
        }
        for node in chain.iter().rev() {
            for (k, v) in &node.headers {
                let k = self.interp(k)?;
                let v = self.interp(v)?;
                headers.insert(k.trim(), strip_quotes(v.trim()));
            }
        }
        Ok(headers)
    }

    fn compile_payload(
        &mut self,
        payload: &PayloadAst,
        source: Option<&Path>,
    ) -> Result<Payload, DothttpError> {
        Ok(match payload {
            PayloadAst::Raw { chunks, mime } => {
                let mut body = String::new();
                for chunk in chunks {
                    if chunk.quote == QuoteKind::Triple {
                        body.push_str(&chunk.value);
                    } else {
                        body.push_str(&self.interp(&chunk.value)?);
                    }
                }
                let mime = match self.interp_opt(mime)? {
                    Some(m) => Some(m),
                    None => mime::from_content(&body),
                };
                Payload::Raw { body, mime }
            }
            PayloadAst::FormEncoded(ast) => match json_eval::evaluate(ast, self.resolver)? {
                Value::Object(map) => {
                    let mut fields: IndexMap<String, Vec<String>> = IndexMap::new();
                    for (k, v) in map {
                        let values = match v {
                            Value::Array(items) => items.iter().map(value_text).collect(),
                            other => vec![value_text(&other)],
                        };
                        fields.entry(k).or_default().extend(values);
                    }
                    Payload::Form(fields)
                }
                Value::String(body) => Payload::Raw {
                    body,
                    mime: Some(mime::FORM_URLENCODED.to_string()),
                },
                other => {
                    return Err(DothttpError::PayloadInvalid(format!(
                        "data should be json/str, current: {other}"
                    )))
                }
            },
            PayloadAst::Json(ast) => Payload::Json(json_eval::evaluate(ast, self.resolver)?),
            PayloadAst::File { path, mime } => {
                let written = self.interp(path)?;
                let resolved = relative_to(source, &written);
                if !resolved.is_file() {
                    return Err(DothttpError::file_not_found(FileKind::Payload, written));
                }
                let content = std::fs::read(&resolved)?;
                let mime = match self.interp_opt(mime)? {
                    Some(m) => Some(m),
                    None => mime::from_path(&resolved),
                };
                Payload::File {
                    path: resolved,
                    content,
                    mime,
                }
            }
            PayloadAst::Multipart(parts) => {
                let mut compiled = Vec::with_capacity(parts.len());
                for part in parts {
                    let name = self.interp(&part.name)?;
                    let written = self.interp(&part.source)?;
                    let explicit_mime = self.interp_opt(&part.mime)?;
                    let path = relative_to(source, &written);
                    compiled.push(if !written.is_empty() && path.is_file() {
                        Part {
                            name,
                            filename: path.file_name().map(|f| f.to_string_lossy().to_string()),
                            content: std::fs::read(&path)?,
                            mime: explicit_mime.or_else(|| mime::from_path(&path)),
                            source: path.to_string_lossy().to_string(),
                        }
                    } else {
                        Part {
                            name,
                            filename: None,
                            content: written.clone().into_bytes(),
                            mime: explicit_mime,
                            source: written,
                        }
                    });
                }
                Payload::Multipart(compiled)
            }
        })
    }

    fn compile_auth(
        &mut self,
        auth: &AuthAst,
        url: &str,
        source: Option<&Path>,
    ) -> Result<AuthAst, DothttpError> {
        Ok(match auth {
            AuthAst::Basic { user, pass } => AuthAst::Basic {
                user: self.interp(user)?,
                pass: self.interp(pass)?,
            },
            AuthAst::Digest { user, pass } => AuthAst::Digest {
                user: self.interp(user)?,
                pass: self.interp(pass)?,
            },
            AuthAst::Ntlm { user, pass } => AuthAst::Ntlm {
                user: self.interp(user)?,
                pass: self.interp(pass)?,
            },
            AuthAst::Hawk { id, key, algorithm } => AuthAst::Hawk {
                id: self.interp(id)?,
                key: self.interp(key)?,
                algorithm: Some(
                    non_empty(self.interp_opt(algorithm)?)
                        .unwrap_or_else(|| DEFAULT_HAWK_ALGORITHM.to_string()),
                ),
            },
            AuthAst::AwsV4 {
                access_id,
                secret_key,
                service,
                region,
                session_token,
            } => {
                let access_id = self.interp(access_id)?;
                let secret_key = self.interp(secret_key)?;
                if access_id.is_empty() || secret_key.is_empty() {
                    return Err(DothttpError::AuthConfigIncomplete(
                        "aws auth requires access_id and secret_key".into(),
                    ));
                }
                let service = non_empty(self.interp_opt(service)?);
                let region = non_empty(self.interp_opt(region)?);
                let (service, region) = aws::resolve_service_region(url, service, region);
                if service.is_empty() {
                    return Err(DothttpError::AuthConfigIncomplete(
                        "aws service could not be derived from the url".into(),
                    ));
                }
                AuthAst::AwsV4 {
                    access_id,
                    secret_key,
                    service: Some(service),
                    region: Some(region),
                    session_token: non_empty(self.interp_opt(session_token)?),
                }
            }
            AuthAst::Azure(azure) => AuthAst::Azure(self.compile_azure(azure, source)?),
        })
    }

    fn scope(&mut self, scope: &Option<String>) -> Result<Option<String>, DothttpError> {
        Ok(Some(
            non_empty(self.interp_opt(scope)?).unwrap_or_else(|| DEFAULT_AZURE_SCOPE.to_string()),
        ))
    }

    fn compile_azure(
        &mut self,
        azure: &AzureAuthAst,
        source: Option<&Path>,
    ) -> Result<AzureAuthAst, DothttpError> {
        Ok(match azure {
            AzureAuthAst::ServicePrincipal {
                tenant_id,
                client_id,
                client_secret,
                scope,
            } => AzureAuthAst::ServicePrincipal {
                tenant_id: self.interp(tenant_id)?,
                client_id: self.interp(client_id)?,
                client_secret: self.interp(client_secret)?,
                scope: self.scope(scope)?,
            },
            AzureAuthAst::Certificate {
                tenant_id,
                client_id,
                certificate_path,
                certificate_password,
                scope,
            } => {
                let written = self.interp(certificate_path)?;
                let path = relative_to(source, &written);
                if !path.is_file() {
                    return Err(DothttpError::file_not_found(FileKind::Certificate, written));
                }
                AzureAuthAst::Certificate {
                    tenant_id: self.interp(tenant_id)?,
                    client_id: self.interp(client_id)?,
                    certificate_path: path.to_string_lossy().to_string(),
                    certificate_password: non_empty(self.interp_opt(certificate_password)?),
                    scope: self.scope(scope)?,
                }
            }
            AzureAuthAst::Cli { scope } => AzureAuthAst::Cli {
                scope: self.scope(scope)?,
            },
            AzureAuthAst::DeviceCode { scope } => AzureAuthAst::DeviceCode {
                scope: self.scope(scope)?,
            },
        })
    }

    fn existing_path(&mut self, path: &str, source: Option<&Path>) -> Result<String, DothttpError> {
        let written = self.interp(path)?;
        let resolved = relative_to(source, &written);
        if !resolved.is_file() {
            return Err(DothttpError::file_not_found(FileKind::Certificate, written));
        }
        Ok(resolved.to_string_lossy().to_string())
    }

    fn compile_certificate(
        &mut self,
        cert: &CertAst,
        source: Option<&Path>,
    ) -> Result<CertAst, DothttpError> {
        Ok(match cert {
            CertAst::Pem { cert_path, key_path } => CertAst::Pem {
                cert_path: self.existing_path(cert_path, source)?,
                key_path: match key_path {
                    Some(k) => Some(self.existing_path(k, source)?),
                    None => None,
                },
            },
            CertAst::P12 { path, password } => CertAst::P12 {
                path: self.existing_path(path, source)?,
                password: self.interp_opt(password)?,
            },
        })
    }
}
