use super::{auth::AwsSigV4Provider, request::PreparedRequest, session::UNIX_SCHEME};
use crate::{
    compiler::model::{encode_form, HttpDef, Payload},
    core::error::DothttpError,
    syntax::ast::{AuthAst, CertAst},
};
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Value};

fn pretty_json(value: &Value) -> String {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    if value.serialize(&mut ser).is_err() {
        return value.to_string();
    }
    String::from_utf8(out).unwrap_or_else(|_| value.to_string())
}

fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let decoded = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(b) = decoded {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).to_string()
}

/// Socket path and the `http://localhost` url curl should be given.
fn split_unix_url(url: &str) -> Option<(String, String)> {
    let rest = url.strip_prefix(UNIX_SCHEME)?;
    let (socket, path) = match rest.find(['/', '?', '#']) {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };
    let path = if path.starts_with('/') || path.is_empty() {
        path.to_string()
    } else {
        format!("/{path}")
    };
    Some((percent_decode(socket), format!("http://localhost{path}")))
}

struct Parts(Vec<String>);

impl Parts {
    fn flag(&mut self, flag: &str) {
        self.0.push(shell_words::quote(flag).to_string());
    }

    fn arg(&mut self, flag: &str, value: &str) {
        self.0.push(format!(
            "{} {}",
            shell_words::quote(flag),
            shell_words::quote(value)
        ));
    }
}

/// A curl command line equivalent to sending `def`.
pub fn to_curl(def: &HttpDef) -> Result<String, DothttpError> {
    let mut parts = Parts(Vec::new());
    let mut url = def.full_url();

    match &def.auth {
        Some(AuthAst::Digest { user, pass }) => {
            parts.flag("--digest");
            parts.arg("--user", &format!("{user}:{pass}"));
        }
        Some(AuthAst::Basic { user, pass }) => parts.arg("--user", &format!("{user}:{pass}")),
        Some(AuthAst::AwsV4 {
            access_id,
            secret_key,
            service,
            region,
            session_token,
        }) => {
            let signer = AwsSigV4Provider {
                access_id: access_id.clone(),
                secret_key: secret_key.clone(),
                service: service.clone().unwrap_or_default(),
                region: region
                    .clone()
                    .unwrap_or_else(|| crate::compiler::aws::DEFAULT_REGION.to_string()),
                session_token: session_token.clone(),
            };
            let mut request = PreparedRequest::from_def(def);
            signer.sign_at(&mut request, chrono::Utc::now())?;
            for (k, v) in request.headers.iter() {
                let lower = k.to_ascii_lowercase();
                if lower.starts_with("x-amz") || lower == "authorization" {
                    parts.arg("-H", &format!("{k}: {v}"));
                }
            }
        }
        _ => {}
    }

    match &def.certificate {
        Some(CertAst::Pem {
            cert_path,
            key_path,
        }) => {
            parts.arg("--cert", cert_path);
            if let Some(key) = key_path {
                parts.arg("--key", key);
            }
        }
        Some(CertAst::P12 { path, password }) => {
            parts.arg(
                "--cert",
                &format!("{path}:{}", password.as_deref().unwrap_or_default()),
            );
            parts.arg("--cert-type", "P12");
        }
        None => {}
    }
    if def.allow_insecure {
        parts.flag("-k");
    }

    let mut headers: Vec<(&str, &str)> = def.headers.iter().collect();
    headers.sort();
    for (k, v) in headers {
        parts.arg("-H", &format!("{k}: {v}"));
    }

    if let Some((socket, local)) = split_unix_url(&url) {
        parts.arg("--unix-socket", &socket);
        url = local;
    }

    match &def.payload {
        Some(Payload::File { path, .. }) => {
            parts.arg("--data", &format!("@{}", path.to_string_lossy()))
        }
        Some(Payload::Multipart(items)) => {
            for part in items {
                let value = match part.filename {
                    Some(_) => format!("{}=@{}", part.name, part.source),
                    None => format!("{}={}", part.name, part.source),
                };
                parts.arg("--form", &value);
            }
        }
        Some(Payload::Json(value)) => parts.arg("-d", &pretty_json(value)),
        Some(Payload::Form(fields)) => parts.arg("-d", &encode_form(fields)),
        Some(Payload::Raw { body, .. }) => parts.arg("-d", body),
        None => {}
    }

    let mut out = format!(
        "curl -X {} --url {}",
        def.method.as_str(),
        shell_words::quote(&url)
    );
    for part in parts.0 {
        out.push_str(" \\\n");
        out.push_str(&part);
    }
    Ok(out)
}
