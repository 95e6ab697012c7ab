use super::headers::Headers;
use crate::{
    core::mime,
    syntax::{
        ast::{AuthAst, CertAst, Flags, JsonAst, JsonKey, MultipartPart, PayloadAst, ScriptAst, StrLit},
        format, HttpMethod, RequestNode,
    },
};
use indexmap::IndexMap;
use serde_json::{ser::Formatter, Value};
use std::{io, path::PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub name: String,
    /// Basename when the part was read from a file.
    pub filename: Option<String>,
    /// Path or inline text as written after interpolation.
    pub source: String,
    pub content: Vec<u8>,
    pub mime: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Raw {
        body: String,
        mime: Option<String>,
    },
    Form(IndexMap<String, Vec<String>>),
    Json(Value),
    File {
        path: PathBuf,
        content: Vec<u8>,
        mime: Option<String>,
    },
    Multipart(Vec<Part>),
}

impl Payload {
    pub fn mime(&self) -> Option<&str> {
        match self {
            Payload::Raw { mime, .. } | Payload::File { mime, .. } => mime.as_deref(),
            Payload::Form(_) => Some(mime::FORM_URLENCODED),
            Payload::Json(_) => Some(mime::APPLICATION_JSON),
            Payload::Multipart(_) => None,
        }
    }

    /// Request body, except for multipart which the transport builds itself.
    pub fn body(&self) -> Option<Vec<u8>> {
        match self {
            Payload::Raw { body, .. } => Some(body.as_bytes().to_vec()),
            Payload::Form(fields) => Some(encode_form(fields).into_bytes()),
            Payload::Json(value) => Some(json_text(value).into_bytes()),
            Payload::File { content, .. } => Some(content.clone()),
            Payload::Multipart(_) => None,
        }
    }
}

pub fn encode_form(fields: &IndexMap<String, Vec<String>>) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (k, values) in fields {
        for v in values {
            serializer.append_pair(k, v);
        }
    }
    serializer.finish()
}

struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

/// JSON text with `", "` and `": "` separators, e.g. `{"a": [1, 2]}`.
pub fn json_text(value: &Value) -> String {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
    if serde::Serialize::serialize(value, &mut ser).is_err() {
        return value.to_string();
    }
    String::from_utf8(out).unwrap_or_else(|_| value.to_string())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Proxy {
    pub http: Option<String>,
    pub https: Option<String>,
}

/// A fully resolved request, ready for the transport or a curl rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpDef {
    pub name: String,
    pub description: Option<String>,
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub query: IndexMap<String, Vec<String>>,
    pub payload: Option<Payload>,
    pub auth: Option<AuthAst>,
    pub certificate: Option<CertAst>,
    pub output: Option<PathBuf>,
    pub proxy: Proxy,
    pub allow_insecure: bool,
    pub session_clear: bool,
    pub no_parent_script: bool,
    pub script: Option<ScriptAst>,
}

impl HttpDef {
    /// URL with the query map appended.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, values) in &self.query {
            for v in values {
                serializer.append_pair(k, v);
            }
        }
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{sep}{}", self.url, serializer.finish())
    }

    /// Canonical DSL text for the resolved request.
    pub fn to_dsl(&self) -> String {
        format::format_request(&self.to_request_node())
    }

    /// Back to a request node, so the resolved request can be printed as DSL.
    pub fn to_request_node(&self) -> RequestNode {
        let mut named_args = Vec::new();
        if let Some(p) = &self.proxy.http {
            named_args.push(("http.proxy".to_string(), p.clone()));
        }
        if let Some(p) = &self.proxy.https {
            named_args.push(("https.proxy".to_string(), p.clone()));
        }
        RequestNode {
            name: Some(self.name.clone()),
            description: self.description.clone(),
            flags: Flags {
                clear: self.session_clear,
                insecure: self.allow_insecure,
                no_parent_script: self.no_parent_script,
            },
            named_args,
            method: Some(self.method),
            url: self.url.clone(),
            headers: self
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            queries: self
                .query
                .iter()
                .flat_map(|(k, vs)| vs.iter().map(move |v| (k.clone(), v.clone())))
                .collect(),
            payload: self.payload.as_ref().map(payload_ast),
            auth: self.auth.clone(),
            certificate: self.certificate.clone(),
            output: self.output.as_ref().map(|p| p.to_string_lossy().to_string()),
            script: self.script.clone(),
            ..Default::default()
        }
    }
}

fn payload_ast(payload: &Payload) -> PayloadAst {
    match payload {
        Payload::Raw { body, mime } => PayloadAst::Raw {
            chunks: vec![StrLit::double(body.clone())],
            mime: mime.clone(),
        },
        Payload::Form(fields) => PayloadAst::FormEncoded(JsonAst::Object(
            fields
                .iter()
                .map(|(k, vs)| {
                    let value = match vs.as_slice() {
                        [single] => JsonAst::Str(StrLit::double(single.clone())),
                        many => JsonAst::Array(
                            many.iter()
                                .map(|v| JsonAst::Str(StrLit::double(v.clone())))
                                .collect(),
                        ),
                    };
                    (JsonKey::Str(StrLit::double(k.clone())), value)
                })
                .collect(),
        )),
        Payload::Json(value) => PayloadAst::Json(json_ast(value)),
        Payload::File { path, mime, .. } => PayloadAst::File {
            path: path.to_string_lossy().to_string(),
            mime: mime.clone(),
        },
        Payload::Multipart(parts) => PayloadAst::Multipart(
            parts
                .iter()
                .map(|p| MultipartPart {
                    name: p.name.clone(),
                    source: p.source.clone(),
                    mime: p.mime.clone(),
                })
                .collect(),
        ),
    }
}

pub fn json_ast(value: &Value) -> JsonAst {
    match value {
        Value::Null => JsonAst::Null,
        Value::Bool(b) => JsonAst::Bool(*b),
        Value::Number(n) => JsonAst::Number(n.to_string()),
        Value::String(s) => JsonAst::Str(StrLit::double(s.clone())),
        Value::Array(items) => JsonAst::Array(items.iter().map(json_ast).collect()),
        Value::Object(map) => JsonAst::Object(
            map.iter()
                .map(|(k, v)| (JsonKey::Str(StrLit::double(k.clone())), json_ast(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_text_separators() {
        assert_eq!(
            json_text(&json!({"hello": "ada", "n": [1, 2, {"a": null}]})),
            r#"{"hello": "ada", "n": [1, 2, {"a": null}]}"#
        );
        assert_eq!(json_text(&json!({})), "{}");
    }

    #[test]
    fn test_dsl_round_trip() {
        use crate::{compiler::Compiler, property::PropertyResolver, syntax::parse};

        let text = r#"@name("p")
"https://h/v1"
basicauth("{{user}}", "p")
"X-Trace": "t1"

@name("c"): "p"
PATCH "/things"
? "limit" = "10"
? "tag" = "a"
? "tag" = "b"
json({"name": "{{user}}", "n": [1, 2.5, true, null]})
"#;
        let compile = |text: &str, target: &str| {
            let doc = parse(text, None).unwrap();
            let mut resolver = PropertyResolver::new(None);
            resolver.add_command_line_property("user", "ada");
            Compiler::new(&doc.requests, &mut resolver)
                .compile(target)
                .unwrap()
        };
        let first = compile(text, "c");
        let second = compile(&first.to_dsl(), "c");
        assert_eq!(first.method, second.method);
        assert_eq!(first.full_url(), second.full_url());
        assert_eq!(first.headers, second.headers);
        assert_eq!(first.query, second.query);
        assert_eq!(first.payload, second.payload);
        assert_eq!(
            first.auth.as_ref().map(AuthAst::kind),
            second.auth.as_ref().map(AuthAst::kind)
        );
    }

    #[test]
    fn test_form_encoding() {
        let mut fields = IndexMap::new();
        fields.insert("k".to_string(), vec!["a b".to_string()]);
        fields.insert("many".to_string(), vec!["1".to_string(), "2".to_string()]);
        assert_eq!(encode_form(&fields), "k=a+b&many=1&many=2");
        let payload = Payload::Form(fields);
        assert_eq!(payload.mime(), Some(mime::FORM_URLENCODED));
    }
}
