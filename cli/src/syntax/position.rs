use super::ast::{AuthAst, Document, PayloadAst, RequestNode, Span};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Name,
    ExtraArgs,
    Url,
    BasicAuth,
    DigestAuth,
    NtlmAuth,
    Auth,
    Certificate,
    Header,
    #[serde(rename = "urlparams")]
    UrlParams,
    PayloadData,
    #[serde(rename = "payload_urlencoded")]
    PayloadEncoded,
    #[serde(rename = "payload_file_input")]
    PayloadFile,
    PayloadJson,
    PayloadMultipart,
    Output,
    Script,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameRef {
    pub name: String,
    pub method: Option<String>,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlRef {
    pub url: String,
    pub method: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeAtPosition {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

fn contains(span: &Span, pos: usize) -> bool {
    span.start <= pos && pos < span.end
}

/// Display name of a request: its `@name` or its 1-based index.
pub fn display_name(req: &RequestNode, index: usize) -> String {
    req.name.clone().unwrap_or_else(|| (index + 1).to_string())
}

pub fn names_and_urls(doc: &Document) -> (Vec<NameRef>, Vec<UrlRef>) {
    let mut names = Vec::new();
    let mut urls = Vec::new();
    for (index, req) in doc.requests.iter().enumerate() {
        let method = req.method.map(|m| m.as_str().to_string());
        let start = match &req.spans.name {
            Some(span) => span.start,
            None => req.spans.url.start,
        };
        names.push(NameRef {
            name: display_name(req, index),
            method: method.clone(),
            start,
            end: req.spans.whole.end,
        });
        urls.push(UrlRef {
            url: req.url.clone(),
            method: method.unwrap_or_else(|| "GET".into()),
            start: req.spans.url.start,
            end: req.spans.url.end,
        });
    }
    (names, urls)
}

fn kind_in_request(req: &RequestNode, pos: usize) -> Option<NodeKind> {
    let spans = &req.spans;
    if spans.name.as_ref().is_some_and(|s| contains(s, pos)) {
        return Some(NodeKind::Name);
    }
    if spans.named_args.iter().any(|s| contains(s, pos)) {
        return Some(NodeKind::ExtraArgs);
    }
    if contains(&spans.url, pos) {
        return Some(NodeKind::Url);
    }
    if spans.auth.as_ref().is_some_and(|s| contains(s, pos)) {
        return Some(match req.auth {
            Some(AuthAst::Basic { .. }) => NodeKind::BasicAuth,
            Some(AuthAst::Digest { .. }) => NodeKind::DigestAuth,
            Some(AuthAst::Ntlm { .. }) => NodeKind::NtlmAuth,
            _ => NodeKind::Auth,
        });
    }
    if spans.certificate.as_ref().is_some_and(|s| contains(s, pos)) {
        return Some(NodeKind::Certificate);
    }
    if spans.headers.iter().any(|s| contains(s, pos)) {
        return Some(NodeKind::Header);
    }
    if spans.queries.iter().any(|s| contains(s, pos)) {
        return Some(NodeKind::UrlParams);
    }
    if spans.payload.as_ref().is_some_and(|s| contains(s, pos)) {
        return Some(match req.payload {
            Some(PayloadAst::Raw { .. }) => NodeKind::PayloadData,
            Some(PayloadAst::FormEncoded(_)) => NodeKind::PayloadEncoded,
            Some(PayloadAst::File { .. }) => NodeKind::PayloadFile,
            Some(PayloadAst::Multipart(_)) => NodeKind::PayloadMultipart,
            _ => NodeKind::PayloadJson,
        });
    }
    if spans.output.as_ref().is_some_and(|s| contains(s, pos)) {
        return Some(NodeKind::Output);
    }
    if spans.script.as_ref().is_some_and(|s| contains(s, pos)) {
        return Some(NodeKind::Script);
    }
    None
}

/// Kind of the syntax node at a byte offset; anything outside a request is a comment.
pub fn type_at_position(doc: &Document, pos: usize) -> TypeAtPosition {
    for (index, req) in doc.requests.iter().enumerate() {
        if !contains(&req.spans.whole, pos) {
            continue;
        }
        let Some(kind) = kind_in_request(req, pos) else {
            continue;
        };
        let (start, end) = match (kind, &req.spans.script) {
            (NodeKind::Script, Some(span)) => (Some(span.start), Some(span.end)),
            _ => (None, None),
        };
        let base_start = req.base.as_ref().and_then(|base| {
            doc.requests
                .iter()
                .find(|r| r.name.as_ref() == Some(base))
                .map(|r| r.spans.whole.start)
        });
        return TypeAtPosition {
            kind,
            target: Some(display_name(req, index)),
            target_base: req.base.clone(),
            base_start,
            start,
            end,
        };
    }
    TypeAtPosition {
        kind: NodeKind::Comment,
        target: None,
        target_base: None,
        base_start: None,
        start: None,
        end: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::analyze::parse;

    const SRC: &str = "@name(\"base\")\nGET \"https://h/\"\n\n# note\n@name(\"c\"): \"base\"\nPOST \"/x\"\n\"a\": \"b\"\njson({})\n";

    #[test]
    fn test_names_and_urls() {
        let doc = parse(SRC, None).unwrap();
        let (names, urls) = names_and_urls(&doc);
        assert_eq!(names[1].name, "c");
        assert_eq!(names[1].method.as_deref(), Some("POST"));
        assert_eq!(urls[0].url, "https://h/");
        assert_eq!(&SRC[urls[1].start..urls[1].end], "\"/x\"");
    }

    #[test]
    fn test_type_at_position() {
        let doc = parse(SRC, None).unwrap();
        let header = SRC.find("\"a\"").unwrap() + 1;
        let found = type_at_position(&doc, header);
        assert_eq!(found.kind, NodeKind::Header);
        assert_eq!(found.target.as_deref(), Some("c"));
        assert_eq!(found.target_base.as_deref(), Some("base"));
        assert_eq!(found.base_start, Some(0));

        let json = SRC.find("json").unwrap();
        assert_eq!(type_at_position(&doc, json).kind, NodeKind::PayloadJson);

        let comment = SRC.find("# note").unwrap();
        assert_eq!(type_at_position(&doc, comment).kind, NodeKind::Comment);
    }

    #[test]
    fn test_unnamed_request_uses_index() {
        let doc = parse("GET \"a\"\nGET \"b\"", None).unwrap();
        let (names, _) = names_and_urls(&doc);
        assert_eq!(names[1].name, "2");
    }

    #[test]
    fn test_serialized_kind() {
        let json = serde_json::to_value(NodeKind::UrlParams).unwrap();
        assert_eq!(json, "urlparams");
        let json = serde_json::to_value(NodeKind::PayloadFile).unwrap();
        assert_eq!(json, "payload_file_input");
    }
}
