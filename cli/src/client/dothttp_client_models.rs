use super::session::HttpResponse;
use crate::{compiler::model::HttpDef, script::ScriptResult};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;

/// Where the requests come from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    File(PathBuf),
    /// In-memory text. `path`, when given, anchors imports and property file discovery.
    Content {
        content: String,
        path: Option<PathBuf>,
    },
}

impl Source {
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Source::File(p) => Some(p),
            Source::Content { path, .. } => path.as_deref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DothttpConfig {
    pub source: Source,
    pub target: String,
    pub envs: Vec<String>,
    pub properties: Vec<(String, String)>,
    pub property_file: Option<PathBuf>,
}

impl DothttpConfig {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            target: crate::compiler::target::DEFAULT_TARGET.to_string(),
            envs: Vec::new(),
            properties: Vec::new(),
            property_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseView {
    pub status: u16,
    pub reason: String,
    pub url: String,
    pub headers: IndexMap<String, String>,
    pub body: String,
}

impl From<&HttpResponse> for ResponseView {
    fn from(response: &HttpResponse) -> Self {
        let mut headers = IndexMap::new();
        for (k, v) in &response.headers {
            headers
                .entry(k.clone())
                .and_modify(|existing: &mut String| {
                    existing.push_str(", ");
                    existing.push_str(v);
                })
                .or_insert_with(|| v.clone());
        }
        Self {
            status: response.status,
            reason: response.reason.clone(),
            url: response.url.clone(),
            headers,
            body: response.text(),
        }
    }
}

/// Outcome of running one target.
#[derive(Debug, Clone, Serialize)]
pub struct Execution {
    #[serde(skip)]
    pub def: HttpDef,
    #[serde(skip)]
    pub response: Option<HttpResponse>,
    pub name: String,
    /// The compiled request as DSL text.
    pub http: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curl: Option<String>,
    #[serde(rename = "response", skip_serializing_if = "Option::is_none")]
    pub response_view: Option<ResponseView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_result: Option<ScriptResult>,
}
