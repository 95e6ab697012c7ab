#[cfg(feature = "javascript")]
pub mod js;
#[cfg(feature = "python")]
pub mod python;

use crate::{
    compiler::model::HttpDef,
    core::{error::DothttpError, mime},
    syntax::ast::{ScriptAst, ScriptLang},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptResult {
    pub stdout: String,
    pub error: Option<String>,
    pub properties: IndexMap<String, String>,
    pub tests: Vec<TestResult>,
    pub compiled: bool,
}

impl Default for ScriptResult {
    fn default() -> Self {
        Self {
            stdout: String::new(),
            error: None,
            properties: IndexMap::new(),
            tests: Vec::new(),
            compiled: true,
        }
    }
}

impl ScriptResult {
    pub fn not_compiled(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            compiled: false,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty()
            && self.error.is_none()
            && self.properties.is_empty()
            && self.tests.is_empty()
    }
}

impl fmt::Display for ScriptResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.stdout.is_empty() {
            writeln!(f, "##STDOUT")?;
            writeln!(f, "{}", self.stdout.trim_end())?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "##ERROR")?;
            writeln!(f, "{error}")?;
        }
        if !self.properties.is_empty() {
            writeln!(f, "##PROPERTIES")?;
            for (k, v) in &self.properties {
                writeln!(f, "{k}: {v}")?;
            }
        }
        if !self.tests.is_empty() {
            writeln!(f, "##TESTS")?;
            for test in &self.tests {
                let status = if test.success { "passed" } else { "failed" };
                match &test.error {
                    Some(e) => writeln!(f, "{}: {status} ({})", test.name, e.trim())?,
                    None => writeln!(f, "{}: {status}", test.name)?,
                }
            }
        }
        Ok(())
    }
}

/// Read-only request view given to scripts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScriptRequest {
    pub url: String,
    pub method: String,
    pub headers: IndexMap<String, String>,
    pub body: Option<String>,
}

impl ScriptRequest {
    pub fn from_def(def: &HttpDef) -> Self {
        Self {
            url: def.full_url(),
            method: def.method.as_str().to_string(),
            headers: def
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: def
                .payload
                .as_ref()
                .and_then(|p| p.body())
                .map(|b| String::from_utf8_lossy(&b).to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScriptResponse {
    pub text: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl ScriptResponse {
    pub fn is_json(&self) -> bool {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(mime::CONTENT_TYPE))
            .map(|(_, v)| mime::essence(v) == mime::APPLICATION_JSON)
            .unwrap_or(false)
    }
}

/// What a script sees before the request is sent.
#[derive(Debug, Clone, Default)]
pub struct ScriptClient {
    pub request: ScriptRequest,
    pub properties: IndexMap<String, String>,
}

/// A language runtime for request scripts.
pub trait ScriptEngine: Send {
    fn initialize(&mut self, client: ScriptClient) -> Result<(), DothttpError>;

    /// Properties set by pre-request hooks.
    fn run_pre_request(&mut self) -> Result<Vec<(String, String)>, DothttpError>;

    fn run_tests(&mut self, request: &ScriptRequest, response: &ScriptResponse) -> ScriptResult;
}

/// Engine used when a language is not part of this build.
pub struct UnavailableEngine {
    lang: ScriptLang,
}

impl ScriptEngine for UnavailableEngine {
    fn initialize(&mut self, _client: ScriptClient) -> Result<(), DothttpError> {
        Ok(())
    }

    fn run_pre_request(&mut self) -> Result<Vec<(String, String)>, DothttpError> {
        Ok(Vec::new())
    }

    fn run_tests(&mut self, _request: &ScriptRequest, _response: &ScriptResponse) -> ScriptResult {
        ScriptResult::not_compiled(format!(
            "{} scripts are not supported by this build, enable the `{}` feature",
            self.lang.as_str(),
            self.lang.as_str()
        ))
    }
}

pub fn engine_for(script: &ScriptAst) -> Box<dyn ScriptEngine> {
    match script.lang {
        #[cfg(feature = "javascript")]
        ScriptLang::JavaScript => Box::new(js::JsEngine::new(&script.source)),
        #[cfg(feature = "python")]
        ScriptLang::Python => Box::new(python::PythonEngine::new(&script.source)),
        #[allow(unreachable_patterns)]
        lang => Box::new(UnavailableEngine { lang }),
    }
}
