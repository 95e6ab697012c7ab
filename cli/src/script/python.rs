use super::{ScriptClient, ScriptEngine, ScriptRequest, ScriptResponse, ScriptResult};
use crate::core::error::DothttpError;
use indexmap::IndexMap;
use pyo3::{prelude::*, types::PyModule};
use serde::Deserialize;
use serde_json::json;
use std::ffi::CString;
use tracing::error;

const RUNTIME: &str = include_str!("runtime.py");

#[derive(Deserialize)]
struct PreRequestOutcome {
    #[serde(default)]
    function: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    properties: IndexMap<String, String>,
}

/// Runs Python scripts: `init*` on setup, `pre*` before the request and
/// `test*` functions or `unittest.TestCase` classes after the response.
pub struct PythonEngine {
    source: String,
    module: Option<Py<PyModule>>,
}

fn c_string(text: &str) -> Result<CString, DothttpError> {
    CString::new(text).map_err(|e| DothttpError::ScriptCompile {
        message: e.to_string(),
        stdout: String::new(),
    })
}

impl PythonEngine {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            module: None,
        }
    }
}

impl ScriptEngine for PythonEngine {
    fn initialize(&mut self, client: ScriptClient) -> Result<(), DothttpError> {
        let code = c_string(RUNTIME)?;
        let payload = json!({
            "request": client.request,
            "properties": client.properties,
        })
        .to_string();
        let module = Python::attach(|py| -> PyResult<Py<PyModule>> {
            let module = PyModule::from_code(py, &code, c"dothttp_runtime.py", c"dothttp_runtime")?;
            module.call_method1("setup", (self.source.as_str(), payload))?;
            Ok(module.unbind())
        })
        .map_err(|e| DothttpError::ScriptCompile {
            message: e.to_string(),
            stdout: String::new(),
        })?;
        self.module = Some(module);
        Ok(())
    }

    fn run_pre_request(&mut self) -> Result<Vec<(String, String)>, DothttpError> {
        let Some(module) = &self.module else {
            return Ok(Vec::new());
        };
        let text = Python::attach(|py| -> PyResult<String> {
            module.bind(py).call_method0("pre_request")?.extract()
        })
        .map_err(|e| DothttpError::ScriptRuntime {
            function: "pre_request".into(),
            message: e.to_string(),
            stdout: String::new(),
        })?;
        let outcome: PreRequestOutcome =
            serde_json::from_str(&text).map_err(|e| DothttpError::Generic(e.to_string()))?;
        if let Some(message) = outcome.error {
            return Err(DothttpError::ScriptRuntime {
                function: outcome.function.unwrap_or_default(),
                message,
                stdout: String::new(),
            });
        }
        Ok(outcome.properties.into_iter().collect())
    }

    fn run_tests(&mut self, request: &ScriptRequest, response: &ScriptResponse) -> ScriptResult {
        let Some(module) = &self.module else {
            return ScriptResult::not_compiled("python script was not initialized");
        };
        let payload = json!({
            "request": request,
            "text": response.text,
            "status": response.status,
            "headers": response.headers,
        })
        .to_string();
        let text = Python::attach(|py| -> PyResult<String> {
            module.bind(py).call_method1("run_tests", (payload,))?.extract()
        });
        match text {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                ScriptResult::not_compiled(format!("unexpected script output: {e}"))
            }),
            Err(e) => {
                error!("python test script failed with error {e}");
                ScriptResult::not_compiled(e.to_string())
            }
        }
    }
}
