use super::{ScriptClient, ScriptEngine, ScriptRequest, ScriptResponse, ScriptResult};
use crate::core::error::DothttpError;
use boa_engine::{Context, Source};
use indexmap::IndexMap;
use serde_json::json;
use tracing::{debug, error};

const TEMPLATE: &str = include_str!("template.js");
const USER_SCRIPT: &str = "USER_SCRIPT";

/// Runs JavaScript test scripts on an embedded interpreter. There is no
/// pre-request phase for JavaScript.
pub struct JsEngine {
    source: String,
    properties: IndexMap<String, String>,
}

impl JsEngine {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            properties: IndexMap::new(),
        }
    }

    fn program(&self, request: &ScriptRequest, response: &ScriptResponse) -> String {
        let input = json!({
            "isJson": response.is_json(),
            "properties": self.properties,
            "request": request,
            "response": {
                "text": response.text,
                "status": response.status,
                "headers": response.headers,
            },
        });
        format!(
            "{}\nrunScript({input});\n",
            TEMPLATE.replace(USER_SCRIPT, &self.source)
        )
    }
}

impl ScriptEngine for JsEngine {
    fn initialize(&mut self, client: ScriptClient) -> Result<(), DothttpError> {
        self.properties = client.properties;
        Ok(())
    }

    fn run_pre_request(&mut self) -> Result<Vec<(String, String)>, DothttpError> {
        Ok(Vec::new())
    }

    fn run_tests(&mut self, request: &ScriptRequest, response: &ScriptResponse) -> ScriptResult {
        let program = self.program(request, response);
        let mut context = Context::default();
        let value = match context.eval(Source::from_bytes(program.as_bytes())) {
            Ok(v) => v,
            Err(e) => {
                error!("javascript compile failed with error {e}");
                return ScriptResult::not_compiled(e.to_string());
            }
        };
        let text = match value.to_string(&mut context) {
            Ok(s) => s.to_std_string_escaped(),
            Err(e) => return ScriptResult::not_compiled(e.to_string()),
        };
        debug!("javascript result {text}");
        serde_json::from_str(&text).unwrap_or_else(|e| {
            ScriptResult::not_compiled(format!("unexpected script output: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str, body: &str, status: u16) -> ScriptResult {
        let mut engine = JsEngine::new(source);
        let mut properties = IndexMap::new();
        properties.insert("seed".to_string(), "1".to_string());
        engine
            .initialize(ScriptClient {
                properties,
                ..Default::default()
            })
            .unwrap();
        engine.run_tests(
            &ScriptRequest::default(),
            &ScriptResponse {
                text: body.to_string(),
                status,
                headers: vec![("Content-Type".into(), "application/json".into())],
            },
        )
    }

    #[test]
    fn test_tests_and_properties() {
        let result = run(
            r#"
client.test("status is 200", function () {
    client.assert(response.status === 200, "bad status");
});
client.test("body", function () {
    client.isEqual(response.body, {"a": [1, 2]});
});
client.test("fails", function () {
    client.assert(false, "nope");
});
client.global.set("token", response.body.a[1]);
console.log("seed " + client.properties.get("seed"));
"#,
            r#"{"a": [1, 2]}"#,
            200,
        );
        assert!(result.compiled);
        assert_eq!(result.tests.len(), 3);
        assert!(result.tests[0].success);
        assert!(result.tests[1].success);
        assert!(!result.tests[2].success);
        assert_eq!(result.tests[2].error.as_deref(), Some("nope"));
        assert_eq!(result.properties.get("token").map(String::as_str), Some("2"));
        assert_eq!(result.stdout, "seed 1");
    }

    #[test]
    fn test_runtime_error_is_logged() {
        let result = run("undefinedFunction();", "{}", 200);
        assert!(result.compiled);
        assert!(result.stdout.starts_with("error "));
    }

    #[test]
    fn test_syntax_error_is_not_compiled() {
        let result = run("client.test(\"x\", function () {", "{}", 200);
        assert!(!result.compiled);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_header_lookup() {
        let result = run(
            r#"client.log(response.headers.valueOf("content-type"));"#,
            "{}",
            204,
        );
        assert_eq!(result.stdout, "application/json");
    }
}
