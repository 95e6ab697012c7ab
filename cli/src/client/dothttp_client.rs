use super::{
    curl,
    dothttp_client_models::{DothttpConfig, Execution, ResponseView, Source},
    session::{self, Session},
};
use crate::{
    compiler::{model::HttpDef, Compiler},
    core::error::DothttpError,
    loader,
    property::{property_file::PropertyFile, PropertyResolver},
    script::{self, ScriptClient, ScriptEngine, ScriptRequest, ScriptResponse},
    syntax::RequestNode,
};
use std::time::Instant;
use tracing::{debug, info};

/// Loads, compiles and executes one target of a dothttp source.
pub struct DothttpClient {
    config: DothttpConfig,
}

/// A loaded source ready to compile.
pub struct Loaded {
    pub requests: Vec<RequestNode>,
    pub resolver: PropertyResolver,
    pub default_headers: Vec<(String, String)>,
}

impl DothttpClient {
    pub fn new(config: DothttpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DothttpConfig {
        &self.config
    }

    fn resolver(&self) -> Result<(PropertyResolver, Vec<(String, String)>), DothttpError> {
        let path = match &self.config.property_file {
            Some(p) => Some(p.clone()),
            None => PropertyFile::discover(self.config.source.path()),
        };
        let file = match &path {
            Some(p) => PropertyFile::load(p)?,
            None => PropertyFile::default(),
        };
        let mut resolver = PropertyResolver::new(file.path.as_ref().map(|_| file.display_name()));
        for (k, v) in file.env_properties(&self.config.envs) {
            resolver.add_env_property(k, v);
        }
        for (k, command) in file.commands() {
            resolver.add_system_command(k, command);
        }
        for (k, v) in &self.config.properties {
            resolver.add_command_line_property(k.clone(), v.clone());
        }
        Ok((resolver, file.headers()))
    }

    pub fn load(&self) -> Result<Loaded, DothttpError> {
        let (mut resolver, default_headers) = self.resolver()?;
        let requests = match &self.config.source {
            Source::File(path) => loader::load_file(path, &mut resolver)?,
            Source::Content { content, path } => {
                loader::load_content(content, path.as_deref(), &mut resolver)?
            }
        };
        debug!("loaded {} request(s)", requests.len());
        Ok(Loaded {
            requests,
            resolver,
            default_headers,
        })
    }

    /// Compiles the target without running any script.
    pub fn compile(&self) -> Result<HttpDef, DothttpError> {
        let mut loaded = self.load()?;
        Compiler::new(&loaded.requests, &mut loaded.resolver)
            .with_default_headers(loaded.default_headers)
            .compile(&self.config.target)
    }

    /// The target as it compiles before any script runs. Unresolved
    /// placeholders are left as written, so properties a pre-request hook
    /// is about to set do not fail it.
    fn preview_request(&self) -> ScriptRequest {
        let preview = self.load().and_then(|mut loaded| {
            let resolver = std::mem::take(&mut loaded.resolver).lenient();
            loaded.resolver = resolver;
            Compiler::new(&loaded.requests, &mut loaded.resolver)
                .with_default_headers(loaded.default_headers)
                .compile(&self.config.target)
        });
        match preview {
            Ok(def) => ScriptRequest::from_def(&def),
            Err(e) => {
                debug!("request preview for scripts failed: {e}");
                ScriptRequest::default()
            }
        }
    }

    /// Compiles the target, running its pre-request script hooks.
    pub fn compile_with_script(
        &self,
    ) -> Result<(HttpDef, Option<Box<dyn ScriptEngine>>), DothttpError> {
        let mut loaded = self.load()?;
        let properties = loaded.resolver.all_properties();
        let mut engine: Option<Box<dyn ScriptEngine>> = None;
        let def = Compiler::new(&loaded.requests, &mut loaded.resolver)
            .with_default_headers(loaded.default_headers)
            .compile_with(&self.config.target, |ast| {
                let mut e = script::engine_for(ast);
                e.initialize(ScriptClient {
                    request: self.preview_request(),
                    properties,
                })?;
                let updates = e.run_pre_request()?;
                engine = Some(e);
                Ok(updates)
            })?;
        Ok((def, engine))
    }

    pub fn curl(&self) -> Result<Execution, DothttpError> {
        let def = self.compile()?;
        let curl = curl::to_curl(&def)?;
        Ok(Execution {
            name: def.name.clone(),
            http: def.to_dsl(),
            curl: Some(curl),
            response: None,
            response_view: None,
            script_result: None,
            def,
        })
    }

    pub async fn run(&self, session: &Session) -> Result<Execution, DothttpError> {
        let (def, engine) = self.compile_with_script()?;
        info!("executing `{}`: {} {}", def.name, def.method.as_str(), def.full_url());

        let start = Instant::now();
        let response = session.execute(&def).await?;
        debug!(
            "`{}` answered {} in {} ms",
            def.name,
            response.status,
            start.elapsed().as_millis()
        );

        if let Some(path) = &def.output {
            session::write_output(path, &response.body)?;
            info!("response saved to {}", path.display());
        }

        let script_result = engine.map(|mut engine| {
            let script_response = ScriptResponse {
                text: response.text(),
                status: response.status,
                headers: response.headers.clone(),
            };
            engine.run_tests(&ScriptRequest::from_def(&def), &script_response)
        });

        Ok(Execution {
            name: def.name.clone(),
            http: def.to_dsl(),
            curl: None,
            response_view: Some(ResponseView::from(&response)),
            response: Some(response),
            script_result,
            def,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn content(text: &str) -> DothttpConfig {
        DothttpConfig::new(Source::Content {
            content: text.to_string(),
            path: None,
        })
    }

    #[test]
    fn test_property_file_envs_and_headers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".dothttp.json"),
            r#"{"headers": {"X-Team": "core"}, "*": {"host": "a.test"}, "prod": {"host": "b.test"}}"#,
        )
        .unwrap();
        let file = dir.path().join("api.http");
        fs::write(&file, "GET \"https://{{host}}/x\"\n").unwrap();

        let mut config = DothttpConfig::new(Source::File(file.clone()));
        let def = DothttpClient::new(config.clone()).compile().unwrap();
        assert_eq!(def.url, "https://a.test/x");
        assert_eq!(def.headers.get("x-team"), Some("core"));

        config.envs = vec!["prod".into()];
        assert_eq!(
            DothttpClient::new(config.clone()).compile().unwrap().url,
            "https://b.test/x"
        );

        config.properties = vec![("host".into(), "c.test".into())];
        assert_eq!(
            DothttpClient::new(config).compile().unwrap().url,
            "https://c.test/x"
        );
    }

    #[test]
    fn test_explicit_property_file_must_exist() {
        let mut config = content("GET \"http://h/\"\n");
        config.property_file = Some("/nonexistent/props.json".into());
        let err = DothttpClient::new(config).compile().unwrap_err();
        assert_eq!(
            err.to_string(),
            "property file: `/nonexistent/props.json` not found"
        );
    }

    #[test]
    fn test_curl_execution() {
        let execution = DothttpClient::new(content("GET \"https://httpbin.org/get\"\n"))
            .curl()
            .unwrap();
        assert_eq!(
            execution.curl.as_deref(),
            Some("curl -X GET --url https://httpbin.org/get")
        );
        assert_eq!(execution.name, "1");
    }

    #[tokio::test]
    async fn test_run_writes_output_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/echo"))
            .and(header("content-type", "application/json"))
            .and(body_string(r#"{"hello": "ada"}"#))
            .respond_with(ResponseTemplate::new(200).set_body_string("saved"))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("api.http");
        fs::write(
            &file,
            format!(
                "POST \"{}/echo\"\njson({{\"hello\": \"{{{{name}}}}\"}})\noutput(\"out.txt\")\n",
                server.uri()
            ),
        )
        .unwrap();
        let mut config = DothttpConfig::new(Source::File(file));
        config.properties = vec![("name".into(), "ada".into())];
        let execution = DothttpClient::new(config)
            .run(&Session::new(false))
            .await
            .unwrap();
        assert_eq!(execution.response_view.unwrap().status, 200);
        assert_eq!(
            fs::read_to_string(dir.path().join("out.txt")).unwrap(),
            "saved"
        );
    }

    #[cfg(feature = "python")]
    #[test]
    fn test_pre_request_sees_compiled_request() {
        let text = "GET \"https://h/a\"\n\"X-Seen\": \"{{seen}}\"\n> {% python\ndef pre_seen():\n    client.properties.set(\"seen\", client.request[\"method\"] + \" \" + client.request[\"url\"])\n%}\n";
        let (def, engine) = DothttpClient::new(content(text))
            .compile_with_script()
            .unwrap();
        assert!(engine.is_some());
        assert_eq!(def.headers.get("x-seen"), Some("GET https://h/a"));
    }

    #[cfg(feature = "javascript")]
    #[tokio::test]
    async fn test_run_executes_script_tests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "t1"})),
            )
            .mount(&server)
            .await;
        let text = format!(
            "GET \"{}/login\"\n> {{%\nclient.test(\"status ok\", function () {{ client.assert(response.status === 200, \"bad\"); }});\nclient.global.set(\"token\", response.body.token);\n%}}\n",
            server.uri()
        );
        let execution = DothttpClient::new(content(&text))
            .run(&Session::new(false))
            .await
            .unwrap();
        let result = execution.script_result.unwrap();
        assert!(result.compiled);
        assert_eq!(result.tests.len(), 1);
        assert!(result.tests[0].success);
        assert_eq!(result.properties.get("token").map(String::as_str), Some("t1"));
    }
}
