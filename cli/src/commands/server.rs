use crate::client::{DothttpClient, DothttpConfig, Session, Source};
use crate::compiler::target::DEFAULT_TARGET;
use crate::core::error::DothttpError;
use crate::property::property_file::value_text;
use crate::syntax::{self, format, position};
use clap::Args;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error};

#[derive(Debug, Args)]
#[command(about = "Serve requests as line-delimited JSON on stdin/stdout")]
pub struct ServerArgs {}

#[derive(Debug, Deserialize)]
pub struct ServerRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

fn param_str<'a>(params: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

fn required_str<'a>(params: &'a Map<String, Value>, key: &str) -> Result<&'a str, DothttpError> {
    param_str(params, key)
        .ok_or_else(|| DothttpError::Generic(format!("missing parameter `{key}`")))
}

fn param_bool(params: &Map<String, Value>, key: &str) -> bool {
    params.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn source(params: &Map<String, Value>, from_content: bool) -> Result<Source, DothttpError> {
    let file = param_str(params, "file").map(PathBuf::from);
    if from_content {
        Ok(Source::Content {
            content: required_str(params, "content")?.to_string(),
            path: file,
        })
    } else {
        file.map(Source::File)
            .ok_or_else(|| DothttpError::Generic("missing parameter `file`".into()))
    }
}

fn config(params: &Map<String, Value>, source: Source) -> DothttpConfig {
    let mut config = DothttpConfig::new(source);
    config.target = match params.get("target") {
        Some(Value::String(t)) => t.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => DEFAULT_TARGET.to_string(),
    };
    config.envs = match params.get("env") {
        Some(Value::Array(envs)) => envs.iter().map(value_text).collect(),
        Some(Value::String(env)) => vec![env.clone()],
        _ => Vec::new(),
    };
    config.properties = match params.get("properties") {
        Some(Value::Object(props)) => props
            .iter()
            .map(|(k, v)| (k.clone(), value_text(v)))
            .collect(),
        _ => Vec::new(),
    };
    config.property_file = param_str(params, "property-file").map(PathBuf::from);
    config
}

fn document_text(params: &Map<String, Value>, from_content: bool) -> Result<String, DothttpError> {
    if from_content {
        Ok(required_str(params, "content")?.to_string())
    } else {
        let file = PathBuf::from(required_str(params, "file")?);
        syntax::analyze::read_source(&file, crate::core::error::FileKind::Http)
    }
}

async fn execute(
    params: &Map<String, Value>,
    from_content: bool,
    session: &Session,
) -> Result<Value, DothttpError> {
    let client = DothttpClient::new(config(params, source(params, from_content)?));
    let execution = if param_bool(params, "curl") {
        client.curl()?
    } else if param_bool(params, "nocookie") {
        client.run(&Session::new(false)).await?
    } else {
        client.run(session).await?
    };
    serde_json::to_value(&execution).map_err(|e| DothttpError::Generic(e.to_string()))
}

fn format_text(text: &str) -> Result<Value, DothttpError> {
    let doc = syntax::parse(text, None)?;
    Ok(json!({ "formatted": format::format_document(&doc) }))
}

fn names(text: &str) -> Result<Value, DothttpError> {
    let doc = syntax::parse(text, None)?;
    let (names, urls) = position::names_and_urls(&doc);
    Ok(json!({ "names": names, "urls": urls }))
}

fn type_at(params: &Map<String, Value>) -> Result<Value, DothttpError> {
    let text = required_str(params, "content")?;
    let position = params
        .get("position")
        .and_then(Value::as_u64)
        .ok_or_else(|| DothttpError::Generic("missing parameter `position`".into()))?;
    let doc = syntax::parse(text, None)?;
    serde_json::to_value(position::type_at_position(&doc, position as usize))
        .map_err(|e| DothttpError::Generic(e.to_string()))
}

/// Result of one method call; failures become `{"error": true, "error_message": ...}`.
pub async fn handle(request: &ServerRequest, session: &Session) -> Value {
    let params = &request.params;
    let result = match request.method.as_str() {
        "/file/execute" => execute(params, false, session).await,
        "/content/execute" => execute(params, true, session).await,
        "/file/format" => document_text(params, false).and_then(|t| format_text(&t)),
        "/content/format" => document_text(params, true).and_then(|t| format_text(&t)),
        "/file/names" => document_text(params, false).and_then(|t| names(&t)),
        "/content/names" => document_text(params, true).and_then(|t| names(&t)),
        "/content/type" => type_at(params),
        other => Err(DothttpError::Generic(format!("unknown method `{other}`"))),
    };
    match result {
        Ok(value) => value,
        Err(e) => json!({ "error": true, "error_message": e.to_string() }),
    }
}

/// Turns one input line into one output line.
pub async fn handle_line(line: &str, session: &Session) -> String {
    let response = match serde_json::from_str::<ServerRequest>(line) {
        Ok(request) => {
            debug!("server request {} {}", request.id, request.method);
            json!({ "id": request.id, "result": handle(&request, session).await })
        }
        Err(e) => json!({
            "id": Value::Null,
            "result": { "error": true, "error_message": format!("invalid request: {e}") }
        }),
    };
    response.to_string()
}

fn reap(finished: Result<(), JoinError>) {
    if let Err(e) = finished {
        error!("server worker failed: {e}");
    }
}

/// Answers every non-empty line of `reader`. Each line runs on the blocking
/// pool, since compiling and scripting are synchronous.
pub async fn serve_lines<R>(
    reader: R,
    session: Session,
    tx: mpsc::UnboundedSender<String>,
) -> Result<(), DothttpError>
where
    R: AsyncBufRead + Unpin,
{
    let runtime = Handle::current();
    let mut lines = reader.lines();
    let mut workers = JoinSet::new();
    while let Some(line) = lines.next_line().await? {
        while let Some(finished) = workers.try_join_next() {
            reap(finished);
        }
        if line.trim().is_empty() {
            continue;
        }
        let session = session.clone();
        let tx = tx.clone();
        let runtime = runtime.clone();
        workers.spawn_blocking(move || {
            let response = runtime.block_on(handle_line(&line, &session));
            let _ = tx.send(response);
        });
    }
    while let Some(finished) = workers.join_next().await {
        reap(finished);
    }
    Ok(())
}

pub async fn execute_server(_args: &ServerArgs) -> Result<(), DothttpError> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            if let Err(e) = stdout.write_all(format!("{line}\n").as_bytes()).await {
                error!("could not write response: {e}");
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    let served = serve_lines(BufReader::new(tokio::io::stdin()), Session::default(), tx).await;
    let _ = writer.await;
    served
}
