use crate::client::{session::HttpResponse, DothttpClient, Execution, Session, Source};
use crate::commands::shared::PropertyArgs;
use crate::compiler::model::HttpDef;
use crate::core::{error::DothttpError, mime};
use crate::syntax::{self, format};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Args)]
pub struct RunArgs {
    #[arg(help = "Path to the .http file")]
    pub file: PathBuf,

    #[arg(
        short = 't',
        long = "target",
        default_value = crate::compiler::target::DEFAULT_TARGET,
        help = "Request to run, by name or 1-based index"
    )]
    pub target: String,

    #[command(flatten)]
    pub properties: PropertyArgs,

    #[arg(long = "curl", help = "Print a curl command instead of sending the request")]
    pub curl: bool,

    #[arg(long = "format", help = "Rewrite the file in canonical form")]
    pub format: bool,

    #[arg(long = "stdout", requires = "format", help = "With --format, print instead of rewriting")]
    pub stdout: bool,

    #[arg(long = "no-cookie", help = "Do not send or store cookies")]
    pub no_cookie: bool,

    #[arg(short = 'i', long = "info", help = "Print request and response lines")]
    pub info: bool,
}

pub fn execute_format(file: &Path, to_stdout: bool) -> Result<(), DothttpError> {
    let doc = syntax::parse_file(file)?;
    let formatted = format::format_document(&doc);
    if to_stdout {
        print!("{formatted}");
    } else {
        std::fs::write(file, formatted)?;
        info!("formatted {}", file.display());
    }
    Ok(())
}

fn print_request(def: &HttpDef) {
    println!("> {} {}", def.method.as_str(), def.full_url());
    for (k, v) in def.headers.iter() {
        println!("> {k}: {v}");
    }
    println!(">");
}

fn print_response(response: &HttpResponse) {
    println!("< {} {} {}", response.version, response.status, response.reason);
    for (k, v) in &response.headers {
        println!("< {k}: {v}");
    }
    println!("<");
}

/// Response body as shown on the terminal, pretty printed when it is JSON.
pub fn display_body(response: &HttpResponse) -> String {
    let is_json = response
        .header(mime::CONTENT_TYPE)
        .map(|ct| mime::essence(ct) == mime::APPLICATION_JSON)
        .unwrap_or(false);
    if is_json {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&response.body) {
            if let Ok(pretty) = serde_json::to_string_pretty(&value) {
                return pretty;
            }
        }
    }
    response.text()
}

fn print_execution(execution: &Execution, info: bool) {
    if let Some(curl) = &execution.curl {
        println!("{curl}");
        return;
    }
    if info {
        print_request(&execution.def);
    }
    if let Some(response) = &execution.response {
        if info {
            print_response(response);
        }
        if execution.def.output.is_none() {
            println!("{}", display_body(response));
        }
    }
    if let Some(result) = &execution.script_result {
        if !result.is_empty() || !result.compiled {
            print!("{result}");
        }
    }
}

pub async fn execute_run(args: &RunArgs) -> Result<(), DothttpError> {
    if args.format {
        return execute_format(&args.file, args.stdout);
    }
    let config = args
        .properties
        .config(Source::File(args.file.clone()), &args.target);
    let client = DothttpClient::new(config);
    let execution = if args.curl {
        client.curl()?
    } else {
        client.run(&Session::new(!args.no_cookie)).await?
    };
    print_execution(&execution, args.info);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(content_type: &str, body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            reason: "OK".into(),
            version: "HTTP/1.1".into(),
            url: "http://h/".into(),
            headers: vec![("content-type".into(), content_type.into())],
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_display_body_pretty_prints_json() {
        assert_eq!(
            display_body(&response("application/json; charset=utf-8", r#"{"a":1}"#)),
            "{\n  \"a\": 1\n}"
        );
        assert_eq!(display_body(&response("text/plain", r#"{"a":1}"#)), r#"{"a":1}"#);
        assert_eq!(display_body(&response("application/json", "not json")), "not json");
    }

    #[test]
    fn test_format_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("api.http");
        std::fs::write(&file, "GET   \"https://h/\"\n\n\n\"A\":  \"b\"\n").unwrap();
        execute_format(&file, false).unwrap();
        let formatted = std::fs::read_to_string(&file).unwrap();
        assert!(formatted.starts_with("GET \"https://h/\""));
        assert!(formatted.contains("\"A\": \"b\""));
    }
}
