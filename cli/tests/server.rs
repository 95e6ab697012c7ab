mod common;
use common::{dothttp_bin, json_subset, write_file};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Sends each request as one line and collects the responses by id.
async fn serve(requests: &[Value]) -> HashMap<String, Value> {
    let mut child = tokio::process::Command::new(dothttp_bin())
        .arg("server")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to spawn dothttp server");

    let mut stdin = child.stdin.take().unwrap();
    for request in requests {
        stdin
            .write_all(format!("{request}\n").as_bytes())
            .await
            .unwrap();
    }
    drop(stdin);

    let mut responses = HashMap::new();
    let mut lines = BufReader::new(child.stdout.take().unwrap()).lines();
    while let Some(line) = lines.next_line().await.unwrap() {
        let value: Value = serde_json::from_str(&line).unwrap();
        responses.insert(value["id"].to_string(), value["result"].clone());
    }
    assert!(child.wait().await.unwrap().success());
    responses
}

#[tokio::test]
async fn test_server_answers_every_line() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
        .mount(&mock)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = write_file(
        dir.path(),
        "api.http",
        "@name(\"first\")\nGET \"http://h/a\"\n\n@name(\"second\")\nPOST \"http://h/b\"\n",
    );

    let responses = serve(&[
        json!({
            "id": 1,
            "method": "/content/execute",
            "params": {
                "content": "GET \"{{base}}/ping\"\n",
                "properties": {"base": mock.uri()}
            }
        }),
        json!({
            "id": 2,
            "method": "/file/names",
            "params": {"file": file.to_str().unwrap()}
        }),
        json!({
            "id": 3,
            "method": "/content/format",
            "params": {"content": "GET    \"http://h/\"\n"}
        }),
        json!({"id": 4, "method": "/nope", "params": {}}),
    ])
    .await;

    assert_eq!(responses.len(), 4);
    assert!(json_subset(
        &json!({"response": {"status": 200, "body": "pong"}}),
        &responses["1"]
    ));
    let names: Vec<&str> = responses["2"]["names"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["name"].as_str())
        .collect();
    assert_eq!(names, vec!["first", "second"]);
    assert!(responses["3"]["formatted"]
        .as_str()
        .unwrap()
        .starts_with("GET \"http://h/\""));
    assert_eq!(
        responses["4"],
        json!({"error": true, "error_message": "unknown method `/nope`"})
    );
}

#[tokio::test]
async fn test_server_reports_invalid_lines() {
    let mut child = tokio::process::Command::new(dothttp_bin())
        .arg("server")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    stdin.write_all(b"not json\n").await.unwrap();
    drop(stdin);

    let output = child.wait_with_output().await.unwrap();
    let line = String::from_utf8_lossy(&output.stdout);
    let value: Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(value["id"], Value::Null);
    assert_eq!(value["result"]["error"], json!(true));
}
