//! End-to-end runs of the `webapi` binary: exit codes and what lands on
//! stdout versus stderr.

use std::process::{Command, Output};

use serde_json::json;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn webapi() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_webapi"));
    cmd.env_remove("ORACLE_GEMINI_SECURE_1PSID")
        .env_remove("ORACLE_GEMINI_SECURE_1PSIDTS")
        .env_remove("ORACLE_GEMINI_NID")
        .env_remove("WEBAPI_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn run(args: &[&str]) -> Output {
    webapi().args(args).output().expect("failed to run webapi")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn help_prints_usage_and_exits_zero() {
    let output = run(&["--help"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).starts_with("Usage: webapi [OPTIONS] PROMPT"));
    assert!(stderr(&output).is_empty());

    let output = run(&["some", "prompt", "-h", "--bogus"]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn missing_flag_value_names_the_flag() {
    let output = run(&["prompt", "--file"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
    assert_eq!(stderr(&output), "Error: --file requires a path\n");

    let output = run(&["prompt", "--model"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("--model requires a model name"));
}

#[test]
fn missing_prompt_prints_hint() {
    let output = run(&["--json"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stderr(&output),
        "Error: PROMPT is required\nUse --help for usage information\n"
    );
}

#[test]
fn unknown_option_exits_one() {
    let output = run(&["prompt", "--verbose"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Unknown option --verbose"));
}

#[test]
fn missing_attachment_fails_before_connecting() {
    let output = webapi()
        .args(["Summarize", "--file", "/no/such/report.pdf"])
        .env("WEBAPI_GATEWAY_URL", "http://127.0.0.1:9")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("Error: File not found: /no/such/report.pdf"));
    assert!(!err.contains("Initializing"));
}

#[test]
fn session_init_failure_prints_login_hint() {
    let dir = tempfile::tempdir().unwrap();
    let output = webapi()
        .args(["hello"])
        .env("WEBAPI_GATEWAY_URL", "http://127.0.0.1:9")
        .env("WEBAPI_COOKIE_FILE", dir.path().join("missing.json"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("Initializing Gemini client..."));
    assert!(err.contains("Error initializing client: "));
    assert!(err.contains("Make sure you're logged into gemini.google.com in Chrome"));
    assert!(stdout(&output).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unrecovered_image_reports_text_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "t" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "http://googleusercontent.com/image_generation_content/0"
        })))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/session"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("sunset.png");
    let uri = server.uri();
    let output = std::thread::spawn(move || {
        webapi()
            .args(["A sunset", "--generate-image"])
            .arg(&target)
            .env("WEBAPI_GATEWAY_URL", uri)
            .env("ORACLE_GEMINI_SECURE_1PSID", "psid")
            .env("ORACLE_GEMINI_SECURE_1PSIDTS", "psidts")
            .output()
            .unwrap()
    })
    .join()
    .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stdout(&output),
        "http://googleusercontent.com/image_generation_content/0\n"
    );
    let err = stderr(&output);
    assert!(err.contains("Retrying image generation with gemini-2.5-pro..."));
    assert!(err.contains("Retrying image generation with gemini-2.5-flash..."));
    assert!(err.contains("No images generated. Response text:"));
    assert!(!err.contains("Error:"));
    assert!(!dir.path().join("sunset.png").exists());
    server.verify().await;
}
