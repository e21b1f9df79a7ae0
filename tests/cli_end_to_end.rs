use std::io::Write;

use assert_cmd::Command;
use predicates::{prelude::*, str::contains};
use tempfile::NamedTempFile;

fn input_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("tmp file");
    file.write_all(contents.as_bytes()).expect("write input");
    file
}

fn highlight_code() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("highlight-code"));
    cmd.env_remove("HIGHLIGHT_CODE_CONFIG_FILE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn renders_markdown_file_with_base_url() {
    let input = input_file("# Guide\n\n[next](/b.md)\n\n<script>alert(1)</script>\n");

    highlight_code()
        .arg("render")
        .arg(input.path())
        .args(["--base-url", "https://example.com/docs/"])
        .assert()
        .success()
        .stdout(contains("<highlight-code class=\"block\">"))
        .stdout(contains("<h1>Guide</h1>"))
        .stdout(contains("href=\"https://example.com/docs/b.md\""))
        .stdout(contains("<script").not());
}

#[test]
fn renders_code_from_stdin_as_json() {
    let assert = highlight_code()
        .args(["render", "-", "--language", "python", "--format", "json"])
        .write_stdin("print('hi')\n")
        .assert()
        .success();

    let output: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("json output");
    let classes = output["classes"].as_array().expect("classes array");
    assert!(classes.iter().any(|class| class == "language-python"));
    assert!(classes.iter().any(|class| class == "whitespace-pre"));
    assert!(output["html"].as_str().expect("html").contains("print"));
}

#[test]
fn lists_known_languages() {
    highlight_code()
        .arg("languages")
        .assert()
        .success()
        .stdout(contains("Rust"))
        .stdout(contains("Python"));
}

#[test]
fn missing_input_fails_fast() {
    highlight_code()
        .args(["render", "/definitely/not/here.md"])
        .assert()
        .failure()
        .stderr(contains("failed to read input"));
}
