// End-to-end tests of the fakegen binary: flags, emit stages, exit codes,
// and the no-partial-output guarantee.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fakegen_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_fakegen"))
}

fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .to_path_buf()
}

fn fixture(name: &str) -> String {
    project_root()
        .join("testdata")
        .join(name)
        .to_str()
        .unwrap()
        .to_string()
}

fn run(args: &[&str]) -> Output {
    Command::new(fakegen_binary())
        .args(args)
        .env_remove("FAKEGEN_LOG")
        .output()
        .expect("failed to run fakegen")
}

fn stdout(out: &Output) -> String {
    String::from_utf8(out.stdout.clone()).expect("non-UTF8 output")
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("fakegen-cli-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

#[test]
fn generates_to_stdout() {
    let out = run(&[&fixture("store.go"), "--interface", "Store"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let code = stdout(&out);
    assert!(code.starts_with("// Code generated by fakegen. DO NOT EDIT.\n// source: sha256:"));
    assert!(code.contains("type FakeStore struct {"));
    assert!(code.contains("func (f *FakeStore) recordInvocation(key string, args []interface{}) {"));
}

#[test]
fn naming_flags() {
    let out = run(&[
        &fixture("store.go"),
        "-i",
        "Store",
        "--record-name",
        "StoreDouble",
        "--receiver",
        "sd",
        "--package",
        "storefakes",
        "--preserve-param-names",
    ]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let code = stdout(&out);
    assert!(code.contains("package storefakes\n"));
    assert!(code.contains("func (sd *StoreDouble) Get(ctx context.Context, key string) ([]byte, error) {"));
}

#[test]
fn writes_output_file() {
    let path = scratch("store_fake.go");
    let _ = std::fs::remove_file(&path);
    let out = run(&[&fixture("store.go"), "--interface", "Store", "-o", path.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).is_empty());
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("type FakeStore struct {"));
}

#[test]
fn failure_writes_nothing() {
    let path = scratch("cycle_fake.go");
    let _ = std::fs::remove_file(&path);
    let out = run(&[&fixture("cycle.go"), "--interface", "Node", "-o", path.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    assert!(!path.exists());
    let err = stderr(&out);
    assert!(err.contains("error[E0104]"), "stderr: {err}");
    assert!(err.contains("Node -> Edge -> Node"), "stderr: {err}");
}

#[test]
fn unknown_interface_lists_candidates() {
    let out = run(&[&fixture("logger.go"), "--interface", "Nope"]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("fakegen: error[E0101]: interface 'Nope' not found"), "stderr: {err}");
    assert!(err.contains("Flusher, Logger, Sink"), "stderr: {err}");
}

#[test]
fn missing_interface_flag() {
    let out = run(&[&fixture("store.go")]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("error[E0100]"));
}

#[test]
fn missing_source_is_io_error() {
    let out = run(&["/nonexistent/fakegen/input.go", "--interface", "X"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("fakegen: error: /nonexistent/fakegen/input.go"));
}

#[test]
fn record_mode() {
    let out = run(&[&fixture("clock.go"), "--record", "Clock"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let code = stdout(&out);
    assert!(code.contains("type FakeClock struct {"));
    assert!(code.contains("\tzone "));
    assert!(code.contains("`json:\"offset\"`"), "{code}");
    assert!(code.contains("func (f *FakeClock) Now() time.Time {"));
    assert!(code.contains("func (f *FakeClock) Sleep(arg1 time.Duration) {"));
    // Value-receiver methods are not part of the fake.
    assert!(!code.contains("ZoneStub"));
}

#[test]
fn record_and_interface_conflict() {
    let out = run(&[&fixture("clock.go"), "--record", "Clock", "--interface", "X"]);
    assert!(!out.status.success());
}

#[test]
fn emit_signatures_json() {
    let out = run(&[&fixture("logger.go"), "--interface", "Logger", "--emit", "signatures"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let value: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(value["name"], "Logger");
    let methods = value["methods"].as_array().unwrap();
    let names: Vec<&str> = methods.iter().map(|m| m["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Flush", "Logf", "SetDeadline"]);
    assert_eq!(methods[0]["results"][0], "error");
    assert_eq!(methods[1]["params"][1]["variadic"], true);
    assert_eq!(methods[1]["params"][1]["ty"], "interface{}");
}

#[test]
fn emit_build_info() {
    let out = run(&[&fixture("store.go"), "--emit", "build-info"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let value: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(value["generator_version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(value["source_hash"].as_str().unwrap().len(), 64);
}

#[test]
fn emit_ast_and_fake() {
    let ast = run(&[&fixture("store.go"), "--emit", "ast"]);
    assert!(ast.status.success());
    assert!(stdout(&ast).contains("SourceFile"));

    let fake = run(&[&fixture("store.go"), "--interface", "Store", "--emit", "fake"]);
    assert!(fake.status.success());
    assert!(stdout(&fake).contains("FakeFile"));
}

#[test]
fn syntax_errors_report_positions() {
    let path = scratch("broken.go");
    std::fs::write(&path, "package p\n\ntype X interface {\n\tM(a int, string)\n}\n").unwrap();
    let out = run(&[path.to_str().unwrap(), "--interface", "X"]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("fakegen: 4:"), "stderr: {err}");
    assert!(err.contains("error[E0001]"), "stderr: {err}");
}

#[test]
fn same_input_same_output() {
    let first = stdout(&run(&[&fixture("logger.go"), "--interface", "Logger"]));
    let second = stdout(&run(&[&fixture("logger.go"), "--interface", "Logger"]));
    assert_eq!(first, second);
}
