use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_attendanced");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn attendanced");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn raw_request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = raw_request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request_err_code(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = raw_request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .expect("error code")
        .to_string()
}

#[test]
fn duplicate_registration_fails_case_insensitively() {
    let workspace = temp_dir("attendance-auth-duplicate");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "auth.register",
        json!({
            "fullName": "Пётр Соколов",
            "email": "p.sokolov@misis.ru",
            "password": "secret99",
            "role": "student",
            "group": "БПМ-21-1",
            "studentId": "21БПМ130"
        }),
    );
    let user = result.get("user").expect("user payload");
    assert_eq!(
        user.get("email").and_then(|v| v.as_str()),
        Some("p.sokolov@misis.ru")
    );
    assert!(user.get("password").is_none(), "password must not leak");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "3",
        "auth.register",
        json!({
            "fullName": "Самозванец",
            "email": "P.SOKOLOV@misis.ru",
            "password": "secret99",
            "role": "student"
        }),
    );
    assert_eq!(code, "duplicate_email");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn wrong_password_is_distinct_from_unknown_user() {
    let workspace = temp_dir("attendance-auth-distinct");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "2",
        "auth.login",
        json!({ "email": "admin@misis.ru", "password": "wrong", "role": "admin" }),
    );
    assert_eq!(code, "wrong_password");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "3",
        "auth.login",
        json!({ "email": "ghost@misis.ru", "password": "wrong", "role": "admin" }),
    );
    assert_eq!(code, "user_not_found");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn password_rules_are_enforced_at_registration() {
    let workspace = temp_dir("attendance-auth-passwords");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "2",
        "auth.register",
        json!({
            "fullName": "Короткий Пароль",
            "email": "short@misis.ru",
            "password": "abc",
            "role": "student"
        }),
    );
    assert_eq!(code, "password_too_short");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "3",
        "auth.register",
        json!({
            "fullName": "Несовпадение",
            "email": "mismatch@misis.ru",
            "password": "secret99",
            "confirmPassword": "secret00",
            "role": "student"
        }),
    );
    assert_eq!(code, "password_mismatch");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn registration_signs_the_user_in_and_logout_clears_it() {
    let workspace = temp_dir("attendance-auth-logout");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "auth.register",
        json!({
            "fullName": "Новый Студент",
            "email": "fresh@misis.ru",
            "password": "secret99",
            "role": "student"
        }),
    );
    let current = request_ok(&mut stdin, &mut reader, "3", "auth.currentUser", json!({}));
    assert_eq!(
        current
            .get("user")
            .and_then(|u| u.get("email"))
            .and_then(|v| v.as_str()),
        Some("fresh@misis.ru")
    );

    let _ = request_ok(&mut stdin, &mut reader, "4", "auth.logout", json!({}));
    let current = request_ok(&mut stdin, &mut reader, "5", "auth.currentUser", json!({}));
    assert!(current.get("user").map(|u| u.is_null()).unwrap_or(false));

    drop(stdin);
    let _ = child.wait();
}
