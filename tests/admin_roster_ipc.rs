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

fn request_ok(
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
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn student_names(result: &serde_json::Value) -> Vec<String> {
    result
        .get("students")
        .and_then(|v| v.as_array())
        .expect("students")
        .iter()
        .filter_map(|s| s.get("fullName").and_then(|v| v.as_str()))
        .map(|s| s.to_string())
        .collect()
}

#[test]
fn list_filters_by_search_and_status() {
    let workspace = temp_dir("attendance-admin-filters");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    // Search matches across name, group, student id and e-mail.
    let by_name = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.list",
        json!({ "search": "лебедева" }),
    );
    assert_eq!(student_names(&by_name), vec!["Анна Лебедева".to_string()]);

    let by_group = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.list",
        json!({ "search": "бпм-21-2" }),
    );
    assert_eq!(student_names(&by_group), vec!["Дарья Фомина".to_string()]);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.update",
        json!({ "id": "stu-2", "status": "expelled" }),
    );
    let expelled = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.list",
        json!({ "status": "expelled" }),
    );
    assert_eq!(student_names(&expelled), vec!["Максим Гордеев".to_string()]);

    // "all" is the original's filter-off sentinel.
    let all = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.list",
        json!({ "status": "all" }),
    );
    assert_eq!(student_names(&all).len(), 3);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn bulk_update_applies_the_patch_to_every_listed_student() {
    let workspace = temp_dir("attendance-admin-bulk");
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
        "students.bulkUpdate",
        json!({ "ids": ["stu-1", "stu-2"], "status": "academic leave" }),
    );
    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.list",
        json!({ "status": "academic leave" }),
    );
    let names = student_names(&listed);
    assert_eq!(names.len(), 2);
    assert!(!names.contains(&"Дарья Фомина".to_string()));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn overview_counts_students_groups_and_sessions() {
    let workspace = temp_dir("attendance-admin-overview");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let overview = request_ok(&mut stdin, &mut reader, "2", "admin.overview", json!({}));
    assert_eq!(overview.get("studentCount").and_then(|v| v.as_u64()), Some(3));
    assert_eq!(overview.get("groupCount").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(overview.get("sessionCount").and_then(|v| v.as_u64()), Some(1));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.create",
        json!({ "firstName": "Полина", "lastName": "Новикова", "group": "БПМ-22-1" }),
    );
    let overview = request_ok(&mut stdin, &mut reader, "4", "admin.overview", json!({}));
    assert_eq!(overview.get("studentCount").and_then(|v| v.as_u64()), Some(4));
    assert_eq!(overview.get("groupCount").and_then(|v| v.as_u64()), Some(3));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn roster_changes_survive_a_restart() {
    let workspace = temp_dir("attendance-admin-persist");
    {
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
            "students.create",
            json!({ "firstName": "Гриша", "lastName": "Стойкий", "group": "БПМ-22-9" }),
        );
        drop(stdin);
        let _ = child.wait();
    }

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.list",
        json!({ "search": "стойкий" }),
    );
    assert_eq!(student_names(&listed), vec!["Гриша Стойкий".to_string()]);

    drop(stdin);
    let _ = child.wait();
}
