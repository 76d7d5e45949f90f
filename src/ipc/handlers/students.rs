use serde_json::json;

use crate::import;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{non_empty, optional_str, required_str, required_str_list};
use crate::ipc::types::{AppState, Request};
use crate::models::{StudentProfile, StudentStatus};
use crate::roster::{StudentDraft, StudentPatch};

fn student_json(student: &StudentProfile) -> serde_json::Value {
    serde_json::to_value(student).unwrap_or_else(|_| json!({}))
}

fn parse_status(params: &serde_json::Value, key: &str) -> Result<Option<StudentStatus>, String> {
    let Some(raw) = optional_str(params, key) else {
        return Ok(None);
    };
    StudentStatus::parse(&raw)
        .map(Some)
        .ok_or_else(|| format!("unknown status: {}", raw))
}

fn patch_from_params(params: &serde_json::Value) -> Result<StudentPatch, String> {
    Ok(StudentPatch {
        first_name: optional_str(params, "firstName"),
        last_name: optional_str(params, "lastName"),
        email: optional_str(params, "email"),
        student_id: optional_str(params, "studentId"),
        group: optional_str(params, "group"),
        status: parse_status(params, "status")?,
        note: optional_str(params, "note"),
        user_id: optional_str(params, "userId"),
    })
}

fn matches_search(student: &StudentProfile, needle: &str) -> bool {
    student.full_name.to_lowercase().contains(needle)
        || student.group.to_lowercase().contains(needle)
        || student.student_id.to_lowercase().contains(needle)
        || student.email.to_lowercase().contains(needle)
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let search = optional_str(&req.params, "search")
        .map(|s| s.to_lowercase())
        .unwrap_or_default();
    let status = match optional_str(&req.params, "status") {
        Some(raw) if raw != "all" => match StudentStatus::parse(&raw) {
            Some(s) => Some(s),
            None => return err(&req.id, "bad_params", format!("unknown status: {}", raw), None),
        },
        _ => None,
    };

    let students: Vec<serde_json::Value> = app
        .roster
        .students()
        .iter()
        .filter(|s| search.is_empty() || matches_search(s, &search))
        .filter(|s| status.map(|wanted| s.status == wanted).unwrap_or(true))
        .map(student_json)
        .collect();
    ok(&req.id, json!({ "students": students }))
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    // The admin form insists on a name and a group; the rest may stay blank.
    let first_name = match required_str(&req.params, "firstName") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let last_name = match required_str(&req.params, "lastName") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let group = match required_str(&req.params, "group") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let status = match parse_status(&req.params, "status") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };

    let draft = StudentDraft {
        first_name,
        last_name,
        email: optional_str(&req.params, "email").unwrap_or_default(),
        student_id: optional_str(&req.params, "studentId").unwrap_or_default(),
        group,
        status,
        note: non_empty(optional_str(&req.params, "note")),
        user_id: non_empty(optional_str(&req.params, "userId")),
    };
    let student = app.roster.add_student(&mut app.store, draft);
    ok(&req.id, json!({ "student": student_json(student) }))
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let id = match required_str(&req.params, "id") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let patch = match patch_from_params(&req.params) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    if !app.roster.update_student(&mut app.store, &id, patch) {
        return err(&req.id, "not_found", "student not found", None);
    }
    let student = app
        .roster
        .find_student(&id)
        .map(student_json)
        .unwrap_or(serde_json::Value::Null);
    ok(&req.id, json!({ "student": student }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let id = match required_str(&req.params, "id") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    if !app.roster.delete_student(&mut app.store, &id) {
        return err(&req.id, "not_found", "student not found", None);
    }
    ok(&req.id, json!({ "ok": true }))
}

fn handle_bulk_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let ids = match required_str_list(&req.params, "ids") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let patch = match patch_from_params(&req.params) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    app.roster.bulk_update_students(&mut app.store, &ids, &patch);
    ok(&req.id, json!({ "ok": true }))
}

fn handle_bulk_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let ids = match required_str_list(&req.params, "ids") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    app.roster.bulk_delete_students(&mut app.store, &ids);
    ok(&req.id, json!({ "ok": true }))
}

fn handle_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let text = match required_str(&req.params, "text") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let rows = import::parse_student_rows(&text);
    let imported = app.roster.import_students(&mut app.store, rows);
    if imported == 0 {
        return err(
            &req.id,
            "csv_not_recognized",
            "no student rows recognized; check the CSV format",
            None,
        );
    }
    ok(&req.id, json!({ "imported": imported }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_list(state, req)),
        "students.create" => Some(handle_create(state, req)),
        "students.update" => Some(handle_update(state, req)),
        "students.delete" => Some(handle_delete(state, req)),
        "students.bulkUpdate" => Some(handle_bulk_update(state, req)),
        "students.bulkDelete" => Some(handle_bulk_delete(state, req)),
        "students.import" => Some(handle_import(state, req)),
        _ => None,
    }
}
