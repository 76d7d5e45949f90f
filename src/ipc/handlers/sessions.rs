use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{non_empty, optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::models::{AttendanceSession, AttendanceStatus};
use crate::roster::{self, SessionDraft};

const DEFAULT_TIMESLOT: &str = "08:30 — 10:05";

fn session_json(session: &AttendanceSession) -> serde_json::Value {
    serde_json::to_value(session).unwrap_or_else(|_| json!({}))
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let group = optional_str(&req.params, "group");
    let sessions: Vec<serde_json::Value> = app
        .roster
        .sessions()
        .iter()
        .filter(|s| group.as_deref().map(|g| s.group == g).unwrap_or(true))
        .map(session_json)
        .collect();
    ok(&req.id, json!({ "sessions": sessions }))
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let discipline = match required_str(&req.params, "discipline") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let group = match required_str(&req.params, "group") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };

    let draft = SessionDraft {
        discipline,
        group,
        date: optional_str(&req.params, "date").unwrap_or_else(roster::today),
        timeslot: optional_str(&req.params, "timeslot")
            .unwrap_or_else(|| DEFAULT_TIMESLOT.to_string()),
        instructor: non_empty(optional_str(&req.params, "instructor")),
        notes: non_empty(optional_str(&req.params, "notes")),
    };
    let session = app.roster.create_session(&mut app.store, draft);
    ok(&req.id, json!({ "session": session_json(session) }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let session_id = match required_str(&req.params, "sessionId") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    if !app.roster.delete_session(&mut app.store, &session_id) {
        return err(&req.id, "not_found", "session not found", None);
    }
    ok(&req.id, json!({ "ok": true }))
}

fn handle_attendance_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let session_id = match required_str(&req.params, "sessionId") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let student_id = match required_str(&req.params, "studentId") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let status = match required_str(&req.params, "status") {
        Ok(v) => match AttendanceStatus::parse(&v) {
            Some(s) => s,
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "status must be present, absent or late",
                    None,
                )
            }
        },
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let reason = non_empty(optional_str(&req.params, "reason"));

    // Missing session or record is a no-op, not an error.
    let updated =
        app.roster
            .update_attendance(&mut app.store, &session_id, &student_id, status, reason);
    ok(&req.id, json!({ "updated": updated }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "sessions.list" => Some(handle_list(state, req)),
        "sessions.create" => Some(handle_create(state, req)),
        "sessions.delete" => Some(handle_delete(state, req)),
        "attendance.update" => Some(handle_attendance_update(state, req)),
        _ => None,
    }
}
