use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::models::AttendanceStatus;

fn handle_admin_overview(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let mut groups: Vec<&str> = Vec::new();
    for student in app.roster.students() {
        if !groups.contains(&student.group.as_str()) {
            groups.push(&student.group);
        }
    }
    ok(
        &req.id,
        json!({
            "studentCount": app.roster.students().len(),
            "groupCount": groups.len(),
            "groups": groups,
            "sessionCount": app.roster.sessions().len(),
        }),
    )
}

fn handle_student_dashboard(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(user) = app.auth.current_user() else {
        return err(&req.id, "not_signed_in", "no active session", None);
    };

    // Resolve the profile by account link first, then by e-mail.
    let profile = app
        .roster
        .students()
        .iter()
        .find(|s| s.user_id.as_deref() == Some(user.id.as_str()))
        .or_else(|| app.roster.students().iter().find(|s| s.email == user.email));
    let Some(profile) = profile else {
        return err(
            &req.id,
            "profile_not_found",
            "no student profile is linked to this account",
            None,
        );
    };

    let mut records: Vec<serde_json::Value> = Vec::new();
    let mut present = 0usize;
    let mut absent = 0usize;
    let mut late = 0usize;
    for session in app.roster.sessions() {
        let Some(record) = session.records.iter().find(|r| r.student_id == profile.id) else {
            continue;
        };
        match record.status {
            AttendanceStatus::Present => present += 1,
            AttendanceStatus::Absent => absent += 1,
            AttendanceStatus::Late => late += 1,
        }
        records.push(json!({
            "sessionId": session.id,
            "discipline": session.discipline,
            "date": session.date,
            "group": session.group,
            "timeslot": session.timeslot,
            "instructor": session.instructor,
            "status": record.status,
            "reason": record.reason,
        }));
    }

    let total = records.len();
    let attendance_rate = if total == 0 {
        0
    } else {
        ((present as f64 / total as f64) * 100.0).round() as i64
    };

    ok(
        &req.id,
        json!({
            "profile": serde_json::to_value(profile).unwrap_or_else(|_| json!({})),
            "records": records,
            "stats": {
                "total": total,
                "present": present,
                "absent": absent,
                "late": late,
                "attendanceRate": attendance_rate,
            }
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "admin.overview" => Some(handle_admin_overview(state, req)),
        "student.dashboard" => Some(handle_student_dashboard(state, req)),
        _ => None,
    }
}
