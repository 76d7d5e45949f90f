use serde_json::json;

use crate::auth::{AuthError, RegisterPayload};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{non_empty, optional_bool, optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::models::{Role, User};

// Responses never carry the stored password.
fn user_json(user: &User) -> serde_json::Value {
    json!({
        "id": user.id,
        "role": user.role,
        "fullName": user.full_name,
        "email": user.email,
        "group": user.group,
        "studentId": user.student_id,
    })
}

fn auth_err(id: &str, e: AuthError) -> serde_json::Value {
    err(id, e.code(), e.message(), None)
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let email = match required_str(&req.params, "email") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let password = match required_str(&req.params, "password") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let role = match required_str(&req.params, "role") {
        Ok(v) => match Role::parse(&v) {
            Some(r) => r,
            None => return err(&req.id, "bad_params", "role must be admin or student", None),
        },
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let stay_signed_in = optional_bool(&req.params, "staySignedIn").unwrap_or(false);

    match app
        .auth
        .login(&mut app.store, &email, &password, role, stay_signed_in)
    {
        Ok(user) => ok(&req.id, json!({ "user": user_json(user) })),
        Err(e) => auth_err(&req.id, e),
    }
}

fn handle_register(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let full_name = match required_str(&req.params, "fullName") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let email = match required_str(&req.params, "email") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let password = match required_str(&req.params, "password") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let role = match required_str(&req.params, "role") {
        Ok(v) => match Role::parse(&v) {
            Some(r) => r,
            None => return err(&req.id, "bad_params", "role must be admin or student", None),
        },
        Err(m) => return err(&req.id, "bad_params", m, None),
    };

    let payload = RegisterPayload {
        full_name,
        email,
        password,
        confirm_password: optional_str(&req.params, "confirmPassword"),
        role,
        group: non_empty(optional_str(&req.params, "group")),
        student_id: non_empty(optional_str(&req.params, "studentId")),
    };

    match app.auth.register(&mut app.store, payload) {
        Ok(user) => ok(&req.id, json!({ "user": user_json(user) })),
        Err(e) => auth_err(&req.id, e),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    app.auth.logout(&mut app.store);
    ok(&req.id, json!({ "ok": true }))
}

fn handle_current_user(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let user = app
        .auth
        .current_user()
        .map(user_json)
        .unwrap_or(serde_json::Value::Null);
    ok(&req.id, json!({ "user": user }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.register" => Some(handle_register(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.currentUser" => Some(handle_current_user(state, req)),
        _ => None,
    }
}
