use uuid::Uuid;

use crate::models::{AuthSession, Role, User};
use crate::store::{Store, AUTH_SESSION_KEY, USERS_KEY};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    UserNotFound,
    WrongPassword,
    DuplicateEmail,
    PasswordTooShort,
    PasswordMismatch,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::UserNotFound => "user_not_found",
            AuthError::WrongPassword => "wrong_password",
            AuthError::DuplicateEmail => "duplicate_email",
            AuthError::PasswordTooShort => "password_too_short",
            AuthError::PasswordMismatch => "password_mismatch",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthError::UserNotFound => "user not found",
            AuthError::WrongPassword => "wrong password",
            AuthError::DuplicateEmail => "a user with this e-mail already exists",
            AuthError::PasswordTooShort => "password must be at least 6 characters",
            AuthError::PasswordMismatch => "passwords do not match",
        }
    }
}

pub struct RegisterPayload {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: Option<String>,
    pub role: Role,
    pub group: Option<String>,
    pub student_id: Option<String>,
}

/// Owns the user collection and the active auth session. The session entry
/// is persisted only while "stay signed in" is set.
pub struct AuthManager {
    users: Vec<User>,
    session: Option<AuthSession>,
}

fn default_users() -> Vec<User> {
    vec![
        User {
            id: "admin-1".to_string(),
            role: Role::Admin,
            full_name: "Администратор МИСИС".to_string(),
            email: "admin@misis.ru".to_string(),
            password: "admin1234".to_string(),
            group: None,
            student_id: None,
        },
        User {
            id: "student-1".to_string(),
            role: Role::Student,
            full_name: "Анна Лебедева".to_string(),
            email: "a.lebedeva@misis.ru".to_string(),
            password: "student123".to_string(),
            group: Some("БПМ-21-1".to_string()),
            student_id: Some("21БПМ101".to_string()),
        },
    ]
}

impl AuthManager {
    pub fn load(store: &mut Store) -> Self {
        let users = store.read_json(USERS_KEY).unwrap_or_else(default_users);
        let session: Option<AuthSession> = store.read_json(AUTH_SESSION_KEY);
        let mut mgr = Self { users, session };
        mgr.patch_admin_display_name(store);
        mgr
    }

    // Workspaces seeded by early builds carry the old "МИСиС" casing in the
    // admin display name; rewrite it once on load.
    fn patch_admin_display_name(&mut self, store: &mut Store) {
        let stale = self.users.iter().position(|u| {
            (u.id == "admin-1" || u.email == "admin@misis.ru") && u.full_name.contains("МИСиС")
        });
        if let Some(i) = stale {
            self.users[i].full_name = "Администратор МИСИС".to_string();
            store.write_json(USERS_KEY, &self.users);
        }
    }

    pub fn current_user(&self) -> Option<&User> {
        let session = self.session.as_ref()?;
        self.users.iter().find(|u| u.id == session.user_id)
    }

    pub fn login(
        &mut self,
        store: &mut Store,
        email: &str,
        password: &str,
        role: Role,
        stay_signed_in: bool,
    ) -> Result<&User, AuthError> {
        let normalized = email.trim().to_lowercase();
        let idx = self
            .users
            .iter()
            .position(|u| u.email.to_lowercase() == normalized && u.role == role)
            .ok_or(AuthError::UserNotFound)?;
        if self.users[idx].password != password {
            return Err(AuthError::WrongPassword);
        }

        let session = AuthSession {
            user_id: self.users[idx].id.clone(),
            stay_signed_in,
        };
        if stay_signed_in {
            store.write_json(AUTH_SESSION_KEY, &session);
        } else {
            store.clear(AUTH_SESSION_KEY);
        }
        self.session = Some(session);
        Ok(&self.users[idx])
    }

    pub fn register(
        &mut self,
        store: &mut Store,
        payload: RegisterPayload,
    ) -> Result<&User, AuthError> {
        if payload.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::PasswordTooShort);
        }
        if let Some(confirm) = &payload.confirm_password {
            if *confirm != payload.password {
                return Err(AuthError::PasswordMismatch);
            }
        }

        let normalized = payload.email.trim().to_lowercase();
        if self
            .users
            .iter()
            .any(|u| u.email.to_lowercase() == normalized)
        {
            return Err(AuthError::DuplicateEmail);
        }

        let is_student = payload.role == Role::Student;
        let user = User {
            id: Uuid::new_v4().to_string(),
            role: payload.role,
            full_name: payload.full_name.trim().to_string(),
            email: normalized,
            password: payload.password,
            group: if is_student { payload.group } else { None },
            student_id: if is_student { payload.student_id } else { None },
        };
        self.users.push(user);
        store.write_json(USERS_KEY, &self.users);

        let session = AuthSession {
            user_id: self.users[self.users.len() - 1].id.clone(),
            stay_signed_in: true,
        };
        store.write_json(AUTH_SESSION_KEY, &session);
        self.session = Some(session);
        Ok(&self.users[self.users.len() - 1])
    }

    pub fn logout(&mut self, store: &mut Store) {
        self.session = None;
        store.clear(AUTH_SESSION_KEY);
    }
}
