use uuid::Uuid;

use crate::models::{
    AttendanceRecord, AttendanceSession, AttendanceStatus, StudentImportRow, StudentProfile,
    StudentStatus,
};
use crate::store::{Store, SESSIONS_KEY, STUDENTS_KEY};

pub struct StudentDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub student_id: String,
    pub group: String,
    pub status: Option<StudentStatus>,
    pub note: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Clone, Default)]
pub struct StudentPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub student_id: Option<String>,
    pub group: Option<String>,
    pub status: Option<StudentStatus>,
    pub note: Option<String>,
    pub user_id: Option<String>,
}

pub struct SessionDraft {
    pub discipline: String,
    pub group: String,
    pub date: String,
    pub timeslot: String,
    pub instructor: Option<String>,
    pub notes: Option<String>,
}

fn compose_full_name(first_name: &str, last_name: &str) -> String {
    format!("{} {}", first_name.trim(), last_name.trim())
        .trim()
        .to_string()
}

fn trim_opt(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

fn default_students() -> Vec<StudentProfile> {
    vec![
        StudentProfile {
            id: "stu-1".to_string(),
            user_id: Some("student-1".to_string()),
            first_name: "Анна".to_string(),
            last_name: "Лебедева".to_string(),
            full_name: "Анна Лебедева".to_string(),
            email: "a.lebedeva@misis.ru".to_string(),
            student_id: "21БПМ101".to_string(),
            group: "БПМ-21-1".to_string(),
            status: StudentStatus::Active,
            note: Some("Староста группы".to_string()),
        },
        StudentProfile {
            id: "stu-2".to_string(),
            user_id: None,
            first_name: "Максим".to_string(),
            last_name: "Гордеев".to_string(),
            full_name: "Максим Гордеев".to_string(),
            email: "m.gordeev@misis.ru".to_string(),
            student_id: "21БПМ102".to_string(),
            group: "БПМ-21-1".to_string(),
            status: StudentStatus::Active,
            note: None,
        },
        StudentProfile {
            id: "stu-3".to_string(),
            user_id: None,
            first_name: "Дарья".to_string(),
            last_name: "Фомина".to_string(),
            full_name: "Дарья Фомина".to_string(),
            email: "d.fomina@misis.ru".to_string(),
            student_id: "21БПМ103".to_string(),
            group: "БПМ-21-2".to_string(),
            status: StudentStatus::Active,
            note: None,
        },
    ]
}

fn default_sessions() -> Vec<AttendanceSession> {
    vec![AttendanceSession {
        id: "session-1".to_string(),
        discipline: "Алгоритмы и структуры данных".to_string(),
        group: "БПМ-21-1".to_string(),
        date: today(),
        timeslot: "08:30 — 10:05".to_string(),
        instructor: Some("Проф. И. А. Сафронов".to_string()),
        notes: Some("Контрольная работа".to_string()),
        records: vec![
            AttendanceRecord {
                student_id: "stu-1".to_string(),
                status: AttendanceStatus::Present,
                reason: None,
            },
            AttendanceRecord {
                student_id: "stu-2".to_string(),
                status: AttendanceStatus::Absent,
                reason: Some("Болезнь".to_string()),
            },
        ],
    }]
}

pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Owns student profiles and attendance sessions. Every mutation rewrites
/// the affected collection to the store in full.
pub struct RosterManager {
    students: Vec<StudentProfile>,
    sessions: Vec<AttendanceSession>,
}

impl RosterManager {
    pub fn load(store: &Store) -> Self {
        Self {
            students: store.read_json(STUDENTS_KEY).unwrap_or_else(default_students),
            sessions: store.read_json(SESSIONS_KEY).unwrap_or_else(default_sessions),
        }
    }

    pub fn students(&self) -> &[StudentProfile] {
        &self.students
    }

    pub fn sessions(&self) -> &[AttendanceSession] {
        &self.sessions
    }

    pub fn find_student(&self, id: &str) -> Option<&StudentProfile> {
        self.students.iter().find(|s| s.id == id)
    }

    pub fn add_student(&mut self, store: &mut Store, draft: StudentDraft) -> &StudentProfile {
        let student = StudentProfile {
            id: Uuid::new_v4().to_string(),
            user_id: draft.user_id,
            full_name: compose_full_name(&draft.first_name, &draft.last_name),
            first_name: draft.first_name.trim().to_string(),
            last_name: draft.last_name.trim().to_string(),
            email: draft.email.trim().to_lowercase(),
            student_id: draft.student_id.trim().to_string(),
            group: draft.group.trim().to_string(),
            status: draft.status.unwrap_or(StudentStatus::Active),
            note: trim_opt(draft.note),
        };
        self.students.push(student);
        store.write_json(STUDENTS_KEY, &self.students);
        &self.students[self.students.len() - 1]
    }

    pub fn update_student(&mut self, store: &mut Store, id: &str, patch: StudentPatch) -> bool {
        let Some(student) = self.students.iter_mut().find(|s| s.id == id) else {
            return false;
        };
        apply_patch(student, patch);
        store.write_json(STUDENTS_KEY, &self.students);
        true
    }

    pub fn bulk_update_students(&mut self, store: &mut Store, ids: &[String], patch: &StudentPatch) {
        for student in self.students.iter_mut().filter(|s| ids.contains(&s.id)) {
            apply_patch(student, patch.clone());
        }
        store.write_json(STUDENTS_KEY, &self.students);
    }

    pub fn delete_student(&mut self, store: &mut Store, id: &str) -> bool {
        let before = self.students.len();
        self.students.retain(|s| s.id != id);
        if self.students.len() == before {
            return false;
        }
        // Cascade: drop the student's records from every session.
        for session in &mut self.sessions {
            session.records.retain(|r| r.student_id != id);
        }
        store.write_json(STUDENTS_KEY, &self.students);
        store.write_json(SESSIONS_KEY, &self.sessions);
        true
    }

    pub fn bulk_delete_students(&mut self, store: &mut Store, ids: &[String]) {
        self.students.retain(|s| !ids.contains(&s.id));
        for session in &mut self.sessions {
            session.records.retain(|r| !ids.contains(&r.student_id));
        }
        store.write_json(STUDENTS_KEY, &self.students);
        store.write_json(SESSIONS_KEY, &self.sessions);
    }

    /// Admits rows that carry all five required fields; the rest are dropped
    /// without individual reporting. Returns the admitted count.
    pub fn import_students(&mut self, store: &mut Store, rows: Vec<StudentImportRow>) -> usize {
        let admitted: Vec<StudentProfile> = rows
            .into_iter()
            .filter(|row| {
                !row.first_name.is_empty()
                    && !row.last_name.is_empty()
                    && !row.email.is_empty()
                    && !row.student_id.is_empty()
                    && !row.group.is_empty()
            })
            .map(|row| StudentProfile {
                id: Uuid::new_v4().to_string(),
                user_id: None,
                full_name: compose_full_name(&row.first_name, &row.last_name),
                first_name: row.first_name.trim().to_string(),
                last_name: row.last_name.trim().to_string(),
                email: row.email.trim().to_lowercase(),
                student_id: row.student_id.trim().to_string(),
                group: row.group.trim().to_string(),
                status: row.status.unwrap_or(StudentStatus::Active),
                note: None,
            })
            .collect();

        if admitted.is_empty() {
            return 0;
        }
        let count = admitted.len();
        self.students.extend(admitted);
        store.write_json(STUDENTS_KEY, &self.students);
        count
    }

    /// Snapshots the group's current roster into "present"-defaulted records.
    /// Students joining the group later are not added to existing sessions.
    pub fn create_session(&mut self, store: &mut Store, draft: SessionDraft) -> &AttendanceSession {
        let records: Vec<AttendanceRecord> = self
            .students
            .iter()
            .filter(|s| s.group == draft.group)
            .map(|s| AttendanceRecord {
                student_id: s.id.clone(),
                status: AttendanceStatus::Present,
                reason: None,
            })
            .collect();

        let session = AttendanceSession {
            id: Uuid::new_v4().to_string(),
            discipline: draft.discipline.trim().to_string(),
            group: draft.group.trim().to_string(),
            date: draft.date,
            timeslot: draft.timeslot,
            instructor: trim_opt(draft.instructor),
            notes: trim_opt(draft.notes),
            records,
        };
        // Newest first.
        self.sessions.insert(0, session);
        store.write_json(SESSIONS_KEY, &self.sessions);
        &self.sessions[0]
    }

    pub fn delete_session(&mut self, store: &mut Store, session_id: &str) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != session_id);
        if self.sessions.len() == before {
            return false;
        }
        store.write_json(SESSIONS_KEY, &self.sessions);
        true
    }

    /// Replaces status and reason of the matching record in place. Absent
    /// session or record is a no-op.
    pub fn update_attendance(
        &mut self,
        store: &mut Store,
        session_id: &str,
        student_id: &str,
        status: AttendanceStatus,
        reason: Option<String>,
    ) -> bool {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == session_id) else {
            return false;
        };
        let Some(record) = session
            .records
            .iter_mut()
            .find(|r| r.student_id == student_id)
        else {
            return false;
        };
        record.status = status;
        record.reason = reason;
        store.write_json(SESSIONS_KEY, &self.sessions);
        true
    }
}

fn apply_patch(student: &mut StudentProfile, patch: StudentPatch) {
    if let Some(v) = patch.first_name {
        student.first_name = v.trim().to_string();
    }
    if let Some(v) = patch.last_name {
        student.last_name = v.trim().to_string();
    }
    student.full_name = compose_full_name(&student.first_name, &student.last_name);
    if let Some(v) = patch.email {
        student.email = v.trim().to_lowercase();
    }
    if let Some(v) = patch.student_id {
        student.student_id = v.trim().to_string();
    }
    if let Some(v) = patch.group {
        student.group = v.trim().to_string();
    }
    if let Some(v) = patch.status {
        student.status = v;
    }
    if let Some(v) = patch.note {
        student.note = Some(v.trim().to_string());
    }
    if let Some(v) = patch.user_id {
        student.user_id = Some(v);
    }
}
