use crate::models::{StudentImportRow, StudentStatus};

/// Parses the advisory CSV convention: a header line with case-insensitive
/// English or Russian column names, then positionally comma-split data lines.
/// There is no quoting support; a value containing a comma misparses. Rows
/// are returned as-is; the roster manager decides which ones to admit.
pub fn parse_student_rows(text: &str) -> Vec<StudentImportRow> {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.is_empty())
        .collect();
    if lines.len() < 2 {
        return Vec::new();
    }

    let headers: Vec<String> = lines[0]
        .split(',')
        .map(|h| h.trim().to_lowercase())
        .collect();
    let column = |key: &str| headers.iter().position(|h| h == key);
    let first_name_col = column("firstname").or_else(|| column("имя"));
    let last_name_col = column("lastname").or_else(|| column("фамилия"));
    let email_col = column("email");
    let student_id_col = column("studentid").or_else(|| column("зачетка"));
    let group_col = column("group").or_else(|| column("группа"));
    let status_col = column("status");

    lines[1..]
        .iter()
        .map(|line| {
            let cells: Vec<&str> = line.split(',').collect();
            let cell = |col: Option<usize>| {
                col.and_then(|i| cells.get(i))
                    .map(|c| c.trim().to_string())
                    .unwrap_or_default()
            };
            StudentImportRow {
                first_name: cell(first_name_col),
                last_name: cell(last_name_col),
                email: cell(email_col),
                student_id: cell(student_id_col),
                group: cell(group_col),
                status: StudentStatus::parse(&cell(status_col)),
            }
        })
        .collect()
}
