use tracing::info;

use crate::clock::now_utc_rfc3339;
use crate::schema::Table;

use super::{project, require_value, Counter, Record, RepoError, Repository};

/// Fields returned by the session listings.
const SESSION_FIELDS: [&str; 6] = ["session_id", "mentor_id", "student_id", "date", "time", "topic"];

const SCHEDULED_FIELDS: [&str; 7] = [
    "session_id",
    "mentor_id",
    "student_id",
    "date",
    "time",
    "topic",
    "status",
];

const DEFAULT_STATUS: &str = "scheduled";

#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub mentor_id: String,
    pub student_id: String,
    pub date: String,
    pub time: String,
    pub topic: String,
    pub status: Option<String>,
}

impl Repository<'_> {
    pub fn schedule_session(&self, session: NewSession) -> Result<Record, RepoError> {
        if session.mentor_id.trim().is_empty() || session.student_id.trim().is_empty() {
            return Err(RepoError::InvalidArgument(
                "a session needs both a mentor and a student".to_string(),
            ));
        }
        let session_id = self.next_id(Counter::Session)?;
        let status = session
            .status
            .filter(|status| !status.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STATUS.to_string());
        let stamp = now_utc_rfc3339();

        let _sessions = self.client.lock(Table::Sessions);
        let columns = self.columns(Table::Sessions)?;
        let row = self.append_fields(
            &columns,
            &[
                ("session_id", session_id.clone()),
                ("mentor_id", session.mentor_id),
                ("student_id", session.student_id),
                ("date", session.date),
                ("time", session.time),
                ("topic", session.topic),
                ("status", status),
                ("created_at", stamp.clone()),
                ("updated_at", stamp),
            ],
        )?;
        info!(session_id = %session_id, "session scheduled");
        project(&columns, &row, &SCHEDULED_FIELDS)
    }

    pub fn list_sessions_for_mentor(&self, mentor_id: &str) -> Result<Vec<Record>, RepoError> {
        self.list_sessions("mentor_id", mentor_id)
    }

    pub fn list_sessions_for_student(&self, student_id: &str) -> Result<Vec<Record>, RepoError> {
        self.list_sessions("student_id", student_id)
    }

    fn list_sessions(&self, field: &str, value: &str) -> Result<Vec<Record>, RepoError> {
        require_value(field, value)?;
        let snapshot = self.snapshot(Table::Sessions)?;
        let rows = snapshot.matching(field, value)?;
        Ok(snapshot.project_each(&rows, &SESSION_FIELDS)?)
    }
}
