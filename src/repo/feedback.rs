use tracing::info;

use crate::clock::now_utc_rfc3339;
use crate::schema::Table;

use super::{project, require_value, Counter, Record, RepoError, Repository};

const CORRECTION_FIELDS: [&str; 10] = [
    "correction_id",
    "mentor_id",
    "student_id",
    "file_link",
    "ai_feedback",
    "ai_score",
    "manual_feedback",
    "final_score",
    "date",
    "related_material_id",
];

const RECOMMENDATION_FIELDS: [&str; 7] = [
    "recommendation_id",
    "student_id",
    "mentor_id",
    "match_percentage",
    "reason_for_match",
    "date_generated",
    "source",
];

/// AI-assisted review of a student submission, optionally overridden by the
/// mentor.
#[derive(Debug, Clone, Default)]
pub struct NewCorrection {
    pub mentor_id: String,
    pub student_id: String,
    pub file_link: String,
    pub ai_feedback: String,
    pub ai_score: String,
    pub manual_feedback: String,
    pub final_score: String,
    pub related_material_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewRecommendation {
    pub student_id: String,
    pub mentor_id: String,
    pub match_percentage: String,
    pub reason_for_match: String,
    pub source: String,
}

impl Repository<'_> {
    pub fn record_ai_correction(&self, correction: NewCorrection) -> Result<Record, RepoError> {
        if correction.student_id.trim().is_empty() {
            return Err(RepoError::InvalidArgument("a correction needs a student".to_string()));
        }
        let correction_id = self.next_id(Counter::Correction)?;

        let _corrections = self.client.lock(Table::AiCorrections);
        let columns = self.columns(Table::AiCorrections)?;
        let row = self.append_fields(
            &columns,
            &[
                ("correction_id", correction_id.clone()),
                ("mentor_id", correction.mentor_id),
                ("student_id", correction.student_id),
                ("file_link", correction.file_link),
                ("ai_feedback", correction.ai_feedback),
                ("ai_score", correction.ai_score),
                ("manual_feedback", correction.manual_feedback),
                ("final_score", correction.final_score),
                ("date", now_utc_rfc3339()),
                ("related_material_id", correction.related_material_id),
            ],
        )?;
        info!(correction_id = %correction_id, "ai correction recorded");
        project(&columns, &row, &CORRECTION_FIELDS)
    }

    pub fn list_corrections_for_student(&self, student_id: &str) -> Result<Vec<Record>, RepoError> {
        require_value("student_id", student_id)?;
        let snapshot = self.snapshot(Table::AiCorrections)?;
        let rows = snapshot.matching("student_id", student_id)?;
        Ok(snapshot.project_each(&rows, &CORRECTION_FIELDS)?)
    }

    pub fn add_mentor_recommendation(
        &self,
        recommendation: NewRecommendation,
    ) -> Result<Record, RepoError> {
        if recommendation.student_id.trim().is_empty() || recommendation.mentor_id.trim().is_empty() {
            return Err(RepoError::InvalidArgument(
                "a recommendation needs both a student and a mentor".to_string(),
            ));
        }
        let recommendation_id = self.next_id(Counter::Recommendation)?;

        let _recommendations = self.client.lock(Table::MentorRecommendations);
        let columns = self.columns(Table::MentorRecommendations)?;
        let row = self.append_fields(
            &columns,
            &[
                ("recommendation_id", recommendation_id.clone()),
                ("student_id", recommendation.student_id),
                ("mentor_id", recommendation.mentor_id),
                ("match_percentage", recommendation.match_percentage),
                ("reason_for_match", recommendation.reason_for_match),
                ("date_generated", now_utc_rfc3339()),
                ("source", recommendation.source),
            ],
        )?;
        info!(recommendation_id = %recommendation_id, "mentor recommendation added");
        project(&columns, &row, &RECOMMENDATION_FIELDS)
    }

    pub fn list_recommendations_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<Record>, RepoError> {
        require_value("student_id", student_id)?;
        let snapshot = self.snapshot(Table::MentorRecommendations)?;
        let rows = snapshot.matching("student_id", student_id)?;
        Ok(snapshot.project_each(&rows, &RECOMMENDATION_FIELDS)?)
    }
}
