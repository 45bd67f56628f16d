use serde::Serialize;
use tracing::{info, warn};

use crate::clock::now_utc_rfc3339;
use crate::performance::{score_ratio, ThresholdSource, Thresholds};
use crate::schema::Table;

use super::{project, require_value, Counter, Record, RepoError, Repository};

const SCORE_FIELDS: [&str; 9] = [
    "score_id",
    "student_id",
    "quiz_id",
    "score",
    "total_marks",
    "date_taken",
    "performance_level",
    "grader",
    "notes",
];

pub const THRESHOLDS_KEY: &str = "quiz_performance_thresholds";

/// Score and total are kept as entered; they are parsed only to classify.
#[derive(Debug, Clone, Default)]
pub struct NewScore {
    pub student_id: String,
    pub quiz_id: String,
    pub score: String,
    pub total_marks: String,
    pub grader: String,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreOutcome {
    pub ratio: f64,
    #[serde(flatten)]
    pub record: Record,
}

impl Repository<'_> {
    pub fn record_quiz_score(&self, score: NewScore) -> Result<ScoreOutcome, RepoError> {
        let ratio = match (
            parse_mark("score", &score.score),
            parse_mark("total_marks", &score.total_marks),
        ) {
            (Some(points), Some(total)) => score_ratio(points, total),
            _ => 0.0,
        };
        let level = self.performance_level(ratio)?;
        let score_id = self.next_id(Counter::Score)?;

        let _scores = self.client.lock(Table::QuizScores);
        let columns = self.columns(Table::QuizScores)?;
        let row = self.append_fields(
            &columns,
            &[
                ("score_id", score_id.clone()),
                ("student_id", score.student_id),
                ("quiz_id", score.quiz_id),
                ("score", score.score.trim().to_string()),
                ("total_marks", score.total_marks.trim().to_string()),
                ("date_taken", now_utc_rfc3339()),
                ("performance_level", level.clone()),
                ("grader", score.grader),
                ("notes", score.notes),
            ],
        )?;
        info!(score_id = %score_id, ratio, level = %level, "quiz score recorded");
        Ok(ScoreOutcome {
            ratio,
            record: project(&columns, &row, &SCORE_FIELDS)?,
        })
    }

    /// Band for `ratio` under the thresholds currently stored in Config.
    pub fn performance_level(&self, ratio: f64) -> Result<String, RepoError> {
        let configured = self.get_config_value(THRESHOLDS_KEY)?;
        let (thresholds, source) = Thresholds::resolve(configured.as_deref());
        if let ThresholdSource::Fallback(reason) = &source {
            warn!(
                key = THRESHOLDS_KEY,
                value = configured.as_deref().unwrap_or_default(),
                error = %reason,
                "malformed thresholds; using defaults"
            );
        }
        Ok(thresholds.classify(ratio).to_string())
    }

    pub fn list_quiz_scores_for_student(&self, student_id: &str) -> Result<Vec<Record>, RepoError> {
        require_value("student_id", student_id)?;
        let snapshot = self.snapshot(Table::QuizScores)?;
        let rows = snapshot.matching("student_id", student_id)?;
        Ok(snapshot.project_each(&rows, &SCORE_FIELDS)?)
    }
}

fn parse_mark(field: &str, raw: &str) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            warn!(field, value = raw, "mark is not a number; ratio recorded as 0");
            None
        }
    }
}
