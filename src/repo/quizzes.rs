use std::collections::BTreeSet;

use tracing::info;

use crate::clock::now_utc_rfc3339;
use crate::schema::{cell, Table};

use super::{project, require_value, Counter, Record, RepoError, Repository};

const QUIZ_FIELDS: [&str; 7] = [
    "quiz_id",
    "subject",
    "difficulty_level",
    "question_text",
    "options",
    "correct_answer",
    "related_material_id",
];

/// Answer options share one cell joined with this.
pub const OPTIONS_DELIMITER: &str = "|";

#[derive(Debug, Clone, Default)]
pub struct NewQuiz {
    pub subject: String,
    pub difficulty_level: String,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub related_material_id: String,
    pub created_by: String,
}

impl Repository<'_> {
    pub fn create_quiz(&self, quiz: NewQuiz) -> Result<Record, RepoError> {
        if let Some(option) = quiz.options.iter().find(|option| option.contains(OPTIONS_DELIMITER)) {
            return Err(RepoError::InvalidArgument(format!(
                "quiz option '{option}' must not contain '{OPTIONS_DELIMITER}'"
            )));
        }
        let quiz_id = self.next_id(Counter::Quiz)?;

        let _quizzes = self.client.lock(Table::Quizzes);
        let columns = self.columns(Table::Quizzes)?;
        let row = self.append_fields(
            &columns,
            &[
                ("quiz_id", quiz_id.clone()),
                ("subject", quiz.subject),
                ("difficulty_level", quiz.difficulty_level),
                ("question_text", quiz.question_text),
                ("options", quiz.options.join(OPTIONS_DELIMITER)),
                ("correct_answer", quiz.correct_answer),
                ("related_material_id", quiz.related_material_id),
                ("created_by", quiz.created_by),
                ("created_at", now_utc_rfc3339()),
            ],
        )?;
        info!(quiz_id = %quiz_id, "quiz created");
        project(&columns, &row, &QUIZ_FIELDS)
    }

    pub fn list_quizzes_for_material(&self, material_id: &str) -> Result<Vec<Record>, RepoError> {
        require_value("related_material_id", material_id)?;
        let snapshot = self.snapshot(Table::Quizzes)?;
        let rows = snapshot.matching("related_material_id", material_id)?;
        Ok(snapshot.project_each(&rows, &QUIZ_FIELDS)?)
    }

    /// Quizzes attached to any of the student's study materials.
    pub fn list_quizzes_for_student(&self, student_id: &str) -> Result<Vec<Record>, RepoError> {
        let material_ids: BTreeSet<String> = self
            .list_study_materials_for_student(student_id)?
            .into_iter()
            .filter_map(|mut material| material.remove("material_id"))
            .filter(|id| !id.trim().is_empty())
            .collect();
        if material_ids.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = self.snapshot(Table::Quizzes)?;
        let related = snapshot.columns.index("related_material_id")?;
        let rows: Vec<_> = snapshot
            .data()
            .map(|(_, row)| row)
            .filter(|row| material_ids.contains(cell(row, related)))
            .collect();
        Ok(snapshot.project_each(&rows, &QUIZ_FIELDS)?)
    }
}
