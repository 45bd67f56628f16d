use tracing::info;

use crate::clock::now_utc_rfc3339;
use crate::schema::Table;

use super::{project, require_value, Counter, Record, RepoError, Repository};

const MATERIAL_FIELDS: [&str; 7] = [
    "material_id",
    "student_id",
    "file_name",
    "file_link",
    "summary",
    "upload_date",
    "related_quiz_ids",
];

#[derive(Debug, Clone, Default)]
pub struct NewMaterial {
    pub student_id: String,
    pub file_name: String,
    pub file_link: String,
    pub summary: String,
    pub related_quiz_ids: String,
}

impl Repository<'_> {
    pub fn add_study_material(&self, material: NewMaterial) -> Result<Record, RepoError> {
        if material.student_id.trim().is_empty() {
            return Err(RepoError::InvalidArgument(
                "study material needs a student".to_string(),
            ));
        }
        let material_id = self.next_id(Counter::Material)?;

        let _materials = self.client.lock(Table::StudyMaterials);
        let columns = self.columns(Table::StudyMaterials)?;
        let row = self.append_fields(
            &columns,
            &[
                ("material_id", material_id.clone()),
                ("student_id", material.student_id),
                ("file_name", material.file_name),
                ("file_link", material.file_link),
                ("summary", material.summary),
                ("upload_date", now_utc_rfc3339()),
                ("related_quiz_ids", material.related_quiz_ids),
            ],
        )?;
        info!(material_id = %material_id, "study material added");
        project(&columns, &row, &MATERIAL_FIELDS)
    }

    pub fn list_study_materials_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<Record>, RepoError> {
        require_value("student_id", student_id)?;
        let snapshot = self.snapshot(Table::StudyMaterials)?;
        let rows = snapshot.matching("student_id", student_id)?;
        Ok(snapshot.project_each(&rows, &MATERIAL_FIELDS)?)
    }
}
