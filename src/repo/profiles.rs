use tracing::{debug, info};

use crate::list_value::TagList;
use crate::schema::{cell, Table};

use super::{Record, RepoError, Repository};

/// List-valued profile columns edited with set semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListField {
    StudentInterests,
    StudentCareers,
    MentorInterests,
    /// Teaching areas.
    MentorAreas,
}

impl ListField {
    pub fn table(self) -> Table {
        match self {
            ListField::StudentInterests | ListField::StudentCareers => Table::Students,
            ListField::MentorInterests | ListField::MentorAreas => Table::Mentors,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            ListField::StudentInterests => "interests",
            ListField::StudentCareers => "career_choices",
            ListField::MentorInterests => "general_interests",
            ListField::MentorAreas => "specialization_tags",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub interests: Option<TagList>,
    pub career_choices: Option<TagList>,
    pub syllabus_links: Option<String>,
    pub uploaded_materials: Option<String>,
    pub mentor_match_ids: Option<String>,
    pub google_calendar_sync_id: Option<String>,
    pub average_score: Option<String>,
    pub notes: Option<String>,
}

impl StudentPatch {
    fn fields(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("interests", self.interests.as_ref().map(TagList::encode)),
            ("career_choices", self.career_choices.as_ref().map(TagList::encode)),
            ("syllabus_links", self.syllabus_links.clone()),
            ("uploaded_materials", self.uploaded_materials.clone()),
            ("mentor_match_ids", self.mentor_match_ids.clone()),
            ("google_calendar_sync_id", self.google_calendar_sync_id.clone()),
            ("average_score", self.average_score.clone()),
            ("notes", self.notes.clone()),
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct MentorPatch {
    pub general_interests: Option<TagList>,
    pub career_background: Option<String>,
    pub available_slots: Option<String>,
    pub scheduled_sessions: Option<String>,
    pub specialization_tags: Option<TagList>,
    pub ai_review_count: Option<String>,
    pub notes: Option<String>,
}

impl MentorPatch {
    fn fields(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("general_interests", self.general_interests.as_ref().map(TagList::encode)),
            ("career_background", self.career_background.clone()),
            ("available_slots", self.available_slots.clone()),
            ("scheduled_sessions", self.scheduled_sessions.clone()),
            ("specialization_tags", self.specialization_tags.as_ref().map(TagList::encode)),
            ("ai_review_count", self.ai_review_count.clone()),
            ("notes", self.notes.clone()),
        ]
    }
}

impl Repository<'_> {
    /// Creates or updates the profile row for `student_id`. Fields the patch
    /// leaves `None` keep their stored value.
    pub fn upsert_student_profile(
        &self,
        student_id: &str,
        patch: &StudentPatch,
    ) -> Result<Record, RepoError> {
        self.upsert_profile(Table::Students, student_id, &patch.fields())
    }

    pub fn upsert_mentor_profile(
        &self,
        mentor_id: &str,
        patch: &MentorPatch,
    ) -> Result<Record, RepoError> {
        self.upsert_profile(Table::Mentors, mentor_id, &patch.fields())
    }

    fn upsert_profile(
        &self,
        table: Table,
        key: &str,
        fields: &[(&str, Option<String>)],
    ) -> Result<Record, RepoError> {
        require_key(table, key)?;
        let _guard = self.client.lock(table);
        let row = self.upsert_locked(table, key, fields)?;
        info!(table = table.title(), key, "profile saved");
        Ok(self.columns(table)?.project_all(&row))
    }

    pub fn get_student_profile(&self, student_id: &str) -> Result<Option<Record>, RepoError> {
        self.get_profile(Table::Students, student_id)
    }

    pub fn get_mentor_profile(&self, mentor_id: &str) -> Result<Option<Record>, RepoError> {
        self.get_profile(Table::Mentors, mentor_id)
    }

    fn get_profile(&self, table: Table, key: &str) -> Result<Option<Record>, RepoError> {
        let snapshot = self.snapshot(table)?;
        Ok(snapshot
            .locate_key(key)?
            .map(|(_, row)| snapshot.columns.project_all(row)))
    }

    /// Stored list for `key`; empty when there is no profile row.
    pub fn list_values(&self, field: ListField, key: &str) -> Result<TagList, RepoError> {
        let snapshot = self.snapshot(field.table())?;
        let index = snapshot.columns.index(field.column())?;
        Ok(snapshot
            .locate_key(key)?
            .map(|(_, row)| TagList::parse_legacy(cell(row, index)))
            .unwrap_or_default())
    }

    pub fn replace_values(
        &self,
        field: ListField,
        key: &str,
        values: TagList,
    ) -> Result<TagList, RepoError> {
        self.edit_list(field, key, |list| {
            *list = values;
            true
        })
    }

    /// Adds `value` unless present under a case-insensitive compare.
    pub fn add_value(&self, field: ListField, key: &str, value: &str) -> Result<TagList, RepoError> {
        self.edit_list(field, key, |list| list.add(value))
    }

    pub fn remove_value(
        &self,
        field: ListField,
        key: &str,
        value: &str,
    ) -> Result<TagList, RepoError> {
        self.edit_list(field, key, |list| list.remove(value))
    }

    /// Read-modify-write of one list cell. `edit` reports whether the list
    /// changed; unchanged lists are not written back.
    fn edit_list(
        &self,
        field: ListField,
        key: &str,
        edit: impl FnOnce(&mut TagList) -> bool,
    ) -> Result<TagList, RepoError> {
        let table = field.table();
        require_key(table, key)?;
        let _guard = self.client.lock(table);
        let snapshot = self.snapshot(table)?;
        let index = snapshot.columns.index(field.column())?;
        let mut list = snapshot
            .locate_key(key)?
            .map(|(_, row)| TagList::parse_legacy(cell(row, index)))
            .unwrap_or_default();

        if !edit(&mut list) {
            debug!(table = table.title(), key, column = field.column(), "list unchanged");
            return Ok(list);
        }
        self.set_field_locked(&snapshot, key, field.column(), &list.encode())?;
        Ok(list)
    }

    /// Sets the mentor's career background; an empty value clears it.
    pub fn set_career_background(&self, mentor_id: &str, text: &str) -> Result<Record, RepoError> {
        require_key(Table::Mentors, mentor_id)?;
        let normalized = text.trim();
        let _mentors = self.client.lock(Table::Mentors);
        let snapshot = self.snapshot(Table::Mentors)?;
        self.set_field_locked(&snapshot, mentor_id, "career_background", normalized)?;
        Ok(Record::from([
            ("mentor_id".to_string(), mentor_id.to_string()),
            ("career_background".to_string(), normalized.to_string()),
        ]))
    }

    pub fn clear_career_background(&self, mentor_id: &str) -> Result<Record, RepoError> {
        self.set_career_background(mentor_id, "")
    }
}

fn require_key(table: Table, key: &str) -> Result<(), RepoError> {
    if key.trim().is_empty() {
        return Err(RepoError::InvalidArgument(format!(
            "{} key must not be empty",
            table.title()
        )));
    }
    Ok(())
}
