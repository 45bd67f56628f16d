use tracing::info;

use crate::clock::now_utc_rfc3339;
use crate::schema::Table;

use super::{project, require_value, Counter, Record, RepoError, Repository};

/// Every Users column except `password`.
const USER_FIELDS: [&str; 8] = [
    "user_id",
    "name",
    "email",
    "role",
    "google_id",
    "profile_picture_url",
    "date_joined",
    "status",
];

const DEFAULT_ROLE: &str = "student";

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Option<String>,
    pub google_id: Option<String>,
    pub profile_picture_url: Option<String>,
}

/// Fields left `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub role: Option<String>,
    pub google_id: Option<String>,
    pub profile_picture_url: Option<String>,
}

impl UserPatch {
    fn fields(&self) -> [(&'static str, Option<&String>); 4] {
        [
            ("name", self.name.as_ref()),
            ("role", self.role.as_ref()),
            ("google_id", self.google_id.as_ref()),
            ("profile_picture_url", self.profile_picture_url.as_ref()),
        ]
    }
}

impl Repository<'_> {
    pub fn create_user(&self, user: NewUser) -> Result<Record, RepoError> {
        let user_id = self.next_id(Counter::User)?;
        let role = user
            .role
            .filter(|role| !role.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ROLE.to_string());

        let _users = self.client.lock(Table::Users);
        let columns = self.columns(Table::Users)?;
        let row = self.append_fields(
            &columns,
            &[
                ("user_id", user_id.clone()),
                ("name", user.name),
                ("email", user.email),
                ("role", role),
                ("google_id", user.google_id.unwrap_or_default()),
                ("password", String::new()),
                ("profile_picture_url", user.profile_picture_url.unwrap_or_default()),
                ("date_joined", now_utc_rfc3339()),
                ("status", "active".to_string()),
            ],
        )?;
        info!(user_id = %user_id, "user created");
        project(&columns, &row, &USER_FIELDS)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<Record>, RepoError> {
        self.find_user("email", email)
    }

    pub fn get_user_by_id(&self, user_id: &str) -> Result<Option<Record>, RepoError> {
        self.find_user("user_id", user_id)
    }

    fn find_user(&self, field: &str, value: &str) -> Result<Option<Record>, RepoError> {
        require_value(field, value)?;
        let snapshot = self.snapshot(Table::Users)?;
        snapshot
            .locate(field, value)?
            .map(|(_, row)| project(&snapshot.columns, row, &USER_FIELDS))
            .transpose()
    }

    /// Applies `patch` to the user with `email`. Returns `None` without
    /// writing when no such user exists.
    pub fn update_user_profile_by_email(
        &self,
        email: &str,
        patch: &UserPatch,
    ) -> Result<Option<Record>, RepoError> {
        require_value("email", email)?;
        let _users = self.client.lock(Table::Users);
        let snapshot = self.snapshot(Table::Users)?;
        let Some((row_number, existing)) = snapshot.locate("email", email)? else {
            return Ok(None);
        };

        let columns = &snapshot.columns;
        let mut row = existing.clone();
        row.resize(existing.len().max(columns.width()), String::new());
        for (field, value) in patch.fields() {
            if let Some(value) = value {
                row[columns.index(field)?] = value.clone();
            }
        }
        self.rewrite_row(Table::Users, row_number, row.clone())?;
        project(columns, &row, &USER_FIELDS).map(Some)
    }
}
