use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

const TABLES_TOML: &str = include_str!("tables.toml");

pub const MIN_COLUMN_CAPACITY: u32 = 10;
pub const DEFAULT_ROW_CAPACITY: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    Users,
    Students,
    Mentors,
    Sessions,
    StudyMaterials,
    Quizzes,
    QuizScores,
    AiCorrections,
    MentorRecommendations,
    Config,
}

impl Table {
    pub const COUNT: usize = 10;

    pub const ALL: [Table; Table::COUNT] = [
        Table::Users,
        Table::Students,
        Table::Mentors,
        Table::Sessions,
        Table::StudyMaterials,
        Table::Quizzes,
        Table::QuizScores,
        Table::AiCorrections,
        Table::MentorRecommendations,
        Table::Config,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Table::Users => "Users",
            Table::Students => "Students",
            Table::Mentors => "Mentors",
            Table::Sessions => "Sessions",
            Table::StudyMaterials => "Study_Materials",
            Table::Quizzes => "Quizzes",
            Table::QuizScores => "Quiz_Scores",
            Table::AiCorrections => "AI_Corrections",
            Table::MentorRecommendations => "Mentor_Recommendations",
            Table::Config => "Config",
        }
    }

    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn from_title(title: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|table| table.title() == title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("embedded table definitions are invalid: {0}")]
    Definitions(String),
    #[error("table '{0}' has no definition")]
    UnknownTable(String),
    #[error("sheet '{table}' is missing required header '{header}'")]
    MissingHeader { table: String, header: String },
    #[error("sheet '{table}' has no column named '{field}'")]
    UnknownField { table: String, field: String },
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TableSchema {
    pub title: String,
    pub headers: Vec<String>,
}

impl TableSchema {
    pub fn key(&self) -> &str {
        self.headers.first().map(String::as_str).unwrap_or_default()
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn column_capacity(&self) -> u32 {
        u32::try_from(self.headers.len())
            .unwrap_or(u32::MAX)
            .max(MIN_COLUMN_CAPACITY)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ConfigSeed {
    pub key: String,
    pub value: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(rename = "table")]
    tables: Vec<TableSchema>,
    #[serde(rename = "config_seed", default)]
    config_seeds: Vec<ConfigSeed>,
}

#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    tables: BTreeMap<Table, TableSchema>,
    config_seeds: Vec<ConfigSeed>,
}

impl SchemaRegistry {
    pub fn builtin() -> Result<Self, SchemaError> {
        Self::from_toml(TABLES_TOML)
    }

    pub fn from_toml(raw: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile =
            toml::from_str(raw).map_err(|err| SchemaError::Definitions(err.to_string()))?;

        let mut tables = BTreeMap::new();
        for schema in file.tables {
            let table = Table::from_title(&schema.title)
                .ok_or_else(|| SchemaError::UnknownTable(schema.title.clone()))?;
            if schema.headers.is_empty() {
                return Err(SchemaError::Definitions(format!(
                    "table '{}' declares no headers",
                    schema.title
                )));
            }
            if tables.insert(table, schema).is_some() {
                return Err(SchemaError::Definitions(format!(
                    "table '{}' is defined twice",
                    table.title()
                )));
            }
        }
        if let Some(missing) = Table::ALL.iter().find(|table| !tables.contains_key(table)) {
            return Err(SchemaError::UnknownTable(missing.title().to_string()));
        }

        Ok(Self {
            tables,
            config_seeds: file.config_seeds,
        })
    }

    pub fn table(&self, table: Table) -> &TableSchema {
        // from_toml guarantees every variant is present.
        &self.tables[&table]
    }

    pub fn tables(&self) -> impl Iterator<Item = (Table, &TableSchema)> {
        self.tables.iter().map(|(table, schema)| (*table, schema))
    }

    pub fn config_seeds(&self) -> &[ConfigSeed] {
        &self.config_seeds
    }
}

/// Column positions of one sheet, resolved by header name against the live
/// header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    table: Table,
    header: Vec<String>,
    positions: HashMap<String, usize>,
}

impl ColumnMap {
    pub fn resolve(
        table: Table,
        schema: &TableSchema,
        live_header: &[String],
    ) -> Result<Self, SchemaError> {
        let mut positions = HashMap::with_capacity(schema.headers.len());
        for required in &schema.headers {
            let position = live_header
                .iter()
                .position(|cell| cell.trim() == required)
                .ok_or_else(|| SchemaError::MissingHeader {
                    table: table.title().to_string(),
                    header: required.clone(),
                })?;
            positions.insert(required.clone(), position);
        }
        Ok(Self {
            table,
            header: live_header.to_vec(),
            positions,
        })
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    pub fn index(&self, field: &str) -> Result<usize, SchemaError> {
        self.positions
            .get(field)
            .copied()
            .ok_or_else(|| SchemaError::UnknownField {
                table: self.table.title().to_string(),
                field: field.to_string(),
            })
    }

    /// Named fields of `row`; cells past the end of a short row read as "".
    pub fn project(
        &self,
        row: &[String],
        fields: &[&str],
    ) -> Result<BTreeMap<String, String>, SchemaError> {
        let mut out = BTreeMap::new();
        for field in fields {
            let index = self.index(field)?;
            out.insert((*field).to_string(), cell(row, index).to_string());
        }
        Ok(out)
    }

    /// Every schema field of `row`.
    pub fn project_all(&self, row: &[String]) -> BTreeMap<String, String> {
        self.positions
            .iter()
            .map(|(field, index)| (field.clone(), cell(row, *index).to_string()))
            .collect()
    }
}

pub fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}
