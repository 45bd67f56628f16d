use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::settings::{Backend, Settings, DEFAULT_LOCAL_DB, DEFAULT_STORE_TITLE};

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

pub fn styled_command() -> clap::Command {
    Cli::command()
}

#[derive(Debug, Parser)]
#[command(name = "edumind")]
#[command(bin_name = "edumind")]
#[command(version)]
#[command(about = "Spreadsheet-backed datastore for the EduMind mentoring platform")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        env = "EDUMIND_BACKEND",
        default_value = "sheets",
        help = "Grid backend holding the datastore."
    )]
    pub backend: Backend,

    #[arg(
        long,
        global = true,
        env = "GOOGLE_APPLICATION_CREDENTIALS",
        help = "Service-account key file for Google Sheets."
    )]
    pub credentials: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "GOOGLE_SHEETS_SPREADSHEET_ID",
        help = "Existing spreadsheet to use. A new one is created when omitted."
    )]
    pub spreadsheet_id: Option<String>,

    #[arg(
        long,
        global = true,
        env = "EDUMIND_LOCAL_DB",
        default_value = DEFAULT_LOCAL_DB,
        help = "SQLite file used by the local backend."
    )]
    pub local_db: PathBuf,

    #[arg(
        long,
        global = true,
        env = "EDUMIND_STORE_TITLE",
        default_value = DEFAULT_STORE_TITLE,
        help = "Title given to a newly created store."
    )]
    pub store_title: String,

    #[arg(short, long, global = true, help = "Log debug detail to stderr.")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        let settings = match self.backend {
            Backend::Sheets => {
                Settings::sheets(self.credentials.clone(), self.spreadsheet_id.clone())
            }
            Backend::Local => Settings::local(self.local_db.clone()),
        };
        settings.with_store_title(&self.store_title)
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Provision tables, headers and default config.")]
    Init,
    #[command(about = "Read and write Config entries.")]
    Config(ConfigArgs),
    #[command(about = "Manage user accounts.")]
    User(UserArgs),
    #[command(about = "Manage student profiles.")]
    Student(StudentArgs),
    #[command(about = "Manage mentor profiles.")]
    Mentor(MentorArgs),
    #[command(about = "Schedule and list mentoring sessions.")]
    Session(SessionArgs),
    #[command(about = "Track study materials.")]
    Material(MaterialArgs),
    #[command(about = "Create and list quizzes.")]
    Quiz(QuizArgs),
    #[command(about = "Record and list quiz scores.")]
    Score(ScoreArgs),
    #[command(about = "Record and list AI-assisted corrections.")]
    Correction(CorrectionArgs),
    #[command(about = "Record and list mentor recommendations.")]
    Recommend(RecommendArgs),
    #[command(about = "Print shell completions.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(value_enum, help = "Shell to generate for. Detected from $SHELL if omitted.")]
    pub shell: Option<Shell>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Print one Config value.")]
    Get { key: String },
    #[command(about = "Set a Config value, creating the entry if needed.")]
    Set { key: String, value: String },
    #[command(about = "List every Config entry.")]
    List,
}

#[derive(Debug, Args)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommands,
}

#[derive(Debug, Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user with the next U_ id.")]
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, help = "student or mentor (default student).")]
        role: Option<String>,
        #[arg(long)]
        google_id: Option<String>,
        #[arg(long)]
        picture: Option<String>,
    },
    #[command(about = "Find a user by email or id.")]
    Find {
        #[arg(long, conflicts_with = "id", required_unless_present = "id")]
        email: Option<String>,
        #[arg(long)]
        id: Option<String>,
    },
    #[command(about = "Update profile fields of the user with this email.")]
    Update {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        google_id: Option<String>,
        #[arg(long)]
        picture: Option<String>,
    },
}

/// List edits shared by every list-valued profile field.
#[derive(Debug, Subcommand)]
pub enum ListCommands {
    #[command(about = "Print the stored values.")]
    Show { id: String },
    #[command(about = "Replace the stored values.")]
    Set {
        id: String,
        #[arg(num_args = 0.., help = "New values; none clears the list.")]
        values: Vec<String>,
    },
    #[command(about = "Add one value if not already present (case-insensitive).")]
    Add { id: String, value: String },
    #[command(about = "Remove one value (case-insensitive).")]
    Remove { id: String, value: String },
}

#[derive(Debug, Args)]
pub struct StudentArgs {
    #[command(subcommand)]
    pub command: StudentCommands,
}

#[derive(Debug, Subcommand)]
pub enum StudentCommands {
    #[command(about = "Create or update a student profile; omitted fields are kept.")]
    Upsert(StudentUpsertArgs),
    #[command(about = "Show a student profile.")]
    Show { id: String },
    #[command(subcommand, about = "Edit the student's interests.")]
    Interests(ListCommands),
    #[command(subcommand, about = "Edit the student's career choices.")]
    Careers(ListCommands),
}

#[derive(Debug, Args)]
pub struct StudentUpsertArgs {
    pub id: String,
    #[arg(long, value_delimiter = ';')]
    pub interests: Option<Vec<String>>,
    #[arg(long, value_delimiter = ';')]
    pub careers: Option<Vec<String>>,
    #[arg(long)]
    pub syllabus_links: Option<String>,
    #[arg(long)]
    pub uploaded_materials: Option<String>,
    #[arg(long)]
    pub mentor_match_ids: Option<String>,
    #[arg(long)]
    pub calendar_sync_id: Option<String>,
    #[arg(long)]
    pub average_score: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Args)]
pub struct MentorArgs {
    #[command(subcommand)]
    pub command: MentorCommands,
}

#[derive(Debug, Subcommand)]
pub enum MentorCommands {
    #[command(about = "Create or update a mentor profile; omitted fields are kept.")]
    Upsert(MentorUpsertArgs),
    #[command(about = "Show a mentor profile.")]
    Show { id: String },
    #[command(subcommand, about = "Edit the mentor's general interests.")]
    Interests(ListCommands),
    #[command(subcommand, about = "Edit the mentor's teaching areas.")]
    Areas(ListCommands),
    #[command(about = "Set or clear the mentor's career background.")]
    Background {
        id: String,
        #[arg(conflicts_with = "clear", required_unless_present = "clear")]
        text: Option<String>,
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Debug, Args)]
pub struct MentorUpsertArgs {
    pub id: String,
    #[arg(long, value_delimiter = ';')]
    pub interests: Option<Vec<String>>,
    #[arg(long)]
    pub background: Option<String>,
    #[arg(long)]
    pub available_slots: Option<String>,
    #[arg(long)]
    pub scheduled_sessions: Option<String>,
    #[arg(long, value_delimiter = ';')]
    pub areas: Option<Vec<String>>,
    #[arg(long)]
    pub ai_review_count: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Args)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommands,
}

#[derive(Debug, Subcommand)]
pub enum SessionCommands {
    #[command(about = "Schedule a session with the next S_ id.")]
    Schedule {
        #[arg(long)]
        mentor: String,
        #[arg(long)]
        student: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        time: String,
        #[arg(long, default_value = "")]
        topic: String,
        #[arg(long)]
        status: Option<String>,
    },
    #[command(about = "List sessions for one mentor or one student.")]
    List(ByPersonArgs),
}

#[derive(Debug, Args)]
pub struct ByPersonArgs {
    #[arg(long, conflicts_with = "student", required_unless_present = "student")]
    pub mentor: Option<String>,
    #[arg(long)]
    pub student: Option<String>,
}

#[derive(Debug, Args)]
pub struct MaterialArgs {
    #[command(subcommand)]
    pub command: MaterialCommands,
}

#[derive(Debug, Subcommand)]
pub enum MaterialCommands {
    #[command(about = "Add a study material with the next M_ id.")]
    Add {
        #[arg(long)]
        student: String,
        #[arg(long)]
        file_name: String,
        #[arg(long, default_value = "")]
        file_link: String,
        #[arg(long, default_value = "")]
        summary: String,
        #[arg(long, default_value = "")]
        related_quiz_ids: String,
    },
    #[command(about = "List a student's study materials.")]
    List {
        #[arg(long)]
        student: String,
    },
}

#[derive(Debug, Args)]
pub struct QuizArgs {
    #[command(subcommand)]
    pub command: QuizCommands,
}

#[derive(Debug, Subcommand)]
pub enum QuizCommands {
    #[command(about = "Create a quiz question with the next Q_ id.")]
    Create {
        #[arg(long)]
        subject: String,
        #[arg(long, default_value = "")]
        difficulty: String,
        #[arg(long)]
        question: String,
        #[arg(long = "option", help = "Answer option; repeat for each.")]
        options: Vec<String>,
        #[arg(long, default_value = "")]
        answer: String,
        #[arg(long, default_value = "")]
        material: String,
        #[arg(long, default_value = "")]
        created_by: String,
    },
    #[command(about = "List quizzes for a material or for a student's materials.")]
    List {
        #[arg(long, conflicts_with = "student", required_unless_present = "student")]
        material: Option<String>,
        #[arg(long)]
        student: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct ScoreArgs {
    #[command(subcommand)]
    pub command: ScoreCommands,
}

#[derive(Debug, Subcommand)]
pub enum ScoreCommands {
    #[command(about = "Record a quiz score and derive its performance band.")]
    Record {
        #[arg(long)]
        student: String,
        #[arg(long)]
        quiz: String,
        #[arg(long, allow_hyphen_values = true)]
        score: String,
        #[arg(long, allow_hyphen_values = true)]
        total: String,
        #[arg(long, default_value = "")]
        grader: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    #[command(about = "List a student's quiz scores.")]
    List {
        #[arg(long)]
        student: String,
    },
}

#[derive(Debug, Args)]
pub struct CorrectionArgs {
    #[command(subcommand)]
    pub command: CorrectionCommands,
}

#[derive(Debug, Subcommand)]
pub enum CorrectionCommands {
    #[command(about = "Record an AI-assisted correction with the next AC_ id.")]
    Record {
        #[arg(long)]
        mentor: String,
        #[arg(long)]
        student: String,
        #[arg(long, default_value = "")]
        file_link: String,
        #[arg(long, default_value = "")]
        ai_feedback: String,
        #[arg(long, default_value = "")]
        ai_score: String,
        #[arg(long, default_value = "")]
        manual_feedback: String,
        #[arg(long, default_value = "")]
        final_score: String,
        #[arg(long, default_value = "")]
        material: String,
    },
    #[command(about = "List a student's corrections.")]
    List {
        #[arg(long)]
        student: String,
    },
}

#[derive(Debug, Args)]
pub struct RecommendArgs {
    #[command(subcommand)]
    pub command: RecommendCommands,
}

#[derive(Debug, Subcommand)]
pub enum RecommendCommands {
    #[command(about = "Record a mentor match with the next R_ id.")]
    Add {
        #[arg(long)]
        student: String,
        #[arg(long)]
        mentor: String,
        #[arg(long, default_value = "")]
        match_percentage: String,
        #[arg(long, default_value = "")]
        reason: String,
        #[arg(long, default_value = "")]
        source: String,
    },
    #[command(about = "List a student's mentor recommendations.")]
    List {
        #[arg(long)]
        student: String,
    },
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Commands, ListCommands, StudentCommands};
    use crate::settings::Backend;

    #[test]
    fn command_definition_is_consistent() {
        super::styled_command().debug_assert();
    }

    #[test]
    fn local_backend_settings_use_database_path() {
        let cli = Cli::try_parse_from([
            "edumind",
            "--backend",
            "local",
            "--local-db",
            "/tmp/edumind.sqlite",
            "config",
            "list",
        ])
        .expect("args should parse");
        let settings = cli.settings();
        assert_eq!(settings.backend, Backend::Local);
        assert_eq!(
            settings.credentials.as_deref(),
            Some(std::path::Path::new("/tmp/edumind.sqlite"))
        );
    }

    #[test]
    fn list_subcommands_parse_values() {
        let cli = Cli::try_parse_from(["edumind", "student", "interests", "set", "U_1", "math", "art"])
            .expect("args should parse");
        match cli.command {
            Commands::Student(args) => match args.command {
                StudentCommands::Interests(ListCommands::Set { id, values }) => {
                    assert_eq!(id, "U_1");
                    assert_eq!(values, vec!["math", "art"]);
                }
                other => panic!("unexpected student command: {other:?}"),
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn session_list_requires_one_side() {
        assert!(Cli::try_parse_from(["edumind", "session", "list"]).is_err());
        assert!(
            Cli::try_parse_from(["edumind", "session", "list", "--mentor", "M_1", "--student", "U_1"])
                .is_err()
        );
    }
}
