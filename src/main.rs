mod a1;
mod app;
mod cli;
mod client;
mod clock;
mod completions;
mod grid;
mod list_value;
mod performance;
mod repo;
mod schema;
mod settings;

use app::{App, AppError};
use cli::{
    ByPersonArgs, Commands, ConfigCommands, CorrectionCommands, ListCommands, MaterialCommands,
    MentorCommands, QuizCommands, RecommendCommands, ScoreCommands, SessionCommands,
    StudentCommands, UserCommands,
};
use list_value::TagList;
use repo::{
    ListField, MentorPatch, NewCorrection, NewMaterial, NewQuiz, NewRecommendation, NewScore,
    NewSession, NewUser, Repository, StudentPatch, UserPatch,
};

const LOG_ENV: &str = "EDUMIND_LOG";

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        if err.is_uninitialized() {
            eprintln!("hint: pass --credentials (or GOOGLE_APPLICATION_CREDENTIALS), or use --backend local");
        }
        std::process::exit(1);
    }
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

/// Logs go to stderr so stdout stays machine-readable JSON. `EDUMIND_LOG`
/// wins over `RUST_LOG`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose {
        "edumind_store=debug"
    } else {
        "edumind_store=info"
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<(), AppError> {
    use clap::Parser;

    dotenvy::dotenv().ok();
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Completions(args) = &cli.command {
        return completions::print_completions(args.shell, &mut std::io::stdout().lock());
    }

    let app = App::new(cli.settings())?;
    if let Commands::Init = &cli.command {
        print_json(&app.initialize()?);
        return Ok(());
    }

    let repo = app.repo();
    match cli.command {
        Commands::Init | Commands::Completions(_) => Ok(()),
        Commands::Config(args) => run_config(&repo, args.command),
        Commands::User(args) => run_user(&repo, args.command),
        Commands::Student(args) => run_student(&repo, args.command),
        Commands::Mentor(args) => run_mentor(&repo, args.command),
        Commands::Session(args) => run_session(&repo, args.command),
        Commands::Material(args) => run_material(&repo, args.command),
        Commands::Quiz(args) => run_quiz(&repo, args.command),
        Commands::Score(args) => run_score(&repo, args.command),
        Commands::Correction(args) => run_correction(&repo, args.command),
        Commands::Recommend(args) => run_recommend(&repo, args.command),
    }
}

fn found<T>(value: Option<T>, what: String) -> Result<T, AppError> {
    value.ok_or(AppError::NotFound(what))
}

fn run_config(repo: &Repository<'_>, command: ConfigCommands) -> Result<(), AppError> {
    match command {
        ConfigCommands::Get { key } => {
            let value = found(repo.get_config_value(&key)?, format!("config key '{key}'"))?;
            println!("{value}");
        }
        ConfigCommands::Set { key, value } => print_json(&repo.set_config_value(&key, &value)?),
        ConfigCommands::List => print_json(&repo.list_config()?),
    }
    Ok(())
}

fn run_user(repo: &Repository<'_>, command: UserCommands) -> Result<(), AppError> {
    match command {
        UserCommands::Create {
            name,
            email,
            role,
            google_id,
            picture,
        } => print_json(&repo.create_user(NewUser {
            name,
            email,
            role,
            google_id,
            profile_picture_url: picture,
        })?),
        UserCommands::Find { email, id } => {
            let user = match (email, id) {
                (Some(email), _) => found(repo.get_user_by_email(&email)?, format!("user '{email}'"))?,
                (None, Some(id)) => found(repo.get_user_by_id(&id)?, format!("user '{id}'"))?,
                (None, None) => {
                    return Err(AppError::InvalidArgument(
                        "pass --email or --id".to_string(),
                    ))
                }
            };
            print_json(&user);
        }
        UserCommands::Update {
            email,
            name,
            role,
            google_id,
            picture,
        } => {
            let patch = UserPatch {
                name,
                role,
                google_id,
                profile_picture_url: picture,
            };
            let user = repo.update_user_profile_by_email(&email, &patch)?;
            print_json(&found(user, format!("user '{email}'"))?);
        }
    }
    Ok(())
}

fn tags(values: Option<Vec<String>>) -> Option<TagList> {
    values.map(TagList::from_values)
}

fn run_student(repo: &Repository<'_>, command: StudentCommands) -> Result<(), AppError> {
    match command {
        StudentCommands::Upsert(args) => {
            let patch = StudentPatch {
                interests: tags(args.interests),
                career_choices: tags(args.careers),
                syllabus_links: args.syllabus_links,
                uploaded_materials: args.uploaded_materials,
                mentor_match_ids: args.mentor_match_ids,
                google_calendar_sync_id: args.calendar_sync_id,
                average_score: args.average_score,
                notes: args.notes,
            };
            print_json(&repo.upsert_student_profile(&args.id, &patch)?);
        }
        StudentCommands::Show { id } => {
            let profile = repo.get_student_profile(&id)?;
            print_json(&found(profile, format!("student '{id}'"))?);
        }
        StudentCommands::Interests(list) => run_list(repo, ListField::StudentInterests, list)?,
        StudentCommands::Careers(list) => run_list(repo, ListField::StudentCareers, list)?,
    }
    Ok(())
}

fn run_mentor(repo: &Repository<'_>, command: MentorCommands) -> Result<(), AppError> {
    match command {
        MentorCommands::Upsert(args) => {
            let patch = MentorPatch {
                general_interests: tags(args.interests),
                career_background: args.background,
                available_slots: args.available_slots,
                scheduled_sessions: args.scheduled_sessions,
                specialization_tags: tags(args.areas),
                ai_review_count: args.ai_review_count,
                notes: args.notes,
            };
            print_json(&repo.upsert_mentor_profile(&args.id, &patch)?);
        }
        MentorCommands::Show { id } => {
            let profile = repo.get_mentor_profile(&id)?;
            print_json(&found(profile, format!("mentor '{id}'"))?);
        }
        MentorCommands::Interests(list) => run_list(repo, ListField::MentorInterests, list)?,
        MentorCommands::Areas(list) => run_list(repo, ListField::MentorAreas, list)?,
        MentorCommands::Background { id, text, clear } => {
            let record = if clear {
                repo.clear_career_background(&id)?
            } else {
                repo.set_career_background(&id, text.as_deref().unwrap_or_default())?
            };
            print_json(&record);
        }
    }
    Ok(())
}

fn run_list(repo: &Repository<'_>, field: ListField, command: ListCommands) -> Result<(), AppError> {
    let list = match command {
        ListCommands::Show { id } => repo.list_values(field, &id)?,
        ListCommands::Set { id, values } => {
            repo.replace_values(field, &id, TagList::from_values(values))?
        }
        ListCommands::Add { id, value } => repo.add_value(field, &id, &value)?,
        ListCommands::Remove { id, value } => repo.remove_value(field, &id, &value)?,
    };
    print_json(&list);
    Ok(())
}

fn run_session(repo: &Repository<'_>, command: SessionCommands) -> Result<(), AppError> {
    match command {
        SessionCommands::Schedule {
            mentor,
            student,
            date,
            time,
            topic,
            status,
        } => print_json(&repo.schedule_session(NewSession {
            mentor_id: mentor,
            student_id: student,
            date,
            time,
            topic,
            status,
        })?),
        SessionCommands::List(ByPersonArgs { mentor, student }) => {
            let sessions = match (mentor, student) {
                (Some(mentor), _) => repo.list_sessions_for_mentor(&mentor)?,
                (None, Some(student)) => repo.list_sessions_for_student(&student)?,
                (None, None) => {
                    return Err(AppError::InvalidArgument(
                        "pass --mentor or --student".to_string(),
                    ))
                }
            };
            print_json(&sessions);
        }
    }
    Ok(())
}

fn run_material(repo: &Repository<'_>, command: MaterialCommands) -> Result<(), AppError> {
    match command {
        MaterialCommands::Add {
            student,
            file_name,
            file_link,
            summary,
            related_quiz_ids,
        } => print_json(&repo.add_study_material(NewMaterial {
            student_id: student,
            file_name,
            file_link,
            summary,
            related_quiz_ids,
        })?),
        MaterialCommands::List { student } => {
            print_json(&repo.list_study_materials_for_student(&student)?)
        }
    }
    Ok(())
}

fn run_quiz(repo: &Repository<'_>, command: QuizCommands) -> Result<(), AppError> {
    match command {
        QuizCommands::Create {
            subject,
            difficulty,
            question,
            options,
            answer,
            material,
            created_by,
        } => print_json(&repo.create_quiz(NewQuiz {
            subject,
            difficulty_level: difficulty,
            question_text: question,
            options,
            correct_answer: answer,
            related_material_id: material,
            created_by,
        })?),
        QuizCommands::List { material, student } => {
            let quizzes = match (material, student) {
                (Some(material), _) => repo.list_quizzes_for_material(&material)?,
                (None, Some(student)) => repo.list_quizzes_for_student(&student)?,
                (None, None) => {
                    return Err(AppError::InvalidArgument(
                        "pass --material or --student".to_string(),
                    ))
                }
            };
            print_json(&quizzes);
        }
    }
    Ok(())
}

fn run_score(repo: &Repository<'_>, command: ScoreCommands) -> Result<(), AppError> {
    match command {
        ScoreCommands::Record {
            student,
            quiz,
            score,
            total,
            grader,
            notes,
        } => print_json(&repo.record_quiz_score(NewScore {
            student_id: student,
            quiz_id: quiz,
            score,
            total_marks: total,
            grader,
            notes,
        })?),
        ScoreCommands::List { student } => print_json(&repo.list_quiz_scores_for_student(&student)?),
    }
    Ok(())
}

fn run_correction(repo: &Repository<'_>, command: CorrectionCommands) -> Result<(), AppError> {
    match command {
        CorrectionCommands::Record {
            mentor,
            student,
            file_link,
            ai_feedback,
            ai_score,
            manual_feedback,
            final_score,
            material,
        } => print_json(&repo.record_ai_correction(NewCorrection {
            mentor_id: mentor,
            student_id: student,
            file_link,
            ai_feedback,
            ai_score,
            manual_feedback,
            final_score,
            related_material_id: material,
        })?),
        CorrectionCommands::List { student } => {
            print_json(&repo.list_corrections_for_student(&student)?)
        }
    }
    Ok(())
}

fn run_recommend(repo: &Repository<'_>, command: RecommendCommands) -> Result<(), AppError> {
    match command {
        RecommendCommands::Add {
            student,
            mentor,
            match_percentage,
            reason,
            source,
        } => print_json(&repo.add_mentor_recommendation(NewRecommendation {
            student_id: student,
            mentor_id: mentor,
            match_percentage,
            reason_for_match: reason,
            source,
        })?),
        RecommendCommands::List { student } => {
            print_json(&repo.list_recommendations_for_student(&student)?)
        }
    }
    Ok(())
}
