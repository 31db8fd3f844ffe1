//! Attendify - class roster and attendance session management.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use attendify as app;
use clap::{Args, Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use app::config::{AppConfig, ConfigLoadResult, Language, LoggingConfig};
use app::dashboard::DashboardStats;
use app::models::{ClassForm, Faculty, Role, User};
use app::session::{CheckInOutcome, SessionService};
use app::store::AppStore;
use app::{export, import, roster};

/// Class roster and attendance session management.
#[derive(Parser)]
#[command(name = "attendify", version)]
struct Cli {
    /// Use config.toml from current directory (dev mode)
    #[arg(long)]
    dev: bool,

    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Acting user ID
    #[arg(long = "as", global = true, default_value = "admin")]
    user: String,

    /// Acting user role (student, faculty, admin)
    #[arg(long, global = true, default_value = "admin")]
    role: Role,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage the class roster
    #[command(subcommand)]
    Class(ClassCommand),
    /// Start, end, and list class sessions
    #[command(subcommand)]
    Session(SessionCommand),
    /// Check in with a scanned QR payload
    Scan {
        /// QR payload JSON
        qr: String,
    },
    /// Check in after a successful face match
    Face {
        /// Class with a running session
        class_id: String,
    },
    /// Import classes from a CSV file
    Import { file: PathBuf },
    /// Export the roster (or archived sessions) to Excel
    Export {
        /// Output directory (defaults to export.output_dir)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Export archived sessions instead of classes
        #[arg(long)]
        sessions: bool,
    },
    /// Manage the faculty directory
    #[command(subcommand)]
    Faculty(FacultyCommand),
    /// Show dashboard figures
    Stats,
    /// Toggle dark mode
    DarkMode,
    /// Show or set the interface language (en, hi, pa, ml)
    Language { code: Option<String> },
    /// Write a default config file
    InitConfig,
}

#[derive(Subcommand)]
enum ClassCommand {
    /// List visible classes
    List,
    /// Add a class
    Add(ClassArgs),
    /// Edit a class; omitted fields keep their value
    Edit {
        id: String,
        #[command(flatten)]
        fields: ClassArgs,
    },
    /// Delete a class (admin only)
    Delete { id: String },
    /// Enroll a student
    Enroll { id: String, student: String },
    /// Remove a student
    Unenroll { id: String, student: String },
}

#[derive(Args)]
struct ClassArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    subject: Option<String>,
    #[arg(long)]
    day: Option<String>,
    #[arg(long)]
    batch: Option<String>,
    #[arg(long)]
    period: Option<String>,
    #[arg(long)]
    teacher_email: Option<String>,
    #[arg(long)]
    faculty_id: Option<String>,
    #[arg(long)]
    schedule: Option<String>,
    #[arg(long)]
    room: Option<String>,
    #[arg(long)]
    semester: Option<String>,
}

impl ClassArgs {
    /// Overlay the given fields onto `form`.
    fn apply_to(self, mut form: ClassForm) -> ClassForm {
        let fields = [
            (self.name, &mut form.name),
            (self.subject, &mut form.subject),
            (self.day, &mut form.day),
            (self.batch, &mut form.batch),
            (self.period, &mut form.period),
            (self.teacher_email, &mut form.teacher_email),
            (self.faculty_id, &mut form.faculty_id),
            (self.schedule, &mut form.schedule),
            (self.room, &mut form.room),
            (self.semester, &mut form.semester),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
        form
    }
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Start a session and print its QR payload
    Start { class_id: String },
    /// End a class's running session
    End { class_id: String },
    /// List running sessions
    List,
}

#[derive(Subcommand)]
enum FacultyCommand {
    /// Add or update a faculty member
    Add {
        id: String,
        name: String,
        #[arg(long, default_value = "")]
        email: String,
    },
    /// List faculty members
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Determine config path based on mode
    let config_path = match (&cli.config, cli.dev) {
        (Some(path), _) => path.clone(),
        (None, true) => PathBuf::from("config.toml"),
        (None, false) => AppConfig::default_path(),
    };

    let (config, load_note) = match AppConfig::try_load(&config_path) {
        ConfigLoadResult::Loaded(config) => (config, "loaded"),
        ConfigLoadResult::Missing => (AppConfig::default(), "missing, using defaults"),
        ConfigLoadResult::Invalid(e) => bail!("Config {config_path:?} is invalid: {e}"),
    };

    let _guard = init_logging(&config.logging);
    tracing::info!("Config {:?}: {}", config_path, load_note);

    if let Err(e) = run(cli, &config, &config_path).await {
        tracing::error!("{e:#}");
        return Err(e);
    }
    Ok(())
}

/// Initialize logging: stderr always, plus a daily file when configured.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "attendify.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

async fn run(cli: Cli, config: &AppConfig, config_path: &Path) -> anyhow::Result<()> {
    let actor = User::new(cli.user, cli.role);
    let state_file = &config.data.state_file;
    let mut store = AppStore::load(state_file).with_context(|| format!("loading state from {state_file:?}"))?;
    let sessions = SessionService::new(config.session.clone());

    let changed = match cli.command {
        Command::Class(cmd) => run_class(cmd, &mut store, &actor)?,
        Command::Session(cmd) => run_session(cmd, &sessions, &mut store, &actor)?,
        Command::Scan { qr } => {
            print_check_in(sessions.check_in_qr(&mut store, &actor, &qr)?);
            true
        }
        Command::Face { class_id } => {
            print_check_in(sessions.check_in_face(&mut store, &actor, &class_id)?);
            true
        }
        Command::Import { file } => {
            let summary = import::import_file(&mut store, &actor, &file).await?;
            println!("{}", summary.summary());
            summary.imported > 0
        }
        Command::Export { out, sessions } => {
            let dir = out.as_deref().unwrap_or(config.export.output_dir.as_path());
            std::fs::create_dir_all(dir)?;
            let path = if sessions {
                export::export_sessions(&store, dir)?
            } else {
                export::export_classes(&store, dir)?
            };
            println!("{}", path.display());
            false
        }
        Command::Faculty(FacultyCommand::Add { id, name, email }) => {
            if !actor.is_admin() {
                bail!("only admin can manage faculty");
            }
            store.upsert_faculty(Faculty { id, name, email });
            true
        }
        Command::Faculty(FacultyCommand::List) => {
            for f in &store.faculty {
                println!("{}\t{}\t{}", f.id, f.name, f.email);
            }
            false
        }
        Command::Stats => {
            println!("{}", DashboardStats::compute(&store, &actor).summary());
            false
        }
        Command::DarkMode => {
            let on = store.toggle_dark_mode();
            println!("Dark mode {}", if on { "on" } else { "off" });
            true
        }
        Command::Language { code } => {
            match code {
                Some(code) => {
                    let Some(language) = Language::from_code(&code) else {
                        bail!("unknown language '{code}' (expected en, hi, pa or ml)");
                    };
                    let mut updated = config.clone();
                    updated.ui.language = language;
                    updated.save(config_path)?;
                    println!("Language set to {}", language.name());
                }
                None => println!("{} ({})", config.ui.language.name(), config.ui.language.code()),
            }
            false
        }
        Command::InitConfig => {
            config.save(config_path)?;
            println!("{}", config_path.display());
            false
        }
    };

    if changed {
        store.save(state_file)?;
    }
    Ok(())
}

fn run_class(cmd: ClassCommand, store: &mut AppStore, actor: &User) -> app::Result<bool> {
    match cmd {
        ClassCommand::List => {
            for cls in roster::list_for(store, actor) {
                let faculty = store.faculty_name(&cls.faculty_id).unwrap_or(export::UNASSIGNED);
                println!(
                    "{}\t{}\t{}\t{} {}\t{}\t{}\t{} students",
                    cls.id,
                    cls.name,
                    cls.subject,
                    cls.day,
                    cls.period,
                    cls.room,
                    faculty,
                    cls.student_count()
                );
            }
            Ok(false)
        }
        ClassCommand::Add(fields) => {
            let class = roster::create(store, actor, fields.apply_to(ClassForm::default()))?;
            println!("{}", class.id);
            Ok(true)
        }
        ClassCommand::Edit { id, fields } => {
            let form = ClassForm::edit(roster::get_by_id(store, &id)?);
            roster::update(store, actor, &id, fields.apply_to(form))?;
            Ok(true)
        }
        ClassCommand::Delete { id } => {
            roster::delete(store, actor, &id)?;
            Ok(true)
        }
        ClassCommand::Enroll { id, student } => roster::enroll(store, actor, &id, &student),
        ClassCommand::Unenroll { id, student } => roster::unenroll(store, actor, &id, &student),
    }
}

fn run_session(cmd: SessionCommand, sessions: &SessionService, store: &mut AppStore, actor: &User) -> app::Result<bool> {
    match cmd {
        SessionCommand::Start { class_id } => {
            let session = sessions.start_class(store, actor, &class_id)?;
            println!("{}", session.qr_code);
            Ok(true)
        }
        SessionCommand::End { class_id } => match sessions.end_class(store, actor, &class_id)? {
            Some(session) => {
                println!("{} ended, {} attendees", session.id, session.attendees.len());
                Ok(true)
            }
            None => Ok(false),
        },
        SessionCommand::List => {
            for session in store.active_sessions.values() {
                println!(
                    "{}\t{}\t{}\t{} attendees",
                    session.id,
                    session.class_id,
                    session.start_time.format("%Y-%m-%d %H:%M:%S"),
                    session.attendees.len()
                );
            }
            Ok(false)
        }
    }
}

fn print_check_in(outcome: CheckInOutcome) {
    match outcome {
        CheckInOutcome::Recorded(attendee) => println!(
            "Checked in {} via {} at {}",
            attendee.student_id,
            attendee.method.name(),
            attendee.checked_in_at.format("%H:%M:%S")
        ),
        CheckInOutcome::AlreadyPresent => println!("Already checked in"),
    }
}
