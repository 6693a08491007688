use std::io::{self, BufWriter, IsTerminal};
use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod analytics;
mod catalog;
mod cli;
mod config;
mod error;
mod export;
mod mock;
mod models;
mod report;
mod schedule;
mod session;
mod shell;
mod stage;
mod store;
mod views;
mod workflow;

use catalog::{Area, Role};
use cli::{FinalizeArgs, LogArgs};
use config::{Config, DEFAULT_BACKGROUND};
use models::ChronologyLayer;
use session::{Mode, Page, Session};
use store::Store;
use workflow::{LogOrigin, Submission};

#[derive(Parser)]
#[command(name = "bpp-tracker")]
#[command(about = "Behaviour support incident tracker and BPP report generator", long_about = None)]
struct Cli {
    /// Seed for the demo data, for reproducible runs
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Landing page background image
    #[arg(long, global = true, default_value = DEFAULT_BACKGROUND)]
    background: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List students and their incident counts
    Students {
        #[arg(long)]
        area: Option<Area>,
    },
    /// List staff accounts
    Staff,
    /// Print a student's data analysis
    Analyze { student: String },
    /// Write a student's Behaviour Profile Plan
    Report {
        student: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print or export the full incident log
    #[command(group(
        ArgGroup::new("format")
            .args(["csv", "json"])
            .multiple(false)
    ))]
    Incidents {
        /// Write CSV to this path
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Print JSON to stdout
        #[arg(long)]
        json: bool,
    },
    /// Administration dashboard
    Dashboard,
    /// Risk level descriptions
    RiskGuide,
    /// Log one incident, including the ABCH follow-up for risk 3 and above
    Log {
        student: String,
        /// Staff area to log from; quick log when omitted
        #[arg(long)]
        role: Option<Role>,
        #[command(flatten)]
        incident: LogArgs,
        /// Chronology layer `HH:MM|location|antecedent|behaviour|consequence|context` (repeatable)
        #[arg(long)]
        layer: Vec<ChronologyLayer>,
        #[command(flatten)]
        follow_up: FinalizeArgs,
    },
    /// Interactive session; reads a script when stdin is not a terminal
    Shell,
}

fn init_logging() {
    let default_level = "warn";
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = Config::new(&cli.background, cli.seed);
    let mut store = Store::from_mock(mock::cached(config.seed));
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Students { area } => {
            let areas = match area {
                Some(area) => vec![area],
                None => Area::ALL.to_vec(),
            };
            for area in areas {
                println!("Students in the {area} area:");
                for student in store.students_in(area) {
                    println!(
                        "- {} [{}] grade {}, teacher {}, {} incidents",
                        student.name,
                        student.id,
                        student.grade,
                        student.teacher,
                        store.incidents_for(&student.id).len()
                    );
                }
            }
        }
        Commands::Staff => print!("{}", views::staff_management(&store)),
        Commands::Analyze { student } => {
            let student = store.find_student(&student)?;
            print!("{}", views::student_analysis(&store, &student.id, today)?);
        }
        Commands::Report { student, out_dir } => {
            let student = store.find_student(&student)?;
            let out = report::write_report(&store, student, &out_dir, today)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Incidents { csv, json } => {
            if let Some(path) = csv {
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                let written = export::write_csv(&store, BufWriter::new(file))?;
                println!("Wrote {written} incidents to {}.", path.display());
            } else if json {
                export::write_json(&store, io::stdout().lock())?;
                println!();
            } else {
                print!("{}", views::all_incidents(&store));
            }
        }
        Commands::Dashboard => print!("{}", views::admin_dashboard(&store)),
        Commands::RiskGuide => print!("{}", views::risk_guide()),
        Commands::Log {
            student,
            role,
            incident,
            layer,
            follow_up,
        } => {
            let student = store.find_student(&student)?.id.clone();
            let mut session = Session::new();
            let origin = match role {
                Some(role) => {
                    session.navigate_to(
                        Page::StaffArea,
                        Some(role),
                        Mode::Log,
                        Some(student.clone()),
                    );
                    LogOrigin::StaffArea(role)
                }
                None => {
                    session.navigate_to(Page::QuickLog, None, Mode::Home, Some(student.clone()));
                    LogOrigin::QuickLog
                }
            };

            let form = incident.into_form(today, Local::now().time());
            let submission =
                workflow::submit_log(&mut session, &mut store, &student, &form, origin)?;
            let id = match submission {
                Submission::Saved(id) => id,
                Submission::FollowUpRequired => {
                    for entry in layer {
                        workflow::add_layer(&mut session, entry)?;
                    }
                    workflow::finalize_follow_up(&mut session, &mut store, &follow_up.into_form())
                        .context(
                            "risk level 3 and above needs the ABCH follow-up: \
                             pass --how-to-respond and --summary",
                        )?
                }
            };

            let saved = store
                .incidents()
                .iter()
                .find(|incident| incident.id == id)
                .context("logged incident missing from the store")?;
            println!("Incident {id} logged.");
            println!("{}", serde_json::to_string_pretty(saved)?);
        }
        Commands::Shell => {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                shell::run_interactive(&mut store, &config, today)?;
            } else {
                shell::run(stdin.lock(), io::stdout().lock(), &mut store, &config, today)?;
            }
        }
    }

    Ok(())
}
