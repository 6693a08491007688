use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::catalog::Role;
use crate::cli::{FinalizeArgs, LayerArgs, LogArgs};
use crate::config::Config;
use crate::error::AppError;
use crate::report;
use crate::session::{Mode, Page, Session, View};
use crate::store::Store;
use crate::views;
use crate::workflow::{self, FollowUpStatus, LogOrigin, Submission};

#[derive(Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand)]
enum ShellCommand {
    /// Back to the landing page
    Home,
    /// Leave the staff area
    SignOut,
    /// Sign into a staff area (JP, PY, SY or ADM)
    Area { role: Role },
    /// Return to the area student list or the admin dashboard
    Back,
    /// Open the quick log form for a student
    Quick {
        #[arg(required = true)]
        student: Vec<String>,
    },
    /// Open a student's data analysis
    Analyze {
        #[arg(required = true)]
        student: Vec<String>,
    },
    /// Open the log form for the selected student
    NewLog,
    /// Submit the open log form
    Log(LogArgs),
    /// Open the ABCH follow-up for the selected student
    FollowUp,
    /// Add a chronology layer to the follow-up timeline
    Layer(LayerArgs),
    /// Finalize the ABCH follow-up
    Finalize(FinalizeArgs),
    /// Write the selected student's BPP report
    Report {
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Staff management (ADM)
    Staff,
    /// Add staff placeholder (ADM)
    AddStaff,
    /// Full incident log (ADM)
    Incidents,
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

struct Shell<'a> {
    session: Session,
    store: &'a mut Store,
    config: &'a Config,
    today: NaiveDate,
}

fn now() -> NaiveTime {
    Local::now().time()
}

impl Shell<'_> {
    fn selected_student(&self) -> anyhow::Result<String> {
        self.session
            .selected_student
            .clone()
            .context("no student selected; use `analyze <student>` or `quick <student>`")
    }

    fn signed_in(&self) -> anyhow::Result<Role> {
        self.session
            .role
            .context("sign into a staff area first with `area <ROLE>`")
    }

    fn require_admin(&self) -> anyhow::Result<()> {
        if self.session.role != Some(Role::Adm) {
            bail!("administrator access required; use `area ADM`");
        }
        Ok(())
    }

    fn execute(&mut self, command: ShellCommand) -> anyhow::Result<Option<String>> {
        match command {
            ShellCommand::Home => self.session.go_home(),
            ShellCommand::SignOut => self.session.sign_out(),
            ShellCommand::Area { role } => {
                self.session
                    .navigate_to(Page::StaffArea, Some(role), Mode::Home, None);
            }
            ShellCommand::Back => {
                self.signed_in()?;
                self.session
                    .navigate_to(Page::StaffArea, None, Mode::Home, None);
            }
            ShellCommand::Quick { student } => {
                let student = self.store.find_student(&student.join(" "))?;
                self.session.navigate_to(
                    Page::QuickLog,
                    None,
                    Mode::Home,
                    Some(student.id.clone()),
                );
            }
            ShellCommand::Analyze { student } => {
                self.signed_in()?;
                let student = self.store.find_student(&student.join(" "))?;
                self.session.navigate_to(
                    Page::StaffArea,
                    None,
                    Mode::Analysis,
                    Some(student.id.clone()),
                );
            }
            ShellCommand::NewLog => {
                self.signed_in()?;
                let student = self.selected_student()?;
                self.session
                    .navigate_to(Page::StaffArea, None, Mode::Log, Some(student));
            }
            ShellCommand::Log(args) => {
                let (student, origin) = match (self.session.route(), self.session.role) {
                    (View::LogForm(id), Some(role)) => (id, LogOrigin::StaffArea(role)),
                    (View::QuickLogForm(id), _) => (id, LogOrigin::QuickLog),
                    _ => bail!("open a log form first with `new-log` or `quick <student>`"),
                };
                let form = args.into_form(self.today, now());
                let submission =
                    workflow::submit_log(&mut self.session, self.store, &student, &form, origin)?;
                let message = match submission {
                    Submission::Saved(id) => format!("Incident logged ({id})."),
                    Submission::FollowUpRequired => "High-risk incident: complete the critical \
                         incident ABCH follow-up to save it."
                        .to_string(),
                };
                return Ok(Some(message));
            }
            ShellCommand::FollowUp => {
                let student = self.selected_student()?;
                if let FollowUpStatus::Recovered(id) =
                    workflow::open_follow_up(&mut self.session, self.store, &student)?
                {
                    return Ok(Some(format!("Recovered pending incident {id}.")));
                }
            }
            ShellCommand::Layer(args) => {
                let count = workflow::add_layer(&mut self.session, args.into_layer(now()))?;
                return Ok(Some(format!("Layer {count} added.")));
            }
            ShellCommand::Finalize(args) => {
                let id =
                    workflow::finalize_follow_up(&mut self.session, self.store, &args.into_form())?;
                return Ok(Some(format!(
                    "Critical Incident ABCH Record Finalized and Saved! ({id})"
                )));
            }
            ShellCommand::Report { out_dir } => {
                let store: &Store = self.store;
                let student = store.student(&self.selected_student()?)?;
                let out = report::write_report(store, student, &out_dir, self.today)?;
                return Ok(Some(format!("Report written to {}.", out.display())));
            }
            ShellCommand::Staff => {
                self.require_admin()?;
                self.session
                    .navigate_to(Page::StaffArea, None, Mode::StaffManagement, None);
            }
            ShellCommand::AddStaff => {
                self.require_admin()?;
                self.session
                    .navigate_to(Page::StaffArea, None, Mode::AddStaff, None);
            }
            ShellCommand::Incidents => {
                self.require_admin()?;
                self.session
                    .navigate_to(Page::StaffArea, None, Mode::AllIncidents, None);
            }
            ShellCommand::Quit => {}
        }
        Ok(None)
    }

    /// Lookup misses and a missing follow-up draft leave nothing sensible
    /// on screen, so those send the user back to the landing page.
    fn recover(&mut self, err: &anyhow::Error) {
        if matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::StudentNotFound(_) | AppError::MissingDraft { .. })
        ) {
            self.session.go_home();
        }
    }

    fn render<W: Write>(&mut self, output: &mut W) -> anyhow::Result<()> {
        let view = match views::render(&self.session, self.store, self.config, self.today) {
            Ok(view) => view,
            Err(err) => {
                writeln!(output, "Error: {err}")?;
                self.session.go_home();
                views::landing(self.store, self.config)
            }
        };
        writeln!(output, "{view}")?;
        Ok(())
    }
}

/// Whether the shell keeps reading after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

const PROMPT: &str = "bpp> ";
const HISTORY_FILE: &str = "bpp_tracker_history.txt";

impl<'a> Shell<'a> {
    fn new(store: &'a mut Store, config: &'a Config, today: NaiveDate) -> Self {
        Self {
            session: Session::new(),
            store,
            config,
            today,
        }
    }

    /// Splits, parses and runs one input line, then renders the page the
    /// session routes to. Input errors are printed and the session survives.
    fn handle_line<W: Write>(&mut self, line: &str, output: &mut W) -> anyhow::Result<Flow> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Flow::Continue);
        }

        let args = match shlex::split(line) {
            Some(args) => args,
            None => {
                writeln!(output, "Error: Malformed input. Please check quoting.")?;
                return Ok(Flow::Continue);
            }
        };
        let command = match ShellLine::try_parse_from(args) {
            Ok(parsed) => parsed.command,
            Err(err) => {
                write!(output, "{}", err.render())?;
                return Ok(Flow::Continue);
            }
        };
        if matches!(command, ShellCommand::Quit) {
            return Ok(Flow::Quit);
        }

        match self.execute(command) {
            Ok(Some(message)) => writeln!(output, "{message}")?,
            Ok(None) => {}
            Err(err) => {
                writeln!(output, "Error: {err:#}")?;
                tracing::debug!("full error: {err:?}");
                self.recover(&err);
            }
        }
        self.render(output)?;
        Ok(Flow::Continue)
    }
}

/// Interactive session on the terminal with line editing and history.
/// Runs until `quit`, Ctrl-D or a terminal error.
pub fn run_interactive(store: &mut Store, config: &Config, today: NaiveDate) -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new().context("failed to open the terminal")?;
    let _ = rl.load_history(HISTORY_FILE);
    let mut output = io::stdout();
    let mut shell = Shell::new(store, config, today);
    shell.render(&mut output)?;

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    rl.add_history_entry(line.trim()).ok();
                }
                if shell.handle_line(&line, &mut output)? == Flow::Quit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Ctrl-C received. Type 'quit' to leave.");
            }
            Err(ReadlineError::Eof) => {
                println!("Ctrl-D received. Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Readline error: {err:?}");
                break;
            }
        }
    }

    if let Err(err) = rl.save_history(HISTORY_FILE) {
        tracing::warn!(error = %err, "failed to save shell history");
    }
    tracing::debug!(incidents = shell.store.len(), "shell closed");
    Ok(())
}

/// Scripted session over any reader, until `quit` or end of input.
pub fn run<R: BufRead, W: Write>(
    input: R,
    mut output: W,
    store: &mut Store,
    config: &Config,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let mut shell = Shell::new(store, config, today);
    shell.render(&mut output)?;

    for line in input.lines() {
        let line = line.context("failed to read shell input")?;
        if shell.handle_line(&line, &mut output)? == Flow::Quit {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::mock;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    fn store() -> Store {
        Store::from_mock(&mock::generate(&mut StdRng::seed_from_u64(5), today()))
    }

    fn drive(store: &mut Store, script: &str) -> String {
        let config = Config::new("Cargo.toml", Some(5));
        let mut output = Vec::new();
        run(Cursor::new(script), &mut output, store, &config, today()).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn critical_incident_end_to_end() {
        let mut store = store();
        let before = store.len();
        let script = "\
area JP
analyze Chloe T.
new-log
log --time 10:40 --behaviour elopement --antecedent transition --setting yard --support 1:1 --risk 4 --consequence redirection/prompt --function 'avoid/escape something' --wot hyper-aroused --effectiveness ineffective --logged-by s1
layer --time 10:42 --location gate --behaviour elopement --context 'Ran to the gate'
layer --time 10:50
finalize --how-to-respond 'Offer two choices' --summary 'Transition triggered flight.' --outcome 'leave area'
quit
";
        let output = drive(&mut store, script);

        assert!(output.contains("### Students in the JP Area"));
        assert!(output.contains("#### Log Incident for Chloe T."));
        assert!(
            output.contains("High-risk incident: complete the critical incident ABCH follow-up")
        );
        assert!(output.contains("## Critical Incident ABCH Follow-up (Step 2 of 2)"));
        assert!(output.contains("Layer 2 added."));
        assert!(output.contains("Critical Incident ABCH Record Finalized and Saved!"));
        assert_eq!(store.len(), before + 1);

        let saved = store.incidents().last().unwrap();
        assert!(saved.is_abch_completed);
        assert!(saved.outcomes.leave_area);
        assert!(saved.context.contains("Layer 1 (10:42): L: Gate; A: N/A; B: Elopement; C: N/A"));
        assert!(saved.context.contains("   - Context: Ran to the gate"));
    }

    #[test]
    fn quick_low_risk_log_returns_home() {
        let mut store = store();
        let before = store.len();
        let script = "\
quick Mia P.
log --time 09:05 --behaviour 'verbal refusal' --antecedent tired --setting classroom --support independent --risk 1 --consequence 'time-out (brief)' --function 'seek/get something' --wot coping --effectiveness 'highly effective' --logged-by s_trt
log --time 09:05 --behaviour 'verbal refusal' --antecedent tired --setting classroom --support independent --risk 1 --consequence 'time-out (brief)' --function 'seek/get something' --wot coping --effectiveness 'highly effective' --logged-by s_trt --logged-by-name 'Jane Doe'
";
        let output = drive(&mut store, script);

        assert!(output.contains("Error: name required for special role: TRT"));
        assert!(output.contains("Incident logged ("));
        assert_eq!(store.len(), before + 1);
        let saved = store.incidents().last().unwrap();
        assert_eq!(saved.logged_by.to_string(), "s_trt:Jane Doe");
        assert!(!saved.outcomes.any());
        let landing = views::landing(&store, &Config::new("Cargo.toml", None));
        assert!(output.trim_end().ends_with(landing.trim_end()));
    }

    #[test]
    fn leaving_follow_up_discards_the_draft() {
        let mut store = store();
        let before = store.len();
        let script = "\
quick Leah S.
log --time 13:10 --behaviour 'property destruction' --antecedent 'task demand' --setting classroom --support 'small group' --risk 3 --consequence 'time-out (brief)' --function 'avoid/escape something' --wot hyper-aroused --effectiveness 'worsened behaviour' --logged-by s2
home
finalize --how-to-respond plan --summary summary
";
        let output = drive(&mut store, script);
        assert!(output.contains("Error: no ABCH follow-up is in progress"));
        assert_eq!(store.len(), before);
    }

    #[test]
    fn bad_input_keeps_the_session_alive() {
        let mut store = store();
        let script = "\
analyze Marcus A.
area ADM
quick Nobody
frobnicate
area 'JP
incidents
";
        let output = drive(&mut store, script);
        assert!(output.contains("Error: sign into a staff area first"));
        assert!(output.contains("Error: student not found: Nobody"));
        assert!(output.contains("unrecognized subcommand"));
        assert!(output.contains("Error: Malformed input. Please check quoting."));
        assert!(output.contains("### Full Incident Log (All Students)"));
    }

    #[test]
    fn follow_up_without_a_draft_returns_to_landing() {
        let mut store = Store::new(mock::student_roster(), mock::staff_roster(), Vec::new());
        let output = drive(&mut store, "area JP\nanalyze Chloe T.\nfollow-up\n");

        assert!(output.contains(
            "Error: cannot find a preliminary incident log to complete the ABCH follow-up for Chloe T."
        ));
        let landing = views::landing(&store, &Config::new("Cargo.toml", None));
        assert!(output.trim_end().ends_with(landing.trim_end()));
    }

    #[test]
    fn blank_lines_and_quit_stop_cleanly() {
        let mut store = store();
        let config = Config::new("Cargo.toml", None);
        let mut shell = Shell::new(&mut store, &config, today());
        let mut output = Vec::new();
        assert_eq!(shell.handle_line("   ", &mut output).unwrap(), Flow::Continue);
        assert!(output.is_empty());
        assert_eq!(shell.handle_line("exit", &mut output).unwrap(), Flow::Quit);
    }

    #[test]
    fn admin_pages_need_the_admin_role() {
        let mut store = store();
        let output = drive(&mut store, "area SY\nstaff\narea ADM\nstaff\n");
        assert!(output.contains("Error: administrator access required"));
        assert!(output.contains("### Staff Management (Placeholder)"));
        assert!(output.contains("### System Administration Dashboard"));
    }
}
