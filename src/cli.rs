//! Command-Line Interface
//!
//! Gives any workflow a small command line in one call:
//!
//! ```bash
//! # Start fresh; progress goes to .nothing/<Name>_<timestamp>.json
//! my-procedure new
//!
//! # Resume (after optionally editing the file by hand)
//! my-procedure load .nothing/Release_20261018-093000.json
//!
//! # Write an editable progress file without running anything
//! my-procedure template
//! ```
//!
//! Exit status is 0 when every step is complete, 2 when a step failed and
//! the run halted, and 1 for fatal errors (corrupt or unwritable progress
//! file, bad usage).

use std::env;
use std::error::Error;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use colored::Colorize;
use log::{error, warn};

use crate::execution::{write_template, Engine, RunOutcome, EXIT_ALL_DONE, EXIT_FATAL};
use crate::interaction::Prompter;
use crate::workflow::{store, Workflow};
use crate::{APP_NAME, VERSION};

/// Default directory for progress and log files, relative to the working directory.
pub const DEFAULT_DIR: &str = ".nothing";

/// Environment variable overriding [`DEFAULT_DIR`].
pub const DIR_ENV: &str = "DONOTHING_DIR";

/// What the operator asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start from the first step with a new progress file
    New,
    /// Resume from an existing progress file
    Load(PathBuf),
    /// Write an editable progress file and stop
    Template,
    Help,
    Version,
}

/// Command-line configuration parsed from arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub command: Command,
    /// `--dir`, if given
    pub dir: Option<PathBuf>,
    pub verbose: bool,
}

impl RunConfig {
    /// Progress directory: `--dir`, then `DONOTHING_DIR`, then `.nothing`.
    pub fn progress_dir(&self) -> PathBuf {
        self.progress_dir_with(env::var_os(DIR_ENV))
    }

    fn progress_dir_with(&self, env_value: Option<OsString>) -> PathBuf {
        self.dir
            .clone()
            .or_else(|| env_value.filter(|v| !v.is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DIR))
    }
}

/// Parses command-line arguments (including the program name) into a RunConfig.
pub fn parse_arguments(args: &[String]) -> Result<RunConfig, String> {
    let mut command = None;
    let mut dir = None;
    let mut verbose = false;
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => return Ok(RunConfig { command: Command::Help, dir, verbose }),
            "--version" | "-V" => {
                return Ok(RunConfig {
                    command: Command::Version,
                    dir,
                    verbose,
                })
            }
            "--verbose" | "-v" => verbose = true,
            "--dir" => {
                i += 1;
                if i >= args.len() {
                    return Err("--dir requires a path argument".to_string());
                }
                dir = Some(PathBuf::from(&args[i]));
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ if command.is_some() => {
                return Err(format!("Unexpected argument: {}", arg));
            }
            "new" => command = Some(Command::New),
            "template" => command = Some(Command::Template),
            "load" => {
                i += 1;
                match args.get(i) {
                    Some(path) if !path.starts_with('-') => {
                        command = Some(Command::Load(PathBuf::from(path)))
                    }
                    _ => return Err("load requires the path of a progress file".to_string()),
                }
            }
            other => return Err(format!("Unknown command: {}", other)),
        }
        i += 1;
    }

    let command = command.ok_or_else(|| "A command is required: new, load or template".to_string())?;
    Ok(RunConfig {
        command,
        dir,
        verbose,
    })
}

/// Mirrors log records to stderr and, when available, a log file.
struct LogSink {
    file: Option<File>,
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

/// Configures the logging system with appropriate formatting.
///
/// Records go to stderr so prompts on stdout stay clean, and are appended to
/// `log_file` when one is given.
pub fn setup_logging(verbose: bool, log_file: Option<&Path>) {
    let level = if verbose { "debug" } else { "info" };

    let mut open_error = None;
    let file = log_file.and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| open_error = Some(format!("{}: {}", path.display(), e)))
            .ok()
    });

    let initialised = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| match record.level() {
            log::Level::Warn | log::Level::Error => {
                writeln!(buf, "[{}] {}", record.level(), record.args())
            }
            _ => writeln!(buf, "{}", record.args()),
        })
        .target(env_logger::Target::Pipe(Box::new(LogSink { file })))
        .try_init();

    if initialised.is_ok() {
        if let Some(reason) = open_error {
            warn!("Could not open log file {}", reason);
        }
    }
}

/// Prints the workflow banner with version information.
fn print_banner(workflow: &Workflow) {
    println!();
    println!("{}", workflow.name.bold());
    println!("{} ({} v{})", workflow.description, APP_NAME, VERSION);
}

/// Prints usage information.
fn print_usage(program: &str, workflow: &Workflow) {
    println!("{}", workflow.description);
    println!();
    println!("Usage: {} [OPTIONS] <COMMAND>", program);
    println!();
    println!("Commands:");
    println!("  new            Start the workflow fresh from the first step");
    println!("  load <FILE>    Resume a previous run from its saved JSON progress file.");
    println!("                 The file can be edited first to skip or redo steps,");
    println!("                 or to use alternative values");
    println!("  template       Write an editable progress file with no steps completed");
    println!();
    println!("Options:");
    println!(
        "  --dir DIR      Directory for progress and log files (default: {}, env: {})",
        DEFAULT_DIR, DIR_ENV
    );
    println!("  --verbose      Enable debug logging");
    println!("  --help         Show this help message");
    println!("  --version      Show version information");
    println!();
    println!("Steps:");
    for (index, step) in workflow.steps.iter().enumerate() {
        match &step.description {
            Some(description) => println!("  {}: {} - {}", index, step.name, description),
            None => println!("  {}: {}", index, step.name),
        }
    }
}

/// Works out which progress file a command uses.
///
/// Prepares the progress directory for `new` and `template`; `load` requires
/// the named file to exist.
pub fn resolve_progress_path(config: &RunConfig, workflow: &Workflow) -> Result<PathBuf, Box<dyn Error>> {
    match &config.command {
        Command::New => {
            let dir = config.progress_dir();
            store::prepare_dir(&dir)?;
            Ok(store::timestamped_path(&dir, &workflow.name))
        }
        Command::Template => {
            let dir = config.progress_dir();
            store::prepare_dir(&dir)?;
            Ok(store::template_path(&dir, &workflow.name))
        }
        Command::Load(path) => {
            if !path.is_file() {
                return Err(format!("Progress file does not exist: {}", path.display()).into());
            }
            Ok(path.clone())
        }
        Command::Help | Command::Version => Err("Command does not use a progress file".into()),
    }
}

/// Runs a parsed command with the given operator streams.
///
/// The run report and the final status line go to the prompter as well:
/// the report and success line to its output, a halt to its error stream.
/// Returns the process exit status.
pub fn run_session(
    workflow: Workflow,
    config: &RunConfig,
    prompter: &mut Prompter<'_>,
) -> Result<u8, Box<dyn Error>> {
    let path = resolve_progress_path(config, &workflow)?;
    run_command(workflow, &config.command, &path, prompter)
}

fn run_command(
    workflow: Workflow,
    command: &Command,
    path: &Path,
    prompter: &mut Prompter<'_>,
) -> Result<u8, Box<dyn Error>> {
    if *command == Command::Template {
        let written = write_template(&workflow, path)?;
        prompter.say(&format!("Template saved to: {}", written.display()))?;
        return Ok(EXIT_ALL_DONE);
    }

    let mut engine = Engine::new(workflow, path);
    let outcome = engine.run(prompter)?;

    prompter.say(engine.timeline().summary().trim_end())?;

    match &outcome {
        RunOutcome::AllDone(_) => {
            prompter.say(&"Workflow complete".green().bold().to_string())?;
        }
        RunOutcome::Halted { error, .. } => {
            prompter.report_problem(&format!("{} {}", "Halted:".red().bold(), error))?;
            prompter.report_problem(&format!("Resume with: load {}", path.display()))?;
        }
    }

    Ok(outcome.exit_code())
}

/// Parses the process arguments and runs `workflow` on the standard streams.
pub fn run_main(workflow: Workflow) -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let program = args
        .first()
        .and_then(|arg| Path::new(arg).file_name())
        .and_then(|name| name.to_str())
        .unwrap_or("donothing")
        .to_string();

    let config = match parse_arguments(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage(&program, &workflow);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    match config.command {
        Command::Help => {
            print_usage(&program, &workflow);
            return ExitCode::SUCCESS;
        }
        Command::Version => {
            println!("{} {}", APP_NAME, VERSION);
            return ExitCode::SUCCESS;
        }
        _ => {}
    }

    let path = match resolve_progress_path(&config, &workflow) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    // The run log sits next to the progress file
    let log_file = match config.command {
        Command::Template => None,
        _ => Some(store::log_path(&path)),
    };
    setup_logging(config.verbose, log_file.as_deref());

    print_banner(&workflow);

    let mut prompter = Prompter::stdio();
    match run_command(workflow, &config.command, &path, &mut prompter) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("Run ended with a fatal error");
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::Step;
    use std::fs;
    use tempfile::tempdir;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("prog")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    fn two_steps() -> Workflow {
        let mut workflow = Workflow::new("Demo");
        workflow
            .add_step(Step::new("first", |ctx| {
                ctx.set_value("seen", true)?;
                Ok(())
            }))
            .unwrap()
            .add_step(Step::new("second", |_| Ok(())))
            .unwrap();
        workflow
    }

    fn quiet() -> Prompter<'static> {
        Prompter::new(io::empty(), io::sink(), io::sink())
    }

    #[test]
    fn test_parse_new() {
        let config = parse_arguments(&args(&["new"])).unwrap();
        assert_eq!(config.command, Command::New);
        assert!(!config.verbose);
        assert_eq!(config.dir, None);
    }

    #[test]
    fn test_parse_load_with_options() {
        let config =
            parse_arguments(&args(&["--verbose", "load", "p.json", "--dir", "/tmp/x"])).unwrap();
        assert_eq!(config.command, Command::Load(PathBuf::from("p.json")));
        assert!(config.verbose);
        assert_eq!(config.dir, Some(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_arguments(&args(&[])).is_err());
        assert!(parse_arguments(&args(&["load"])).is_err());
        assert!(parse_arguments(&args(&["load", "--verbose"])).is_err());
        assert!(parse_arguments(&args(&["new", "template"])).is_err());
        assert!(parse_arguments(&args(&["frobnicate"])).is_err());
        assert!(parse_arguments(&args(&["new", "--dir"])).is_err());
        assert!(parse_arguments(&args(&["--bogus"])).is_err());
    }

    #[test]
    fn test_parse_help_and_version() {
        assert_eq!(parse_arguments(&args(&["--help"])).unwrap().command, Command::Help);
        assert_eq!(parse_arguments(&args(&["new", "-V"])).unwrap().command, Command::Version);
    }

    #[test]
    fn test_progress_dir_precedence() {
        let mut config = parse_arguments(&args(&["new"])).unwrap();
        assert_eq!(config.progress_dir_with(None), PathBuf::from(DEFAULT_DIR));
        assert_eq!(
            config.progress_dir_with(Some(OsString::from("/env/dir"))),
            PathBuf::from("/env/dir")
        );
        assert_eq!(
            config.progress_dir_with(Some(OsString::new())),
            PathBuf::from(DEFAULT_DIR)
        );

        config.dir = Some(PathBuf::from("/flag/dir"));
        assert_eq!(
            config.progress_dir_with(Some(OsString::from("/env/dir"))),
            PathBuf::from("/flag/dir")
        );
    }

    #[test]
    fn test_load_requires_existing_file() {
        let dir = tempdir().unwrap();
        let config = RunConfig {
            command: Command::Load(dir.path().join("missing.json")),
            dir: None,
            verbose: false,
        };

        let err = resolve_progress_path(&config, &two_steps()).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_session_new_then_load() {
        let dir = tempdir().unwrap();
        let config = RunConfig {
            command: Command::New,
            dir: Some(dir.path().join(".nothing")),
            verbose: false,
        };

        let code = run_session(two_steps(), &config, &mut quiet()).unwrap();
        assert_eq!(code, EXIT_ALL_DONE);

        let files: Vec<PathBuf> = fs::read_dir(dir.path().join(".nothing"))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("Demo_") && name.ends_with(".json"));

        let resume = RunConfig {
            command: Command::Load(files[0].clone()),
            dir: None,
            verbose: false,
        };
        assert_eq!(run_session(two_steps(), &resume, &mut quiet()).unwrap(), EXIT_ALL_DONE);
    }

    #[test]
    fn test_session_template() {
        let dir = tempdir().unwrap();
        let config = RunConfig {
            command: Command::Template,
            dir: Some(dir.path().to_path_buf()),
            verbose: false,
        };

        run_session(two_steps(), &config, &mut quiet()).unwrap();

        let path = dir.path().join("Demo_template.json");
        let state = store::load(&path).unwrap();
        assert!(state.completed_steps.is_empty());
        assert!(state.values.is_empty());
    }

    #[test]
    fn test_session_halt_exit_code() {
        let dir = tempdir().unwrap();
        let mut workflow = Workflow::new("Fails");
        workflow
            .add_step(Step::new("broken", |_| Err("no access".into())))
            .unwrap();

        let config = RunConfig {
            command: Command::New,
            dir: Some(dir.path().to_path_buf()),
            verbose: false,
        };

        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = {
            let mut prompter = Prompter::new(io::empty(), &mut out, &mut err);
            run_session(workflow, &config, &mut prompter).unwrap()
        };
        assert_eq!(code, crate::execution::EXIT_HALTED);

        let out = String::from_utf8(out).unwrap();
        let err = String::from_utf8(err).unwrap();
        assert!(out.contains("Run summary:"));
        assert!(err.contains("Halted:"));
        assert!(err.contains("no access"));
        assert!(err.contains("Resume with: load"));
        assert!(!out.contains("Halted:"));
    }

    #[test]
    fn test_session_report_goes_to_prompter() {
        let dir = tempdir().unwrap();
        let config = RunConfig {
            command: Command::New,
            dir: Some(dir.path().to_path_buf()),
            verbose: false,
        };

        let mut out = Vec::new();
        let mut err = Vec::new();
        {
            let mut prompter = Prompter::new(io::empty(), &mut out, &mut err);
            run_session(two_steps(), &config, &mut prompter).unwrap();
        }

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Run summary:"));
        assert!(out.contains("Workflow complete"));
        assert!(err.is_empty());
    }

    #[test]
    fn test_log_sink_writes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.log");
        {
            let mut sink = LogSink {
                file: Some(File::create(&path).unwrap()),
            };
            sink.write_all(b"STEP 0 STARTING\n").unwrap();
            sink.flush().unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "STEP 0 STARTING\n");
    }
}
