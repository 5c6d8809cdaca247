//! Main CLI application

use crate::config::{find_library_roots, AssistantNode, Library, ASSISTANT_ROLES};
use crate::runner::{text, PathRunner, RecordingInstaller, Registry, Vars};
use anyhow::Context as _;
use clap::builder::PossibleValuesParser;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use colored::Colorize;
use serde_yaml::Value;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

impl Verbosity {
    /// Default log filter for this verbosity, used when `RUST_LOG` is unset
    pub fn filter(self) -> &'static str {
        match self {
            Verbosity::Silent => "off",
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

/// CLI application
pub struct App {
    /// The clap command
    command: Command,
}

impl App {
    pub fn new() -> Self {
        App {
            command: build_command(),
        }
    }

    /// Run the application with the process arguments
    pub fn run(self) -> anyhow::Result<()> {
        self.run_from(std::env::args_os())
    }

    /// Run the application with the given arguments
    pub fn run_from<I, T>(mut self, args: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command.clone().get_matches_from(args);
        init_logging(get_verbosity(&matches));

        match matches.subcommand() {
            Some(("run", sub)) => run_assistant(sub),
            Some(("list", sub)) => list_assistants(sub),
            Some(("completions", sub)) => {
                if let Some(shell) = sub.get_one::<Shell>("shell").copied() {
                    let name = self.command.get_name().to_string();
                    clap_complete::generate(shell, &mut self.command, name, &mut io::stdout());
                }
                Ok(())
            }
            _ => {
                self.command.print_help()?;
                println!();
                Ok(())
            }
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the clap command
pub fn build_command() -> Command {
    let role = || {
        Arg::new("role")
            .value_name("ROLE")
            .value_parser(PossibleValuesParser::new(ASSISTANT_ROLES.iter().copied()))
    };

    Command::new("devassist")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run YAML assistants that create, prepare and modify projects")
        .arg(
            Arg::new("library")
                .short('l')
                .long("library")
                .value_name("DIR")
                .help("Assistant library root; may be given several times")
                .value_parser(value_parser!(PathBuf))
                .action(ArgAction::Append)
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print warnings and errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print commands and their output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("run")
                .about("Run an assistant")
                .arg(role().required(true))
                .arg(
                    Arg::new("path")
                        .value_name("ASSISTANT")
                        .help("Assistant and subassistant names, e.g. python django")
                        .required(true)
                        .num_args(1..),
                )
                .arg(
                    Arg::new("arg")
                        .short('a')
                        .long("arg")
                        .value_name("KEY=VALUE")
                        .help("Assistant argument")
                        .value_parser(parse_key_value)
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("env-file")
                        .long("env-file")
                        .value_name("FILE")
                        .help("Read assistant arguments from a dotenv file")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("directory")
                        .short('C')
                        .long("directory")
                        .value_name("DIR")
                        .help("Working directory for the run")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("no-deps")
                        .long("no-deps")
                        .help("Resolve dependencies but do not install them")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("list")
                .about("List available assistants")
                .arg(role()),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completions")
                .arg(
                    Arg::new("shell")
                        .value_name("SHELL")
                        .required(true)
                        .value_parser(value_parser!(Shell)),
                ),
        )
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Install the global subscriber; `RUST_LOG` takes precedence over verbosity
pub fn init_logging(verbosity: Verbosity) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .try_init();
}

/// Parse `KEY=VALUE`
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

/// Argument values: `true` and `false` are booleans, anything else is text
fn arg_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => text(other),
    }
}

/// Initial variables from `--env-file` and then `-a` pairs
fn collect_vars(matches: &ArgMatches) -> anyhow::Result<Vars> {
    let mut vars = Vars::new();

    if let Some(path) = matches.get_one::<PathBuf>("env-file") {
        let entries = dotenvy::from_path_iter(path)
            .with_context(|| format!("Failed to read env file {}", path.display()))?;
        for entry in entries {
            let (key, value) =
                entry.with_context(|| format!("Malformed env file {}", path.display()))?;
            vars.insert(key, arg_value(&value));
        }
    }

    if let Some(pairs) = matches.get_many::<(String, String)>("arg") {
        for (key, value) in pairs {
            vars.insert(key.clone(), arg_value(value));
        }
    }

    Ok(vars)
}

fn load_library(matches: &ArgMatches) -> anyhow::Result<Library> {
    let explicit: Vec<PathBuf> = matches
        .get_many::<PathBuf>("library")
        .map(|dirs| dirs.cloned().collect())
        .unwrap_or_default();

    let roots = find_library_roots(&explicit)?;
    tracing::debug!("Library roots: {:?}", roots);
    Library::load(&roots).context("Failed to load assistant library")
}

fn run_assistant(matches: &ArgMatches) -> anyhow::Result<()> {
    let role = matches
        .get_one::<String>("role")
        .context("missing assistant role")?;
    let path: Vec<String> = matches
        .get_many::<String>("path")
        .map(|names| names.cloned().collect())
        .unwrap_or_default();

    let library = Arc::new(load_library(matches)?);
    let registry = if matches.get_flag("no-deps") {
        Registry::with_installer(Arc::new(RecordingInstaller::new()))
    } else {
        Registry::with_defaults()
    };

    let mut runner = PathRunner::from_library(library, Arc::new(registry), role, path.as_slice())?;
    if let Some(dir) = matches.get_one::<PathBuf>("directory") {
        runner = runner.with_working_dir(dir.clone());
    }

    let vars = collect_vars(matches)?;
    runner
        .run(vars)
        .with_context(|| format!("Assistant '{} {}' failed", role, path.join(" ")))?;
    Ok(())
}

fn list_assistants(matches: &ArgMatches) -> anyhow::Result<()> {
    let library = load_library(matches)?;
    let roles: Vec<&str> = match matches.get_one::<String>("role") {
        Some(role) => vec![role.as_str()],
        None => library.roles().collect(),
    };

    print!("{}", format_listing(&library, &roles));
    Ok(())
}

/// Tree of assistants per role, one line per assistant
pub fn format_listing(library: &Library, roles: &[&str]) -> String {
    fn push_nodes(out: &mut String, nodes: &[AssistantNode], depth: usize) {
        for node in nodes {
            let assistant = &node.assistant;
            out.push_str(&format!(
                "{}{} - {}\n",
                "  ".repeat(depth),
                node.name().green(),
                assistant.description.as_deref().unwrap_or(&assistant.fullname)
            ));
            push_nodes(out, &node.children, depth + 1);
        }
    }

    let mut out = String::new();
    for role in roles {
        let nodes = library.assistants(role);
        if nodes.is_empty() {
            continue;
        }
        out.push_str(&format!("{}\n", role.bold()));
        push_nodes(&mut out, nodes, 1);
    }
    out
}

/// Run the CLI application with the process arguments
pub fn run() -> anyhow::Result<()> {
    App::new().run()
}
