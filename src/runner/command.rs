//! Shell command execution
//!
//! This module runs `cl*` commands through the context's interpreter, capturing
//! stdout and stderr together so the output keeps its original ordering.

use crate::config::project_dir;
use crate::error::ExecutionError;
use crate::runner::{text, Command, CommandRunner, Context};
use serde_yaml::Value;
use std::io::{BufRead, BufReader};
use std::process::{Command as StdCommand, Stdio};
use tracing::Level;

/// How a shell command is logged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellOptions {
    /// Level for the command line and its output
    pub level: Level,

    /// Whether a failure is logged as an error
    pub log_error: bool,
}

impl ShellOptions {
    /// Options encoded in a `cl` tag: `i` logs at INFO, `n` skips error logging
    pub fn from_tag(tag: &str) -> Self {
        let flags = tag.strip_prefix("cl").unwrap_or(tag);
        ShellOptions {
            level: if flags.contains('i') {
                Level::INFO
            } else {
                Level::DEBUG
            },
            log_error: !flags.contains('n'),
        }
    }

    /// DEBUG output and no error logging, as used by `$(...)` expressions
    pub fn quiet() -> Self {
        ShellOptions {
            level: Level::DEBUG,
            log_error: false,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self::from_tag("cl")
    }
}

/// Emit a message at a level chosen at run time
pub fn log_at(level: Level, message: &str) {
    match level {
        Level::ERROR => tracing::error!("{}", message),
        Level::WARN => tracing::warn!("{}", message),
        Level::INFO => tracing::info!("{}", message),
        Level::DEBUG => tracing::debug!("{}", message),
        Level::TRACE => tracing::trace!("{}", message),
    }
}

/// Wrap a command so it runs inside the given software collections
pub fn wrap_scls(command: &str, scls: &[String]) -> String {
    if scls.is_empty() {
        return command.to_string();
    }
    format!(
        "scl {} - << DA_SCL_EOF\n {}\nDA_SCL_EOF",
        scls.join(" "),
        command
    )
}

/// Run an already formatted command line
///
/// Returns the trimmed combined output. A non-zero exit, or a failure to start
/// the interpreter, is a `CommandFailed` error carrying the output captured so
/// far, which is empty when nothing was spawned. `cd <dir>` changes the
/// context's working directory instead of spawning.
pub fn run_shell(command: &str, ctx: &mut Context, options: ShellOptions) -> crate::Result<String> {
    if let Some(dir) = command.trim().strip_prefix("cd ") {
        return change_dir(dir.trim(), ctx, options);
    }

    let script = wrap_scls(command, &ctx.flat_scls());
    log_at(options.level, &format!("$ {}", command));

    let failed = |code: Option<i32>, output: String| ExecutionError::CommandFailed {
        command: command.to_string(),
        code,
        output,
    };

    let not_started = |reason: String| {
        if options.log_error {
            tracing::error!("Couldn't run '{}': {}", command, reason);
        } else {
            tracing::debug!("Couldn't run '{}': {}", command, reason);
        }
        failed(None, String::new())
    };

    let (program, args) = ctx
        .interpreter
        .split_first()
        .ok_or_else(|| not_started("no interpreter configured".to_string()))?;

    let mut child = StdCommand::new(program)
        .args(args)
        .arg(format!("exec 2>&1\n{}", script))
        .current_dir(&ctx.working_dir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| not_started(format!("{}: {}", program, e)))?;

    let mut lines = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                    log_at(options.level, &line);
                    lines.push(line);
                }
            }
        }
    }

    let output = lines.join("\n").trim().to_string();
    let status = child.wait().map_err(|e| {
        tracing::error!("Couldn't wait for '{}': {}", command, e);
        failed(None, output.clone())
    })?;

    if !status.success() {
        if options.log_error {
            tracing::error!("Command '{}' failed with exit code {:?}", command, status.code());
        }
        return Err(failed(status.code(), output).into());
    }

    Ok(output)
}

fn change_dir(dir: &str, ctx: &mut Context, options: ShellOptions) -> crate::Result<String> {
    let target = project_dir(dir, &ctx.working_dir);
    if !target.is_dir() {
        let output = format!("cd: no such directory: {}", target.display());
        if options.log_error {
            tracing::error!("{}", output);
        }
        return Err(ExecutionError::CommandFailed {
            command: format!("cd {}", dir),
            code: None,
            output,
        }
        .into());
    }

    log_at(options.level, &format!("$ cd {}", target.display()));
    ctx.working_dir = target;
    Ok(String::new())
}

/// Runner for `cl`, `cl_i`, `cl_n` and `cl_in`
pub struct ClRunner;

impl CommandRunner for ClRunner {
    fn name(&self) -> &'static str {
        "cl"
    }

    fn matches(&self, command: &Command) -> bool {
        command.comm_type.starts_with("cl")
    }

    fn run(&self, command: &Command, ctx: &mut Context) -> crate::Result<Value> {
        let line = command.format_str(ctx)?;
        let options = ShellOptions::from_tag(&command.comm_type);
        Ok(text(run_shell(&line, ctx, options)?))
    }
}
