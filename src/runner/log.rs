//! `log_*` commands

use crate::error::ExecutionError;
use crate::runner::{log_at, Command, CommandRunner, Context};
use serde_yaml::Value;
use tracing::Level;

/// Runner for `log_d`, `log_i`, `log_w`, `log_e` and `log_c`
///
/// `log_e` and `log_c` fail the run after logging.
pub struct LogRunner;

impl LogRunner {
    /// Level and whether the run is aborted, by tag suffix
    pub fn level(tag: &str) -> Option<(Level, bool)> {
        match tag.strip_prefix("log_")? {
            "d" => Some((Level::DEBUG, false)),
            "i" => Some((Level::INFO, false)),
            "w" => Some((Level::WARN, false)),
            "e" | "c" => Some((Level::ERROR, true)),
            _ => None,
        }
    }
}

impl CommandRunner for LogRunner {
    fn name(&self) -> &'static str {
        "log"
    }

    fn matches(&self, command: &Command) -> bool {
        command.comm_type.starts_with("log_")
    }

    fn run(&self, command: &Command, ctx: &mut Context) -> crate::Result<Value> {
        let message = command.format_str(ctx)?;
        match Self::level(&command.comm_type) {
            Some((level, fatal)) => {
                log_at(level, &message);
                if fatal {
                    return Err(ExecutionError::Logged(message).into());
                }
            }
            None => tracing::warn!(
                "Unknown logging command '{}' with message '{}'",
                command.comm_type,
                message
            ),
        }
        Ok(Value::Null)
    }
}
