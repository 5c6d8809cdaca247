use colored::Colorize;
use devassist::error::command_output;
use devassist::DevassistError;
use std::process;

fn main() {
    if let Err(e) = devassist::cli::run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        if let Some(output) = e.downcast_ref::<DevassistError>().and_then(command_output) {
            if !output.is_empty() {
                eprintln!("{}", output);
            }
        }
        process::exit(1);
    }
}
