//! `github` command: push a freshly created project to GitHub

use crate::error::ExecutionError;
use crate::runner::{render, run_shell, Command, CommandRunner, Context, ShellOptions};
use serde_yaml::Value;
use std::env;
use std::path::Path;
use tracing::Level;

/// Runner for `github: create_repo | push | create_and_push`
pub struct GitHubRunner;

impl GitHubRunner {
    /// GitHub login: the `github` variable, else the system user name
    pub fn login(ctx: &Context) -> Option<String> {
        ctx.get_var("github")
            .map(render)
            .filter(|login| !login.is_empty())
            .or_else(|| env::var("USER").ok())
            .or_else(|| env::var("USERNAME").ok())
    }

    /// Repository name: base name of the `name` variable, which may be a path
    pub fn repo_name(ctx: &Context) -> crate::Result<String> {
        let name = ctx
            .get_var("name")
            .map(render)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ExecutionError::MissingArgument("name".to_string()))?;

        Ok(Path::new(&name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or(name))
    }

    /// Remote URL; a login that differs from the system user goes through a
    /// `github.com-<login>` ssh host alias
    pub fn remote_url(login: &str, repo: &str) -> String {
        let system_user = env::var("USER").unwrap_or_default();
        let dash_login = if system_user == login {
            String::new()
        } else {
            format!("-{}", login)
        };
        format!("git@github.com{}:{}/{}.git", dash_login, login, repo)
    }

    fn push(ctx: &mut Context) -> crate::Result<()> {
        let login = Self::login(ctx)
            .ok_or_else(|| ExecutionError::MissingArgument("github".to_string()))?;
        let repo = Self::repo_name(ctx)?;
        let info = ShellOptions::default().with_level(Level::INFO);

        run_shell(
            &format!("git remote add origin {}", Self::remote_url(&login, &repo)),
            ctx,
            info,
        )?;
        run_shell("git remote show origin", ctx, ShellOptions::default())?;
        run_shell("git push -u origin master", ctx, info)?;
        Ok(())
    }

    fn create_repo(ctx: &Context) -> crate::Result<()> {
        let repo = Self::repo_name(ctx)?;
        tracing::warn!(
            "Creating GitHub repository '{}' needs an authenticated API client, skipping",
            repo
        );
        Ok(())
    }
}

impl CommandRunner for GitHubRunner {
    fn name(&self) -> &'static str {
        "github"
    }

    fn matches(&self, command: &Command) -> bool {
        command.comm_type == "github"
    }

    fn run(&self, command: &Command, ctx: &mut Context) -> crate::Result<Value> {
        match command.format_str(ctx)?.trim() {
            "create_repo" => Self::create_repo(ctx)?,
            "push" => Self::push(ctx)?,
            "create_and_push" => {
                let repo = Self::repo_name(ctx)?;
                tracing::info!("Registering your project on GitHub as {}...", repo);
                Self::create_repo(ctx)?;
                tracing::info!("Pushing your project to the GitHub repository...");
                Self::push(ctx)?;
            }
            other => tracing::warn!("Unknown github command '{}', skipping", other),
        }
        Ok(Value::Null)
    }
}
