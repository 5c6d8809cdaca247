//! `dda_*` commands: project marker create, read, dependencies and run

use crate::config::{project_dir, ProjectMarker, Section, CREATOR_ROLE};
use crate::error::SyntaxError;
use crate::runner::{
    assistant_dependencies, dependencies_section, install_resolved, render, run_section, Command,
    CommandRunner, Context, SectionKind, Vars,
};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Variable holding the n-th element of the invoked assistant path
pub fn subassistant_var(n: usize) -> String {
    format!("subassistant_{}", n)
}

/// The invoked assistant path, read from `subassistant_0`, `subassistant_1`, ...
pub fn subassistant_path(vars: &Vars) -> Vec<String> {
    (0..)
        .map_while(|i| vars.get(&subassistant_var(i)))
        .map(render)
        .collect()
}

/// Runner for `dda_c`, `dda_r`, `dda_dependencies` and `dda_run`
pub struct MarkerRunner;

impl MarkerRunner {
    fn create(dir: &Path, ctx: &Context) -> crate::Result<Value> {
        let original_kwargs: BTreeMap<String, Value> = ctx
            .assistant
            .args
            .keys()
            .filter_map(|name| ctx.get_var(name).map(|v| (name.clone(), v.clone())))
            .collect();

        let marker = ProjectMarker::new(subassistant_path(&ctx.vars), original_kwargs);
        let path = marker.write_to(dir)?;
        tracing::debug!("Wrote {}", path.display());
        Ok(Value::Null)
    }

    fn read(dir: &Path) -> crate::Result<ProjectMarker> {
        ProjectMarker::read_from(dir).map_err(|e| {
            tracing::error!("{}", e);
            e.into()
        })
    }

    fn dependencies(dir: &Path, ctx: &mut Context) -> crate::Result<Value> {
        let marker = Self::read(dir)?;
        let mut deps = Vec::new();

        if !marker.subassistant_path.is_empty() {
            match ctx.library.chain(CREATOR_ROLE, marker.subassistant_path.as_slice()) {
                Ok(chain) => {
                    let original: Vars = marker.original_kwargs.clone().into_iter().collect();
                    let scoped = ctx.fork(SectionKind::Dependencies).with_vars(original);
                    for assistant in &chain {
                        deps.extend(assistant_dependencies(assistant, &scoped)?);
                    }
                }
                Err(e) => tracing::warn!("{}", e),
            }
        }

        let extra = Section::from_value(&marker.extra_value("dependencies"))
            .map_err(|e| SyntaxError::InvalidSection(format!("marker dependencies: {}", e)))?;
        let mut scoped = ctx.fork(SectionKind::Dependencies);
        deps.extend(dependencies_section(&extra, &mut scoped)?);

        install_resolved(&deps, ctx)?;
        Ok(Value::Null)
    }

    fn run_marker_section(dir: &Path, ctx: &mut Context) -> crate::Result<Value> {
        let marker = Self::read(dir)?;
        let section = Section::from_value(&marker.extra_value("run"))
            .map_err(|e| SyntaxError::InvalidSection(format!("marker run: {}", e)))?;
        run_section(&section, &mut ctx.fork(SectionKind::Run))?;
        Ok(Value::Null)
    }
}

impl CommandRunner for MarkerRunner {
    fn name(&self) -> &'static str {
        "dda"
    }

    fn matches(&self, command: &Command) -> bool {
        command.comm_type.starts_with("dda_")
    }

    fn run(&self, command: &Command, ctx: &mut Context) -> crate::Result<Value> {
        let dir = project_dir(command.format_str(ctx)?.trim(), &ctx.working_dir);

        match command.comm_type.as_str() {
            "dda_c" => Self::create(&dir, ctx),
            "dda_r" => Ok(Value::Mapping(Self::read(&dir)?.to_mapping(&dir)?)),
            "dda_dependencies" => Self::dependencies(&dir, ctx),
            "dda_run" => Self::run_marker_section(&dir, ctx),
            other => {
                tracing::warn!("Unknown .devassistant command '{}', skipping", other);
                Ok(Value::Null)
            }
        }
    }
}
