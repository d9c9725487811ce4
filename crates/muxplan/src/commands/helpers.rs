//! Shared plumbing for the spec commands: argument resolution and the
//! load -> policy -> build -> compile pipeline.

use std::path::{Path, PathBuf};

use clap::ArgMatches;
use tracing::info;

use muxplan_core::plan::BuildOptions;
use muxplan_core::spec::sanitize_name;
use muxplan_core::subst::expand_user;
use muxplan_core::{build_from_spec, compile, load_file, Compiled, Policy};

use crate::config;

pub(crate) struct CompiledSpec {
    pub spec_path: PathBuf,
    pub session_name: String,
    pub compiled: Compiled,
}

/// Resolve arguments, load the spec, enforce policy, and compile.
pub(crate) fn compile_from_matches(
    matches: &ArgMatches,
) -> Result<CompiledSpec, Box<dyn std::error::Error>> {
    let spec_arg = matches
        .get_one::<String>("spec")
        .ok_or("Spec path argument is required")?;

    let spec_path = absolutize(Path::new(&expand_user(spec_arg)));
    let metadata = std::fs::metadata(&spec_path)
        .map_err(|e| format!("Cannot read spec '{}': {}", spec_path.display(), e))?;
    if metadata.is_dir() {
        return Err(format!("Spec path is a directory: {}", spec_path.display()).into());
    }

    let spec = load_file(&spec_path)?;

    let project_path = match matches.get_one::<String>("project") {
        Some(dir) => absolutize(Path::new(&expand_user(dir))),
        None => spec_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let project_name = project_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let policy = policy_from_matches(matches)?;
    spec.validate_policy(&policy)?;

    // Session precedence: flag > spec session.name > sanitized project name.
    let session_name = matches
        .get_one::<String>("session")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            let name = spec.session.name.trim();
            if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            }
        })
        .unwrap_or_else(|| sanitize_name(&project_name));

    info!(
        event = "cli.compile_started",
        spec = %spec_path.display(),
        session = session_name.as_str()
    );

    let (context, plan, _) = build_from_spec(
        &spec,
        BuildOptions {
            project_root: project_path.display().to_string(),
            project_name,
            session_name: session_name.clone(),
            prefer_windows: true,
            include_ensure_session: matches.get_flag("ensure-session"),
            policy: policy.clone(),
        },
    )?;

    let compiled = compile(&context, &policy, &plan)?;

    info!(
        event = "cli.compile_completed",
        commands = compiled.commands.len(),
        unsafe_used = compiled.unsafe_used
    );

    Ok(CompiledSpec {
        spec_path,
        session_name,
        compiled,
    })
}

fn policy_from_matches(matches: &ArgMatches) -> Result<Policy, config::ConfigError> {
    let mut policy = config::policy_from_env()?;
    // Flags only widen; absence leaves the env/default value in place.
    if matches.get_flag("allow-shell") {
        policy.allow_shell = true;
    }
    if matches.get_flag("allow-tmux-passthrough") {
        policy.allow_tmux_passthrough = true;
    }
    Ok(policy)
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
