// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! drover: workflow dispatcher CLI.
//!
//! Thin edge over the engine crates: pick a workflow id, pass initial
//! context, exit 0 on success and 1 otherwise.

use anyhow::Context;
use clap::{Parser, Subcommand};
use drover_core::CoreConfig;
use drover_engine::{binding, EngineBuilder, IssueSeverity, OperationRegistry};
use drover_library::ContainerLibrary;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "drover", about = "Browser-automation workflow dispatcher")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = "drover.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a workflow by id
    Run {
        /// Workflow id to run
        workflow: String,
        /// JSON file holding workflow definitions to register first
        #[arg(long)]
        workflow_file: Vec<PathBuf>,
        /// Initial context entries, `key=value`
        #[arg(long = "var", value_parser = parse_key_val)]
        vars: Vec<(String, String)>,
        /// Browser profile/session id to seed as `$profile`
        #[arg(long)]
        profile: Option<String>,
    },
    /// Container library maintenance
    Library {
        #[command(subcommand)]
        command: LibraryCommand,
    },
}

#[derive(Subcommand)]
enum LibraryCommand {
    /// Load the library and check every container's declared operations
    Validate,
    /// Print the library content hash
    Hash,
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {raw}"))
}

fn load_config(path: &PathBuf) -> anyhow::Result<CoreConfig> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    Ok(CoreConfig::from_toml_str(&body)?)
}

async fn run_workflow(
    config: CoreConfig,
    workflow: &str,
    workflow_files: &[PathBuf],
    vars: &[(String, String)],
    profile: Option<&str>,
) -> anyhow::Result<bool> {
    let engine = EngineBuilder::new(config)
        .source("drover-cli")
        .connect()
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    engine.announce_library().await;

    for path in workflow_files {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("reading workflow file {}", path.display()))?;
        let id = engine
            .workflows
            .register_json(&body)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        tracing::info!(%id, file = %path.display(), "workflow registered");
    }

    let mut initial = serde_json::Map::new();
    for (key, value) in vars {
        initial.insert(key.clone(), Value::String(value.clone()));
    }
    if let Some(profile) = profile {
        initial.insert("profile".into(), Value::String(profile.to_string()));
    }

    let result = engine
        .executor
        .run_workflow_by_id(workflow, initial)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    if result.success {
        println!("workflow {workflow} succeeded (run {})", result.run_id);
    } else {
        let step = result.failed_at.map_or(String::from("?"), |i| i.to_string());
        let error = result
            .error
            .map_or(String::from("unknown error"), |e| e.to_string());
        eprintln!("workflow {workflow} failed at step {step}: {error}");
    }
    Ok(result.success)
}

fn validate_library(config: &CoreConfig) -> anyhow::Result<bool> {
    let library = ContainerLibrary::new(config.library_root.clone());
    let snapshot = library.load().map_err(|e| anyhow::anyhow!("{e}"))?;

    let registry = OperationRegistry::new();
    registry.ensure_builtin();

    let mut errors = 0usize;
    let ids: Vec<String> = snapshot.ids().map(str::to_string).collect();
    for id in ids {
        let Some(def) = snapshot.get(&id) else { continue };
        for issue in binding::validate_container_operations(&def, &registry) {
            match issue.severity {
                IssueSeverity::Error => {
                    errors += 1;
                    eprintln!("error: {id}: {}", issue.message);
                }
                IssueSeverity::Warning => eprintln!("warning: {id}: {}", issue.message),
            }
        }
    }

    if errors == 0 {
        println!("{} containers ok (hash {})", snapshot.len(), drover_core::short(snapshot.hash(), 12));
    }
    Ok(errors == 0)
}

fn library_hash(config: &CoreConfig) -> anyhow::Result<()> {
    let library = ContainerLibrary::new(config.library_root.clone());
    let snapshot = library.load().map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("{}", snapshot.hash());
    Ok(())
}

async fn dispatch(cli: Cli) -> anyhow::Result<bool> {
    let config = load_config(&cli.config)?;
    match &cli.command {
        Command::Run { workflow, workflow_file, vars, profile } => {
            run_workflow(config, workflow, workflow_file, vars, profile.as_deref()).await
        }
        Command::Library { command } => match command {
            LibraryCommand::Validate => validate_library(&config),
            LibraryCommand::Hash => {
                library_hash(&config)?;
                Ok(true)
            }
        },
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(dispatch(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_key_val_splits_on_first_equals() {
        assert_eq!(
            parse_key_val("keyword=手机壳").unwrap(),
            ("keyword".to_string(), "手机壳".to_string())
        );
        assert_eq!(
            parse_key_val("a=b=c").unwrap(),
            ("a".to_string(), "b=c".to_string())
        );
        assert!(parse_key_val("no-equals").is_err());
    }
}
