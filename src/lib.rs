//! backspec: a consistency engine for declarative backend specifications.
//!
//! An operator assembles a backend-as-a-service project — NoSQL tables,
//! sign-in providers, REST APIs — as one hierarchical YAML document that a
//! cloud provisioning service later consumes. backspec owns the document's
//! tagged-variant model and the interactive editors that mutate it while
//! holding cross-feature invariants:
//!
//! - an API cannot require signed-in callers once no identity provider exists;
//! - table and index keys must reference indexable columns;
//! - REST paths must not collide, including through their `{proxy+}` siblings.
//!
//! # Lifecycle
//!
//! Every invocation loads the document once, runs exactly one workflow over an
//! in-memory working copy, and persists at most once. A declined confirmation
//! or any error discards the working copy: the on-disk document is never left
//! partially mutated.
//!
//! # Crate structure
//!
//! - [`core`]: document model (catalog, document), workflow engine (prompt,
//!   workflow), collaborator boundaries (render), and ambient plumbing
//!   (config, journal, output).
//! - [`features`]: the per-feature editors behind the registry contract.

pub mod core;
pub mod features;

mod cli;

use crate::cli::{Cli, Command};
use crate::core::config::ProjectConfig;
use crate::core::context::EditorContext;
use crate::core::document::{PersistOutcome, SpecificationDocument};
use crate::core::error::BackspecError;
use crate::core::journal;
use crate::core::output;
use crate::core::prompt::{ConsolePrompter, Prompter, ScriptedPrompter};
use crate::core::render::AnnouncingRenderer;
use crate::core::workflow::WorkflowOutcome;
use crate::features::registry;

use clap::Parser;
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

pub fn run() -> Result<(), BackspecError> {
    let cli = Cli::parse();
    let project_dir = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Command::Init { name, region } => run_init(&project_dir, name, region),
        Command::Show { format } => run_show(&project_dir, &format),
        Command::Features { format } => run_features(&project_dir, &format),
        Command::Configure { feature, answers } => run_configure(&project_dir, &feature, answers),
        Command::Journal { limit } => {
            let events = journal::read(&project_dir, limit)?;
            journal::render_text(&events);
            Ok(())
        }
    }
}

fn run_init(
    project_dir: &Path,
    name: Option<String>,
    region: Option<String>,
) -> Result<(), BackspecError> {
    let config = ProjectConfig::load(project_dir)?;
    let path = SpecificationDocument::document_path(project_dir);
    if path.exists() {
        return Err(BackspecError::ConstraintViolation(format!(
            "{} already exists",
            path.display()
        )));
    }
    let name = name.unwrap_or_else(|| {
        project_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "backend".to_string())
    });
    let region = region.unwrap_or_else(|| config.default_region().to_string());

    let document = SpecificationDocument::starter(&name, &region);
    let outcome = document.persist(project_dir)?;
    journal::record(
        project_dir,
        "init",
        "commit",
        json!({ "digest": outcome.digest() }),
    )?;
    output::ok(&format!("created project '{}' in {}", name, region));
    Ok(())
}

#[derive(Debug, Serialize)]
struct FeatureRow {
    name: &'static str,
    about: &'static str,
    configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

#[derive(Debug, Serialize)]
struct DocumentSummary {
    name: String,
    region: String,
    features: Vec<FeatureRow>,
}

fn feature_rows(document: Option<&SpecificationDocument>) -> Vec<FeatureRow> {
    registry::FEATURES
        .iter()
        .map(|module| {
            let configured = document
                .map(|doc| registry::configured(module, doc))
                .unwrap_or(false);
            let detail = document
                .filter(|_| configured)
                .and_then(|doc| module.summarize.and_then(|summarize| summarize(doc)));
            FeatureRow {
                name: module.name,
                about: module.about,
                configured,
                detail,
            }
        })
        .collect()
}

fn run_show(project_dir: &Path, format: &str) -> Result<(), BackspecError> {
    let document = SpecificationDocument::load(project_dir)?;
    let summary = DocumentSummary {
        name: document.name.clone(),
        region: document.region.clone(),
        features: feature_rows(Some(&document)),
    };
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!("project: {}", summary.name);
    println!("region:  {}", summary.region);
    for row in &summary.features {
        match (&row.configured, &row.detail) {
            (true, Some(detail)) => println!("  {:<12} {}", row.name, detail),
            (true, None) => println!("  {:<12} configured", row.name),
            _ => println!("  {:<12} -", row.name),
        }
    }
    Ok(())
}

fn run_features(project_dir: &Path, format: &str) -> Result<(), BackspecError> {
    let document = match SpecificationDocument::load(project_dir) {
        Ok(document) => Some(document),
        Err(BackspecError::NotFound(_)) => None,
        Err(err) => return Err(err),
    };
    let rows = feature_rows(document.as_ref());
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    for row in &rows {
        let status = if row.configured { "configured" } else { "absent" };
        println!("{:<12} {:<11} {}", row.name, status, row.about);
    }
    Ok(())
}

fn run_configure(
    project_dir: &Path,
    feature: &str,
    answers: Option<PathBuf>,
) -> Result<(), BackspecError> {
    let Some(module) = registry::lookup(feature) else {
        return Err(BackspecError::NotFound(format!(
            "unknown feature '{}'",
            feature
        )));
    };
    let Some(configure) = module.configure else {
        output::notice(&format!(
            "feature '{}' has no interactive editor; nothing to do",
            module.name
        ));
        return Ok(());
    };

    let config = ProjectConfig::load(project_dir)?;
    let document = SpecificationDocument::load(project_dir)?;

    let mut prompter: Box<dyn Prompter> = match answers {
        Some(path) => {
            let raw = fs::read_to_string(&path)?;
            let values: Vec<serde_json::Value> = serde_json::from_str(&raw)?;
            Box::new(ScriptedPrompter::from_values(&values)?)
        }
        None => Box::new(ConsolePrompter),
    };
    let mut renderer = AnnouncingRenderer;
    let mut ctx = EditorContext {
        project_dir: project_dir.to_path_buf(),
        config,
        document,
        prompter: prompter.as_mut(),
        renderer: &mut renderer,
    };

    let op = format!("configure.{}", module.name);
    match configure(&mut ctx) {
        Ok(WorkflowOutcome::Committed) => {
            let outcome = ctx.document.persist(&ctx.project_dir)?;
            let status = match &outcome {
                PersistOutcome::Written { .. } => "commit",
                PersistOutcome::Unchanged { .. } => "unchanged",
            };
            journal::record(project_dir, &op, status, json!({ "digest": outcome.digest() }))?;
            match outcome {
                PersistOutcome::Written { .. } => output::ok("project document updated"),
                PersistOutcome::Unchanged { .. } => output::notice("no changes to write"),
            }
            Ok(())
        }
        Ok(WorkflowOutcome::Declined) => {
            journal::record(project_dir, &op, "decline", json!({}))?;
            output::notice("nothing written");
            Ok(())
        }
        Err(err) => {
            // Journal best-effort; the original error is the one that matters.
            let _ = journal::record(
                project_dir,
                &op,
                "error",
                json!({ "message": err.to_string() }),
            );
            Err(err)
        }
    }
}
