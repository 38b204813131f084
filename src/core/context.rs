//! Editor context threaded through every workflow entry point.
//!
//! There is no module-level "current project" pointer: everything an editor
//! may touch — the working document, project config, the Prompter, the
//! template renderer — travels in one explicit value.

use crate::core::config::ProjectConfig;
use crate::core::document::SpecificationDocument;
use crate::core::prompt::Prompter;
use crate::core::render::TemplateRenderer;
use std::path::PathBuf;

pub struct EditorContext<'a> {
    pub project_dir: PathBuf,
    pub config: ProjectConfig,
    /// Working copy; mutated in memory only. The dispatch layer persists it
    /// once, and only for a `Committed` outcome.
    pub document: SpecificationDocument,
    pub prompter: &'a mut dyn Prompter,
    pub renderer: &'a mut dyn TemplateRenderer,
}
