//! Code Template Renderer collaborator boundary.
//!
//! The engine computes template inputs only: a template id, a target folder
//! name, and a flat token map. Substitution and file I/O belong to whoever
//! implements [`TemplateRenderer`].

use crate::core::error::BackspecError;
use crate::core::output;
use std::collections::BTreeMap;

/// Computed inputs for one template expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRequest {
    pub template_id: String,
    /// Folder the rendered sources land in, relative to the project.
    pub target_folder: String,
    pub tokens: BTreeMap<String, String>,
}

impl TemplateRequest {
    pub fn token(&self, name: &str) -> Option<&str> {
        self.tokens.get(name).map(String::as_str)
    }
}

pub trait TemplateRenderer {
    fn render(&mut self, request: &TemplateRequest) -> Result<(), BackspecError>;
}

/// CLI default: announce the computed inputs and do nothing else.
pub struct AnnouncingRenderer;

impl TemplateRenderer for AnnouncingRenderer {
    fn render(&mut self, request: &TemplateRequest) -> Result<(), BackspecError> {
        output::notice(&format!(
            "template '{}' queued for {} ({} tokens)",
            request.template_id,
            request.target_folder,
            request.tokens.len()
        ));
        Ok(())
    }
}

/// Test double that records every request it receives.
#[derive(Default)]
pub struct RecordingRenderer {
    pub requests: Vec<TemplateRequest>,
}

impl TemplateRenderer for RecordingRenderer {
    fn render(&mut self, request: &TemplateRequest) -> Result<(), BackspecError> {
        self.requests.push(request.clone());
        Ok(())
    }
}
