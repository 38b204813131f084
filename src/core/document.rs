//! The project document: one load, in-memory mutation, at most one persist.
//!
//! The root of `backend-project.yml` is a `Project` node whose `features`
//! mapping is the only field the editors mutate; `name`, `region`, `uploads`
//! and `sharedComponents` round-trip verbatim. Persistence is all-or-nothing:
//! the whole document is rendered, the previous bytes are backed up under
//! `.backspec/backup/`, and the new content lands via temp-file + rename.
//! A write whose rendered bytes match the on-disk file is skipped entirely.

use crate::core::catalog::{self, FeatureKind, FeatureNode, Node, NodeMap};
use crate::core::error::BackspecError;
use crate::core::time;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the project document inside the project directory.
pub const DOCUMENT_FILENAME: &str = "backend-project.yml";

/// State directory holding config, journal and backups.
pub const STATE_DIR: &str = ".backspec";

#[derive(Debug, Clone, PartialEq)]
pub struct SpecificationDocument {
    pub name: String,
    pub region: String,
    uploads: Node,
    shared_components: Node,
    features: NodeMap,
}

/// Result of a persist call.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistOutcome {
    /// Document bytes changed; previous content was backed up first.
    Written { digest: String },
    /// Rendered bytes matched the on-disk file; nothing was touched.
    Unchanged { digest: String },
}

impl PersistOutcome {
    pub fn digest(&self) -> &str {
        match self {
            PersistOutcome::Written { digest } | PersistOutcome::Unchanged { digest } => digest,
        }
    }
}

impl SpecificationDocument {
    /// Fresh document with no features configured.
    pub fn starter(name: &str, region: &str) -> Self {
        SpecificationDocument {
            name: name.to_string(),
            region: region.to_string(),
            uploads: Node::empty_sequence(),
            shared_components: Node::empty_mapping(),
            features: NodeMap::new(),
        }
    }

    /// Dress a decoded root node. The root must be a `Project` feature.
    pub fn from_node(root: &Node) -> Result<Self, BackspecError> {
        let Some(project) = root.as_feature().filter(|f| f.kind == FeatureKind::Project) else {
            return Err(BackspecError::DiscriminatorError(
                "document root must be a Project node".to_string(),
            ));
        };
        let features = match project.fields.get("features") {
            Some(Node::Mapping(map)) => map.clone(),
            Some(_) => {
                return Err(BackspecError::ValidationError(
                    "'features' must be a mapping".to_string(),
                ));
            }
            None => NodeMap::new(),
        };
        Ok(SpecificationDocument {
            name: project
                .fields
                .get("name")
                .and_then(Node::as_str)
                .unwrap_or_default()
                .to_string(),
            region: project
                .fields
                .get("region")
                .and_then(Node::as_str)
                .unwrap_or_default()
                .to_string(),
            uploads: project
                .fields
                .get("uploads")
                .cloned()
                .unwrap_or_else(Node::empty_sequence),
            shared_components: project
                .fields
                .get("sharedComponents")
                .cloned()
                .unwrap_or_else(Node::empty_mapping),
            features,
        })
    }

    /// Trim back into the typed tree rooted at a `Project` node.
    pub fn to_node(&self) -> Node {
        let mut project = FeatureNode::new(FeatureKind::Project);
        project
            .fields
            .insert("features", Node::Mapping(self.features.clone()));
        project.fields.insert("name", Node::str(&self.name));
        project.fields.insert("region", Node::str(&self.region));
        project.fields.insert("uploads", self.uploads.clone());
        project
            .fields
            .insert("sharedComponents", self.shared_components.clone());
        Node::Feature(project)
    }

    pub fn document_path(project_dir: &Path) -> PathBuf {
        project_dir.join(DOCUMENT_FILENAME)
    }

    /// Read and decode the document. Missing file is `NotFound`.
    pub fn load(project_dir: &Path) -> Result<Self, BackspecError> {
        let path = Self::document_path(project_dir);
        if !path.exists() {
            return Err(BackspecError::NotFound(format!(
                "no {} in {}",
                DOCUMENT_FILENAME,
                project_dir.display()
            )));
        }
        let raw = fs::read_to_string(&path)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&raw)?;
        Self::from_node(&catalog::decode(&value)?)
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureNode> {
        self.features.get(name).and_then(Node::as_feature)
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.features.keys()
    }

    pub fn set_feature(&mut self, name: &str, node: FeatureNode) {
        self.features.insert(name, Node::Feature(node));
    }

    pub fn remove_feature(&mut self, name: &str) -> bool {
        self.features.remove(name).is_some()
    }

    pub fn to_yaml_string(&self) -> Result<String, BackspecError> {
        Ok(serde_yaml::to_string(&catalog::encode(&self.to_node()))?)
    }

    /// Digest of the rendered document, as journaled on every outcome.
    pub fn digest(&self) -> Result<String, BackspecError> {
        Ok(content_digest(self.to_yaml_string()?.as_bytes()))
    }

    /// Render and write the document, backing up previous content first.
    pub fn persist(&self, project_dir: &Path) -> Result<PersistOutcome, BackspecError> {
        let rendered = self.to_yaml_string()?;
        let digest = content_digest(rendered.as_bytes());
        let path = Self::document_path(project_dir);

        if path.exists() {
            let existing = fs::read(&path)?;
            if existing == rendered.as_bytes() {
                return Ok(PersistOutcome::Unchanged { digest });
            }
            let backup_dir = project_dir.join(STATE_DIR).join("backup");
            fs::create_dir_all(&backup_dir)?;
            fs::write(
                backup_dir.join(format!("{}.yml", time::new_event_id())),
                existing,
            )?;
        }

        let tmp = project_dir.join(format!(".{}.tmp", DOCUMENT_FILENAME));
        fs::write(&tmp, rendered.as_bytes())?;
        fs::rename(&tmp, &path)?;
        Ok(PersistOutcome::Written { digest })
    }
}

/// Hex sha256 of document bytes; used for change detection and journaling.
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
