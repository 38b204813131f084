//! Feature registry — the uniform dispatch table over feature editors.
//!
//! Adding a feature: append one entry to `FEATURES`. Features without a
//! configure entry (hosting, storage, analytics) are listed but dispatch to a
//! documented no-op: the CLI prints a notice and exits cleanly.

use crate::core::catalog::FeatureKind;
use crate::core::context::EditorContext;
use crate::core::document::SpecificationDocument;
use crate::core::error::BackspecError;
use crate::core::workflow::WorkflowOutcome;
use crate::features::{cloudapi, database, signin};

pub type ConfigureFn = fn(&mut EditorContext) -> Result<WorkflowOutcome, BackspecError>;
pub type SummarizeFn = fn(&SpecificationDocument) -> Option<String>;

pub struct FeatureModule {
    /// Key inside the document's `features` mapping and on the CLI.
    pub name: &'static str,
    pub kind: FeatureKind,
    pub about: &'static str,
    /// Interactive editor entry point; `None` means "recognized, not
    /// configurable here".
    pub configure: Option<ConfigureFn>,
    pub summarize: Option<SummarizeFn>,
}

pub const FEATURES: &[FeatureModule] = &[
    FeatureModule {
        name: database::FEATURE_NAME,
        kind: FeatureKind::Database,
        about: "NoSQL tables, keys and indexes",
        configure: Some(database::configure),
        summarize: Some(database::summarize),
    },
    FeatureModule {
        name: signin::FEATURE_NAME,
        kind: FeatureKind::SignIn,
        about: "Sign-in providers and password policy",
        configure: Some(signin::configure),
        summarize: Some(signin::summarize),
    },
    FeatureModule {
        name: cloudapi::FEATURE_NAME,
        kind: FeatureKind::CloudLogic,
        about: "REST APIs and their handler functions",
        configure: Some(cloudapi::configure),
        summarize: Some(cloudapi::summarize),
    },
    FeatureModule {
        name: "hosting",
        kind: FeatureKind::ContentDelivery,
        about: "Static content delivery",
        configure: None,
        summarize: None,
    },
    FeatureModule {
        name: "user-files",
        kind: FeatureKind::UserFiles,
        about: "Per-user file storage",
        configure: None,
        summarize: None,
    },
    FeatureModule {
        name: "analytics",
        kind: FeatureKind::Pinpoint,
        about: "Usage analytics",
        configure: None,
        summarize: None,
    },
];

/// Explicit optional lookup; absence is a normal outcome, not an error.
pub fn lookup(name: &str) -> Option<&'static FeatureModule> {
    FEATURES.iter().find(|module| module.name == name)
}

/// Whether the loaded document carries this feature.
pub fn configured(module: &FeatureModule, doc: &SpecificationDocument) -> bool {
    doc.feature(module.name).is_some()
}
