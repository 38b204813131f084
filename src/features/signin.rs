//! Sign-in provider editor.
//!
//! The invariant `enabled == providers is non-empty` is re-derived on every
//! commit, whatever the triggering action was. Disabling sign-in (or its last
//! remaining provider) while APIs require signed-in callers cascades into the
//! REST layer: the operator must confirm clearing that requirement on every
//! API, and declining aborts the whole operation with nothing written.

use crate::core::catalog::{FeatureKind, FeatureNode, Node, NodeMap};
use crate::core::context::EditorContext;
use crate::core::document::SpecificationDocument;
use crate::core::error::BackspecError;
use crate::core::output;
use crate::core::prompt::{Answer, Prompter, Question};
use crate::core::workflow::{self, WorkflowOutcome, check};
use crate::features::cloudapi;

pub const FEATURE_NAME: &str = "sign-in";

pub const ALIAS_EMAIL: &str = "email";
pub const ALIAS_PHONE: &str = "phone_number";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    UserDirectory,
    Facebook,
    Google,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::UserDirectory,
        ProviderKind::Facebook,
        ProviderKind::Google,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::UserDirectory => "Managed user directory",
            ProviderKind::Facebook => "Facebook",
            ProviderKind::Google => "Google",
        }
    }

    /// Key inside the `providers` mapping.
    pub fn key(&self) -> &'static str {
        match self {
            ProviderKind::UserDirectory => "sign-in-user-directory",
            ProviderKind::Facebook => "sign-in-facebook",
            ProviderKind::Google => "sign-in-google",
        }
    }

    pub fn feature_kind(&self) -> FeatureKind {
        match self {
            ProviderKind::UserDirectory => FeatureKind::UserDirectoryIdentity,
            ProviderKind::Facebook => FeatureKind::FacebookIdentity,
            ProviderKind::Google => FeatureKind::GoogleIdentity,
        }
    }

    fn from_label(label: &str) -> Option<ProviderKind> {
        ProviderKind::ALL.iter().copied().find(|k| k.label() == label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MfaLevel {
    Off,
    Optional,
    On,
}

impl MfaLevel {
    pub fn label(&self) -> &'static str {
        match self {
            MfaLevel::Off => "OFF",
            MfaLevel::Optional => "OPTIONAL",
            MfaLevel::On => "ON",
        }
    }

    pub fn from_label(label: &str) -> Option<MfaLevel> {
        match label {
            "OFF" => Some(MfaLevel::Off),
            "OPTIONAL" => Some(MfaLevel::Optional),
            "ON" => Some(MfaLevel::On),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PasswordPolicy {
    pub min_length: u64,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_numbers: bool,
    pub require_symbols: bool,
}

impl PasswordPolicy {
    /// Default policy installed by "enable with defaults": 8 characters,
    /// all four character classes.
    pub fn strict_default() -> PasswordPolicy {
        PasswordPolicy {
            min_length: 8,
            require_lowercase: true,
            require_uppercase: true,
            require_numbers: true,
            require_symbols: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectorySettings {
    pub aliases: Vec<String>,
    pub mfa: MfaLevel,
    pub password_policy: PasswordPolicy,
}

impl DirectorySettings {
    /// Two login aliases; the phone alias makes MFA mandatory.
    pub fn enable_default() -> DirectorySettings {
        DirectorySettings {
            aliases: vec![ALIAS_EMAIL.to_string(), ALIAS_PHONE.to_string()],
            mfa: MfaLevel::On,
            password_policy: PasswordPolicy::strict_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderSpec {
    UserDirectory(DirectorySettings),
    Facebook { application_id: String },
    Google { application_id: String },
}

impl ProviderSpec {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderSpec::UserDirectory(_) => ProviderKind::UserDirectory,
            ProviderSpec::Facebook { .. } => ProviderKind::Facebook,
            ProviderSpec::Google { .. } => ProviderKind::Google,
        }
    }
}

/// Working definition of the sign-in feature.
#[derive(Debug, Clone, PartialEq)]
pub struct SignInSpec {
    pub enabled: bool,
    pub optional_sign_in: bool,
    pub providers: Vec<ProviderSpec>,
}

impl SignInSpec {
    pub fn disabled() -> SignInSpec {
        SignInSpec {
            enabled: false,
            optional_sign_in: true,
            providers: Vec::new(),
        }
    }

    pub fn provider(&self, kind: ProviderKind) -> Option<&ProviderSpec> {
        self.providers.iter().find(|p| p.kind() == kind)
    }

    pub fn upsert(&mut self, provider: ProviderSpec) {
        match self.providers.iter_mut().find(|p| p.kind() == provider.kind()) {
            Some(slot) => *slot = provider,
            None => self.providers.push(provider),
        }
    }

    pub fn remove(&mut self, kind: ProviderKind) {
        self.providers.retain(|p| p.kind() != kind);
    }

    pub fn from_document(doc: &SpecificationDocument) -> Result<SignInSpec, BackspecError> {
        let Some(feature) = doc.feature(FEATURE_NAME) else {
            return Ok(SignInSpec::disabled());
        };
        let enabled = feature
            .fields
            .get("enabled")
            .and_then(Node::as_bool)
            .unwrap_or(false);
        let optional_sign_in = feature
            .fields
            .get("optional-sign-in")
            .and_then(Node::as_bool)
            .unwrap_or(true);
        let mut providers = Vec::new();
        if let Some(map) = feature.fields.get("providers").and_then(Node::as_mapping) {
            for (key, value) in map.iter() {
                let node = value.as_feature().ok_or_else(|| {
                    BackspecError::ValidationError(format!(
                        "provider '{}' is not a dressed node",
                        key
                    ))
                })?;
                providers.push(provider_from_node(node)?);
            }
        }
        Ok(SignInSpec {
            enabled,
            optional_sign_in,
            providers,
        })
    }

    /// Write back, re-deriving `enabled` from the provider set.
    pub fn store(&self, doc: &mut SpecificationDocument) {
        let enabled = !self.providers.is_empty();
        let mut node = FeatureNode::new(FeatureKind::SignIn);
        node.fields.insert("enabled", Node::bool(enabled));
        node.fields
            .insert("optional-sign-in", Node::bool(self.optional_sign_in));
        let providers: NodeMap = self
            .providers
            .iter()
            .map(|p| (p.kind().key().to_string(), Node::Feature(provider_to_node(p))))
            .collect();
        node.fields.insert("providers", Node::Mapping(providers));
        doc.set_feature(FEATURE_NAME, node);
    }
}

fn provider_from_node(node: &FeatureNode) -> Result<ProviderSpec, BackspecError> {
    match node.kind {
        FeatureKind::UserDirectoryIdentity => {
            let aliases = node
                .fields
                .get("alias-attributes")
                .and_then(Node::as_sequence)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Node::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            let mfa = node
                .fields
                .get("mfa-configuration")
                .and_then(Node::as_str)
                .and_then(MfaLevel::from_label)
                .unwrap_or(MfaLevel::Off);
            let policy = node
                .fields
                .get("password-policy")
                .and_then(Node::as_mapping);
            let bool_field = |key: &str| {
                policy
                    .and_then(|p| p.get(key))
                    .and_then(Node::as_bool)
                    .unwrap_or(false)
            };
            let password_policy = PasswordPolicy {
                min_length: policy
                    .and_then(|p| p.get("min-length"))
                    .and_then(Node::as_u64)
                    .unwrap_or(8),
                require_lowercase: bool_field("require-lowercase"),
                require_uppercase: bool_field("require-uppercase"),
                require_numbers: bool_field("require-numbers"),
                require_symbols: bool_field("require-symbols"),
            };
            Ok(ProviderSpec::UserDirectory(DirectorySettings {
                aliases,
                mfa,
                password_policy,
            }))
        }
        FeatureKind::FacebookIdentity | FeatureKind::GoogleIdentity => {
            let application_id = node
                .fields
                .get("application-id")
                .and_then(Node::as_str)
                .unwrap_or_default()
                .to_string();
            if node.kind == FeatureKind::FacebookIdentity {
                Ok(ProviderSpec::Facebook { application_id })
            } else {
                Ok(ProviderSpec::Google { application_id })
            }
        }
        other => Err(BackspecError::ValidationError(format!(
            "{:?} is not an identity provider variant",
            other
        ))),
    }
}

fn provider_to_node(provider: &ProviderSpec) -> FeatureNode {
    let mut node = FeatureNode::new(provider.kind().feature_kind());
    match provider {
        ProviderSpec::UserDirectory(settings) => {
            node.fields.insert(
                "alias-attributes",
                Node::Sequence(settings.aliases.iter().map(Node::str).collect()),
            );
            node.fields
                .insert("mfa-configuration", Node::str(settings.mfa.label()));
            let mut policy = NodeMap::new();
            policy.insert("min-length", Node::number(settings.password_policy.min_length));
            policy.insert(
                "require-lowercase",
                Node::bool(settings.password_policy.require_lowercase),
            );
            policy.insert(
                "require-uppercase",
                Node::bool(settings.password_policy.require_uppercase),
            );
            policy.insert(
                "require-numbers",
                Node::bool(settings.password_policy.require_numbers),
            );
            policy.insert(
                "require-symbols",
                Node::bool(settings.password_policy.require_symbols),
            );
            node.fields.insert("password-policy", Node::Mapping(policy));
        }
        ProviderSpec::Facebook { application_id } | ProviderSpec::Google { application_id } => {
            node.fields
                .insert("application-id", Node::str(application_id));
        }
    }
    node
}

/// Whether APIs may currently require signed-in callers.
pub fn is_enabled(doc: &SpecificationDocument) -> bool {
    doc.feature(FEATURE_NAME)
        .and_then(|f| f.fields.get("enabled"))
        .and_then(Node::as_bool)
        .unwrap_or(false)
}

pub fn summarize(doc: &SpecificationDocument) -> Option<String> {
    let feature = doc.feature(FEATURE_NAME)?;
    let enabled = feature
        .fields
        .get("enabled")
        .and_then(Node::as_bool)
        .unwrap_or(false);
    if !enabled {
        return Some("disabled".to_string());
    }
    let count = feature
        .fields
        .get("providers")
        .and_then(Node::as_mapping)
        .map(NodeMap::len)
        .unwrap_or(0);
    let optional = feature
        .fields
        .get("optional-sign-in")
        .and_then(Node::as_bool)
        .unwrap_or(true);
    Some(format!(
        "enabled, {} provider{} ({})",
        count,
        if count == 1 { "" } else { "s" },
        if optional { "optional" } else { "required" }
    ))
}

/// Entry point for `backspec configure sign-in`.
pub fn configure(ctx: &mut EditorContext) -> Result<WorkflowOutcome, BackspecError> {
    let mut spec = SignInSpec::from_document(&ctx.document)?;

    let committed = if spec.providers.is_empty() {
        let action = workflow::menu(
            ctx.prompter,
            "signin-action",
            "Sign-in is currently disabled. What would you like to do?",
            &[
                ("enable", "Enable sign-in with default settings"),
                ("advanced", "Advanced settings"),
            ],
        )?;
        match action.as_str() {
            "enable" => {
                spec.providers = vec![ProviderSpec::UserDirectory(
                    DirectorySettings::enable_default(),
                )];
                spec.optional_sign_in = true;
                output::ok("sign-in enabled with a managed user directory");
                true
            }
            _ => advanced(ctx.prompter, &mut spec, &mut ctx.document)?,
        }
    } else {
        let action = workflow::menu(
            ctx.prompter,
            "signin-action",
            "Sign-in is currently enabled. What would you like to do?",
            &[
                ("toggle-required", "Toggle whether sign-in is required"),
                ("advanced", "Advanced settings"),
                ("disable", "Disable sign-in"),
            ],
        )?;
        match action.as_str() {
            "toggle-required" => {
                spec.optional_sign_in = !spec.optional_sign_in;
                output::ok(&format!(
                    "sign-in is now {}",
                    if spec.optional_sign_in {
                        "optional"
                    } else {
                        "required"
                    }
                ));
                true
            }
            "disable" => {
                let accepted = workflow::confirm(
                    ctx.prompter,
                    "confirm-disable-signin",
                    "Are you sure you want to disable sign-in?",
                    false,
                )?;
                if !accepted {
                    false
                } else if !cascade_clear_apis(ctx.prompter, &mut ctx.document)? {
                    false
                } else {
                    spec.providers.clear();
                    output::ok("sign-in disabled");
                    true
                }
            }
            _ => advanced(ctx.prompter, &mut spec, &mut ctx.document)?,
        }
    };

    if !committed {
        return Ok(WorkflowOutcome::Declined);
    }
    spec.store(&mut ctx.document);
    Ok(WorkflowOutcome::Committed)
}

/// Provider-level menu. Returns false when a confirmation was declined.
fn advanced(
    prompter: &mut dyn Prompter,
    spec: &mut SignInSpec,
    document: &mut SpecificationDocument,
) -> Result<bool, BackspecError> {
    let labels: Vec<String> = ProviderKind::ALL.iter().map(|k| k.label().to_string()).collect();
    let picked = workflow::ask_text(
        prompter,
        Question::select("provider-kind", "Select a sign-in provider", labels),
    )?;
    let kind = ProviderKind::from_label(&picked).ok_or_else(|| {
        BackspecError::ValidationError(format!("unknown provider '{}'", picked))
    })?;

    if spec.provider(kind).is_none() {
        let provider = provider_settings_chain(prompter, kind)?;
        spec.upsert(provider);
        output::ok(&format!("{} configured", kind.label()));
        return Ok(true);
    }

    let action = workflow::menu(
        prompter,
        "provider-action",
        &format!("{} is already configured.", kind.label()),
        &[
            ("edit", "Edit settings"),
            ("disable", "Disable this provider"),
        ],
    )?;
    match action.as_str() {
        "edit" => {
            let provider = provider_settings_chain(prompter, kind)?;
            spec.upsert(provider);
            Ok(true)
        }
        _ => {
            let accepted = workflow::confirm(
                prompter,
                "confirm-disable-provider",
                &format!("Disable {}?", kind.label()),
                false,
            )?;
            if !accepted {
                return Ok(false);
            }
            if spec.providers.len() == 1 && !cascade_clear_apis(prompter, document)? {
                return Ok(false);
            }
            spec.remove(kind);
            output::ok(&format!("{} disabled", kind.label()));
            Ok(true)
        }
    }
}

/// Settings sub-chain for one provider kind.
fn provider_settings_chain(
    prompter: &mut dyn Prompter,
    kind: ProviderKind,
) -> Result<ProviderSpec, BackspecError> {
    match kind {
        ProviderKind::Facebook | ProviderKind::Google => {
            let application_id = workflow::ask_text(
                prompter,
                Question::text(
                    "application-id",
                    format!("{} application id", kind.label()),
                )
                .with_validator(|v| check::non_empty(v, "application id")),
            )?;
            Ok(match kind {
                ProviderKind::Facebook => ProviderSpec::Facebook { application_id },
                _ => ProviderSpec::Google { application_id },
            })
        }
        ProviderKind::UserDirectory => {
            let question = Question::multi_select(
                "alias-attributes",
                "Which login aliases should the directory accept?",
                vec![ALIAS_EMAIL.to_string(), ALIAS_PHONE.to_string()],
            )
            .with_default(Answer::many([ALIAS_EMAIL]));
            let answers = prompter.ask(std::slice::from_ref(&question))?;
            let aliases = answers.many("alias-attributes")?.to_vec();
            if aliases.is_empty() {
                return Err(BackspecError::ValidationError(
                    "select at least one login alias".to_string(),
                ));
            }

            // MFA rides on the phone alias; without one it is forced OFF.
            let mfa = if aliases.iter().any(|a| a == ALIAS_PHONE) {
                let label = workflow::ask_text(
                    prompter,
                    Question::select(
                        "mfa-configuration",
                        "Multi-factor authentication",
                        vec![
                            MfaLevel::Off.label().to_string(),
                            MfaLevel::Optional.label().to_string(),
                            MfaLevel::On.label().to_string(),
                        ],
                    )
                    .with_default(Answer::text(MfaLevel::Optional.label())),
                )?;
                MfaLevel::from_label(&label).unwrap_or(MfaLevel::Off)
            } else {
                output::notice("no phone alias selected; MFA stays OFF");
                MfaLevel::Off
            };

            let min_length_raw = workflow::ask_text(
                prompter,
                Question::text("password-min-length", "Minimum password length")
                    .with_default(Answer::text("8"))
                    .with_validator(|v| match v.parse::<u64>() {
                        Ok(n) if (6..=30).contains(&n) => Ok(()),
                        _ => Err("enter a number between 6 and 30".to_string()),
                    }),
            )?;
            let min_length = min_length_raw.parse::<u64>().map_err(|_| {
                BackspecError::ValidationError("password length must be numeric".to_string())
            })?;

            let class_question = Question::multi_select(
                "password-classes",
                "Which character classes must passwords contain?",
                vec![
                    "lowercase".to_string(),
                    "uppercase".to_string(),
                    "numbers".to_string(),
                    "symbols".to_string(),
                ],
            )
            .with_default(Answer::many(["lowercase", "uppercase", "numbers", "symbols"]));
            let answers = prompter.ask(std::slice::from_ref(&class_question))?;
            let classes = answers.many("password-classes")?;

            Ok(ProviderSpec::UserDirectory(DirectorySettings {
                aliases,
                mfa,
                password_policy: PasswordPolicy {
                    min_length,
                    require_lowercase: classes.iter().any(|c| c == "lowercase"),
                    require_uppercase: classes.iter().any(|c| c == "uppercase"),
                    require_numbers: classes.iter().any(|c| c == "numbers"),
                    require_symbols: classes.iter().any(|c| c == "symbols"),
                },
            }))
        }
    }
}

/// Cross-feature cascade: clearing `requires-signin` on every API before
/// sign-in goes away. Returns false when the operator declines.
fn cascade_clear_apis(
    prompter: &mut dyn Prompter,
    document: &mut SpecificationDocument,
) -> Result<bool, BackspecError> {
    let mut apis = cloudapi::load_apis(document)?;
    let restricted: Vec<String> = apis
        .iter()
        .filter(|api| api.requires_signin)
        .map(|api| api.name.clone())
        .collect();
    if restricted.is_empty() {
        return Ok(true);
    }
    let accepted = workflow::confirm(
        prompter,
        "confirm-clear-api-signin",
        &format!(
            "{} API(s) require signed-in callers ({}). Remove that requirement as well?",
            restricted.len(),
            restricted.join(", ")
        ),
        false,
    )?;
    if !accepted {
        output::notice("sign-in left unchanged");
        return Ok(false);
    }
    for api in &mut apis {
        api.requires_signin = false;
    }
    cloudapi::store_apis(document, &apis);
    Ok(true)
}
