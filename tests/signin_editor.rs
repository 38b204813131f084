use backspec::core::config::ProjectConfig;
use backspec::core::context::EditorContext;
use backspec::core::document::SpecificationDocument;
use backspec::core::error::BackspecError;
use backspec::core::prompt::{Answer, ScriptedPrompter};
use backspec::core::render::RecordingRenderer;
use backspec::core::workflow::WorkflowOutcome;
use backspec::features::cloudapi::{ApiSpec, FunctionSpec, store_apis};
use backspec::features::signin::{
    self, ALIAS_EMAIL, ALIAS_PHONE, DirectorySettings, MfaLevel, ProviderKind, ProviderSpec,
    SignInSpec,
};

fn run_editor(
    document: SpecificationDocument,
    answers: Vec<Answer>,
) -> (
    SpecificationDocument,
    Result<WorkflowOutcome, BackspecError>,
) {
    let mut prompter = ScriptedPrompter::new(answers);
    let mut renderer = RecordingRenderer::default();
    let mut ctx = EditorContext {
        project_dir: std::env::temp_dir(),
        config: ProjectConfig::default(),
        document,
        prompter: &mut prompter,
        renderer: &mut renderer,
    };
    let outcome = signin::configure(&mut ctx);
    (ctx.document, outcome)
}

fn text(value: &str) -> Answer {
    Answer::text(value)
}

fn doc_with_providers(providers: Vec<ProviderSpec>) -> SpecificationDocument {
    let mut doc = SpecificationDocument::starter("demo", "us-east-1");
    let mut spec = SignInSpec::disabled();
    for provider in providers {
        spec.upsert(provider);
    }
    spec.store(&mut doc);
    doc
}

fn restricted_api_doc(providers: Vec<ProviderSpec>) -> SpecificationDocument {
    let mut doc = doc_with_providers(providers);
    let mut api = ApiSpec::new("notes", true);
    api.register_path("/notes", FunctionSpec::with_defaults("notesHandler"));
    store_apis(&mut doc, &[api]);
    doc
}

#[test]
fn enable_default_installs_the_managed_directory() {
    let doc = SpecificationDocument::starter("demo", "us-east-1");
    let (doc, outcome) = run_editor(doc, vec![text("Enable sign-in with default settings")]);
    assert_eq!(outcome.expect("enable"), WorkflowOutcome::Committed);
    assert!(signin::is_enabled(&doc));

    let spec = SignInSpec::from_document(&doc).expect("spec");
    assert!(spec.enabled);
    assert!(spec.optional_sign_in);
    assert_eq!(spec.providers.len(), 1);
    match spec.provider(ProviderKind::UserDirectory) {
        Some(ProviderSpec::UserDirectory(settings)) => {
            assert_eq!(settings.aliases, [ALIAS_EMAIL, ALIAS_PHONE]);
            assert_eq!(settings.mfa, MfaLevel::On);
            assert_eq!(settings.password_policy.min_length, 8);
            assert!(settings.password_policy.require_symbols);
        }
        other => panic!("expected the managed directory, got {:?}", other),
    }
}

#[test]
fn toggle_required_flips_only_the_optional_flag() {
    let doc = doc_with_providers(vec![ProviderSpec::Facebook {
        application_id: "fb".to_string(),
    }]);
    let (doc, outcome) = run_editor(doc, vec![text("Toggle whether sign-in is required")]);
    assert_eq!(outcome.expect("toggle"), WorkflowOutcome::Committed);

    let spec = SignInSpec::from_document(&doc).expect("spec");
    assert!(!spec.optional_sign_in);
    assert!(spec.enabled);
    assert_eq!(spec.providers.len(), 1);
}

#[test]
fn advanced_adds_a_federated_provider_and_enables_signin() {
    let doc = SpecificationDocument::starter("demo", "us-east-1");
    let (doc, outcome) = run_editor(
        doc,
        vec![
            text("Advanced settings"),
            text("Facebook"),
            text("fb-app-123"),
        ],
    );
    assert_eq!(outcome.expect("advanced"), WorkflowOutcome::Committed);
    assert!(signin::is_enabled(&doc));

    let spec = SignInSpec::from_document(&doc).expect("spec");
    match spec.provider(ProviderKind::Facebook) {
        Some(ProviderSpec::Facebook { application_id }) => {
            assert_eq!(application_id, "fb-app-123");
        }
        other => panic!("expected facebook, got {:?}", other),
    }
}

#[test]
fn directory_settings_chain_forces_mfa_off_without_a_phone_alias() {
    let doc = SpecificationDocument::starter("demo", "us-east-1");
    let (doc, outcome) = run_editor(
        doc,
        vec![
            text("Advanced settings"),
            text("Managed user directory"),
            Answer::many([ALIAS_EMAIL]),
            // no MFA question: forced OFF without a phone alias
            text("10"),
            Answer::many(["lowercase", "numbers"]),
        ],
    );
    assert_eq!(outcome.expect("advanced"), WorkflowOutcome::Committed);

    let spec = SignInSpec::from_document(&doc).expect("spec");
    match spec.provider(ProviderKind::UserDirectory) {
        Some(ProviderSpec::UserDirectory(settings)) => {
            assert_eq!(settings.aliases, [ALIAS_EMAIL]);
            assert_eq!(settings.mfa, MfaLevel::Off);
            assert_eq!(settings.password_policy.min_length, 10);
            assert!(settings.password_policy.require_lowercase);
            assert!(settings.password_policy.require_numbers);
            assert!(!settings.password_policy.require_uppercase);
            assert!(!settings.password_policy.require_symbols);
        }
        other => panic!("expected the managed directory, got {:?}", other),
    }
}

#[test]
fn enabled_stays_in_sync_when_one_of_two_providers_goes_away() {
    let doc = doc_with_providers(vec![
        ProviderSpec::Facebook {
            application_id: "fb".to_string(),
        },
        ProviderSpec::Google {
            application_id: "goog".to_string(),
        },
    ]);
    let (doc, outcome) = run_editor(
        doc,
        vec![
            text("Advanced settings"),
            text("Facebook"),
            text("Disable this provider"),
            Answer::Bool(true),
        ],
    );
    assert_eq!(outcome.expect("disable provider"), WorkflowOutcome::Committed);

    let spec = SignInSpec::from_document(&doc).expect("spec");
    assert!(spec.enabled);
    assert_eq!(spec.providers.len(), 1);
    assert!(spec.provider(ProviderKind::Google).is_some());
    assert!(signin::is_enabled(&doc));
}

#[test]
fn disabling_signin_with_cascade_accepted_clears_every_api_requirement() {
    let doc = restricted_api_doc(vec![ProviderSpec::Facebook {
        application_id: "fb".to_string(),
    }]);
    let (doc, outcome) = run_editor(
        doc,
        vec![
            text("Disable sign-in"),
            Answer::Bool(true), // yes, disable
            Answer::Bool(true), // yes, clear the API requirement too
        ],
    );
    assert_eq!(outcome.expect("disable"), WorkflowOutcome::Committed);
    assert!(!signin::is_enabled(&doc));

    let spec = SignInSpec::from_document(&doc).expect("spec");
    assert!(!spec.enabled);
    assert!(spec.providers.is_empty());

    let apis = backspec::features::cloudapi::load_apis(&doc).expect("apis");
    assert!(apis.iter().all(|api| !api.requires_signin));
}

#[test]
fn declining_the_cascade_aborts_the_whole_operation() {
    let doc = restricted_api_doc(vec![ProviderSpec::Facebook {
        application_id: "fb".to_string(),
    }]);
    let before = doc.clone();
    let (doc, outcome) = run_editor(
        doc,
        vec![
            text("Disable sign-in"),
            Answer::Bool(true),  // yes, disable
            Answer::Bool(false), // but keep the API requirement: abort
        ],
    );
    assert_eq!(outcome.expect("declined"), WorkflowOutcome::Declined);
    assert_eq!(doc, before);
    assert!(signin::is_enabled(&doc));
}

#[test]
fn disabling_the_last_provider_runs_the_same_cascade() {
    let doc = restricted_api_doc(vec![ProviderSpec::Facebook {
        application_id: "fb".to_string(),
    }]);
    let before = doc.clone();

    // Declined cascade leaves everything in place.
    let (doc, outcome) = run_editor(
        doc,
        vec![
            text("Advanced settings"),
            text("Facebook"),
            text("Disable this provider"),
            Answer::Bool(true),
            Answer::Bool(false),
        ],
    );
    assert_eq!(outcome.expect("declined"), WorkflowOutcome::Declined);
    assert_eq!(doc, before);

    // Accepted cascade disables sign-in and clears the APIs.
    let (doc, outcome) = run_editor(
        doc,
        vec![
            text("Advanced settings"),
            text("Facebook"),
            text("Disable this provider"),
            Answer::Bool(true),
            Answer::Bool(true),
        ],
    );
    assert_eq!(outcome.expect("accepted"), WorkflowOutcome::Committed);
    assert!(!signin::is_enabled(&doc));
    let apis = backspec::features::cloudapi::load_apis(&doc).expect("apis");
    assert!(apis.iter().all(|api| !api.requires_signin));
}

#[test]
fn declining_the_disable_confirmation_is_a_clean_noop() {
    let doc = doc_with_providers(vec![ProviderSpec::Facebook {
        application_id: "fb".to_string(),
    }]);
    let before = doc.clone();
    let (doc, outcome) = run_editor(doc, vec![text("Disable sign-in"), Answer::Bool(false)]);
    assert_eq!(outcome.expect("declined"), WorkflowOutcome::Declined);
    assert_eq!(doc, before);
}

#[test]
fn editing_an_existing_provider_replaces_its_settings() {
    let doc = doc_with_providers(vec![ProviderSpec::Facebook {
        application_id: "old-id".to_string(),
    }]);
    let (doc, outcome) = run_editor(
        doc,
        vec![
            text("Advanced settings"),
            text("Facebook"),
            text("Edit settings"),
            text("new-id"),
        ],
    );
    assert_eq!(outcome.expect("edit"), WorkflowOutcome::Committed);

    let spec = SignInSpec::from_document(&doc).expect("spec");
    assert_eq!(spec.providers.len(), 1);
    match spec.provider(ProviderKind::Facebook) {
        Some(ProviderSpec::Facebook { application_id }) => assert_eq!(application_id, "new-id"),
        other => panic!("expected facebook, got {:?}", other),
    }
}

#[test]
fn enable_default_matches_the_documented_directory_defaults() {
    // The defaults advertised by the disabled-state menu are exactly the
    // `enable_default` settings, MFA mandatory because a phone alias exists.
    let defaults = DirectorySettings::enable_default();
    assert_eq!(defaults.aliases.len(), 2);
    assert!(defaults.aliases.iter().any(|a| a == ALIAS_PHONE));
    assert_eq!(defaults.mfa, MfaLevel::On);
}
