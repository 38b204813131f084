use backspec::core::config::ProjectConfig;
use backspec::core::context::EditorContext;
use backspec::core::document::SpecificationDocument;
use backspec::core::error::BackspecError;
use backspec::core::prompt::{Answer, ScriptedPrompter};
use backspec::core::render::RecordingRenderer;
use backspec::core::workflow::WorkflowOutcome;
use backspec::features::cloudapi::{self, ApiSpec, FunctionSpec};
use backspec::features::database::{self, ColumnType, TablePrivacy, TableSpec};
use backspec::features::signin::{ProviderSpec, SignInSpec};

struct EditorRun {
    document: SpecificationDocument,
    outcome: Result<WorkflowOutcome, BackspecError>,
    rendered: Vec<backspec::core::render::TemplateRequest>,
}

fn run_editor(document: SpecificationDocument, answers: Vec<Answer>) -> EditorRun {
    let mut prompter = ScriptedPrompter::new(answers);
    let mut renderer = RecordingRenderer::default();
    let mut ctx = EditorContext {
        project_dir: std::env::temp_dir(),
        config: ProjectConfig::default(),
        document,
        prompter: &mut prompter,
        renderer: &mut renderer,
    };
    let outcome = cloudapi::configure(&mut ctx);
    let document = ctx.document;
    EditorRun {
        document,
        outcome,
        rendered: renderer.requests,
    }
}

fn text(value: &str) -> Answer {
    Answer::text(value)
}

fn doc_with_api(name: &str, requires_signin: bool) -> SpecificationDocument {
    let mut doc = SpecificationDocument::starter("demo", "us-east-1");
    let mut api = ApiSpec::new(name, requires_signin);
    api.register_path(
        &format!("/{}", name),
        FunctionSpec::with_defaults("itemsHandler"),
    );
    cloudapi::store_apis(&mut doc, &[api]);
    doc
}

fn enable_signin(doc: &mut SpecificationDocument) {
    let mut spec = SignInSpec::disabled();
    spec.upsert(ProviderSpec::Facebook {
        application_id: "fb".to_string(),
    });
    spec.store(doc);
}

fn open_table(name: &str, key: &str) -> TableSpec {
    TableSpec {
        table_name: name.to_string(),
        attributes: vec![(key.to_string(), ColumnType::String)],
        hash_key_name: key.to_string(),
        hash_key_type: ColumnType::String,
        sort_key: None,
        privacy: TablePrivacy::Public,
        dynamic_prefix: true,
        indexes: Vec::new(),
    }
}

#[test]
fn an_accepted_path_registers_exactly_its_proxy_pair() {
    let doc = SpecificationDocument::starter("demo", "us-east-1");
    let run = run_editor(
        doc,
        vec![
            text("Create a new API"),
            text("items"),
            // sign-in disabled: the requires-signin question is never posed
            text("/items"),
            text("itemsHandler"),
            Answer::Bool(false),
        ],
    );
    assert_eq!(run.outcome.expect("create"), WorkflowOutcome::Committed);

    let apis = cloudapi::load_apis(&run.document).expect("apis");
    assert_eq!(apis.len(), 1);
    let api = &apis[0];
    assert!(!api.requires_signin);
    let patterns: Vec<&str> = api.paths.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(patterns, ["/items", "/items/{proxy+}"]);
    assert_eq!(api.paths[0].1, api.paths[1].1);
}

#[test]
fn requires_signin_is_asked_only_while_signin_is_enabled() {
    let mut doc = SpecificationDocument::starter("demo", "us-east-1");
    enable_signin(&mut doc);
    let run = run_editor(
        doc,
        vec![
            text("Create a new API"),
            text("items"),
            Answer::Bool(true), // the question exists now
            text("/items"),
            text("itemsHandler"),
            Answer::Bool(false),
        ],
    );
    assert_eq!(run.outcome.expect("create"), WorkflowOutcome::Committed);
    let apis = cloudapi::load_apis(&run.document).expect("apis");
    assert!(apis[0].requires_signin);
}

#[test]
fn colliding_paths_abort_the_scripted_chain() {
    let doc = doc_with_api("items", false);
    let before = doc.clone();
    let run = run_editor(
        doc,
        vec![
            text("Edit an existing API"),
            text("items"),
            text("Add a path"),
            text("/items/special"), // swallowed by /items/{proxy+}
        ],
    );
    assert!(matches!(
        run.outcome,
        Err(BackspecError::ValidationError(_))
    ));
    assert_eq!(run.document, before);
}

#[test]
fn adding_a_disjoint_path_extends_the_same_api() {
    let doc = doc_with_api("items", false);
    let run = run_editor(
        doc,
        vec![
            text("Edit an existing API"),
            text("items"),
            text("Add a path"),
            text("/orders"),
            text("ordersHandler"),
        ],
    );
    assert_eq!(run.outcome.expect("edit"), WorkflowOutcome::Committed);
    let apis = cloudapi::load_apis(&run.document).expect("apis");
    assert_eq!(apis[0].literal_paths(), ["/items", "/orders"]);
}

#[test]
fn removing_a_path_removes_its_proxy_sibling() {
    let mut doc = SpecificationDocument::starter("demo", "us-east-1");
    let mut api = ApiSpec::new("items", false);
    api.register_path("/items", FunctionSpec::with_defaults("itemsHandler"));
    api.register_path("/orders", FunctionSpec::with_defaults("ordersHandler"));
    cloudapi::store_apis(&mut doc, &[api]);

    let run = run_editor(
        doc,
        vec![
            text("Edit an existing API"),
            text("items"),
            text("Remove a path"),
            text("/items"),
        ],
    );
    assert_eq!(run.outcome.expect("edit"), WorkflowOutcome::Committed);
    let apis = cloudapi::load_apis(&run.document).expect("apis");
    let patterns: Vec<&str> = apis[0].paths.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(patterns, ["/orders", "/orders/{proxy+}"]);
}

#[test]
fn toggling_the_signin_requirement_is_not_offered_while_disabled() {
    let doc = doc_with_api("items", false);
    let run = run_editor(
        doc,
        vec![
            text("Edit an existing API"),
            text("items"),
            text("Toggle the signed-in requirement"), // not a listed option
        ],
    );
    assert!(matches!(
        run.outcome,
        Err(BackspecError::ValidationError(_))
    ));
}

#[test]
fn toggling_the_signin_requirement_works_while_enabled() {
    let mut doc = doc_with_api("items", false);
    enable_signin(&mut doc);
    let run = run_editor(
        doc,
        vec![
            text("Edit an existing API"),
            text("items"),
            text("Toggle the signed-in requirement"),
        ],
    );
    assert_eq!(run.outcome.expect("edit"), WorkflowOutcome::Committed);
    let apis = cloudapi::load_apis(&run.document).expect("apis");
    assert!(apis[0].requires_signin);
}

#[test]
fn removing_the_only_api_removes_the_cloudlogic_node_entirely() {
    let doc = doc_with_api("items", false);
    let run = run_editor(
        doc,
        vec![
            text("Remove an API"),
            text("items"),
            Answer::Bool(true),
        ],
    );
    assert_eq!(run.outcome.expect("remove"), WorkflowOutcome::Committed);
    assert!(run.document.feature(cloudapi::FEATURE_NAME).is_none());
}

#[test]
fn declining_the_remove_confirmation_writes_nothing() {
    let doc = doc_with_api("items", false);
    let before = doc.clone();
    let run = run_editor(
        doc,
        vec![
            text("Remove an API"),
            text("items"),
            Answer::Bool(false),
        ],
    );
    assert_eq!(run.outcome.expect("remove"), WorkflowOutcome::Declined);
    assert_eq!(run.document, before);
}

#[test]
fn crud_from_table_derives_the_canonical_paths_and_tokens() {
    let mut doc = SpecificationDocument::starter("demo", "us-east-1");
    database::store_tables(&mut doc, &[open_table("AWSMobileTable", "teamId")]);

    let run = run_editor(
        doc,
        vec![
            text("Create a CRUD API for an existing table"),
            text("AWSMobileTable"),
            // sign-in disabled: requires-signin skipped
        ],
    );
    assert_eq!(run.outcome.expect("crud"), WorkflowOutcome::Committed);

    let apis = cloudapi::load_apis(&run.document).expect("apis");
    assert_eq!(apis.len(), 1);
    assert_eq!(apis[0].name, "AWSMobileTable");
    let patterns: Vec<&str> = apis[0].paths.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(patterns, ["/AWSMobileTable", "/AWSMobileTable/{proxy+}"]);

    assert_eq!(run.rendered.len(), 1);
    let request = &run.rendered[0];
    assert_eq!(request.template_id, "crud-api-handler");
    assert_eq!(request.target_folder, "cloudlogic/AWSMobileTable");
    assert_eq!(
        request.token("objectPath"),
        Some("/AWSMobileTable/object/:teamId")
    );
    assert_eq!(request.token("listPath"), Some("/AWSMobileTable/:teamId"));
    assert_eq!(request.token("hasUserId"), Some("false"));
    assert_eq!(request.token("functionName"), Some("AWSMobileTable"));
}

#[test]
fn crud_from_a_user_scoped_table_hides_the_hash_key() {
    let mut doc = SpecificationDocument::starter("demo", "us-east-1");
    let mut table = open_table("AWSMobileTable", "teamId");
    table.privacy = TablePrivacy::Protected;
    table.attributes.insert(
        0,
        (database::OWNER_COLUMN.to_string(), ColumnType::String),
    );
    database::store_tables(&mut doc, &[table]);

    let run = run_editor(
        doc,
        vec![
            text("Create a CRUD API for an existing table"),
            text("AWSMobileTable"),
        ],
    );
    assert_eq!(run.outcome.expect("crud"), WorkflowOutcome::Committed);

    let request = &run.rendered[0];
    assert_eq!(request.token("objectPath"), Some("/AWSMobileTable/object"));
    assert_eq!(request.token("listPath"), Some("/AWSMobileTable"));
    assert_eq!(request.token("hasUserId"), Some("true"));
    let example = request.token("exampleObject").expect("example");
    assert!(!example.contains(database::OWNER_COLUMN));
}

#[test]
fn tables_with_binary_attributes_cannot_back_a_crud_api() {
    let mut doc = SpecificationDocument::starter("demo", "us-east-1");
    let mut table = open_table("Blobs", "blobId");
    table
        .attributes
        .push(("payload".to_string(), ColumnType::Binary));
    database::store_tables(&mut doc, &[table]);
    let before = doc.clone();

    let run = run_editor(
        doc,
        vec![
            text("Create a CRUD API for an existing table"),
            text("Blobs"),
        ],
    );
    assert!(matches!(
        run.outcome,
        Err(BackspecError::ValidationError(_))
    ));
    assert_eq!(run.document, before);
    assert!(run.rendered.is_empty());
}

#[test]
fn crud_over_an_existing_api_name_declines_cleanly() {
    let mut doc = doc_with_api("Notes", false);
    database::store_tables(&mut doc, &[open_table("Notes", "noteId")]);
    let before = doc.clone();

    let run = run_editor(
        doc,
        vec![
            text("Create a CRUD API for an existing table"),
            text("Notes"),
        ],
    );
    assert_eq!(run.outcome.expect("crud"), WorkflowOutcome::Declined);
    assert_eq!(run.document, before);
}

#[test]
fn long_table_names_derive_a_twenty_character_handler() {
    let mut doc = SpecificationDocument::starter("demo", "us-east-1");
    database::store_tables(
        &mut doc,
        &[open_table("my-very-long-table-name-for-notes", "id")],
    );

    let run = run_editor(
        doc,
        vec![
            text("Create a CRUD API for an existing table"),
            text("my-very-long-table-name-for-notes"),
        ],
    );
    assert_eq!(run.outcome.expect("crud"), WorkflowOutcome::Committed);
    let name = run.rendered[0].token("functionName").expect("token");
    assert_eq!(name.chars().count(), cloudapi::MAX_FUNCTION_NAME);
    assert!(!name.contains('-'));
    assert!(run.rendered[0]
        .token("objectPath")
        .expect("objectPath")
        .starts_with("/my-very-long-table-name-for-notes/object"));
}
