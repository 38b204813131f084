use backspec::core::catalog::{FeatureKind, FeatureNode, Node, decode, encode};
use backspec::core::document::{DOCUMENT_FILENAME, PersistOutcome, STATE_DIR, SpecificationDocument};
use backspec::core::error::BackspecError;
use backspec::features::cloudapi::{ApiSpec, FunctionSpec, store_apis};
use backspec::features::database::{ColumnType, TablePrivacy, TableSpec, store_tables};
use backspec::features::signin::{DirectorySettings, ProviderSpec, SignInSpec};
use std::fs;
use tempfile::tempdir;

fn populated_document() -> SpecificationDocument {
    let mut doc = SpecificationDocument::starter("demo-app", "us-east-1");

    let table = TableSpec {
        table_name: "Notes".to_string(),
        attributes: vec![
            ("noteId".to_string(), ColumnType::String),
            ("content".to_string(), ColumnType::String),
            ("stars".to_string(), ColumnType::Number),
        ],
        hash_key_name: "noteId".to_string(),
        hash_key_type: ColumnType::String,
        sort_key: Some(("stars".to_string(), ColumnType::Number)),
        privacy: TablePrivacy::Public,
        dynamic_prefix: true,
        indexes: Vec::new(),
    };
    store_tables(&mut doc, &[table]);

    let mut signin = SignInSpec::disabled();
    signin.upsert(ProviderSpec::UserDirectory(DirectorySettings::enable_default()));
    signin.upsert(ProviderSpec::Facebook {
        application_id: "fb-123".to_string(),
    });
    signin.store(&mut doc);

    let mut api = ApiSpec::new("notes", true);
    api.register_path("/notes", FunctionSpec::with_defaults("notesHandler"));
    store_apis(&mut doc, &[api]);

    doc
}

#[test]
fn populated_document_round_trips_through_disk() {
    let tmp = tempdir().expect("tempdir");
    let doc = populated_document();

    match doc.persist(tmp.path()).expect("persist") {
        PersistOutcome::Written { digest } => assert_eq!(digest.len(), 64),
        other => panic!("expected a write, got {:?}", other),
    }

    let raw = fs::read_to_string(tmp.path().join(DOCUMENT_FILENAME)).expect("read file");
    assert!(raw.contains("!backspec.v0.Project"));
    assert!(raw.contains("!backspec.v0.NoSQLTable"));
    assert!(raw.contains("!backspec.v0.UserDirectoryIdentity"));
    assert!(raw.contains("!backspec.v0.API"));

    let reloaded = SpecificationDocument::load(tmp.path()).expect("load");
    assert_eq!(reloaded, doc);
}

#[test]
fn second_persist_with_same_content_is_skipped() {
    let tmp = tempdir().expect("tempdir");
    let doc = populated_document();

    let first = doc.persist(tmp.path()).expect("first persist");
    let second = doc.persist(tmp.path()).expect("second persist");
    assert!(matches!(first, PersistOutcome::Written { .. }));
    assert!(matches!(second, PersistOutcome::Unchanged { .. }));
    assert_eq!(first.digest(), second.digest());

    // An unchanged persist leaves no backup behind.
    assert!(!tmp.path().join(STATE_DIR).join("backup").exists());
}

#[test]
fn changed_persist_backs_up_the_previous_content() {
    let tmp = tempdir().expect("tempdir");
    let mut doc = populated_document();
    doc.persist(tmp.path()).expect("first persist");

    store_tables(&mut doc, &[]);
    doc.persist(tmp.path()).expect("second persist");

    let backup_dir = tmp.path().join(STATE_DIR).join("backup");
    let backups: Vec<_> = fs::read_dir(&backup_dir)
        .expect("backup dir")
        .collect::<Result<_, _>>()
        .expect("entries");
    assert_eq!(backups.len(), 1);

    let backed_up = fs::read_to_string(backups[0].path()).expect("read backup");
    assert!(backed_up.contains("!backspec.v0.NoSQLTable"));
}

#[test]
fn unknown_discriminator_fails_the_whole_load() {
    let tmp = tempdir().expect("tempdir");
    let raw = "\
!backspec.v0.Project
features:
  mystery: !backspec.v0.Mystery
    some-field: 1
name: demo
region: us-east-1
uploads: []
sharedComponents: {}
";
    fs::write(tmp.path().join(DOCUMENT_FILENAME), raw).expect("write");
    match SpecificationDocument::load(tmp.path()) {
        Err(BackspecError::DiscriminatorError(message)) => {
            assert!(message.contains("backspec.v0.Mystery"));
        }
        other => panic!("expected a discriminator error, got {:?}", other),
    }
}

#[test]
fn root_fields_outside_features_round_trip_verbatim() {
    let tmp = tempdir().expect("tempdir");
    let raw = "\
!backspec.v0.Project
features: {}
name: demo
region: eu-west-1
uploads:
- uploads/notesHandler.zip
sharedComponents:
  shared-bucket: !backspec.v0.Bucket
    bucket-name: demo-shared
";
    fs::write(tmp.path().join(DOCUMENT_FILENAME), raw).expect("write");

    let doc = SpecificationDocument::load(tmp.path()).expect("load");
    assert_eq!(doc.region, "eu-west-1");
    let rendered = doc.to_yaml_string().expect("render");
    assert!(rendered.contains("uploads/notesHandler.zip"));
    assert!(rendered.contains("!backspec.v0.Bucket"));
    assert!(rendered.contains("demo-shared"));
}

#[test]
fn tables_keep_insertion_order_across_a_file_round_trip() {
    let tmp = tempdir().expect("tempdir");
    let mut doc = SpecificationDocument::starter("demo", "us-east-1");

    let make = |name: &str, key: &str| TableSpec {
        table_name: name.to_string(),
        attributes: vec![(key.to_string(), ColumnType::String)],
        hash_key_name: key.to_string(),
        hash_key_type: ColumnType::String,
        sort_key: None,
        privacy: TablePrivacy::Public,
        dynamic_prefix: true,
        indexes: Vec::new(),
    };
    store_tables(&mut doc, &[make("Table", "id"), make("AWSMobileTable", "teamId")]);
    doc.persist(tmp.path()).expect("persist");

    let reloaded = SpecificationDocument::load(tmp.path()).expect("load");
    let tables = backspec::features::database::load_tables(&reloaded).expect("tables");
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].table_name, "Table");
    assert_eq!(tables[1].table_name, "AWSMobileTable");
    assert!(tables.iter().all(|t| t.indexes.is_empty()));
}

#[test]
fn decode_encode_round_trips_a_deeply_nested_graph() {
    let mut function = FeatureNode::new(FeatureKind::Function);
    function.fields.insert("name", Node::str("handler"));

    let mut api = FeatureNode::new(FeatureKind::Api);
    let mut paths = backspec::core::catalog::NodeMap::new();
    paths.insert("/x", Node::Feature(function));
    api.fields.insert("paths", Node::Mapping(paths));

    let mut logic = FeatureNode::new(FeatureKind::CloudLogic);
    let mut apis = backspec::core::catalog::NodeMap::new();
    apis.insert("x", Node::Feature(api));
    logic.fields.insert("apis", Node::Mapping(apis));

    let typed = Node::Feature(logic);
    let raw = encode(&typed);
    assert_eq!(decode(&raw).expect("decode"), typed);
}
