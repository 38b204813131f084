//! REST API editor and CRUD-from-table derivation.
//!
//! Path rules: a pattern must be non-empty, start with `/`, stay inside
//! `[a-zA-Z0-9-/]`, contain no empty segment, and must not duplicate or
//! segment-prefix-collide with another path of the same API (in either
//! direction — the `{proxy+}` sibling makes a shorter path swallow every
//! longer one). Every accepted literal path registers itself and its
//! `{proxy+}` sibling against the same function.
//!
//! The whole `cloudlogic` node is re-derived from the in-memory API map at
//! every terminal state; an empty map removes the node entirely. That is
//! deliberate asymmetry with the Database node, which survives empty.

use crate::core::catalog::{FeatureKind, FeatureNode, Node, NodeMap};
use crate::core::context::EditorContext;
use crate::core::document::SpecificationDocument;
use crate::core::error::BackspecError;
use crate::core::output;
use crate::core::prompt::{Prompter, Question};
use crate::core::render::TemplateRequest;
use crate::core::workflow::{self, WorkflowOutcome, check};
use crate::features::database::{self, OWNER_COLUMN, ColumnType, TableSpec};
use crate::features::signin;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const FEATURE_NAME: &str = "cloudlogic";

pub const PROXY_SUFFIX: &str = "/{proxy+}";
pub const MAX_FUNCTION_NAME: usize = 20;
const MAX_PATHS: usize = 20;

const DEFAULT_RUNTIME: &str = "nodejs18.x";
const DEFAULT_HANDLER: &str = "index.handler";
const CRUD_TEMPLATE_ID: &str = "crud-api-handler";

fn api_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("^[A-Za-z0-9._-]+$").expect("static pattern"))
}

fn function_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("^[A-Za-z0-9]+$").expect("static pattern"))
}

fn path_charset() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("^[a-zA-Z0-9-/]+$").expect("static pattern"))
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSpec {
    pub name: String,
    pub code_filename: String,
    pub handler: String,
    pub runtime: String,
    pub enable_cors: bool,
    pub environment: Vec<(String, String)>,
}

impl FunctionSpec {
    pub fn with_defaults(name: &str) -> FunctionSpec {
        FunctionSpec {
            name: name.to_string(),
            code_filename: format!("uploads/{}.zip", name),
            handler: DEFAULT_HANDLER.to_string(),
            runtime: DEFAULT_RUNTIME.to_string(),
            enable_cors: true,
            environment: Vec::new(),
        }
    }

    fn from_node(node: &FeatureNode) -> Result<FunctionSpec, BackspecError> {
        if node.kind != FeatureKind::Function {
            return Err(BackspecError::ValidationError(format!(
                "expected a Function node, found {:?}",
                node.kind
            )));
        }
        let get = |key: &str| {
            node.fields
                .get(key)
                .and_then(Node::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    BackspecError::ValidationError(format!(
                        "function node is missing field '{}'",
                        key
                    ))
                })
        };
        let mut environment = Vec::new();
        if let Some(map) = node.fields.get("environment").and_then(Node::as_mapping) {
            for (key, value) in map.iter() {
                let value = value.as_str().ok_or_else(|| {
                    BackspecError::ValidationError(format!(
                        "environment value '{}' must be a string",
                        key
                    ))
                })?;
                environment.push((key.to_string(), value.to_string()));
            }
        }
        Ok(FunctionSpec {
            name: get("name")?,
            code_filename: get("codeFilename")?,
            handler: get("handler")?,
            runtime: get("runtime")?,
            enable_cors: node
                .fields
                .get("enableCORS")
                .and_then(Node::as_bool)
                .unwrap_or(true),
            environment,
        })
    }

    fn to_node(&self) -> FeatureNode {
        let mut node = FeatureNode::new(FeatureKind::Function);
        node.fields.insert("name", Node::str(&self.name));
        node.fields
            .insert("codeFilename", Node::str(&self.code_filename));
        node.fields.insert("handler", Node::str(&self.handler));
        node.fields.insert("runtime", Node::str(&self.runtime));
        node.fields.insert("enableCORS", Node::bool(self.enable_cors));
        let environment: NodeMap = self
            .environment
            .iter()
            .map(|(k, v)| (k.clone(), Node::str(v)))
            .collect();
        node.fields.insert("environment", Node::Mapping(environment));
        node
    }
}

/// Working definition of one API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiSpec {
    pub name: String,
    pub requires_signin: bool,
    /// Pattern to handler, in registration order; proxy siblings included.
    pub paths: Vec<(String, FunctionSpec)>,
}

impl ApiSpec {
    pub fn new(name: &str, requires_signin: bool) -> ApiSpec {
        ApiSpec {
            name: name.to_string(),
            requires_signin,
            paths: Vec::new(),
        }
    }

    /// Paths as the operator entered them, without the proxy siblings.
    pub fn literal_paths(&self) -> Vec<String> {
        self.paths
            .iter()
            .filter(|(pattern, _)| !pattern.ends_with(PROXY_SUFFIX))
            .map(|(pattern, _)| pattern.clone())
            .collect()
    }

    /// Register an accepted pattern and its `{proxy+}` sibling.
    pub fn register_path(&mut self, pattern: &str, function: FunctionSpec) {
        self.paths.push((pattern.to_string(), function.clone()));
        self.paths
            .push((format!("{}{}", pattern, PROXY_SUFFIX), function));
    }

    pub fn remove_path(&mut self, pattern: &str) {
        let sibling = format!("{}{}", pattern, PROXY_SUFFIX);
        self.paths.retain(|(p, _)| p != pattern && *p != sibling);
    }

    fn from_node(node: &FeatureNode) -> Result<ApiSpec, BackspecError> {
        if node.kind != FeatureKind::Api {
            return Err(BackspecError::ValidationError(format!(
                "expected an API node, found {:?}",
                node.kind
            )));
        }
        let name = node
            .fields
            .get("name")
            .and_then(Node::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                BackspecError::ValidationError("API node is missing field 'name'".to_string())
            })?;
        let requires_signin = node
            .fields
            .get("requires-signin")
            .and_then(Node::as_bool)
            .unwrap_or(false);
        let mut paths = Vec::new();
        if let Some(map) = node.fields.get("paths").and_then(Node::as_mapping) {
            for (pattern, value) in map.iter() {
                let function = value.as_feature().ok_or_else(|| {
                    BackspecError::ValidationError(format!(
                        "path '{}' must hold a Function node",
                        pattern
                    ))
                })?;
                paths.push((pattern.to_string(), FunctionSpec::from_node(function)?));
            }
        }
        Ok(ApiSpec {
            name,
            requires_signin,
            paths,
        })
    }

    fn to_node(&self) -> FeatureNode {
        let mut node = FeatureNode::new(FeatureKind::Api);
        node.fields.insert("name", Node::str(&self.name));
        node.fields
            .insert("requires-signin", Node::bool(self.requires_signin));
        let paths: NodeMap = self
            .paths
            .iter()
            .map(|(pattern, function)| (pattern.clone(), Node::Feature(function.to_node())))
            .collect();
        node.fields.insert("paths", Node::Mapping(paths));
        node
    }
}

/// Dress the document's API map. Absent feature means no APIs.
pub fn load_apis(doc: &SpecificationDocument) -> Result<Vec<ApiSpec>, BackspecError> {
    let Some(feature) = doc.feature(FEATURE_NAME) else {
        return Ok(Vec::new());
    };
    let mut apis = Vec::new();
    if let Some(map) = feature.fields.get("apis").and_then(Node::as_mapping) {
        for (name, value) in map.iter() {
            let api = value
                .as_feature()
                .filter(|f| f.kind == FeatureKind::Api)
                .ok_or_else(|| {
                    BackspecError::ValidationError(format!("API '{}' is not a dressed node", name))
                })?;
            apis.push(ApiSpec::from_node(api)?);
        }
    }
    Ok(apis)
}

/// Re-derive the whole cloudlogic node; an empty map removes it entirely.
pub fn store_apis(doc: &mut SpecificationDocument, apis: &[ApiSpec]) {
    if apis.is_empty() {
        doc.remove_feature(FEATURE_NAME);
        return;
    }
    let mut node = FeatureNode::new(FeatureKind::CloudLogic);
    let map: NodeMap = apis
        .iter()
        .map(|api| (api.name.clone(), Node::Feature(api.to_node())))
        .collect();
    node.fields.insert("apis", Node::Mapping(map));
    doc.set_feature(FEATURE_NAME, node);
}

pub fn summarize(doc: &SpecificationDocument) -> Option<String> {
    doc.feature(FEATURE_NAME)?;
    let count = load_apis(doc).map(|apis| apis.len()).unwrap_or(0);
    Some(match count {
        1 => "1 API".to_string(),
        n => format!("{} APIs", n),
    })
}

/// Path acceptance rules, including both directions of prefix collision.
pub fn validate_path(pattern: &str, existing: &[String]) -> Result<(), String> {
    if pattern.is_empty() {
        return Err("path must not be empty".to_string());
    }
    if !pattern.starts_with('/') {
        return Err("path must start with '/'".to_string());
    }
    check::charset(pattern, path_charset(), "path")?;
    if pattern.len() == 1 || pattern[1..].split('/').any(str::is_empty) {
        return Err("path must not contain empty segments".to_string());
    }
    for taken in existing {
        if is_segment_prefix(taken, pattern) || is_segment_prefix(pattern, taken) {
            return Err(format!("path collides with existing '{}'", taken));
        }
    }
    Ok(())
}

fn is_segment_prefix(shorter: &str, longer: &str) -> bool {
    let a: Vec<&str> = shorter.split('/').filter(|s| !s.is_empty()).collect();
    let b: Vec<&str> = longer.split('/').filter(|s| !s.is_empty()).collect();
    a.len() <= b.len() && a == b[..a.len()]
}

/// Handler name derived from a table name: separators stripped, then the
/// last 20 characters when over-length.
pub fn derive_function_name(table_name: &str) -> String {
    let cleaned: String = table_name
        .chars()
        .filter(|c| !matches!(c, '-' | '.' | '_'))
        .collect();
    let count = cleaned.chars().count();
    if count <= MAX_FUNCTION_NAME {
        return cleaned;
    }
    cleaned
        .chars()
        .skip(count - MAX_FUNCTION_NAME)
        .collect()
}

/// User-scoped tables address rows through the caller, not a path parameter.
pub fn user_scoped(table: &TableSpec) -> bool {
    table.privacy.restricted()
}

/// `/<table>/object[/:hashKey][/:sortKey]`, hash key implicit when scoped.
pub fn object_path(table: &TableSpec) -> String {
    let mut path = format!("/{}/object", table.table_name);
    push_key_params(table, &mut path);
    path
}

/// The object path without `/object`.
pub fn list_path(table: &TableSpec) -> String {
    let mut path = format!("/{}", table.table_name);
    push_key_params(table, &mut path);
    path
}

fn push_key_params(table: &TableSpec, path: &mut String) {
    if !user_scoped(table) {
        path.push_str(&format!("/:{}", table.hash_key_name));
    }
    if let Some((sort, _)) = &table.sort_key {
        path.push_str(&format!("/:{}", sort));
    }
}

/// Token map handed to the template renderer; substitution happens elsewhere.
pub fn crud_template_request(table: &TableSpec, function_name: &str) -> TemplateRequest {
    let scoped = user_scoped(table);
    let mut tokens = BTreeMap::new();
    tokens.insert("tableName".to_string(), table.table_name.clone());
    tokens.insert("functionName".to_string(), function_name.to_string());
    tokens.insert("hasUserId".to_string(), scoped.to_string());
    tokens.insert("objectPath".to_string(), object_path(table));
    tokens.insert("listPath".to_string(), list_path(table));
    tokens.insert("hashKeyName".to_string(), table.hash_key_name.clone());
    tokens.insert(
        "hashKeyType".to_string(),
        table.hash_key_type.label().to_string(),
    );
    let (sort_name, sort_type) = match &table.sort_key {
        Some((name, ty)) => (name.clone(), ty.label().to_string()),
        None => (String::new(), String::new()),
    };
    tokens.insert("sortKeyName".to_string(), sort_name);
    tokens.insert("sortKeyType".to_string(), sort_type);
    tokens.insert("exampleObject".to_string(), example_object(table, scoped));

    TemplateRequest {
        template_id: CRUD_TEMPLATE_ID.to_string(),
        target_folder: format!("cloudlogic/{}", function_name),
        tokens,
    }
}

/// Example payload: every attribute, minus the owner key when user-scoped.
fn example_object(table: &TableSpec, scoped: bool) -> String {
    let mut object = serde_json::Map::new();
    for (name, ty) in &table.attributes {
        if scoped && name == OWNER_COLUMN {
            continue;
        }
        object.insert(name.clone(), sample_value(*ty));
    }
    serde_json::Value::Object(object).to_string()
}

fn sample_value(ty: ColumnType) -> serde_json::Value {
    use serde_json::json;
    match ty {
        ColumnType::String => json!("demo"),
        ColumnType::Number => json!(1),
        ColumnType::Binary => json!("SGVsbG8="),
        ColumnType::Boolean => json!(true),
        ColumnType::List => json!([]),
        ColumnType::Map => json!({}),
        ColumnType::Null => json!(null),
        ColumnType::StringSet => json!(["demo"]),
        ColumnType::NumberSet => json!([1]),
        ColumnType::BinarySet => json!(["SGVsbG8="]),
    }
}

/// Entry point for `backspec configure cloudlogic`.
pub fn configure(ctx: &mut EditorContext) -> Result<WorkflowOutcome, BackspecError> {
    let mut apis = load_apis(&ctx.document)?;
    let tables = database::load_tables(&ctx.document)?;
    let signin_enabled = signin::is_enabled(&ctx.document);

    let mut options = vec![("create", "Create a new API")];
    if !apis.is_empty() {
        options.push(("remove", "Remove an API"));
        options.push(("edit", "Edit an existing API"));
    }
    if !tables.is_empty() {
        options.push(("create-from-table", "Create a CRUD API for an existing table"));
    }
    let action = workflow::menu(
        ctx.prompter,
        "api-action",
        "Select from one of the choices below.",
        &options,
    )?;

    match action.as_str() {
        "create" => {
            create_api(ctx.prompter, signin_enabled, &mut apis)?;
        }
        "create-from-table" => {
            if !create_from_table(ctx, signin_enabled, &tables, &mut apis)? {
                return Ok(WorkflowOutcome::Declined);
            }
        }
        "edit" => {
            edit_api(ctx.prompter, signin_enabled, &mut apis)?;
        }
        "remove" => {
            if !remove_api(ctx.prompter, &mut apis)? {
                return Ok(WorkflowOutcome::Declined);
            }
        }
        other => {
            return Err(BackspecError::ValidationError(format!(
                "unknown API action '{}'",
                other
            )));
        }
    }

    store_apis(&mut ctx.document, &apis);
    Ok(WorkflowOutcome::Committed)
}

fn create_api(
    prompter: &mut dyn Prompter,
    signin_enabled: bool,
    apis: &mut Vec<ApiSpec>,
) -> Result<(), BackspecError> {
    output::heading("API configuration");

    let taken: Vec<String> = apis.iter().map(|api| api.name.clone()).collect();
    let name = workflow::ask_text(
        prompter,
        Question::text("api-name", "API name").with_validator(move |v| {
            check::non_empty(v, "API name")?;
            check::charset(v, api_name_pattern(), "API name")?;
            check::unique(v, &taken, "API")
        }),
    )?;
    let requires_signin = ask_requires_signin(prompter, signin_enabled)?;

    let mut api = ApiSpec::new(&name, requires_signin);
    for _ in 0..MAX_PATHS {
        add_path_chain(prompter, &mut api)?;
        if api.literal_paths().len() >= MAX_PATHS {
            output::notice("path limit reached");
            break;
        }
        if !workflow::confirm(prompter, "add-path", "Add another path?", false)? {
            break;
        }
    }

    output::ok(&format!("API '{}' configured", api.name));
    apis.push(api);
    Ok(())
}

/// Sign-in gating: the question only exists while sign-in is enabled.
fn ask_requires_signin(
    prompter: &mut dyn Prompter,
    signin_enabled: bool,
) -> Result<bool, BackspecError> {
    if !signin_enabled {
        return Ok(false);
    }
    workflow::confirm(
        prompter,
        "requires-signin",
        "Restrict API access to signed-in users?",
        false,
    )
}

/// One accepted path: pattern, handler name, and the proxy sibling.
fn add_path_chain(prompter: &mut dyn Prompter, api: &mut ApiSpec) -> Result<(), BackspecError> {
    let existing = api.literal_paths();
    let pattern = workflow::ask_text(
        prompter,
        Question::text("api-path", "HTTP path (e.g. /items)")
            .with_validator(move |v| validate_path(v, &existing)),
    )?;
    let function_name = workflow::ask_text(
        prompter,
        Question::text("function-name", "Handler function name").with_validator(|v| {
            check::non_empty(v, "function name")?;
            check::charset(v, function_name_pattern(), "function name")?;
            check::max_len(v, MAX_FUNCTION_NAME, "function name")
        }),
    )?;
    api.register_path(&pattern, FunctionSpec::with_defaults(&function_name));
    Ok(())
}

/// Returns false (no write) when no eligible table exists or the derived API
/// name is already taken.
fn create_from_table(
    ctx: &mut EditorContext,
    signin_enabled: bool,
    tables: &[TableSpec],
    apis: &mut Vec<ApiSpec>,
) -> Result<bool, BackspecError> {
    let choices: Vec<String> = tables.iter().map(|t| t.table_name.clone()).collect();
    let binary_tables: Vec<String> = tables
        .iter()
        .filter(|t| t.has_binary_attributes())
        .map(|t| t.table_name.clone())
        .collect();
    let picked = workflow::ask_text(
        ctx.prompter,
        Question::select("crud-table", "Select a table to wrap in a CRUD API", choices)
            .with_validator(move |v| {
                if binary_tables.iter().any(|t| t == v) {
                    return Err(format!(
                        "table '{}' has binary attributes and cannot back a CRUD API",
                        v
                    ));
                }
                Ok(())
            }),
    )?;
    let table = tables
        .iter()
        .find(|t| t.table_name == picked)
        .ok_or_else(|| BackspecError::NotFound(format!("table '{}'", picked)))?;

    if apis.iter().any(|api| api.name == table.table_name) {
        output::notice(&format!(
            "an API named '{}' already exists; nothing changed",
            table.table_name
        ));
        return Ok(false);
    }

    let requires_signin = ask_requires_signin(ctx.prompter, signin_enabled)?;
    let function_name = derive_function_name(&table.table_name);

    let mut api = ApiSpec::new(&table.table_name, requires_signin);
    api.register_path(
        &format!("/{}", table.table_name),
        FunctionSpec::with_defaults(&function_name),
    );
    apis.push(api);

    let request = crud_template_request(table, &function_name);
    ctx.renderer.render(&request)?;
    output::ok(&format!(
        "CRUD API '{}' configured (handler '{}')",
        table.table_name, function_name
    ));
    Ok(true)
}

fn edit_api(
    prompter: &mut dyn Prompter,
    signin_enabled: bool,
    apis: &mut [ApiSpec],
) -> Result<bool, BackspecError> {
    let names: Vec<String> = apis.iter().map(|api| api.name.clone()).collect();
    let picked = workflow::ask_text(
        prompter,
        Question::select("edit-api", "Select an API to edit", names),
    )?;
    let api = apis
        .iter_mut()
        .find(|api| api.name == picked)
        .ok_or_else(|| BackspecError::NotFound(format!("API '{}'", picked)))?;

    let mut options = vec![("add-path", "Add a path"), ("remove-path", "Remove a path")];
    if signin_enabled {
        options.push(("toggle-signin", "Toggle the signed-in requirement"));
    }
    let action = workflow::menu(
        prompter,
        "api-edit-action",
        "Select from one of the choices below.",
        &options,
    )?;

    match action.as_str() {
        "add-path" => {
            add_path_chain(prompter, api)?;
            Ok(true)
        }
        "remove-path" => {
            let choices = api.literal_paths();
            let pattern = workflow::ask_text(
                prompter,
                Question::select("remove-path", "Select a path to remove", choices),
            )?;
            api.remove_path(&pattern);
            Ok(true)
        }
        "toggle-signin" => {
            if !signin_enabled && !api.requires_signin {
                output::notice("sign-in is disabled; the requirement cannot be set");
                return Ok(false);
            }
            api.requires_signin = !api.requires_signin;
            output::ok(&format!(
                "API '{}' now {} signed-in callers",
                api.name,
                if api.requires_signin {
                    "requires"
                } else {
                    "does not require"
                }
            ));
            Ok(true)
        }
        other => Err(BackspecError::ValidationError(format!(
            "unknown edit action '{}'",
            other
        ))),
    }
}

/// Returns false when the delete confirmation is declined.
fn remove_api(
    prompter: &mut dyn Prompter,
    apis: &mut Vec<ApiSpec>,
) -> Result<bool, BackspecError> {
    let names: Vec<String> = apis.iter().map(|api| api.name.clone()).collect();
    let picked = workflow::ask_text(
        prompter,
        Question::select("delete-api", "Select an API to remove", names),
    )?;
    let accepted = workflow::confirm(
        prompter,
        "confirm-delete-api",
        &format!("Remove API '{}' from the project?", picked),
        false,
    )?;
    if !accepted {
        output::notice("API kept");
        return Ok(false);
    }
    apis.retain(|api| api.name != picked);
    Ok(true)
}
