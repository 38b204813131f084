//! NoSQL schema editor: tables, attributes, keys, indexes.
//!
//! Derivation rules enforced here:
//! - open tables (read and write for everyone) are `public` and carry no
//!   implicit owner column;
//! - restricted tables always gain an implicit `userId: string` scoping
//!   attribute; write-only visibility (`private`) also forces the hash key to
//!   `userId` without prompting;
//! - hash/sort keys, table and index alike, must name indexable attributes;
//! - a column referenced by any key cannot be removed;
//! - at most five indexes per table.
//!
//! Deleting the last table keeps the Database feature node in place with an
//! empty table list; the provisioning side treats that as "database feature
//! on, no tables yet".

use crate::core::catalog::{FeatureKind, FeatureNode, Node, NodeMap};
use crate::core::context::EditorContext;
use crate::core::document::SpecificationDocument;
use crate::core::error::BackspecError;
use crate::core::output;
use crate::core::prompt::{Answer, Prompter, Question};
use crate::core::workflow::{self, WorkflowOutcome, check};
use regex::Regex;
use std::sync::OnceLock;

pub const FEATURE_NAME: &str = "database";
const COMPONENT_KEY: &str = "database-nosql";

/// Implicit scoping column injected into every restricted table.
pub const OWNER_COLUMN: &str = "userId";

pub const MAX_INDEXES: usize = 5;
const MAX_COLUMNS: usize = 50;
const NO_SORT_KEY: &str = "(no sort key)";

fn table_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("^[A-Za-z0-9._-]+$").expect("static pattern"))
}

fn column_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("^[A-Za-z0-9_-]+$").expect("static pattern"))
}

/// The ten supported column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Number,
    Binary,
    Boolean,
    List,
    Map,
    Null,
    StringSet,
    NumberSet,
    BinarySet,
}

impl ColumnType {
    pub const ALL: [ColumnType; 10] = [
        ColumnType::String,
        ColumnType::Number,
        ColumnType::Binary,
        ColumnType::Boolean,
        ColumnType::List,
        ColumnType::Map,
        ColumnType::Null,
        ColumnType::StringSet,
        ColumnType::NumberSet,
        ColumnType::BinarySet,
    ];

    /// Types usable as a hash or sort key.
    pub const INDEXABLE: [ColumnType; 3] =
        [ColumnType::String, ColumnType::Number, ColumnType::Binary];

    pub fn label(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Binary => "binary",
            ColumnType::Boolean => "boolean",
            ColumnType::List => "list",
            ColumnType::Map => "map",
            ColumnType::Null => "null",
            ColumnType::StringSet => "string-set",
            ColumnType::NumberSet => "number-set",
            ColumnType::BinarySet => "binary-set",
        }
    }

    pub fn from_label(label: &str) -> Option<ColumnType> {
        ColumnType::ALL.iter().copied().find(|t| t.label() == label)
    }

    pub fn indexable(&self) -> bool {
        ColumnType::INDEXABLE.contains(self)
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, ColumnType::Binary | ColumnType::BinarySet)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TablePrivacy {
    Public,
    Protected,
    Private,
}

impl TablePrivacy {
    pub fn label(&self) -> &'static str {
        match self {
            TablePrivacy::Public => "public",
            TablePrivacy::Protected => "protected",
            TablePrivacy::Private => "private",
        }
    }

    pub fn from_label(label: &str) -> Option<TablePrivacy> {
        match label {
            "public" => Some(TablePrivacy::Public),
            "protected" => Some(TablePrivacy::Protected),
            "private" => Some(TablePrivacy::Private),
            _ => None,
        }
    }

    /// Restricted tables carry the implicit owner column and are user-scoped
    /// in CRUD derivation.
    pub fn restricted(&self) -> bool {
        !matches!(self, TablePrivacy::Public)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub index_name: String,
    pub hash_key_name: String,
    pub hash_key_type: ColumnType,
    pub sort_key: Option<(String, ColumnType)>,
}

/// Working definition of one table, dressed from its `NoSQLTable` node.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub table_name: String,
    /// Column name to type, in insertion order.
    pub attributes: Vec<(String, ColumnType)>,
    pub hash_key_name: String,
    pub hash_key_type: ColumnType,
    pub sort_key: Option<(String, ColumnType)>,
    pub privacy: TablePrivacy,
    pub dynamic_prefix: bool,
    pub indexes: Vec<IndexSpec>,
}

impl TableSpec {
    pub fn attribute_type(&self, name: &str) -> Option<ColumnType> {
        self.attributes
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, ty)| *ty)
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn indexable_attribute_names(&self) -> Vec<String> {
        self.attributes
            .iter()
            .filter(|(_, ty)| ty.indexable())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Every column referenced as a hash or sort key, table or index.
    pub fn key_columns(&self) -> Vec<String> {
        let mut keys = vec![self.hash_key_name.clone()];
        if let Some((name, _)) = &self.sort_key {
            keys.push(name.clone());
        }
        for index in &self.indexes {
            keys.push(index.hash_key_name.clone());
            if let Some((name, _)) = &index.sort_key {
                keys.push(name.clone());
            }
        }
        keys
    }

    pub fn has_binary_attributes(&self) -> bool {
        self.attributes.iter().any(|(_, ty)| ty.is_binary())
    }

    pub fn from_node(node: &FeatureNode) -> Result<TableSpec, BackspecError> {
        if node.kind != FeatureKind::NoSqlTable {
            return Err(BackspecError::ValidationError(format!(
                "expected a NoSQLTable node, found {:?}",
                node.kind
            )));
        }
        let fields = &node.fields;
        let table_name = require_str(fields, "tableName")?;
        let mut attributes = Vec::new();
        if let Some(map) = fields.get("attributes").and_then(Node::as_mapping) {
            for (name, value) in map.iter() {
                let label = value.as_str().ok_or_else(|| {
                    bad_field(&table_name, &format!("attribute '{}' has no type", name))
                })?;
                attributes.push((name.to_string(), parse_type(&table_name, label)?));
            }
        }
        let hash_key_name = require_str(fields, "hashKeyName")?;
        let hash_key_type = parse_type(&table_name, &require_str(fields, "hashKeyType")?)?;
        let sort_key = match fields.get("sortKeyName").and_then(Node::as_str) {
            Some(name) if !name.is_empty() => {
                let ty = parse_type(&table_name, &require_str(fields, "sortKeyType")?)?;
                Some((name.to_string(), ty))
            }
            _ => None,
        };
        let privacy = fields
            .get("tablePrivacy")
            .and_then(Node::as_str)
            .and_then(TablePrivacy::from_label)
            .ok_or_else(|| bad_field(&table_name, "missing or unknown tablePrivacy"))?;
        let dynamic_prefix = fields
            .get("dynamicPrefix")
            .and_then(Node::as_bool)
            .unwrap_or(true);
        let mut indexes = Vec::new();
        if let Some(items) = fields.get("indexes").and_then(Node::as_sequence) {
            for item in items {
                let index = item
                    .as_feature()
                    .filter(|f| f.kind == FeatureKind::NoSqlIndex)
                    .ok_or_else(|| bad_field(&table_name, "indexes must hold NoSQLIndex nodes"))?;
                indexes.push(index_from_node(&table_name, index)?);
            }
        }
        Ok(TableSpec {
            table_name,
            attributes,
            hash_key_name,
            hash_key_type,
            sort_key,
            privacy,
            dynamic_prefix,
            indexes,
        })
    }

    pub fn to_node(&self) -> FeatureNode {
        let mut node = FeatureNode::new(FeatureKind::NoSqlTable);
        node.fields.insert("tableName", Node::str(&self.table_name));
        let attributes: NodeMap = self
            .attributes
            .iter()
            .map(|(name, ty)| (name.clone(), Node::str(ty.label())))
            .collect();
        node.fields.insert("attributes", Node::Mapping(attributes));
        node.fields
            .insert("hashKeyName", Node::str(&self.hash_key_name));
        node.fields
            .insert("hashKeyType", Node::str(self.hash_key_type.label()));
        if let Some((name, ty)) = &self.sort_key {
            node.fields.insert("sortKeyName", Node::str(name));
            node.fields.insert("sortKeyType", Node::str(ty.label()));
        }
        node.fields
            .insert("tablePrivacy", Node::str(self.privacy.label()));
        node.fields
            .insert("dynamicPrefix", Node::bool(self.dynamic_prefix));
        node.fields.insert(
            "indexes",
            Node::Sequence(
                self.indexes
                    .iter()
                    .map(|index| Node::Feature(index_to_node(index)))
                    .collect(),
            ),
        );
        node
    }
}

fn index_from_node(table: &str, node: &FeatureNode) -> Result<IndexSpec, BackspecError> {
    let fields = &node.fields;
    let index_name = require_str(fields, "indexName")?;
    let hash_key_name = require_str(fields, "hashKeyName")?;
    let hash_key_type = parse_type(table, &require_str(fields, "hashKeyType")?)?;
    let sort_key = match fields.get("sortKeyName").and_then(Node::as_str) {
        Some(name) if !name.is_empty() => {
            let ty = parse_type(table, &require_str(fields, "sortKeyType")?)?;
            Some((name.to_string(), ty))
        }
        _ => None,
    };
    Ok(IndexSpec {
        index_name,
        hash_key_name,
        hash_key_type,
        sort_key,
    })
}

fn index_to_node(index: &IndexSpec) -> FeatureNode {
    let mut node = FeatureNode::new(FeatureKind::NoSqlIndex);
    node.fields.insert("indexName", Node::str(&index.index_name));
    node.fields
        .insert("hashKeyName", Node::str(&index.hash_key_name));
    node.fields
        .insert("hashKeyType", Node::str(index.hash_key_type.label()));
    if let Some((name, ty)) = &index.sort_key {
        node.fields.insert("sortKeyName", Node::str(name));
        node.fields.insert("sortKeyType", Node::str(ty.label()));
    }
    node
}

fn require_str(fields: &NodeMap, key: &str) -> Result<String, BackspecError> {
    fields
        .get(key)
        .and_then(Node::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            BackspecError::ValidationError(format!("table node is missing field '{}'", key))
        })
}

fn parse_type(table: &str, label: &str) -> Result<ColumnType, BackspecError> {
    ColumnType::from_label(label).ok_or_else(|| bad_field(table, &format!("unknown type '{}'", label)))
}

fn bad_field(table: &str, detail: &str) -> BackspecError {
    BackspecError::ValidationError(format!("table '{}': {}", table, detail))
}

/// Dress the document's table list. Absent feature means no tables.
pub fn load_tables(doc: &SpecificationDocument) -> Result<Vec<TableSpec>, BackspecError> {
    let Some(database) = doc.feature(FEATURE_NAME) else {
        return Ok(Vec::new());
    };
    let Some(nosql) = database
        .fields
        .get("components")
        .and_then(Node::as_mapping)
        .and_then(|components| components.get(COMPONENT_KEY))
        .and_then(Node::as_feature)
        .filter(|f| f.kind == FeatureKind::NoSqlDatabase)
    else {
        return Ok(Vec::new());
    };
    let mut tables = Vec::new();
    if let Some(items) = nosql.fields.get("tables").and_then(Node::as_sequence) {
        for item in items {
            let table = item
                .as_feature()
                .filter(|f| f.kind == FeatureKind::NoSqlTable)
                .ok_or_else(|| {
                    BackspecError::ValidationError(
                        "database tables must hold NoSQLTable nodes".to_string(),
                    )
                })?;
            tables.push(TableSpec::from_node(table)?);
        }
    }
    Ok(tables)
}

/// Trim the table list back into the document. The Database node is written
/// even when the list is empty.
pub fn store_tables(doc: &mut SpecificationDocument, tables: &[TableSpec]) {
    let mut nosql = FeatureNode::new(FeatureKind::NoSqlDatabase);
    nosql.fields.insert(
        "tables",
        Node::Sequence(
            tables
                .iter()
                .map(|table| Node::Feature(table.to_node()))
                .collect(),
        ),
    );
    let mut components = NodeMap::new();
    components.insert(COMPONENT_KEY, Node::Feature(nosql));
    let mut database = FeatureNode::new(FeatureKind::Database);
    database
        .fields
        .insert("components", Node::Mapping(components));
    doc.set_feature(FEATURE_NAME, database);
}

/// One-line status for `backspec features` / `backspec show`.
pub fn summarize(doc: &SpecificationDocument) -> Option<String> {
    doc.feature(FEATURE_NAME)?;
    let count = load_tables(doc).map(|tables| tables.len()).unwrap_or(0);
    Some(match count {
        1 => "1 table".to_string(),
        n => format!("{} tables", n),
    })
}

/// Entry point for `backspec configure database`.
pub fn configure(ctx: &mut EditorContext) -> Result<WorkflowOutcome, BackspecError> {
    let mut tables = load_tables(&ctx.document)?;

    let mut options = vec![("create", "Create a new table")];
    if !tables.is_empty() {
        options.push(("edit", "Edit an existing table"));
        options.push(("remove", "Remove a table"));
    }
    let action = workflow::menu(
        ctx.prompter,
        "database-action",
        "Select from one of the choices below.",
        &options,
    )?;

    match action.as_str() {
        "create" => {
            let suppress = ctx.config.suppress_table_prefix;
            create_table(ctx.prompter, !suppress, &mut tables)?;
        }
        "edit" => {
            edit_table(ctx.prompter, &mut tables)?;
        }
        "remove" => {
            if !remove_table(ctx.prompter, &mut tables)? {
                return Ok(WorkflowOutcome::Declined);
            }
        }
        other => {
            return Err(BackspecError::ValidationError(format!(
                "unknown database action '{}'",
                other
            )));
        }
    }

    store_tables(&mut ctx.document, &tables);
    Ok(WorkflowOutcome::Committed)
}

fn create_table(
    prompter: &mut dyn Prompter,
    dynamic_prefix: bool,
    tables: &mut Vec<TableSpec>,
) -> Result<(), BackspecError> {
    output::heading("Table configuration");

    let access = workflow::menu(
        prompter,
        "table-access",
        "Should the data of this table be open or restricted by user?",
        &[("open", "Open"), ("restricted", "Restricted")],
    )?;
    let privacy = if access == "open" {
        TablePrivacy::Public
    } else {
        let readable = workflow::confirm(
            prompter,
            "table-readable",
            "Should signed-in users be able to read entries they do not own?",
            true,
        )?;
        if readable {
            TablePrivacy::Protected
        } else {
            TablePrivacy::Private
        }
    };

    let taken: Vec<String> = tables.iter().map(|t| t.table_name.clone()).collect();
    let table_name = workflow::ask_text(
        prompter,
        Question::text("table-name", "Table name").with_validator(move |v| {
            check::non_empty(v, "table name")?;
            check::charset(v, table_name_pattern(), "table name")?;
            check::unique(v, &taken, "table")
        }),
    )?;

    let mut attributes: Vec<(String, ColumnType)> = Vec::new();
    if privacy.restricted() {
        attributes.push((OWNER_COLUMN.to_string(), ColumnType::String));
    }

    output::heading("Columns");
    for _ in 0..MAX_COLUMNS {
        let (name, ty) = ask_column(prompter, &attributes)?;
        attributes.push((name, ty));
        if attributes.len() >= MAX_COLUMNS {
            output::notice("column limit reached");
            break;
        }
        if !workflow::confirm(prompter, "add-column", "Add another column?", false)? {
            break;
        }
    }

    let hash_key_name = if privacy == TablePrivacy::Private {
        OWNER_COLUMN.to_string()
    } else {
        let choices: Vec<String> = attributes
            .iter()
            .filter(|(_, ty)| ty.indexable())
            .map(|(name, _)| name.clone())
            .collect();
        workflow::ask_text(
            prompter,
            Question::select("primary-key", "Select the primary key", choices),
        )?
    };
    let hash_key_type = attribute_type(&attributes, &hash_key_name)?;

    let sort_key = ask_sort_key(prompter, "sort-key", &attributes, &hash_key_name)?;

    let mut indexes: Vec<IndexSpec> = Vec::new();
    if workflow::confirm(prompter, "add-index", "Add an index to this table?", false)? {
        while indexes.len() < MAX_INDEXES {
            let index = ask_index(prompter, &attributes, &indexes)?;
            indexes.push(index);
            if indexes.len() == MAX_INDEXES {
                output::notice(&format!("index limit reached ({})", MAX_INDEXES));
                break;
            }
            if !workflow::confirm(prompter, "add-another-index", "Add another index?", false)? {
                break;
            }
        }
    }

    output::ok(&format!("table '{}' configured", table_name));
    tables.push(TableSpec {
        table_name,
        attributes,
        hash_key_name,
        hash_key_type,
        sort_key,
        privacy,
        dynamic_prefix,
        indexes,
    });
    Ok(())
}

/// One column: name, then type. The first column of an empty attribute set is
/// limited to indexable types so the table always has a usable key.
fn ask_column(
    prompter: &mut dyn Prompter,
    attributes: &[(String, ColumnType)],
) -> Result<(String, ColumnType), BackspecError> {
    let taken: Vec<String> = attributes.iter().map(|(name, _)| name.clone()).collect();
    let name = workflow::ask_text(
        prompter,
        Question::text("column-name", "Column name").with_validator(move |v| {
            check::non_empty(v, "column name")?;
            check::charset(v, column_name_pattern(), "column name")?;
            check::unique(v, &taken, "column")
        }),
    )?;

    let type_choices: Vec<String> = if attributes.is_empty() {
        ColumnType::INDEXABLE.iter().map(|t| t.label().to_string()).collect()
    } else {
        ColumnType::ALL.iter().map(|t| t.label().to_string()).collect()
    };
    let label = workflow::ask_text(
        prompter,
        Question::select(
            "column-type",
            format!("Type of column '{}'", name),
            type_choices,
        ),
    )?;
    let ty = ColumnType::from_label(&label).ok_or_else(|| {
        BackspecError::ValidationError(format!("unknown column type '{}'", label))
    })?;
    Ok((name, ty))
}

/// Sort-key menu: indexable attributes minus the hash key, with "no sort key"
/// always offered first.
fn ask_sort_key(
    prompter: &mut dyn Prompter,
    name: &str,
    attributes: &[(String, ColumnType)],
    exclude: &str,
) -> Result<Option<(String, ColumnType)>, BackspecError> {
    let mut choices = vec![NO_SORT_KEY.to_string()];
    choices.extend(
        attributes
            .iter()
            .filter(|(attr, ty)| ty.indexable() && attr != exclude)
            .map(|(attr, _)| attr.clone()),
    );
    let picked = workflow::ask_text(
        prompter,
        Question::select(name, "Select a sort key", choices)
            .with_default(Answer::text(NO_SORT_KEY)),
    )?;
    if picked == NO_SORT_KEY {
        return Ok(None);
    }
    let ty = attribute_type(attributes, &picked)?;
    Ok(Some((picked, ty)))
}

fn ask_index(
    prompter: &mut dyn Prompter,
    attributes: &[(String, ColumnType)],
    existing: &[IndexSpec],
) -> Result<IndexSpec, BackspecError> {
    let taken: Vec<String> = existing.iter().map(|i| i.index_name.clone()).collect();
    let index_name = workflow::ask_text(
        prompter,
        Question::text("index-name", "Index name").with_validator(move |v| {
            check::non_empty(v, "index name")?;
            check::charset(v, table_name_pattern(), "index name")?;
            check::unique(v, &taken, "index")
        }),
    )?;

    let choices: Vec<String> = attributes
        .iter()
        .filter(|(_, ty)| ty.indexable())
        .map(|(name, _)| name.clone())
        .collect();
    let hash_key_name = workflow::ask_text(
        prompter,
        Question::select("index-primary-key", "Select the index primary key", choices),
    )?;
    let hash_key_type = attribute_type(attributes, &hash_key_name)?;
    let sort_key = ask_sort_key(prompter, "index-sort-key", attributes, &hash_key_name)?;

    Ok(IndexSpec {
        index_name,
        hash_key_name,
        hash_key_type,
        sort_key,
    })
}

fn attribute_type(
    attributes: &[(String, ColumnType)],
    name: &str,
) -> Result<ColumnType, BackspecError> {
    attributes
        .iter()
        .find(|(attr, _)| attr == name)
        .map(|(_, ty)| *ty)
        .ok_or_else(|| {
            BackspecError::ValidationError(format!("'{}' is not a column of this table", name))
        })
}

/// Edit menu against one existing table. Returns whether anything changed;
/// rejected operations leave the working state untouched.
fn edit_table(
    prompter: &mut dyn Prompter,
    tables: &mut [TableSpec],
) -> Result<bool, BackspecError> {
    let names: Vec<String> = tables.iter().map(|t| t.table_name.clone()).collect();
    let picked = workflow::ask_text(
        prompter,
        Question::select("edit-table", "Select a table to edit", names),
    )?;
    let table = tables
        .iter_mut()
        .find(|t| t.table_name == picked)
        .ok_or_else(|| BackspecError::NotFound(format!("table '{}'", picked)))?;

    let action = workflow::menu(
        prompter,
        "table-edit-action",
        "Select from one of the choices below.",
        &[
            ("add-column", "Add a column"),
            ("remove-column", "Remove a column"),
            ("add-index", "Add an index"),
            ("remove-index", "Remove an index"),
        ],
    )?;

    match action.as_str() {
        "add-column" => {
            let (name, ty) = ask_column(prompter, &table.attributes)?;
            table.attributes.push((name, ty));
            Ok(true)
        }
        "remove-column" => {
            let choices = table.attribute_names();
            let column = workflow::ask_text(
                prompter,
                Question::select("remove-column", "Select a column to remove", choices),
            )?;
            if table.key_columns().contains(&column) {
                output::notice(&format!(
                    "'{}' is referenced as a key and cannot be removed",
                    column
                ));
                return Ok(false);
            }
            if table.privacy.restricted() && column == OWNER_COLUMN {
                output::notice(&format!(
                    "'{}' scopes entries on restricted tables and cannot be removed",
                    OWNER_COLUMN
                ));
                return Ok(false);
            }
            table.attributes.retain(|(name, _)| *name != column);
            Ok(true)
        }
        "add-index" => {
            if table.indexes.len() >= MAX_INDEXES {
                output::notice(&format!(
                    "table '{}' already has {} indexes",
                    table.table_name, MAX_INDEXES
                ));
                return Ok(false);
            }
            let index = ask_index(prompter, &table.attributes, &table.indexes)?;
            table.indexes.push(index);
            Ok(true)
        }
        "remove-index" => {
            if table.indexes.is_empty() {
                output::notice("this table has no indexes");
                return Ok(false);
            }
            let choices: Vec<String> =
                table.indexes.iter().map(|i| i.index_name.clone()).collect();
            let picked = workflow::ask_text(
                prompter,
                Question::select("remove-index", "Select an index to remove", choices),
            )?;
            table.indexes.retain(|i| i.index_name != picked);
            Ok(true)
        }
        other => Err(BackspecError::ValidationError(format!(
            "unknown edit action '{}'",
            other
        ))),
    }
}

/// Returns false when the delete confirmation is declined.
fn remove_table(
    prompter: &mut dyn Prompter,
    tables: &mut Vec<TableSpec>,
) -> Result<bool, BackspecError> {
    let names: Vec<String> = tables.iter().map(|t| t.table_name.clone()).collect();
    let picked = workflow::ask_text(
        prompter,
        Question::select("delete-table", "Select a table to delete", names),
    )?;
    let accepted = workflow::confirm(
        prompter,
        "confirm-delete-table",
        &format!("Delete table '{}' from the project?", picked),
        false,
    )?;
    if !accepted {
        output::notice("table kept");
        return Ok(false);
    }
    tables.retain(|t| t.table_name != picked);
    Ok(true)
}
