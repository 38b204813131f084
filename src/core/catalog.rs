//! Tagged-variant catalog and the round-trip decode/encode traversal.
//!
//! The on-disk project document is YAML in which select mapping nodes carry a
//! `backspec.v0.<Variant>` tag. Decoding "dresses" every tagged mapping into a
//! [`FeatureNode`] whose kind comes from the closed [`FeatureKind`] catalog;
//! encoding "trims" the node back into a tagged raw mapping. Unknown tags are
//! a hard error: a document written by a newer catalog must be rejected
//! loudly, never silently stripped.
//!
//! Adding a feature kind means one new enum variant and two match arms, not
//! new traversal code. The traversal assumes a tree (no cycles).

use crate::core::error::BackspecError;
use serde_yaml::Value as YamlValue;
use serde_yaml::value::{Tag, TaggedValue};

/// Namespace prefix stamped on every discriminator tag.
pub const TAG_PREFIX: &str = "backspec.v0.";

/// The closed catalog of node variants recognized in a project document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Project,
    SignIn,
    UserDirectoryIdentity,
    FacebookIdentity,
    GoogleIdentity,
    Database,
    NoSqlDatabase,
    NoSqlTable,
    NoSqlIndex,
    CloudLogic,
    Api,
    Function,
    ContentDelivery,
    Bucket,
    UserFiles,
    Pinpoint,
}

impl FeatureKind {
    /// Every catalog entry, in declaration order.
    pub const ALL: &'static [FeatureKind] = &[
        FeatureKind::Project,
        FeatureKind::SignIn,
        FeatureKind::UserDirectoryIdentity,
        FeatureKind::FacebookIdentity,
        FeatureKind::GoogleIdentity,
        FeatureKind::Database,
        FeatureKind::NoSqlDatabase,
        FeatureKind::NoSqlTable,
        FeatureKind::NoSqlIndex,
        FeatureKind::CloudLogic,
        FeatureKind::Api,
        FeatureKind::Function,
        FeatureKind::ContentDelivery,
        FeatureKind::Bucket,
        FeatureKind::UserFiles,
        FeatureKind::Pinpoint,
    ];

    /// The full discriminator string written as the YAML tag.
    pub fn discriminator(&self) -> &'static str {
        match self {
            FeatureKind::Project => "backspec.v0.Project",
            FeatureKind::SignIn => "backspec.v0.SignIn",
            FeatureKind::UserDirectoryIdentity => "backspec.v0.UserDirectoryIdentity",
            FeatureKind::FacebookIdentity => "backspec.v0.FacebookIdentity",
            FeatureKind::GoogleIdentity => "backspec.v0.GoogleIdentity",
            FeatureKind::Database => "backspec.v0.Database",
            FeatureKind::NoSqlDatabase => "backspec.v0.NoSQLDatabase",
            FeatureKind::NoSqlTable => "backspec.v0.NoSQLTable",
            FeatureKind::NoSqlIndex => "backspec.v0.NoSQLIndex",
            FeatureKind::CloudLogic => "backspec.v0.CloudLogic",
            FeatureKind::Api => "backspec.v0.API",
            FeatureKind::Function => "backspec.v0.Function",
            FeatureKind::ContentDelivery => "backspec.v0.ContentDelivery",
            FeatureKind::Bucket => "backspec.v0.Bucket",
            FeatureKind::UserFiles => "backspec.v0.UserFiles",
            FeatureKind::Pinpoint => "backspec.v0.Pinpoint",
        }
    }

    /// Resolve a discriminator string back to its catalog entry.
    pub fn from_discriminator(tag: &str) -> Option<FeatureKind> {
        FeatureKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.discriminator() == tag)
    }
}

/// In-memory typed tree. Mapping entries preserve insertion order.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(YamlValue),
    Sequence(Vec<Node>),
    Mapping(NodeMap),
    Feature(FeatureNode),
}

/// A dressed node: catalog kind plus its fields, copied verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureNode {
    pub kind: FeatureKind,
    pub fields: NodeMap,
}

impl FeatureNode {
    pub fn new(kind: FeatureKind) -> Self {
        FeatureNode {
            kind,
            fields: NodeMap::new(),
        }
    }
}

/// Ordered string-keyed map used for mappings and feature fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeMap {
    entries: Vec<(String, Node)>,
}

impl NodeMap {
    pub fn new() -> Self {
        NodeMap::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Replace in place when the key exists, append otherwise.
    pub fn insert(&mut self, key: impl Into<String>, value: Node) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Node> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl FromIterator<(String, Node)> for NodeMap {
    fn from_iter<T: IntoIterator<Item = (String, Node)>>(iter: T) -> Self {
        NodeMap {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Node {
    pub fn str(value: impl Into<String>) -> Node {
        Node::Scalar(YamlValue::String(value.into()))
    }

    pub fn bool(value: bool) -> Node {
        Node::Scalar(YamlValue::Bool(value))
    }

    pub fn number(value: u64) -> Node {
        Node::Scalar(YamlValue::Number(value.into()))
    }

    pub fn empty_mapping() -> Node {
        Node::Mapping(NodeMap::new())
    }

    pub fn empty_sequence() -> Node {
        Node::Sequence(Vec::new())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar(YamlValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Scalar(YamlValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Node::Scalar(YamlValue::Number(n)) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&NodeMap> {
        match self {
            Node::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_feature(&self) -> Option<&FeatureNode> {
        match self {
            Node::Feature(node) => Some(node),
            _ => None,
        }
    }
}

/// Dress a raw YAML tree into the typed tree, bottom-up.
///
/// Tagged mappings become [`Node::Feature`] with the kind resolved through the
/// catalog; everything else passes through structurally unchanged. Fails fast
/// on unknown tags, tags on non-mapping nodes, and non-string mapping keys —
/// no partial tree is ever returned.
pub fn decode(raw: &YamlValue) -> Result<Node, BackspecError> {
    match raw {
        YamlValue::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            let discriminator = tag.trim_start_matches('!');
            let kind = FeatureKind::from_discriminator(discriminator).ok_or_else(|| {
                BackspecError::DiscriminatorError(format!(
                    "tag '{}' is not in the variant catalog",
                    discriminator
                ))
            })?;
            let YamlValue::Mapping(mapping) = &tagged.value else {
                return Err(BackspecError::DiscriminatorError(format!(
                    "tag '{}' must dress a mapping node",
                    discriminator
                )));
            };
            Ok(Node::Feature(FeatureNode {
                kind,
                fields: decode_mapping(mapping)?,
            }))
        }
        YamlValue::Mapping(mapping) => Ok(Node::Mapping(decode_mapping(mapping)?)),
        YamlValue::Sequence(items) => Ok(Node::Sequence(
            items.iter().map(decode).collect::<Result<_, _>>()?,
        )),
        scalar => Ok(Node::Scalar(scalar.clone())),
    }
}

fn decode_mapping(mapping: &serde_yaml::Mapping) -> Result<NodeMap, BackspecError> {
    let mut out = NodeMap::new();
    for (key, value) in mapping {
        let key = key.as_str().ok_or_else(|| {
            BackspecError::ValidationError("document mapping keys must be strings".to_string())
        })?;
        out.insert(key.to_string(), decode(value)?);
    }
    Ok(out)
}

/// Trim a typed tree back into raw YAML, the mirror of [`decode`].
pub fn encode(node: &Node) -> YamlValue {
    match node {
        Node::Scalar(value) => value.clone(),
        Node::Sequence(items) => YamlValue::Sequence(items.iter().map(encode).collect()),
        Node::Mapping(map) => YamlValue::Mapping(encode_mapping(map)),
        Node::Feature(feature) => YamlValue::Tagged(Box::new(TaggedValue {
            tag: Tag::new(feature.kind.discriminator()),
            value: YamlValue::Mapping(encode_mapping(&feature.fields)),
        })),
    }
}

fn encode_mapping(map: &NodeMap) -> serde_yaml::Mapping {
    let mut out = serde_yaml::Mapping::new();
    for (key, value) in map.iter() {
        out.insert(YamlValue::String(key.to_string()), encode(value));
    }
    out
}
