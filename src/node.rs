//! Crawl result tree.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MetadataError;

/// Value written in place of credential fields.
pub const REDACTED: &str = "(removed)";

/// Key-value fields that never leave the crawler unredacted.
pub const SENSITIVE_KEYS: [&str; 3] = ["Token", "AccessKeyId", "SecretAccessKey"];

/// Task list returned by the ECS agent's `/v1/tasks` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct TaskListing {
    #[serde(deserialize_with = "null_as_default")]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Task {
    #[serde(deserialize_with = "null_as_default")]
    pub arn: String,
    #[serde(deserialize_with = "null_as_default")]
    pub desired_status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub known_status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub family: String,
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Container {
    #[serde(deserialize_with = "null_as_default")]
    pub docker_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub docker_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

/// The ECS agent writes `null` for empty slices and unset strings.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A metadata value with no children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Leaf {
    /// A flat JSON object of strings, already redacted.
    KeyValue(BTreeMap<String, String>),
    /// A non-empty ECS task listing.
    Tasks(TaskListing),
    /// Anything else, verbatim.
    Text(String),
}

impl Leaf {
    /// Classify a response body by trying each shape in turn.
    ///
    /// The metadata services give no reliable content type, so the first
    /// shape that parses wins: string map, then task listing, then text.
    /// A bare `null` and `null` values count as empty.
    pub fn classify(body: String) -> Self {
        if let Ok(map) = serde_json::from_str::<Option<BTreeMap<String, Option<String>>>>(&body) {
            let mut map: BTreeMap<String, String> = map
                .unwrap_or_default()
                .into_iter()
                .map(|(key, value)| (key, value.unwrap_or_default()))
                .collect();
            redact(&mut map);
            return Leaf::KeyValue(map);
        }
        if let Ok(listing) = serde_json::from_str::<TaskListing>(&body) {
            if !listing.tasks.is_empty() {
                return Leaf::Tasks(listing);
            }
        }
        Leaf::Text(body)
    }

    pub fn as_key_value(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Leaf::KeyValue(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_tasks(&self) -> Option<&TaskListing> {
        match self {
            Leaf::Tasks(listing) => Some(listing),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Leaf::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Overwrite any credential fields present in `map`.
pub fn redact(map: &mut BTreeMap<String, String>) {
    for key in SENSITIVE_KEYS {
        if let Some(value) = map.get_mut(key) {
            *value = REDACTED.to_string();
        }
    }
}

/// The result of crawling one URL.
#[derive(Debug)]
pub enum MetadataNode {
    Leaf(Leaf),
    /// Children keyed by the name they were discovered under.
    Directory(BTreeMap<String, MetadataNode>),
    /// This node could not be fetched; siblings are unaffected.
    Failure(MetadataError),
}

impl MetadataNode {
    /// Wrap a fetch result, keeping the error in the tree.
    pub fn from_result<T: Into<MetadataNode>>(result: Result<T, MetadataError>) -> Self {
        match result {
            Ok(value) => value.into(),
            Err(err) => MetadataNode::Failure(err),
        }
    }

    /// Child `key` of a directory.
    pub fn get(&self, key: &str) -> Option<&MetadataNode> {
        self.as_directory().and_then(|children| children.get(key))
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            MetadataNode::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// Shortcut for a text leaf.
    pub fn as_text(&self) -> Option<&str> {
        self.as_leaf().and_then(Leaf::as_text)
    }

    pub fn as_directory(&self) -> Option<&BTreeMap<String, MetadataNode>> {
        match self {
            MetadataNode::Directory(children) => Some(children),
            _ => None,
        }
    }

    pub fn as_failure(&self) -> Option<&MetadataError> {
        match self {
            MetadataNode::Failure(err) => Some(err),
            _ => None,
        }
    }

    /// Render as a JSON value.
    pub fn to_value(&self) -> serde_json::Value {
        // a tree of strings and maps always serializes
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl From<Leaf> for MetadataNode {
    fn from(leaf: Leaf) -> Self {
        MetadataNode::Leaf(leaf)
    }
}

impl Serialize for MetadataNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetadataNode::Leaf(leaf) => leaf.serialize(serializer),
            MetadataNode::Directory(children) => serializer.collect_map(children),
            MetadataNode::Failure(err) => serialize_error(err, serializer),
        }
    }
}

/// Errors are published as `{"error": "<message>"}`.
pub(crate) fn serialize_error<S: Serializer>(
    err: &MetadataError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry("error", &err.to_string())?;
    map.end()
}
