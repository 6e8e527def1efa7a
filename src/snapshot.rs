//! Top-level snapshot of every metadata source.

use std::path::Path;

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::crawler::Crawler;
use crate::error::MetadataError;
use crate::node::{serialize_error, Leaf, MetadataNode};

/// Key under which the task role is added to the ECS branch.
pub const ROLE_ARN_KEY: &str = "RoleArn";

/// `RoleArn` value when the process has no task credentials.
pub const NO_RELATIVE_URI: &str = "(no-relative-url-for-task-information)";

/// `RoleArn` value when the credentials endpoint returned something unexpected.
pub const INVALID_VALUE: &str = "<invalid_single_value>";

/// Everything the crawler could find, keyed by source.
///
/// Serializes as a JSON object with kebab-case keys; branches that are `None`
/// are left out entirely.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Snapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<MetadataNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ecs_metadata: Option<MetadataNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_identity: Option<MetadataNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<MetadataNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_metadata: Option<ContainerMetadata>,
}

impl Snapshot {
    /// `true` when no source was reachable.
    pub fn is_empty(&self) -> bool {
        self.meta_data.is_none()
            && self.ecs_metadata.is_none()
            && self.instance_identity.is_none()
            && self.user_data.is_none()
            && self.container_metadata.is_none()
    }

    /// Render as a JSON value, ready to publish.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Contents of the ECS container metadata file.
///
/// Unlike the HTTP branches, a file that cannot be read or parsed is kept
/// in the snapshot as an error.
#[derive(Debug)]
pub enum ContainerMetadata {
    Document(serde_json::Map<String, serde_json::Value>),
    Failure(MetadataError),
}

impl ContainerMetadata {
    pub fn as_document(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        match self {
            ContainerMetadata::Document(map) => Some(map),
            ContainerMetadata::Failure(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&MetadataError> {
        match self {
            ContainerMetadata::Document(_) => None,
            ContainerMetadata::Failure(err) => Some(err),
        }
    }
}

impl Serialize for ContainerMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ContainerMetadata::Document(map) => map.serialize(serializer),
            ContainerMetadata::Failure(err) => serialize_error(err, serializer),
        }
    }
}

impl Crawler {
    /// Crawl every metadata source.
    ///
    /// The sources are fetched concurrently. This never fails: an unreachable
    /// source is simply missing from the result. Nothing is cached, so each
    /// call reflects the services as they are now.
    pub async fn snapshot(&self) -> Snapshot {
        let (meta_data, ecs_metadata, instance_identity, user_data, container_metadata) =
            tokio::join!(
                self.meta_data(),
                self.ecs_metadata(),
                self.single(&self.config.instance_identity_url),
                self.single(&self.config.user_data_url),
                self.container_metadata(),
            );
        Snapshot {
            meta_data,
            ecs_metadata,
            instance_identity,
            user_data,
            container_metadata,
        }
    }

    /// The instance metadata tree.
    pub async fn meta_data(&self) -> Option<MetadataNode> {
        let url = &self.config.metadata_url;
        match self.crawl(url).await {
            Ok(node) => Some(node),
            Err(err) => {
                debug!(%url, error = %err, "instance metadata unavailable");
                None
            }
        }
    }

    /// The ECS agent tree, with the task role added as `RoleArn`.
    pub async fn ecs_metadata(&self) -> Option<MetadataNode> {
        let local_ip = self.local_ipv4().await?;
        let url = self.config.ecs_agent_url(&local_ip);
        let mut node = match self.crawl(&url).await {
            Ok(node) => node,
            Err(err) => {
                debug!(%url, error = %err, "ecs agent unavailable");
                return None;
            }
        };
        if let MetadataNode::Directory(children) = &mut node {
            let role = self.task_role().await;
            children.insert(ROLE_ARN_KEY.to_string(), Leaf::Text(role).into());
        }
        Some(node)
    }

    /// The container metadata file, if the environment names one.
    pub async fn container_metadata(&self) -> Option<ContainerMetadata> {
        let path = self.config.container_metadata_file.as_deref()?;
        Some(match read_container_metadata(path).await {
            Ok(map) => ContainerMetadata::Document(map),
            Err(err) => ContainerMetadata::Failure(err),
        })
    }

    /// Role ARN from the task credentials endpoint, or a marker explaining its absence.
    pub async fn task_role(&self) -> String {
        let Some(relative_uri) = self.config.credentials_relative_uri.as_deref() else {
            return NO_RELATIVE_URI.to_string();
        };
        let url = format!("{}{}", self.config.task_role_url, relative_uri);
        match self.fetch_leaf(&url).await {
            Ok(Leaf::KeyValue(map)) => map.get(ROLE_ARN_KEY).cloned().unwrap_or_default(),
            Ok(_) => INVALID_VALUE.to_string(),
            Err(err) => err.to_string(),
        }
    }

    async fn single(&self, url: &str) -> Option<MetadataNode> {
        match self.fetch_leaf(url).await {
            Ok(leaf) => Some(leaf.into()),
            Err(err) => {
                debug!(%url, error = %err, "metadata unavailable");
                None
            }
        }
    }

    async fn local_ipv4(&self) -> Option<String> {
        let url = &self.config.local_ipv4_url;
        let body = match self.client.fetch(url).await {
            Ok(body) => body,
            Err(err) => {
                debug!(%url, error = %err, "local ipv4 unavailable");
                return None;
            }
        };
        let ip = body.trim();
        (!ip.is_empty()).then(|| ip.to_string())
    }
}

async fn read_container_metadata(
    path: &Path,
) -> Result<serde_json::Map<String, serde_json::Value>, MetadataError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
