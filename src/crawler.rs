//! Recursive metadata tree discovery.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use tracing::debug;

use crate::client::MetadataClient;
use crate::config::CrawlerConfig;
use crate::error::MetadataError;
use crate::node::{Leaf, MetadataNode};

/// Listing entry that is never followed. Its children are IAM role names.
const SECURITY_CREDENTIALS: &str = "security-credentials/";

/// ECS agent command that is never fetched.
const LICENSE_COMMAND: &str = "/license";

type NodeFuture<'a> =
    Pin<Box<dyn Future<Output = Result<MetadataNode, MetadataError>> + Send + 'a>>;

/// Walks a metadata service and builds a [`MetadataNode`] tree.
///
/// # Example
///
/// ```ignore
/// use aws_metadata_tree::{Crawler, CrawlerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), aws_metadata_tree::MetadataError> {
///     let crawler = Crawler::new(CrawlerConfig::from_env())?;
///     let snapshot = crawler.snapshot().await;
///     println!("{}", snapshot.to_value());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Crawler {
    pub(crate) client: MetadataClient,
    pub(crate) config: CrawlerConfig,
}

/// Body of the ECS agent root, listing its endpoints.
#[derive(Debug, Deserialize)]
struct AvailableCommands {
    #[serde(rename = "AvailableCommands", default)]
    available_commands: Vec<String>,
}

/// How a directory response lists its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Listing {
    /// Sub-paths from an `AvailableCommands` object, appended to the base as-is.
    Menu(Vec<String>),
    /// Newline separated names, `/`-suffixed for subdirectories.
    Entries(Vec<String>),
}

impl Listing {
    pub(crate) fn parse(body: &str) -> Self {
        if let Ok(menu) = serde_json::from_str::<AvailableCommands>(body) {
            if !menu.available_commands.is_empty() {
                return Listing::Menu(menu.available_commands);
            }
        }
        Listing::Entries(
            body.split('\n')
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

/// `base` + `/` + `segment`, without doubling a trailing slash on `base`.
pub(crate) fn join_segment(base: &str, segment: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), segment)
}

impl Crawler {
    /// Create a crawler for `config`.
    pub fn new(config: CrawlerConfig) -> Result<Self, MetadataError> {
        let client = MetadataClient::new(config.timeout)?.with_max_size(config.max_body_size);
        Ok(Self { client, config })
    }

    /// Create a crawler that sends its requests through `client`.
    ///
    /// The configured timeout and body size limit still apply to every request.
    pub fn with_client(client: reqwest::Client, config: CrawlerConfig) -> Self {
        let client =
            MetadataClient::from_client(client, config.timeout).with_max_size(config.max_body_size);
        Self { client, config }
    }

    /// Create a crawler configured from the process environment.
    pub fn from_env() -> Result<Self, MetadataError> {
        Self::new(CrawlerConfig::from_env())
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Fetch a single value and classify it.
    ///
    /// # Errors
    ///
    /// Returns `MetadataError::NotFound` on 404, or the transport or body
    /// error that stopped the request.
    pub async fn fetch_leaf(&self, url: &str) -> Result<Leaf, MetadataError> {
        let body = self.client.fetch(url).await?;
        Ok(Leaf::classify(body))
    }

    /// Crawl the directory at `url` and everything below it.
    ///
    /// Only a failure to fetch `url` itself is returned as an error; failures
    /// further down are stored in the tree.
    pub async fn crawl(&self, url: &str) -> Result<MetadataNode, MetadataError> {
        self.recurse(url, 0).await
    }

    fn recurse<'a>(&'a self, url: &'a str, depth: usize) -> NodeFuture<'a> {
        Box::pin(async move {
            let body = self.client.fetch(url).await?;
            let children = match Listing::parse(&body) {
                Listing::Menu(commands) => self.fetch_commands(url, commands).await,
                Listing::Entries(entries) => self.fetch_entries(url, entries, depth).await,
            };
            Ok::<_, MetadataError>(MetadataNode::Directory(children))
        })
    }

    async fn fetch_commands(
        &self,
        base: &str,
        commands: Vec<String>,
    ) -> BTreeMap<String, MetadataNode> {
        let mut children = BTreeMap::new();
        for command in commands {
            if command == LICENSE_COMMAND {
                continue;
            }
            let url = format!("{}{}", base, command);
            let node = MetadataNode::from_result(self.fetch_leaf(&url).await);
            log_failure(&url, &node);
            children.insert(command, node);
        }
        children
    }

    async fn fetch_entries(
        &self,
        base: &str,
        entries: Vec<String>,
        depth: usize,
    ) -> BTreeMap<String, MetadataNode> {
        let mut children = BTreeMap::new();
        for entry in entries {
            if entry == SECURITY_CREDENTIALS {
                continue;
            }
            let url = join_segment(base, &entry);
            let node = if !entry.ends_with('/') {
                MetadataNode::from_result(self.fetch_leaf(&url).await)
            } else if depth >= self.config.max_depth {
                MetadataNode::Failure(MetadataError::DepthExceeded(self.config.max_depth))
            } else {
                MetadataNode::from_result(self.recurse(&url, depth + 1).await)
            };
            log_failure(&url, &node);
            children.insert(entry, node);
        }
        children
    }
}

fn log_failure(url: &str, node: &MetadataNode) {
    if let Some(err) = node.as_failure() {
        debug!(%url, error = %err, "metadata entry unavailable");
    }
}
