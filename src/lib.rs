//! Crawl EC2 and ECS metadata services into one nested snapshot.
//!
//! The instance metadata service, the ECS agent and the task credentials
//! endpoint all expose their data as browsable trees of unknown shape. This
//! crate walks them, classifies every node it finds, and returns the result
//! as a single JSON-serializable value for introspection endpoints.
//!
//! # Features
//!
//! - Recursive discovery of newline-separated listings and ECS command menus
//! - Leaf classification into key-value maps, task listings or text
//! - Credential fields are always redacted; `security-credentials/` is never followed
//! - Failures are kept in the tree at the node where they happened
//!
//! # Example
//!
//! ```ignore
//! use aws_metadata_tree::{Crawler, CrawlerConfig, MetadataError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), MetadataError> {
//!     let crawler = Crawler::new(CrawlerConfig::from_env())?;
//!
//!     // Everything at once, as published on a debug endpoint
//!     let snapshot = crawler.snapshot().await;
//!     println!("{}", snapshot.to_value());
//!
//!     // Or a single subtree
//!     let tree = crawler
//!         .crawl("http://169.254.169.254/latest/meta-data/placement/")
//!         .await?;
//!     println!("{}", tree.to_value());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Snapshot Branches
//!
//! | Branch | Source | When absent |
//! |--------|--------|-------------|
//! | `meta-data` | Instance metadata tree | Root unreachable |
//! | `ecs-metadata` | ECS agent on `<local-ipv4>:51678`, plus `RoleArn` | No local IP or agent |
//! | `instance-identity` | Identity document | Unreachable |
//! | `user-data` | User data | Unreachable or not set |
//! | `container-metadata` | `ECS_CONTAINER_METADATA_FILE` | Variable unset |

mod client;
pub mod config;
mod crawler;
mod error;
mod node;
mod snapshot;

pub use config::CrawlerConfig;
pub use crawler::Crawler;
pub use error::{ErrorKind, MetadataError};
pub use node::{Container, Leaf, MetadataNode, Task, TaskListing, REDACTED, SENSITIVE_KEYS};
pub use snapshot::{ContainerMetadata, Snapshot, INVALID_VALUE, NO_RELATIVE_URI, ROLE_ARN_KEY};
