//! Crawler configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Instance metadata service base URL (link-local address).
pub const INSTANCE_METADATA_BASE_URL: &str = "http://169.254.169.254";

/// Instance metadata tree root.
pub const META_DATA_PATH: &str = "/latest/meta-data/";

/// Instance identity document.
pub const INSTANCE_IDENTITY_PATH: &str = "/latest/dynamic/instance-identity/document";

/// Raw user-data.
pub const USER_DATA_PATH: &str = "/latest/user-data";

/// Local IPv4 address of the instance, used to locate the ECS agent.
pub const LOCAL_IPV4_PATH: &str = "/latest/meta-data/local-ipv4/";

/// Task role credentials base URL.
pub const TASK_ROLE_BASE_URL: &str = "http://169.254.170.2";

/// Port of the ECS agent introspection API.
pub const ECS_AGENT_PORT: u16 = 51678;

/// Environment variable naming the container metadata file.
pub const CONTAINER_METADATA_FILE_ENV: &str = "ECS_CONTAINER_METADATA_FILE";

/// Environment variable holding the task credentials path.
pub const CREDENTIALS_RELATIVE_URI_ENV: &str = "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI";

/// Timeout applied to every metadata request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(200);

/// Maximum directory nesting followed below a crawl root.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Everything the crawler needs from its environment.
///
/// `Default` uses the fixed upstream URLs and does not look at the process
/// environment; use [`CrawlerConfig::from_env`] for that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlerConfig {
    pub metadata_url: String,
    pub instance_identity_url: String,
    pub user_data_url: String,
    pub local_ipv4_url: String,
    pub task_role_url: String,
    pub ecs_agent_port: u16,
    pub container_metadata_file: Option<PathBuf>,
    pub credentials_relative_uri: Option<String>,
    pub timeout: Duration,
    pub max_depth: usize,
    pub max_body_size: Option<usize>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            metadata_url: format!("{}{}", INSTANCE_METADATA_BASE_URL, META_DATA_PATH),
            instance_identity_url: format!(
                "{}{}",
                INSTANCE_METADATA_BASE_URL, INSTANCE_IDENTITY_PATH
            ),
            user_data_url: format!("{}{}", INSTANCE_METADATA_BASE_URL, USER_DATA_PATH),
            local_ipv4_url: format!("{}{}", INSTANCE_METADATA_BASE_URL, LOCAL_IPV4_PATH),
            task_role_url: TASK_ROLE_BASE_URL.to_string(),
            ecs_agent_port: ECS_AGENT_PORT,
            container_metadata_file: None,
            credentials_relative_uri: None,
            timeout: DEFAULT_TIMEOUT,
            max_depth: DEFAULT_MAX_DEPTH,
            max_body_size: None,
        }
    }
}

impl CrawlerConfig {
    /// Default configuration plus the container variables of the current process.
    pub fn from_env() -> Self {
        Self::default().with_env_lookup(|key| std::env::var(key).ok())
    }

    /// Fill the environment-derived fields through `lookup`.
    ///
    /// Empty values count as unset.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());
        self.container_metadata_file = lookup(CONTAINER_METADATA_FILE_ENV).map(PathBuf::from);
        self.credentials_relative_uri = lookup(CREDENTIALS_RELATIVE_URI_ENV);
        self
    }

    /// Point every instance metadata URL at `base_url` instead of the link-local address.
    pub fn with_instance_base_url(mut self, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        self.metadata_url = format!("{}{}", base, META_DATA_PATH);
        self.instance_identity_url = format!("{}{}", base, INSTANCE_IDENTITY_PATH);
        self.user_data_url = format!("{}{}", base, USER_DATA_PATH);
        self.local_ipv4_url = format!("{}{}", base, LOCAL_IPV4_PATH);
        self
    }

    pub fn with_task_role_url(mut self, url: &str) -> Self {
        self.task_role_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_ecs_agent_port(mut self, port: u16) -> Self {
        self.ecs_agent_port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Reject response bodies larger than `max_size` bytes.
    pub fn with_max_body_size(mut self, max_size: usize) -> Self {
        self.max_body_size = Some(max_size);
        self
    }

    pub fn with_container_metadata_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.container_metadata_file = Some(path.into());
        self
    }

    pub fn with_credentials_relative_uri(mut self, uri: impl Into<String>) -> Self {
        self.credentials_relative_uri = Some(uri.into());
        self
    }

    /// URL of the ECS agent running on the instance at `local_ip`.
    pub fn ecs_agent_url(&self, local_ip: &str) -> String {
        format!("http://{}:{}", local_ip, self.ecs_agent_port)
    }
}
