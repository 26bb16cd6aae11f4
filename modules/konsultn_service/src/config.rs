//! Configuration for the konsultn service module

use crudkit::PageDefaults;
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix, e.g. `KONSULTN_DEFAULT_PAGE_LIMIT=50`
pub const ENV_PREFIX: &str = "KONSULTN_";

/// Konsultn service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Page size when a request leaves it empty
    #[serde(default = "default_page_limit")]
    pub default_page_limit: u64,

    /// Upper bound on requested page sizes
    #[serde(default = "default_max_page_limit")]
    pub max_page_limit: u64,

    /// Sort field when a request leaves it empty
    #[serde(default = "default_sort")]
    pub default_sort: String,

    /// Sort direction when a request leaves it empty
    #[serde(default = "default_order")]
    pub default_order: String,

    /// Lifetime of a team invitation (days)
    #[serde(default = "default_invitation_ttl_days")]
    pub invitation_ttl_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_page_limit: default_page_limit(),
            max_page_limit: default_max_page_limit(),
            default_sort: default_sort(),
            default_order: default_order(),
            invitation_ttl_days: default_invitation_ttl_days(),
        }
    }
}

impl Config {
    /// Defaults, then the YAML file at `path` if given, then `KONSULTN_*`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config: Config = figment.merge(Env::prefixed(ENV_PREFIX)).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.default_page_limit == 0 {
            anyhow::bail!("default_page_limit must be positive");
        }
        if self.max_page_limit < self.default_page_limit {
            anyhow::bail!("max_page_limit must not be below default_page_limit");
        }
        if self.invitation_ttl_days <= 0 {
            anyhow::bail!("invitation_ttl_days must be positive");
        }
        Ok(())
    }

    pub fn page_defaults(&self) -> PageDefaults {
        PageDefaults {
            limit: self.default_page_limit,
            max_limit: Some(self.max_page_limit),
            sort: self.default_sort.clone(),
            order: self.default_order.clone(),
        }
    }

    pub fn invitation_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.invitation_ttl_days)
    }
}

fn default_page_limit() -> u64 {
    crudkit::pagination::DEFAULT_PAGE_LIMIT
}

fn default_max_page_limit() -> u64 {
    100
}

fn default_sort() -> String {
    crudkit::pagination::DEFAULT_SORT.to_string()
}

fn default_order() -> String {
    crudkit::pagination::DEFAULT_ORDER.to_string()
}

fn default_invitation_ttl_days() -> i64 {
    7
}
