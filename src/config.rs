//! Configuration types for actiontext-export

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Origin used when neither a site URL nor an environment default is configured
pub const DEFAULT_LOCAL_ORIGIN: &str = "http://localhost:3000";

/// Base origin resolution for relative attachment URLs
///
/// Candidates are consulted in priority order: the operator-configured site
/// URL, then the deployment-environment default, then
/// [`DEFAULT_LOCAL_ORIGIN`]. Empty or whitespace-only values count as unset.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BaseUrlConfig {
    /// Operator-configured canonical site URL (highest priority)
    #[serde(default)]
    pub site_url: Option<String>,

    /// Deployment-environment default origin
    #[serde(default)]
    pub default_url: Option<String>,
}

impl BaseUrlConfig {
    /// Resolve the base origin in priority order
    pub fn origin(&self) -> &str {
        presence(self.site_url.as_deref())
            .or_else(|| presence(self.default_url.as_deref()))
            .unwrap_or(DEFAULT_LOCAL_ORIGIN)
    }
}

/// Top-level configuration for the export pipeline
///
/// Sub-config fields are flattened so serialized configuration stays flat
/// (`site_url`, `default_url`, ...).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Base origin resolution for relative attachment URLs
    #[serde(flatten)]
    pub base_url: BaseUrlConfig,
}

impl Config {
    /// Validate that configured origins parse as absolute http(s) URLs
    ///
    /// Called by [`Exporter::new`](crate::Exporter::new); a misconfigured
    /// origin fails construction rather than surfacing mid-export.
    pub fn validate(&self) -> Result<()> {
        let candidates = [
            ("site_url", &self.base_url.site_url),
            ("default_url", &self.base_url.default_url),
        ];
        for (key, value) in candidates {
            if let Some(origin) = presence(value.as_deref()) {
                let parsed = url::Url::parse(origin).map_err(|e| Error::Config {
                    message: format!("'{origin}' is not a valid origin: {e}"),
                    key: Some(key.to_string()),
                })?;
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(Error::Config {
                        message: format!("'{origin}' must use http or https"),
                        key: Some(key.to_string()),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Returns the trimmed value when it is non-blank
fn presence(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
