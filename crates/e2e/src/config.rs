//! Runner configuration
//!
//! Defaults reproduce the hard-coded smoke test; a TOML file may override
//! any of them, and CLI flags override the file.
//!
//! ```toml
//! [playwright]
//! base_url = "http://localhost:9002/"
//! browser = "firefox"
//!
//! [readiness]
//! enabled = true
//!
//! [scenario]
//! amount = "99.99"
//!
//! [scenario.credentials]
//! email_domain = "qa.example.com"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{E2eError, E2eResult};
use crate::playwright::PlaywrightConfig;
use crate::scenario::ScenarioConfig;
use crate::server::ReadinessConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct E2eConfig {
    pub playwright: PlaywrightConfig,
    pub readiness: ReadinessConfig,
    pub scenario: ScenarioConfig,
}

impl E2eConfig {
    pub fn from_toml(content: &str) -> E2eResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Reject settings that would make every run fail for a boring reason
    pub fn validate(&self) -> E2eResult<()> {
        let base = Url::parse(&self.playwright.base_url).map_err(|e| E2eError::InvalidUrl {
            url: self.playwright.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(E2eError::InvalidConfig(format!(
                "base_url must be http or https, got '{}'",
                base.scheme()
            )));
        }
        if self.scenario.amount.trim().is_empty() {
            return Err(E2eError::InvalidConfig("scenario.amount is empty".to_string()));
        }
        if self.scenario.transaction_type.trim().is_empty() {
            return Err(E2eError::InvalidConfig(
                "scenario.transaction_type is empty".to_string(),
            ));
        }
        if self.scenario.credentials.identifier_len == 0 {
            return Err(E2eError::InvalidConfig(
                "scenario.credentials.identifier_len must be at least 1".to_string(),
            ));
        }
        if self.playwright.script_timeout_secs == 0 {
            return Err(E2eError::InvalidConfig(
                "playwright.script_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
