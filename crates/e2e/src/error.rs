//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Application not reachable after {0} attempts")]
    AppUnreachable(usize),

    #[error("Playwright not found. Install with: npm i playwright && npx playwright install chromium")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Playwright script did not finish within {0} seconds")]
    ScriptTimeout(u64),

    #[error("Test spec parse error: {0}")]
    SpecParse(String),

    #[error("Unbound variable in test spec: ${{{0}}}")]
    UnboundVariable(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Screenshot not found: {0}")]
    ScreenshotMissing(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

pub type E2eResult<T> = Result<T, E2eError>;
