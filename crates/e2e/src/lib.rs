//! Kanakku E2E smoke tests
//!
//! This crate drives the Kanakku budgeting web app through Playwright:
//! - Models browser journeys as typed steps with accessible locators
//! - Renders a journey into one Node.js Playwright program and streams
//!   its JSON step events back
//! - Ships the amount-preservation journey and loads others from YAML
//! - Keeps screenshots as fingerprinted evidence
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── prepare() -> node + playwright + app readiness       │
//! │    ├── run_amount_preservation() -> TestResult              │
//! │    ├── run_spec(spec: TestSpec) -> TestResult               │
//! │    └── write_results(suite) -> test-results.json            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestSpec (YAML or built in)                                │
//! │    ├── name, description, tags, viewport                    │
//! │    ├── steps: [TestStep]                                    │
//! │    │     ├── navigate { url }                               │
//! │    │     ├── expect_visible { target, timeout_ms? }         │
//! │    │     ├── click { target, timeout_ms? }                  │
//! │    │     ├── fill { target, value }                         │
//! │    │     ├── expect_value { target, value, timeout_ms? }    │
//! │    │     ├── screenshot { name, full_page }                 │
//! │    │     └── log { message }                                │
//! │    └── error_screenshot                                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod artifact;
pub mod config;
pub mod credentials;
pub mod error;
pub mod locator;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod server;
pub mod spec;

pub use config::E2eConfig;
pub use error::{E2eError, E2eResult};
pub use locator::Locator;
pub use runner::{run_amount_preservation_check, TestResult, TestRunner, TestSuiteResult};
pub use spec::{TestSpec, TestStep};
