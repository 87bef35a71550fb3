//! Main test runner that orchestrates readiness, Playwright and evidence

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::artifact::ScreenshotArtifact;
use crate::config::E2eConfig;
use crate::credentials::Credentials;
use crate::error::{E2eError, E2eResult};
use crate::playwright::{PlaywrightHandle, ScriptOutcome, StepResult};
use crate::scenario::{self, ScenarioParams};
use crate::server::AppServer;
use crate::spec::TestSpec;

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,

    /// Name of the step that failed, if any
    pub failed_step: Option<String>,
    pub error: Option<String>,

    /// Screenshot captured on success
    pub screenshot: Option<ScreenshotArtifact>,

    /// Screenshot captured on failure
    pub error_screenshot: Option<ScreenshotArtifact>,

    /// Account created by this run
    pub account: Option<Credentials>,
}

impl TestResult {
    /// Failed result for a spec that never produced an outcome
    pub fn aborted(spec: &TestSpec, started_at: DateTime<Utc>, duration_ms: u64, error: &E2eError) -> Self {
        Self {
            name: spec.name.clone(),
            success: false,
            started_at,
            duration_ms,
            steps: Vec::new(),
            failed_step: None,
            error: Some(error.to_string()),
            screenshot: None,
            error_screenshot: None,
            account: None,
        }
    }

    /// Message combining the failing step and its error
    pub fn failure_message(&self) -> Option<String> {
        let error = self.error.as_deref()?;
        Some(match &self.failed_step {
            Some(step) => format!("{} (at {})", error, step),
            None => error.to_string(),
        })
    }
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn from_results(results: Vec<TestResult>, duration_ms: u64) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            duration_ms,
            results,
        }
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: E2eConfig,
    playwright: PlaywrightHandle,
}

impl TestRunner {
    /// Create a test runner; creates the output directory
    pub fn new(config: E2eConfig) -> E2eResult<Self> {
        config.validate()?;
        let playwright = PlaywrightHandle::new(config.playwright.clone())?;
        Ok(Self { config, playwright })
    }

    pub fn output_dir(&self) -> &Path {
        &self.playwright.config().output_dir
    }

    /// Wait for the app and the Playwright install, when enabled
    pub async fn prepare(&self) -> E2eResult<()> {
        self.playwright.check_installed().await?;

        if self.config.readiness.enabled {
            let server = AppServer::new(self.config.playwright.base_url.clone())?;
            server.wait_until_ready(&self.config.readiness).await?;
        }
        Ok(())
    }

    /// Fresh credentials and values for one run
    pub fn scenario_params(&self) -> ScenarioParams {
        ScenarioParams::generate(&self.config.scenario, &mut rand::thread_rng())
    }

    /// Sign up, onboard, and check the amount survives a type switch
    pub async fn run_amount_preservation(&self) -> E2eResult<TestResult> {
        let params = self.scenario_params();
        info!("Signing up as {}", params.credentials.email);

        let spec = scenario::amount_preservation(&params);
        let mut result = self.run_spec(&spec).await?;
        result.account = Some(params.credentials);
        Ok(result)
    }

    /// Run YAML specs with freshly drawn `${name}` variables each.
    /// A spec that cannot run is recorded as failed and the rest still run.
    pub async fn run_specs(&self, specs: &[TestSpec]) -> E2eResult<TestSuiteResult> {
        let start = Instant::now();
        let mut results = Vec::new();

        info!("Running {} test(s)...", specs.len());

        for spec in specs {
            let started_at = Utc::now();
            let spec_start = Instant::now();

            let result = match self.run_bound_spec(spec).await {
                Ok(result) => result,
                Err(e) => {
                    error!("✗ {} - {}", spec.name, e);
                    TestResult::aborted(spec, started_at, spec_start.elapsed().as_millis() as u64, &e)
                }
            };
            results.push(result);
        }

        let suite = TestSuiteResult::from_results(results, start.elapsed().as_millis() as u64);

        info!(
            "Test Results: {} passed, {} failed ({} ms)",
            suite.passed, suite.failed, suite.duration_ms
        );
        Ok(suite)
    }

    async fn run_bound_spec(&self, spec: &TestSpec) -> E2eResult<TestResult> {
        let params = self.scenario_params();
        let uses_account = spec.variables_used().contains("email");
        let bound = spec.clone().bind(&params.variables())?;

        let mut result = self.run_spec(&bound).await?;
        if uses_account {
            result.account = Some(params.credentials);
        }
        Ok(result)
    }

    /// Run a single test spec
    pub async fn run_spec(&self, spec: &TestSpec) -> E2eResult<TestResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        debug!("Running test: {}", spec.name);

        let outcome = self.playwright.run_spec(spec).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let result = self.collect_result(spec, outcome, started_at, duration_ms);
        match result.failure_message() {
            None => info!("✓ {} ({} ms)", result.name, result.duration_ms),
            Some(message) => error!("✗ {} - {}", result.name, message),
        }
        Ok(result)
    }

    fn collect_result(
        &self,
        spec: &TestSpec,
        outcome: ScriptOutcome,
        started_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> TestResult {
        let screenshot = if outcome.success {
            outcome.screenshots.last().and_then(|p| inspect_or_warn(p))
        } else {
            None
        };
        let error_screenshot = outcome.error_screenshot.as_deref().and_then(inspect_or_warn);

        TestResult {
            name: spec.name.clone(),
            success: outcome.success,
            started_at,
            duration_ms,
            steps: outcome.steps,
            failed_step: outcome.failed_step,
            error: outcome.error,
            screenshot,
            error_screenshot,
            account: None,
        }
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        let path = self.output_dir().join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

/// Run the built-in journey against `target_url` with default settings,
/// bounding every screen readiness wait by `timeout_ms`
pub async fn run_amount_preservation_check(target_url: &str, timeout_ms: u64) -> E2eResult<TestResult> {
    let runner = TestRunner::new(check_config(target_url, timeout_ms))?;
    runner.prepare().await?;
    runner.run_amount_preservation().await
}

/// Defaults with the target URL and a single readiness bound for the
/// login, sign-up, onboarding and dashboard screens
fn check_config(target_url: &str, timeout_ms: u64) -> E2eConfig {
    let mut config = E2eConfig::default();
    config.playwright.base_url = target_url.to_string();
    config.scenario.screen_timeout_ms = timeout_ms;
    config.scenario.sign_up_timeout_ms = timeout_ms;
    config
}

fn inspect_or_warn(path: &Path) -> Option<ScreenshotArtifact> {
    match ScreenshotArtifact::inspect(path) {
        Ok(artifact) => Some(artifact),
        Err(e) => {
            warn!("Could not inspect screenshot {}: {}", path.display(), e);
            None
        }
    }
}
