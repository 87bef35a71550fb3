//! Playwright browser automation
//!
//! A [`TestSpec`] is rendered into one Node.js program that drives a single
//! browser, context and page through every step. The program reports
//! progress as one JSON object per stdout line, which is parsed back into
//! [`ScriptEvent`]s.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{E2eError, E2eResult};
use crate::locator::js_string;
use crate::spec::{TestSpec, TestStep};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaywrightConfig {
    /// Base URL of the application under test
    pub base_url: String,

    /// Directory for screenshots
    pub output_dir: PathBuf,

    pub browser: Browser,
    pub headless: bool,

    /// Bound for steps that do not set their own timeout
    pub default_timeout_ms: u64,

    /// Node.js executable
    pub node_binary: PathBuf,

    /// `node_modules` directory holding the `playwright` package.
    /// Falls back to `./node_modules` when present.
    pub node_modules: Option<PathBuf>,

    /// Upper bound for a whole script run
    pub script_timeout_secs: u64,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9002/".to_string(),
            output_dir: PathBuf::from("verification"),
            browser: Browser::Chromium,
            headless: true,
            default_timeout_ms: 5_000,
            node_binary: PathBuf::from("node"),
            node_modules: None,
            script_timeout_secs: 180,
        }
    }
}

/// One JSON line printed by the generated script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    StepStarted { index: usize, name: String },
    StepPassed { index: usize, name: String, duration_ms: u64 },
    Screenshot { name: String, path: PathBuf },
    Log { message: String },
    Passed,
    Failed { error: String },
    ErrorScreenshot { path: PathBuf },
    Fatal { error: String },
}

impl ScriptEvent {
    /// Parse a stdout line; `None` for anything that is not an event
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if !line.starts_with('{') {
            return None;
        }
        serde_json::from_str(line).ok()
    }
}

/// Result of executing a test step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub index: usize,
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub screenshot_path: Option<PathBuf>,
}

/// Raw output of one script run
#[derive(Debug, Clone, Default)]
pub struct ScriptRun {
    pub events: Vec<ScriptEvent>,
    pub exit_success: bool,
    pub stderr: String,
}

/// Events folded into per-step results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptOutcome {
    pub success: bool,
    pub steps: Vec<StepResult>,
    pub failed_step: Option<String>,
    pub error: Option<String>,
    pub screenshots: Vec<PathBuf>,
    pub error_screenshot: Option<PathBuf>,
}

impl ScriptRun {
    pub fn into_outcome(self) -> ScriptOutcome {
        let mut outcome = ScriptOutcome::default();
        let mut pending: Option<(usize, String)> = None;
        let mut passed = false;

        for event in self.events {
            match event {
                ScriptEvent::StepStarted { index, name } => pending = Some((index, name)),
                ScriptEvent::StepPassed { index, name, duration_ms } => {
                    pending = None;
                    outcome.steps.push(StepResult {
                        index,
                        success: true,
                        step_name: name,
                        duration_ms,
                        error: None,
                        screenshot_path: None,
                    });
                }
                ScriptEvent::Screenshot { path, .. } => {
                    // Reported inside the screenshot step, before its step_passed.
                    outcome.screenshots.push(path);
                }
                ScriptEvent::Passed => passed = true,
                ScriptEvent::Failed { error } | ScriptEvent::Fatal { error } => {
                    if outcome.error.is_none() {
                        outcome.error = Some(clean_message(&error));
                    }
                }
                ScriptEvent::ErrorScreenshot { path } => outcome.error_screenshot = Some(path),
                ScriptEvent::Log { .. } => {}
            }
        }

        if let Some((index, name)) = pending {
            outcome.steps.push(StepResult {
                index,
                success: false,
                step_name: name.clone(),
                duration_ms: 0,
                error: outcome.error.clone(),
                screenshot_path: None,
            });
            outcome.failed_step = Some(name);
        }

        // Attach screenshot paths to the steps that took them.
        let mut shots = outcome.screenshots.iter();
        for step in outcome.steps.iter_mut().filter(|s| s.success && s.step_name.starts_with("screenshot:")) {
            step.screenshot_path = shots.next().cloned();
        }

        if !passed && outcome.error.is_none() {
            let stderr = self.stderr.trim();
            outcome.error = Some(if stderr.is_empty() {
                "script exited without reporting a result".to_string()
            } else {
                format!("script exited without reporting a result: {}", clean_message(stderr))
            });
        }

        outcome.success = passed && outcome.error.is_none() && self.exit_success;
        outcome
    }
}

fn ansi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("valid regex"))
}

/// Strip terminal colour codes Playwright embeds in error messages
pub fn clean_message(message: &str) -> String {
    ansi_pattern().replace_all(message, "").trim().to_string()
}

const PRELUDE: &str = r#"
const playwright = require('playwright');

function emit(event) {
  process.stdout.write(JSON.stringify(event) + '\n');
}

function messageOf(error) {
  return String(error && error.message ? error.message : error);
}

async function step(index, name, body) {
  const started = Date.now();
  emit({ event: 'step_started', index, name });
  await body();
  emit({ event: 'step_passed', index, name, duration_ms: Date.now() - started });
}

async function expectValue(locator, expected, timeout) {
  const deadline = Date.now() + timeout;
  let actual = await locator.inputValue({ timeout });
  while (actual !== expected) {
    if (Date.now() >= deadline) {
      throw new Error(`expected value ${JSON.stringify(expected)} but found ${JSON.stringify(actual)}`);
    }
    await new Promise((resolve) => setTimeout(resolve, 100));
    actual = await locator.inputValue({ timeout: Math.max(deadline - Date.now(), 1) });
  }
}
"#;

/// Playwright browser handle
pub struct PlaywrightHandle {
    config: PlaywrightConfig,
    base_url: Url,
}

impl PlaywrightHandle {
    /// Create a new Playwright handle; makes the output directory absolute
    pub fn new(mut config: PlaywrightConfig) -> E2eResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| E2eError::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;

        std::fs::create_dir_all(&config.output_dir)?;
        config.output_dir = std::fs::canonicalize(&config.output_dir)?;

        Ok(Self { config, base_url })
    }

    pub fn config(&self) -> &PlaywrightConfig {
        &self.config
    }

    /// Where a named screenshot lands
    pub fn screenshot_path(&self, name: &str) -> PathBuf {
        self.config.output_dir.join(format!("{}.png", name))
    }

    /// Check that node runs and can resolve the `playwright` package
    pub async fn check_installed(&self) -> E2eResult<()> {
        let mut cmd = TokioCommand::new(&self.config.node_binary);
        cmd.args(["-e", "require.resolve('playwright')"])
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        self.apply_node_path(&mut cmd);

        match cmd.status().await {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    fn node_modules(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.config.node_modules {
            return Some(dir.clone());
        }
        let local = Path::new("node_modules");
        if local.is_dir() {
            return std::fs::canonicalize(local).ok();
        }
        None
    }

    fn apply_node_path(&self, cmd: &mut TokioCommand) {
        if let Some(dir) = self.node_modules() {
            debug!("NODE_PATH={}", dir.display());
            cmd.env("NODE_PATH", dir);
        }
    }

    /// Build the Playwright program for a whole spec
    pub fn build_script(&self, spec: &TestSpec) -> E2eResult<String> {
        let mut script = String::from(PRELUDE);

        script.push_str(&format!(
            r#"
(async () => {{
  const browser = await playwright.{browser}.launch({{ headless: {headless} }});
  try {{
    const context = await browser.newContext({{
      viewport: {{ width: {width}, height: {height} }}
    }});
    const page = await context.newPage();
    page.setDefaultTimeout({timeout});
    try {{
"#,
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            width = spec.viewport.width,
            height = spec.viewport.height,
            timeout = self.config.default_timeout_ms,
        ));

        for (index, step) in spec.steps.iter().enumerate() {
            script.push_str(&format!(
                "      await step({}, {}, async () => {{\n",
                index,
                js_string(&step.name())
            ));
            for line in self.step_to_js(step)?.lines() {
                script.push_str("        ");
                script.push_str(line);
                script.push('\n');
            }
            script.push_str("      });\n");
        }

        let error_path = self.screenshot_path(&spec.error_screenshot);
        let error_path = js_string(&error_path.to_string_lossy());
        script.push_str(&format!(
            r#"      emit({{ event: 'passed' }});
    }} catch (error) {{
      emit({{ event: 'failed', error: messageOf(error) }});
      try {{
        await page.screenshot({{ path: {error_path}, fullPage: true }});
        emit({{ event: 'error_screenshot', path: {error_path} }});
      }} catch (screenshotError) {{
        emit({{ event: 'log', message: 'error screenshot failed: ' + messageOf(screenshotError) }});
      }}
    }}
  }} finally {{
    await browser.close();
  }}
}})().catch((error) => {{
  emit({{ event: 'fatal', error: messageOf(error) }});
  process.exitCode = 1;
}});
"#,
            error_path = error_path,
        ));

        Ok(script)
    }

    /// Convert a step to JavaScript code
    fn step_to_js(&self, step: &TestStep) -> E2eResult<String> {
        let timeout = |t: &Option<u64>| t.unwrap_or(self.config.default_timeout_ms);

        let js = match step {
            TestStep::Navigate { url } => {
                let resolved = self.base_url.join(url).map_err(|e| E2eError::InvalidUrl {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
                format!("await page.goto({});", js_string(resolved.as_str()))
            }
            TestStep::ExpectVisible { target, timeout_ms } => format!(
                "await {}.waitFor({{ state: 'visible', timeout: {} }});",
                target.to_js(),
                timeout(timeout_ms)
            ),
            TestStep::Click { target, timeout_ms } => {
                format!("await {}.click({{ timeout: {} }});", target.to_js(), timeout(timeout_ms))
            }
            TestStep::Fill { target, value } => {
                format!("await {}.fill({});", target.to_js(), js_string(value))
            }
            TestStep::ExpectValue { target, value, timeout_ms } => format!(
                "await expectValue({}, {}, {});",
                target.to_js(),
                js_string(value),
                timeout(timeout_ms)
            ),
            TestStep::Screenshot { name, full_page } => {
                let path = js_string(&self.screenshot_path(name).to_string_lossy());
                format!(
                    "await page.screenshot({{ path: {path}, fullPage: {full_page} }});\nemit({{ event: 'screenshot', name: {name}, path: {path} }});",
                    path = path,
                    full_page = full_page,
                    name = js_string(name),
                )
            }
            TestStep::Log { message } => {
                format!("emit({{ event: 'log', message: {} }});", js_string(message))
            }
        };

        Ok(js)
    }

    /// Execute a script with node, streaming its events
    pub async fn run_script(&self, script: &str) -> E2eResult<ScriptRun> {
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("journey.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let mut cmd = TokioCommand::new(&self.config.node_binary);
        cmd.arg(&script_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        self.apply_node_path(&mut cmd);

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => E2eError::PlaywrightNotFound,
            _ => E2eError::Io(e),
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| E2eError::Playwright("stderr not captured".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = BufReader::new(stderr).read_to_string(&mut buf).await;
            buf
        });

        let collect = async {
            let mut lines = BufReader::new(stdout).lines();
            let mut events = Vec::new();
            while let Some(line) = lines.next_line().await? {
                match ScriptEvent::parse_line(&line) {
                    Some(event) => {
                        log_event(&event);
                        events.push(event);
                    }
                    None => debug!("[node] {}", line),
                }
            }
            let status = child.wait().await?;
            Ok::<_, E2eError>((events, status))
        };

        let limit = Duration::from_secs(self.config.script_timeout_secs);
        let (events, status) = match tokio::time::timeout(limit, collect).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Playwright script exceeded {:?}, killing it", limit);
                return Err(E2eError::ScriptTimeout(self.config.script_timeout_secs));
            }
        };

        let stderr = stderr_task.await.unwrap_or_default();
        if !stderr.trim().is_empty() {
            debug!("[node stderr] {}", stderr.trim());
        }

        Ok(ScriptRun {
            events,
            exit_success: status.success(),
            stderr,
        })
    }

    /// Render and run a spec
    pub async fn run_spec(&self, spec: &TestSpec) -> E2eResult<ScriptOutcome> {
        let script = self.build_script(spec)?;
        let run = self.run_script(&script).await?;
        Ok(run.into_outcome())
    }
}

fn log_event(event: &ScriptEvent) {
    match event {
        ScriptEvent::StepStarted { name, .. } => debug!("→ {}", name),
        ScriptEvent::StepPassed { name, duration_ms, .. } => info!("✓ {} ({} ms)", name, duration_ms),
        ScriptEvent::Screenshot { path, .. } => info!("Screenshot saved: {}", path.display()),
        ScriptEvent::Log { message } => info!("[TEST LOG] {}", message),
        ScriptEvent::Passed => {}
        ScriptEvent::Failed { error } => error!("✗ {}", clean_message(error)),
        ScriptEvent::ErrorScreenshot { path } => warn!("Error screenshot saved: {}", path.display()),
        ScriptEvent::Fatal { error } => error!("Playwright crashed: {}", clean_message(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(index: usize, name: &str) -> ScriptEvent {
        ScriptEvent::StepStarted { index, name: name.to_string() }
    }

    fn passed(index: usize, name: &str) -> ScriptEvent {
        ScriptEvent::StepPassed { index, name: name.to_string(), duration_ms: 5 }
    }

    #[test]
    fn test_parse_event_lines() {
        assert_eq!(
            ScriptEvent::parse_line(r#"{"event":"step_started","index":2,"name":"click:button \"Add\""}"#),
            Some(started(2, "click:button \"Add\""))
        );
        assert_eq!(ScriptEvent::parse_line(r#"{"event":"passed"}"#), Some(ScriptEvent::Passed));
        assert_eq!(ScriptEvent::parse_line("(node:1) ExperimentalWarning"), None);
        assert_eq!(ScriptEvent::parse_line(r#"{"event":"unknown"}"#), None);
    }

    #[test]
    fn test_outcome_for_passing_run() {
        let run = ScriptRun {
            events: vec![
                started(0, "navigate:/"),
                passed(0, "navigate:/"),
                started(1, "screenshot:amount-preserved"),
                ScriptEvent::Screenshot {
                    name: "amount-preserved".to_string(),
                    path: PathBuf::from("/tmp/out/amount-preserved.png"),
                },
                passed(1, "screenshot:amount-preserved"),
                ScriptEvent::Passed,
            ],
            exit_success: true,
            stderr: String::new(),
        };

        let outcome = run.into_outcome();
        assert!(outcome.success);
        assert_eq!(outcome.steps.len(), 2);
        assert_eq!(outcome.failed_step, None);
        assert_eq!(
            outcome.steps[1].screenshot_path,
            Some(PathBuf::from("/tmp/out/amount-preserved.png"))
        );
        assert!(outcome.error_screenshot.is_none());
    }

    #[test]
    fn test_outcome_tags_failing_step() {
        let run = ScriptRun {
            events: vec![
                started(0, "navigate:/"),
                passed(0, "navigate:/"),
                started(1, "expect_value:label \"Amount\""),
                ScriptEvent::Failed {
                    error: "\u{1b}[31mexpected value \"123.45\" but found \"\"\u{1b}[39m".to_string(),
                },
                ScriptEvent::ErrorScreenshot { path: PathBuf::from("/tmp/out/error.png") },
            ],
            exit_success: true,
            stderr: String::new(),
        };

        let outcome = run.into_outcome();
        assert!(!outcome.success);
        assert_eq!(outcome.failed_step.as_deref(), Some("expect_value:label \"Amount\""));
        assert_eq!(outcome.error.as_deref(), Some("expected value \"123.45\" but found \"\""));
        assert_eq!(outcome.error_screenshot, Some(PathBuf::from("/tmp/out/error.png")));

        let last = outcome.steps.last().unwrap();
        assert!(!last.success);
        assert_eq!(last.index, 1);
    }

    #[test]
    fn test_outcome_for_silent_crash_uses_stderr() {
        let run = ScriptRun {
            events: vec![],
            exit_success: false,
            stderr: "Error: Cannot find module 'playwright'\n".to_string(),
        };

        let outcome = run.into_outcome();
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("Cannot find module 'playwright'"));
    }

    #[test]
    fn test_fatal_event_fails_run() {
        let run = ScriptRun {
            events: vec![ScriptEvent::Fatal { error: "browserType.launch: Executable doesn't exist".to_string() }],
            exit_success: false,
            stderr: String::new(),
        };

        let outcome = run.into_outcome();
        assert!(!outcome.success);
        assert!(outcome.steps.is_empty());
        assert!(outcome.error.unwrap().starts_with("browserType.launch"));
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let config = PlaywrightConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(PlaywrightHandle::new(config), Err(E2eError::InvalidUrl { .. })));
    }
}
