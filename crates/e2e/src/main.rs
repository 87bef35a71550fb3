//! Kanakku E2E smoke test entry point
//!
//! Without arguments this signs up a throwaway account on
//! http://localhost:9002/ and checks that the transaction amount survives a
//! type switch, leaving `verification/amount-preserved.png` (or
//! `verification/error.png`) behind.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kanakku_e2e::playwright::Browser;
use kanakku_e2e::{E2eConfig, E2eResult, TestRunner, TestSpec, TestSuiteResult};

#[derive(Parser, Debug)]
#[command(name = "kanakku-e2e")]
#[command(about = "Browser smoke test for the Kanakku budgeting app")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "KANAKKU_E2E_CONFIG")]
    config: Option<PathBuf>,

    /// URL serving the login screen
    #[arg(long, env = "KANAKKU_E2E_BASE_URL")]
    base_url: Option<String>,

    /// Directory for screenshots and test-results.json
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Browser to use
    #[arg(long, value_enum)]
    browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// YAML spec file or directory to run instead of the built-in journey
    #[arg(long)]
    spec: Option<PathBuf>,

    /// With --spec, run only specs carrying this tag
    #[arg(short, long, requires = "spec")]
    tag: Option<String>,

    /// Poll the app until it answers before launching the browser
    #[arg(long)]
    wait_for_app: bool,

    /// Exit non-zero when the check fails
    #[arg(long)]
    strict: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn load_config(&self) -> E2eResult<E2eConfig> {
        let mut config = match &self.config {
            Some(path) => E2eConfig::from_file(path)?,
            None => E2eConfig::default(),
        };

        if let Some(url) = &self.base_url {
            config.playwright.base_url = url.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.playwright.output_dir = dir.clone();
        }
        if let Some(browser) = self.browser {
            config.playwright.browser = browser;
        }
        if self.headed {
            config.playwright.headless = false;
        }
        if self.wait_for_app {
            config.readiness.enabled = true;
        }

        Ok(config)
    }
}

/// `RUST_LOG` when it parses, otherwise `info` (`debug` with `-v`)
fn env_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let fallback = if verbose { "debug" } else { "info" };
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback))
}

fn main() -> ExitCode {
    let args = Args::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(args.verbose, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let strict = args.strict;
    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");

    match rt.block_on(async_main(args)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) if strict => ExitCode::from(1),
        Ok(false) => ExitCode::SUCCESS,
        Err(e) => {
            println!("An error occurred: {}", e);
            if strict {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            }
        }
    }
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let config = args.load_config()?;
    let runner = TestRunner::new(config)?;

    runner.prepare().await?;

    let suite = match &args.spec {
        Some(path) => {
            let specs = if path.is_dir() {
                TestSpec::load_all(path)?
            } else {
                vec![TestSpec::from_file(path)?]
            };
            let specs: Vec<TestSpec> = match &args.tag {
                Some(tag) => TestSpec::filter_by_tag(&specs, tag).into_iter().cloned().collect(),
                None => specs,
            };
            runner.run_specs(&specs).await?
        }
        None => {
            let result = runner.run_amount_preservation().await?;
            let duration_ms = result.duration_ms;
            TestSuiteResult::from_results(vec![result], duration_ms)
        }
    };

    runner.write_results(&suite)?;
    report(&suite);

    Ok(suite.failed == 0)
}

fn report(suite: &TestSuiteResult) {
    for result in &suite.results {
        if let Some(message) = result.failure_message() {
            println!("An error occurred: {}", message);
        }
        if let Some(shot) = result.screenshot.as_ref().or(result.error_screenshot.as_ref()) {
            info!("{}: {} ({}x{})", result.name, shot.path.display(), shot.width, shot.height);
        }
    }

    if suite.failed == 0 && suite.total > 0 {
        println!("Verification script ran successfully.");
    }
}
