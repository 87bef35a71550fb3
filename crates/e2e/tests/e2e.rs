//! Amount-preservation journey against a live app
//!
//! The live test needs the Kanakku dev server on http://localhost:9002/ and
//! Playwright installed (`npm i playwright && npx playwright install chromium`).
//! Run with: cargo test --package kanakku-e2e --test e2e -- --ignored

use std::path::{Path, PathBuf};

use kanakku_e2e::playwright::PlaywrightConfig;
use kanakku_e2e::scenario::{self, ScenarioConfig, ScenarioParams};
use kanakku_e2e::server::ReadinessConfig;
use kanakku_e2e::{E2eConfig, TestRunner, TestSpec};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn specs_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/specs")
}

#[test]
fn yaml_spec_matches_built_in_journey() {
    let params = ScenarioParams::generate(&ScenarioConfig::default(), &mut StdRng::seed_from_u64(9));

    let yaml = TestSpec::from_file(&specs_dir().join("amount_preservation.yaml"))
        .expect("parse yaml spec")
        .bind(&params.variables())
        .expect("bind variables");
    let built_in = scenario::amount_preservation(&params);

    assert_eq!(yaml, built_in);
}

#[test]
fn yaml_spec_references_only_known_variables() {
    let spec = TestSpec::from_file(&specs_dir().join("amount_preservation.yaml")).unwrap();
    let used: Vec<String> = spec.variables_used().into_iter().collect();
    assert_eq!(used, vec!["amount", "email", "password", "transaction_type"]);
}

#[test]
fn specs_directory_loads() {
    let specs = TestSpec::load_all(&specs_dir()).unwrap();
    assert!(specs.iter().any(|s| s.name == scenario::SCENARIO_NAME));
    assert_eq!(TestSpec::filter_by_tag(&specs, "transactions").len(), specs.len());
}

#[tokio::test]
#[ignore = "requires the app on localhost:9002 and Playwright"]
async fn amount_survives_transaction_type_switch() {
    let output = tempfile::tempdir().unwrap();
    let config = E2eConfig {
        playwright: PlaywrightConfig {
            output_dir: output.path().to_path_buf(),
            ..Default::default()
        },
        readiness: ReadinessConfig {
            enabled: true,
            ..Default::default()
        },
        ..Default::default()
    };

    let runner = TestRunner::new(config).unwrap();
    runner.prepare().await.unwrap();

    let result = runner.run_amount_preservation().await.unwrap();
    assert!(result.success, "journey failed: {:?}", result.failure_message());

    let shot = result.screenshot.expect("success screenshot");
    assert!(shot.path.ends_with("amount-preserved.png"));
    assert!(result.error_screenshot.is_none());
    assert!(!output.path().join("error.png").exists());
}
