//! Built-in amount-preservation journey
//!
//! Signs up a fresh account, creates a family during onboarding, opens the
//! "Add New Transaction" modal, types an amount and flips the transaction
//! type from Expense to Income. The amount input must read back the exact
//! string before and after the switch.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::credentials::{CredentialPolicy, Credentials};
use crate::locator::Locator;
use crate::spec::{TestSpec, TestStep, Viewport};

pub const SCENARIO_NAME: &str = "amount-preservation";

/// Screenshot saved when the journey passes
pub const SUCCESS_SCREENSHOT: &str = "amount-preserved";

/// Screenshot saved when any step fails
pub const ERROR_SCREENSHOT: &str = "error";

/// Tunables for the journey
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Decimal string typed into the amount field
    pub amount: String,

    /// Option picked in the "Type" combobox
    pub transaction_type: String,

    /// Bound for login, onboarding and dashboard transitions
    pub screen_timeout_ms: u64,

    /// Bound for the sign-up card to appear
    pub sign_up_timeout_ms: u64,

    pub credentials: CredentialPolicy,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            amount: "123.45".to_string(),
            transaction_type: "Income".to_string(),
            screen_timeout_ms: 15_000,
            sign_up_timeout_ms: 10_000,
            credentials: CredentialPolicy::default(),
        }
    }
}

/// Concrete values for one run
#[derive(Debug, Clone)]
pub struct ScenarioParams {
    pub credentials: Credentials,
    pub amount: String,
    pub transaction_type: String,
    pub screen_timeout_ms: u64,
    pub sign_up_timeout_ms: u64,
}

impl ScenarioParams {
    /// Draw fresh credentials for a run
    pub fn generate<R: Rng + ?Sized>(config: &ScenarioConfig, rng: &mut R) -> Self {
        Self {
            credentials: Credentials::generate(rng, &config.credentials),
            amount: config.amount.clone(),
            transaction_type: config.transaction_type.clone(),
            screen_timeout_ms: config.screen_timeout_ms,
            sign_up_timeout_ms: config.sign_up_timeout_ms,
        }
    }

    /// Variables available to YAML specs as `${name}`
    pub fn variables(&self) -> HashMap<String, String> {
        HashMap::from([
            ("email".to_string(), self.credentials.email.clone()),
            ("password".to_string(), self.credentials.password.clone()),
            ("amount".to_string(), self.amount.clone()),
            ("transaction_type".to_string(), self.transaction_type.clone()),
        ])
    }
}

/// Build the sign-up → onboarding → add-transaction journey
pub fn amount_preservation(params: &ScenarioParams) -> TestSpec {
    let screen = Some(params.screen_timeout_ms);
    let amount = Locator::label("Amount");

    let steps = vec![
        // Sign up
        TestStep::Navigate { url: "/".to_string() },
        TestStep::ExpectVisible { target: Locator::heading("Welcome Back"), timeout_ms: screen },
        TestStep::Click { target: Locator::button("Sign up"), timeout_ms: None },
        TestStep::ExpectVisible {
            target: Locator::heading("Create an Account"),
            timeout_ms: Some(params.sign_up_timeout_ms),
        },
        TestStep::Fill { target: Locator::label("Email"), value: params.credentials.email.clone() },
        TestStep::Fill {
            target: Locator::label("Password"),
            value: params.credentials.password.clone(),
        },
        TestStep::Click { target: Locator::button("Sign Up"), timeout_ms: None },
        // Onboarding
        TestStep::ExpectVisible { target: Locator::heading("Welcome to Kanakku"), timeout_ms: screen },
        TestStep::Click { target: Locator::button("Create New Family"), timeout_ms: None },
        // Dashboard
        TestStep::ExpectVisible { target: Locator::heading("Welcome Back!"), timeout_ms: screen },
        TestStep::ExpectVisible { target: Locator::button("Add"), timeout_ms: None },
        TestStep::Click { target: Locator::button("Add"), timeout_ms: None },
        TestStep::ExpectVisible { target: Locator::heading("Add New Transaction"), timeout_ms: None },
        // Amount survives the type switch
        TestStep::ExpectVisible { target: amount.clone(), timeout_ms: None },
        TestStep::Fill { target: amount.clone(), value: params.amount.clone() },
        TestStep::ExpectValue { target: amount.clone(), value: params.amount.clone(), timeout_ms: None },
        TestStep::Click { target: Locator::role("combobox", "Type"), timeout_ms: None },
        TestStep::Click {
            target: Locator::role("option", params.transaction_type.clone()),
            timeout_ms: None,
        },
        TestStep::ExpectValue { target: amount, value: params.amount.clone(), timeout_ms: None },
        TestStep::Screenshot { name: SUCCESS_SCREENSHOT.to_string(), full_page: true },
    ];

    TestSpec {
        name: SCENARIO_NAME.to_string(),
        description: "Amount input keeps its value when the transaction type changes".to_string(),
        tags: vec!["smoke".to_string(), "transactions".to_string()],
        viewport: Viewport { width: 1280, height: 720 },
        steps,
        error_screenshot: ERROR_SCREENSHOT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params() -> ScenarioParams {
        ScenarioParams::generate(&ScenarioConfig::default(), &mut StdRng::seed_from_u64(3))
    }

    #[test]
    fn test_amount_is_checked_before_and_after_type_switch() {
        let spec = amount_preservation(&params());

        let switch = spec
            .steps
            .iter()
            .position(|s| matches!(s, TestStep::Click { target, .. } if *target == Locator::role("option", "Income")))
            .expect("type switch step");
        let checks: Vec<usize> = spec
            .steps
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s, TestStep::ExpectValue { value, .. } if value == "123.45"))
            .map(|(i, _)| i)
            .collect();

        assert_eq!(checks.len(), 2);
        assert!(checks[0] < switch);
        assert!(checks[1] > switch);
    }

    #[test]
    fn test_screen_timeouts() {
        let spec = amount_preservation(&params());
        let timeout_for = |heading: &str| {
            spec.steps.iter().find_map(|s| match s {
                TestStep::ExpectVisible { target, timeout_ms } if *target == Locator::heading(heading) => {
                    Some(*timeout_ms)
                }
                _ => None,
            })
        };

        assert_eq!(timeout_for("Welcome Back"), Some(Some(15_000)));
        assert_eq!(timeout_for("Create an Account"), Some(Some(10_000)));
        assert_eq!(timeout_for("Welcome to Kanakku"), Some(Some(15_000)));
        assert_eq!(timeout_for("Welcome Back!"), Some(Some(15_000)));
        assert_eq!(timeout_for("Add New Transaction"), Some(None));
    }

    #[test]
    fn test_journey_ends_with_success_screenshot() {
        let spec = amount_preservation(&params());
        assert_eq!(spec.screenshot_names(), vec![SUCCESS_SCREENSHOT]);
        assert!(matches!(spec.steps.last(), Some(TestStep::Screenshot { full_page: true, .. })));
        assert_eq!(spec.error_screenshot, ERROR_SCREENSHOT);
    }

    #[test]
    fn test_sign_up_uses_generated_credentials() {
        let params = params();
        let spec = amount_preservation(&params);

        assert!(spec.steps.contains(&TestStep::Fill {
            target: Locator::label("Email"),
            value: params.credentials.email.clone(),
        }));
        assert!(spec.steps.contains(&TestStep::Fill {
            target: Locator::label("Password"),
            value: "password123".to_string(),
        }));
    }

    #[test]
    fn test_variables_expose_run_values() {
        let params = params();
        let vars = params.variables();
        assert_eq!(vars["email"], params.credentials.email);
        assert_eq!(vars["amount"], "123.45");
        assert_eq!(vars["transaction_type"], "Income");
    }
}
