//! Declarative YAML test specification

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;

/// A complete test specification parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestSpec {
    /// Unique name for this test
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering tests
    #[serde(default)]
    pub tags: Vec<String>,

    /// Viewport size for the browser
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    /// Steps to execute in order
    pub steps: Vec<TestStep>,

    /// Screenshot name captured when a step fails
    #[serde(default = "default_error_screenshot")]
    pub error_screenshot: String,
}

fn default_viewport() -> Viewport {
    Viewport { width: 1280, height: 720 }
}

fn default_error_screenshot() -> String {
    "error".to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// A single step in a test
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Navigate to a URL (relative to base)
    Navigate {
        url: String,
    },

    /// Wait until an element is visible
    ExpectVisible {
        target: Locator,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Click an element
    Click {
        target: Locator,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Replace the contents of an input
    Fill {
        target: Locator,
        value: String,
    },

    /// Wait until an input's value equals `value` exactly
    ExpectValue {
        target: Locator,
        value: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Save a screenshot as `<name>.png` in the output directory
    Screenshot {
        name: String,
        #[serde(default = "default_full_page")]
        full_page: bool,
    },

    /// Log a message (for debugging)
    Log {
        message: String,
    },
}

fn default_full_page() -> bool {
    true
}

impl TestStep {
    /// Short name used in step events and reports
    pub fn name(&self) -> String {
        match self {
            TestStep::Navigate { url } => format!("navigate:{}", url),
            TestStep::ExpectVisible { target, .. } => format!("expect_visible:{}", target.describe()),
            TestStep::Click { target, .. } => format!("click:{}", target.describe()),
            TestStep::Fill { target, .. } => format!("fill:{}", target.describe()),
            TestStep::ExpectValue { target, .. } => format!("expect_value:{}", target.describe()),
            TestStep::Screenshot { name, .. } => format!("screenshot:{}", name),
            TestStep::Log { message } => {
                let end = message
                    .char_indices()
                    .nth(30)
                    .map(|(i, _)| i)
                    .unwrap_or(message.len());
                format!("log:{}", &message[..end])
            }
        }
    }

    /// Strings that may carry `${name}` references
    fn bindable_values(&self) -> Vec<&str> {
        match self {
            TestStep::Navigate { url } => vec![url.as_str()],
            TestStep::ExpectVisible { target, .. } | TestStep::Click { target, .. } => target.strings(),
            TestStep::Fill { target, value } | TestStep::ExpectValue { target, value, .. } => {
                let mut out = target.strings();
                out.push(value.as_str());
                out
            }
            TestStep::Log { message } => vec![message.as_str()],
            TestStep::Screenshot { .. } => vec![],
        }
    }

    fn bindable_values_mut(&mut self) -> Vec<&mut String> {
        match self {
            TestStep::Navigate { url } => vec![url],
            TestStep::ExpectVisible { target, .. } | TestStep::Click { target, .. } => {
                target.strings_mut()
            }
            TestStep::Fill { target, value } | TestStep::ExpectValue { target, value, .. } => {
                let mut out = target.strings_mut();
                out.push(value);
                out
            }
            TestStep::Log { message } => vec![message],
            TestStep::Screenshot { .. } => vec![],
        }
    }

    fn bind(&mut self, vars: &HashMap<String, String>) -> E2eResult<()> {
        for value in self.bindable_values_mut() {
            *value = substitute(value, vars)?;
        }
        Ok(())
    }
}

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"))
}

/// Replace every `${name}` in `input` with its value from `vars`
fn substitute(input: &str, vars: &HashMap<String, String>) -> E2eResult<String> {
    let mut missing = None;
    let output = variable_pattern().replace_all(input, |caps: &Captures| {
        let key = &caps[1];
        match vars.get(key) {
            Some(value) => value.clone(),
            None => {
                missing.get_or_insert_with(|| key.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(key) => Err(E2eError::UnboundVariable(key)),
        None => Ok(output.into_owned()),
    }
}

impl TestSpec {
    /// Parse a test spec from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        if spec.steps.is_empty() {
            return Err(E2eError::SpecParse(format!("'{}' has no steps", spec.name)));
        }
        Ok(spec)
    }

    /// Parse a test spec from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all test specs from a directory, sorted by file path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            let spec = Self::from_file(entry.path())?;
            specs.push(spec);
        }

        Ok(specs)
    }

    /// Filter specs by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }

    /// Substitute `${name}` references in step values
    pub fn bind(mut self, vars: &HashMap<String, String>) -> E2eResult<Self> {
        for step in &mut self.steps {
            step.bind(vars)?;
        }
        Ok(self)
    }

    /// Every `${name}` referenced by the steps
    pub fn variables_used(&self) -> BTreeSet<String> {
        self.steps
            .iter()
            .flat_map(|step| step.bindable_values())
            .flat_map(|value| variable_pattern().captures_iter(value))
            .map(|caps| caps[1].to_string())
            .collect()
    }

    /// Names of the screenshots this spec captures on success
    pub fn screenshot_names(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                TestStep::Screenshot { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}
