//! Element targeting by accessible role, label, text or CSS

use serde::{Deserialize, Serialize};

/// How a step finds its element on the page.
///
/// Role and label locators are preferred: they follow what a screen reader
/// sees, so they survive markup and class-name churn in the app. In YAML the
/// variant is picked by which key is present:
///
/// ```yaml
/// target: { role: heading, name: Welcome Back }
/// target: { label: Amount }
/// target: { css: '[data-testid="add-button"]' }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Locator {
    Role {
        role: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "is_false")]
        exact: bool,
    },
    Label {
        label: String,
        #[serde(default, skip_serializing_if = "is_false")]
        exact: bool,
    },
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "is_false")]
        exact: bool,
    },
    Css {
        css: String,
    },
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Locator {
    /// Role locator with an accessible name
    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Locator::Role {
            role: role.into(),
            name: Some(name.into()),
            exact: false,
        }
    }

    pub fn heading(name: impl Into<String>) -> Self {
        Self::role("heading", name)
    }

    pub fn button(name: impl Into<String>) -> Self {
        Self::role("button", name)
    }

    pub fn label(label: impl Into<String>) -> Self {
        Locator::Label {
            label: label.into(),
            exact: false,
        }
    }

    /// Require an exact, case-sensitive name match
    pub fn exact(mut self) -> Self {
        match &mut self {
            Locator::Role { exact, .. }
            | Locator::Label { exact, .. }
            | Locator::Text { exact, .. } => *exact = true,
            Locator::Css { .. } => {}
        }
        self
    }

    /// JavaScript expression evaluating to a Playwright `Locator` on `page`.
    ///
    /// All user-provided strings go through `js_string`, so the result is
    /// always a single well-formed expression.
    pub fn to_js(&self) -> String {
        match self {
            Locator::Role { role, name, exact } => {
                let mut options = Vec::new();
                if let Some(name) = name {
                    options.push(format!("name: {}", js_string(name)));
                }
                if *exact {
                    options.push("exact: true".to_string());
                }
                if options.is_empty() {
                    format!("page.getByRole({})", js_string(role))
                } else {
                    format!("page.getByRole({}, {{ {} }})", js_string(role), options.join(", "))
                }
            }
            Locator::Label { label, exact } => {
                format!("page.getByLabel({}, {{ exact: {} }})", js_string(label), exact)
            }
            Locator::Text { text, exact } => {
                format!("page.getByText({}, {{ exact: {} }})", js_string(text), exact)
            }
            Locator::Css { css } => format!("page.locator({})", js_string(css)),
        }
    }

    /// Strings that may carry `${name}` references
    pub(crate) fn strings(&self) -> Vec<&str> {
        match self {
            Locator::Role { role, name, .. } => {
                let mut out = vec![role.as_str()];
                out.extend(name.as_deref());
                out
            }
            Locator::Label { label, .. } => vec![label.as_str()],
            Locator::Text { text, .. } => vec![text.as_str()],
            Locator::Css { css } => vec![css.as_str()],
        }
    }

    pub(crate) fn strings_mut(&mut self) -> Vec<&mut String> {
        match self {
            Locator::Role { role, name, .. } => {
                let mut out = vec![role];
                out.extend(name.as_mut());
                out
            }
            Locator::Label { label, .. } => vec![label],
            Locator::Text { text, .. } => vec![text],
            Locator::Css { css } => vec![css],
        }
    }

    /// Short label for step names and log lines
    pub fn describe(&self) -> String {
        match self {
            Locator::Role { role, name: Some(name), .. } => format!("{} \"{}\"", role, name),
            Locator::Role { role, name: None, .. } => role.clone(),
            Locator::Label { label, .. } => format!("label \"{}\"", label),
            Locator::Text { text, .. } => format!("text \"{}\"", text),
            Locator::Css { css } => css.clone(),
        }
    }
}

/// Quote `value` as a JavaScript string literal.
///
/// JSON string syntax is a subset of JavaScript's, except for the U+2028 and
/// U+2029 separators which older engines reject inside literals.
pub fn js_string(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_role_locator_js() {
        let loc = Locator::heading("Welcome Back");
        assert_eq!(loc.to_js(), r#"page.getByRole("heading", { name: "Welcome Back" })"#);
    }

    #[test]
    fn test_exact_role_locator_js() {
        let loc = Locator::button("Add").exact();
        assert_eq!(
            loc.to_js(),
            r#"page.getByRole("button", { name: "Add", exact: true })"#
        );
    }

    #[test]
    fn test_label_locator_js() {
        assert_eq!(
            Locator::label("Amount").to_js(),
            r#"page.getByLabel("Amount", { exact: false })"#
        );
    }

    #[test_case("it's", r#""it's""# ; "single quote")]
    #[test_case(r#"say "hi""#, r#""say \"hi\"""# ; "double quote")]
    #[test_case("a\\b", r#""a\\b""# ; "backslash")]
    #[test_case("line\nbreak", r#""line\nbreak""# ; "newline")]
    #[test_case("x\u{2028}y", r#""x\u2028y""# ; "line separator")]
    fn test_js_string_escaping(input: &str, expected: &str) {
        assert_eq!(js_string(input), expected);
    }

    #[test]
    fn test_yaml_picks_variant_by_key() {
        let role: Locator = serde_yaml::from_str("{ role: option, name: Income }").unwrap();
        assert_eq!(role, Locator::role("option", "Income"));

        let label: Locator = serde_yaml::from_str("{ label: Amount }").unwrap();
        assert_eq!(label, Locator::label("Amount"));

        let css: Locator = serde_yaml::from_str("{ css: '#amount' }").unwrap();
        assert_eq!(css, Locator::Css { css: "#amount".to_string() });
    }

    #[test]
    fn test_describe() {
        assert_eq!(Locator::button("Sign up").describe(), "button \"Sign up\"");
        assert_eq!(Locator::label("Email").describe(), "label \"Email\"");
    }
}
