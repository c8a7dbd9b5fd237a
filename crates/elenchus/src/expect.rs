//! Core assertion engine: subject wrapper, negation, and the assert contract.
//!
//! The engine itself knows nothing about HTTP. It carries a subject, the
//! strictness policy, and a negation flag, and renders the right failure
//! message when a predicate does not hold. The HTTP predicates in
//! [`crate::assertions`] are extension traits layered on top of [`Expect`].

use regex::Regex;
use serde_json::Value;
use std::fmt;

/// Policy applied by the assertion entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// When true, predicates validate the subject's role before inspecting
    /// its attributes.
    pub strict: bool,
}

impl Config {
    /// Strict policy: predicates reject subjects of the wrong role.
    #[must_use]
    pub fn strict() -> Self {
        Self { strict: true }
    }

    /// Lenient policy: role checks are skipped and predicates operate on
    /// whatever capabilities the subject exposes.
    #[must_use]
    pub fn lenient() -> Self {
        Self { strict: false }
    }

    /// Starts an assertion chain over `subject` under this policy.
    pub fn expect<T>(self, subject: T) -> Expect<T> {
        Expect::new(subject, self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::strict()
    }
}

/// Starts an assertion chain over `subject` under the default (strict)
/// policy.
///
/// # Example
///
/// ```
/// use elenchus::{expect, HttpAssertions, Response};
///
/// let response = Response::new().with_status(200);
/// expect(&response).to_have_status(200);
/// expect(&response).not().to_redirect();
/// ```
pub fn expect<T>(subject: T) -> Expect<T> {
    Config::default().expect(subject)
}

/// An in-flight assertion: a subject plus the policy and negation state the
/// next predicate will be evaluated under.
pub struct Expect<T> {
    subject: T,
    config: Config,
    negated: bool,
}

impl<T> Expect<T> {
    /// Wraps `subject` for assertion under `config`.
    pub fn new(subject: T, config: Config) -> Self {
        Self {
            subject,
            config,
            negated: false,
        }
    }

    /// Flips the negation flag: subsequent predicates assert the negated
    /// form and fail with the negated message when the check holds.
    #[must_use]
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// The subject under assertion.
    pub fn subject(&self) -> &T {
        &self.subject
    }

    pub(crate) fn config(&self) -> Config {
        self.config
    }

    /// Re-wraps `subject` carrying over this chain's policy and negation
    /// state. Used by predicates that delegate to a sub-assertion over a
    /// derived subject.
    pub(crate) fn transfer<U>(&self, subject: U) -> Expect<U> {
        Expect {
            subject,
            config: self.config,
            negated: self.negated,
        }
    }

    /// A fresh, never-negated chain over a borrow of the same subject.
    /// Preconditions run through this so `.not()` on the outer chain does
    /// not invert them.
    pub(crate) fn affirmed(&self) -> Expect<&T> {
        Expect {
            subject: &self.subject,
            config: self.config,
            negated: false,
        }
    }

    /// The assert contract: on a plain chain, panics with `message` when
    /// `passed` is false; on a negated chain, panics with `negated_message`
    /// when `passed` is true.
    #[track_caller]
    pub fn verify(
        &self,
        passed: bool,
        message: impl Into<String>,
        negated_message: impl Into<String>,
    ) -> &Self {
        if self.negated {
            if passed {
                panic!("{}", negated_message.into());
            }
        } else if !passed {
            panic!("{}", message.into());
        }
        self
    }

    /// Fails unconditionally, ignoring negation. Precondition failures
    /// (wrong role, missing required field) report through this.
    #[track_caller]
    pub fn fail(&self, message: impl Into<String>) -> ! {
        panic!("{}", message.into());
    }
}

impl Expect<Value> {
    /// Asserts the subject map has a top-level property `key`.
    #[track_caller]
    pub fn to_have_property(&self, key: &str) -> &Self {
        self.verify(
            self.subject.get(key).is_some(),
            format!("expected {} to have property '{key}'", self.subject),
            format!("expected {} to not have property '{key}'", self.subject),
        )
    }

    /// Asserts the subject map has a top-level property `key` with string
    /// value `value`.
    #[track_caller]
    pub fn to_have_property_value(&self, key: &str, value: &str) -> &Self {
        self.property_check(self.subject.get(key), key, value, "property")
    }

    /// Asserts the subject map has a property at the dotted `path`.
    /// Path segments descend string-keyed maps; numeric segments index
    /// arrays.
    #[track_caller]
    pub fn to_have_nested_property(&self, path: &str) -> &Self {
        self.verify(
            value_at(&self.subject, path).is_some(),
            format!("expected {} to have nested property '{path}'", self.subject),
            format!(
                "expected {} to not have nested property '{path}'",
                self.subject
            ),
        )
    }

    /// Asserts the subject map has a property at the dotted `path` with
    /// string value `value`.
    #[track_caller]
    pub fn to_have_nested_property_value(&self, path: &str, value: &str) -> &Self {
        self.property_check(value_at(&self.subject, path), path, value, "nested property")
    }

    #[track_caller]
    fn property_check(
        &self,
        found: Option<&Value>,
        key: &str,
        value: &str,
        kind: &str,
    ) -> &Self {
        let passed = found.is_some_and(|v| v.as_str() == Some(value));
        let message = match found {
            Some(actual) => format!(
                "expected {} to have {kind} '{key}' of '{value}', but got {actual}",
                self.subject
            ),
            None => format!("expected {} to have {kind} '{key}'", self.subject),
        };
        self.verify(
            passed,
            message,
            format!(
                "expected {} to not have {kind} '{key}' of '{value}'",
                self.subject
            ),
        )
    }
}

/// Walks a dotted path into a value tree. Numeric segments index arrays,
/// everything else keys into maps.
fn value_at<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        if segment.is_empty() {
            continue;
        }
        current = match segment.parse::<usize>() {
            Ok(index) => current.get(index)?,
            Err(_) => current.get(segment)?,
        };
    }
    Some(current)
}

/// An expected value: either an exact string or a pattern the actual value
/// must match.
pub enum ValueMatch {
    /// Exact string equality.
    Exact(String),
    /// Regular-expression match.
    Pattern(Regex),
}

impl ValueMatch {
    pub(crate) fn matches(&self, actual: &str) -> bool {
        match self {
            Self::Exact(expected) => actual == expected,
            Self::Pattern(pattern) => pattern.is_match(actual),
        }
    }

    pub(crate) fn is_pattern(&self) -> bool {
        matches!(self, Self::Pattern(_))
    }
}

impl fmt::Display for ValueMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(expected) => f.write_str(expected),
            Self::Pattern(pattern) => write!(f, "/{pattern}/"),
        }
    }
}

impl From<&str> for ValueMatch {
    fn from(value: &str) -> Self {
        Self::Exact(value.to_owned())
    }
}

impl From<String> for ValueMatch {
    fn from(value: String) -> Self {
        Self::Exact(value)
    }
}

impl From<Regex> for ValueMatch {
    fn from(pattern: Regex) -> Self {
        Self::Pattern(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn verify_passes_silently() {
        expect(1).verify(true, "affirmative", "negated");
        expect(1).not().verify(false, "affirmative", "negated");
    }

    #[test]
    #[should_panic(expected = "affirmative")]
    fn verify_fails_with_affirmative_message() {
        expect(1).verify(false, "affirmative", "negated");
    }

    #[test]
    #[should_panic(expected = "negated")]
    fn verify_fails_with_negated_message() {
        expect(1).not().verify(true, "affirmative", "negated");
    }

    #[test]
    fn not_toggles_back() {
        expect(1).not().not().verify(true, "affirmative", "negated");
    }

    #[test]
    fn default_config_is_strict() {
        assert_eq!(Config::default(), Config::strict());
        assert!(Config::strict().strict);
        assert!(!Config::lenient().strict);
    }

    #[test]
    fn property_presence() {
        let map = json!({"x": "y", "form": {"name": "jim"}});
        expect(map.clone()).to_have_property("x");
        expect(map.clone()).to_have_property("form");
        expect(map).not().to_have_property("bar");
    }

    #[test]
    #[should_panic(expected = "to not have property 'x'")]
    fn negated_property_presence_fails() {
        expect(json!({"x": "y"})).not().to_have_property("x");
    }

    #[test]
    fn property_value() {
        let map = json!({"x": "y"});
        expect(map.clone()).to_have_property_value("x", "y");
        expect(map.clone()).not().to_have_property_value("x", "z");
        expect(map).not().to_have_property_value("missing", "y");
    }

    #[test]
    #[should_panic(expected = "to have property 'x' of 'z', but got \"y\"")]
    fn property_value_mismatch_names_both_values() {
        expect(json!({"x": "y"})).to_have_property_value("x", "z");
    }

    #[test]
    fn nested_property() {
        let map = json!({"form": {"name": "jim", "tags": ["a", "b"]}});
        expect(map.clone()).to_have_nested_property("form.name");
        expect(map.clone()).to_have_nested_property_value("form.name", "jim");
        expect(map.clone()).to_have_nested_property_value("form.tags.1", "b");
        expect(map).not().to_have_nested_property("form.missing");
    }

    #[test]
    #[should_panic(expected = "to not have nested property 'form.name' of 'jim'")]
    fn negated_nested_property_value_fails() {
        expect(json!({"form": {"name": "jim"}}))
            .not()
            .to_have_nested_property_value("form.name", "jim");
    }

    #[test]
    fn value_match_display() {
        assert_eq!(ValueMatch::from("foo").to_string(), "foo");
        let pattern = ValueMatch::from(Regex::new("^fo").unwrap());
        assert_eq!(pattern.to_string(), "/^fo/");
        assert!(pattern.matches("foo"));
        assert!(!pattern.matches("bar"));
    }
}
