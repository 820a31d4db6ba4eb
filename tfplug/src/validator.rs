use crate::types::{Diagnostics, Dynamic};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

pub trait Validator: Send + Sync {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics);
}

/// Matches strings against a regular expression. Compiled patterns are
/// shared across validators; a pattern that fails to compile is reported as
/// an error on every value it is asked to check.
pub struct StringPatternValidator {
    pattern: Result<Regex, regex::Error>,
    description: String,
}

fn compiled(pattern: &str) -> Result<Regex, regex::Error> {
    static PATTERNS: OnceLock<Mutex<HashMap<String, Result<Regex, regex::Error>>>> =
        OnceLock::new();

    let mut patterns = PATTERNS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    patterns
        .entry(pattern.to_string())
        .or_insert_with(|| Regex::new(pattern))
        .clone()
}

impl StringPatternValidator {
    pub fn new(pattern: &str, description: &str) -> Self {
        Self {
            pattern: compiled(pattern),
            description: description.to_string(),
        }
    }

    pub fn create(pattern: &str, description: &str) -> Box<dyn Validator> {
        Box::new(Self::new(pattern, description))
    }
}

impl Validator for StringPatternValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        let Some(s) = value.as_string() else {
            return;
        };

        match &self.pattern {
            Ok(pattern) if !pattern.is_match(s) => diagnostics.add_error(
                format!("{} must match {}", attribute_path, self.description),
                Some(format!("Value does not match pattern {}", pattern)),
            ),
            Ok(_) => {}
            Err(e) => diagnostics.add_error(
                format!("{} has an invalid pattern", attribute_path),
                Some(e.to_string()),
            ),
        }
    }
}

/// Accepts strings that compile as regular expressions
pub struct RegexSyntaxValidator;

impl Validator for RegexSyntaxValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_string() {
            if let Err(e) = Regex::new(s) {
                diagnostics.add_error(
                    format!("{} must be a valid regular expression", attribute_path),
                    Some(e.to_string()),
                );
            }
        }
    }
}

/// Accepts one of a fixed set of strings
pub struct OneOfValidator {
    pub allowed: Vec<String>,
}

impl OneOfValidator {
    pub fn create(allowed: &[&str]) -> Box<dyn Validator> {
        Box::new(Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl Validator for OneOfValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_string() {
            if !self.allowed.iter().any(|a| a == s) {
                diagnostics.add_error(
                    format!("{} must be one of: {}", attribute_path, self.allowed.join(", ")),
                    Some(format!("Got '{}'", s)),
                );
            }
        }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Validator for NumberRangeValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(n) = value.as_number() {
            if let Some(min) = self.min {
                if n < min {
                    diagnostics.add_error(
                        format!("{} must be at least {}", attribute_path, min),
                        Some(format!("Got {}", n)),
                    );
                }
            }
            if let Some(max) = self.max {
                if n > max {
                    diagnostics.add_error(
                        format!("{} must be at most {}", attribute_path, max),
                        Some(format!("Got {}", n)),
                    );
                }
            }
        }
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for ListLengthValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Dynamic::List(items) = value {
            if let Some(min) = self.min {
                if items.len() < min {
                    diagnostics.add_error(
                        format!("{} must have at least {} items", attribute_path, min),
                        Some(format!("Got {} items", items.len())),
                    );
                }
            }
            if let Some(max) = self.max {
                if items.len() > max {
                    diagnostics.add_error(
                        format!("{} must have at most {} items", attribute_path, max),
                        Some(format!("Got {} items", items.len())),
                    );
                }
            }
        }
    }
}

/// Map must hold at least one entry
pub struct NonEmptyMapValidator;

impl Validator for NonEmptyMapValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Dynamic::Map(entries) = value {
            if entries.is_empty() {
                diagnostics.add_error(
                    format!("{} must not be empty", attribute_path),
                    None::<String>,
                );
            }
        }
    }
}
