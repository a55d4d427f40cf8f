//! Attribute validators run during ValidateResourceConfig

use crate::types::{AttributePath, Diagnostic, Dynamic};
use regex::Regex;

/// Validator checks a known, non-null attribute value
pub trait Validator: Send + Sync {
    fn description(&self) -> String;
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>);
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLengthValidator {
    pub fn between(min: usize, max: usize) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("length must be between {} and {}", min, max),
            (Some(min), None) => format!("length must be at least {}", min),
            (None, Some(max)) => format!("length must be at most {}", max),
            (None, None) => "any length".to_string(),
        }
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let s = match value.as_str() {
            Some(s) => s,
            None => return,
        };
        let len = s.chars().count();
        let too_short = self.min.is_some_and(|min| len < min);
        let too_long = self.max.is_some_and(|max| len > max);
        if too_short || too_long {
            diagnostics.push(
                Diagnostic::error(
                    format!("Invalid value for {}", path),
                    format!("{}, got {}", self.description(), len),
                )
                .with_attribute(path.clone()),
            );
        }
    }
}

pub struct StringPatternValidator {
    pub pattern: Regex,
    pub description: String,
}

impl StringPatternValidator {
    /// Fails on an invalid regular expression
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            description: format!("must match {}", pattern),
        })
    }
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if !self.pattern.is_match(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid value for {}", path),
                        format!("Value '{}' {}", s, self.description),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

/// Pattern and length together, reported as a single diagnostic
pub struct StringRegexLengthValidator {
    pattern: StringPatternValidator,
    length: StringLengthValidator,
}

impl StringRegexLengthValidator {
    pub fn new(pattern: &str, min: usize, max: usize) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: StringPatternValidator::new(pattern)?,
            length: StringLengthValidator::between(min, max),
        })
    }
}

impl Validator for StringRegexLengthValidator {
    fn description(&self) -> String {
        format!("{} and {}", self.pattern.description(), self.length.description())
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let mut found = Vec::new();
        self.pattern.validate(value, path, &mut found);
        self.length.validate(value, path, &mut found);
        if !found.is_empty() {
            diagnostics.push(
                Diagnostic::error(
                    format!("Invalid value for {}", path),
                    format!("Value {}", self.description()),
                )
                .with_attribute(path.clone()),
            );
        }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        format!("must be within {:?}..={:?}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(n) = value.as_f64() {
            if let Some(min) = self.min {
                if n < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must be at least {}", path, min),
                            format!("Got {}", n),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if n > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must be at most {}", path, max),
                            format!("Got {}", n),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID_PATTERN: &str = "^[-0-9a-z]+$";

    #[test]
    fn string_length_validator_accepts_valid_length() {
        let validator = StringLengthValidator::between(3, 10);
        let mut diagnostics = Vec::new();

        validator.validate(
            &Dynamic::from("hello"),
            &AttributePath::new("name"),
            &mut diagnostics,
        );

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn string_length_validator_rejects_short_string() {
        let validator = StringLengthValidator::between(3, 10);
        let mut diagnostics = Vec::new();

        validator.validate(
            &Dynamic::from("hi"),
            &AttributePath::new("name"),
            &mut diagnostics,
        );

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some(AttributePath::new("name")));
    }

    #[test]
    fn regex_length_validator_accepts_pipeline_ids() {
        let validator = StringRegexLengthValidator::new(ID_PATTERN, 36, 36).unwrap();
        let mut diagnostics = Vec::new();

        validator.validate(
            &Dynamic::from("94619026-912b-4d92-8f51-6c74f0692d90"),
            &AttributePath::new("pipeline_id"),
            &mut diagnostics,
        );

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn regex_length_validator_reports_once() {
        let validator = StringRegexLengthValidator::new(ID_PATTERN, 36, 36).unwrap();
        let mut diagnostics = Vec::new();

        validator.validate(
            &Dynamic::from("NOT_VALID"),
            &AttributePath::new("pipeline_id"),
            &mut diagnostics,
        );

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("pipeline_id"));
    }

    #[test]
    fn validators_ignore_other_types() {
        let validator = StringPatternValidator::new(ID_PATTERN).unwrap();
        let mut diagnostics = Vec::new();

        validator.validate(
            &Dynamic::Bool(true),
            &AttributePath::new("flag"),
            &mut diagnostics,
        );

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn number_range_validator_checks_bounds() {
        let validator = NumberRangeValidator {
            min: Some(1.0),
            max: Some(5.0),
        };
        let mut diagnostics = Vec::new();

        validator.validate(
            &Dynamic::Number(7.0),
            &AttributePath::new("max_concurrent_runs"),
            &mut diagnostics,
        );

        assert_eq!(diagnostics.len(), 1);
    }
}
