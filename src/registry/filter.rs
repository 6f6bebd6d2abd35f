//! Entry query filters
//!
//! A filter selects entries by class code (any of a set) and optionally by
//! comparisons on `isComplete` and `priority`. Comparison operators come from
//! a closed vocabulary and are checked when the filter is built, so nothing
//! user supplied ever reaches a query as raw text.

use std::collections::BTreeSet;
use std::str::FromStr;

use super::config::RegistryConfig;
use super::entry::Entry;
use super::error::RegistryError;
use super::key::validate_class_code;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
}

impl CompareOp {
    /// Operator symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
        }
    }

    /// Evaluate `lhs <op> rhs`
    pub fn eval<T: Ord>(&self, lhs: &T, rhs: &T) -> bool {
        match self {
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Le => lhs <= rhs,
        }
    }
}

impl FromStr for CompareOp {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(CompareOp::Eq),
            "!=" => Ok(CompareOp::Ne),
            ">" => Ok(CompareOp::Gt),
            "<" => Ok(CompareOp::Lt),
            ">=" => Ok(CompareOp::Ge),
            "<=" => Ok(CompareOp::Le),
            other => Err(RegistryError::Validation(format!(
                "unsupported operator: {:?}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Literal types a predicate can compare against
pub trait Literal: Ord + Copy + std::fmt::Display {
    /// Parse the literal part of a predicate
    fn parse_literal(text: &str) -> Result<Self, RegistryError>;
}

impl Literal for bool {
    fn parse_literal(text: &str) -> Result<Self, RegistryError> {
        match text {
            "true" | "TRUE" | "True" | "1" => Ok(true),
            "false" | "FALSE" | "False" | "0" => Ok(false),
            other => Err(RegistryError::Validation(format!(
                "expected boolean literal, got {:?}",
                other
            ))),
        }
    }
}

impl Literal for i32 {
    fn parse_literal(text: &str) -> Result<Self, RegistryError> {
        text.parse::<i32>().map_err(|_| {
            RegistryError::Validation(format!("expected integer literal, got {:?}", text))
        })
    }
}

/// A single comparison against a literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Predicate<T> {
    pub op: CompareOp,
    pub value: T,
}

impl<T: Literal> Predicate<T> {
    /// Create a predicate
    pub fn new(op: CompareOp, value: T) -> Self {
        Self { op, value }
    }

    /// Build a predicate from a separate operator and literal
    pub fn from_parts(op: &str, value: &str) -> Result<Self, RegistryError> {
        Ok(Self {
            op: op.trim().parse()?,
            value: T::parse_literal(value.trim())?,
        })
    }

    /// Parse the compact `"<op><literal>"` form, e.g. `"=true"` or `">=2"`
    pub fn parse(text: &str) -> Result<Self, RegistryError> {
        let text = text.trim();
        let split = text
            .find(|c: char| !(c.is_ascii_punctuation() && c != '-' && c != '+'))
            .unwrap_or(text.len());
        let (op, value) = text.split_at(split);

        if op.is_empty() {
            return Err(RegistryError::Validation(format!(
                "missing operator in {:?}",
                text
            )));
        }

        Self::from_parts(op, value)
    }

    /// Check a value against this predicate
    pub fn matches(&self, actual: T) -> bool {
        self.op.eval(&actual, &self.value)
    }
}

impl<T: Literal> std::fmt::Display for Predicate<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.op, self.value)
    }
}

/// Query descriptor for listing entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// Class codes to include (logical OR)
    pub class_codes: BTreeSet<String>,
    /// Optional predicate on `isComplete`
    pub is_complete: Option<Predicate<bool>>,
    /// Optional predicate on `priority`
    pub priority: Option<Predicate<i32>>,
}

impl Filter {
    /// Create a filter matching any of the given class codes
    pub fn class_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            class_codes: codes.into_iter().map(Into::into).collect(),
            is_complete: None,
            priority: None,
        }
    }

    /// Add a predicate on `isComplete`
    pub fn is_complete(mut self, predicate: Predicate<bool>) -> Self {
        self.is_complete = Some(predicate);
        self
    }

    /// Add a predicate on `priority`
    pub fn priority(mut self, predicate: Predicate<i32>) -> Self {
        self.priority = Some(predicate);
        self
    }

    /// Build a filter from its textual wire form
    pub fn parse<I, S>(
        codes: I,
        is_complete: Option<&str>,
        priority: Option<&str>,
    ) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filter = Self::class_codes(codes);
        if let Some(text) = is_complete.filter(|t| !t.trim().is_empty()) {
            filter.is_complete = Some(Predicate::parse(text)?);
        }
        if let Some(text) = priority.filter(|t| !t.trim().is_empty()) {
            filter.priority = Some(Predicate::parse(text)?);
        }
        Ok(filter)
    }

    /// Check the filter before any entry is scanned
    pub fn validate(&self, config: &RegistryConfig) -> Result<(), RegistryError> {
        if self.class_codes.is_empty() {
            return Err(RegistryError::Validation(
                "filter needs at least one class code".into(),
            ));
        }
        if self.class_codes.len() > config.max_filter_class_codes {
            return Err(RegistryError::Validation(format!(
                "filter has {} class codes, limit is {}",
                self.class_codes.len(),
                config.max_filter_class_codes
            )));
        }
        for code in &self.class_codes {
            validate_class_code(code, config.max_class_code_len)?;
        }
        Ok(())
    }

    /// Check whether an entry satisfies the filter
    pub fn matches(&self, entry: &Entry) -> bool {
        self.class_codes.contains(&entry.key.class_code)
            && self
                .is_complete
                .map_or(true, |p| p.matches(entry.is_complete))
            && self.priority.map_or(true, |p| p.matches(entry.priority))
    }
}
