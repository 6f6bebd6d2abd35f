//! Entry key types
//!
//! An entry is identified by the class it belongs to and the student's
//! number within that class.

use serde::{Deserialize, Serialize};

use super::error::RegistryError;

/// Unique identifier for a queue entry (class code + class number)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryKey {
    /// Class code (e.g., "1A")
    #[serde(rename = "classcode")]
    pub class_code: String,
    /// Class number of the student within the class
    #[serde(rename = "classno")]
    pub class_no: u32,
}

impl EntryKey {
    /// Create a new entry key
    pub fn new(class_code: impl Into<String>, class_no: u32) -> Self {
        Self {
            class_code: class_code.into(),
            class_no,
        }
    }

    /// Parse a key from its textual route form
    ///
    /// The class number must be a non-negative integer.
    pub fn parse(class_code: &str, class_no: &str) -> Result<Self, RegistryError> {
        let class_no = class_no.trim().parse::<u32>().map_err(|_| {
            RegistryError::Validation(format!("invalid class number: {:?}", class_no))
        })?;
        Ok(Self::new(class_code.trim(), class_no))
    }

    /// Check that the class code is well formed
    ///
    /// Class codes are short ASCII alphanumeric identifiers.
    pub fn validate(&self, max_class_code_len: usize) -> Result<(), RegistryError> {
        validate_class_code(&self.class_code, max_class_code_len)
    }
}

impl std::fmt::Display for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.class_code, self.class_no)
    }
}

/// Validate a bare class code
pub fn validate_class_code(class_code: &str, max_len: usize) -> Result<(), RegistryError> {
    if class_code.is_empty() {
        return Err(RegistryError::Validation("class code is empty".into()));
    }
    if class_code.len() > max_len {
        return Err(RegistryError::Validation(format!(
            "class code longer than {} characters: {:?}",
            max_len, class_code
        )));
    }
    if !class_code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(RegistryError::Validation(format!(
            "class code must be alphanumeric: {:?}",
            class_code
        )));
    }
    Ok(())
}

/// Parse a priority value from its textual route form
pub fn parse_priority(text: &str) -> Result<i32, RegistryError> {
    text.trim()
        .parse::<i32>()
        .map_err(|_| RegistryError::Validation(format!("invalid priority: {:?}", text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_label_form() {
        assert_eq!(EntryKey::new("1A", 5).to_string(), "1A5");
        assert_eq!(EntryKey::new("6D", 32).to_string(), "6D32");
    }

    #[test]
    fn test_parse() {
        let key = EntryKey::parse("3C", "12").unwrap();
        assert_eq!(key, EntryKey::new("3C", 12));

        let key = EntryKey::parse(" 3C ", " 7 ").unwrap();
        assert_eq!(key, EntryKey::new("3C", 7));
    }

    #[test]
    fn test_parse_rejects_bad_class_no() {
        for bad in ["", "abc", "-1", "1.5", "99999999999"] {
            let result = EntryKey::parse("1A", bad);
            assert!(
                matches!(result, Err(RegistryError::Validation(_))),
                "expected validation error for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_validate() {
        assert!(EntryKey::new("1A", 1).validate(16).is_ok());
        assert!(EntryKey::new("", 1).validate(16).is_err());
        assert!(EntryKey::new("1A\"or", 1).validate(16).is_err());
        assert!(EntryKey::new("ABCDEFGHIJKLMNOPQ", 1).validate(16).is_err());
    }

    #[test]
    fn test_parse_priority() {
        assert_eq!(parse_priority("3").unwrap(), 3);
        assert_eq!(parse_priority("-2").unwrap(), -2);
        assert!(matches!(
            parse_priority("high"),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_serde_field_names() {
        let json = serde_json::to_string(&EntryKey::new("1A", 5)).unwrap();
        assert_eq!(json, r#"{"classcode":"1A","classno":5}"#);
    }
}
