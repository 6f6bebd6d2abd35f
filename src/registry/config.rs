//! Registry configuration

/// Default maximum length of a class code
pub const DEFAULT_MAX_CLASS_CODE_LEN: usize = 16;

/// Default maximum number of class codes in one filter
pub const DEFAULT_MAX_FILTER_CLASS_CODES: usize = 64;

/// Configuration for the entry registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Longest class code accepted in keys and filters
    pub max_class_code_len: usize,

    /// Largest class code set accepted by a single `list` call
    pub max_filter_class_codes: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_class_code_len: DEFAULT_MAX_CLASS_CODE_LEN,
            max_filter_class_codes: DEFAULT_MAX_FILTER_CLASS_CODES,
        }
    }
}

impl RegistryConfig {
    /// Set the maximum class code length
    pub fn max_class_code_len(mut self, len: usize) -> Self {
        self.max_class_code_len = len.max(1);
        self
    }

    /// Set the maximum number of class codes per filter
    pub fn max_filter_class_codes(mut self, count: usize) -> Self {
        self.max_filter_class_codes = count.max(1);
        self
    }
}
