//! Log-safe rendering of credentials
//!
//! Passwords and access tokens never reach logs or `Debug` output in full;
//! only a short prefix is kept so operators can tell two secrets apart.

use std::fmt;

/// Masked representation of a secret
///
/// Shows the first 4 characters followed by `***`. Secrets of 8 characters
/// or fewer are masked entirely.
#[derive(Clone, Copy)]
pub struct SensitiveValue<'a> {
    inner: &'a str,
}

impl<'a> SensitiveValue<'a> {
    /// # Example
    /// ```
    /// use artifactory_exporter::logging::SensitiveValue;
    ///
    /// assert_eq!(SensitiveValue::new("cmVmdGtuOjAxOjE3").to_string(), "cmVm***");
    /// assert_eq!(SensitiveValue::new("short").to_string(), "***");
    /// ```
    pub fn new(inner: &'a str) -> Self {
        Self { inner }
    }
}

impl fmt::Display for SensitiveValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const VISIBLE: usize = 4;

        if self.inner.chars().count() <= VISIBLE * 2 {
            return write!(f, "***");
        }
        let prefix: String = self.inner.chars().take(VISIBLE).collect();
        write!(f, "{}***", prefix)
    }
}

impl fmt::Debug for SensitiveValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}
