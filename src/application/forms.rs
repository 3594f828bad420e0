//! Field-level validation messages for the HTML forms.

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    entries: Vec<(&'static str, String)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.entries.push((field, message.into()));
    }

    /// Record a domain rule violation against its own field, or `fallback`.
    pub fn push_domain(&mut self, fallback: &'static str, error: &DomainError) {
        let field = error.field().unwrap_or(fallback);
        self.push(field, error.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First message recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, message)| message.as_str())
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, message)| message.as_str())
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in &self.entries {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_return_first_message_per_field() {
        let mut errors = FieldErrors::new();
        errors.push("text", "required");
        errors.push("text", "too short");
        errors.push_domain("form", &DomainError::blank("group"));

        assert_eq!(errors.get("text"), Some("required"));
        assert_eq!(errors.get("group"), Some("`group` must not be blank"));
        assert_eq!(errors.get("image"), None);
        assert_eq!(errors.messages().count(), 3);
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn display_joins_fields() {
        let mut errors = FieldErrors::single("a", "x");
        errors.push("b", "y");
        assert_eq!(errors.to_string(), "a: x; b: y");
        assert_eq!(FieldErrors::new().into_result(), Ok(()));
    }
}
