use thiserror::Error;

/// Violations of the domain's field rules, raised before anything is persisted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("`{field}` must not be blank")]
    Blank { field: &'static str },
    #[error("`{field}` must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("`{value}` is not a valid slug")]
    InvalidSlug { value: String },
    #[error("`{value}` is not a valid username")]
    InvalidUsername { value: String },
    #[error("an author cannot follow themselves")]
    SelfFollow,
}

impl DomainError {
    pub fn blank(field: &'static str) -> Self {
        Self::Blank { field }
    }

    pub fn too_long(field: &'static str, max: usize) -> Self {
        Self::TooLong { field, max }
    }

    /// Name of the form field the violation belongs to, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            DomainError::Blank { field } | DomainError::TooLong { field, .. } => Some(field),
            DomainError::InvalidSlug { .. } => Some("slug"),
            DomainError::InvalidUsername { .. } => Some("username"),
            DomainError::SelfFollow => None,
        }
    }
}
