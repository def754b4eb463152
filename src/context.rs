//! Validation outcome of a sort query

use crate::parser::SortParameter;

/// Result of validating a sort query against the key registry
///
/// Holds every requested parameter that resolved to a registered key, in
/// request order, together with every token that did not. Built per
/// validation call and cheap to move around; it carries no reference back
/// into the sorter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortContext {
    valid_parameters: Vec<SortParameter>,
    invalid_parameters: Vec<String>,
}

impl SortContext {
    /// Create a context from already classified parameters
    pub fn new(valid_parameters: Vec<SortParameter>, invalid_parameters: Vec<String>) -> Self {
        Self {
            valid_parameters,
            invalid_parameters,
        }
    }

    /// A context with no valid and no invalid parameters
    pub fn empty() -> Self {
        Self::default()
    }

    /// `true` when no token failed validation
    pub fn is_valid(&self) -> bool {
        self.invalid_parameters.is_empty()
    }

    /// `true` when no valid parameter was requested
    pub fn is_empty(&self) -> bool {
        self.valid_parameters.is_empty()
    }

    /// The resolved parameters, in request order
    pub fn valid_parameters(&self) -> &[SortParameter] {
        &self.valid_parameters
    }

    /// Every token that failed to parse or named an unregistered key
    pub fn invalid_parameters(&self) -> &[String] {
        &self.invalid_parameters
    }
}
