//! Parsing of textual sort specifications
//!
//! A sort query is a delimited list of tokens such as `name,-age`. Each token
//! names a sort key, with a leading `-` requesting descending order. Parsing
//! is infallible at the query level: every token succeeds or fails on its
//! own, so callers can classify the whole input in one pass.

/// Direction of a single sort operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Lowest to highest (e.g. 1, 2, 3)
    Ascending,
    /// Highest to lowest (e.g. 3, 2, 1)
    Descending,
}

/// One requested, not yet validated sort instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortParameter {
    /// Name of the key to sort by
    pub name: String,
    /// Requested direction
    pub direction: SortDirection,
}

impl SortParameter {
    /// Create a new sort parameter
    pub fn new(name: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            name: name.into(),
            direction,
        }
    }
}

/// Splits a sort query into tokens and tokens into [`SortParameter`]s
///
/// The delimiter is fixed per parser instance; names containing the delimiter
/// cannot be expressed, there is no escaping.
#[derive(Debug, Clone)]
pub struct SortQueryParser {
    delimiter: char,
}

impl Default for SortQueryParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SortQueryParser {
    /// Create a parser using the standard `,` delimiter
    pub fn new() -> Self {
        Self { delimiter: ',' }
    }

    /// Create a parser with a custom delimiter
    pub fn with_delimiter(delimiter: char) -> Self {
        Self { delimiter }
    }

    /// Take the next token off the front of `query`, advancing the cursor
    ///
    /// Returns `None` once the query is exhausted. Tokens are produced left
    /// to right; an empty segment between two delimiters is still a token
    /// (it will later fail to parse).
    pub fn next_token<'a>(&self, query: &mut &'a str) -> Option<&'a str> {
        if query.is_empty() {
            return None;
        }

        match query.find(self.delimiter) {
            Some(index) => {
                let token = &query[..index];
                *query = &query[index + self.delimiter.len_utf8()..];
                Some(token)
            }
            None => {
                let token = *query;
                *query = "";
                Some(token)
            }
        }
    }

    /// Parse a single token into a [`SortParameter`]
    ///
    /// A leading `-` selects descending order with the remainder as the key
    /// name. An empty token, or a bare `-` with nothing after it, is not a
    /// parameter and yields `None`.
    pub fn parse_token(&self, token: &str) -> Option<SortParameter> {
        if token.is_empty() {
            return None;
        }

        let (name, direction) = match token.strip_prefix('-') {
            Some(rest) => (rest, SortDirection::Descending),
            None => (token, SortDirection::Ascending),
        };

        if name.is_empty() {
            return None;
        }

        Some(SortParameter::new(name, direction))
    }
}
