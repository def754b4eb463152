//! The sorter: registry owner and request-path orchestrator
//!
//! A [`Sorter`] is configured once, through a callback that declares the
//! sortable keys, and is immutable afterwards. Every request-path operation
//! (`validate`, `create_sort_query`, `sort`) allocates only call-local
//! state, so a sorter can serve unsynchronized concurrent readers.

use crate::context::SortContext;
use crate::error::{SorterError, SorterResult};
use crate::parser::SortQueryParser;
use crate::query::{
    CompiledSortQueryBuilder, PassthroughSortQuery, QueryStrategy, SortQuery, SortQueryBuilder,
};
use crate::registry::{KeyRegistry, NameComparer, SorterBuilder};
use std::fmt;
use std::sync::Arc;

/// Options fixed at sorter construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SorterOptions {
    /// How registered names are matched against requested names
    pub name_comparer: NameComparer,
    /// Compose from invalid contexts instead of failing them
    pub ignore_invalid_parameters: bool,
    /// Strategy used for per-request query composition
    pub strategy: QueryStrategy,
}

/// Sorts record collections according to a string based sort query
///
/// ```
/// use sortspec::{SortDirection, Sorter};
///
/// struct Person { name: String, age: u32 }
///
/// let sorter = Sorter::new(|keys| {
///     keys.key("name", |p: &Person| p.name.clone());
///     keys.key("age", |p: &Person| p.age)
///         .default_direction(SortDirection::Descending);
/// })?;
///
/// let mut people = vec![
///     Person { name: "bob".into(), age: 30 },
///     Person { name: "alice".into(), age: 30 },
/// ];
/// sorter.sort(&mut people, "name,-age")?;
/// assert_eq!(people[0].name, "alice");
/// # Ok::<(), sortspec::SorterError>(())
/// ```
pub struct Sorter<T> {
    parser: SortQueryParser,
    registry: KeyRegistry<T>,
    default_query: Arc<dyn SortQuery<T>>,
    options: SorterOptions,
}

impl<T: 'static> Sorter<T> {
    /// Create a sorter with default options and the standard `,` parser
    ///
    /// The callback declares every sortable key; registering two keys with
    /// the same name (under the configured comparer) fails here, before the
    /// sorter ever reaches a request path.
    pub fn new(configure: impl FnOnce(&mut SorterBuilder<T>)) -> SorterResult<Self> {
        Self::with_parser(SortQueryParser::new(), SorterOptions::default(), configure)
    }

    /// Create a sorter with explicit options
    pub fn with_options(
        options: SorterOptions,
        configure: impl FnOnce(&mut SorterBuilder<T>),
    ) -> SorterResult<Self> {
        Self::with_parser(SortQueryParser::new(), options, configure)
    }

    /// Create a sorter with an explicit parser and options
    ///
    /// Collaborators are injected here once; nothing is looked up through
    /// globals afterwards.
    pub fn with_parser(
        parser: SortQueryParser,
        options: SorterOptions,
        configure: impl FnOnce(&mut SorterBuilder<T>),
    ) -> SorterResult<Self> {
        let mut builder = SorterBuilder::new();
        configure(&mut builder);

        let mut registry = KeyRegistry::new(options.name_comparer);

        // The default ordering is composed with the compiled strategy: it is
        // built exactly once and reused for every request without parameters.
        let mut default_builder = CompiledSortQueryBuilder::new();
        for key in builder.into_keys() {
            if let Some(direction) = key.default_direction() {
                default_builder.push(&key, direction);
            }
            registry.insert(key)?;
        }

        let default_query: Arc<dyn SortQuery<T>> = if default_builder.is_empty() {
            Arc::new(PassthroughSortQuery)
        } else {
            default_builder.build()?
        };

        Ok(Self {
            parser,
            registry,
            default_query,
            options,
        })
    }

    /// Classify every token of `query` against the registered keys
    ///
    /// The scan never stops early: a context can end up with zero valid and
    /// N invalid entries, so client-facing error reporting can name every
    /// bad token in one pass. Duplicate names are allowed; each occurrence
    /// becomes its own tie-break entry.
    pub fn validate(&self, query: &str) -> SortContext {
        let mut cursor = query;
        let mut valid = Vec::new();
        let mut invalid = Vec::new();

        while let Some(token) = self.parser.next_token(&mut cursor) {
            match self.parser.parse_token(token) {
                None => invalid.push(token.to_string()),
                Some(parameter) => {
                    if self.registry.lookup(&parameter.name).is_some() {
                        valid.push(parameter);
                    } else {
                        invalid.push(parameter.name);
                    }
                }
            }
        }

        SortContext::new(valid, invalid)
    }

    /// Compose an ordering transformation from a validated context
    ///
    /// Fails on an invalid context unless
    /// [`ignore_invalid_parameters`](SorterOptions::ignore_invalid_parameters)
    /// is set. An empty context yields the precomputed default query.
    pub fn create_sort_query(&self, context: &SortContext) -> SorterResult<Arc<dyn SortQuery<T>>> {
        if !self.options.ignore_invalid_parameters && !context.is_valid() {
            return Err(SorterError::invalid_context(
                context.invalid_parameters().to_vec(),
            ));
        }

        if context.is_empty() {
            return Ok(Arc::clone(&self.default_query));
        }

        let mut builder = self.options.strategy.new_builder::<T>();
        for parameter in context.valid_parameters() {
            match self.registry.lookup(&parameter.name) {
                Some(key) => builder.push(key, parameter.direction),
                None => {
                    // A validated parameter always resolves; reaching this
                    // branch means the context was built against a different
                    // registry.
                    debug_assert!(
                        false,
                        "validated parameter '{}' missing from registry",
                        parameter.name
                    );
                    return Err(SorterError::unresolved_key(&parameter.name));
                }
            }
        }

        if builder.is_empty() {
            return Ok(Arc::clone(&self.default_query));
        }

        builder.build()
    }

    /// Validate `query`, compose, and apply to `items` in place
    ///
    /// Returns the context so lenient callers still see every invalid token
    /// that was ignored.
    pub fn sort(&self, items: &mut [T], query: &str) -> SorterResult<SortContext> {
        let context = self.validate(query);
        let sort_query = self.create_sort_query(&context)?;
        sort_query.apply_slice(items);
        Ok(context)
    }

    /// Apply the default ordering to `items` in place
    pub fn sort_default(&self, items: &mut [T]) {
        self.default_query.apply_slice(items);
    }

    /// The precomputed default query
    pub fn default_query(&self) -> Arc<dyn SortQuery<T>> {
        Arc::clone(&self.default_query)
    }

    /// The options this sorter was built with
    pub fn options(&self) -> &SorterOptions {
        &self.options
    }

    /// The registered keys
    pub fn registry(&self) -> &KeyRegistry<T> {
        &self.registry
    }
}

impl<T> fmt::Debug for Sorter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sorter")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish()
    }
}

/// Call-site convenience for applying a sorter directly to a collection
pub trait SortWith<T> {
    /// Sort by a textual query: `items.sort_with(&sorter, "name,-age")`
    fn sort_with(&mut self, sorter: &Sorter<T>, query: &str) -> SorterResult<SortContext>;

    /// Sort by an already validated context
    fn sort_with_context(&mut self, sorter: &Sorter<T>, context: &SortContext) -> SorterResult<()>;

    /// Apply the sorter's default ordering
    fn sort_with_default(&mut self, sorter: &Sorter<T>);
}

impl<T: 'static> SortWith<T> for [T] {
    fn sort_with(&mut self, sorter: &Sorter<T>, query: &str) -> SorterResult<SortContext> {
        sorter.sort(self, query)
    }

    fn sort_with_context(&mut self, sorter: &Sorter<T>, context: &SortContext) -> SorterResult<()> {
        sorter.create_sort_query(context)?.apply_slice(self);
        Ok(())
    }

    fn sort_with_default(&mut self, sorter: &Sorter<T>) {
        sorter.sort_default(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{SortDirection, SortParameter};

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Person {
        name: String,
        age: u32,
    }

    fn person(name: &str, age: u32) -> Person {
        Person {
            name: name.to_string(),
            age,
        }
    }

    /// Mirrors the canonical scenario: `name` defaults to descending,
    /// `age` has no default.
    fn person_sorter(options: SorterOptions) -> Sorter<Person> {
        Sorter::with_options(options, |keys| {
            keys.key("name", |p: &Person| p.name.clone())
                .default_direction(SortDirection::Descending);
            keys.key("age", |p: &Person| p.age);
        })
        .expect("Failed to build sorter")
    }

    fn people() -> Vec<Person> {
        vec![
            person("bob", 40),
            person("alice", 25),
            person("bob", 20),
            person("alice", 30),
            person("bob", 30),
        ]
    }

    #[test]
    fn test_validate_preserves_token_order() {
        let sorter = person_sorter(SorterOptions::default());
        let context = sorter.validate("name,-age,age");

        assert!(context.is_valid());
        assert_eq!(
            context.valid_parameters(),
            &[
                SortParameter::new("name", SortDirection::Ascending),
                SortParameter::new("age", SortDirection::Descending),
                SortParameter::new("age", SortDirection::Ascending),
            ]
        );
    }

    #[test]
    fn test_validate_enumerates_every_invalid_token() {
        // malformed and unknown tokens are all reported, in order, and the
        // valid token between them still resolves
        let sorter = person_sorter(SorterOptions::default());
        let context = sorter.validate("bogus,name,-,email");

        assert!(!context.is_valid());
        assert_eq!(context.invalid_parameters(), &["bogus", "-", "email"]);
        assert_eq!(
            context.valid_parameters(),
            &[SortParameter::new("name", SortDirection::Ascending)]
        );
    }

    #[test]
    fn test_validate_empty_query_is_empty_and_valid() {
        let sorter = person_sorter(SorterOptions::default());
        let context = sorter.validate("");
        assert!(context.is_valid());
        assert!(context.is_empty());
    }

    #[test]
    fn test_empty_query_equals_default_sort() {
        let sorter = person_sorter(SorterOptions::default());

        let mut by_query = people();
        sorter.sort(&mut by_query, "").expect("Failed to sort");

        let mut by_default = people();
        sorter.sort_default(&mut by_default);

        assert_eq!(by_query, by_default);
        // default: name descending
        assert_eq!(by_query[0].name, "bob");
        assert_eq!(by_query[4].name, "alice");
    }

    #[test]
    fn test_explicit_query_overrides_default() {
        let sorter = person_sorter(SorterOptions::default());
        let mut items = people();
        sorter.sort(&mut items, "age").expect("Failed to sort");

        // age ascending only; the name default does not apply
        let ages: Vec<u32> = items.iter().map(|p| p.age).collect();
        assert_eq!(ages, vec![20, 25, 30, 30, 40]);
    }

    #[test]
    fn test_primary_and_tie_break() {
        let sorter = person_sorter(SorterOptions::default());
        let mut items = people();
        sorter.sort(&mut items, "name,-age").expect("Failed to sort");

        let pairs: Vec<(&str, u32)> = items.iter().map(|p| (p.name.as_str(), p.age)).collect();
        assert_eq!(
            pairs,
            vec![
                ("alice", 30),
                ("alice", 25),
                ("bob", 40),
                ("bob", 30),
                ("bob", 20),
            ]
        );
    }

    #[test]
    fn test_invalid_query_fails_strict() {
        let sorter = person_sorter(SorterOptions::default());
        let mut items = people();
        let original = items.clone();

        let result = sorter.sort(&mut items, "bogus");
        match result {
            Err(SorterError::InvalidContext { invalid_parameters }) => {
                assert_eq!(invalid_parameters, vec!["bogus".to_string()]);
            }
            other => panic!("expected InvalidContext, got {other:?}"),
        }
        // strict failure leaves the input untouched
        assert_eq!(items, original);
    }

    #[test]
    fn test_invalid_query_falls_back_to_default_when_lenient() {
        let options = SorterOptions {
            ignore_invalid_parameters: true,
            ..Default::default()
        };
        let sorter = person_sorter(options);

        let context = sorter.validate("bogus");
        assert!(!context.is_valid());
        assert!(context.is_empty());

        // zero valid tokens: the default query is returned, not an error
        let query = sorter
            .create_sort_query(&context)
            .expect("Failed to create query");
        let mut items = people();
        query.apply_slice(&mut items);

        let mut expected = people();
        sorter.sort_default(&mut expected);
        assert_eq!(items, expected);
    }

    #[test]
    fn test_lenient_sort_still_reports_invalid_tokens() {
        let options = SorterOptions {
            ignore_invalid_parameters: true,
            ..Default::default()
        };
        let sorter = person_sorter(options);

        let mut items = people();
        let context = sorter
            .sort(&mut items, "age,bogus")
            .expect("Failed to sort");

        assert_eq!(context.invalid_parameters(), &["bogus"]);
        let ages: Vec<u32> = items.iter().map(|p| p.age).collect();
        assert_eq!(ages, vec![20, 25, 30, 30, 40]);
    }

    #[test]
    fn test_duplicate_key_fails_construction() {
        for _ in 0..3 {
            let result: SorterResult<Sorter<Person>> = Sorter::new(|keys| {
                keys.key("age", |p: &Person| p.age);
                keys.key("age", |p: &Person| u32::MAX - p.age);
            });
            assert!(matches!(result, Err(SorterError::DuplicateKey { .. })));
        }
    }

    #[test]
    fn test_case_insensitive_names() {
        let options = SorterOptions {
            name_comparer: NameComparer::OrdinalIgnoreCase,
            ..Default::default()
        };
        let sorter = person_sorter(options);

        let mut items = people();
        sorter.sort(&mut items, "-AGE").expect("Failed to sort");
        let ages: Vec<u32> = items.iter().map(|p| p.age).collect();
        assert_eq!(ages, vec![40, 30, 30, 25, 20]);
    }

    #[test]
    fn test_no_default_keys_means_passthrough() {
        let sorter: Sorter<Person> = Sorter::new(|keys| {
            keys.key("age", |p: &Person| p.age);
        })
        .expect("Failed to build sorter");

        let mut items = people();
        let original = items.clone();
        sorter.sort_default(&mut items);
        assert_eq!(items, original);
    }

    #[test]
    fn test_compiled_strategy_option() {
        let options = SorterOptions {
            strategy: QueryStrategy::Compiled,
            ..Default::default()
        };
        let sorter = person_sorter(options);

        let mut compiled = people();
        sorter.sort(&mut compiled, "name,-age").expect("Failed to sort");

        let mut chained = people();
        person_sorter(SorterOptions::default())
            .sort(&mut chained, "name,-age")
            .expect("Failed to sort");

        assert_eq!(compiled, chained);
    }

    #[test]
    fn test_unresolved_key_is_an_error() {
        // a context fabricated against a different registry trips the
        // defensive branch instead of silently proceeding
        let sorter = person_sorter(SorterOptions::default());
        let foreign = SortContext::new(
            vec![SortParameter::new("email", SortDirection::Ascending)],
            Vec::new(),
        );

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            sorter.create_sort_query(&foreign)
        }));
        match result {
            // debug builds assert
            Err(_) => {}
            // release builds surface the invariant violation as an error
            Ok(inner) => assert!(matches!(inner, Err(SorterError::UnresolvedKey { .. }))),
        }
    }

    #[test]
    fn test_sort_with_extension() {
        let sorter = person_sorter(SorterOptions::default());
        let mut items = people();

        items.sort_with(&sorter, "-age").expect("Failed to sort");
        assert_eq!(items[0].age, 40);

        items.sort_with_default(&sorter);
        assert_eq!(items[0].name, "bob");

        let context = sorter.validate("age");
        items
            .sort_with_context(&sorter, &context)
            .expect("Failed to sort");
        assert_eq!(items[0].age, 20);
    }

    #[test]
    fn test_custom_delimiter_parser() {
        let sorter = Sorter::with_parser(
            SortQueryParser::with_delimiter(';'),
            SorterOptions::default(),
            |keys: &mut SorterBuilder<Person>| {
                keys.key("name", |p: &Person| p.name.clone());
                keys.key("age", |p: &Person| p.age);
            },
        )
        .expect("Failed to build sorter");

        let mut items = people();
        sorter.sort(&mut items, "name;-age").expect("Failed to sort");
        assert_eq!(items[0], person("alice", 30));
    }

    #[test]
    fn test_sorter_is_shareable_across_threads() {
        let sorter = std::sync::Arc::new(person_sorter(SorterOptions::default()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let sorter = std::sync::Arc::clone(&sorter);
                std::thread::spawn(move || {
                    let mut items = people();
                    sorter.sort(&mut items, "name,-age").expect("Failed to sort");
                    items
                })
            })
            .collect();

        let mut results: Vec<Vec<Person>> = handles
            .into_iter()
            .map(|h| h.join().expect("Worker panicked"))
            .collect();

        let first = results.pop().expect("No results");
        for result in results {
            assert_eq!(result, first);
        }
    }
}
