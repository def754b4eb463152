//! Composition of multi-key sort queries
//!
//! A composed query captures an ordered list of (comparator, direction)
//! steps and applies them as a primary-then-tie-break ordering. Two builder
//! strategies exist behind [`SortQueryBuilder`]: the chained strategy sorts
//! by the first step and then refines ties run by run, the compiled strategy
//! folds every step into a single reusable comparator up front. Both produce
//! identical orderings for identical step sequences; they differ only in
//! build versus reuse cost.

use crate::error::{SorterError, SorterResult};
use crate::parser::SortDirection;
use crate::registry::{KeyComparator, SortableKey};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// An ordering transformation ready to apply to a data source
///
/// Implementations are immutable and shareable; applying the same query to
/// independent copies of the same input yields the same output sequence.
/// The slice implementations in this crate are eager; a deferred source
/// would implement this trait and translate the steps into its own
/// representation.
pub trait SortQuery<T>: Send + Sync {
    /// Reorder the slice in place
    fn apply_slice(&self, items: &mut [T]);

    /// Convenience: sort a vector and hand it back
    fn apply(&self, mut items: Vec<T>) -> Vec<T> {
        self.apply_slice(&mut items);
        items
    }
}

/// Query that leaves its input untouched
///
/// Used as the default ordering when no registered key declares a default
/// direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughSortQuery;

impl<T> SortQuery<T> for PassthroughSortQuery {
    fn apply_slice(&self, _items: &mut [T]) {}
}

/// One resolved step of a composed query
struct SortStep<T> {
    compare: KeyComparator<T>,
    direction: SortDirection,
}

impl<T> SortStep<T> {
    fn new(key: &SortableKey<T>, direction: SortDirection) -> Self {
        Self {
            compare: key.comparator(),
            direction,
        }
    }

    // Direction is resolved here, once per comparison, with no runtime
    // type dispatch.
    fn ordering(&self, a: &T, b: &T) -> Ordering {
        let cmp = (self.compare)(a, b);
        match self.direction {
            SortDirection::Ascending => cmp,
            SortDirection::Descending => cmp.reverse(),
        }
    }
}

impl<T> Clone for SortStep<T> {
    fn clone(&self) -> Self {
        Self {
            compare: Arc::clone(&self.compare),
            direction: self.direction,
        }
    }
}

impl<T> fmt::Debug for SortStep<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortStep")
            .field("direction", &self.direction)
            .finish()
    }
}

/// Accumulates (key, direction) steps and builds a [`SortQuery`]
///
/// Builders are short-lived: one is created per composed query and drained
/// by [`build`](SortQueryBuilder::build). Building with no steps is a caller
/// error.
pub trait SortQueryBuilder<T> {
    /// Append a step; steps apply in push order, later steps break ties
    fn push(&mut self, key: &SortableKey<T>, direction: SortDirection);

    /// `true` while no step has been pushed
    fn is_empty(&self) -> bool;

    /// Build the composed query from the accumulated steps
    fn build(&mut self) -> SorterResult<Arc<dyn SortQuery<T>>>;
}

/// Selects which [`SortQueryBuilder`] implementation composes a query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryStrategy {
    /// Full sort on the first step, stable run refinement for the rest
    #[default]
    Chained,
    /// Fold the steps into one reusable comparator at build time
    Compiled,
}

impl QueryStrategy {
    /// Create a fresh builder for this strategy
    pub fn new_builder<T: 'static>(&self) -> Box<dyn SortQueryBuilder<T>> {
        match self {
            QueryStrategy::Chained => Box::new(ChainedSortQueryBuilder::new()),
            QueryStrategy::Compiled => Box::new(CompiledSortQueryBuilder::new()),
        }
    }
}

/// Builder for the incremental strategy
pub struct ChainedSortQueryBuilder<T> {
    steps: Vec<SortStep<T>>,
}

impl<T> ChainedSortQueryBuilder<T> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<T> Default for ChainedSortQueryBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> SortQueryBuilder<T> for ChainedSortQueryBuilder<T> {
    fn push(&mut self, key: &SortableKey<T>, direction: SortDirection) {
        self.steps.push(SortStep::new(key, direction));
    }

    fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn build(&mut self) -> SorterResult<Arc<dyn SortQuery<T>>> {
        if self.steps.is_empty() {
            return Err(SorterError::EmptyBuilder);
        }
        Ok(Arc::new(ChainedSortQuery {
            steps: std::mem::take(&mut self.steps),
        }))
    }
}

impl<T> fmt::Debug for ChainedSortQueryBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainedSortQueryBuilder")
            .field("steps", &self.steps)
            .finish()
    }
}

/// Incremental multi-key query
///
/// The first step orders the whole slice; each later step stably re-sorts
/// only the runs of records still equal under every preceding step. After
/// step k the slice is ordered lexicographically by steps 0..=k, so those
/// runs are always contiguous.
struct ChainedSortQuery<T> {
    steps: Vec<SortStep<T>>,
}

impl<T> SortQuery<T> for ChainedSortQuery<T> {
    fn apply_slice(&self, items: &mut [T]) {
        let (first, rest) = match self.steps.split_first() {
            Some(split) => split,
            None => return,
        };

        items.sort_by(|a, b| first.ordering(a, b));

        let mut applied = 1;
        for step in rest {
            refine_equal_runs(items, &self.steps[..applied], step);
            applied += 1;
        }
    }
}

/// Stable-sort every maximal run of records equal under `applied` by `step`
fn refine_equal_runs<T>(items: &mut [T], applied: &[SortStep<T>], step: &SortStep<T>) {
    let mut start = 0;
    for end in 1..=items.len() {
        let run_closed = end == items.len()
            || applied
                .iter()
                .any(|s| s.ordering(&items[end - 1], &items[end]) != Ordering::Equal);

        if run_closed {
            if end - start > 1 {
                items[start..end].sort_by(|a, b| step.ordering(a, b));
            }
            start = end;
        }
    }
}

/// Builder for the compiled strategy
pub struct CompiledSortQueryBuilder<T> {
    steps: Vec<SortStep<T>>,
}

impl<T> CompiledSortQueryBuilder<T> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<T> Default for CompiledSortQueryBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> SortQueryBuilder<T> for CompiledSortQueryBuilder<T> {
    fn push(&mut self, key: &SortableKey<T>, direction: SortDirection) {
        self.steps.push(SortStep::new(key, direction));
    }

    fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn build(&mut self) -> SorterResult<Arc<dyn SortQuery<T>>> {
        let mut steps = std::mem::take(&mut self.steps).into_iter();
        let first = match steps.next() {
            Some(step) => step,
            None => return Err(SorterError::EmptyBuilder),
        };

        // Fold the steps into a single comparator once; every later apply
        // reuses it without touching the step list again.
        let mut combined: CombinedComparator<T> = Box::new(move |a, b| first.ordering(a, b));
        for step in steps {
            let prev = combined;
            combined = Box::new(move |a, b| prev(a, b).then_with(|| step.ordering(a, b)));
        }

        Ok(Arc::new(CompiledSortQuery { compare: combined }))
    }
}

impl<T> fmt::Debug for CompiledSortQueryBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSortQueryBuilder")
            .field("steps", &self.steps)
            .finish()
    }
}

type CombinedComparator<T> = Box<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Precompiled multi-key query: one stable sort with one comparator
struct CompiledSortQuery<T> {
    compare: CombinedComparator<T>,
}

impl<T> SortQuery<T> for CompiledSortQuery<T> {
    fn apply_slice(&self, items: &mut [T]) {
        items.sort_by(|a, b| (self.compare)(a, b));
    }
}
