//! Memo Implementation
//!
//! A Memo is a cached derived value: a signal kept current by a reaction
//! that owns it.
//!
//! # How Memos Work
//!
//! 1. On creation, an empty signal is created and a reaction is installed
//!    that computes the value and writes it into that signal.
//!
//! 2. Because a reaction runs immediately, the value is computed once
//!    before `create_memo` returns.
//!
//! 3. When a dependency of the computation changes, the reaction re-runs and
//!    writes the new value, which in turn re-runs everything that read the
//!    memo.
//!
//! 4. Reading the memo never computes anything. It is a tracked read of the
//!    cached signal, so the computation runs exactly once per change to its
//!    dependencies, no matter how often (or whether) the memo is read.

use std::fmt;

use super::signal::ReadSignal;
use super::Runtime;
use crate::graph::{SourceId, SubscriberId};

/// A derived value recomputed eagerly whenever its dependencies change.
pub struct Memo<T> {
    value: ReadSignal<Option<T>>,
    subscriber: SubscriberId,
}

impl<T: 'static> Memo<T> {
    /// Get the cached value, tracked.
    ///
    /// # Panics
    ///
    /// Panics if the computation has never completed, which only happens
    /// when its first run failed or when the memo is read from inside its
    /// own computation. Use [`try_get`](Self::try_get) where either can
    /// happen.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.try_get()
            .expect("memo read before its first computation completed")
    }

    /// Get the cached value, or `None` if the computation has never
    /// completed.
    pub fn try_get(&self) -> Option<T>
    where
        T: Clone,
    {
        self.value.get()
    }

    /// Borrow the cached value, tracked.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        self.value.with(|value| f(value.as_ref()))
    }

    pub fn get_untracked(&self) -> Option<T>
    where
        T: Clone,
    {
        self.value.get_untracked()
    }

    /// Source id of the cached signal.
    pub fn id(&self) -> SourceId {
        self.value.id()
    }

    /// The subscriber that recomputes this memo.
    pub fn subscriber(&self) -> SubscriberId {
        self.subscriber
    }

    pub fn subscriber_count(&self) -> usize {
        self.value.subscriber_count()
    }
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            subscriber: self.subscriber,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("subscriber", &self.subscriber)
            .field("value", &self.value)
            .finish()
    }
}

impl Runtime {
    /// Create a memo over `compute`. The computation runs once now and once
    /// per change to any signal it read on its latest run.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let count = runtime.create_signal(10);
    /// let c = count.clone();
    /// let doubled = runtime.create_memo(move || c.get() * 2);
    ///
    /// count.set(11);
    /// assert_eq!(doubled.get(), 22);
    /// ```
    pub fn create_memo<T: 'static>(&self, compute: impl Fn() -> T + 'static) -> Memo<T> {
        let (value, write) = self.create_state(None::<T>);
        let subscriber = self.create_reaction(move || write.set(Some(compute())));
        Memo { value, subscriber }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn memo_computes_on_creation() {
        let rt = Runtime::new();
        let calls = Rc::new(Cell::new(0));

        let c = calls.clone();
        let memo = rt.create_memo(move || {
            c.set(c.get() + 1);
            42
        });

        assert_eq!(calls.get(), 1);
        assert_eq!(memo.get(), 42);
        assert_eq!(memo.get(), 42);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn memo_recomputes_once_per_change() {
        let rt = Runtime::new();
        let count = rt.create_signal(10);
        let calls = Rc::new(Cell::new(0));

        let (s, c) = (count.clone(), calls.clone());
        let doubled = rt.create_memo(move || {
            c.set(c.get() + 1);
            s.get() * 2
        });

        for _ in 0..5 {
            assert_eq!(doubled.get(), 20);
        }
        assert_eq!(calls.get(), 1);

        count.set(count.get_untracked() + 1);
        assert_eq!(calls.get(), 2);
        assert_eq!(doubled.get(), 22);
    }

    #[test]
    fn memo_recomputes_without_readers() {
        let rt = Runtime::new();
        let count = rt.create_signal(0);
        let calls = Rc::new(Cell::new(0));

        let (s, c) = (count.clone(), calls.clone());
        let _memo = rt.create_memo(move || {
            c.set(c.get() + 1);
            s.get()
        });

        count.set(1);
        count.set(2);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn memo_is_a_trackable_dependency() {
        let rt = Runtime::new();
        let count = rt.create_signal(1);

        let s = count.clone();
        let doubled = rt.create_memo(move || s.get() * 2);

        let seen = Rc::new(Cell::new(0));
        let (m, out) = (doubled.clone(), seen.clone());
        rt.create_reaction(move || out.set(m.get()));

        assert_eq!(seen.get(), 2);
        assert_eq!(doubled.subscriber_count(), 1);

        count.set(7);
        assert_eq!(seen.get(), 14);
    }

    #[test]
    fn failed_first_computation_leaves_memo_empty() {
        let rt = Runtime::new();
        let memo = rt.create_memo(|| -> i32 { panic!("no value") });

        assert_eq!(memo.try_get(), None);
        assert!(memo.with(|value| value.is_none()));
    }

    #[test]
    #[should_panic(expected = "memo read before its first computation completed")]
    fn get_on_an_empty_memo_panics() {
        let rt = Runtime::new();
        let memo = rt.create_memo(|| -> i32 { panic!("no value") });
        memo.get();
    }

    #[test]
    fn constant_memo_keeps_its_value() {
        let rt = Runtime::new();
        let memo = rt.create_memo(|| "fixed");

        // Read nothing, so the recompute step retired after one run.
        assert!(!rt.is_alive(memo.subscriber()));
        assert_eq!(memo.get(), "fixed");
    }
}
