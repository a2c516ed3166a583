//! Generated values paired with the shrink context of their generator.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque shrink state attached to a generated value.
///
/// Only the generator that produced a context knows its concrete type.
/// Contexts are shared read-only, so cloning one is cheap.
pub type Context = Arc<dyn Any + Send + Sync>;

/// Produces a fresh copy of a value before each read.
pub type Cloner<T> = Arc<dyn Fn(&T) -> T + Send + Sync>;

/// Wrap a concrete shrink state into a [`Context`]
pub fn into_context<C: Any + Send + Sync>(state: C) -> Context {
    Arc::new(state)
}

/// Recover the concrete state behind a context.
///
/// # Panics
///
/// A context of the wrong type means two generators were mixed up, which is
/// a composition bug: this panics naming `owner`.
pub fn downcast_context<C: Any + Send + Sync>(context: &Context, owner: &str) -> Arc<C> {
    match Arc::clone(context).downcast::<C>() {
        Ok(state) => state,
        Err(_) => panic!("Invalid context type passed to {owner}"),
    }
}

/// A generated value, its shrink context and its clone capability
pub struct Value<T> {
    value: T,
    context: Option<Context>,
    cloner: Option<Cloner<T>>,
}

impl<T> Value<T> {
    /// Pair a value with the context its generator needs to resume shrinking
    pub fn new(value: T, context: Option<Context>) -> Self {
        Self {
            value,
            context,
            cloner: None,
        }
    }

    /// A value without context; shrinking it starts cold
    pub fn bare(value: T) -> Self {
        Self::new(value, None)
    }

    /// Mark the value as needing a fresh copy, produced by `cloner`, on each read
    pub fn with_cloner(mut self, cloner: Cloner<T>) -> Self {
        self.cloner = Some(cloner);
        self
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    /// Whether reads go through the installed cloner
    pub fn must_clone(&self) -> bool {
        self.cloner.is_some()
    }

    /// Replace the context, keeping the clone capability
    pub fn with_context(mut self, context: Option<Context>) -> Self {
        self.context = context;
        self
    }

    pub fn into_parts(self) -> (T, Option<Context>) {
        (self.value, self.context)
    }
}

impl<T: Clone> Value<T> {
    /// Read the value; the stored original is never handed out
    pub fn get(&self) -> T {
        match &self.cloner {
            Some(cloner) => cloner(&self.value),
            None => self.value.clone(),
        }
    }
}

impl<T: Clone> Clone for Value<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.get(),
            context: self.context.clone(),
            cloner: self.cloner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Value<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("value", &self.value)
            .field("has_context", &self.context.is_some())
            .field("must_clone", &self.must_clone())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_bare_value_has_no_context() {
        let value = Value::bare(5);
        assert_eq!(*value.value(), 5);
        assert!(value.context().is_none());
        assert!(!value.must_clone());
        assert_eq!(value.get(), 5);
    }

    #[test]
    fn test_context_round_trip() {
        let value = Value::new("abc".to_string(), Some(into_context(7_i128)));
        let state = downcast_context::<i128>(value.context().unwrap(), "test");
        assert_eq!(*state, 7);

        let (inner, ctx) = value.into_parts();
        assert_eq!(inner, "abc");
        assert!(ctx.is_some());
    }

    #[test]
    #[should_panic(expected = "Invalid context type passed to IntegerGenerator")]
    fn test_wrong_context_type_panics() {
        let ctx = into_context("not an integer");
        downcast_context::<i128>(&ctx, "IntegerGenerator");
    }

    #[test]
    fn test_cloner_runs_on_every_read() {
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reads);
        let value = Value::bare(vec![1, 2, 3]).with_cloner(Arc::new(move |v: &Vec<i32>| {
            counter.fetch_add(1, Ordering::SeqCst);
            v.clone()
        }));

        assert!(value.must_clone());
        let mut first = value.get();
        first.push(4);
        assert_eq!(value.get(), vec![1, 2, 3]);
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }
}
