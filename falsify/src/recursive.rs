//! Recursive generators: forward references, `letrec` and `memo`.
//!
//! A [`Deferred`] is a cell created before the definitions that use it and
//! bound exactly once afterwards. Reading it before it is bound is a
//! construction bug and panics.

use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::error::GeneratorError;
use crate::generator::{BoxedGenerator, Generator};
use crate::rng::Random;
use crate::shrink::Shrinks;
use crate::value::{Context, Value};

/// Depth used by [`Memo::get`]
pub const DEFAULT_MEMO_DEPTH: usize = 10;

/// Named forward reference to a generator defined later
pub struct Deferred<T> {
    name: Arc<str>,
    cell: Arc<OnceLock<BoxedGenerator<T>>>,
}

impl<T> Deferred<T> {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            cell: Arc::new(OnceLock::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_bound(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Bind the reference; every clone of it sees the same generator
    pub fn bind(&self, generator: BoxedGenerator<T>) -> Result<(), GeneratorError> {
        self.cell.set(generator).map_err(|_| GeneratorError::AlreadyBound {
            name: self.name.to_string(),
        })
    }

    fn resolve(&self) -> &BoxedGenerator<T> {
        match self.cell.get() {
            Some(generator) => generator,
            None => panic!(
                "{}",
                GeneratorError::Unbound {
                    name: self.name.to_string()
                }
            ),
        }
    }
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("name", &self.name)
            .field("bound", &self.is_bound())
            .finish()
    }
}

impl<T> Generator<T> for Deferred<T> {
    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<T> {
        self.resolve().generate(rng, bias)
    }

    fn shrink(&self, value: &T, context: Option<&Context>) -> Shrinks<T> {
        self.resolve().shrink(value, context)
    }

    fn can_shrink_without_context(&self, value: &T) -> bool {
        self.resolve().can_shrink_without_context(value)
    }
}

/// Hands out forward references while `letrec` definitions are built
pub struct Tie<T> {
    references: RefCell<HashMap<String, Deferred<T>>>,
}

impl<T> Tie<T> {
    /// Reference to the definition called `name`
    pub fn tie(&self, name: &str) -> Deferred<T> {
        self.references
            .borrow_mut()
            .entry(name.to_string())
            .or_insert_with(|| Deferred::new(name))
            .clone()
    }
}

/// Build generators that may reference each other, by name, before they exist.
///
/// `builder` returns the named definitions; references handed out by
/// [`Tie::tie`] are bound to them once `builder` returns. A reference to a
/// name that was never defined panics when first used.
///
/// # Panics
///
/// Panics when two definitions share a name.
pub fn letrec<T, F>(builder: F) -> HashMap<String, BoxedGenerator<T>>
where
    F: FnOnce(&Tie<T>) -> Vec<(&'static str, BoxedGenerator<T>)>,
{
    let tie = Tie {
        references: RefCell::new(HashMap::new()),
    };
    let definitions = builder(&tie);
    let mut generators = HashMap::with_capacity(definitions.len());
    for (name, generator) in definitions {
        match generators.entry(name.to_string()) {
            Entry::Occupied(_) => panic!(
                "{}",
                GeneratorError::AlreadyBound {
                    name: name.to_string()
                }
            ),
            Entry::Vacant(slot) => {
                if let Some(reference) = tie.references.borrow().get(name) {
                    if let Err(error) = reference.bind(generator.clone()) {
                        panic!("{error}");
                    }
                }
                slot.insert(generator);
            }
        }
    }
    generators
}

type MemoBuilder<T> = dyn Fn(&Memo<T>, usize) -> BoxedGenerator<T> + Send + Sync;

/// Depth-indexed recursive generator.
///
/// The builder receives the memo itself and the remaining depth `n`; it
/// recurses through `memo.at(n - 1)` and must stop recursing at small `n`.
/// Each depth is built once.
pub struct Memo<T> {
    builder: Arc<MemoBuilder<T>>,
    cache: Arc<Mutex<HashMap<usize, BoxedGenerator<T>>>>,
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            builder: Arc::clone(&self.builder),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<T> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Memo").field("cached_depths", &cache.len()).finish()
    }
}

impl<T> Memo<T> {
    /// Generator for at most `max_depth` levels
    pub fn at(&self, max_depth: usize) -> BoxedGenerator<T> {
        if let Some(generator) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&max_depth)
        {
            return generator.clone();
        }
        let built = (self.builder)(self, max_depth);
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(max_depth)
            .or_insert(built)
            .clone()
    }

    /// Generator for [`DEFAULT_MEMO_DEPTH`] levels
    pub fn get(&self) -> BoxedGenerator<T> {
        self.at(DEFAULT_MEMO_DEPTH)
    }
}

/// Create a depth-indexed recursive generator
pub fn memo<T, F>(builder: F) -> Memo<T>
where
    F: Fn(&Memo<T>, usize) -> BoxedGenerator<T> + Send + Sync + 'static,
{
    Memo {
        builder: Arc::new(builder),
        cache: Arc::new(Mutex::new(HashMap::new())),
    }
}
