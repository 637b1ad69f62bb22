//! Global string interning used by every node that carries a name.

use std::sync::{Arc, Mutex};

pub use lasso::Spur as Symbol;
use lasso::ThreadedRodeo;

/// Thread-safe string interner. Cheap to clone; all clones share one table.
#[derive(Clone)]
pub struct Interner {
    inner: Arc<Mutex<ThreadedRodeo>>,
}

impl Interner {
    /// Creates an empty interner.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ThreadedRodeo::new())),
        }
    }

    /// Interns `text`, returning a stable symbol.
    pub fn intern(&self, text: &str) -> Symbol {
        self.inner.lock().unwrap_or_else(|poison| poison.into_inner()).get_or_intern(text)
    }

    /// Resolves a symbol back to its text.
    pub fn resolve(&self, symbol: &Symbol) -> String {
        self.inner
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .resolve(symbol)
            .to_string()
    }

    /// Resolves a symbol only if it was interned through this table.
    pub fn try_resolve(&self, symbol: &Symbol) -> Option<String> {
        self.inner
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .try_resolve(symbol)
            .map(str::to_string)
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Interner;

    #[test]
    fn round_trips_text() {
        let interner = Interner::new();
        let a = interner.intern("Pair");
        let b = interner.intern("Pair");
        assert_eq!(a, b);
        assert_eq!(interner.resolve(&a), "Pair");
    }

    #[test]
    fn distinct_text_distinct_symbols() {
        let interner = Interner::new();
        let a = interner.intern("left");
        let b = interner.intern("right");
        assert_ne!(a, b);
    }
}
