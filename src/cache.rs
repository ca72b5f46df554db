//! Compiled parsers shared across threads.

use std::sync::Arc;
use fnv::FnvHashMap;
use parking_lot::RwLock;
use tracing::debug;
use crate::{compile_with, BuiltinModules, CompileError, Config, ImportResolver, Parser};

/// Parsers keyed by grammar text and configuration.
///
/// Compilation runs outside the lock and the finished parser is published
/// in one insert, so readers never observe a partially built entry. When two
/// threads compile the same key at once, the first insert wins.
pub struct ParserCache {
  parsers: RwLock<FnvHashMap<(String, Config), Arc<Parser>>>,
  resolver: Box<dyn ImportResolver + Send + Sync>,
}

impl Default for ParserCache {
  fn default() -> Self {
    Self::new()
  }
}

impl ParserCache {
  pub fn new() -> Self {
    Self::with_resolver(BuiltinModules)
  }

  pub fn with_resolver(resolver: impl ImportResolver + Send + Sync + 'static) -> Self {
    Self {
      parsers: RwLock::new(FnvHashMap::default()),
      resolver: Box::new(resolver),
    }
  }

  pub fn get_or_compile(&self, grammar: &str, config: &Config) -> Result<Arc<Parser>, CompileError> {
    let key = (grammar.to_owned(), config.clone());

    if let Some(parser) = self.parsers.read().get(&key) {
      return Ok(Arc::clone(parser));
    }

    let parser = Arc::new(compile_with(grammar, config, self.resolver.as_ref())?);
    debug!(start = %config.start, "parser cached");

    let mut parsers = self.parsers.write();
    Ok(Arc::clone(parsers.entry(key).or_insert(parser)))
  }

  pub fn len(&self) -> usize {
    self.parsers.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.parsers.read().is_empty()
  }

  pub fn clear(&self) {
    self.parsers.write().clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::thread;

  const GRAMMAR: &str = "start: A+\nA: \"a\"\n";

  #[test]
  fn compiles_once_per_key() {
    let cache = ParserCache::new();
    let config = Config::default();

    let first = cache.get_or_compile(GRAMMAR, &config).unwrap();
    let second = cache.get_or_compile(GRAMMAR, &config).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let other = cache.get_or_compile(GRAMMAR, &config.clone().with_keep_all_tokens(true)).unwrap();
    assert!(!Arc::ptr_eq(&first, &other));
    assert_eq!(cache.len(), 2);

    cache.clear();
    assert!(cache.is_empty());
  }

  #[test]
  fn errors_are_not_cached() {
    let cache = ParserCache::new();
    assert!(cache.get_or_compile("start: missing\n", &Config::default()).is_err());
    assert!(cache.is_empty());
  }

  #[test]
  fn shared_between_threads() {
    let cache = Arc::new(ParserCache::new());

    let handles = (0..4)
      .map(|_| {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
          let parser = cache.get_or_compile(GRAMMAR, &Config::default()).unwrap();
          parser.parse("aaa").unwrap().children.len()
        })
      })
      .collect::<Vec<_>>();

    for handle in handles {
      assert_eq!(handle.join().unwrap(), 3);
    }
    assert_eq!(cache.len(), 1);
  }
}
