use std::fmt::{self, Write};
use grammar::{Map, Symbol, TokenSet};
use crate::augment::Augmented;
use crate::first::First;

pub use states::gen_states;
pub use tables::{expected_sets, gen_tables, Tables, ACCEPT};

mod states;
mod tables;

/// An LR(1) item. `key` encodes the production and the dot position.
#[derive(Debug, Clone)]
pub struct Item {
  pub key: usize,
  pub lookaheads: TokenSet,
}

pub type KernelItemSet = Vec<Item>;

#[derive(Debug, Clone)]
pub struct State {
  /// Kernel items sorted by key, followed by the closure items.
  pub items: Vec<Item>,
  pub transitions: Map<Symbol, u32>,
}

impl State {
  pub fn new(kernel: KernelItemSet) -> Self {
    Self {
      items: kernel,
      transitions: Map::default(),
    }
  }
}

/// States keyed by their kernel item keys.
pub type StateStore = Map<Vec<usize>, State>;

pub struct Builder<'a, 'g> {
  pub aug: &'a Augmented<'g>,
  pub first: First,
  pub states: StateStore,
  /// One more than the longest production.
  pub max_nsym_p1: usize,
}

impl<'a, 'g> Builder<'a, 'g> {
  pub fn new(aug: &'a Augmented<'g>) -> Self {
    let max_nsym = (0..aug.num_prods())
      .map(|prod| aug.symbols(prod).len())
      .max()
      .unwrap_or(0);

    Self {
      aug,
      first: crate::first::compute(aug),
      states: StateStore::default(),
      max_nsym_p1: max_nsym + 1,
    }
  }

  pub fn fmt_item(&self, item: &Item, f: &mut impl Write) -> fmt::Result {
    let (prod, dot) = decode_item(self.max_nsym_p1, item.key);
    write!(f, "{}", self.aug.fmt_prod(prod, Some(dot)))?;

    let lookaheads = item.lookaheads.iter()
      .map(|token| self.aug.token_name(token))
      .collect::<Vec<_>>();
    write!(f, "  [{}]", lookaheads.join(" "))
  }

  pub fn state_items(&self, state: usize) -> Vec<String> {
    self.states[state].items.iter()
      .map(|item| {
        let mut buf = String::new();
        // writing to a String cannot fail
        let _ = self.fmt_item(item, &mut buf);
        buf
      })
      .collect()
  }
}

pub fn encode_item(max_nsym_p1: usize, prod: usize, dot: usize) -> usize {
  prod * max_nsym_p1 + dot
}

pub fn decode_item(max_nsym_p1: usize, key: usize) -> (usize, usize) {
  (key / max_nsym_p1, key % max_nsym_p1)
}

#[cfg(test)]
impl<'a, 'g> Builder<'a, 'g> {
  pub fn fmt_states(&self) -> String {
    let mut buf = String::new();

    for (i, (_, state)) in self.states.iter().enumerate() {
      let _ = writeln!(buf, "State {}", i);
      for line in self.state_items(i) {
        let _ = writeln!(buf, "  {}", line);
      }
      buf.push('\n');
    }

    buf
  }
}
