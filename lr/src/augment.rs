use std::ops::Range;
use grammar::{Grammar, NonterminalId, Symbol};

pub const EOF_NAME: &str = "$END";
const ACCEPT_NAME: &str = "$root";

/// A grammar view with the extra production `$root -> start`, accepted on
/// the end-of-input token, a new token numbered after all terminals.
pub struct Augmented<'g> {
  pub grammar: &'g Grammar,
  accept: [Symbol; 1],
  pub eof: usize,
}

impl<'g> Augmented<'g> {
  pub fn new(grammar: &'g Grammar, start: NonterminalId) -> Self {
    Self {
      grammar,
      accept: [Symbol::Nonterminal(start)],
      eof: grammar.terminals.len(),
    }
  }

  /// Production index of `$root -> start`.
  pub fn accept_prod(&self) -> usize {
    self.grammar.prods.len()
  }

  pub fn num_prods(&self) -> usize {
    self.grammar.prods.len() + 1
  }

  /// Token count including end of input.
  pub fn num_tokens(&self) -> usize {
    self.eof + 1
  }

  pub fn symbols(&self, prod: usize) -> &[Symbol] {
    if prod == self.accept_prod() {
      &self.accept
    } else {
      &self.grammar.prods[prod].symbols
    }
  }

  pub fn priority(&self, prod: usize) -> i32 {
    self.grammar.prods.get(prod)
      .and_then(|prod| prod.priority)
      .unwrap_or(0)
  }

  pub fn range(&self, nt: NonterminalId) -> Range<usize> {
    self.grammar.nts[nt.index()].range.clone()
  }

  pub fn token_name(&self, token: usize) -> &str {
    if token == self.eof {
      EOF_NAME
    } else {
      &self.grammar.terminals[token].name
    }
  }

  pub fn nt_name(&self, prod: usize) -> &str {
    match self.grammar.prods.get(prod) {
      Some(prod) => &self.grammar.nts[prod.nt.index()].name,
      None => ACCEPT_NAME,
    }
  }

  /// `nt -> A b`, with a dot before symbol `dot` when given.
  pub fn fmt_prod(&self, prod: usize, dot: Option<usize>) -> String {
    let mut buf = format!("{} ->", self.nt_name(prod));
    let symbols = self.symbols(prod);

    for (i, &sym) in symbols.iter().enumerate() {
      if dot == Some(i) {
        buf.push_str(" .");
      }
      buf.push(' ');
      buf.push_str(self.grammar.symbol_name(sym));
    }

    if dot == Some(symbols.len()) {
      buf.push_str(" .");
    } else if symbols.is_empty() {
      buf.push_str(" <empty>");
    }

    buf
  }
}
