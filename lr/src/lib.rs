//! LALR(1) tables and the table-driven parser.

use grammar::{Grammar, NonterminalId, TokenSet};
use tracing::debug;

pub use augment::EOF_NAME;
pub use builder::Tables;
pub use report::{ConflictError, ConflictKind};

mod augment;
mod builder;
mod first;
mod lalr;
mod parse;
mod report;

#[derive(Debug, Clone)]
pub struct LrParser {
  tables: Tables,
  /// Tokens with an action, per state. Drives the contextual lexer.
  expected: Vec<TokenSet>,
  /// (length of RHS of the production, nonterminal index)
  prods: Vec<(usize, usize)>,
  eof: usize,
}

impl LrParser {
  pub fn num_states(&self) -> usize {
    self.tables.action.len()
  }

  pub fn tables(&self) -> &Tables {
    &self.tables
  }
}

/// Builds the LALR(1) parser of `grammar` for the rule `start`.
pub fn build(grammar: &Grammar, start: NonterminalId) -> Result<LrParser, ConflictError> {
  let aug = augment::Augmented::new(grammar, start);
  let mut builder = builder::Builder::new(&aug);
  builder::gen_states(&mut builder);
  let tables = builder::gen_tables(&builder)?;

  debug!(
    start = %grammar.nts[start.index()].name,
    states = tables.action.len(),
    "LALR tables built");

  Ok(LrParser {
    expected: builder::expected_sets(&tables),
    prods: grammar.prods.iter()
      .map(|prod| (prod.symbols.len(), prod.nt.index()))
      .collect(),
    eof: aug.eof,
    tables,
  })
}
