//! Earley parsing for arbitrary context-free grammars, including ambiguous
//! and left-recursive ones.

use bitvec::prelude::*;
use grammar::{Grammar, LexerMode, NonterminalId, ParseError, Tree, TreeBuilder};
use tracing::debug;

mod derivation;
mod earley;

#[derive(Debug, Clone)]
pub struct ChartParser {
  start: NonterminalId,
  mode: LexerMode,
  nullable: BitVec,
}

pub fn build(grammar: &Grammar, start: NonterminalId, mode: LexerMode) -> ChartParser {
  ChartParser {
    start,
    mode,
    nullable: grammar.nullable(),
  }
}

impl ChartParser {
  pub fn mode(&self) -> LexerMode {
    self.mode
  }

  pub fn parse(
    &self,
    grammar: &Grammar,
    tree: &TreeBuilder,
    input: &str,
  ) -> Result<Tree, ParseError> {
    let recognizer = earley::Recognizer::new(
      grammar, &self.nullable, self.mode, tree.keeps_all_tokens());
    let mut chart = recognizer.recognize(self.start, input)?;

    debug!(sets = chart.sets.len(), "chart recognized");

    let end = chart.tokens.len();
    let value = derivation::Extractor::new(grammar, &chart, tree)
      .value(self.start, 0, end)
      .ok_or_else(|| {
        let last_line = input.rsplit('\n').next().unwrap_or("");
        ParseError::NoParseFound {
          position: input.len(),
          line: input.matches('\n').count() + 1,
          column: last_line.chars().count() + 1,
          expected: vec![],
        }
      })?;

    let ignored = std::mem::take(&mut chart.ignored);
    Ok(tree.finish(value, ignored))
  }
}
