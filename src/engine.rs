use std::fmt::Debug;
use grammar::{Grammar, ParseError, Tree, TreeBuilder};

/// A parsing algorithm over a compiled grammar.
pub trait Engine: Debug + Send + Sync {
  fn parse(&self, grammar: &Grammar, tree: &TreeBuilder, input: &str) -> Result<Tree, ParseError>;
}

impl Engine for lr::LrParser {
  fn parse(&self, grammar: &Grammar, tree: &TreeBuilder, input: &str) -> Result<Tree, ParseError> {
    lr::LrParser::parse(self, grammar, tree, input)
  }
}

impl Engine for chart::ChartParser {
  fn parse(&self, grammar: &Grammar, tree: &TreeBuilder, input: &str) -> Result<Tree, ParseError> {
    chart::ChartParser::parse(self, grammar, tree, input)
  }
}
