//! Compiles EBNF grammars into reusable parsers that produce parse trees.
//!
//! ```
//! use sprig::{Child, Config};
//!
//! let parser = sprig::compile(r#"
//! start: WORD ("," WORD)*
//! %import common.WORD
//! %ignore " "
//! "#, &Config::default()).unwrap();
//!
//! let tree = parser.parse("hello, world").unwrap();
//! assert_eq!(tree.tag, "start");
//! assert_eq!(tree.children.len(), 2);
//! assert!(matches!(&tree.children[0], Child::Token(token) if token.text == "hello"));
//! ```

use grammar::{TreeBuilder, TreeOptions};
use tracing::debug;

pub use grammar::{
  BuiltinModules, Child, Grammar, GrammarError, ImportResolver, LexerMode, ParseError, Span, Token,
  Tokens, Tree,
};
pub use lr::{ConflictError, ConflictKind};
pub use config::{Algorithm, Config};
pub use engine::Engine;
pub use error::CompileError;

pub mod cache;
pub mod report;
mod config;
mod engine;
mod error;

/// A compiled grammar with the engine selected by its [`Config`]. Parsing
/// takes `&self`, so one parser serves any number of threads.
#[derive(Debug)]
pub struct Parser {
  grammar: Grammar,
  engine: Box<dyn Engine>,
  tree: TreeBuilder,
  config: Config,
}

/// Compiles `grammar` with the built-in import modules.
pub fn compile(grammar: &str, config: &Config) -> Result<Parser, CompileError> {
  compile_with(grammar, config, &BuiltinModules)
}

/// Compiles `grammar`, answering `%import` directives with `resolver`.
pub fn compile_with(
  grammar: &str,
  config: &Config,
  resolver: &dyn ImportResolver,
) -> Result<Parser, CompileError> {
  config.validate().map_err(CompileError::InvalidConfig)?;

  let grammar = grammar::build(grammar, resolver)?;
  let start = grammar.nonterminal(&config.start)
    .ok_or_else(|| CompileError::UnknownStartRule {
      name: config.start.clone(),
    })?;

  let engine: Box<dyn Engine> = match config.algorithm {
    Algorithm::Deterministic => Box::new(lr::build(&grammar, start)?),
    Algorithm::Chart => Box::new(chart::build(&grammar, start, config.lexer_mode())),
  };

  let tree = TreeBuilder::new(&grammar, start, TreeOptions {
    maybe_placeholders: config.maybe_placeholders,
    keep_all_tokens: config.keep_all_tokens,
  });

  debug!(
    start = %config.start,
    algorithm = ?config.algorithm,
    lexer = ?config.lexer_mode(),
    "parser compiled");

  Ok(Parser {
    grammar,
    engine,
    tree,
    config: config.clone(),
  })
}

impl Parser {
  pub fn parse(&self, input: &str) -> Result<Tree, ParseError> {
    self.engine.parse(&self.grammar, &self.tree, input)
  }

  /// Standard-mode tokens of `input`, ignored terminals skipped.
  pub fn lex<'p, 'i>(&'p self, input: &'i str) -> Tokens<'p, 'i> {
    self.grammar.lexer.tokens(input)
  }

  pub fn grammar(&self) -> &Grammar {
    &self.grammar
  }

  pub fn config(&self) -> &Config {
    &self.config
  }
}
