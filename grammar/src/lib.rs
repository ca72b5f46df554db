//! Grammar compilation: surface syntax, templates, imports, EBNF lowering,
//! terminal compilation, lexing and tree shaping.

use indexmap::{IndexMap, IndexSet};
use fnv::FnvBuildHasher;
use tracing::debug;

mod grammar_parser;
mod error;
mod token_set;

pub mod grammar;
pub mod import;
pub mod lexer;
pub mod template;
pub mod terminal;
pub mod tree;

pub use self::grammar::*;
pub use error::{GrammarError, ParseError, Span};
pub use import::{ImportResolver, BuiltinModules};
pub use lexer::{Cursor, Lexer, LexerMode, Token, TokenId, Tokens};
pub use terminal::{Terminal, Pattern, PatternKind, PrecedenceKey};
pub use token_set::TokenSet;
pub use tree::{Child, Tree, TreeBuilder, TreeOptions, Value};

pub type Map<K, V> = IndexMap<K, V, FnvBuildHasher>;
pub type Set<T> = IndexSet<T, FnvBuildHasher>;
pub type HashMap<K, V> = fnv::FnvHashMap<K, V>;
pub type HashSet<T> = fnv::FnvHashSet<T>;

/// Compiles grammar text into an immutable [`Grammar`].
///
/// `%import` directives are answered by `resolver`.
pub fn build(
  input: &str,
  resolver: &dyn ImportResolver,
) -> Result<Grammar, GrammarError> {
  let ast = grammar_parser::parse(input)?;
  let ast = import::resolve(ast, resolver)?;
  let grammar = grammar::assemble(ast)?;

  debug!(
    rules = grammar.nts.len(),
    productions = grammar.prods.len(),
    terminals = grammar.terminals.len(),
    "grammar compiled");

  Ok(grammar)
}
