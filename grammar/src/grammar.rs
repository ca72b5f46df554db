use std::fmt::Write;
use std::ops::Range;
use bimap::BiMap;
use bitvec::prelude::*;
use crate::grammar_parser::ast::{self, Alt, Decl, Expr, RuleModifier, TermDecl};
use crate::lexer::{Lexer, TokenId, TokenIdGen};
use crate::template::{self, Template, Templates};
use crate::terminal::{self, Compiler, Pattern, Terminal};
use crate::{GrammarError, HashMap, Map, Set, Span, TokenSet};

mod lower;

/// A fully resolved grammar in plain BNF.
///
/// Nonterminals and terminals are indexed by their ids; the productions of
/// a nonterminal are contiguous in `prods`.
#[derive(Debug, Clone)]
pub struct Grammar {
  pub prods: Vec<Production>,
  pub nts: Vec<Nonterminal>,
  pub nt_names: BiMap<NonterminalId, String>,
  pub terminals: Vec<Terminal>,
  pub tokens: BiMap<TokenId, String>,
  pub ignore: TokenSet,
  pub lexer: Lexer,
}

#[derive(Debug, Clone)]
pub struct Production {
  pub nt: NonterminalId,
  pub symbols: Vec<Symbol>,
  /// Per symbol: dropped from trees unless tokens are kept.
  pub filtered: BitVec,
  pub alias: Option<String>,
  pub priority: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct Nonterminal {
  pub name: String,
  /// Indices into `Grammar::prods`.
  pub range: Range<usize>,
  pub kind: NonterminalKind,
  pub span: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NonterminalKind {
  User,
  /// `_rule`
  Inline,
  /// `?rule`
  ExpandSingle,
  /// `x?`
  Optional,
  /// `[x]`
  Maybe,
  /// `x*`, `x+` and `x ~ n..m`
  Repetition,
  /// `(x | y)`
  Group,
}

impl NonterminalKind {
  /// Helpers synthesized by desugaring.
  pub fn is_helper(self) -> bool {
    !matches!(self, Self::User | Self::Inline | Self::ExpandSingle)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol {
  Nonterminal(NonterminalId),
  Token(TokenId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonterminalId(u32);

#[derive(Default)]
pub(crate) struct NonterminalIdGen(u32);

impl NonterminalIdGen {
  pub fn gen(&mut self) -> NonterminalId {
    let i = self.0;
    self.0 += 1;
    NonterminalId(i)
  }
}

impl NonterminalId {
  pub fn id(&self) -> u32 {
    self.0
  }

  pub fn index(&self) -> usize {
    self.0 as usize
  }
}

impl Grammar {
  pub fn nonterminal(&self, name: &str) -> Option<NonterminalId> {
    self.nt_names.get_by_right(name).copied()
  }

  pub fn token(&self, name: &str) -> Option<TokenId> {
    self.tokens.get_by_right(name).copied()
  }

  pub fn productions(&self, nt: NonterminalId) -> &[Production] {
    &self.prods[self.nts[nt.index()].range.clone()]
  }

  pub fn symbol_name(&self, symbol: Symbol) -> &str {
    match symbol {
      Symbol::Nonterminal(nt) => &self.nts[nt.index()].name,
      Symbol::Token(token) => &self.terminals[token.index()].name,
    }
  }

  /// Nonterminals deriving the empty string, by index.
  pub fn nullable(&self) -> BitVec {
    let mut nullable = bitvec![0; self.nts.len()];

    loop {
      let mut changed = false;

      for prod in &self.prods {
        if nullable[prod.nt.index()] {
          continue;
        }

        let all_nullable = prod.symbols.iter().all(|symbol| match symbol {
          Symbol::Nonterminal(nt) => nullable[nt.index()],
          Symbol::Token(_) => false,
        });

        if all_nullable {
          nullable.set(prod.nt.index(), true);
          changed = true;
        }
      }

      if !changed {
        return nullable;
      }
    }
  }
}

impl Production {
  pub fn to_string(&self, grammar: &Grammar) -> String {
    let mut buf = format!("{} ->", grammar.nts[self.nt.index()].name);

    if self.symbols.is_empty() {
      buf.push_str(" <empty>");
    }

    for &symbol in &self.symbols {
      write!(&mut buf, " {}", grammar.symbol_name(symbol)).ok();
    }

    buf
  }
}

/// Declarations of one grammar, sorted by kind.
struct Decls<'a> {
  rules: Vec<&'a ast::RuleDecl>,
  templates: Templates,
  terms: Vec<&'a TermDecl>,
  ignores: Vec<&'a ast::IgnoreDecl>,
  declares: Vec<&'a ast::Spanned<String>>,
}

fn sort_decls(ast: &ast::Grammar) -> Result<Decls<'_>, GrammarError> {
  let mut decls = Decls {
    rules: vec![],
    templates: Templates::default(),
    terms: vec![],
    ignores: vec![],
    declares: vec![],
  };
  let mut seen = Set::default();
  let mut define = |name: &ast::Spanned<String>| {
    if seen.insert(name.1.clone()) {
      Ok(())
    } else {
      Err(GrammarError::NameCollision {
        name: name.1.clone(),
        span: Some(name.0),
      })
    }
  };

  for decl in ast {
    match &decl.1 {
      Decl::Rule(rule) => {
        define(&rule.name)?;
        if rule.params.is_empty() {
          decls.rules.push(rule);
        } else {
          decls.templates.insert(rule.name.1.clone(), Template {
            params: rule.params.iter().map(|p| p.1.clone()).collect(),
            body: rule.expansions.clone(),
          });
        }
      }
      Decl::Term(term) => {
        define(&term.name)?;
        decls.terms.push(term);
      }
      Decl::Ignore(ignore) => decls.ignores.push(ignore),
      Decl::Declare(declare) => {
        for name in &declare.names {
          define(name)?;
          decls.declares.push(name);
        }
      }
      Decl::Import(_) => {}
    }
  }

  Ok(decls)
}

/// Calls `f` on every inline literal and range of the expansions.
fn visit_literals<F: FnMut(&Expr)>(exps: &[Alt], f: &mut F) {
  for alt in exps {
    for item in &alt.items {
      visit_expr_literals(item, f);
    }
  }
}

fn visit_expr_literals<F: FnMut(&Expr)>(expr: &Expr, f: &mut F) {
  match expr {
    Expr::Literal(_) | Expr::Range(_) => f(expr),
    Expr::Symbol(_) | Expr::Template(..) => {}
    Expr::Group(exps) | Expr::Maybe(exps) => visit_literals(exps, f),
    Expr::Repeat(inner, _) => visit_expr_literals(inner, f),
  }
}

fn literal_span(expr: &Expr) -> Option<Span> {
  match expr {
    Expr::Literal(literal) => Some(literal.0),
    Expr::Range(range) => Some(range.0),
    _ => None,
  }
}

/// Terminal ids in their final order.
pub(crate) struct TerminalTable {
  pub terminals: Vec<Terminal>,
  pub names: BiMap<TokenId, String>,
  /// Patterns of inline literals, mapped to the terminal that lexes them.
  pub literals: HashMap<Pattern, TokenId>,
}

impl TerminalTable {
  pub fn by_name(&self, name: &str) -> Option<TokenId> {
    self.names.get_by_right(name).copied()
  }
}

fn anonymous_name(pattern: &Pattern, taken: &Set<String>, counter: &mut usize) -> String {
  if pattern.is_string() {
    let value = pattern.value();
    let is_ident = value.chars().next().map_or(false, |c| c.is_ascii_alphabetic())
      && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if is_ident && !taken.contains(&value.to_uppercase()) {
      return value.to_uppercase();
    }

    if let Some(name) = terminal::punctuation_name(value) {
      if !taken.contains(name) {
        return name.to_owned();
      }
    }
  }

  loop {
    let name = format!("__ANON_{}", counter);
    *counter += 1;
    if !taken.contains(&name) {
      return name;
    }
  }
}

pub(crate) fn assemble(ast: ast::Grammar) -> Result<Grammar, GrammarError> {
  let decls = sort_decls(&ast)?;

  let rules = decls.rules.iter()
    .map(|rule| Ok((*rule, template::expand(&rule.expansions, &decls.templates)?)))
    .collect::<Result<Vec<_>, GrammarError>>()?;

  let term_defs = decls.terms.iter()
    .map(|term| (term.name.1.clone(), *term))
    .collect::<HashMap<_, _>>();
  let mut compiler = Compiler::new(&term_defs);

  // every declared terminal is compiled, used or not
  let mut named = Map::<String, Pattern>::default();
  for term in &decls.terms {
    named.insert(term.name.1.clone(), compiler.terminal(&term.name.1)?);
  }

  let mut taken = named.keys().cloned().collect::<Set<_>>();
  taken.extend(decls.declares.iter().map(|name| name.1.clone()));

  // ignored terminals: a name, or an inline pattern under a fresh name
  let mut ignored = vec![];
  let mut ignore_patterns = vec![];
  for (i, ignore) in decls.ignores.iter().enumerate() {
    let single = match ignore.expansions.as_slice() {
      [Alt { items, alias: None, .. }] => match items.as_slice() {
        [Expr::Symbol(name)] => Some(name),
        _ => None,
      },
      _ => None,
    };

    match single {
      Some(name) => {
        if !named.contains_key(&name.1) {
          return Err(GrammarError::UndefinedSymbol {
            name: name.1.clone(),
            span: Some(name.0),
          });
        }
        ignored.push(name.1.clone());
      }
      None => {
        let name = format!("__IGNORE_{}", i);
        let pattern = compiler.expansions(&name, ignore.body, &ignore.expansions)?;
        taken.insert(name.clone());
        ignored.push(name.clone());
        ignore_patterns.push((name, pattern, ignore.body));
      }
    }
  }

  // names and literals used by rules
  let mut used = Set::<String>::default();
  let mut literals = Map::<Pattern, Span>::default();
  for (rule, exps) in &rules {
    let mut result = Ok(());
    ast::visit_expansion_names(exps, &mut |name| {
      if ast::is_terminal_name(name) {
        used.insert(name.to_owned());
      }
    });
    visit_literals(exps, &mut |expr| {
      if result.is_err() {
        return;
      }
      match compiler.expr(&rule.name.1, rule.name.0, expr) {
        Ok(pattern) => {
          if let Some(span) = literal_span(expr) {
            literals.entry(pattern).or_insert(span);
          }
        }
        Err(err) => result = Err(err),
      }
    });
    result?;
  }

  // final terminal order: declared, anonymous, then `%declare`d
  let mut table = TerminalTable {
    terminals: vec![],
    names: BiMap::new(),
    literals: HashMap::default(),
  };
  let mut id_gen = TokenIdGen::default();
  let mut push = |table: &mut TerminalTable, terminal: Terminal| {
    let id = id_gen.gen();
    table.names.insert(id, terminal.name.clone());
    table.terminals.push(terminal);
    id
  };

  let reused = literals.keys()
    .filter_map(|pattern| named.iter().find(|(_, p)| *p == pattern).map(|(name, _)| name.clone()))
    .collect::<Set<_>>();

  for term in &decls.terms {
    let name = &term.name.1;
    if used.contains(name) || ignored.contains(name) || reused.contains(name) {
      push(&mut table, Terminal {
        name: name.clone(),
        pattern: named.get(name).cloned(),
        priority: term.priority.unwrap_or(terminal::DEFAULT_PRIORITY),
        anonymous: false,
        span: Some(term.name.0),
      });
    }
  }

  for (name, pattern, span) in ignore_patterns {
    push(&mut table, Terminal {
      name,
      pattern: Some(pattern),
      priority: terminal::DEFAULT_PRIORITY,
      anonymous: true,
      span: Some(span),
    });
  }

  let mut counter = 0;
  for (pattern, span) in literals {
    let existing = named.iter()
      .find(|(_, p)| **p == pattern)
      .and_then(|(name, _)| table.by_name(name));

    let id = match existing {
      Some(id) => id,
      None => {
        let name = anonymous_name(&pattern, &taken, &mut counter);
        taken.insert(name.clone());
        push(&mut table, Terminal {
          name,
          pattern: Some(pattern.clone()),
          priority: terminal::DEFAULT_PRIORITY,
          anonymous: true,
          span: Some(span),
        })
      }
    };
    table.literals.insert(pattern, id);
  }

  for name in &decls.declares {
    push(&mut table, Terminal {
      name: name.1.clone(),
      pattern: None,
      priority: terminal::DEFAULT_PRIORITY,
      anonymous: false,
      span: Some(name.0),
    });
  }

  for name in &used {
    if table.by_name(name).is_none() {
      return Err(GrammarError::UndefinedSymbol {
        name: name.clone(),
        span: None,
      });
    }
  }

  let (prods, nts, nt_names) = lower::lower(&rules, &table, &mut compiler)?;

  let mut ignore = TokenSet::new(table.terminals.len());
  for name in &ignored {
    if let Some(id) = table.by_name(name) {
      ignore.insert(id.index());
    }
  }

  let lexer = Lexer::new(&table.terminals, ignore.clone())?;

  Ok(Grammar {
    prods,
    nts,
    nt_names,
    terminals: table.terminals,
    tokens: table.names,
    ignore,
    lexer,
  })
}

pub(crate) fn modifier_kind(name: &str, modifier: RuleModifier) -> NonterminalKind {
  if name.starts_with('_') {
    NonterminalKind::Inline
  } else if modifier == RuleModifier::ExpandSingle {
    NonterminalKind::ExpandSingle
  } else {
    NonterminalKind::User
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::BuiltinModules;
  use pretty_assertions::assert_eq;

  fn build(input: &str) -> Result<Grammar, GrammarError> {
    crate::build(input, &BuiltinModules)
  }

  fn terminal_names(grammar: &Grammar) -> Vec<&str> {
    grammar.terminals.iter().map(|t| t.name.as_str()).collect()
  }

  #[test]
  fn anonymous_terminals() {
    let grammar = build(r#"
start: "if" expr "+" expr /[0-9]+/ "then"i
expr: NAME | "(" expr ")"
NAME: /[a-z]+/
PLUS: "+"
"#).unwrap();

    assert_eq!(
      terminal_names(&grammar),
      vec!["NAME", "PLUS", "IF", "__ANON_0", "THEN", "LPAR", "RPAR"]);
  }

  #[test]
  fn unused_terminals_are_dropped() {
    let grammar = build("start: A\nA: B B\nB: \"b\"\nC: \"c\"\n").unwrap();

    assert_eq!(terminal_names(&grammar), vec!["A"]);
  }

  #[test]
  fn ignore_and_declare() {
    let grammar = build("start: A INDENT\nA: \"a\"\n%ignore \" \"\n%declare INDENT\n").unwrap();

    assert_eq!(terminal_names(&grammar), vec!["A", "__IGNORE_0", "INDENT"]);
    assert!(grammar.ignore.contains(1));
    assert!(grammar.terminals[2].pattern.is_none());
  }

  #[test]
  fn nullable() {
    let grammar = build("start: a b\na: \"x\"?\nb: a a | \"y\"\n").unwrap();
    let nullable = grammar.nullable();

    for (name, expected) in [("start", true), ("a", true), ("b", true)] {
      let nt = grammar.nonterminal(name).unwrap();
      assert_eq!(nullable[nt.index()], expected, "{}", name);
    }
  }

  #[test]
  fn errors() {
    assert!(matches!(
      build("a: B\na: C\n"),
      Err(GrammarError::NameCollision { name, .. }) if name == "a"));
    assert!(matches!(
      build("start: missing\n"),
      Err(GrammarError::UndefinedSymbol { name, .. }) if name == "missing"));
    assert!(matches!(
      build("start: MISSING\n"),
      Err(GrammarError::UndefinedSymbol { name, .. }) if name == "MISSING"));
    assert!(matches!(
      build("start: A\nA: \"a\"?\n"),
      Err(GrammarError::ZeroWidthTerminal { name, .. }) if name == "A"));
    assert!(matches!(
      build("start: A\nA: /(/\n"),
      Err(GrammarError::InvalidPattern { name, .. }) if name == "A"));
    assert!(matches!(
      build("start: A\n%ignore B\nA: \"a\"\n"),
      Err(GrammarError::UndefinedSymbol { name, .. }) if name == "B"));
  }
}
