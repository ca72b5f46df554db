//! Parse tree shaping.
//!
//! Engines report every reduction to a [`TreeBuilder`], which drops filtered
//! tokens, splices helper and inlined rules into their parent, and applies
//! aliases and `[x]` placeholders.

use bitvec::prelude::*;
use crate::{Grammar, NonterminalId, NonterminalKind, Token};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
  /// Rule name or alias.
  pub tag: String,
  pub children: Vec<Child>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
  Tree(Tree),
  Token(Token),
  /// An unmatched `[x]` slot, with placeholders enabled.
  Absent,
}

/// Partial result on an engine's stack.
#[derive(Debug, Clone)]
pub enum Value {
  Node(Tree),
  Leaf(Token),
  /// Children to be spliced into the parent.
  Spliced(Vec<Child>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TreeOptions {
  pub maybe_placeholders: bool,
  pub keep_all_tokens: bool,
}

#[derive(Debug, Clone)]
enum Shape {
  Node(String),
  ExpandSingle(String),
  Splice,
}

#[derive(Debug, Clone)]
struct Reduction {
  shape: Shape,
  filtered: BitVec,
  placeholders: usize,
}

#[derive(Debug, Clone)]
pub struct TreeBuilder {
  reductions: Vec<Reduction>,
  start: String,
  keep_all_tokens: bool,
}

impl TreeBuilder {
  pub fn new(grammar: &Grammar, start: NonterminalId, options: TreeOptions) -> Self {
    let reductions = grammar.prods.iter()
      .map(|prod| {
        let nt = &grammar.nts[prod.nt.index()];
        let shape = match (&prod.alias, nt.kind) {
          (Some(alias), _) => Shape::Node(alias.clone()),
          (None, NonterminalKind::User) => Shape::Node(nt.name.clone()),
          (None, NonterminalKind::ExpandSingle) => Shape::ExpandSingle(nt.name.clone()),
          (None, _) => Shape::Splice,
        };

        let placeholders = if options.maybe_placeholders
          && nt.kind == NonterminalKind::Maybe
          && prod.symbols.is_empty()
        {
          grammar.prods[nt.range.clone()].iter()
            .map(|sibling| {
              sibling.filtered.iter()
                .by_vals()
                .filter(|&filtered| !filtered || options.keep_all_tokens)
                .count()
            })
            .max()
            .unwrap_or(0)
        } else {
          0
        };

        Reduction {
          shape,
          filtered: prod.filtered.clone(),
          placeholders,
        }
      })
      .collect();

    Self {
      reductions,
      start: grammar.nts[start.index()].name.clone(),
      keep_all_tokens: options.keep_all_tokens,
    }
  }

  pub fn keeps_all_tokens(&self) -> bool {
    self.keep_all_tokens
  }

  /// Combines the values of the symbols of production `prod`.
  pub fn reduce(&self, prod: usize, values: Vec<Value>) -> Value {
    let reduction = &self.reductions[prod];
    let mut children = Vec::new();

    for (i, value) in values.into_iter().enumerate() {
      match value {
        Value::Leaf(token) => {
          let filtered = reduction.filtered.get(i).map_or(false, |bit| *bit);
          if !filtered || self.keep_all_tokens {
            children.push(Child::Token(token));
          }
        }
        Value::Node(tree) => children.push(Child::Tree(tree)),
        // left-recursive lists arrive spliced first; reuse their buffer
        Value::Spliced(spliced) if children.is_empty() => children = spliced,
        Value::Spliced(spliced) => children.extend(spliced),
      }
    }

    children.extend(std::iter::repeat(Child::Absent).take(reduction.placeholders));

    match &reduction.shape {
      Shape::Node(tag) => Value::Node(Tree {
        tag: tag.clone(),
        children,
      }),
      Shape::ExpandSingle(_) if children.len() == 1 => Value::Spliced(children),
      Shape::ExpandSingle(tag) => Value::Node(Tree {
        tag: tag.clone(),
        children,
      }),
      Shape::Splice => Value::Spliced(children),
    }
  }

  /// Turns the value of the start symbol into the final tree. With all
  /// tokens kept, `ignored` tokens are put back in the innermost node
  /// covering them.
  pub fn finish(&self, value: Value, ignored: Vec<Token>) -> Tree {
    let mut tree = match value {
      Value::Node(tree) => tree,
      Value::Spliced(mut children) => match (children.len(), children.pop()) {
        (1, Some(Child::Tree(tree))) => tree,
        (_, last) => {
          children.extend(last);
          Tree {
            tag: self.start.clone(),
            children,
          }
        }
      },
      Value::Leaf(token) => Tree {
        tag: self.start.clone(),
        children: vec![Child::Token(token)],
      },
    };

    if self.keep_all_tokens {
      for token in ignored {
        tree.attach(token);
      }
    }

    tree
  }
}

impl Tree {
  /// Byte range covered by the tokens of the tree.
  pub fn span(&self) -> Option<(usize, usize)> {
    let mut span: Option<(usize, usize)> = None;
    for child in &self.children {
      if let Some((start, end)) = child.span() {
        span = Some(match span {
          Some((s, e)) => (s.min(start), e.max(end)),
          None => (start, end),
        });
      }
    }
    span
  }

  /// All tokens, in input order.
  pub fn tokens(&self) -> Vec<&Token> {
    let mut tokens = vec![];
    self.collect_tokens(&mut tokens);
    tokens
  }

  fn collect_tokens<'t>(&'t self, tokens: &mut Vec<&'t Token>) {
    for child in &self.children {
      match child {
        Child::Tree(tree) => tree.collect_tokens(tokens),
        Child::Token(token) => tokens.push(token),
        Child::Absent => {}
      }
    }
  }

  fn attach(&mut self, token: Token) {
    let inner = self.children.iter().position(|child| match child {
      Child::Tree(tree) => tree.span()
        .map_or(false, |(start, end)| start <= token.start && token.end <= end),
      _ => false,
    });

    if let Some(Child::Tree(tree)) = inner.map(|ix| &mut self.children[ix]) {
      return tree.attach(token);
    }

    let at = self.children.iter()
      .position(|child| child.span().map_or(false, |(start, _)| start >= token.end))
      .unwrap_or(self.children.len());
    self.children.insert(at, Child::Token(token));
  }
}

impl Child {
  pub fn span(&self) -> Option<(usize, usize)> {
    match self {
      Self::Tree(tree) => tree.span(),
      Self::Token(token) => Some((token.start, token.end)),
      Self::Absent => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::BuiltinModules;
  use pretty_assertions::assert_eq;

  fn token(grammar: &Grammar, name: &str, text: &str, start: usize) -> Token {
    Token {
      kind: grammar.token(name).unwrap(),
      terminal: name.to_owned(),
      text: text.to_owned(),
      start,
      end: start + text.len(),
      line: 1,
      column: start + 1,
    }
  }

  fn prod_of(grammar: &Grammar, rule: &str, alt: usize) -> usize {
    grammar.nts[grammar.nonterminal(rule).unwrap().index()].range.start + alt
  }

  #[test]
  fn aliases_and_expand_single() {
    let grammar = crate::build(
      "?start: A -> single\n  | A A\nA: \"a\"\n",
      &BuiltinModules,
    ).unwrap();
    let start = grammar.nonterminal("start").unwrap();
    let builder = TreeBuilder::new(&grammar, start, TreeOptions::default());

    let a = token(&grammar, "A", "a", 0);
    let single = builder.reduce(prod_of(&grammar, "start", 0), vec![Value::Leaf(a.clone())]);
    assert!(matches!(&single, Value::Node(tree) if tree.tag == "single"));

    let pair = builder.reduce(
      prod_of(&grammar, "start", 1),
      vec![Value::Leaf(a.clone()), Value::Leaf(token(&grammar, "A", "a", 1))]);
    assert!(matches!(&pair, Value::Node(tree) if tree.tag == "start" && tree.children.len() == 2));
  }

  #[test]
  fn placeholders() {
    let grammar = crate::build("start: [A] B\nA: \"a\"\nB: \"b\"\n", &BuiltinModules).unwrap();
    let start = grammar.nonterminal("start").unwrap();
    let maybe = grammar.nts.iter().position(|nt| nt.kind == NonterminalKind::Maybe).unwrap();
    let empty = grammar.nts[maybe].range.end - 1;

    let b = token(&grammar, "B", "b", 0);
    let options = TreeOptions {
      maybe_placeholders: true,
      keep_all_tokens: false,
    };

    for (options, expected) in [(options, 2), (TreeOptions::default(), 1)] {
      let builder = TreeBuilder::new(&grammar, start, options);
      let absent = builder.reduce(empty, vec![]);
      let value = builder.reduce(prod_of(&grammar, "start", 0), vec![absent, Value::Leaf(b.clone())]);
      let tree = builder.finish(value, vec![]);
      assert_eq!(tree.children.len(), expected);
    }
  }

  #[test]
  fn ignored_tokens_go_to_innermost_node() {
    let grammar = crate::build(
      "start: pair C\npair: A B\nA: \"a\"\nB: \"b\"\nC: \"c\"\nWS: \" \"\n%ignore WS\n",
      &BuiltinModules,
    ).unwrap();
    let start = grammar.nonterminal("start").unwrap();
    let builder = TreeBuilder::new(&grammar, start, TreeOptions {
      maybe_placeholders: false,
      keep_all_tokens: true,
    });

    // "a b c"
    let pair = builder.reduce(
      prod_of(&grammar, "pair", 0),
      vec![Value::Leaf(token(&grammar, "A", "a", 0)), Value::Leaf(token(&grammar, "B", "b", 2))]);
    let value = builder.reduce(
      prod_of(&grammar, "start", 0),
      vec![pair, Value::Leaf(token(&grammar, "C", "c", 4))]);
    let tree = builder.finish(value, vec![
      token(&grammar, "WS", " ", 1),
      token(&grammar, "WS", " ", 3),
    ]);

    let texts = |tree: &Tree| tree.children.iter()
      .map(|child| match child {
        Child::Tree(tree) => tree.tag.clone(),
        Child::Token(token) => token.text.clone(),
        Child::Absent => "_".to_owned(),
      })
      .collect::<Vec<_>>();

    assert_eq!(texts(&tree), vec!["pair", " ", "c"]);
    match &tree.children[0] {
      Child::Tree(pair) => assert_eq!(texts(pair), vec!["a", " ", "b"]),
      other => panic!("unexpected {:?}", other),
    }
  }
}
