//! FIRST and NULLABLE sets.

use bitvec::prelude::*;
use grammar::{Symbol, TokenSet};
use crate::augment::Augmented;

#[derive(Debug, Clone)]
pub struct First {
  /// Indexed by nonterminal.
  pub first: Vec<TokenSet>,
  pub nullable: BitVec,
}

pub fn compute(aug: &Augmented) -> First {
  let grammar = aug.grammar;
  let nullable = grammar.nullable();
  let mut first = vec![TokenSet::new(aug.num_tokens()); grammar.nts.len()];

  loop {
    let mut changed = false;

    for prod in &grammar.prods {
      let nt = prod.nt.index();
      for &sym in &prod.symbols {
        match sym {
          Symbol::Token(token) => {
            changed |= first[nt].insert(token.index());
            break;
          }
          Symbol::Nonterminal(other) => {
            if other.index() != nt {
              let other_first = first[other.index()].clone();
              changed |= first[nt].union_with(&other_first);
            }
            if !nullable[other.index()] {
              break;
            }
          }
        }
      }
    }

    if !changed {
      break;
    }
  }

  First {
    first,
    nullable,
  }
}

impl First {
  /// Adds FIRST(`symbols`) to `result`, plus `follow` if `symbols` is
  /// nullable.
  pub fn symbols_first(&self, result: &mut TokenSet, symbols: &[Symbol], follow: &TokenSet) {
    for &sym in symbols {
      match sym {
        Symbol::Token(token) => {
          result.insert(token.index());
          return;
        }
        Symbol::Nonterminal(nt) => {
          result.union_with(&self.first[nt.index()]);
          if !self.nullable[nt.index()] {
            return;
          }
        }
      }
    }

    result.union_with(follow);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use grammar::BuiltinModules;
  use pretty_assertions::assert_eq;

  fn names(aug: &Augmented, set: &TokenSet) -> Vec<String> {
    let mut names = set.iter().map(|t| aug.token_name(t).to_owned()).collect::<Vec<_>>();
    names.sort();
    names
  }

  #[test]
  fn nullable_prefixes() {
    let grammar = grammar::build(r#"
z: D | x y z
y: C?
x: y | A
A: "a"
C: "c"
D: "d"
"#, &BuiltinModules).unwrap();
    let z = grammar.nonterminal("z").unwrap();
    let aug = Augmented::new(&grammar, z);
    let first = compute(&aug);

    for (nt, expected) in [("z", vec!["A", "C", "D"]), ("y", vec!["C"]), ("x", vec!["A", "C"])] {
      let ix = grammar.nonterminal(nt).unwrap().index();
      assert_eq!(names(&aug, &first.first[ix]), expected, "{}", nt);
    }

    let y = grammar.nonterminal("y").unwrap().index();
    assert!(first.nullable[y]);
    assert!(!first.nullable[z.index()]);
  }

  #[test]
  fn sequence_with_follow() {
    let grammar = grammar::build("start: a B\na: A?\nA: \"a\"\nB: \"b\"\n", &BuiltinModules).unwrap();
    let start = grammar.nonterminal("start").unwrap();
    let aug = Augmented::new(&grammar, start);
    let first = compute(&aug);

    let a = Symbol::Nonterminal(grammar.nonterminal("a").unwrap());
    let follow = TokenSet::from_token(aug.num_tokens(), aug.eof);
    let mut result = TokenSet::new(aug.num_tokens());
    first.symbols_first(&mut result, &[a], &follow);

    assert_eq!(names(&aug, &result), vec!["$END", "A"]);
  }
}
