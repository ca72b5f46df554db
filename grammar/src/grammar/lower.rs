//! EBNF desugaring.
//!
//! Operators become helper nonterminals named after a hash of their
//! content, so the same sub-expression always maps to the same helper.

use std::hash::Hasher;
use bimap::BiMap;
use bitvec::prelude::*;
use fnv::FnvHasher;
use tracing::{debug, warn};
use crate::grammar_parser::ast::{self, Alt, Expansions, Expr, RepeatOp, RuleDecl, RuleModifier};
use crate::terminal::Compiler;
use crate::{GrammarError, HashMap};
use super::{
  modifier_kind, Nonterminal, NonterminalId, NonterminalIdGen, NonterminalKind,
  Production, Symbol, TerminalTable,
};

/// Ranges wider than this are expanded but reported.
const WIDE_RANGE: usize = 50;

/// A symbol occurrence and whether trees drop it.
type Sym = (Symbol, bool);

#[derive(Clone, Copy, PartialEq, Eq)]
enum Helper {
  Opt,
  Maybe,
  Star,
  Plus,
  Rep,
  Group,
}

impl Helper {
  fn tag(self) -> &'static str {
    match self {
      Self::Opt => "opt",
      Self::Maybe => "maybe",
      Self::Star => "star",
      Self::Plus => "plus",
      Self::Rep => "rep",
      Self::Group => "grp",
    }
  }

  fn kind(self) -> NonterminalKind {
    match self {
      Self::Opt => NonterminalKind::Optional,
      Self::Maybe => NonterminalKind::Maybe,
      Self::Star | Self::Plus | Self::Rep => NonterminalKind::Repetition,
      Self::Group => NonterminalKind::Group,
    }
  }
}

pub(super) type Lowered = (Vec<Production>, Vec<Nonterminal>, BiMap<NonterminalId, String>);

pub(super) fn lower(
  rules: &[(&RuleDecl, Expansions)],
  table: &TerminalTable,
  compiler: &mut Compiler,
) -> Result<Lowered, GrammarError> {
  let mut lowering = Lowering {
    table,
    compiler,
    prods: vec![],
    nts: vec![],
    nt_names: BiMap::new(),
    helpers: HashMap::default(),
    id_gen: NonterminalIdGen::default(),
  };

  for (rule, _) in rules {
    let nt = lowering.id_gen.gen();
    lowering.nt_names.insert(nt, rule.name.1.clone());
    lowering.nts.push(Nonterminal {
      name: rule.name.1.clone(),
      range: 0..0,
      kind: modifier_kind(&rule.name.1, rule.modifier),
      span: Some(rule.name.0),
    });
  }

  for (i, (rule, exps)) in rules.iter().enumerate() {
    let owner = Owner {
      name: &rule.name.1,
      span: rule.name.0,
      keep: rule.modifier == RuleModifier::KeepTokens,
    };

    let alts = exps.iter()
      .map(|alt| Ok((lowering.seq(&alt.items, &owner)?, alt)))
      .collect::<Result<Vec<_>, GrammarError>>()?;

    let nt = NonterminalId(i as u32);
    let start = lowering.prods.len();
    for (syms, alt) in alts {
      lowering.push_prod(nt, syms, alt.alias.as_ref().map(|a| a.1.clone()), rule.priority);
    }
    lowering.nts[i].range = start..lowering.prods.len();
  }

  debug!(
    rules = rules.len(),
    helpers = lowering.helpers.len(),
    "desugared");

  Ok((lowering.prods, lowering.nts, lowering.nt_names))
}

struct Owner<'r> {
  name: &'r str,
  span: crate::Span,
  /// `!rule`: no occurrence is filtered.
  keep: bool,
}

struct Lowering<'a, 'c> {
  table: &'a TerminalTable,
  compiler: &'a mut Compiler<'c>,
  prods: Vec<Production>,
  nts: Vec<Nonterminal>,
  nt_names: BiMap<NonterminalId, String>,
  /// Helper name to its content key.
  helpers: HashMap<String, (String, NonterminalId)>,
  id_gen: NonterminalIdGen,
}

impl<'a, 'c> Lowering<'a, 'c> {
  fn push_prod(
    &mut self,
    nt: NonterminalId,
    syms: Vec<Sym>,
    alias: Option<String>,
    priority: Option<i32>,
  ) {
    let filtered = syms.iter().map(|&(_, filtered)| filtered).collect::<BitVec>();
    self.prods.push(Production {
      nt,
      symbols: syms.into_iter().map(|(symbol, _)| symbol).collect(),
      filtered,
      alias,
      priority,
    });
  }

  fn seq(&mut self, items: &[Expr], owner: &Owner) -> Result<Vec<Sym>, GrammarError> {
    let mut syms = vec![];
    for item in items {
      syms.extend(self.item(item, owner)?);
    }
    Ok(syms)
  }

  fn alts(&mut self, exps: &[Alt], owner: &Owner) -> Result<Vec<Vec<Sym>>, GrammarError> {
    exps.iter().map(|alt| self.seq(&alt.items, owner)).collect()
  }

  /// A group contributes its alternatives, anything else a single one.
  fn operand(&mut self, expr: &Expr, owner: &Owner) -> Result<Vec<Vec<Sym>>, GrammarError> {
    match expr {
      Expr::Group(exps) => self.alts(exps, owner),
      _ => Ok(vec![self.item(expr, owner)?]),
    }
  }

  fn as_seq(&mut self, alts: Vec<Vec<Sym>>) -> Result<Vec<Sym>, GrammarError> {
    self.as_seq_with(Helper::Group, alts)
  }

  fn item(&mut self, expr: &Expr, owner: &Owner) -> Result<Vec<Sym>, GrammarError> {
    match expr {
      Expr::Symbol(name) => {
        if ast::is_terminal_name(&name.1) {
          let token = self.table.by_name(&name.1)
            .ok_or_else(|| GrammarError::UndefinedSymbol {
              name: name.1.clone(),
              span: Some(name.0),
            })?;
          Ok(vec![(Symbol::Token(token), name.1.starts_with('_') && !owner.keep)])
        } else {
          let nt = self.nt_names.get_by_right(&name.1)
            .copied()
            .ok_or_else(|| GrammarError::UndefinedSymbol {
              name: name.1.clone(),
              span: Some(name.0),
            })?;
          Ok(vec![(Symbol::Nonterminal(nt), false)])
        }
      }
      Expr::Literal(_) | Expr::Range(_) => {
        let pattern = self.compiler.expr(owner.name, owner.span, expr)?;
        let token = self.table.literals.get(&pattern)
          .copied()
          .ok_or_else(|| GrammarError::UndefinedSymbol {
            name: pattern.value().to_owned(),
            span: super::literal_span(expr),
          })?;
        Ok(vec![(Symbol::Token(token), pattern.is_string() && !owner.keep)])
      }
      Expr::Group(exps) => {
        let alts = self.alts(exps, owner)?;
        self.as_seq(alts)
      }
      Expr::Maybe(exps) => {
        let alts = self.alts(exps, owner)?;
        Ok(vec![self.helper(Helper::Maybe, alts)?])
      }
      Expr::Repeat(inner, op) => {
        let alts = self.operand(inner, owner)?;
        match op.1 {
          RepeatOp::Optional => Ok(vec![self.helper(Helper::Opt, alts)?]),
          RepeatOp::Many => Ok(vec![self.helper(Helper::Star, alts)?]),
          RepeatOp::Many1 => Ok(vec![self.helper(Helper::Plus, alts)?]),
          RepeatOp::Exactly(n) => {
            let seq = self.as_seq(alts)?;
            Ok(repeat(&seq, n))
          }
          RepeatOp::Between(n, m) => {
            let seq = self.as_seq(alts)?;
            if m - n + 1 > WIDE_RANGE {
              warn!(
                rule = owner.name,
                min = n,
                max = m,
                "wide repetition range expands into {} alternatives", m - n + 1);
            }
            let alts = (n..=m).map(|k| repeat(&seq, k)).collect::<Vec<_>>();
            self.as_seq_with(Helper::Rep, alts)
          }
        }
      }
      Expr::Template(name, _) => Err(GrammarError::UndefinedTemplate {
        name: name.1.clone(),
        span: name.0,
      }),
    }
  }

  fn as_seq_with(&mut self, helper: Helper, mut alts: Vec<Vec<Sym>>) -> Result<Vec<Sym>, GrammarError> {
    if alts.len() == 1 {
      Ok(alts.remove(0))
    } else {
      Ok(vec![self.helper(helper, alts)?])
    }
  }

  /// Returns the helper nonterminal for `alts`, creating it on first use.
  fn helper(&mut self, helper: Helper, alts: Vec<Vec<Sym>>) -> Result<Sym, GrammarError> {
    let key = content_key(helper, &alts);
    let mut hasher = FnvHasher::default();
    hasher.write(key.as_bytes());
    let name = format!("__{}_{:08x}", helper.tag(), hasher.finish() as u32);

    if let Some((existing, nt)) = self.helpers.get(&name) {
      if *existing != key {
        return Err(GrammarError::NameCollision { name, span: None });
      }
      return Ok((Symbol::Nonterminal(*nt), false));
    }

    if self.nt_names.contains_right(&name) {
      return Err(GrammarError::NameCollision { name, span: None });
    }

    let nt = self.id_gen.gen();
    self.nt_names.insert(nt, name.clone());
    self.nts.push(Nonterminal {
      name: name.clone(),
      range: 0..0,
      kind: helper.kind(),
      span: None,
    });
    self.helpers.insert(name, (key, nt));

    let this = (Symbol::Nonterminal(nt), false);
    let prods = match helper {
      Helper::Opt | Helper::Maybe => {
        let mut prods = alts;
        prods.push(vec![]);
        prods
      }
      Helper::Star => {
        let mut prods = vec![vec![]];
        for alt in alts {
          let mut prod = vec![this];
          prod.extend(alt);
          prods.push(prod);
        }
        prods
      }
      Helper::Plus => {
        let star = self.helper(Helper::Star, alts.clone())?;
        alts.into_iter()
          .map(|mut alt| {
            alt.push(star);
            alt
          })
          .collect()
      }
      Helper::Rep | Helper::Group => alts,
    };

    let start = self.prods.len();
    for syms in prods {
      self.push_prod(nt, syms, None, None);
    }
    self.nts[nt.index()].range = start..self.prods.len();

    Ok(this)
  }
}

fn repeat(seq: &[Sym], n: usize) -> Vec<Sym> {
  seq.iter().copied().cycle().take(seq.len() * n).collect()
}

fn content_key(helper: Helper, alts: &[Vec<Sym>]) -> String {
  let alts = alts.iter()
    .map(|alt| {
      alt.iter()
        .map(|(symbol, filtered)| {
          let mark = if *filtered { "!" } else { "" };
          match symbol {
            Symbol::Nonterminal(nt) => format!("n{}{}", nt.id(), mark),
            Symbol::Token(token) => format!("t{}{}", token.id(), mark),
          }
        })
        .collect::<Vec<_>>()
        .join(" ")
    })
    .collect::<Vec<_>>();

  format!("{}:{}", helper.tag(), alts.join("|"))
}

#[cfg(test)]
mod tests {
  use crate::{BuiltinModules, Grammar, NonterminalKind};
  use pretty_assertions::assert_eq;

  fn build(input: &str) -> Grammar {
    crate::build(input, &BuiltinModules).unwrap()
  }

  fn dump(grammar: &Grammar) -> Vec<String> {
    grammar.prods.iter().map(|prod| prod.to_string(grammar)).collect()
  }

  fn helper_kinds(grammar: &Grammar) -> Vec<NonterminalKind> {
    grammar.nts.iter().filter(|nt| nt.kind.is_helper()).map(|nt| nt.kind).collect()
  }

  #[test]
  fn star_and_plus() {
    let grammar = build("start: A* B+\nA: \"a\"\nB: \"b\"\n");
    let prods = dump(&grammar);

    assert_eq!(prods.len(), 6);
    assert_eq!(helper_kinds(&grammar), vec![NonterminalKind::Repetition; 3]);

    let star_a = &grammar.nts[1].name;
    assert!(star_a.starts_with("__star_"));
    assert_eq!(prods[0], format!("{} -> <empty>", star_a));
    assert_eq!(prods[1], format!("{} -> {} A", star_a, star_a));
    assert_eq!(prods[5], format!("start -> {} {}", star_a, grammar.nts[2].name));
  }

  #[test]
  fn identical_helpers_are_shared() {
    let grammar = build("start: a b\na: X?\nb: X? X?\nX: \"x\"\n");

    assert_eq!(helper_kinds(&grammar), vec![NonterminalKind::Optional]);
    assert_eq!(grammar.productions(grammar.nonterminal("b").unwrap())[0].symbols.len(), 2);
  }

  #[test]
  fn groups() {
    let grammar = build("start: (A B) (A | B)\nA: \"a\"\nB: \"b\"\n");
    let start = grammar.productions(grammar.nonterminal("start").unwrap());

    assert_eq!(start[0].symbols.len(), 3);
    assert_eq!(helper_kinds(&grammar), vec![NonterminalKind::Group]);
  }

  #[test]
  fn exact_and_ranged_repetition() {
    let grammar = build("four: W ~ 4\nsome: W ~ 1..3\nW: \"w\"\n");

    let four = grammar.productions(grammar.nonterminal("four").unwrap());
    assert_eq!(four.len(), 1);
    assert_eq!(four[0].symbols.len(), 4);

    let rep = grammar.nts.iter().find(|nt| nt.name.starts_with("__rep_")).unwrap();
    let lens = grammar.prods[rep.range.clone()].iter()
      .map(|prod| prod.symbols.len())
      .collect::<Vec<_>>();
    assert_eq!(lens, vec![1, 2, 3]);
  }

  #[test]
  fn filtering() {
    let grammar = build(r#"
start: "(" _SEP NAME /x/ ")"
!kept: "(" _SEP
NAME: /[a-z]+/
_SEP: ";"
"#);

    let start = &grammar.productions(grammar.nonterminal("start").unwrap())[0];
    assert_eq!(
      start.filtered.iter().by_vals().collect::<Vec<_>>(),
      vec![true, true, false, false, true]);

    let kept = &grammar.productions(grammar.nonterminal("kept").unwrap())[0];
    assert!(kept.filtered.not_any());
  }

  #[test]
  fn maybe_keeps_empty_alternative_last() {
    let grammar = build("start: [A B]\nA: \"a\"\nB: \"b\"\n");
    let maybe = grammar.nts.iter().find(|nt| nt.kind == NonterminalKind::Maybe).unwrap();
    let lens = grammar.prods[maybe.range.clone()].iter()
      .map(|prod| prod.symbols.len())
      .collect::<Vec<_>>();

    assert_eq!(lens, vec![2, 0]);
  }
}
