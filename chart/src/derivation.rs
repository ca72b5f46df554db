//! Picks one derivation out of a recognized chart.
//!
//! A derivation scores the sum of the rule priorities it uses. Every
//! nonterminal span and every production prefix keeps its best choice:
//! the highest score, then the earlier alternative, then the split point
//! furthest right, so earlier children take the longest span. A span already
//! being solved is treated as underivable, which cuts cycles such as
//! `a: a | B`.
//!
//! Both passes run on explicit stacks, so long left-recursive lists cost heap
//! rather than call depth. Choices are memoized, and values are built once
//! from the final choices.

use grammar::{Grammar, HashMap, HashSet, NonterminalId, Symbol, TreeBuilder, Value};
use crate::earley::{Chart, Item};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Key {
  /// Nonterminal over `start..end`.
  Nt(NonterminalId, usize, usize),
  /// The first `dot` symbols of a production over `start..end`.
  Prefix {
    prod: usize,
    dot: usize,
    start: usize,
    end: usize,
  },
}

#[derive(Debug, Clone, Copy)]
struct Choice {
  score: i64,
  /// The production for a nonterminal, the split point for a prefix ending
  /// in a nonterminal.
  pick: usize,
}

struct Alternative {
  pick: usize,
  bonus: i64,
  parts: Vec<Key>,
}

#[derive(Debug, Clone, Copy)]
enum Part {
  Token(usize),
  Nt(NonterminalId, usize, usize),
}

struct Frame {
  prod: usize,
  parts: std::vec::IntoIter<Part>,
  values: Vec<Value>,
}

pub struct Extractor<'a> {
  grammar: &'a Grammar,
  chart: &'a Chart,
  tree: &'a TreeBuilder,
  memo: HashMap<Key, Option<Choice>>,
}

impl<'a> Extractor<'a> {
  pub fn new(grammar: &'a Grammar, chart: &'a Chart, tree: &'a TreeBuilder) -> Self {
    Self {
      grammar,
      chart,
      tree,
      memo: HashMap::default(),
    }
  }

  pub fn value(&mut self, nt: NonterminalId, start: usize, end: usize) -> Option<Value> {
    let root = Key::Nt(nt, start, end);
    self.solve(root)?;
    self.build(nt, start, end)
  }

  /// Fills the memo for `root` and everything it depends on, depth first.
  fn solve(&mut self, root: Key) -> Option<Choice> {
    let mut stack = vec![root];
    let mut active = HashSet::default();

    while let Some(&key) = stack.last() {
      if self.memo.contains_key(&key) {
        stack.pop();
        continue;
      }

      let alternatives = self.alternatives(key);

      if active.insert(key) {
        let pending = alternatives.iter()
          .flat_map(|alt| alt.parts.iter().copied())
          .filter(|part| !self.memo.contains_key(part) && !active.contains(part))
          .collect::<Vec<_>>();
        if !pending.is_empty() {
          stack.extend(pending.into_iter().rev());
          continue;
        }
      }

      let choice = self.choose(&alternatives);
      active.remove(&key);
      self.memo.insert(key, choice);
      stack.pop();
    }

    self.memo.get(&root).copied().flatten()
  }

  /// Best alternative whose parts are all derivable. Ties keep the first.
  fn choose(&self, alternatives: &[Alternative]) -> Option<Choice> {
    let mut best: Option<Choice> = None;

    'alts: for alt in alternatives {
      let mut score = alt.bonus;
      for part in &alt.parts {
        match self.memo.get(part) {
          Some(Some(choice)) => score += choice.score,
          _ => continue 'alts,
        }
      }

      if best.map_or(true, |best| score > best.score) {
        best = Some(Choice {
          score,
          pick: alt.pick,
        });
      }
    }

    best
  }

  fn alternatives(&self, key: Key) -> Vec<Alternative> {
    match key {
      Key::Nt(nt, start, end) => {
        let mut prods = self.chart.completed[end].get(&(nt, start))
          .cloned()
          .unwrap_or_default();
        prods.sort_unstable();
        prods.dedup();

        prods.into_iter()
          .map(|prod| {
            let production = &self.grammar.prods[prod];
            Alternative {
              pick: prod,
              bonus: i64::from(production.priority.unwrap_or(0)),
              parts: vec![Key::Prefix {
                prod,
                dot: production.symbols.len(),
                start,
                end,
              }],
            }
          })
          .collect()
      }
      Key::Prefix { dot: 0, start, end, .. } => {
        if start == end {
          vec![Alternative {
            pick: 0,
            bonus: 0,
            parts: vec![],
          }]
        } else {
          vec![]
        }
      }
      Key::Prefix { prod, dot, start, end } => {
        let prefix = Item {
          prod,
          dot: dot - 1,
          origin: start,
        };

        match self.grammar.prods[prod].symbols[dot - 1] {
          Symbol::Token(kind) => {
            let scanned = end > start
              && self.chart.sets[end - 1].contains(&prefix)
              && self.chart.tokens[end - 1].kind == kind;
            if !scanned {
              return vec![];
            }

            vec![Alternative {
              pick: end - 1,
              bonus: 0,
              parts: vec![Key::Prefix {
                prod,
                dot: dot - 1,
                start,
                end: end - 1,
              }],
            }]
          }
          Symbol::Nonterminal(nt) => (start..=end).rev()
            .filter(|&mid| {
              self.chart.sets[mid].contains(&prefix)
                && self.chart.completed[end].contains_key(&(nt, mid))
            })
            .map(|mid| Alternative {
              pick: mid,
              bonus: 0,
              parts: vec![
                Key::Nt(nt, mid, end),
                Key::Prefix {
                  prod,
                  dot: dot - 1,
                  start,
                  end: mid,
                },
              ],
            })
            .collect(),
        }
      }
    }
  }

  /// Children of the chosen production of `nt` over `start..end`.
  fn frame(&self, nt: NonterminalId, start: usize, end: usize) -> Option<Frame> {
    let prod = (*self.memo.get(&Key::Nt(nt, start, end))?)?.pick;
    let symbols = &self.grammar.prods[prod].symbols;

    let mut parts = Vec::with_capacity(symbols.len());
    let mut end = end;
    for dot in (1..=symbols.len()).rev() {
      match symbols[dot - 1] {
        Symbol::Token(_) => {
          parts.push(Part::Token(end - 1));
          end -= 1;
        }
        Symbol::Nonterminal(child) => {
          let key = Key::Prefix {
            prod,
            dot,
            start,
            end,
          };
          let mid = (*self.memo.get(&key)?)?.pick;
          parts.push(Part::Nt(child, mid, end));
          end = mid;
        }
      }
    }
    parts.reverse();

    Some(Frame {
      prod,
      parts: parts.into_iter(),
      values: Vec::with_capacity(symbols.len()),
    })
  }

  fn build(&self, nt: NonterminalId, start: usize, end: usize) -> Option<Value> {
    let mut stack = vec![self.frame(nt, start, end)?];

    loop {
      let top = stack.last_mut()?;
      match top.parts.next() {
        Some(Part::Token(i)) => top.values.push(Value::Leaf(self.chart.tokens[i].clone())),
        Some(Part::Nt(child, start, end)) => {
          let frame = self.frame(child, start, end)?;
          stack.push(frame);
        }
        None => {
          let frame = stack.pop()?;
          let value = self.tree.reduce(frame.prod, frame.values);
          match stack.last_mut() {
            Some(parent) => parent.values.push(value),
            None => return Some(value),
          }
        }
      }
    }
  }
}
