use bitvec::prelude::*;
use grammar::{
  Cursor, Grammar, HashMap, LexerMode, NonterminalId, ParseError, Set, Symbol, Token, TokenSet,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Item {
  pub prod: usize,
  pub dot: usize,
  pub origin: usize,
}

/// Result of recognition: one item set per position between tokens.
pub struct Chart {
  pub sets: Vec<Set<Item>>,
  /// Per end position, the productions completed from each origin, in
  /// completion order.
  pub completed: Vec<HashMap<(NonterminalId, usize), Vec<usize>>>,
  pub tokens: Vec<Token>,
  pub ignored: Vec<Token>,
}

pub struct Recognizer<'g> {
  grammar: &'g Grammar,
  nullable: &'g BitVec,
  mode: LexerMode,
  keep_ignored: bool,
}

impl<'g> Recognizer<'g> {
  pub fn new(grammar: &'g Grammar, nullable: &'g BitVec, mode: LexerMode, keep_ignored: bool) -> Self {
    Self {
      grammar,
      nullable,
      mode,
      keep_ignored,
    }
  }

  pub fn recognize(&self, start: NonterminalId, input: &str) -> Result<Chart, ParseError> {
    let mut chart = Chart {
      sets: vec![Set::default()],
      completed: vec![HashMap::default()],
      tokens: vec![],
      ignored: vec![],
    };

    let mut standard = match self.mode {
      LexerMode::Standard => Some(self.grammar.lexer.tokens(input)),
      LexerMode::Contextual => None,
    };
    let mut cursor = Cursor::default();

    for prod in self.grammar.nts[start.index()].range.clone() {
      chart.sets[0].insert(Item {
        prod,
        dot: 0,
        origin: 0,
      });
    }

    let mut i = 0;
    loop {
      self.process(&mut chart, i);

      let token = match &mut standard {
        Some(tokens) => {
          let next = if self.keep_ignored {
            tokens.next_with_ignored(&mut chart.ignored)
          } else {
            tokens.next()
          };
          next.transpose()?
        }
        None => {
          let admissible = self.expected(&chart.sets[i]);
          let ignored = if self.keep_ignored { Some(&mut chart.ignored) } else { None };
          match self.grammar.lexer.next_token(input, &mut cursor, Some(&admissible), ignored) {
            Ok(token) => token,
            Err(_) => {
              return Err(self.no_parse(&chart.sets[i], cursor.pos, cursor.line, cursor.column));
            }
          }
        }
      };

      let token = match token {
        Some(token) => token,
        None => break,
      };

      let next = self.scan(&chart.sets[i], &token);
      if next.is_empty() {
        return Err(self.no_parse(&chart.sets[i], token.start, token.line, token.column));
      }

      chart.sets.push(next);
      chart.completed.push(HashMap::default());
      chart.tokens.push(token);
      i += 1;
    }

    let accepted = chart.completed[i].contains_key(&(start, 0));
    if !accepted {
      let end = match &standard {
        Some(tokens) => tokens.cursor(),
        None => cursor,
      };
      return Err(self.no_parse(&chart.sets[i], end.pos, end.line, end.column));
    }

    Ok(chart)
  }

  /// Predicts and completes set `i` to a fixpoint.
  fn process(&self, chart: &mut Chart, i: usize) {
    let mut j = 0;
    while j < chart.sets[i].len() {
      let item = chart.sets[i][j];
      let prod = &self.grammar.prods[item.prod];

      match prod.symbols.get(item.dot) {
        Some(&Symbol::Nonterminal(nt)) => {
          for prod in self.grammar.nts[nt.index()].range.clone() {
            chart.sets[i].insert(Item {
              prod,
              dot: 0,
              origin: i,
            });
          }
          if self.nullable[nt.index()] {
            chart.sets[i].insert(Item {
              dot: item.dot + 1,
              ..item
            });
          }
        }
        Some(Symbol::Token(_)) => {}
        None => {
          chart.completed[i].entry((prod.nt, item.origin)).or_default().push(item.prod);

          let parents = chart.sets[item.origin].iter()
            .filter(|parent| {
              self.grammar.prods[parent.prod].symbols.get(parent.dot)
                == Some(&Symbol::Nonterminal(prod.nt))
            })
            .copied()
            .collect::<Vec<_>>();

          for parent in parents {
            chart.sets[i].insert(Item {
              dot: parent.dot + 1,
              ..parent
            });
          }
        }
      }

      j += 1;
    }
  }

  fn scan(&self, set: &Set<Item>, token: &Token) -> Set<Item> {
    set.iter()
      .filter(|item| {
        self.grammar.prods[item.prod].symbols.get(item.dot) == Some(&Symbol::Token(token.kind))
      })
      .map(|item| Item {
        dot: item.dot + 1,
        ..*item
      })
      .collect()
  }

  /// Terminals the items of `set` can scan next.
  fn expected(&self, set: &Set<Item>) -> TokenSet {
    let mut expected = TokenSet::new(self.grammar.terminals.len());
    for item in set {
      if let Some(Symbol::Token(token)) = self.grammar.prods[item.prod].symbols.get(item.dot) {
        expected.insert(token.index());
      }
    }
    expected
  }

  fn no_parse(&self, set: &Set<Item>, position: usize, line: usize, column: usize) -> ParseError {
    ParseError::NoParseFound {
      position,
      line,
      column,
      expected: self.grammar.lexer.names_of(&self.expected(set)),
    }
  }
}
