use grammar::{Symbol, TokenSet};
use tracing::warn;
use crate::{ConflictError, ConflictKind};
use super::{Builder, decode_item};

pub const ACCEPT: i32 = i32::MIN;

/// ACTION and GOTO tables.
///
/// entry in `action[state][token]`:
/// - positive: shift (shift state is never zero, since the starting state is state 0)
/// - negative: reduce (- reduce production - 1)
/// - `ACCEPT`: accept
/// - zero: error
///
/// entry in `goto[nt][state]`:
/// - positive: goto
/// - zero: error
#[derive(Debug, Clone)]
pub struct Tables {
  pub action: Vec<Vec<i32>>,
  pub goto: Vec<Vec<u32>>,
}

#[derive(Default)]
struct Candidates {
  shift: Option<(u32, i32)>,
  reduce: Vec<usize>,
}

pub fn gen_tables(builder: &Builder) -> Result<Tables, ConflictError> {
  let aug = builder.aug;
  let num_states = builder.states.len();
  let mut action = vec![vec![0i32; aug.num_tokens()]; num_states];
  let mut goto = vec![vec![0u32; num_states]; aug.grammar.nts.len()];

  for (from_state, (_, state)) in builder.states.iter().enumerate() {
    let mut row = (0..aug.num_tokens()).map(|_| Candidates::default()).collect::<Vec<_>>();

    for item in &state.items {
      let (prod, dot) = decode_item(builder.max_nsym_p1, item.key);
      let symbols = aug.symbols(prod);

      match symbols.get(dot) {
        Some(sym) => {
          let to_state = state.transitions[sym];
          match sym {
            Symbol::Token(token) => {
              let priority = aug.priority(prod);
              let shift = &mut row[token.index()].shift;
              *shift = Some(match *shift {
                Some((_, old)) => (to_state, old.max(priority)),
                None => (to_state, priority),
              });
            }
            Symbol::Nonterminal(nt) => goto[nt.index()][from_state] = to_state,
          }
        }
        None => {
          for lookahead in item.lookaheads.iter() {
            row[lookahead].reduce.push(prod);
          }
        }
      }
    }

    for (token, candidates) in row.into_iter().enumerate() {
      action[from_state][token] = resolve(builder, from_state, token, candidates)?;
    }
  }

  Ok(Tables {
    action,
    goto,
  })
}

fn resolve(
  builder: &Builder,
  state: usize,
  token: usize,
  candidates: Candidates,
) -> Result<i32, ConflictError> {
  let aug = builder.aug;
  let Candidates { shift, mut reduce } = candidates;

  let reduce = match reduce.len() {
    0 => None,
    1 => reduce.pop(),
    _ => {
      reduce.sort_by_key(|&prod| (-aug.priority(prod), prod));
      if aug.priority(reduce[0]) == aug.priority(reduce[1]) {
        return Err(conflict(builder, ConflictKind::ReduceReduce, state, token, &reduce[..2]));
      }
      warn!(
        state,
        lookahead = aug.token_name(token),
        "reduce/reduce conflict resolved by priority");
      Some(reduce[0])
    }
  };

  let encode = |prod: usize| if prod == aug.accept_prod() {
    ACCEPT
  } else {
    -(prod as i32 + 1)
  };

  Ok(match (shift, reduce) {
    (None, None) => 0,
    (Some((to_state, _)), None) => to_state as i32,
    (None, Some(prod)) => encode(prod),
    (Some((to_state, shift_priority)), Some(prod)) => {
      let reduce_priority = aug.priority(prod);
      if shift_priority == reduce_priority {
        return Err(conflict(builder, ConflictKind::ShiftReduce, state, token, &[prod]));
      }

      warn!(
        state,
        lookahead = aug.token_name(token),
        "shift/reduce conflict resolved by priority");
      if shift_priority > reduce_priority {
        to_state as i32
      } else {
        encode(prod)
      }
    }
  })
}

fn conflict(
  builder: &Builder,
  kind: ConflictKind,
  state: usize,
  token: usize,
  prods: &[usize],
) -> ConflictError {
  ConflictError {
    kind,
    state,
    lookahead: builder.aug.token_name(token).to_owned(),
    state_items: builder.state_items(state),
    productions: prods.iter().map(|&prod| builder.aug.fmt_prod(prod, None)).collect(),
  }
}

/// Tokens with a non-error action in each state.
pub fn expected_sets(tables: &Tables) -> Vec<TokenSet> {
  tables.action.iter()
    .map(|row| {
      let mut set = TokenSet::new(row.len());
      for (token, &action) in row.iter().enumerate() {
        if action != 0 {
          set.insert(token);
        }
      }
      set
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::augment::Augmented;
  use crate::builder::gen_states;
  use grammar::BuiltinModules;
  use pretty_assertions::assert_eq;

  fn tables(input: &str) -> Result<Tables, ConflictError> {
    let grammar = grammar::build(input, &BuiltinModules).unwrap();
    let start = grammar.nonterminal("start").unwrap();
    let aug = Augmented::new(&grammar, start);
    let mut builder = Builder::new(&aug);
    gen_states(&mut builder);
    gen_tables(&builder)
  }

  #[test]
  fn simple_action_goto() {
    let tables = tables("start: c c\nc: C c\n  | D\nC: \"c\"\nD: \"d\"\n").unwrap();

    // tokens: C D $END
    assert_eq!(tables.action, vec![
      vec![3, 4, 0],
      vec![0, 0, ACCEPT],
      vec![3, 4, 0],
      vec![3, 4, 0],
      vec![-3, -3, -3],
      vec![0, 0, -1],
      vec![-2, -2, -2],
    ]);
    // nts: start c
    assert_eq!(tables.goto, vec![
      vec![1, 0, 0, 0, 0, 0, 0],
      vec![2, 0, 5, 6, 0, 0, 0],
    ]);
  }

  #[test]
  fn shift_reduce_conflict() {
    let err = tables("start: start \"+\" start\n  | A\nA: \"a\"\n").unwrap_err();

    assert_eq!(err.kind, ConflictKind::ShiftReduce);
    assert_eq!(err.lookahead, "PLUS");
    assert_eq!(err.productions, vec!["start -> start PLUS start"]);
  }

  #[test]
  fn reduce_reduce_conflict() {
    let err = tables("start: a | b\na: A\nb: A\nA: \"a\"\n").unwrap_err();

    assert_eq!(err.kind, ConflictKind::ReduceReduce);
    assert_eq!(err.lookahead, "$END");
    assert_eq!(err.productions, vec!["a -> A", "b -> A"]);
  }

  #[test]
  fn priority_breaks_ties() {
    assert!(tables("start: a | b\na.2: A\nb: A\nA: \"a\"\n").is_ok());
  }
}
