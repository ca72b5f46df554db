use std::collections::VecDeque;
use grammar::{HashMap, Map, NonterminalId, Symbol, TokenSet};
use crate::augment::Augmented;
use crate::first::First;
use super::{Builder, Item, State, encode_item, decode_item};

/// Builds the LALR(1) item sets reachable from the accept production.
/// State 0 is the start state.
pub fn gen_states(builder: &mut Builder) {
  let aug = builder.aug;
  let start_item_set = vec![
    Item {
      key: encode_item(builder.max_nsym_p1, aug.accept_prod(), 0),
      lookaheads: TokenSet::from_token(aug.num_tokens(), aug.eof),
    }
  ];

  let (start_state, _) = crate::lalr::store_state(&mut builder.states, start_item_set);

  let mut queue = VecDeque::new();
  queue.push_back(start_state);

  while let Some(state_ix) = queue.pop_front() {
    let state = &mut builder.states[state_ix as usize];
    compute_closure(aug, &builder.first, builder.max_nsym_p1, state);

    let transitions = compute_transitions(aug, builder.max_nsym_p1, state);
    for (sym, mut kernel_item_set) in transitions {
      kernel_item_set.sort_by_key(|item| item.key);

      let (next_state, changed) = crate::lalr::store_state(&mut builder.states, kernel_item_set);
      if changed {
        queue.push_back(next_state);
      }
      builder.states[state_ix as usize].transitions.insert(sym, next_state);
    }
  }
}

fn compute_closure(
  aug: &Augmented,
  first: &First,
  max_nsym_p1: usize,
  state: &mut State,
) {
  let items = &mut state.items;
  // nt -> start index of its items
  let mut nt_starts = HashMap::<NonterminalId, usize>::default();
  let mut lookaheads = TokenSet::new(aug.num_tokens());

  for (i, item) in items.iter().enumerate() {
    if let (prod, 0) = decode_item(max_nsym_p1, item.key) {
      if let Some(prod) = aug.grammar.prods.get(prod) {
        nt_starts.entry(prod.nt).or_insert(i);
      }
    }
  }

  let mut i = 0;
  while i < items.len() {
    let (prod, dot) = decode_item(max_nsym_p1, items[i].key);
    let symbols = aug.symbols(prod);

    let nt = match symbols.get(dot) {
      Some(&Symbol::Nonterminal(nt)) => nt,
      _ => {
        i += 1;
        continue;
      }
    };

    lookaheads.clear();
    first.symbols_first(&mut lookaheads, &symbols[dot + 1..], &items[i].lookaheads);

    let range = aug.range(nt);
    if let Some(&nt_start) = nt_starts.get(&nt) {
      let mut changed = false;
      for item in &mut items[nt_start..nt_start + range.len()] {
        changed |= item.lookaheads.union_with(&lookaheads);
      }

      if changed && i > nt_start {
        i = nt_start;
      } else if !changed {
        i += 1;
      }
    } else {
      nt_starts.insert(nt, items.len());

      for prod_ix in range {
        items.push(Item {
          key: encode_item(max_nsym_p1, prod_ix, 0),
          lookaheads: lookaheads.clone(),
        });
      }

      i += 1;
    }
  }
}

fn compute_transitions(
  aug: &Augmented,
  max_nsym_p1: usize,
  state: &State,
) -> Map<Symbol, Vec<Item>> {
  let mut transitions = Map::<_, Vec<Item>>::default();

  for item in &state.items {
    let (prod, dot) = decode_item(max_nsym_p1, item.key);
    let symbols = aug.symbols(prod);
    if dot == symbols.len() {
      continue;
    }

    transitions.entry(symbols[dot])
      .or_default()
      .push(Item {
        key: encode_item(max_nsym_p1, prod, dot + 1),
        lookaheads: item.lookaheads.clone(),
      });
  }

  transitions
}
