use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
  ShiftReduce,
  ReduceReduce,
}

/// Two actions of equal priority for the same state and lookahead.
#[derive(Debug, Clone, Error)]
pub struct ConflictError {
  pub kind: ConflictKind,
  pub state: usize,
  pub lookahead: String,
  pub state_items: Vec<String>,
  /// The reducing productions; one for a shift-reduce conflict.
  pub productions: Vec<String>,
}

impl fmt::Display for ConflictError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write_conflict(f, self)
  }
}

fn write_conflict(buf: &mut impl fmt::Write, err: &ConflictError) -> fmt::Result {
  let kind = match err.kind {
    ConflictKind::ShiftReduce => "shift-reduce",
    ConflictKind::ReduceReduce => "reduce-reduce",
  };
  writeln!(buf, "{} conflict at state {}:\n", kind, err.state)?;

  for item in &err.state_items {
    writeln!(buf, "  {}", item)?;
  }

  match err.kind {
    ConflictKind::ShiftReduce => write!(buf,
      "\nwhich can shift {}\nor reduce by:\n\n  {}",
      err.lookahead,
      err.productions.join("\n  "),
    ),
    ConflictKind::ReduceReduce => write!(buf,
      "\nwhich can be reduced by:\n\n  {}\n\nwhen the lookahead is {}",
      err.productions.join("\n\nor:\n\n  "),
      err.lookahead,
    ),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use insta::assert_snapshot;

  #[test]
  fn reduce_reduce() {
    let err = ConflictError {
      kind: ConflictKind::ReduceReduce,
      state: 3,
      lookahead: "$END".to_owned(),
      state_items: vec!["a -> A .  [$END]".to_owned(), "b -> A .  [$END]".to_owned()],
      productions: vec!["a -> A".to_owned(), "b -> A".to_owned()],
    };

    assert_snapshot!(err.to_string(), @r###"
    reduce-reduce conflict at state 3:

      a -> A .  [$END]
      b -> A .  [$END]

    which can be reduced by:

      a -> A

    or:

      b -> A

    when the lookahead is $END
    "###);
  }
}
