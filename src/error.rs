use thiserror::Error;
use grammar::GrammarError;
use lr::ConflictError;

#[derive(Debug, Error)]
pub enum CompileError {
  #[error(transparent)]
  Grammar(#[from] GrammarError),

  #[error(transparent)]
  Conflict(#[from] ConflictError),

  #[error("unknown start rule `{name}`")]
  UnknownStartRule {
    name: String,
  },

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),
}
