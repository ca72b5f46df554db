use grammar::LexerMode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Algorithm {
  /// Earley parsing. Accepts any context-free grammar.
  #[default]
  Chart,
  /// LALR(1) tables. Conflicts are compile errors.
  Deterministic,
}

/// Compilation options.
///
/// ```
/// use sprig::{Algorithm, Config};
///
/// let config = Config::default()
///   .with_start("expr")
///   .with_algorithm(Algorithm::Deterministic);
/// assert_eq!(config.start, "expr");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Config {
  pub start: String,
  pub algorithm: Algorithm,
  /// `None` picks contextual lexing for the deterministic algorithm and
  /// standard lexing for the chart.
  pub lexer: Option<LexerMode>,
  /// `[x]` yields an absent child when `x` is not matched.
  pub maybe_placeholders: bool,
  /// Filtered and ignored tokens stay in the tree.
  pub keep_all_tokens: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      start: "start".to_owned(),
      algorithm: Algorithm::default(),
      lexer: None,
      maybe_placeholders: false,
      keep_all_tokens: false,
    }
  }
}

impl Config {
  pub fn with_start(mut self, start: impl Into<String>) -> Self {
    self.start = start.into();
    self
  }

  pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
    self.algorithm = algorithm;
    self
  }

  pub fn with_lexer(mut self, lexer: LexerMode) -> Self {
    self.lexer = Some(lexer);
    self
  }

  pub fn with_maybe_placeholders(mut self, maybe_placeholders: bool) -> Self {
    self.maybe_placeholders = maybe_placeholders;
    self
  }

  pub fn with_keep_all_tokens(mut self, keep_all_tokens: bool) -> Self {
    self.keep_all_tokens = keep_all_tokens;
    self
  }

  pub fn lexer_mode(&self) -> LexerMode {
    match (self.lexer, self.algorithm) {
      (Some(mode), _) => mode,
      (None, Algorithm::Deterministic) => LexerMode::Contextual,
      (None, Algorithm::Chart) => LexerMode::Standard,
    }
  }

  pub(crate) fn validate(&self) -> Result<(), String> {
    if self.algorithm == Algorithm::Deterministic && self.lexer == Some(LexerMode::Standard) {
      return Err("the deterministic algorithm requires the contextual lexer".to_owned());
    }
    Ok(())
  }
}
