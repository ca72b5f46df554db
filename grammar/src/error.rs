use thiserror::Error;
use crate::lexer::Token;

/// Byte range `(start, end)` in the grammar text.
pub type Span = (usize, usize);

/// Errors raised while compiling a grammar. None of them is recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
  #[error("syntax error: {message}")]
  Parse {
    message: String,
    span: Span,
  },

  #[error("undefined template `{name}`")]
  UndefinedTemplate {
    name: String,
    span: Span,
  },

  #[error("template `{name}` expects {expected} argument(s), found {found}")]
  ArityMismatch {
    name: String,
    expected: usize,
    found: usize,
    span: Span,
  },

  #[error("template `{name}` instantiates itself")]
  TemplateRecursion {
    name: String,
    span: Span,
  },

  #[error("`{name}` is defined more than once")]
  NameCollision {
    name: String,
    span: Option<Span>,
  },

  #[error("terminal `{name}` joins patterns with conflicting flags")]
  IncompatibleFlags {
    name: String,
    span: Option<Span>,
  },

  #[error("terminal `{name}` refers to itself: {}", .path.join(" -> "))]
  TerminalRecursion {
    name: String,
    path: Vec<String>,
    span: Option<Span>,
  },

  #[error("terminal `{name}` can match the empty string")]
  ZeroWidthTerminal {
    name: String,
    span: Option<Span>,
  },

  #[error("terminal `{name}` has an invalid pattern: {message}")]
  InvalidPattern {
    name: String,
    message: String,
    span: Option<Span>,
  },

  #[error("undefined symbol `{name}`")]
  UndefinedSymbol {
    name: String,
    span: Option<Span>,
  },

  #[error("cannot import `{module}`: {message}")]
  UnresolvedImport {
    module: String,
    message: String,
    span: Span,
  },
}

impl GrammarError {
  pub fn span(&self) -> Option<Span> {
    match self {
      Self::Parse { span, .. }
      | Self::UndefinedTemplate { span, .. }
      | Self::ArityMismatch { span, .. }
      | Self::TemplateRecursion { span, .. }
      | Self::UnresolvedImport { span, .. } => Some(*span),
      Self::NameCollision { span, .. }
      | Self::IncompatibleFlags { span, .. }
      | Self::TerminalRecursion { span, .. }
      | Self::ZeroWidthTerminal { span, .. }
      | Self::InvalidPattern { span, .. }
      | Self::UndefinedSymbol { span, .. } => *span,
    }
  }

  pub(crate) fn parse(message: impl Into<String>, span: Span) -> Self {
    Self::Parse {
      message: message.into(),
      span,
    }
  }
}

/// Errors raised by a single parse. The compiled parser stays usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
  #[error("no terminal matches the input at line {line}, column {column}")]
  NoMatchingTerminal {
    position: usize,
    line: usize,
    column: usize,
    expected: Vec<String>,
  },

  #[error("terminal `{terminal}` matched no input at line {line}, column {column}")]
  LexerExhaustion {
    terminal: String,
    position: usize,
    line: usize,
    column: usize,
  },

  #[error(
    "unexpected token {} {:?} at line {}, column {}; expected one of: {}",
    .token.terminal, .token.text, .token.line, .token.column, .expected.join(", ")
  )]
  UnexpectedToken {
    token: Token,
    expected: Vec<String>,
  },

  #[error("unexpected end of input; expected one of: {}", .expected.join(", "))]
  UnexpectedEndOfInput {
    position: usize,
    expected: Vec<String>,
  },

  #[error("no derivation covers the input (stopped at line {line}, column {column})")]
  NoParseFound {
    position: usize,
    line: usize,
    column: usize,
    expected: Vec<String>,
  },
}

impl ParseError {
  /// Byte offset of the failure in the input.
  pub fn position(&self) -> usize {
    match self {
      Self::NoMatchingTerminal { position, .. }
      | Self::LexerExhaustion { position, .. }
      | Self::UnexpectedEndOfInput { position, .. }
      | Self::NoParseFound { position, .. } => *position,
      Self::UnexpectedToken { token, .. } => token.start,
    }
  }

  pub fn expected(&self) -> &[String] {
    match self {
      Self::NoMatchingTerminal { expected, .. }
      | Self::UnexpectedToken { expected, .. }
      | Self::UnexpectedEndOfInput { expected, .. }
      | Self::NoParseFound { expected, .. } => expected,
      Self::LexerExhaustion { .. } => &[],
    }
  }
}
