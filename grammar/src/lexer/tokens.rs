use super::{Cursor, Lexer, Token};
use crate::ParseError;

/// Standard-mode token stream. Ignored terminals are skipped; iteration
/// ends after the first error.
pub struct Tokens<'lexer, 'input> {
  lexer: &'lexer Lexer,
  input: &'input str,
  cursor: Cursor,
  done: bool,
}

impl<'lexer, 'input> Tokens<'lexer, 'input> {
  pub(super) fn new(lexer: &'lexer Lexer, input: &'input str) -> Self {
    Self {
      lexer,
      input,
      cursor: Cursor::default(),
      done: false,
    }
  }

  /// Position of the next token to scan.
  pub fn cursor(&self) -> Cursor {
    self.cursor
  }

  /// Like `next`, also collecting the ignored tokens skipped on the way.
  pub fn next_with_ignored(
    &mut self,
    ignored: &mut Vec<Token>,
  ) -> Option<Result<Token, ParseError>> {
    self.scan(Some(ignored))
  }

  fn scan(&mut self, ignored: Option<&mut Vec<Token>>) -> Option<Result<Token, ParseError>> {
    if self.done {
      return None;
    }

    match self.lexer.next_token(self.input, &mut self.cursor, None, ignored) {
      Ok(Some(token)) => Some(Ok(token)),
      Ok(None) => {
        self.done = true;
        None
      }
      Err(err) => {
        self.done = true;
        Some(Err(err))
      }
    }
  }
}

impl<'lexer, 'input> Iterator for Tokens<'lexer, 'input> {
  type Item = Result<Token, ParseError>;

  fn next(&mut self) -> Option<Self::Item> {
    self.scan(None)
  }
}
