use std::collections::VecDeque;
use std::str::CharIndices;
use std::iter::Peekable;
use std::fmt::Display;
use std::fmt;

pub type Spanned<Tok, Loc, Error> = Result<(Loc, Tok, Loc), Error>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
  RuleName,
  TermName,
  String,
  Regex,
  Number,

  Percent,
  Colon,
  Or,
  LParen,
  RParen,
  LBracket,
  RBracket,
  LBrace,
  RBrace,
  Comma,
  Dot,
  DotDot,
  Tilde,
  QuestionMark,
  Asterisk,
  Plus,
  Bang,
  Arrow,

  Newline,
}

#[derive(Clone, Debug)]
pub struct Token<'a> {
  pub kind: TokenKind,
  pub text: &'a str
}

#[derive(Debug)]
pub struct LexError {
  pub kind: LexErrorKind,
  pub span: (usize, usize),
}

#[derive(Debug, Clone, Copy)]
pub enum LexErrorKind {
  UnclosedRegex,
  UnclosedString,
  InvalidChar,
}

pub struct Lexer<'a> {
  input: &'a str,
  chars: Peekable<CharIndices<'a>>,
  buffer: VecDeque<<Self as Iterator>::Item>,
  last_newline: bool,
}

impl<'a> Lexer<'a> {
  pub fn new(input: &'a str) -> Self {
    Self {
      input,
      chars: input.char_indices().peekable(),
      buffer: VecDeque::new(),
      // leading blank lines produce no Newline token
      last_newline: true,
    }
  }

  fn advance(&mut self) -> Option<(usize, char)> {
    self.chars.next()
  }

  fn peek_char(&mut self) -> Option<char> {
    self.chars.peek().map(|&(_, c)| c)
  }

  fn gen_token(&mut self, kind: TokenKind, start: usize, end: usize) {
    self.last_newline = kind == TokenKind::Newline;
    let token = Token {
      kind,
      text: &self.input[start..end],
    };
    self.buffer.push_back(Ok((start, token, end)));
  }

  fn gen_error(&mut self, kind: LexErrorKind, start: usize, end: usize) {
    let error = LexError {
      kind,
      span: (start, end),
    };
    self.buffer.push_back(Err(error));
  }

  fn single_char_token(&mut self, kind: TokenKind, index: usize) {
    self.gen_token(kind, index, index + 1);
  }

  /// Lexes a `"..."` or `/.../` literal whose opening delimiter starts at
  /// `start`, followed by flag letters accepted by `is_flag`.
  fn lex_quoted(
    &mut self,
    start: usize,
    quote: char,
    kind: TokenKind,
    unclosed_err_kind: LexErrorKind,
    is_flag: fn(char) -> bool,
  ) {
    let mut escaped = false;
    loop {
      match self.advance() {
        Some((_, '\\')) if !escaped => {
          escaped = true;
        }
        Some((k, c)) if c == quote && !escaped => {
          let mut end = k + 1;
          while let Some(c) = self.peek_char() {
            if !is_flag(c) {
              break;
            }
            self.advance();
            end += c.len_utf8();
          }
          break self.gen_token(kind, start, end);
        }
        Some((k, '\n')) => {
          break self.gen_error(unclosed_err_kind, start, k);
        }
        None => {
          break self.gen_error(unclosed_err_kind, start, self.input.len());
        }
        Some(_) => {
          escaped = false;
        }
      }
    }
  }

  fn lex_while(&mut self, start: usize, pred: fn(char) -> bool) -> usize {
    let mut end = start;
    while let Some(&(i, c)) = self.chars.peek() {
      if !pred(c) {
        break;
      }
      end = i + c.len_utf8();
      self.advance();
    }
    end
  }

  fn gen_tokens(&mut self) -> Option<()> {
    // skip whitespace except newlines
    while let Some(' ' | '\t' | '\r') = self.peek_char() {
      self.advance();
    }

    let (j, c) = self.advance()?;

    match c {
      '\n' => {
        if !self.last_newline {
          self.single_char_token(TokenKind::Newline, j);
        }
      }
      '/' if self.peek_char() == Some('/') => {
        // comment, the newline is lexed on the next round
        while let Some(c) = self.peek_char() {
          if c == '\n' {
            break;
          }
          self.advance();
        }
      }
      '/' => {
        self.lex_quoted(j, '/', TokenKind::Regex, LexErrorKind::UnclosedRegex,
          |c| "imslux".contains(c));
      }
      '"' => {
        self.lex_quoted(j, '"', TokenKind::String, LexErrorKind::UnclosedString,
          |c| c == 'i');
      }
      '-' if self.peek_char() == Some('>') => {
        self.advance();
        self.gen_token(TokenKind::Arrow, j, j + 2);
      }
      '-' if self.peek_char().map_or(false, |c| c.is_ascii_digit()) => {
        let end = self.lex_while(j + 1, |c| c.is_ascii_digit());
        self.gen_token(TokenKind::Number, j, end);
      }
      '.' if self.peek_char() == Some('.') => {
        self.advance();
        self.gen_token(TokenKind::DotDot, j, j + 2);
      }
      '.' => self.single_char_token(TokenKind::Dot, j),
      '%' => self.single_char_token(TokenKind::Percent, j),
      ':' => self.single_char_token(TokenKind::Colon, j),
      '|' => self.single_char_token(TokenKind::Or, j),
      ',' => self.single_char_token(TokenKind::Comma, j),
      '(' => self.single_char_token(TokenKind::LParen, j),
      ')' => self.single_char_token(TokenKind::RParen, j),
      '[' => self.single_char_token(TokenKind::LBracket, j),
      ']' => self.single_char_token(TokenKind::RBracket, j),
      '{' => self.single_char_token(TokenKind::LBrace, j),
      '}' => self.single_char_token(TokenKind::RBrace, j),
      '~' => self.single_char_token(TokenKind::Tilde, j),
      '?' => self.single_char_token(TokenKind::QuestionMark, j),
      '*' => self.single_char_token(TokenKind::Asterisk, j),
      '+' => self.single_char_token(TokenKind::Plus, j),
      '!' => self.single_char_token(TokenKind::Bang, j),
      _ if c.is_ascii_digit() => {
        let end = self.lex_while(j + 1, |c| c.is_ascii_digit());
        self.gen_token(TokenKind::Number, j, end);
      }
      _ if c.is_ascii_alphabetic() || c == '_' => {
        let end = self.lex_while(j + 1, |c| c.is_ascii_alphanumeric() || c == '_');
        let text = &self.input[j..end];
        let kind = if super::ast::is_terminal_name(text) {
          TokenKind::TermName
        } else {
          TokenKind::RuleName
        };
        self.gen_token(kind, j, end);
      }
      _ => {
        self.gen_error(LexErrorKind::InvalidChar, j, j + c.len_utf8());
      }
    }

    Some(())
  }
}

impl<'a> Iterator for Lexer<'a> {
  type Item = Spanned<Token<'a>, usize, LexError>;

  fn next(&mut self) -> Option<Self::Item> {
    while self.buffer.is_empty() {
      self.gen_tokens()?;
    }
    self.buffer.pop_front()
  }
}

impl<'a> Display for Token<'a> {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "<{:?}: {:?}>", self.kind, self.text)
  }
}

impl Display for LexErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::UnclosedRegex => write!(f, "unclosed regexp"),
      Self::UnclosedString => write!(f, "unclosed string"),
      Self::InvalidChar => write!(f, "invalid character"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn kinds(input: &str) -> Vec<TokenKind> {
    Lexer::new(input)
      .map(|result| result.unwrap().1.kind)
      .collect()
  }

  #[test]
  fn tokens() {
    use TokenKind::*;

    assert_eq!(
      kinds(r#"
?expr.2: expr "+"i term -> add  // comment
    | /\d+\//x ~ 2..3

%ignore WS
"#),
      vec![
        QuestionMark, RuleName, Dot, Number, Colon, RuleName, String, RuleName,
        Arrow, RuleName, Newline,
        Or, Regex, Tilde, Number, DotDot, Number, Newline,
        Percent, RuleName, TermName, Newline,
      ]);
  }

  #[test]
  fn literal_text_keeps_flags() {
    let tokens = Lexer::new(r#""if"i /a\/b/ims"#)
      .map(|result| result.unwrap().1.text)
      .collect::<Vec<_>>();

    assert_eq!(tokens, vec![r#""if"i"#, r"/a\/b/ims"]);
  }

  #[test]
  fn negative_priority() {
    let tokens = Lexer::new("NAME.-1: x")
      .map(|result| result.unwrap().1)
      .map(|token| (token.kind, token.text))
      .collect::<Vec<_>>();

    assert_eq!(tokens, vec![
      (TokenKind::TermName, "NAME"),
      (TokenKind::Dot, "."),
      (TokenKind::Number, "-1"),
      (TokenKind::Colon, ":"),
      (TokenKind::RuleName, "x"),
    ]);
  }

  #[test]
  fn unclosed_string() {
    let result = Lexer::new("a: \"abc\n").collect::<Vec<_>>();
    let error = result.into_iter().find_map(Result::err).unwrap();

    assert!(matches!(error.kind, LexErrorKind::UnclosedString));
    assert_eq!(error.span, (3, 7));
  }
}
