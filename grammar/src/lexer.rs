use std::borrow::Borrow;
use std::fmt;
use itertools::Itertools;
use regex::Regex;
use tracing::trace;
use crate::terminal::{Pattern, Terminal};
use crate::{GrammarError, ParseError, TokenSet};

pub use tokens::Tokens;

pub mod tokens;

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub struct TokenId(u32);

#[derive(Default)]
pub(crate) struct TokenIdGen(u32);

impl TokenIdGen {
  pub fn gen(&mut self) -> TokenId {
    let i = self.0;
    self.0 += 1;
    TokenId(i)
  }
}

impl TokenId {
  pub fn id(&self) -> u32 {
    self.0
  }

  pub fn index(&self) -> usize {
    self.0 as usize
  }
}

impl Borrow<u32> for TokenId {
  fn borrow(&self) -> &u32 {
    &self.0
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexerMode {
  /// Every terminal competes at every position.
  Standard,
  /// Only the terminals the parser can accept next compete.
  Contextual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenId,
  pub terminal: String,
  pub text: String,
  /// Byte offsets.
  pub start: usize,
  pub end: usize,
  /// 1-based.
  pub line: usize,
  pub column: usize,
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}({:?})", self.terminal, self.text)
  }
}

/// Position in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
  pub pos: usize,
  pub line: usize,
  pub column: usize,
}

impl Default for Cursor {
  fn default() -> Self {
    Self {
      pos: 0,
      line: 1,
      column: 1,
    }
  }
}

impl Cursor {
  fn advance(&mut self, text: &str) {
    self.pos += text.len();
    match text.rfind('\n') {
      Some(i) => {
        self.line += text.matches('\n').count();
        self.column = text[i + 1..].chars().count() + 1;
      }
      None => self.column += text.chars().count(),
    }
  }
}

#[derive(Debug, Clone)]
struct Matcher {
  id: TokenId,
  regex: Regex,
  /// String terminals this regex also matches, as `(id, value, ignore case)`.
  unless: Vec<(TokenId, String, bool)>,
}

#[derive(Debug, Clone)]
pub struct Lexer {
  /// Best precedence first.
  matchers: Vec<Matcher>,
  ignore: TokenSet,
  names: Vec<String>,
}

impl Lexer {
  /// `terminals` is indexed by token id.
  pub(crate) fn new(terminals: &[Terminal], ignore: TokenSet) -> Result<Self, GrammarError> {
    let mut order = terminals.iter()
      .enumerate()
      .filter_map(|(ix, terminal)| terminal.pattern.as_ref().map(|p| (ix, terminal, p)))
      .collect::<Vec<_>>();
    order.sort_by(|a, b| b.1.precedence_key().cmp(&a.1.precedence_key()));

    let mut matchers = vec![];
    for &(ix, terminal, pattern) in &order {
      let regex = compile(terminal, pattern)?;

      let unless = if pattern.is_string() {
        vec![]
      } else {
        order.iter()
          .filter(|(_, other, p)| p.is_string() && other.priority == terminal.priority)
          .filter(|(_, _, p)| full_match(&regex, p.value()))
          .map(|&(other, _, p)| {
            (TokenId(other as u32), p.value().to_owned(), p.flags.contains('i'))
          })
          .collect()
      };

      matchers.push(Matcher {
        id: TokenId(ix as u32),
        regex,
        unless,
      });
    }

    Ok(Self {
      matchers,
      ignore,
      names: terminals.iter().map(|t| t.name.clone()).collect(),
    })
  }

  pub fn ignore(&self) -> &TokenSet {
    &self.ignore
  }

  pub fn name(&self, token: TokenId) -> &str {
    &self.names[token.index()]
  }

  /// Token stream in standard mode.
  pub fn tokens<'lexer, 'input>(&'lexer self, input: &'input str) -> Tokens<'lexer, 'input> {
    Tokens::new(self, input)
  }

  /// Scans the next token at `cursor`, skipping ignored terminals (which are
  /// collected into `ignored` when given). `admissible` restricts the
  /// competing terminals in contextual mode. Returns `None` at end of input.
  pub fn next_token(
    &self,
    input: &str,
    cursor: &mut Cursor,
    admissible: Option<&TokenSet>,
    mut ignored: Option<&mut Vec<Token>>,
  ) -> Result<Option<Token>, ParseError> {
    loop {
      if cursor.pos >= input.len() {
        return Ok(None);
      }

      let rest = &input[cursor.pos..];
      let allowed = |id: TokenId| {
        admissible.map_or(true, |set| set.contains(id.index()))
          || self.ignore.contains(id.index())
      };

      let (matcher, len) = match self.longest_match(rest, allowed) {
        Some(found) => found,
        None => return Err(self.no_match(input, *cursor, admissible)),
      };

      if len == 0 {
        return Err(ParseError::LexerExhaustion {
          terminal: self.name(matcher.id).to_owned(),
          position: cursor.pos,
          line: cursor.line,
          column: cursor.column,
        });
      }

      let text = &rest[..len];
      let kind = reclassify(matcher, text, admissible);
      let token = self.make_token(kind, text, *cursor);
      cursor.advance(text);

      let wanted = admissible.map_or(false, |set| set.contains(kind.index()));
      if self.ignore.contains(kind.index()) && !wanted {
        trace!(token = %token, "ignored");
        if let Some(ignored) = ignored.as_deref_mut() {
          ignored.push(token);
        }
        continue;
      }

      trace!(token = %token, "lexed");
      return Ok(Some(token));
    }
  }

  /// Longest match among allowed terminals; ties go to the better precedence.
  fn longest_match(
    &self,
    rest: &str,
    allowed: impl Fn(TokenId) -> bool,
  ) -> Option<(&Matcher, usize)> {
    let mut best: Option<(&Matcher, usize)> = None;

    for matcher in self.matchers.iter().filter(|m| allowed(m.id)) {
      if let Some(found) = matcher.regex.find(rest) {
        if best.map_or(true, |(_, len)| found.end() > len) {
          best = Some((matcher, found.end()));
        }
      }
    }

    best
  }

  fn no_match(&self, input: &str, cursor: Cursor, admissible: Option<&TokenSet>) -> ParseError {
    let expected = admissible.map_or_else(Vec::new, |set| self.names_of(set));

    if admissible.is_some() {
      if let Some((matcher, len)) = self.longest_match(&input[cursor.pos..], |_| true) {
        if len > 0 {
          let text = &input[cursor.pos..cursor.pos + len];
          let kind = reclassify(matcher, text, None);
          return ParseError::UnexpectedToken {
            token: self.make_token(kind, text, cursor),
            expected,
          };
        }
      }
    }

    ParseError::NoMatchingTerminal {
      position: cursor.pos,
      line: cursor.line,
      column: cursor.column,
      expected,
    }
  }

  /// Sorted names of the terminals in `set`.
  pub fn names_of(&self, set: &TokenSet) -> Vec<String> {
    set.iter()
      .filter_map(|ix| self.names.get(ix).cloned())
      .sorted()
      .collect()
  }

  fn make_token(&self, kind: TokenId, text: &str, cursor: Cursor) -> Token {
    Token {
      kind,
      terminal: self.name(kind).to_owned(),
      text: text.to_owned(),
      start: cursor.pos,
      end: cursor.pos + text.len(),
      line: cursor.line,
      column: cursor.column,
    }
  }
}

/// A regex token whose text is exactly a string terminal becomes that
/// terminal, provided the parser accepts it.
fn reclassify(matcher: &Matcher, text: &str, admissible: Option<&TokenSet>) -> TokenId {
  matcher.unless.iter()
    .find(|(id, value, ignore_case)| {
      let equal = if *ignore_case {
        value.to_lowercase() == text.to_lowercase()
      } else {
        value == text
      };
      equal && admissible.map_or(true, |set| set.contains(id.index()))
    })
    .map_or(matcher.id, |(id, _, _)| *id)
}

fn compile(terminal: &Terminal, pattern: &Pattern) -> Result<Regex, GrammarError> {
  let regex = Regex::new(&format!(r"\A{}", pattern.to_regex()))
    .map_err(|err| GrammarError::InvalidPattern {
      name: terminal.name.clone(),
      message: err.to_string(),
      span: terminal.span,
    })?;

  if regex.is_match("") {
    return Err(GrammarError::ZeroWidthTerminal {
      name: terminal.name.clone(),
      span: terminal.span,
    });
  }

  Ok(regex)
}

fn full_match(regex: &Regex, text: &str) -> bool {
  regex.find(text).map_or(false, |m| m.end() == text.len())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::BuiltinModules;
  use pretty_assertions::assert_eq;

  fn lex(grammar: &str, input: &str) -> Vec<(String, String)> {
    let grammar = crate::build(grammar, &BuiltinModules).unwrap();
    grammar.lexer.tokens(input)
      .map(|token| token.unwrap())
      .map(|token| (token.terminal, token.text))
      .collect()
  }

  fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
    expected.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
  }

  #[test]
  fn match_longest() {
    let tokens = lex(r#"
start: (IN | INTEGER | TEGE)*
IN: "in"
INTEGER: "integer"
TEGE: "tege"
"#, "integerintegin");

    assert_eq!(tokens, pairs(&[
      ("INTEGER", "integer"),
      ("IN", "in"),
      ("TEGE", "tege"),
      ("IN", "in"),
    ]));
  }

  #[test]
  fn keywords_are_reclassified() {
    let tokens = lex(r#"
start: (IF | NAME)*
IF: "if"
NAME: /[a-z]+/
%ignore " "
"#, "if iffy");

    assert_eq!(tokens, pairs(&[("IF", "if"), ("NAME", "iffy")]));
  }

  #[test]
  fn positions() {
    let grammar = crate::build(r#"
start: WORD*
%import common.WORD
%import common.WS
%ignore WS
"#, &BuiltinModules).unwrap();

    let tokens = grammar.lexer.tokens("ab\n  cd")
      .map(|token| token.unwrap())
      .map(|token| (token.start, token.line, token.column))
      .collect::<Vec<_>>();

    assert_eq!(tokens, vec![(0, 1, 1), (5, 2, 3)]);
  }

  #[test]
  fn no_matching_terminal() {
    let grammar = crate::build("start: A*\nA: \"a\"\n", &BuiltinModules).unwrap();
    let result = grammar.lexer.tokens("aab").collect::<Vec<_>>();

    assert_eq!(result.len(), 3);
    assert!(matches!(
      result[2],
      Err(ParseError::NoMatchingTerminal { position: 2, line: 1, column: 3, .. })));
  }

  #[test]
  fn zero_width_match_is_exhaustion() {
    let grammar = crate::build("start: A+\nA: /\\b/\n", &BuiltinModules).unwrap();
    let result = grammar.lexer.tokens("a").collect::<Vec<_>>();

    assert_eq!(result.len(), 1);
    match &result[0] {
      Err(ParseError::LexerExhaustion { terminal, position, line, column }) => {
        assert_eq!(terminal, "A");
        assert_eq!((*position, *line, *column), (0, 1, 1));
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn contextual_rejects_other_terminals() {
    let grammar = crate::build("start: A B\nA: \"a\"\nB: \"b\"\n", &BuiltinModules).unwrap();
    let a = grammar.token("A").unwrap();
    let admissible = TokenSet::from_token(grammar.terminals.len(), a.index());

    let mut cursor = Cursor::default();
    let err = grammar.lexer.next_token("b", &mut cursor, Some(&admissible), None).unwrap_err();

    match err {
      ParseError::UnexpectedToken { token, expected } => {
        assert_eq!(token.terminal, "B");
        assert_eq!(expected, vec!["A"]);
      }
      other => panic!("unexpected {:?}", other),
    }
  }
}
