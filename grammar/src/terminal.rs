//! Terminal compilation.
//!
//! A terminal definition is folded into a single [`Pattern`]: references
//! to other terminals are inlined, concatenations of plain strings stay
//! strings, and everything else becomes a regex.

use std::cmp::Ordering;
use crate::grammar_parser::ast::{Alt, Expr, LiteralKind, RepeatOp, TermDecl};
use crate::{GrammarError, HashMap, Span};

pub mod width;

pub const DEFAULT_PRIORITY: i32 = 1;

/// Flags understood by the regex engine; `l` is accepted and dropped.
const REGEX_FLAGS: &str = "imsux";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternKind {
  Str(String),
  Re(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
  pub kind: PatternKind,
  /// Sorted, deduplicated subset of `imsux`.
  pub flags: String,
}

impl Pattern {
  pub fn string(value: impl Into<String>, flags: &str) -> Self {
    Self {
      kind: PatternKind::Str(value.into()),
      flags: normalize_flags(flags),
    }
  }

  pub fn regex(value: impl Into<String>, flags: &str) -> Self {
    Self {
      kind: PatternKind::Re(value.into()),
      flags: normalize_flags(flags),
    }
  }

  /// Source text of the pattern: the literal string or the raw regex.
  pub fn value(&self) -> &str {
    match &self.kind {
      PatternKind::Str(s) | PatternKind::Re(s) => s,
    }
  }

  pub fn is_string(&self) -> bool {
    matches!(self.kind, PatternKind::Str(_))
  }

  /// Regex matching the pattern, without its flags.
  fn body(&self) -> String {
    match &self.kind {
      PatternKind::Str(s) => regex::escape(s),
      PatternKind::Re(r) => format!("(?:{})", r),
    }
  }

  /// Regex matching the pattern, flags included as a scoped group.
  pub fn to_regex(&self) -> String {
    if self.flags.is_empty() {
      self.body()
    } else {
      format!("(?{}:{})", self.flags, self.body())
    }
  }

  pub fn max_width(&self) -> usize {
    match &self.kind {
      PatternKind::Str(s) => s.chars().count(),
      PatternKind::Re(r) => width::max_width(r),
    }
  }
}

fn normalize_flags(flags: &str) -> String {
  let mut flags = flags.chars()
    .filter(|c| REGEX_FLAGS.contains(*c))
    .collect::<Vec<_>>();
  flags.sort_unstable();
  flags.dedup();
  flags.into_iter().collect()
}

#[derive(Debug, Clone)]
pub struct Terminal {
  pub name: String,
  /// `None` for `%declare`d terminals, which the lexer never produces.
  pub pattern: Option<Pattern>,
  pub priority: i32,
  /// Created from an inline literal in a rule.
  pub anonymous: bool,
  pub span: Option<Span>,
}

impl Terminal {
  pub fn precedence_key(&self) -> PrecedenceKey {
    PrecedenceKey {
      priority: self.priority,
      max_width: self.pattern.as_ref().map_or(0, Pattern::max_width),
      definition_len: self.pattern.as_ref().map_or(0, |p| p.value().chars().count()),
      name: self.name.clone(),
    }
  }
}

/// Lexer precedence of a terminal. Greater keys are preferred: higher
/// priority, then wider patterns, then longer definitions, then the
/// lexicographically smaller name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecedenceKey {
  pub priority: i32,
  pub max_width: usize,
  pub definition_len: usize,
  pub name: String,
}

impl Ord for PrecedenceKey {
  fn cmp(&self, other: &Self) -> Ordering {
    self.priority.cmp(&other.priority)
      .then(self.max_width.cmp(&other.max_width))
      .then(self.definition_len.cmp(&other.definition_len))
      .then_with(|| other.name.cmp(&self.name))
  }
}

impl PartialOrd for PrecedenceKey {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

/// Name given to an anonymous punctuation terminal.
pub fn punctuation_name(value: &str) -> Option<&'static str> {
  Some(match value {
    "." => "DOT",
    "," => "COMMA",
    ":" => "COLON",
    ";" => "SEMICOLON",
    "+" => "PLUS",
    "-" => "MINUS",
    "*" => "STAR",
    "/" => "SLASH",
    "\\" => "BACKSLASH",
    "|" => "VBAR",
    "?" => "QMARK",
    "!" => "BANG",
    "@" => "AT",
    "#" => "HASH",
    "$" => "DOLLAR",
    "%" => "PERCENT",
    "^" => "CIRCUMFLEX",
    "&" => "AMPERSAND",
    "_" => "UNDERSCORE",
    "<" => "LESSTHAN",
    ">" => "MORETHAN",
    "=" => "EQUAL",
    "\"" => "DBLQUOTE",
    "'" => "QUOTE",
    "`" => "BACKQUOTE",
    "~" => "TILDE",
    "(" => "LPAR",
    ")" => "RPAR",
    "{" => "LBRACE",
    "}" => "RBRACE",
    "[" => "LSQB",
    "]" => "RSQB",
    "\n" => "NEWLINE",
    "\r\n" => "CRLF",
    "\t" => "TAB",
    " " => "SPACE",
    _ => return None,
  })
}

/// Compiles terminal definitions on demand, memoizing every result.
pub(crate) struct Compiler<'a> {
  defs: &'a HashMap<String, &'a TermDecl>,
  compiled: HashMap<String, Pattern>,
  /// Terminals being compiled, outermost first.
  path: Vec<String>,
}

impl<'a> Compiler<'a> {
  pub fn new(defs: &'a HashMap<String, &'a TermDecl>) -> Self {
    Self {
      defs,
      compiled: HashMap::default(),
      path: vec![],
    }
  }

  pub fn terminal(&mut self, name: &str) -> Result<Pattern, GrammarError> {
    if let Some(pattern) = self.compiled.get(name) {
      return Ok(pattern.clone());
    }

    let decl = *self.defs.get(name)
      .ok_or_else(|| GrammarError::UndefinedSymbol {
        name: name.to_owned(),
        span: None,
      })?;

    if let Some(start) = self.path.iter().position(|n| n == name) {
      let mut path = self.path[start..].to_vec();
      path.push(name.to_owned());
      return Err(GrammarError::TerminalRecursion {
        name: name.to_owned(),
        path,
        span: Some(decl.name.0),
      });
    }

    self.path.push(name.to_owned());
    let pattern = self.expansions(name, decl.name.0, &decl.expansions);
    self.path.pop();

    let pattern = pattern?;
    self.compiled.insert(name.to_owned(), pattern.clone());
    Ok(pattern)
  }

  /// Alternation. Equal flags are hoisted; otherwise every branch keeps its
  /// own flags as a scoped group.
  pub fn expansions(
    &mut self,
    owner: &str,
    span: Span,
    exps: &[Alt],
  ) -> Result<Pattern, GrammarError> {
    let mut alts = exps.iter()
      .map(|alt| self.concat(owner, span, alt))
      .collect::<Result<Vec<_>, _>>()?;

    if alts.len() == 1 {
      return Ok(alts.remove(0));
    }

    let flags = alts[0].flags.clone();
    if alts.iter().all(|alt| alt.flags == flags) {
      let body = alts.iter().map(Pattern::body).collect::<Vec<_>>().join("|");
      Ok(Pattern::regex(body, &flags))
    } else {
      let body = alts.iter().map(Pattern::to_regex).collect::<Vec<_>>().join("|");
      Ok(Pattern::regex(body, ""))
    }
  }

  fn concat(&mut self, owner: &str, span: Span, alt: &Alt) -> Result<Pattern, GrammarError> {
    let mut items = alt.items.iter()
      .map(|item| self.expr(owner, span, item))
      .collect::<Result<Vec<_>, _>>()?;

    match items.len() {
      0 => return Ok(Pattern::string("", "")),
      1 => return Ok(items.remove(0)),
      _ => {}
    }

    let flags = items[0].flags.clone();
    if items.iter().any(|item| item.flags != flags) {
      return Err(GrammarError::IncompatibleFlags {
        name: owner.to_owned(),
        span: Some(span),
      });
    }

    if items.iter().all(Pattern::is_string) {
      let value = items.iter().map(Pattern::value).collect::<String>();
      Ok(Pattern::string(value, &flags))
    } else {
      let body = items.iter().map(Pattern::body).collect::<String>();
      Ok(Pattern::regex(body, &flags))
    }
  }

  pub fn expr(&mut self, owner: &str, span: Span, expr: &Expr) -> Result<Pattern, GrammarError> {
    Ok(match expr {
      Expr::Symbol(name) => {
        if !crate::grammar_parser::ast::is_terminal_name(&name.1) {
          return Err(GrammarError::UndefinedSymbol {
            name: name.1.clone(),
            span: Some(name.0),
          });
        }
        self.terminal(&name.1).map_err(|err| match err {
          GrammarError::UndefinedSymbol { name: missing, span: None } => {
            GrammarError::UndefinedSymbol {
              name: missing,
              span: Some(name.0),
            }
          }
          err => err,
        })?
      }
      Expr::Literal(literal) => match literal.1.kind {
        LiteralKind::String => Pattern::string(literal.1.value.clone(), &literal.1.flags),
        LiteralKind::Regex => Pattern::regex(literal.1.value.clone(), &literal.1.flags),
      },
      Expr::Range(range) => {
        let (from, to) = range.1;
        Pattern::regex(
          format!("[{}-{}]", regex::escape(&from.to_string()), regex::escape(&to.to_string())),
          "")
      }
      Expr::Group(exps) => self.expansions(owner, span, exps)?,
      Expr::Maybe(exps) => {
        let inner = self.expansions(owner, span, exps)?;
        repeat(&inner, RepeatOp::Optional)
      }
      Expr::Repeat(inner, op) => {
        let inner = self.expr(owner, span, inner)?;
        repeat(&inner, op.1)
      }
      Expr::Template(name, _) => {
        return Err(GrammarError::UndefinedSymbol {
          name: name.1.clone(),
          span: Some(name.0),
        });
      }
    })
  }
}

fn repeat(inner: &Pattern, op: RepeatOp) -> Pattern {
  let suffix = match op {
    RepeatOp::Optional => "?".to_owned(),
    RepeatOp::Many => "*".to_owned(),
    RepeatOp::Many1 => "+".to_owned(),
    RepeatOp::Exactly(n) => format!("{{{}}}", n),
    RepeatOp::Between(n, m) => format!("{{{},{}}}", n, m),
  };

  let body = match &inner.kind {
    PatternKind::Str(s) => format!("(?:{})", regex::escape(s)),
    PatternKind::Re(_) => inner.body(),
  };

  Pattern::regex(format!("{}{}", body, suffix), &inner.flags)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grammar_parser::{self, ast::Decl};
  use pretty_assertions::assert_eq;

  fn compile(input: &str, name: &str) -> Result<Pattern, GrammarError> {
    let ast = grammar_parser::parse(input).unwrap();
    let decls = ast.iter()
      .filter_map(|decl| match &decl.1 {
        Decl::Term(term) => Some(term),
        _ => None,
      })
      .collect::<Vec<_>>();
    let defs = decls.iter()
      .map(|term| (term.name.1.clone(), *term))
      .collect::<HashMap<_, _>>();

    Compiler::new(&defs).terminal(name)
  }

  #[test]
  fn strings_stay_strings() {
    let pattern = compile("A: \"a\"\nAB: A \"b\"\n", "AB").unwrap();
    assert_eq!(pattern, Pattern::string("ab", ""));
  }

  #[test]
  fn mixed_patterns() {
    let pattern = compile("NUM: \"-\"? /[0-9]/+ | \"0\"..\"9\"\n", "NUM").unwrap();

    assert!(!pattern.is_string());
    let re = regex::Regex::new(&format!(r"\A(?:{})\z", pattern.to_regex())).unwrap();
    assert!(re.is_match("-12"));
    assert!(re.is_match("7"));
    assert!(!re.is_match("-"));
  }

  #[test]
  fn scoped_flags_in_alternation() {
    let pattern = compile("KW: \"if\"i | /else/\n", "KW").unwrap();

    let re = regex::Regex::new(&format!(r"\A(?:{})\z", pattern.to_regex())).unwrap();
    assert!(re.is_match("IF"));
    assert!(re.is_match("else"));
    assert!(!re.is_match("ELSE"));
  }

  #[test]
  fn flags_drop_l() {
    assert_eq!(Pattern::regex("a", "lxi").flags, "ix");
  }

  #[test]
  fn errors() {
    assert!(matches!(
      compile("A: \"a\"i \"b\"\n", "A"),
      Err(GrammarError::IncompatibleFlags { name, .. }) if name == "A"));

    match compile("A: \"x\" B\nB: \"y\" | A\n", "A") {
      Err(GrammarError::TerminalRecursion { path, .. }) => {
        assert_eq!(path, vec!["A", "B", "A"]);
      }
      other => panic!("unexpected {:?}", other),
    }

    assert!(matches!(
      compile("A: B\n", "A"),
      Err(GrammarError::UndefinedSymbol { name, span: Some(_) }) if name == "B"));
  }

  #[test]
  fn precedence_is_total() {
    let key = |name: &str, priority, value: &str| Terminal {
      name: name.to_owned(),
      pattern: Some(Pattern::string(value, "")),
      priority,
      anonymous: false,
      span: None,
    }.precedence_key();

    assert!(key("A", 2, "a") > key("B", 1, "bbbb"));
    assert!(key("A", 1, "aa") > key("B", 1, "b"));
    assert!(key("A", 1, "a") > key("B", 1, "b"));
    assert_ne!(key("A", 1, "a").cmp(&key("B", 1, "a")), Ordering::Equal);
  }
}
