pub mod lex;
pub mod ast;

use self::ast::*;
use self::lex::{Token, TokenKind};
use crate::GrammarError;

type Lexeme<'a> = (usize, Token<'a>, usize);

pub fn parse(input: &str) -> Result<ast::Grammar, GrammarError> {
  let tokens = lex::Lexer::new(input)
    .collect::<Result<Vec<_>, _>>()
    .map_err(|err| GrammarError::parse(err.kind.to_string(), err.span))?;

  Parser {
    input,
    tokens,
    pos: 0,
    nesting: 0,
  }.document()
}

struct Parser<'a> {
  input: &'a str,
  tokens: Vec<Lexeme<'a>>,
  pos: usize,
  /// Depth of `()`, `[]` and `{}`; newlines are insignificant inside them.
  nesting: usize,
}

impl<'a> Parser<'a> {
  fn document(mut self) -> Result<ast::Grammar, GrammarError> {
    let mut decls = vec![];

    loop {
      while self.eat(TokenKind::Newline).is_some() {}
      if self.pos >= self.tokens.len() {
        break;
      }

      let start = self.tokens[self.pos].0;
      let decl = self.decl()?;
      let end = self.last_end();
      decls.push(Spanned((start, end), decl));

      if self.pos < self.tokens.len() && self.eat(TokenKind::Newline).is_none() {
        return Err(self.error("expected end of line"));
      }
    }

    Ok(decls)
  }

  fn decl(&mut self) -> Result<Decl, GrammarError> {
    match self.peek_kind() {
      Some(TokenKind::Percent) => {
        self.bump();
        self.directive()
      }
      Some(TokenKind::QuestionMark) => {
        self.bump();
        self.rule(RuleModifier::ExpandSingle)
      }
      Some(TokenKind::Bang) => {
        self.bump();
        self.rule(RuleModifier::KeepTokens)
      }
      Some(TokenKind::RuleName) => self.rule(RuleModifier::Plain),
      Some(TokenKind::TermName) => self.term(),
      _ => Err(self.error("expected a rule, a terminal or a directive")),
    }
  }

  fn rule(&mut self, modifier: RuleModifier) -> Result<Decl, GrammarError> {
    let name = self.name(TokenKind::RuleName, "rule name")?;

    let mut params = vec![];
    if self.eat(TokenKind::LBrace).is_some() {
      self.nesting += 1;
      loop {
        let (start, token, end) = self.bump_any("template parameter")?;
        match token.kind {
          TokenKind::RuleName | TokenKind::TermName => {
            params.push(Spanned((start, end), token.text.to_owned()));
          }
          _ => return Err(GrammarError::parse("expected template parameter", (start, end))),
        }
        if self.eat(TokenKind::Comma).is_none() {
          break;
        }
      }
      self.expect(TokenKind::RBrace, "`}`")?;
      self.nesting -= 1;
    }

    let priority = self.priority()?;
    self.expect(TokenKind::Colon, "`:`")?;
    let expansions = self.expansions()?;

    if !params.is_empty() {
      if let Some(alias) = expansions.iter().find_map(|alt| alt.alias.as_ref()) {
        return Err(GrammarError::parse("aliases are not allowed in templates", alias.0));
      }
    }

    Ok(Decl::Rule(RuleDecl {
      name,
      modifier,
      params,
      priority,
      expansions,
    }))
  }

  fn term(&mut self) -> Result<Decl, GrammarError> {
    let name = self.name(TokenKind::TermName, "terminal name")?;
    let priority = self.priority()?;
    self.expect(TokenKind::Colon, "`:`")?;

    let body_start = self.peek().map_or(self.input.len(), |t| t.0);
    let expansions = self.expansions()?;
    let body = (body_start, self.last_end().max(body_start));

    if let Some(alias) = expansions.iter().find_map(|alt| alt.alias.as_ref()) {
      return Err(GrammarError::parse("terminals cannot be aliased", alias.0));
    }

    Ok(Decl::Term(TermDecl {
      name,
      priority,
      expansions,
      body,
    }))
  }

  fn directive(&mut self) -> Result<Decl, GrammarError> {
    let (start, token, end) = self.expect(TokenKind::RuleName, "directive name")?;

    match token.text {
      "ignore" => {
        let body_start = self.peek().map_or(self.input.len(), |t| t.0);
        let expansions = self.expansions()?;
        let body = (body_start, self.last_end().max(body_start));
        Ok(Decl::Ignore(IgnoreDecl { expansions, body }))
      }
      "declare" => {
        let mut names = vec![];
        while let Some(TokenKind::TermName) = self.peek_kind() {
          names.push(self.name(TokenKind::TermName, "terminal name")?);
        }
        if names.is_empty() {
          return Err(self.error("expected terminal names after %declare"));
        }
        Ok(Decl::Declare(DeclareDecl { names }))
      }
      "import" => self.import(),
      _ => Err(GrammarError::parse(
        format!("unknown directive %{}", token.text),
        (start, end))),
    }
  }

  fn import(&mut self) -> Result<Decl, GrammarError> {
    let mut path = vec![];
    let mut relative = String::new();
    while self.eat(TokenKind::Dot).is_some() {
      relative.push('.');
    }

    loop {
      let (start, token, end) = self.bump_any("module path")?;
      match token.kind {
        TokenKind::RuleName | TokenKind::TermName => {
          path.push(Spanned((start, end), token.text.to_owned()));
        }
        _ => return Err(GrammarError::parse("expected module path", (start, end))),
      }
      if self.eat(TokenKind::Dot).is_none() {
        break;
      }
    }

    if let Some(first) = path.first_mut() {
      first.1.insert_str(0, &relative);
    }

    if self.eat(TokenKind::LParen).is_some() {
      self.nesting += 1;
      let mut names = vec![];
      loop {
        let (start, token, end) = self.bump_any("imported name")?;
        match token.kind {
          TokenKind::RuleName | TokenKind::TermName => {
            names.push((Spanned((start, end), token.text.to_owned()), None));
          }
          _ => return Err(GrammarError::parse("expected imported name", (start, end))),
        }
        if self.eat(TokenKind::Comma).is_none() {
          break;
        }
      }
      self.expect(TokenKind::RParen, "`)`")?;
      self.nesting -= 1;

      return Ok(Decl::Import(ImportDecl {
        module: path.into_iter().map(|p| p.1).collect(),
        names,
      }));
    }

    if path.len() < 2 {
      return Err(self.error("expected `module.NAME`"));
    }

    let name = path.pop();
    let alias = if self.eat(TokenKind::Arrow).is_some() {
      let (start, token, end) = self.bump_any("alias")?;
      match token.kind {
        TokenKind::RuleName | TokenKind::TermName => {
          Some(Spanned((start, end), token.text.to_owned()))
        }
        _ => return Err(GrammarError::parse("expected alias", (start, end))),
      }
    } else {
      None
    };

    Ok(Decl::Import(ImportDecl {
      module: path.into_iter().map(|p| p.1).collect(),
      names: name.into_iter().map(|name| (name, alias.clone())).collect(),
    }))
  }

  fn priority(&mut self) -> Result<Option<i32>, GrammarError> {
    if self.eat(TokenKind::Dot).is_none() {
      return Ok(None);
    }
    let (start, token, end) = self.expect(TokenKind::Number, "priority")?;
    token.text.parse::<i32>()
      .map(Some)
      .map_err(|_| GrammarError::parse("priority out of range", (start, end)))
  }

  fn expansions(&mut self) -> Result<Expansions, GrammarError> {
    let mut alts = vec![self.alt()?];

    loop {
      if self.eat(TokenKind::Or).is_some() {
        alts.push(self.alt()?);
        continue;
      }

      // a line starting with `|` continues the definition
      if self.nesting == 0 && self.continues_on_next_line() {
        self.bump();
        continue;
      }

      break;
    }

    Ok(alts)
  }

  fn continues_on_next_line(&self) -> bool {
    let mut i = self.pos;
    if !matches!(self.tokens.get(i), Some((_, Token { kind: TokenKind::Newline, .. }, _))) {
      return false;
    }
    while let Some((_, Token { kind: TokenKind::Newline, .. }, _)) = self.tokens.get(i) {
      i += 1;
    }
    matches!(self.tokens.get(i), Some((_, Token { kind: TokenKind::Or, .. }, _)))
  }

  fn alt(&mut self) -> Result<Alt, GrammarError> {
    let start = self.peek().map_or(self.input.len(), |t| t.0);
    let mut items = vec![];

    while self.starts_atom() {
      items.push(self.expr()?);
    }

    let alias = if self.eat(TokenKind::Arrow).is_some() {
      Some(self.name(TokenKind::RuleName, "alias")?)
    } else {
      None
    };

    let end = if items.is_empty() && alias.is_none() {
      start
    } else {
      self.last_end()
    };

    Ok(Alt {
      items,
      alias,
      span: (start, end),
    })
  }

  fn starts_atom(&self) -> bool {
    matches!(
      self.peek_kind(),
      Some(TokenKind::RuleName | TokenKind::TermName | TokenKind::String
        | TokenKind::Regex | TokenKind::LParen | TokenKind::LBracket))
  }

  fn expr(&mut self) -> Result<Expr, GrammarError> {
    let atom = self.atom()?;

    let op = match self.peek_kind() {
      Some(TokenKind::QuestionMark) => RepeatOp::Optional,
      Some(TokenKind::Asterisk) => RepeatOp::Many,
      Some(TokenKind::Plus) => RepeatOp::Many1,
      Some(TokenKind::Tilde) => {
        let (start, _, _) = self.bump_any("`~`")?;
        let min = self.number()?;
        let op = if self.eat(TokenKind::DotDot).is_some() {
          let max = self.number()?;
          if max < min {
            return Err(GrammarError::parse(
              format!("empty repetition range {}..{}", min, max),
              (start, self.last_end())));
          }
          RepeatOp::Between(min, max)
        } else {
          RepeatOp::Exactly(min)
        };
        return Ok(Expr::Repeat(Box::new(atom), Spanned((start, self.last_end()), op)));
      }
      _ => return Ok(atom),
    };

    let (start, _, end) = self.bump_any("operator")?;
    Ok(Expr::Repeat(Box::new(atom), Spanned((start, end), op)))
  }

  fn number(&mut self) -> Result<usize, GrammarError> {
    let (start, token, end) = self.expect(TokenKind::Number, "number")?;
    token.text.parse::<usize>()
      .map_err(|_| GrammarError::parse("expected a non-negative number", (start, end)))
  }

  fn atom(&mut self) -> Result<Expr, GrammarError> {
    let (start, token, end) = self.bump_any("expression")?;

    match token.kind {
      TokenKind::LParen | TokenKind::LBracket => {
        self.nesting += 1;
        let exps = self.expansions()?;
        if let Some(alias) = exps.iter().find_map(|alt| alt.alias.as_ref()) {
          return Err(GrammarError::parse(
            "aliases are only allowed on top-level alternatives",
            alias.0));
        }
        if token.kind == TokenKind::LParen {
          self.expect(TokenKind::RParen, "`)`")?;
          self.nesting -= 1;
          Ok(Expr::Group(exps))
        } else {
          self.expect(TokenKind::RBracket, "`]`")?;
          self.nesting -= 1;
          Ok(Expr::Maybe(exps))
        }
      }
      TokenKind::String => {
        let literal = decode_string(token.text, (start, end))?;
        if self.eat(TokenKind::DotDot).is_some() {
          let (end_start, end_token, end_end) = self.expect(TokenKind::String, "string")?;
          let upper = decode_string(end_token.text, (end_start, end_end))?;
          let span = (start, end_end);
          let from = single_char(&literal.value, span)?;
          let to = single_char(&upper.value, span)?;
          return Ok(Expr::Range(Spanned(span, (from, to))));
        }
        Ok(Expr::Literal(Spanned((start, end), literal)))
      }
      TokenKind::Regex => {
        Ok(Expr::Literal(Spanned((start, end), decode_regex(token.text))))
      }
      TokenKind::RuleName if self.peek_kind() == Some(TokenKind::LBrace) => {
        self.bump();
        self.nesting += 1;
        let mut args = vec![];
        loop {
          args.push(self.expansions()?);
          if self.eat(TokenKind::Comma).is_none() {
            break;
          }
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        self.nesting -= 1;
        Ok(Expr::Template(Spanned((start, end), token.text.to_owned()), args))
      }
      TokenKind::RuleName | TokenKind::TermName => {
        Ok(Expr::Symbol(Spanned((start, end), token.text.to_owned())))
      }
      _ => Err(GrammarError::parse(format!("unexpected {}", token), (start, end))),
    }
  }

  fn name(
    &mut self,
    kind: TokenKind,
    what: &str,
  ) -> Result<Spanned<String>, GrammarError> {
    let (start, token, end) = self.expect(kind, what)?;
    Ok(Spanned((start, end), token.text.to_owned()))
  }

  fn skip_insignificant(&self, mut i: usize) -> usize {
    if self.nesting > 0 {
      while let Some((_, Token { kind: TokenKind::Newline, .. }, _)) = self.tokens.get(i) {
        i += 1;
      }
    }
    i
  }

  fn peek(&self) -> Option<&Lexeme<'a>> {
    self.tokens.get(self.skip_insignificant(self.pos))
  }

  fn peek_kind(&self) -> Option<TokenKind> {
    self.peek().map(|t| t.1.kind)
  }

  fn bump(&mut self) -> Option<Lexeme<'a>> {
    let i = self.skip_insignificant(self.pos);
    let token = self.tokens.get(i).cloned()?;
    self.pos = i + 1;
    Some(token)
  }

  fn bump_any(&mut self, what: &str) -> Result<Lexeme<'a>, GrammarError> {
    match self.bump() {
      Some(token) => Ok(token),
      None => Err(self.error(format!("expected {}, found end of input", what))),
    }
  }

  fn eat(&mut self, kind: TokenKind) -> Option<Lexeme<'a>> {
    if self.peek_kind() == Some(kind) {
      self.bump()
    } else {
      None
    }
  }

  fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Lexeme<'a>, GrammarError> {
    match self.eat(kind) {
      Some(token) => Ok(token),
      None => Err(self.error(format!("expected {}", what))),
    }
  }

  fn last_end(&self) -> usize {
    self.pos.checked_sub(1)
      .and_then(|i| self.tokens.get(i))
      .map_or(0, |t| t.2)
  }

  fn error(&self, message: impl Into<String>) -> GrammarError {
    let message = message.into();
    match self.peek() {
      Some((start, token, end)) => {
        GrammarError::parse(format!("{}, found {}", message, token), (*start, *end))
      }
      None => {
        let end = self.input.len();
        GrammarError::parse(message, (end, end))
      }
    }
  }
}

fn decode_string(text: &str, span: (usize, usize)) -> Result<Literal, GrammarError> {
  let close = text.rfind('"').unwrap_or(0);
  let body = text.get(1..close).unwrap_or("");
  let flags = &text[close + 1..];

  Ok(Literal {
    kind: LiteralKind::String,
    value: unescape(body, span)?,
    flags: flags.to_owned(),
  })
}

fn decode_regex(text: &str) -> Literal {
  let close = text.rfind('/').unwrap_or(0);
  let body = text.get(1..close).unwrap_or("");

  Literal {
    kind: LiteralKind::Regex,
    value: body.replace("\\/", "/"),
    flags: text[close + 1..].to_owned(),
  }
}

fn unescape(body: &str, span: (usize, usize)) -> Result<String, GrammarError> {
  let mut out = String::with_capacity(body.len());
  let mut chars = body.chars();

  while let Some(c) = chars.next() {
    if c != '\\' {
      out.push(c);
      continue;
    }

    match chars.next() {
      Some('n') => out.push('\n'),
      Some('t') => out.push('\t'),
      Some('r') => out.push('\r'),
      Some('\\') => out.push('\\'),
      Some('"') => out.push('"'),
      Some('/') => out.push('/'),
      Some(kind @ ('x' | 'u')) => {
        let len = if kind == 'x' { 2 } else { 4 };
        let digits = chars.by_ref().take(len).collect::<String>();
        let c = u32::from_str_radix(&digits, 16)
          .ok()
          .filter(|_| digits.len() == len)
          .and_then(char::from_u32)
          .ok_or_else(|| GrammarError::parse("invalid escape sequence", span))?;
        out.push(c);
      }
      Some(other) => {
        out.push('\\');
        out.push(other);
      }
      None => out.push('\\'),
    }
  }

  Ok(out)
}

fn single_char(value: &str, span: (usize, usize)) -> Result<char, GrammarError> {
  let mut chars = value.chars();
  match (chars.next(), chars.next()) {
    (Some(c), None) => Ok(c),
    _ => Err(GrammarError::parse("range bounds must be single characters", span)),
  }
}
