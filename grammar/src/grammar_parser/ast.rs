pub type Grammar = Vec<Spanned<Decl>>;

#[derive(Debug, Clone)]
pub enum Decl {
  Rule(RuleDecl),
  Term(TermDecl),
  Ignore(IgnoreDecl),
  Import(ImportDecl),
  Declare(DeclareDecl),
}

#[derive(Debug, Clone)]
pub struct RuleDecl {
  pub name: Spanned<String>,
  pub modifier: RuleModifier,
  /// Non-empty for template declarations.
  pub params: Vec<Spanned<String>>,
  pub priority: Option<i32>,
  pub expansions: Expansions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleModifier {
  Plain,
  /// `?rule`
  ExpandSingle,
  /// `!rule`
  KeepTokens,
}

#[derive(Debug, Clone)]
pub struct TermDecl {
  pub name: Spanned<String>,
  pub priority: Option<i32>,
  pub expansions: Expansions,
  pub body: (usize, usize),
}

#[derive(Debug, Clone)]
pub struct IgnoreDecl {
  pub expansions: Expansions,
  pub body: (usize, usize),
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
  /// Module path, without the imported names.
  pub module: Vec<String>,
  /// `(imported name, alias)`
  pub names: Vec<(Spanned<String>, Option<Spanned<String>>)>,
}

#[derive(Debug, Clone)]
pub struct DeclareDecl {
  pub names: Vec<Spanned<String>>,
}

pub type Expansions = Vec<Alt>;

#[derive(Debug, Clone)]
pub struct Alt {
  pub items: Vec<Expr>,
  pub alias: Option<Spanned<String>>,
  pub span: (usize, usize),
}

#[derive(Debug, Clone)]
pub enum Expr {
  Symbol(Spanned<String>),
  Literal(Spanned<Literal>),
  Range(Spanned<(char, char)>),
  Group(Expansions),
  /// `[...]`
  Maybe(Expansions),
  Repeat(Box<Expr>, Spanned<RepeatOp>),
  Template(Spanned<String>, Vec<Expansions>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepeatOp {
  Optional,
  Many,
  Many1,
  Exactly(usize),
  Between(usize, usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
  pub kind: LiteralKind,
  pub value: String,
  pub flags: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
  String,
  Regex,
}

#[derive(Debug, Clone)]
pub struct Spanned<T>(pub (usize, usize), pub T);

impl Decl {
  pub fn name(&self) -> Option<&Spanned<String>> {
    match self {
      Self::Rule(decl) => Some(&decl.name),
      Self::Term(decl) => Some(&decl.name),
      _ => None,
    }
  }
}

impl Expr {
  /// Calls `f` on every symbol and template name in the expression.
  pub fn visit_names<F: FnMut(&str)>(&self, f: &mut F) {
    match self {
      Self::Symbol(name) => f(&name.1),
      Self::Literal(_) | Self::Range(_) => {}
      Self::Group(exps) | Self::Maybe(exps) => visit_expansion_names(exps, f),
      Self::Repeat(expr, _) => expr.visit_names(f),
      Self::Template(name, args) => {
        f(&name.1);
        for arg in args {
          visit_expansion_names(arg, f);
        }
      }
    }
  }

  pub fn visit_names_mut<F: FnMut(&mut Spanned<String>)>(&mut self, f: &mut F) {
    match self {
      Self::Symbol(name) => f(name),
      Self::Literal(_) | Self::Range(_) => {}
      Self::Group(exps) | Self::Maybe(exps) => visit_expansion_names_mut(exps, f),
      Self::Repeat(expr, _) => expr.visit_names_mut(f),
      Self::Template(name, args) => {
        f(name);
        for arg in args {
          visit_expansion_names_mut(arg, f);
        }
      }
    }
  }
}

pub fn visit_expansion_names<F: FnMut(&str)>(exps: &[Alt], f: &mut F) {
  for alt in exps {
    for item in &alt.items {
      item.visit_names(f);
    }
  }
}

pub fn visit_expansion_names_mut<F: FnMut(&mut Spanned<String>)>(
  exps: &mut [Alt],
  f: &mut F,
) {
  for alt in exps {
    for item in &mut alt.items {
      item.visit_names_mut(f);
    }
  }
}

/// Terminal names start with an uppercase letter after any leading
/// underscores; everything else names a rule.
pub fn is_terminal_name(name: &str) -> bool {
  name.trim_start_matches('_')
    .chars()
    .next()
    .map_or(false, |c| c.is_ascii_uppercase())
}
