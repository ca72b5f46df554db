//! Template instantiation.
//!
//! A template `name{p1, p2}: body` is substituted at every invocation
//! `name{a1, a2}` before desugaring. Arguments are expanded in the caller's
//! scope first, so `sep{item{A}, ","}` works and a template body may invoke
//! other templates.

use crate::grammar_parser::ast::{Alt, Expansions, Expr, Spanned};
use crate::{GrammarError, Map};

#[derive(Debug, Clone)]
pub struct Template {
  pub params: Vec<String>,
  pub body: Expansions,
}

pub type Templates = Map<String, Template>;

type Bindings = Map<String, Expansions>;

pub fn expand(exps: &[Alt], templates: &Templates) -> Result<Expansions, GrammarError> {
  Expander {
    templates,
    stack: vec![],
  }.expansions(exps, &Bindings::default())
}

struct Expander<'a> {
  templates: &'a Templates,
  /// Templates currently being instantiated.
  stack: Vec<String>,
}

impl<'a> Expander<'a> {
  fn expansions(
    &mut self,
    exps: &[Alt],
    bindings: &Bindings,
  ) -> Result<Expansions, GrammarError> {
    exps.iter()
      .map(|alt| {
        let items = alt.items.iter()
          .map(|item| self.expr(item, bindings))
          .collect::<Result<Vec<_>, _>>()?;

        Ok(Alt {
          items,
          alias: alt.alias.clone(),
          span: alt.span,
        })
      })
      .collect()
  }

  fn expr(&mut self, expr: &Expr, bindings: &Bindings) -> Result<Expr, GrammarError> {
    Ok(match expr {
      Expr::Symbol(name) => match bindings.get(&name.1) {
        Some(arg) => substitute(arg),
        None => expr.clone(),
      },
      Expr::Literal(_) | Expr::Range(_) => expr.clone(),
      Expr::Group(exps) => Expr::Group(self.expansions(exps, bindings)?),
      Expr::Maybe(exps) => Expr::Maybe(self.expansions(exps, bindings)?),
      Expr::Repeat(inner, op) => {
        Expr::Repeat(Box::new(self.expr(inner, bindings)?), op.clone())
      }
      Expr::Template(name, args) => self.instantiate(name, args, bindings)?,
    })
  }

  fn instantiate(
    &mut self,
    name: &Spanned<String>,
    args: &[Expansions],
    bindings: &Bindings,
  ) -> Result<Expr, GrammarError> {
    let template = self.templates.get(&name.1)
      .ok_or_else(|| GrammarError::UndefinedTemplate {
        name: name.1.clone(),
        span: name.0,
      })?;

    if template.params.len() != args.len() {
      return Err(GrammarError::ArityMismatch {
        name: name.1.clone(),
        expected: template.params.len(),
        found: args.len(),
        span: name.0,
      });
    }

    if self.stack.contains(&name.1) {
      return Err(GrammarError::TemplateRecursion {
        name: name.1.clone(),
        span: name.0,
      });
    }

    let mut inner = Bindings::default();
    for (param, arg) in template.params.iter().zip(args) {
      inner.insert(param.clone(), self.expansions(arg, bindings)?);
    }

    self.stack.push(name.1.clone());
    let body = self.expansions(&template.body, &inner)?;
    self.stack.pop();

    Ok(Expr::Group(body))
  }
}

/// A single-item argument replaces the parameter as is; anything else is
/// wrapped in a group.
fn substitute(arg: &Expansions) -> Expr {
  match arg.as_slice() {
    [alt] if alt.items.len() == 1 && alt.alias.is_none() => alt.items[0].clone(),
    _ => Expr::Group(arg.clone()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grammar_parser::{self, ast::Decl};
  use pretty_assertions::assert_eq;

  fn split(input: &str) -> (Templates, Vec<(String, Expansions)>) {
    let mut templates = Templates::default();
    let mut rules = vec![];

    for decl in grammar_parser::parse(input).unwrap() {
      if let Decl::Rule(rule) = decl.1 {
        if rule.params.is_empty() {
          rules.push((rule.name.1, rule.expansions));
        } else {
          templates.insert(rule.name.1, Template {
            params: rule.params.into_iter().map(|p| p.1).collect(),
            body: rule.expansions,
          });
        }
      }
    }

    (templates, rules)
  }

  fn names(exps: &[Alt]) -> Vec<String> {
    let mut names = vec![];
    crate::grammar_parser::ast::visit_expansion_names(exps, &mut |name| {
      names.push(name.to_owned())
    });
    names
  }

  #[test]
  fn substitutes_arguments() {
    let (templates, rules) = split(r#"
sep{x, s}: x (s x)*
start: sep{item, COMMA}
"#);

    let expanded = expand(&rules[0].1, &templates).unwrap();

    assert_eq!(names(&expanded), vec!["item", "COMMA", "item"]);
    assert!(matches!(&expanded[0].items[0], Expr::Group(body) if body.len() == 1));
  }

  #[test]
  fn nested_invocations() {
    let (templates, rules) = split(r#"
pair{x}: x x
wrap{x}: "(" pair{x} ")"
start: wrap{pair{A | B}}
"#);

    let expanded = expand(&rules[0].1, &templates).unwrap();

    assert_eq!(names(&expanded), vec!["A", "B", "A", "B", "A", "B", "A", "B"]);
  }

  #[test]
  fn errors() {
    let (templates, rules) = split(r#"
one{x}: x
loop{x}: loop{x}
a: missing{B}
b: one{B, C}
c: loop{B}
"#);

    assert!(matches!(
      expand(&rules[0].1, &templates),
      Err(GrammarError::UndefinedTemplate { name, .. }) if name == "missing"));
    assert!(matches!(
      expand(&rules[1].1, &templates),
      Err(GrammarError::ArityMismatch { expected: 1, found: 2, .. })));
    assert!(matches!(
      expand(&rules[2].1, &templates),
      Err(GrammarError::TemplateRecursion { name, .. }) if name == "loop"));
  }
}
