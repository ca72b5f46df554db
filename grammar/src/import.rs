//! `%import` resolution.
//!
//! Module text comes from an [`ImportResolver`]. An imported symbol brings
//! along everything it references in its module; those dependencies are
//! renamed into the module's namespace (`common__x`, `COMMON__X`) so they
//! never clash with the importing grammar.

use tracing::debug;
use crate::grammar_parser::{self, ast::*};
use crate::{GrammarError, HashMap, Map, Set, Span};

const MAX_DEPTH: usize = 16;

/// Supplies the grammar text of an imported module.
pub trait ImportResolver {
  /// `module` is the dotted path split into segments; relative imports keep
  /// their leading dots on the first segment.
  fn resolve(&self, module: &[String]) -> Option<String>;
}

impl<F> ImportResolver for F
where
  F: Fn(&[String]) -> Option<String>,
{
  fn resolve(&self, module: &[String]) -> Option<String> {
    self(module)
  }
}

/// Modules keyed by their dotted path.
impl ImportResolver for HashMap<String, String> {
  fn resolve(&self, module: &[String]) -> Option<String> {
    self.get(&module.join(".")).cloned()
  }
}

/// Resolves the bundled `common` module and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinModules;

impl ImportResolver for BuiltinModules {
  fn resolve(&self, module: &[String]) -> Option<String> {
    match module {
      [name] if name == "common" => Some(COMMON.to_owned()),
      _ => None,
    }
  }
}

const COMMON: &str = r#"
DIGIT: "0".."9"
HEXDIGIT: "a".."f" | "A".."F" | DIGIT

INT: DIGIT+
SIGNED_INT: ["+" | "-"] INT
DECIMAL: INT "." INT? | "." INT

_EXP: ("e" | "E") SIGNED_INT
FLOAT: INT _EXP | DECIMAL _EXP?
SIGNED_FLOAT: ["+" | "-"] FLOAT

NUMBER: FLOAT | INT
SIGNED_NUMBER: ["+" | "-"] NUMBER

ESCAPED_STRING: /"(?:[^"\\]|\\.)*"/

LCASE_LETTER: "a".."z"
UCASE_LETTER: "A".."Z"
LETTER: UCASE_LETTER | LCASE_LETTER
WORD: LETTER+
CNAME: ("_" | LETTER) ("_" | LETTER | DIGIT)*

WS_INLINE: (" " | /\t/)+
WS: /[ \t\f\r\n]/+

CR: /\r/
LF: /\n/
NEWLINE: (CR? LF)+

SH_COMMENT: /#[^\n]*/
CPP_COMMENT: /\/\/[^\n]*/
C_COMMENT: "/*" /(.|\n)*?/ "*/"
"#;

pub(crate) fn resolve(
  grammar: Grammar,
  resolver: &dyn ImportResolver,
) -> Result<Grammar, GrammarError> {
  resolve_at(grammar, resolver, 0)
}

fn resolve_at(
  grammar: Grammar,
  resolver: &dyn ImportResolver,
  depth: usize,
) -> Result<Grammar, GrammarError> {
  let mut decls = vec![];
  let mut imported: Map<String, (String, Spanned<Decl>)> = Map::default();

  for decl in grammar {
    let Spanned(span, decl) = decl;
    let import = match decl {
      Decl::Import(import) => import,
      decl => {
        decls.push(Spanned(span, decl));
        continue;
      }
    };

    let module = import.module.join(".");
    if depth >= MAX_DEPTH {
      return Err(GrammarError::UnresolvedImport {
        module,
        message: "imports nest too deeply".to_owned(),
        span,
      });
    }

    let text = resolver.resolve(&import.module)
      .ok_or_else(|| GrammarError::UnresolvedImport {
        module: module.clone(),
        message: "module not found".to_owned(),
        span,
      })?;

    let module_grammar = grammar_parser::parse(&text)
      .and_then(|grammar| resolve_at(grammar, resolver, depth + 1))
      .map_err(|err| GrammarError::UnresolvedImport {
        module: module.clone(),
        message: err.to_string(),
        span,
      })?;

    let namespace = import.module.last()
      .map(|segment| segment.trim_start_matches('.').to_owned())
      .unwrap_or_default();

    let decls_in = import_names(&module_grammar, &namespace, &import.names, span)
      .map_err(|message| GrammarError::UnresolvedImport {
        module: module.clone(),
        message,
        span,
      })?;

    for (origin, decl) in decls_in {
      let key = decl.1.name().map(|n| n.1.clone()).unwrap_or_default();
      let origin = format!("{}.{}", module, origin);

      match imported.get(&key) {
        Some((existing, _)) if *existing != origin => {
          return Err(GrammarError::NameCollision {
            name: key,
            span: Some(span),
          });
        }
        Some(_) => {}
        None => {
          imported.insert(key, (origin, decl));
        }
      }
    }

    debug!(module = %module, names = import.names.len(), "resolved import");
  }

  let defined = decls.iter()
    .filter_map(|decl| decl.1.name().map(|n| n.1.as_str()))
    .collect::<Set<_>>();

  if let Some((name, (_, decl))) = imported.iter().find(|(name, _)| defined.contains(name.as_str())) {
    return Err(GrammarError::NameCollision {
      name: name.clone(),
      span: Some(decl.0),
    });
  }

  decls.extend(imported.into_iter().map(|(_, (_, decl))| decl));
  Ok(decls)
}

/// Returns the requested definitions and their dependencies, renamed, in
/// the module's declaration order, each paired with its name in the module.
fn import_names(
  module: &Grammar,
  namespace: &str,
  names: &[(Spanned<String>, Option<Spanned<String>>)],
  span: Span,
) -> Result<Vec<(String, Spanned<Decl>)>, String> {
  let defs = module.iter()
    .filter_map(|decl| decl.1.name().map(|n| (n.1.as_str(), &decl.1)))
    .collect::<HashMap<_, _>>();

  if let Some((name, _)) = names.iter().find(|(name, _)| !defs.contains_key(name.1.as_str())) {
    return Err(format!("`{}` is not defined in the module", name.1));
  }

  let mut closure = Set::default();
  let mut stack = names.iter().map(|(name, _)| name.1.as_str()).collect::<Vec<_>>();
  while let Some(current) = stack.pop() {
    if !closure.insert(current) {
      continue;
    }
    if let Some(decl) = defs.get(current) {
      let (exps, params) = match decl {
        Decl::Rule(rule) => (&rule.expansions, rule.params.as_slice()),
        Decl::Term(term) => (&term.expansions, &[][..]),
        _ => continue,
      };
      visit_expansion_names(exps, &mut |dep| {
        if let Some((&dep, _)) = defs.get_key_value(dep) {
          if !params.iter().any(|p| p.1 == dep) {
            stack.push(dep);
          }
        }
      });
    }
  }

  let renames = closure.iter()
    .map(|&dep| {
      let renamed = match names.iter().find(|(name, _)| name.1 == dep) {
        Some((_, Some(alias))) => alias.1.clone(),
        Some((_, None)) => dep.to_owned(),
        None => mangle(namespace, dep),
      };
      (dep.to_owned(), renamed)
    })
    .collect::<HashMap<_, _>>();

  let mut out = vec![];
  for decl in module {
    let decl_name = match decl.1.name() {
      Some(n) if closure.contains(n.1.as_str()) => n.1.clone(),
      _ => continue,
    };

    let mut decl = decl.1.clone();
    match &mut decl {
      Decl::Rule(rule) => {
        rule.name = Spanned(span, renames[&decl_name].clone());
        let params = rule.params.iter().map(|p| p.1.clone()).collect::<Vec<_>>();
        rename(&mut rule.expansions, &renames, &params);
        relocate(&mut rule.expansions, span);
        for param in &mut rule.params {
          param.0 = span;
        }
      }
      Decl::Term(term) => {
        term.name = Spanned(span, renames[&decl_name].clone());
        rename(&mut term.expansions, &renames, &[]);
        relocate(&mut term.expansions, span);
        term.body = span;
      }
      _ => continue,
    }
    out.push((decl_name, Spanned(span, decl)));
  }

  Ok(out)
}

fn mangle(namespace: &str, name: &str) -> String {
  let prefix = if is_terminal_name(name) {
    namespace.to_uppercase()
  } else {
    namespace.to_owned()
  };

  match name.strip_prefix('_') {
    Some(rest) => format!("_{}__{}", prefix, rest),
    None => format!("{}__{}", prefix, name),
  }
}

fn rename(exps: &mut [Alt], renames: &HashMap<String, String>, params: &[String]) {
  visit_expansion_names_mut(exps, &mut |name| {
    if params.contains(&name.1) {
      return;
    }
    if let Some(renamed) = renames.get(&name.1) {
      name.1 = renamed.clone();
    }
  });
}

/// Points every span at the import statement; module text is not
/// available to diagnostics.
fn relocate(exps: &mut [Alt], span: Span) {
  for alt in exps {
    alt.span = span;
    if let Some(alias) = &mut alt.alias {
      alias.0 = span;
    }
    for item in &mut alt.items {
      relocate_expr(item, span);
    }
  }
}

fn relocate_expr(expr: &mut Expr, span: Span) {
  match expr {
    Expr::Symbol(name) => name.0 = span,
    Expr::Literal(literal) => literal.0 = span,
    Expr::Range(range) => range.0 = span,
    Expr::Group(exps) | Expr::Maybe(exps) => relocate(exps, span),
    Expr::Repeat(inner, op) => {
      op.0 = span;
      relocate_expr(inner, span);
    }
    Expr::Template(name, args) => {
      name.0 = span;
      for arg in args {
        relocate(arg, span);
      }
    }
  }
}
