//! Plain-text diagnostics for compile and parse errors.

use std::ops::Range;
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term::{self, termcolor::NoColor, Chars};
use crate::{CompileError, ParseError};

/// Renders `err` against the grammar text `source`, named `name`.
pub fn compile_error(name: &str, source: &str, err: &CompileError) -> String {
  let diagnostic = match err {
    CompileError::Grammar(err) => {
      let diagnostic = Diagnostic::error().with_message(err.to_string());
      match err.span() {
        Some((start, end)) => diagnostic.with_labels(vec![
          Label::primary((), clamp(source, start..end)),
        ]),
        None => diagnostic,
      }
    }
    CompileError::Conflict(err) => {
      let text = err.to_string();
      let (head, rest) = text.split_once('\n').unwrap_or((text.as_str(), ""));
      Diagnostic::error()
        .with_message(head.trim_end_matches(':'))
        .with_notes(vec![rest.trim().to_owned()])
    }
    CompileError::UnknownStartRule { .. } | CompileError::InvalidConfig(_) => {
      Diagnostic::error().with_message(err.to_string())
    }
  };

  render(name, source, &diagnostic)
}

/// Renders `err` against the parsed text `input`, named `name`.
pub fn parse_error(name: &str, input: &str, err: &ParseError) -> String {
  let range = match err {
    ParseError::UnexpectedToken { token, .. } => token.start..token.end,
    ParseError::NoMatchingTerminal { position, .. } => {
      let len = input.get(*position..)
        .and_then(|rest| rest.chars().next())
        .map_or(0, char::len_utf8);
      *position..*position + len
    }
    _ => err.position()..err.position(),
  };

  let mut diagnostic = Diagnostic::error()
    .with_message(err.to_string())
    .with_labels(vec![Label::primary((), clamp(input, range))]);
  if !err.expected().is_empty() {
    diagnostic = diagnostic.with_notes(vec![
      format!("expected one of: {}", err.expected().join(", ")),
    ]);
  }

  render(name, input, &diagnostic)
}

fn clamp(source: &str, range: Range<usize>) -> Range<usize> {
  let end = range.end.min(source.len());
  range.start.min(end)..end
}

fn render(name: &str, source: &str, diagnostic: &Diagnostic<()>) -> String {
  let file = SimpleFile::new(name, source);
  let config = term::Config {
    chars: Chars::ascii(),
    ..term::Config::default()
  };

  let mut out = NoColor::new(Vec::new());
  match term::emit(&mut out, &config, &file, diagnostic) {
    Ok(()) => String::from_utf8_lossy(&out.into_inner()).into_owned(),
    Err(_) => diagnostic.message.clone(),
  }
}
