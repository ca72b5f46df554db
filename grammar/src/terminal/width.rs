//! Static upper bound on the number of characters a regex can match.

pub const UNBOUNDED: usize = usize::MAX;

#[derive(Default)]
struct Frame {
  /// Widest alternative closed so far.
  best: usize,
  /// Width of the current alternative, without its last atom.
  seq: usize,
  /// Width of the last atom, still open to a quantifier.
  last: usize,
}

impl Frame {
  fn push_atom(&mut self, width: usize) {
    self.seq = self.seq.saturating_add(self.last);
    self.last = width;
  }

  fn width(&self) -> usize {
    self.best.max(self.seq.saturating_add(self.last))
  }
}

pub fn max_width(regex: &str) -> usize {
  let chars = regex.chars().collect::<Vec<_>>();
  let mut stack = vec![Frame::default()];
  let mut i = 0;

  macro_rules! top {
    () => {
      match stack.last_mut() {
        Some(frame) => frame,
        None => return UNBOUNDED,
      }
    };
  }

  while i < chars.len() {
    match chars[i] {
      '\\' => {
        let width = match chars.get(i + 1) {
          Some('A' | 'z' | 'b' | 'B') => 0,
          Some('x' | 'u' | 'p' | 'P') if chars.get(i + 2) == Some(&'{') => {
            while i + 1 < chars.len() && chars[i + 1] != '}' {
              i += 1;
            }
            1
          }
          Some('x') => {
            i += 2;
            1
          }
          Some('p' | 'P') => {
            i += 1;
            1
          }
          Some(_) => 1,
          None => 0,
        };
        top!().push_atom(width);
        i += 2;
        continue;
      }
      '[' => {
        i = skip_class(&chars, i);
        top!().push_atom(1);
        continue;
      }
      '(' => {
        if chars.get(i + 1) == Some(&'?') {
          // `(?flags)` sets flags without opening a group
          let mut j = i + 2;
          while chars.get(j).map_or(false, |&c| c.is_ascii_alphabetic() || c == '-') {
            j += 1;
          }
          if chars.get(j) == Some(&')') {
            i = j + 1;
            continue;
          }
          if chars.get(j) != Some(&':') {
            // named group
            while j < chars.len() && chars[j] != '>' {
              j += 1;
            }
          }
          i = j;
        }
        stack.push(Frame::default());
      }
      ')' => {
        let width = match stack.pop() {
          Some(frame) => frame.width(),
          None => return UNBOUNDED,
        };
        top!().push_atom(width);
      }
      '|' => {
        let frame = top!();
        frame.best = frame.width();
        frame.seq = 0;
        frame.last = 0;
      }
      '*' | '+' => {
        let frame = top!();
        if frame.last > 0 {
          frame.last = UNBOUNDED;
        }
      }
      '?' => {}
      '{' => {
        let end = chars[i..].iter().position(|&c| c == '}').map(|k| i + k);
        let bound = end.and_then(|end| {
          let body = chars[i + 1..end].iter().collect::<String>();
          repeat_bound(&body)
        });
        match (end, bound) {
          (Some(end), Some(bound)) => {
            let frame = top!();
            frame.last = match bound {
              Some(max) => frame.last.saturating_mul(max),
              None if frame.last > 0 => UNBOUNDED,
              None => 0,
            };
            i = end;
          }
          _ => top!().push_atom(1),
        }
      }
      '^' | '$' => top!().push_atom(0),
      _ => top!().push_atom(1),
    }
    i += 1;
  }

  stack.iter().rev().fold(0, |inner, frame| frame.width().max(inner))
}

/// `Some(Some(max))` for `{n}` and `{n,m}`, `Some(None)` for `{n,}`.
fn repeat_bound(body: &str) -> Option<Option<usize>> {
  match body.split_once(',') {
    None => body.trim().parse().ok().map(Some),
    Some((min, max)) => {
      min.trim().parse::<usize>().ok()?;
      if max.trim().is_empty() {
        Some(None)
      } else {
        max.trim().parse().ok().map(Some)
      }
    }
  }
}

/// Returns the index just past the class opened at `start`.
fn skip_class(chars: &[char], start: usize) -> usize {
  let mut i = start + 1;
  if chars.get(i) == Some(&'^') {
    i += 1;
  }
  if chars.get(i) == Some(&']') {
    i += 1;
  }

  let mut depth = 1;
  while i < chars.len() {
    match chars[i] {
      '\\' => i += 1,
      '[' => depth += 1,
      ']' => {
        depth -= 1;
        if depth == 0 {
          return i + 1;
        }
      }
      _ => {}
    }
    i += 1;
  }
  i
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bounded() {
    assert_eq!(max_width("abc"), 3);
    assert_eq!(max_width("a|bcd"), 3);
    assert_eq!(max_width("a{2,3}"), 3);
    assert_eq!(max_width("[a-z]{4}"), 4);
    assert_eq!(max_width("(?i:ab)c?"), 3);
    assert_eq!(max_width(r"\Ax[\]]"), 2);
    assert_eq!(max_width("(?P<n>ab|c)d"), 3);
  }

  #[test]
  fn unbounded() {
    assert_eq!(max_width(r"\d+"), UNBOUNDED);
    assert_eq!(max_width("(ab)*c"), UNBOUNDED);
    assert_eq!(max_width("a{2,}"), UNBOUNDED);
  }

  #[test]
  fn monotone_under_extension() {
    assert!(max_width("ab") <= max_width("abc"));
    assert!(max_width("a") <= max_width("a|bc"));
  }
}
