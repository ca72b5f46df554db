use std::fmt;
use bitvec::prelude::*;

/// A set of token ids, sized to the token count of a grammar plus the
/// end-of-input marker.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct TokenSet(BitVec);

impl TokenSet {
  pub fn new(len: usize) -> Self {
    Self(bitvec![0; len])
  }

  pub fn from_token(len: usize, token: usize) -> Self {
    let mut set = Self::new(len);
    set.insert(token);
    set
  }

  /// Returns whether the token was newly inserted.
  pub fn insert(&mut self, token: usize) -> bool {
    if token >= self.0.len() {
      self.0.resize(token + 1, false);
    }
    let old = self.0[token];
    self.0.set(token, true);
    !old
  }

  pub fn contains(&self, token: usize) -> bool {
    self.0.get(token).map_or(false, |bit| *bit)
  }

  /// Returns whether `self` has changed.
  pub fn union_with(&mut self, other: &Self) -> bool {
    if other.0.len() > self.0.len() {
      self.0.resize(other.0.len(), false);
    }

    let mut changed = false;
    for token in other.0.iter_ones() {
      if !self.0[token] {
        self.0.set(token, true);
        changed = true;
      }
    }
    changed
  }

  pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
    self.0.iter_ones()
  }

  pub fn is_empty(&self) -> bool {
    self.0.not_any()
  }

  pub fn len(&self) -> usize {
    self.0.count_ones()
  }

  pub fn clear(&mut self) {
    self.0.fill(false);
  }
}

impl fmt::Debug for TokenSet {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.debug_set().entries(self.iter()).finish()
  }
}

impl FromIterator<usize> for TokenSet {
  fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
    let mut set = Self::default();
    for token in iter {
      set.insert(token);
    }
    set
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn union_reports_change() {
    let mut a = TokenSet::from_token(4, 1);
    let b: TokenSet = vec![1, 3].into_iter().collect();

    assert!(a.union_with(&b));
    assert!(!a.union_with(&b));
    assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 3]);
    assert!(a.contains(3));
    assert!(!a.contains(7));
  }

  #[test]
  fn grows_on_insert() {
    let mut set = TokenSet::new(0);
    assert!(set.is_empty());
    assert!(set.insert(9));
    assert!(!set.insert(9));
    assert_eq!(set.len(), 1);
  }
}
