use grammar::{Cursor, Grammar, ParseError, Token, Tree, TreeBuilder, Value};
use crate::builder::ACCEPT;
use crate::{LrParser, EOF_NAME};

impl LrParser {
  /// Parses `input` with the contextual lexer, admitting in each state only
  /// the tokens that have an action.
  pub fn parse(
    &self,
    grammar: &Grammar,
    tree: &TreeBuilder,
    input: &str,
  ) -> Result<Tree, ParseError> {
    let lexer = &grammar.lexer;
    let mut cursor = Cursor::default();
    let mut ignored = vec![];
    let keep_ignored = tree.keeps_all_tokens();

    let mut states = vec![0usize];
    let mut values = Vec::<Value>::new();

    let next = |state: usize, cursor: &mut Cursor, ignored: &mut Vec<Token>| {
      let ignored = if keep_ignored { Some(ignored) } else { None };
      lexer.next_token(input, cursor, Some(&self.expected[state]), ignored)
    };

    let mut lookahead = next(0, &mut cursor, &mut ignored)?;

    loop {
      let state = states[states.len() - 1];
      let token = lookahead.as_ref().map_or(self.eof, |token| token.kind.index());
      let action = self.tables.action[state][token];

      if action == ACCEPT {
        let value = values.pop().unwrap_or(Value::Spliced(vec![]));
        return Ok(tree.finish(value, ignored));
      } else if action > 0 {
        let to_state = action as usize;
        if let Some(token) = lookahead.take() {
          values.push(Value::Leaf(token));
        }
        states.push(to_state);
        lookahead = next(to_state, &mut cursor, &mut ignored)?;
      } else if action < 0 {
        let prod = (-action - 1) as usize;
        let (len, nt) = self.prods[prod];

        let children = values.split_off(values.len() - len);
        states.truncate(states.len() - len);
        values.push(tree.reduce(prod, children));

        let top = states[states.len() - 1];
        states.push(self.tables.goto[nt][top] as usize);
      } else {
        let expected = self.expected_names(grammar, state);
        return Err(match lookahead {
          Some(token) => ParseError::UnexpectedToken {
            token,
            expected,
          },
          None => ParseError::UnexpectedEndOfInput {
            position: input.len(),
            expected,
          },
        });
      }
    }
  }

  fn expected_names(&self, grammar: &Grammar, state: usize) -> Vec<String> {
    let set = &self.expected[state];
    let mut names = grammar.lexer.names_of(set);
    if set.contains(self.eof) {
      names.push(EOF_NAME.to_owned());
    }
    names
  }
}
