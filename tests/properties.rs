use pretty_assertions::assert_eq;
use sprig::{Algorithm, Child, CompileError, Config, LexerMode, ParseError, Tree};

const BOTH: [Algorithm; 2] = [Algorithm::Chart, Algorithm::Deterministic];

fn shape(tree: &Tree) -> String {
  let children = tree.children.iter()
    .map(|child| match child {
      Child::Tree(tree) => shape(tree),
      Child::Token(token) => format!("{}:{:?}", token.terminal, token.text),
      Child::Absent => "_".to_owned(),
    })
    .collect::<Vec<_>>();
  format!("{}[{}]", tree.tag, children.join(", "))
}

fn texts(tree: &Tree) -> Vec<String> {
  tree.tokens().into_iter().map(|token| token.text.clone()).collect()
}

#[test]
fn first_alternative_of_a_terminal_wins() {
  let parser = sprig::compile(
    "start: (A | B)+\nA: \"a\" | \"ab\"\nB: \"b\"\n",
    &Config::default(),
  ).unwrap();

  let tree = parser.parse("ab").unwrap();
  assert_eq!(shape(&tree), r#"start[A:"a", B:"b"]"#);
}

#[test]
fn exact_repetition() {
  let grammar = "four_words: word ~ 4\nword: WORD\n%import common.WORD\n%ignore \" \"\n";

  for algorithm in BOTH {
    let config = Config::default()
      .with_start("four_words")
      .with_algorithm(algorithm);
    let parser = sprig::compile(grammar, &config).unwrap();

    let tree = parser.parse("a b c d").unwrap();
    assert_eq!(tree.children.len(), 4, "{:?}", algorithm);
    assert!(parser.parse("a b c").is_err(), "{:?}", algorithm);
    assert!(parser.parse("a b c d e").is_err(), "{:?}", algorithm);
  }
}

#[test]
fn ranged_repetition() {
  let parser = sprig::compile("start: A ~ 2..3\nA: \"a\"\n", &Config::default()).unwrap();

  assert!(parser.parse("a").is_err());
  assert_eq!(parser.parse("aa").unwrap().children.len(), 2);
  assert_eq!(parser.parse("aaa").unwrap().children.len(), 3);
  assert!(parser.parse("aaaa").is_err());
}

#[test]
fn conflicts_fail_only_in_deterministic_mode() {
  let grammar = "start: a | b\na: X\nb: X\nX: \"x\"\n";

  let deterministic = Config::default().with_algorithm(Algorithm::Deterministic);
  match sprig::compile(grammar, &deterministic) {
    Err(CompileError::Conflict(err)) => {
      assert_eq!(err.kind, sprig::ConflictKind::ReduceReduce);
      assert_eq!(err.productions, vec!["a -> X", "b -> X"]);
    }
    other => panic!("unexpected {:?}", other.map(|_| ())),
  }

  let parser = sprig::compile(grammar, &Config::default()).unwrap();
  assert_eq!(shape(&parser.parse("x").unwrap()), r#"start[a[X:"x"]]"#);
}

#[test]
fn priority_resolves_conflicts() {
  let grammar = "start: a | b\na: X\nb.2: X\nX: \"x\"\n";

  for algorithm in BOTH {
    let parser = sprig::compile(grammar, &Config::default().with_algorithm(algorithm)).unwrap();
    assert_eq!(shape(&parser.parse("x").unwrap()), r#"start[b[X:"x"]]"#, "{:?}", algorithm);
  }
}

#[test]
fn placeholders() {
  let grammar = "item: [A] B\nA: \"a\"\nB: \"b\"\n";

  for algorithm in BOTH {
    let config = Config::default()
      .with_start("item")
      .with_algorithm(algorithm);

    let parser = sprig::compile(grammar, &config.clone().with_maybe_placeholders(true)).unwrap();
    assert_eq!(shape(&parser.parse("b").unwrap()), r#"item[_, B:"b"]"#);
    assert_eq!(shape(&parser.parse("ab").unwrap()), r#"item[A:"a", B:"b"]"#);

    let parser = sprig::compile(grammar, &config).unwrap();
    assert_eq!(shape(&parser.parse("b").unwrap()), r#"item[B:"b"]"#);
  }
}

#[test]
fn ignored_terminals() {
  let grammar = r#"
start: pair+
pair: WORD "=" WORD
%import common.WORD
%import common.WS
%ignore WS
"#;
  let input = " a = b  c=d ";

  for algorithm in BOTH {
    let config = Config::default().with_algorithm(algorithm);

    let parser = sprig::compile(grammar, &config).unwrap();
    let tree = parser.parse(input).unwrap();
    assert_eq!(texts(&tree), vec!["a", "b", "c", "d"]);

    let parser = sprig::compile(grammar, &config.with_keep_all_tokens(true)).unwrap();
    let tree = parser.parse(input).unwrap();
    assert_eq!(texts(&tree), vec![" ", "a", " ", "=", " ", "b", "  ", "c", "=", "d", " "]);
    assert_eq!(
      shape(&tree),
      r#"start[WS:" ", pair[WORD:"a", WS:" ", EQUAL:"=", WS:" ", WORD:"b"], WS:"  ", pair[WORD:"c", EQUAL:"=", WORD:"d"], WS:" "]"#);
  }
}

#[test]
fn algorithms_agree_on_unambiguous_grammars() {
  let grammar = r#"
?value: dict
  | list
  | ESCAPED_STRING
  | SIGNED_NUMBER
  | "true" -> true
  | "null" -> null
list: "[" [value ("," value)*] "]"
dict: "{" [pair ("," pair)*] "}"
pair: ESCAPED_STRING ":" value

%import common.ESCAPED_STRING
%import common.SIGNED_NUMBER
%import common.WS
%ignore WS
"#;
  let input = r#"{"a": [1, -2.5, true], "b": {}, "c": null, "d": []}"#;

  let trees = BOTH.iter()
    .map(|&algorithm| {
      let config = Config::default()
        .with_start("value")
        .with_algorithm(algorithm)
        .with_maybe_placeholders(true);
      sprig::compile(grammar, &config).unwrap().parse(input).unwrap()
    })
    .collect::<Vec<_>>();

  assert_eq!(trees[0], trees[1]);
  assert_eq!(
    shape(&trees[0]),
    concat!(
      r#"dict[pair[ESCAPED_STRING:"\"a\"", list[SIGNED_NUMBER:"1", SIGNED_NUMBER:"-2.5", true[]]], "#,
      r#"pair[ESCAPED_STRING:"\"b\"", dict[_, _]], "#,
      r#"pair[ESCAPED_STRING:"\"c\"", null[]], "#,
      r#"pair[ESCAPED_STRING:"\"d\"", list[_, _]]]"#,
    ));
}

#[test]
fn compiling_twice_gives_the_same_trees() {
  let grammar = "start: expr\n?expr: expr \"+\" NUMBER -> add\n  | NUMBER\n%import common.NUMBER\n";

  let first = sprig::compile(grammar, &Config::default()).unwrap();
  let second = sprig::compile(grammar, &Config::default()).unwrap();
  for input in ["1", "1+2", "1+2+3"] {
    assert_eq!(first.parse(input).unwrap(), second.parse(input).unwrap());
  }
}

#[test]
fn parsers_survive_parse_errors() {
  let parser = sprig::compile(
    "start: A B\nA: \"a\"\nB: \"b\"\n",
    &Config::default().with_algorithm(Algorithm::Deterministic),
  ).unwrap();

  assert!(matches!(parser.parse("a"), Err(ParseError::UnexpectedEndOfInput { position: 1, .. })));
  assert!(matches!(parser.parse("ax"), Err(ParseError::NoMatchingTerminal { position: 1, .. })));
  assert!(parser.parse("ab").is_ok());
}

#[test]
fn configuration_errors() {
  let grammar = "start: A\nA: \"a\"\n";

  assert!(matches!(
    sprig::compile(grammar, &Config::default().with_start("missing")),
    Err(CompileError::UnknownStartRule { name }) if name == "missing"));

  let standard_lalr = Config::default()
    .with_algorithm(Algorithm::Deterministic)
    .with_lexer(LexerMode::Standard);
  assert!(matches!(sprig::compile(grammar, &standard_lalr), Err(CompileError::InvalidConfig(_))));
}

#[test]
fn lexing_for_diagnostics() {
  let parser = sprig::compile(
    "start: (NAME | IF)*\nIF: \"if\"\nNAME: /[a-z]+/\n%ignore \" \"\n",
    &Config::default(),
  ).unwrap();

  let tokens = parser.lex("if iffy")
    .map(|token| token.map(|token| token.terminal))
    .collect::<Result<Vec<_>, _>>()
    .unwrap();
  assert_eq!(tokens, vec!["IF", "NAME"]);
}
