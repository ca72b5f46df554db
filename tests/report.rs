use sprig::{report, Algorithm, Config};

#[test]
fn grammar_errors_point_into_the_grammar() {
  let source = "start: item\nitem: missing_rule\n";
  let err = sprig::compile(source, &Config::default()).err().unwrap();

  let text = report::compile_error("calc.lark", source, &err);
  assert!(text.starts_with("error: undefined symbol `missing_rule`"), "{}", text);
  assert!(text.contains("calc.lark:2:7"), "{}", text);
}

#[test]
fn conflicts_list_the_productions() {
  let source = "start: a | b\na: X\nb: X\nX: \"x\"\n";
  let config = Config::default().with_algorithm(Algorithm::Deterministic);
  let err = sprig::compile(source, &config).err().unwrap();

  let text = report::compile_error("ab.lark", source, &err);
  assert!(text.starts_with("error: reduce-reduce conflict at state"), "{}", text);
  assert!(text.contains("a -> X"), "{}", text);
  assert!(text.contains("b -> X"), "{}", text);
}

#[test]
fn parse_errors_point_into_the_input() {
  let parser = sprig::compile(
    "start: NUMBER (\"+\" NUMBER)*\n%import common.NUMBER\n",
    &Config::default().with_algorithm(Algorithm::Deterministic),
  ).unwrap();

  let err = parser.parse("1++2").err().unwrap();
  let text = report::parse_error("input", "1++2", &err);
  assert!(text.starts_with("error: unexpected token PLUS"), "{}", text);
  assert!(text.contains("input:1:3"), "{}", text);
  assert!(text.contains("expected one of: NUMBER"), "{}", text);
}

#[test]
fn end_of_input_is_labelled_at_the_end() {
  let parser = sprig::compile("start: \"(\" \")\"\n", &Config::default()).unwrap();

  let err = parser.parse("(").err().unwrap();
  let text = report::parse_error("input", "(", &err);
  assert!(text.contains("input:1:2"), "{}", text);
}
