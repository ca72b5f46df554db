use criterion::{criterion_group, criterion_main, Criterion};
use grammar::{BuiltinModules, TreeBuilder, TreeOptions};

static JSON: &str = r#"
?value: object
  | array
  | string
  | SIGNED_NUMBER -> number
  | "true" -> true
  | "false" -> false
  | "null" -> null

array: "[" [value ("," value)*] "]"
object: "{" [pair ("," pair)*] "}"
pair: string ":" value
string: ESCAPED_STRING

%import common.ESCAPED_STRING
%import common.SIGNED_NUMBER
%import common.WS
%ignore WS
"#;

fn document() -> String {
  let item = r#"{"id": 12, "tags": ["a", "b", "c"], "ratio": -0.5, "ok": true, "next": null}"#;
  format!("[{}]", vec![item; 200].join(",\n"))
}

fn json_benchmark(c: &mut Criterion) {
  let grammar = grammar::build(JSON, &BuiltinModules).unwrap();
  let start = grammar.nonterminal("value").unwrap();

  c.bench_function("json tables", |b| b.iter(|| lr::build(&grammar, start).unwrap()));

  let parser = lr::build(&grammar, start).unwrap();
  let tree = TreeBuilder::new(&grammar, start, TreeOptions::default());
  let input = document();
  c.bench_function("json parse", |b| b.iter(|| parser.parse(&grammar, &tree, &input).unwrap()));
}

criterion_group!{
  name = benches;
  config = Criterion::default().significance_level(0.1).sample_size(10);
  targets = json_benchmark
}
criterion_main!(benches);
