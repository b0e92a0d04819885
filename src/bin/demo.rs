use std::rc::Rc;

use tracing_subscriber::EnvFilter;

use cubechart::chart::Chart;
use cubechart::config::ChartConfig;
use cubechart::feature::{FeatureFunction, RuleScoreFeature};
use cubechart::lattice::{Lattice, Sentence};
use cubechart::matcher::NonterminalMatcher;
use cubechart::scfg_grammar::Grammar;
use cubechart::text_grammar::build_trie;
use cubechart::vocab::Vocabulary;

const TOY_GRAMMAR: &str = r#"
# S -> X X, each X a terminal choice.
S -> X X ; 0.0
X -> "a" ; -1.0
X -> "b" ; -2.0
"#;

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let mut vocab = Vocabulary::new();
  let trie = build_trie(&mut vocab, TOY_GRAMMAR).expect("toy grammar parses");
  let grammar = Grammar::new("toy", trie, NonterminalMatcher::exact());

  let a = vocab.id("a").expect("toy grammar defines \"a\"");
  let b = vocab.id("b").expect("toy grammar defines \"b\"");
  let goal = vocab.id("S").expect("toy grammar defines S");

  let sentence = Sentence::new(0, Lattice::from_sentence(&[a, b]));
  let functions: Vec<Rc<dyn FeatureFunction>> = vec![Rc::new(RuleScoreFeature)];
  let config = ChartConfig {
    pop_limit: 0,
    ..Default::default()
  };

  let mut chart = Chart::new(&sentence, &vocab, vec![&grammar], functions, None, goal, config);

  match chart.expand() {
    Some(hg) => {
      let cell = chart.get_cell(hg.span.0, hg.span.1);
      println!(
        "1-best derivation: span {:?}, lhs=S, score={:.3}",
        hg.span,
        cell.node(hg.root).best_score
      );
    }
    None => println!("no derivation"),
  }
}
