//! Recursive generators driven through the runner

use falsify::{
    BoxedGenerator, DepthIdentifier, FrequencyConstraints, Generator, Memo, RunConfig, Tie, Weighted, boolean,
    check_with_config, frequency_with, infinite_stream, integer, letrec, memo, one_of, property, vec_of,
};

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Num(i32),
    Add(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
}

impl Expr {
    fn eval(&self) -> i64 {
        match self {
            Expr::Num(n) => i64::from(*n),
            Expr::Add(left, right) => left.eval() + right.eval(),
            Expr::Neg(inner) => -inner.eval(),
        }
    }

    fn size(&self) -> usize {
        match self {
            Expr::Num(_) => 1,
            Expr::Add(left, right) => 1 + left.size() + right.size(),
            Expr::Neg(inner) => 1 + inner.size(),
        }
    }

    fn leaves(&self) -> Vec<i32> {
        match self {
            Expr::Num(n) => vec![*n],
            Expr::Add(left, right) => [left.leaves(), right.leaves()].concat(),
            Expr::Neg(inner) => inner.leaves(),
        }
    }
}

fn expressions() -> BoxedGenerator<Expr> {
    let depth = DepthIdentifier::new();
    let mut generators = letrec(|tie: &Tie<Expr>| {
        vec![
            (
                "expr",
                frequency_with(
                    vec![
                        Weighted::new(tie.tie("num"), 3),
                        Weighted::new(tie.tie("add"), 1),
                        Weighted::new(tie.tie("neg"), 1),
                    ],
                    FrequencyConstraints {
                        max_depth: Some(4),
                        depth_identifier: Some(depth),
                        ..Default::default()
                    },
                )
                .boxed(),
            ),
            ("num", integer(-100_i32, 100).map(Expr::Num).boxed()),
            (
                "add",
                (tie.tie("expr"), tie.tie("expr"))
                    .map(|(left, right)| Expr::Add(Box::new(left), Box::new(right)))
                    .boxed(),
            ),
            ("neg", tie.tie("expr").map(|inner| Expr::Neg(Box::new(inner))).boxed()),
        ]
    });
    match generators.remove("expr") {
        Some(generator) => generator,
        None => unreachable!("expr is defined above"),
    }
}

#[test]
fn test_letrec_expressions_shrink_within_domain() {
    let report = check_with_config(
        property(expressions(), |expr: Expr| expr.eval() < 150),
        &RunConfig::new().seed(17).num_runs(2000),
    )
    .unwrap();
    assert!(report.failed);
    let counterexample = report.counterexample.unwrap();
    assert!(counterexample.eval() >= 150);
    assert!(counterexample.size() >= 3, "{counterexample:?}");
    assert!(counterexample.leaves().iter().all(|n| (-100..=100).contains(n)));
}

#[test]
fn test_memo_trees_respect_depth() {
    #[derive(Debug, Clone)]
    enum Tree {
        Leaf(bool),
        Node(Vec<Tree>),
    }

    fn depth(tree: &Tree) -> usize {
        match tree {
            Tree::Leaf(_) => 0,
            Tree::Node(children) => 1 + children.iter().map(depth).max().unwrap_or(0),
        }
    }

    let trees = memo(|this: &Memo<Tree>, n| {
        let leaf = boolean().map(Tree::Leaf).boxed();
        if n <= 1 {
            return leaf;
        }
        one_of(vec![leaf, vec_of(this.at(n - 1), 0, 3).map(Tree::Node).boxed()]).boxed()
    });
    let report = check_with_config(
        property(trees.at(4), |tree: Tree| depth(&tree) < 4),
        &RunConfig::new().seed(2).num_runs(300),
    )
    .unwrap();
    assert!(report.passed());
}

#[test]
fn test_streams_feed_predicates_lazily() {
    let report = check_with_config(
        property(infinite_stream(integer(0_u32, 1000)), |stream: falsify::InfiniteStream<u32>| {
            stream.take(100).all(|value| value <= 1000)
        }),
        &RunConfig::new().seed(4).num_runs(20),
    )
    .unwrap();
    assert!(report.passed());

    let report = check_with_config(
        property(infinite_stream(integer(0_u32, 1000)), |stream: falsify::InfiniteStream<u32>| {
            stream.take(50).all(|value| value < 900)
        }),
        &RunConfig::new().seed(4),
    )
    .unwrap();
    assert!(report.failed);
    assert_eq!(report.num_shrinks, 0);
}
