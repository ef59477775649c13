//! Symbolic-regression feature synthesis
//!
//! A small genetic-programming transformer: tournament selection,
//! subtree crossover, subtree mutation, parsimony-penalized
//! Pearson-correlation fitness, fit on the training partition only.

use ndarray::{s, Array2};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use tracing::debug;

use columnar::{Labels, TrainTestSplit};

use crate::config::Config;
use crate::diagnostics::{DiagnosticEvent, Diagnostics};

const POPULATION: usize = 120;
const GENERATIONS: usize = 15;
const TOURNAMENT: usize = 7;
const PARSIMONY: f64 = 0.001;
const MAX_NODES: usize = 64;
const CROSSOVER_P: f64 = 0.7;
const MUTATION_P: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    fn random(rng: &mut Pcg64Mcg) -> Self {
        match rng.random_range(0..4) {
            0 => Op::Add,
            1 => Op::Sub,
            2 => Op::Mul,
            _ => Op::Div,
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Op::Add => a + b,
            Op::Sub => a - b,
            Op::Mul => a * b,
            // protected division
            Op::Div => {
                if b.abs() < 1e-3 {
                    1.0
                } else {
                    a / b
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Var(usize),
    Const(f64),
    Branch(Op, Box<Node>, Box<Node>),
}

impl Node {
    fn random(rng: &mut Pcg64Mcg, nvars: usize, depth: usize) -> Self {
        if depth == 0 || rng.random::<f64>() < 0.25 {
            if rng.random::<f64>() < 0.8 {
                Node::Var(rng.random_range(0..nvars))
            } else {
                Node::Const(rng.random_range(-1.0..1.0))
            }
        } else {
            Node::Branch(
                Op::random(rng),
                Box::new(Node::random(rng, nvars, depth - 1)),
                Box::new(Node::random(rng, nvars, depth - 1)),
            )
        }
    }

    fn size(&self) -> usize {
        match self {
            Node::Branch(_, l, r) => 1 + l.size() + r.size(),
            _ => 1,
        }
    }

    fn eval(&self, row: &[f64]) -> f64 {
        match self {
            Node::Var(j) => row.get(*j).copied().unwrap_or(0.0),
            Node::Const(c) => *c,
            Node::Branch(op, l, r) => op.apply(l.eval(row), r.eval(row)),
        }
    }

    /// Pre-order subtree lookup
    fn subtree(&self, target: usize) -> &Node {
        fn walk<'a>(node: &'a Node, counter: &mut usize, target: usize) -> Option<&'a Node> {
            if *counter == target {
                return Some(node);
            }
            *counter += 1;
            match node {
                Node::Branch(_, l, r) => {
                    walk(l, counter, target).or_else(|| walk(r, counter, target))
                }
                _ => None,
            }
        }
        let mut counter = 0;
        walk(self, &mut counter, target).unwrap_or(self)
    }

    /// Pre-order subtree replacement
    fn replace(&mut self, target: usize, replacement: Node) {
        fn walk(node: &mut Node, counter: &mut usize, target: usize, replacement: &Node) -> bool {
            if *counter == target {
                *node = replacement.clone();
                return true;
            }
            *counter += 1;
            match node {
                Node::Branch(_, l, r) => {
                    walk(l, counter, target, replacement)
                        || walk(r, counter, target, replacement)
                }
                _ => false,
            }
        }
        let mut counter = 0;
        walk(self, &mut counter, target, &replacement);
    }
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    if a.is_empty() {
        return 0.0;
    }
    let ma = a.iter().sum::<f64>() / n;
    let mb = b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        cov += (x - ma) * (y - mb);
        va += (x - ma) * (x - ma);
        vb += (y - mb) * (y - mb);
    }
    if va <= 0.0 || vb <= 0.0 {
        return 0.0;
    }
    cov / (va * vb).sqrt()
}

fn evaluate(node: &Node, train: &Array2<f64>, y: &[f64]) -> f64 {
    let outputs: Vec<f64> = train
        .rows()
        .into_iter()
        .map(|row| node.eval(&row.to_vec()))
        .collect();
    if outputs.iter().any(|v| !v.is_finite()) {
        return f64::NEG_INFINITY;
    }
    pearson(&outputs, y).abs() - PARSIMONY * node.size() as f64
}

fn tournament(population: &[(Node, f64)], rng: &mut Pcg64Mcg) -> usize {
    let mut best = rng.random_range(0..population.len());
    for _ in 1..TOURNAMENT {
        let challenger = rng.random_range(0..population.len());
        if population[challenger].1 > population[best].1 {
            best = challenger;
        }
    }
    best
}

/// Fit the transformer on the training partition and synthesize
/// `gfeatures` standardized columns over all rows
pub(crate) fn genetic_features(
    base: &Array2<f64>,
    split: TrainTestSplit,
    labels: &Labels,
    config: &Config,
    diag: &mut Diagnostics,
) -> Array2<f64> {
    let n = base.nrows();
    let nvars = base.ncols();
    if nvars == 0 {
        return Array2::zeros((n, 0));
    }
    let train = base.slice(s![..split.point().min(n), ..]).to_owned();
    let y = &labels.values;
    let mut rng = Pcg64Mcg::seed_from_u64(config.seed);

    // ramped initial depths
    let mut population: Vec<(Node, f64)> = (0..POPULATION)
        .map(|i| {
            let node = Node::random(&mut rng, nvars, 2 + i % 3);
            let fitness = evaluate(&node, &train, y);
            (node, fitness)
        })
        .collect();

    for generation in 0..GENERATIONS {
        let mut next = Vec::with_capacity(POPULATION);
        for _ in 0..POPULATION {
            let parent = population[tournament(&population, &mut rng)].0.clone();
            let roll: f64 = rng.random();
            let mut child = if roll < CROSSOVER_P {
                let donor = &population[tournament(&population, &mut rng)].0;
                let mut child = parent.clone();
                let point = rng.random_range(0..child.size());
                let graft = donor.subtree(rng.random_range(0..donor.size())).clone();
                child.replace(point, graft);
                child
            } else if roll < CROSSOVER_P + MUTATION_P {
                let mut child = parent.clone();
                let point = rng.random_range(0..child.size());
                child.replace(point, Node::random(&mut rng, nvars, 2));
                child
            } else {
                parent.clone()
            };
            if child.size() > MAX_NODES {
                child = parent;
            }
            let fitness = evaluate(&child, &train, y);
            next.push((child, fitness));
        }
        population = next;
        if let Some(best) = population
            .iter()
            .map(|(_, f)| *f)
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        {
            debug!(generation, best, "symbolic transformer generation");
        }
    }

    population.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let count = if config.gfeatures > population.len() {
        diag.record(DiagnosticEvent::ComponentsClamped {
            generator: "genetic",
            requested: config.gfeatures,
            available: population.len(),
        });
        population.len()
    } else {
        config.gfeatures
    };

    let mut out = Array2::zeros((n, count));
    for (j, (node, _)) in population.iter().take(count).enumerate() {
        for (i, row) in base.rows().into_iter().enumerate() {
            out[[i, j]] = node.eval(&row.to_vec());
        }
    }
    super::clean_standardize(out)
}
