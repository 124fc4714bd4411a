//! Gradient-boosted tree ensemble
//!
//! Depth-limited regression trees fitted to the logistic loss with Newton
//! boosting: each round fits one tree to the current gradients/hessians and
//! exact greedy splits maximize the regularized gain. The validation set
//! only drives early stopping; it never influences a split.

use fitscore_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

fn default_rounds() -> usize {
    200
}

fn default_learning_rate() -> f32 {
    0.1
}

fn default_max_depth() -> usize {
    3
}

fn default_min_samples_leaf() -> usize {
    2
}

fn default_lambda() -> f32 {
    1.0
}

fn default_early_stopping_rounds() -> usize {
    10
}

/// Boosting hyperparameters. All fields default so API callers can
/// override selectively.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GbdtParams {
    #[serde(default = "default_rounds")]
    pub rounds: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    /// L2 regularization on leaf weights.
    #[serde(default = "default_lambda")]
    pub lambda: f32,
    /// Rounds without validation improvement before stopping. Ignored when
    /// the validation partition is empty.
    #[serde(default = "default_early_stopping_rounds")]
    pub early_stopping_rounds: usize,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
            learning_rate: default_learning_rate(),
            max_depth: default_max_depth(),
            min_samples_leaf: default_min_samples_leaf(),
            lambda: default_lambda(),
            early_stopping_rounds: default_early_stopping_rounds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        weight: f32,
    },
}

/// One regression tree; the root is always node 0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, features: &[f32]) -> f32 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { weight } => return *weight,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

#[inline]
pub fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

/// A fitted ensemble. Immutable once fitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Gbdt {
    base_score: f32,
    trees: Vec<Tree>,
}

impl Gbdt {
    #[must_use]
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Raw additive margin (log-odds).
    #[must_use]
    pub fn margin(&self, features: &[f32]) -> f32 {
        self.base_score
            + self
                .trees
                .iter()
                .map(|tree| tree.predict(features))
                .sum::<f32>()
    }

    /// Match probability in [0, 1].
    #[must_use]
    pub fn predict_probability(&self, features: &[f32]) -> f32 {
        sigmoid(self.margin(features))
    }

    /// Fit an ensemble. `cancel` is checked between rounds; a raised flag
    /// aborts with a training error and the partial ensemble is discarded.
    pub fn fit(
        params: &GbdtParams,
        train_x: &[Vec<f32>],
        train_y: &[u8],
        valid_x: &[Vec<f32>],
        valid_y: &[u8],
        cancel: &AtomicBool,
    ) -> Result<Gbdt> {
        debug_assert_eq!(train_x.len(), train_y.len());
        debug_assert_eq!(valid_x.len(), valid_y.len());

        let n = train_x.len();
        let positives = train_y.iter().filter(|&&y| y == 1).count();
        let prior = (positives as f32 / n as f32).clamp(1e-6, 1.0 - 1e-6);
        let base_score = (prior / (1.0 - prior)).ln();

        let mut model = Gbdt {
            base_score,
            trees: Vec::new(),
        };
        let mut train_margins = vec![base_score; n];
        let mut valid_margins = vec![base_score; valid_x.len()];

        let mut best_loss = f32::INFINITY;
        let mut best_round = 0usize;

        for round in 0..params.rounds {
            if cancel.load(Ordering::Acquire) {
                return Err(Error::Training("training cancelled".to_string()));
            }

            let mut grad = vec![0.0f32; n];
            let mut hess = vec![0.0f32; n];
            for i in 0..n {
                let p = sigmoid(train_margins[i]);
                grad[i] = p - train_y[i] as f32;
                hess[i] = (p * (1.0 - p)).max(1e-12);
            }

            let mut builder = TreeBuilder {
                x: train_x,
                grad: &grad,
                hess: &hess,
                params,
                nodes: Vec::new(),
            };
            let indices: Vec<usize> = (0..n).collect();
            builder.build(indices, 0);
            let tree = Tree {
                nodes: builder.nodes,
            };

            for (i, margin) in train_margins.iter_mut().enumerate() {
                *margin += tree.predict(&train_x[i]);
            }
            for (i, margin) in valid_margins.iter_mut().enumerate() {
                *margin += tree.predict(&valid_x[i]);
            }
            model.trees.push(tree);

            if !valid_x.is_empty() {
                let loss = logistic_loss(&valid_margins, valid_y);
                if loss < best_loss {
                    best_loss = loss;
                    best_round = round;
                } else if round - best_round >= params.early_stopping_rounds {
                    debug!(round, best_round, best_loss, "early stopping");
                    model.trees.truncate(best_round + 1);
                    break;
                }
            }
        }

        if !valid_x.is_empty() {
            model.trees.truncate(best_round + 1);
        }
        Ok(model)
    }
}

fn logistic_loss(margins: &[f32], labels: &[u8]) -> f32 {
    let mut total = 0.0f32;
    for (margin, &label) in margins.iter().zip(labels) {
        let p = sigmoid(*margin).clamp(1e-7, 1.0 - 1e-7);
        total -= if label == 1 { p.ln() } else { (1.0 - p).ln() };
    }
    total / margins.len().max(1) as f32
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f32>],
    grad: &'a [f32],
    hess: &'a [f32],
    params: &'a GbdtParams,
    nodes: Vec<Node>,
}

struct Split {
    feature: usize,
    threshold: f32,
    gain: f32,
}

impl TreeBuilder<'_> {
    /// Build the subtree for `indices`, returning its node index. The first
    /// call owns node 0, so the root is always at index 0.
    fn build(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let grad_sum: f32 = indices.iter().map(|&i| self.grad[i]).sum();
        let hess_sum: f32 = indices.iter().map(|&i| self.hess[i]).sum();

        let leaf_weight = -grad_sum / (hess_sum + self.params.lambda) * self.params.learning_rate;

        if depth >= self.params.max_depth
            || indices.len() < (2 * self.params.min_samples_leaf).max(2)
        {
            self.nodes.push(Node::Leaf {
                weight: leaf_weight,
            });
            return self.nodes.len() - 1;
        }

        let split = match self.best_split(&indices, grad_sum, hess_sum) {
            Some(split) if split.gain > 1e-6 => split,
            _ => {
                self.nodes.push(Node::Leaf {
                    weight: leaf_weight,
                });
                return self.nodes.len() - 1;
            }
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[i][split.feature] <= split.threshold);

        let node_idx = self.nodes.len();
        // Placeholder so children get later indices.
        self.nodes.push(Node::Leaf { weight: 0.0 });
        let left = self.build(left_indices, depth + 1);
        let right = self.build(right_indices, depth + 1);
        self.nodes[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }

    fn best_split(&self, indices: &[usize], grad_sum: f32, hess_sum: f32) -> Option<Split> {
        let lambda = self.params.lambda;
        let parent_score = grad_sum * grad_sum / (hess_sum + lambda);
        let num_features = self.x.first().map_or(0, |row| row.len());
        let mut best: Option<Split> = None;

        let mut order: Vec<usize> = Vec::with_capacity(indices.len());
        for feature in 0..num_features {
            order.clear();
            order.extend_from_slice(indices);
            order.sort_by(|&a, &b| {
                self.x[a][feature]
                    .partial_cmp(&self.x[b][feature])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut grad_left = 0.0f32;
            let mut hess_left = 0.0f32;
            for pos in 0..order.len() - 1 {
                let i = order[pos];
                grad_left += self.grad[i];
                hess_left += self.hess[i];

                let value = self.x[i][feature];
                let next_value = self.x[order[pos + 1]][feature];
                if value == next_value {
                    continue;
                }
                let left_count = pos + 1;
                let right_count = order.len() - left_count;
                if left_count < self.params.min_samples_leaf
                    || right_count < self.params.min_samples_leaf
                {
                    continue;
                }

                let grad_right = grad_sum - grad_left;
                let hess_right = hess_sum - hess_left;
                let gain = grad_left * grad_left / (hess_left + lambda)
                    + grad_right * grad_right / (hess_right + lambda)
                    - parent_score;

                if best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(Split {
                        feature,
                        threshold: (value + next_value) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}
