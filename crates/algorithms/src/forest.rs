//! Random-forest classifier
//!
//! A bagged ensemble of CART decision trees: bootstrap resampling per
//! tree, random feature subsets (√n) at every split, gini impurity,
//! majority vote at prediction time. Small, fully deterministic for a
//! fixed seed, and serializable so a fitted model can be persisted
//! keyed by its training-parameter tuple.
//!
//! A fitted [`RandomForest`] is immutable: classification takes `&self`
//! and the same model is shared read-only across target years.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use benthos_core::{ClassLabel, Error, Result};

use crate::sampling::TrainingSample;

/// Tunables for [`RandomForest::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestParams {
    /// Number of trees in the ensemble
    pub n_trees: usize,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples in a leaf
    pub min_leaf: usize,
    /// Base seed; each tree derives its own stream from it
    pub seed: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_trees: 50,
            max_depth: 12,
            min_leaf: 2,
            seed: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        class: ClassLabel,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// One CART tree of the ensemble, stored as a flat node arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn predict(&self, features: &[f64]) -> ClassLabel {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { class } => return *class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// A trained multi-class ensemble classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    classes: Vec<ClassLabel>,
}

impl RandomForest {
    /// Fit a forest from a training sample.
    ///
    /// The sample may contain any subset of the nominal class space;
    /// fewer classes than the legend is fine. An empty sample is an
    /// error; the pipeline short-circuits that case before training.
    pub fn fit(sample: &TrainingSample, params: &RandomForestParams) -> Result<Self> {
        if sample.is_empty() {
            return Err(Error::Algorithm("cannot train on an empty sample".to_string()));
        }
        if params.n_trees == 0 {
            return Err(Error::InvalidParameter {
                name: "n_trees",
                value: "0".to_string(),
                reason: "ensemble needs at least one tree".to_string(),
            });
        }

        let n_features = sample.feature_names.len();
        let mtry = (n_features as f64).sqrt().ceil() as usize;
        let classes = sample.classes_present();

        let trees: Vec<DecisionTree> = (0..params.n_trees)
            .into_par_iter()
            .map(|tree_idx| {
                // independent, reproducible stream per tree
                let mut rng =
                    ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(tree_idx as u64));

                // bootstrap resample
                let n = sample.labels.len();
                let indices: Vec<usize> =
                    (0..n).map(|_| rng.gen_range(0..n)).collect();

                let mut builder = TreeBuilder {
                    sample,
                    params,
                    mtry: mtry.max(1),
                    rng,
                    nodes: Vec::new(),
                };
                builder.build(indices, 0);
                DecisionTree {
                    nodes: builder.nodes,
                }
            })
            .collect();

        Ok(Self {
            trees,
            n_features,
            classes,
        })
    }

    /// Predict the class of one feature vector by majority vote.
    /// Ties resolve to the smaller class label.
    pub fn predict(&self, features: &[f64]) -> ClassLabel {
        let mut votes = [0u32; 256];
        for tree in &self.trees {
            votes[tree.predict(features) as usize] += 1;
        }
        let mut best = 0usize;
        for (class, &count) in votes.iter().enumerate() {
            if count > votes[best] {
                best = class;
            }
        }
        best as ClassLabel
    }

    /// Number of trees in the ensemble
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Feature vector length the model was trained on
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Classes seen during training, ascending
    pub fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    /// Structural fingerprint of the fitted model.
    ///
    /// Two calls on the same model always agree; any change to the
    /// ensemble changes the value. Used to verify the model is not
    /// mutated by classification runs.
    pub fn fingerprint(&self) -> u64 {
        use std::hash::Hasher;
        let mut h = std::collections::hash_map::DefaultHasher::new();
        h.write_usize(self.n_features);
        h.write(&self.classes);
        for tree in &self.trees {
            for node in &tree.nodes {
                match node {
                    Node::Leaf { class } => {
                        h.write_u8(1);
                        h.write_u8(*class);
                    }
                    Node::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        h.write_u8(2);
                        h.write_usize(*feature);
                        h.write_u64(threshold.to_bits());
                        h.write_usize(*left);
                        h.write_usize(*right);
                    }
                }
            }
        }
        h.finish()
    }
}

struct TreeBuilder<'a> {
    sample: &'a TrainingSample,
    params: &'a RandomForestParams,
    mtry: usize,
    rng: ChaCha8Rng,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    /// Grow the subtree for `indices`, returning its node id.
    fn build(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let majority = self.majority_class(&indices);

        if depth >= self.params.max_depth
            || indices.len() < 2 * self.params.min_leaf
            || self.is_pure(&indices)
        {
            return self.push(Node::Leaf { class: majority });
        }

        match self.best_split(&indices) {
            Some((feature, threshold)) => {
                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                    .into_iter()
                    .partition(|&i| self.sample.features[i][feature] < threshold);

                if left_idx.len() < self.params.min_leaf
                    || right_idx.len() < self.params.min_leaf
                {
                    return self.push(Node::Leaf { class: majority });
                }

                // reserve the split slot before recursing
                let id = self.push(Node::Leaf { class: majority });
                let left = self.build(left_idx, depth + 1);
                let right = self.build(right_idx, depth + 1);
                self.nodes[id] = Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                };
                id
            }
            None => self.push(Node::Leaf { class: majority }),
        }
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn majority_class(&self, indices: &[usize]) -> ClassLabel {
        let mut counts = [0u32; 256];
        for &i in indices {
            counts[self.sample.labels[i] as usize] += 1;
        }
        let mut best = 0usize;
        for (class, &count) in counts.iter().enumerate() {
            if count > counts[best] {
                best = class;
            }
        }
        best as ClassLabel
    }

    fn is_pure(&self, indices: &[usize]) -> bool {
        let first = self.sample.labels[indices[0]];
        indices.iter().all(|&i| self.sample.labels[i] == first)
    }

    /// Pick the gini-optimal split over a random subset of features.
    fn best_split(&mut self, indices: &[usize]) -> Option<(usize, f64)> {
        let n_features = self.sample.feature_names.len();

        // draw mtry distinct candidate features
        let mut candidates: Vec<usize> = (0..n_features).collect();
        for i in 0..self.mtry.min(n_features) {
            let j = self.rng.gen_range(i..n_features);
            candidates.swap(i, j);
        }
        candidates.truncate(self.mtry.min(n_features));

        let n = indices.len() as f64;
        let mut best: Option<(usize, f64, f64)> = None; // (feature, threshold, score)

        for &feature in &candidates {
            let mut order: Vec<usize> = indices.to_vec();
            order.sort_unstable_by(|&a, &b| {
                self.sample.features[a][feature]
                    .partial_cmp(&self.sample.features[b][feature])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left_counts = [0u32; 256];
            let mut right_counts = [0u32; 256];
            for &i in &order {
                right_counts[self.sample.labels[i] as usize] += 1;
            }

            for split_at in 1..order.len() {
                let moved = self.sample.labels[order[split_at - 1]] as usize;
                left_counts[moved] += 1;
                right_counts[moved] -= 1;

                let prev = self.sample.features[order[split_at - 1]][feature];
                let next = self.sample.features[order[split_at]][feature];
                if prev == next {
                    continue;
                }

                let n_left = split_at as f64;
                let n_right = n - n_left;
                let score = n_left / n * gini(&left_counts, n_left)
                    + n_right / n * gini(&right_counts, n_right);

                if best.map(|(_, _, s)| score < s).unwrap_or(true) {
                    best = Some((feature, (prev + next) / 2.0, score));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }
}

fn gini(counts: &[u32; 256], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    let mut sum_sq = 0.0;
    for &c in counts.iter() {
        if c > 0 {
            let p = c as f64 / total;
            sum_sq += p * p;
        }
    }
    1.0 - sum_sq
}
