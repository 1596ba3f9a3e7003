// ============================================================
// Layer 5 — Random Forest Regressor
// ============================================================
// A bagged ensemble of CART regression trees.
//
// Each tree:
//   - draws a bootstrap sample of the training rows (n draws
//     with replacement) unless bootstrap is disabled
//   - grows greedily: at every node, for each candidate feature,
//     rows are sorted by that feature and the split threshold
//     with the largest reduction in squared error is taken;
//     thresholds sit halfway between adjacent distinct values
//   - stops at max_depth, below min_samples_split, when a leaf
//     would get fewer than min_samples_leaf rows, or when the
//     node is pure
//   - stores nodes in a flat arena (Vec<Node>) indexed by usize
//
// Every feature value and target must be finite; fit rejects
// anything else. A candidate threshold must be finite and leave
// rows on both sides, so each split strictly shrinks the node.
//
// The forest prediction is the mean of its trees. Tree i is
// seeded with seed + i, so fitting is fully reproducible.

use anyhow::{bail, ensure, Result};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::traits::Regressor;

/// Forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees:           usize,
    pub max_depth:         Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf:  usize,
    /// Features considered per split; None means all of them
    pub max_features:      Option<usize>,
    pub bootstrap:         bool,
    pub seed:              u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees:           100,
            max_depth:         None,
            min_samples_split: 2,
            min_samples_leaf:  1,
            max_features:      None,
            bootstrap:         true,
            seed:              42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature:   usize,
        threshold: f64,
        left:      usize,
        right:     usize,
    },
}

/// One fitted regression tree; nodes[0] is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    pub fn predict_one(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split { feature, threshold, left, right } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn depth_from(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => {
                    1 + depth_from(nodes, *left).max(depth_from(nodes, *right))
                }
            }
        }
        depth_from(&self.nodes, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    config:     ForestConfig,
    trees:      Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForestRegressor {
    pub fn new(config: ForestConfig) -> Self {
        Self { config, trees: Vec::new(), n_features: 0 }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        ensure!(!x.is_empty(), "cannot fit a forest on zero samples");
        ensure!(
            x.len() == y.len(),
            "feature rows ({}) and targets ({}) differ in length",
            x.len(),
            y.len()
        );
        ensure!(self.config.n_trees > 0, "n_trees must be at least 1");

        let n_features = x[0].len();
        if let Some(bad) = x.iter().position(|row| row.len() != n_features) {
            bail!(
                "row {} has {} features, expected {}",
                bad,
                x[bad].len(),
                n_features
            );
        }

        if let Some(bad) = x.iter().position(|row| row.iter().any(|v| !v.is_finite())) {
            bail!("row {} has a non-finite feature value: {:?}", bad, x[bad]);
        }
        if let Some(bad) = y.iter().position(|v| !v.is_finite()) {
            bail!("target {} is not finite: {}", bad, y[bad]);
        }

        let n_samples = x.len();
        let mut trees = Vec::with_capacity(self.config.n_trees);

        for t in 0..self.config.n_trees {
            let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(t as u64));
            let indices: Vec<usize> = if self.config.bootstrap {
                (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
            } else {
                (0..n_samples).collect()
            };

            let mut builder = TreeBuilder {
                x,
                y,
                config: &self.config,
                n_features,
                rng,
                nodes: Vec::new(),
            };
            builder.grow(indices, 0);
            let tree = RegressionTree { nodes: builder.nodes };
            tracing::debug!(
                "Tree {} grown: {} nodes, depth {}",
                t,
                tree.node_count(),
                tree.depth()
            );
            trees.push(tree);
        }

        self.trees      = trees;
        self.n_features = n_features;
        Ok(())
    }

    fn predict_one(&self, row: &[f64]) -> Result<f64> {
        ensure!(self.is_fitted(), "model has not been fitted");
        ensure!(
            row.len() == self.n_features,
            "expected {} features, got {}",
            self.n_features,
            row.len()
        );
        let sum: f64 = self.trees.iter().map(|t| t.predict_one(row)).sum();
        Ok(sum / self.trees.len() as f64)
    }
}

// ─── Tree growing ─────────────────────────────────────────────────────────────

struct TreeBuilder<'a> {
    x:          &'a [Vec<f64>],
    y:          &'a [f64],
    config:     &'a ForestConfig,
    n_features: usize,
    rng:        StdRng,
    nodes:      Vec<Node>,
}

struct BestSplit {
    feature:   usize,
    threshold: f64,
    gain:      f64,
}

impl TreeBuilder<'_> {
    /// Grow the subtree for `indices` and return its node index
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let mean = indices.iter().map(|&i| self.y[i]).sum::<f64>() / indices.len() as f64;

        let depth_reached = self.config.max_depth.is_some_and(|d| depth >= d);
        let too_small     = indices.len() < self.config.min_samples_split.max(2);
        let pure          = indices.iter().all(|&i| self.y[i] == self.y[indices[0]]);

        if depth_reached || too_small || pure {
            return self.push(Node::Leaf { value: mean });
        }

        let Some(best) = self.best_split(&indices) else {
            return self.push(Node::Leaf { value: mean });
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[i][best.feature] <= best.threshold);

        if left_idx.is_empty() || right_idx.is_empty() {
            return self.push(Node::Leaf { value: mean });
        }

        // Reserve this node's slot before the children take theirs
        let slot  = self.push(Node::Leaf { value: mean });
        let left  = self.grow(left_idx, depth + 1);
        let right = self.grow(right_idx, depth + 1);
        self.nodes[slot] = Node::Split {
            feature:   best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        slot
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let mut features: Vec<usize> = (0..self.n_features).collect();
        match self.config.max_features {
            Some(k) if k > 0 && k < self.n_features => {
                features.shuffle(&mut self.rng);
                features.truncate(k);
                features
            }
            _ => features,
        }
    }

    fn best_split(&mut self, indices: &[usize]) -> Option<BestSplit> {
        let n         = indices.len();
        let min_leaf  = self.config.min_samples_leaf.max(1);
        let total_sum: f64 = indices.iter().map(|&i| self.y[i]).sum();
        let parent_sse_term = total_sum * total_sum / n as f64;

        let mut best: Option<BestSplit> = None;
        let mut sorted = indices.to_vec();

        for feature in self.candidate_features() {
            sorted.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut left_sum = 0.0;
            for pos in 0..n - 1 {
                left_sum += self.y[sorted[pos]];
                let left_n  = pos + 1;
                let right_n = n - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let here = self.x[sorted[pos]][feature];
                let next = self.x[sorted[pos + 1]][feature];
                if here == next {
                    continue;
                }

                // SSE reduction = Σl²/nl + Σr²/nr − Σ²/n
                let right_sum = total_sum - left_sum;
                let gain = left_sum * left_sum / left_n as f64
                    + right_sum * right_sum / right_n as f64
                    - parent_sse_term;

                if gain.is_nan() || gain <= 1e-12 || best.as_ref().is_some_and(|b| gain <= b.gain) {
                    continue;
                }

                // Halves first so wide ranges cannot overflow to inf
                let mut threshold = here / 2.0 + next / 2.0;
                if threshold >= next || threshold < here {
                    threshold = here;
                }
                if !threshold.is_finite() {
                    continue;
                }
                best = Some(BestSplit { feature, threshold, gain });
            }
        }

        best
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn single_exact_tree() -> ForestConfig {
        ForestConfig { n_trees: 1, bootstrap: false, ..ForestConfig::default() }
    }

    #[test]
    fn test_fits_step_function_exactly() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y: Vec<f64>      = (0..10).map(|i| if i < 5 { 1.0 } else { 9.0 }).collect();

        let mut rf = RandomForestRegressor::new(single_exact_tree());
        rf.fit(&x, &y).unwrap();

        assert_eq!(rf.predict_one(&[2.0]).unwrap(), 1.0);
        assert_eq!(rf.predict_one(&[7.0]).unwrap(), 9.0);
        assert_eq!(rf.trees()[0].depth(), 1);
    }

    #[test]
    fn test_picks_informative_feature() {
        // feature 0 is noise-free signal, feature 1 is constant
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, 3.0]).collect();
        let y: Vec<f64>      = (0..20).map(|i| (i / 10) as f64).collect();

        let mut rf = RandomForestRegressor::new(single_exact_tree());
        rf.fit(&x, &y).unwrap();
        match &rf.trees()[0].nodes[0] {
            Node::Split { feature, threshold, .. } => {
                assert_eq!(*feature, 0);
                assert_eq!(*threshold, 9.5);
            }
            other => panic!("expected split at root, got {other:?}"),
        }
    }

    #[test]
    fn test_max_depth_limits_tree() {
        let x: Vec<Vec<f64>> = (0..32).map(|i| vec![i as f64]).collect();
        let y: Vec<f64>      = (0..32).map(|i| i as f64).collect();

        let mut rf = RandomForestRegressor::new(ForestConfig {
            max_depth: Some(2),
            ..single_exact_tree()
        });
        rf.fit(&x, &y).unwrap();
        assert!(rf.trees()[0].depth() <= 2);
    }

    #[test]
    fn test_same_seed_same_predictions() {
        let x: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, (i % 7) as f64]).collect();
        let y: Vec<f64>      = (0..40).map(|i| (i as f64).sqrt()).collect();
        let cfg = ForestConfig { n_trees: 10, seed: 7, ..ForestConfig::default() };

        let mut a = RandomForestRegressor::new(cfg.clone());
        let mut b = RandomForestRegressor::new(cfg);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_prediction_is_within_target_range() {
        let x: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64]).collect();
        let y: Vec<f64>      = (0..30).map(|i| 5.0 + (i % 4) as f64).collect();
        let mut rf = RandomForestRegressor::new(ForestConfig { n_trees: 15, ..ForestConfig::default() });
        rf.fit(&x, &y).unwrap();
        for p in rf.predict(&x).unwrap() {
            assert!((5.0..=8.0).contains(&p));
        }
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut rf = RandomForestRegressor::new(ForestConfig::default());
        assert!(rf.fit(&[], &[]).is_err());
        assert!(rf.fit(&[vec![1.0]], &[1.0, 2.0]).is_err());
        assert!(rf.fit(&[vec![1.0], vec![1.0, 2.0]], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_predict_checks_width_and_fit_state() {
        let mut rf = RandomForestRegressor::new(single_exact_tree());
        assert!(rf.predict_one(&[1.0]).is_err());
        rf.fit(&[vec![1.0, 2.0], vec![3.0, 4.0]], &[1.0, 2.0]).unwrap();
        assert!(rf.predict_one(&[1.0]).is_err());
        assert!(rf.predict_one(&[1.0, 2.0]).is_ok());
    }

    #[test]
    fn test_rejects_non_finite_features_and_targets() {
        let mut rf = RandomForestRegressor::new(single_exact_tree());
        let y = [1.0, 2.0, 3.0];

        let err = rf.fit(&[vec![f64::NEG_INFINITY], vec![1.0], vec![2.0]], &y).unwrap_err();
        assert!(err.to_string().contains("row 0"));
        assert!(rf.fit(&[vec![1.0], vec![f64::INFINITY], vec![2.0]], &y).is_err());
        assert!(rf.fit(&[vec![1.0], vec![2.0], vec![f64::NAN]], &y).is_err());
        assert!(rf.fit(&[vec![1.0], vec![2.0], vec![3.0]], &[1.0, f64::NAN, 3.0]).is_err());
        assert!(!rf.is_fitted());
    }

    #[test]
    fn test_extreme_range_splits_with_finite_threshold() {
        let x = vec![vec![-f64::MAX], vec![f64::MAX]];
        let mut rf = RandomForestRegressor::new(single_exact_tree());
        rf.fit(&x, &[1.0, 9.0]).unwrap();

        match &rf.trees()[0].nodes[0] {
            Node::Split { threshold, .. } => assert!(threshold.is_finite()),
            other => panic!("expected split at root, got {other:?}"),
        }
        assert_eq!(rf.predict_one(&[-f64::MAX]).unwrap(), 1.0);
        assert_eq!(rf.predict_one(&[f64::MAX]).unwrap(), 9.0);
    }

    #[test]
    fn test_adjacent_floats_split_cleanly() {
        let a = 1.0_f64;
        let b = f64::from_bits(a.to_bits() + 1);
        let mut rf = RandomForestRegressor::new(single_exact_tree());
        rf.fit(&[vec![a], vec![b]], &[0.0, 4.0]).unwrap();

        assert_eq!(rf.trees()[0].depth(), 1);
        assert_eq!(rf.predict_one(&[a]).unwrap(), 0.0);
        assert_eq!(rf.predict_one(&[b]).unwrap(), 4.0);
    }

    #[test]
    fn test_tied_values_become_a_leaf() {
        // identical features, different targets: nothing to split on
        let x = vec![vec![2.0]; 6];
        let y = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut rf = RandomForestRegressor::new(single_exact_tree());
        rf.fit(&x, &y).unwrap();

        assert_eq!(rf.trees()[0].node_count(), 1);
        assert_eq!(rf.predict_one(&[2.0]).unwrap(), 3.5);
    }

    #[test]
    fn test_signed_zeros_are_one_value() {
        let x = vec![vec![-0.0], vec![0.0], vec![-0.0], vec![0.0]];
        let mut rf = RandomForestRegressor::new(single_exact_tree());
        rf.fit(&x, &[1.0, 3.0, 1.0, 3.0]).unwrap();

        assert_eq!(rf.trees()[0].node_count(), 1);
        assert_eq!(rf.predict_one(&[0.0]).unwrap(), 2.0);
        assert_eq!(rf.predict_one(&[-0.0]).unwrap(), 2.0);
    }
}
