//! Histogram regression trees
//!
//! Shared by the boosted and bagged learners:
//! - Features are quantile-binned once per fit
//! - Split search scans per-bin gradient/hessian sums, in parallel per feature
//! - Trees grow depth-wise (recursive) or leaf-wise (best open leaf first)

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_BINS: usize = 64;

/// Smallest gain accepted for a split
const MIN_SPLIT_GAIN: f64 = 1e-12;

/// Feature matrix quantised to per-column bin indices
#[derive(Debug, Clone)]
pub struct BinnedFeatures {
    /// Ascending cut points per feature; bin `b` holds `cuts[b-1] < v <= cuts[b]`
    cuts: Vec<Vec<f64>>,
    /// Bin index per feature, per row
    bins: Vec<Vec<u16>>,
}

impl BinnedFeatures {
    pub fn build(features: &Array2<f64>, max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, u16::MAX as usize);
        let (cuts, bins): (Vec<_>, Vec<_>) = (0..features.ncols())
            .into_par_iter()
            .map(|j| {
                let column = features.column(j);
                let cuts = cut_points(column, max_bins);
                let bins: Vec<u16> = column
                    .iter()
                    .map(|v| cuts.partition_point(|c| c < v) as u16)
                    .collect();
                (cuts, bins)
            })
            .unzip();

        Self { cuts, bins }
    }

    fn n_bins(&self, feature: usize) -> usize {
        self.cuts[feature].len() + 1
    }
}

/// Midpoints between distinct values, thinned to quantiles when there are
/// more distinct values than bins
fn cut_points(column: ArrayView1<f64>, max_bins: usize) -> Vec<f64> {
    let mut distinct: Vec<f64> = column.iter().copied().filter(|v| v.is_finite()).collect();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();

    if distinct.len() <= 1 {
        return Vec::new();
    }

    let midpoint = |i: usize| (distinct[i - 1] + distinct[i]) / 2.0;

    if distinct.len() <= max_bins {
        return (1..distinct.len()).map(midpoint).collect();
    }

    let mut cuts: Vec<f64> = (1..max_bins)
        .map(|k| midpoint((k * distinct.len() / max_bins).max(1)))
        .collect();
    cuts.dedup();
    cuts
}

/// How a candidate split is scored and how leaves are valued
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SplitCriterion {
    /// Second-order gain on gradients/hessians with L1, L2 and minimum-gain penalties
    Newton { lambda: f64, alpha: f64, gamma: f64 },
    /// Variance reduction; gradients carry the target values themselves
    Variance,
}

impl SplitCriterion {
    fn score(&self, grad: f64, hess: f64) -> f64 {
        match *self {
            SplitCriterion::Newton { lambda, alpha, .. } => {
                let g = soft_threshold(grad, alpha);
                g * g / (hess + lambda)
            }
            SplitCriterion::Variance => {
                if hess > 0.0 {
                    grad * grad / hess
                } else {
                    0.0
                }
            }
        }
    }

    fn gain(&self, left: Sums, right: Sums, parent: Sums) -> f64 {
        let raw = self.score(left.grad, left.hess) + self.score(right.grad, right.hess)
            - self.score(parent.grad, parent.hess);
        match *self {
            SplitCriterion::Newton { gamma, .. } => 0.5 * raw - gamma,
            SplitCriterion::Variance => raw,
        }
    }

    fn leaf_value(&self, sums: Sums) -> f64 {
        match *self {
            SplitCriterion::Newton { lambda, alpha, .. } => {
                -soft_threshold(sums.grad, alpha) / (sums.hess + lambda)
            }
            SplitCriterion::Variance => {
                if sums.hess > 0.0 {
                    sums.grad / sums.hess
                } else {
                    0.0
                }
            }
        }
    }
}

fn soft_threshold(value: f64, alpha: f64) -> f64 {
    value.signum() * (value.abs() - alpha).max(0.0)
}

/// Growth limits and scoring for one tree
#[derive(Debug, Clone, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    /// Grow leaf-wise up to this many leaves; depth-wise when `None`
    pub max_leaves: Option<usize>,
    pub min_child_samples: usize,
    pub min_child_weight: f64,
    pub min_samples_split: usize,
    /// Features sampled per split; all allowed features when `None`
    pub features_per_split: Option<usize>,
    pub criterion: SplitCriterion,
}

#[derive(Debug, Clone, Copy, Default)]
struct Sums {
    grad: f64,
    hess: f64,
    count: usize,
}

impl Sums {
    fn add(&mut self, grad: f64, hess: f64) {
        self.grad += grad;
        self.hess += hess;
        self.count += 1;
    }

    fn minus(self, other: Sums) -> Sums {
        Sums {
            grad: self.grad - other.grad,
            hess: self.hess - other.hess,
            count: self.count - other.count,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    bin: usize,
    gain: f64,
}

/// Leaf awaiting expansion during leaf-wise growth
struct OpenLeaf {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
    split: SplitCandidate,
}

/// Grows one tree over pre-binned features
pub struct TreeBuilder<'a> {
    binned: &'a BinnedFeatures,
    params: &'a TreeParams,
    /// Features this tree may split on
    features: &'a [usize],
    grad: &'a [f64],
    hess: &'a [f64],
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        binned: &'a BinnedFeatures,
        params: &'a TreeParams,
        features: &'a [usize],
        grad: &'a [f64],
        hess: &'a [f64],
    ) -> Self {
        Self {
            binned,
            params,
            features,
            grad,
            hess,
        }
    }

    /// Grow a tree over `rows`; a row may appear more than once (bootstrap)
    pub fn build(&self, rows: Vec<usize>, rng: &mut StdRng) -> RegressionTree {
        let mut nodes = Vec::new();
        match self.params.max_leaves {
            Some(max_leaves) => self.grow_leaf_wise(&mut nodes, rows, max_leaves, rng),
            None => {
                self.grow_depth_wise(&mut nodes, rows, 0, rng);
            }
        }
        RegressionTree { nodes }
    }

    fn grow_depth_wise(
        &self,
        nodes: &mut Vec<TreeNode>,
        rows: Vec<usize>,
        depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let idx = nodes.len();
        let sums = self.sums(&rows);
        nodes.push(TreeNode::Leaf(self.params.criterion.leaf_value(sums)));

        if depth >= self.params.max_depth {
            return idx;
        }

        if let Some(split) = self.find_split(&rows, sums, rng) {
            let (left_rows, right_rows) = self.partition(rows, split);
            let left = self.grow_depth_wise(nodes, left_rows, depth + 1, rng);
            let right = self.grow_depth_wise(nodes, right_rows, depth + 1, rng);
            nodes[idx] = self.split_node(split, left, right);
        }
        idx
    }

    fn grow_leaf_wise(
        &self,
        nodes: &mut Vec<TreeNode>,
        rows: Vec<usize>,
        max_leaves: usize,
        rng: &mut StdRng,
    ) {
        let mut open: Vec<OpenLeaf> = Vec::new();
        self.push_leaf(nodes, &mut open, rows, 0, rng);
        let mut n_leaves = 1;

        while n_leaves < max_leaves {
            let Some(best) = open
                .iter()
                .enumerate()
                .fold(None::<(usize, f64)>, |best, (i, leaf)| match best {
                    Some((_, gain)) if gain >= leaf.split.gain => best,
                    _ => Some((i, leaf.split.gain)),
                })
                .map(|(i, _)| i)
            else {
                break;
            };

            let leaf = open.remove(best);
            let (left_rows, right_rows) = self.partition(leaf.rows, leaf.split);
            let left = self.push_leaf(nodes, &mut open, left_rows, leaf.depth + 1, rng);
            let right = self.push_leaf(nodes, &mut open, right_rows, leaf.depth + 1, rng);
            nodes[leaf.node] = self.split_node(leaf.split, left, right);
            n_leaves += 1;
        }
    }

    /// Add a leaf node, queueing it for expansion when it has a viable split
    fn push_leaf(
        &self,
        nodes: &mut Vec<TreeNode>,
        open: &mut Vec<OpenLeaf>,
        rows: Vec<usize>,
        depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let node = nodes.len();
        let sums = self.sums(&rows);
        nodes.push(TreeNode::Leaf(self.params.criterion.leaf_value(sums)));

        if depth < self.params.max_depth {
            if let Some(split) = self.find_split(&rows, sums, rng) {
                open.push(OpenLeaf {
                    node,
                    rows,
                    depth,
                    split,
                });
            }
        }
        node
    }

    fn sums(&self, rows: &[usize]) -> Sums {
        let mut sums = Sums::default();
        for &r in rows {
            sums.add(self.grad[r], self.hess[r]);
        }
        sums
    }

    fn split_node(&self, split: SplitCandidate, left: usize, right: usize) -> TreeNode {
        TreeNode::Split {
            feature: split.feature,
            threshold: self.binned.cuts[split.feature][split.bin],
            left,
            right,
        }
    }

    fn partition(&self, rows: Vec<usize>, split: SplitCandidate) -> (Vec<usize>, Vec<usize>) {
        let bins = &self.binned.bins[split.feature];
        rows.into_iter()
            .partition(|&r| (bins[r] as usize) <= split.bin)
    }

    /// Features sampled for this split, then the rest as a fallback
    fn candidate_features(&self, rng: &mut StdRng) -> (Vec<usize>, Vec<usize>) {
        match self.params.features_per_split {
            Some(k) if k < self.features.len() => {
                let mut picked = vec![false; self.features.len()];
                for i in sample(rng, self.features.len(), k.max(1)) {
                    picked[i] = true;
                }
                let (sampled, rest): (Vec<_>, Vec<_>) =
                    self.features.iter().zip(picked).partition(|(_, p)| *p);
                (
                    sampled.into_iter().map(|(f, _)| *f).collect(),
                    rest.into_iter().map(|(f, _)| *f).collect(),
                )
            }
            _ => (self.features.to_vec(), Vec::new()),
        }
    }

    fn find_split(&self, rows: &[usize], parent: Sums, rng: &mut StdRng) -> Option<SplitCandidate> {
        let params = self.params;
        if rows.len() < params.min_samples_split || rows.len() < 2 * params.min_child_samples.max(1) {
            return None;
        }

        // Fall back to the unsampled features when the sample holds no valid split
        let (sampled, rest) = self.candidate_features(rng);
        self.best_split_among(&sampled, rows, parent)
            .or_else(|| self.best_split_among(&rest, rows, parent))
    }

    fn best_split_among(&self, features: &[usize], rows: &[usize], parent: Sums) -> Option<SplitCandidate> {
        let per_feature: Vec<Option<SplitCandidate>> = features
            .par_iter()
            .map(|&feature| self.best_split_for(feature, rows, parent))
            .collect();

        per_feature
            .into_iter()
            .flatten()
            .fold(None, |best: Option<SplitCandidate>, candidate| match best {
                Some(b) if b.gain >= candidate.gain => Some(b),
                _ => Some(candidate),
            })
    }

    fn best_split_for(&self, feature: usize, rows: &[usize], parent: Sums) -> Option<SplitCandidate> {
        let n_bins = self.binned.n_bins(feature);
        if n_bins < 2 {
            return None;
        }

        let bins = &self.binned.bins[feature];
        let mut histogram = vec![Sums::default(); n_bins];
        for &r in rows {
            histogram[bins[r] as usize].add(self.grad[r], self.hess[r]);
        }

        let params = self.params;
        let min_samples = params.min_child_samples.max(1);
        let mut left = Sums::default();
        let mut best: Option<SplitCandidate> = None;

        for (bin, bucket) in histogram.iter().enumerate().take(n_bins - 1) {
            left.grad += bucket.grad;
            left.hess += bucket.hess;
            left.count += bucket.count;
            let right = parent.minus(left);

            if left.count < min_samples || right.count < min_samples {
                continue;
            }
            if left.hess < params.min_child_weight || right.hess < params.min_child_weight {
                continue;
            }

            let gain = params.criterion.gain(left, right, parent);
            if gain > MIN_SPLIT_GAIN && best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate { feature, bin, gain });
            }
        }
        best
    }
}

/// Flattened tree; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    Leaf(f64),
    /// Rows with `x[feature] <= threshold` go left
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

impl RegressionTree {
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf(value) => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if row[feature] <= threshold { left } else { right },
            }
        }
    }

    /// Multiply every leaf (shrinkage)
    pub fn scale(&mut self, factor: f64) {
        for node in &mut self.nodes {
            if let TreeNode::Leaf(value) = node {
                *value *= factor;
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf(_)))
            .count()
    }

    /// Largest feature index referenced by a split
    #[cfg(test)]
    pub(crate) fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                TreeNode::Split { feature, .. } => Some(*feature),
                TreeNode::Leaf(_) => None,
            })
            .max()
    }
}
