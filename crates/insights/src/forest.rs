//! Random forest classifier — bootstrap-aggregated CART trees with Gini
//! impurity, exposing mean-decrease-in-impurity feature importances.

use campaign_core::config::ForestConfig;
use campaign_core::{CampaignError, CampaignResult};
use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Values closer than this are treated as equal when placing thresholds.
const FEATURE_THRESHOLD: f64 = 1e-7;
const IMPURITY_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Features examined per split; `None` means floor(sqrt(n_features)).
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self::from(&ForestConfig::default())
    }
}

impl From<&ForestConfig> for ForestParams {
    fn from(config: &ForestConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split.max(2),
            max_features: None,
            seed: config.seed,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl DecisionTree {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Importances normalised to sum to 1 (all zero for a single leaf).
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn predict_proba(&self, row: ArrayView1<f64>) -> &[f64] {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
    importances: Vec<f64>,
}

impl RandomForest {
    /// Fit on a row-major feature matrix and class indices `0..n_classes`.
    pub fn fit<'a>(
        x: ArrayView2<'a, f64>,
        y: &'a [usize],
        params: &'a ForestParams,
    ) -> CampaignResult<Self> {
        let (n_samples, n_features) = x.dim();
        if n_samples == 0 || n_features == 0 {
            return Err(CampaignError::Validation(
                "cannot fit a forest on an empty matrix".to_string(),
            ));
        }
        if y.len() != n_samples {
            return Err(CampaignError::Validation(format!(
                "{} labels for {} rows",
                y.len(),
                n_samples
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(CampaignError::Validation(
                "feature matrix contains non-finite values".to_string(),
            ));
        }
        if params.n_estimators == 0 {
            return Err(CampaignError::Validation(
                "n_estimators must be positive".to_string(),
            ));
        }

        let n_classes = y.iter().copied().max().unwrap_or(0) + 1;
        let max_features = params
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().floor() as usize)
            .clamp(1, n_features);

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_estimators);
        for _ in 0..params.n_estimators {
            let sample: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
            let mut builder = TreeBuilder {
                x,
                y,
                n_classes,
                max_features,
                params,
                nodes: Vec::new(),
                importances: vec![0.0; n_features],
            };
            builder.grow(&mut rng, sample);
            trees.push(builder.finish());
        }

        let importances = aggregate_importances(&trees, n_features);
        debug!(
            trees = trees.len(),
            n_samples, n_features, n_classes, max_features, "Random forest fitted"
        );

        Ok(Self {
            trees,
            n_features,
            n_classes,
            importances,
        })
    }

    /// Mean decrease in impurity, summing to 1 unless no tree split.
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Class probabilities averaged over all trees.
    pub fn predict_proba(&self, row: ArrayView1<f64>) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (total, p) in totals.iter_mut().zip(tree.predict_proba(row)) {
                *total += p;
            }
        }
        let n = self.trees.len() as f64;
        totals.iter_mut().for_each(|t| *t /= n);
        totals
    }
}

fn aggregate_importances(trees: &[DecisionTree], n_features: usize) -> Vec<f64> {
    let split_trees: Vec<&DecisionTree> = trees.iter().filter(|t| t.node_count() > 1).collect();
    let mut mean = vec![0.0; n_features];
    if split_trees.is_empty() {
        return mean;
    }
    for tree in &split_trees {
        for (m, v) in mean.iter_mut().zip(tree.feature_importances()) {
            *m += v;
        }
    }
    let total: f64 = mean.iter().sum();
    if total > 0.0 {
        mean.iter_mut().for_each(|m| *m /= total);
    }
    mean
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// Sum of size-weighted child impurities.
    children_impurity: f64,
}

struct TreeBuilder<'a> {
    x: ArrayView2<'a, f64>,
    y: &'a [usize],
    n_classes: usize,
    max_features: usize,
    params: &'a ForestParams,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl<'a> TreeBuilder<'a> {
    fn grow(&mut self, rng: &mut StdRng, root: Vec<usize>) {
        self.nodes.push(Node::Leaf {
            distribution: Vec::new(),
        });
        let mut stack = vec![(0usize, root, 0usize)];

        while let Some((node_id, samples, depth)) = stack.pop() {
            let counts = self.class_counts(&samples);
            let weighted = weighted_gini(&counts);

            let splittable = samples.len() >= self.params.min_samples_split
                && self.params.max_depth.map_or(true, |d| depth < d)
                && weighted > IMPURITY_EPSILON;
            let split = if splittable {
                self.best_split(rng, &samples)
            } else {
                None
            };

            match split {
                Some(split) => {
                    self.importances[split.feature] += weighted - split.children_impurity;
                    let (left, right): (Vec<usize>, Vec<usize>) = samples
                        .iter()
                        .partition(|&&i| self.x[[i, split.feature]] <= split.threshold);

                    let left_id = self.nodes.len();
                    let right_id = left_id + 1;
                    for _ in 0..2 {
                        self.nodes.push(Node::Leaf {
                            distribution: Vec::new(),
                        });
                    }
                    self.nodes[node_id] = Node::Split {
                        feature: split.feature,
                        threshold: split.threshold,
                        left: left_id,
                        right: right_id,
                    };
                    stack.push((right_id, right, depth + 1));
                    stack.push((left_id, left, depth + 1));
                }
                None => {
                    let n = samples.len() as f64;
                    self.nodes[node_id] = Node::Leaf {
                        distribution: counts.iter().map(|&c| c as f64 / n).collect(),
                    };
                }
            }
        }
    }

    fn finish(self) -> DecisionTree {
        let mut importances = self.importances;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }
        DecisionTree {
            nodes: self.nodes,
            importances,
        }
    }

    fn class_counts(&self, samples: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in samples {
            counts[self.y[i]] += 1;
        }
        counts
    }

    /// Examine features in random order until `max_features` non-constant
    /// ones have been scored.
    fn best_split(&self, rng: &mut StdRng, samples: &[usize]) -> Option<SplitCandidate> {
        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(rng);

        let mut best: Option<SplitCandidate> = None;
        let mut visited = 0;
        let mut column: Vec<(f64, usize)> = Vec::with_capacity(samples.len());

        for feature in features {
            if visited >= self.max_features {
                break;
            }
            column.clear();
            column.extend(samples.iter().map(|&i| (self.x[[i, feature]], self.y[i])));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let (lowest, highest) = (column[0].0, column[column.len() - 1].0);
            if highest <= lowest + FEATURE_THRESHOLD {
                continue;
            }
            visited += 1;

            let mut left = vec![0usize; self.n_classes];
            let mut right = vec![0usize; self.n_classes];
            for &(_, label) in column.iter() {
                right[label] += 1;
            }

            for k in 0..column.len() - 1 {
                let label = column[k].1;
                left[label] += 1;
                right[label] -= 1;

                let (current, next) = (column[k].0, column[k + 1].0);
                if next <= current + FEATURE_THRESHOLD {
                    continue;
                }

                let impurity = weighted_gini(&left) + weighted_gini(&right);
                if best.as_ref().map_or(true, |b| impurity < b.children_impurity) {
                    let mut threshold = current / 2.0 + next / 2.0;
                    if threshold >= next {
                        threshold = current;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        children_impurity: impurity,
                    });
                }
            }
        }

        best
    }
}

/// Gini impurity multiplied by the node size: n - Σc²/n.
fn weighted_gini(counts: &[usize]) -> f64 {
    let n: usize = counts.iter().sum();
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    let sum_sq: f64 = counts.iter().map(|&c| (c as f64) * (c as f64)).sum();
    n - sum_sq / n
}
