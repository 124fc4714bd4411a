//! Evaluation metrics
//!
//! Classification metrics at a 0.5 threshold plus a rank-based AUC, since
//! the end use is ranking candidates per vacancy rather than hard
//! classification. AUC is absent when the partition holds a single class.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationMetrics {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    /// Rank-based AUC; `None` when validation has one class only.
    pub auc: Option<f32>,
    pub log_loss: f32,
    pub examples: usize,
}

/// Compute all metrics for predicted probabilities against labels.
#[must_use]
pub fn evaluate(scores: &[f32], labels: &[u8]) -> ValidationMetrics {
    debug_assert_eq!(scores.len(), labels.len());

    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;
    for (&score, &label) in scores.iter().zip(labels) {
        let predicted = score >= 0.5;
        match (predicted, label == 1) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, true) => fn_ += 1,
            (false, false) => {}
        }
    }

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    ValidationMetrics {
        precision,
        recall,
        f1,
        auc: auc(scores, labels),
        log_loss: log_loss(scores, labels),
        examples: labels.len(),
    }
}

fn ratio(numerator: usize, denominator: usize) -> f32 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f32 / denominator as f32
    }
}

/// Area under the ROC curve via the rank-sum formulation, with tied scores
/// assigned their average rank.
#[must_use]
pub fn auc(scores: &[f32], labels: &[u8]) -> Option<f32> {
    let positives = labels.iter().filter(|&&y| y == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Average ranks over runs of tied scores.
    let mut rank_sum_positive = 0.0f64;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; ties share the average of their span.
        let avg_rank = (i + 1 + j + 1) as f64 / 2.0;
        for &idx in &order[i..=j] {
            if labels[idx] == 1 {
                rank_sum_positive += avg_rank;
            }
        }
        i = j + 1;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Some(((rank_sum_positive - p * (p + 1.0) / 2.0) / (p * n)) as f32)
}

/// Mean negative log-likelihood with clamped probabilities.
#[must_use]
pub fn log_loss(scores: &[f32], labels: &[u8]) -> f32 {
    if scores.is_empty() {
        return 0.0;
    }
    let mut total = 0.0f32;
    for (&score, &label) in scores.iter().zip(labels) {
        let p = score.clamp(1e-7, 1.0 - 1e-7);
        total -= if label == 1 { p.ln() } else { (1.0 - p).ln() };
    }
    total / scores.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_ranking_gives_unit_auc() {
        let scores = [0.1, 0.2, 0.8, 0.9];
        let labels = [0, 0, 1, 1];
        assert_eq!(auc(&scores, &labels), Some(1.0));
    }

    #[test]
    fn test_inverted_ranking_gives_zero_auc() {
        let scores = [0.9, 0.8, 0.2, 0.1];
        let labels = [0, 0, 1, 1];
        assert_eq!(auc(&scores, &labels), Some(0.0));
    }

    #[test]
    fn test_tied_scores_give_half_auc() {
        let scores = [0.5, 0.5, 0.5, 0.5];
        let labels = [0, 1, 0, 1];
        assert_eq!(auc(&scores, &labels), Some(0.5));
    }

    #[test]
    fn test_single_class_has_no_auc() {
        assert_eq!(auc(&[0.2, 0.8], &[1, 1]), None);
        assert_eq!(auc(&[], &[]), None);
    }

    #[test]
    fn test_precision_recall_counts() {
        let scores = [0.9, 0.9, 0.1, 0.9];
        let labels = [1, 0, 1, 1];
        let metrics = evaluate(&scores, &labels);
        // tp=2 fp=1 fn=1
        assert!((metrics.precision - 2.0 / 3.0).abs() < 1e-6);
        assert!((metrics.recall - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(metrics.examples, 4);
    }

    #[test]
    fn test_log_loss_prefers_confident_correct_scores() {
        let labels = [1, 0];
        let good = log_loss(&[0.95, 0.05], &labels);
        let bad = log_loss(&[0.55, 0.45], &labels);
        assert!(good < bad);
    }
}
