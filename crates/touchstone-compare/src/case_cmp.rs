// SPDX-License-Identifier: MIT OR Apache-2.0
//! Whole-test-case comparison: three cellars plus an aggregated overview.

use std::collections::BTreeMap;

use serde_json::{Value, json};
use touchstone_case::{Category, Metadata, TestCase};
use touchstone_types::{DataPoint, float_json};

use crate::cellar::Cellar;

// ---------------------------------------------------------------------------
// ComparisonOverview
// ---------------------------------------------------------------------------

/// Aggregate counts and mean score for one compared pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonOverview {
    /// Result keys present on both sides.
    pub keys_count_common: u32,
    /// Result keys present on the candidate side only.
    pub keys_count_fresh: u32,
    /// Result keys present on the reference side only.
    pub keys_count_missing: u32,
    /// Mean score over the common result keys; see
    /// [`CaseComparison::score_results`] for the empty-set rules.
    pub keys_score: f64,
    /// Metric keys present on both sides.
    pub metrics_count_common: u32,
    /// Metric keys present on the candidate side only.
    pub metrics_count_fresh: u32,
    /// Metric keys present on the reference side only.
    pub metrics_count_missing: u32,
    /// Sum of candidate-side durations over the common metrics, ms.
    pub metrics_duration_common_src: i64,
    /// Sum of reference-side durations over the common metrics, ms.
    pub metrics_duration_common_dst: i64,
}

impl ComparisonOverview {
    /// JSON rendering of this overview.
    pub fn json(&self) -> Value {
        json!({
            "keysCountCommon": self.keys_count_common,
            "keysCountFresh": self.keys_count_fresh,
            "keysCountMissing": self.keys_count_missing,
            "keysScore": float_json(self.keys_score),
            "metricsCountCommon": self.metrics_count_common,
            "metricsCountFresh": self.metrics_count_fresh,
            "metricsCountMissing": self.metrics_count_missing,
            "metricsDurationCommonDst": self.metrics_duration_common_dst,
            "metricsDurationCommonSrc": self.metrics_duration_common_src,
        })
    }
}

// ---------------------------------------------------------------------------
// CaseComparison
// ---------------------------------------------------------------------------

/// Comparison of a candidate test case against a reference test case.
#[derive(Debug, Clone)]
pub struct CaseComparison {
    src_meta: Metadata,
    dst_meta: Metadata,
    assumptions: Cellar,
    results: Cellar,
    metrics: Cellar,
    src_metrics: BTreeMap<String, i64>,
    dst_metrics: BTreeMap<String, i64>,
}

impl CaseComparison {
    /// Compare `src` (candidate) against `dst` (reference).
    pub fn new(src: &TestCase, dst: &TestCase) -> Self {
        let src_metrics = src.metrics();
        let dst_metrics = dst.metrics();
        Self {
            src_meta: src.metadata().clone(),
            dst_meta: dst.metadata().clone(),
            assumptions: Cellar::build(
                &results_of(src, Category::Assume),
                &results_of(dst, Category::Assume),
            ),
            results: Cellar::build(
                &results_of(src, Category::Check),
                &results_of(dst, Category::Check),
            ),
            metrics: Cellar::build(
                &metric_points(&src_metrics),
                &metric_points(&dst_metrics),
            ),
            src_metrics,
            dst_metrics,
        }
    }

    /// The assumptions cellar.
    pub fn assumptions(&self) -> &Cellar {
        &self.assumptions
    }

    /// The checked-results cellar.
    pub fn results(&self) -> &Cellar {
        &self.results
    }

    /// The metrics cellar.
    pub fn metrics(&self) -> &Cellar {
        &self.metrics
    }

    /// Mean score over the common result keys, with `|common| + |missing|`
    /// as the denominator. With no common keys at all the pair scores one
    /// when the reference side is also empty and zero when the candidate is
    /// missing keys.
    pub fn score_results(&self) -> f64 {
        if self.results.common.is_empty() {
            return if self.results.missing.is_empty() {
                1.0
            } else {
                0.0
            };
        }
        let count = self.results.common.len() + self.results.missing.len();
        self.results.common_score_sum() / count as f64
    }

    /// Aggregate counts and mean score for this pair.
    pub fn overview(&self) -> ComparisonOverview {
        let duration_sum = |metrics: &BTreeMap<String, i64>| -> i64 {
            self.metrics
                .common
                .keys()
                .filter_map(|key| metrics.get(key))
                .sum()
        };
        ComparisonOverview {
            keys_count_common: self.results.common.len() as u32,
            keys_count_fresh: self.results.fresh.len() as u32,
            keys_count_missing: self.results.missing.len() as u32,
            keys_score: self.score_results(),
            metrics_count_common: self.metrics.common.len() as u32,
            metrics_count_fresh: self.metrics.fresh.len() as u32,
            metrics_count_missing: self.metrics.missing.len() as u32,
            metrics_duration_common_src: duration_sum(&self.src_metrics),
            metrics_duration_common_dst: duration_sum(&self.dst_metrics),
        }
    }

    /// JSON rendering: both metadata blocks plus the three cellars.
    pub fn json(&self) -> Value {
        json!({
            "src": self.src_meta.json(),
            "dst": self.dst_meta.json(),
            "assertions": self.assumptions.json(),
            "results": self.results.json(),
            "metrics": self.metrics.json(),
        })
    }
}

fn results_of(case: &TestCase, category: Category) -> BTreeMap<String, DataPoint> {
    case.results()
        .iter()
        .filter(|(_, entry)| entry.category == category)
        .map(|(key, entry)| (key.clone(), entry.value.clone()))
        .collect()
}

fn metric_points(metrics: &BTreeMap<String, i64>) -> BTreeMap<String, DataPoint> {
    metrics
        .iter()
        .map(|(key, duration)| (key.clone(), DataPoint::number_signed(*duration)))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
