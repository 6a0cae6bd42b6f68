// SPDX-License-Identifier: MIT OR Apache-2.0
//! The test case document and its capture operations.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use touchstone_types::{DataPoint, ValueKind};
use touchstone_wire::{
    DecodeError, Message, MetricRecord, ResultCategory, ResultRecord, decode_batch,
    decode_message, encode_batch, encode_message,
};

use crate::error::CaseError;

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Identity of a test case: the `{team, suite, version, case}` tuple plus
/// the creation timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Team slug.
    pub teamslug: String,
    /// Suite slug.
    pub testsuite: String,
    /// Version slug.
    pub version: String,
    /// Case slug.
    pub testcase: String,
    /// UTC ISO-8601 millisecond timestamp set at creation.
    pub built_at: String,
}

impl Metadata {
    /// Compact `team/suite/version/case` rendering for log lines.
    pub fn describe(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.teamslug, self.testsuite, self.version, self.testcase
        )
    }

    /// JSON rendering of this metadata block.
    pub fn json(&self) -> Value {
        json!({
            "teamslug": self.teamslug,
            "testsuite": self.testsuite,
            "version": self.version,
            "testcase": self.testcase,
            "builtAt": self.built_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Category of a captured result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Contributes to regression scoring.
    Check,
    /// Reported as an invariant assertion alongside the checks.
    Assume,
}

impl Category {
    fn to_wire(self) -> ResultCategory {
        match self {
            Self::Check => ResultCategory::Check,
            Self::Assume => ResultCategory::Assert,
        }
    }

    fn from_wire(category: ResultCategory) -> Self {
        match category {
            ResultCategory::Check => Self::Check,
            ResultCategory::Assert => Self::Assume,
        }
    }
}

/// A captured value together with its category.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEntry {
    /// The captured value tree.
    pub value: DataPoint,
    /// Check or Assume.
    pub category: Category,
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

/// Aggregate counts for one test case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overview {
    /// Number of captured results (checks and assumptions).
    pub keys_count: u32,
    /// Number of metrics with both endpoints recorded.
    pub metrics_count: u32,
    /// Sum of completed metric durations in milliseconds.
    pub metrics_duration: i64,
}

impl Overview {
    /// JSON rendering of this overview.
    pub fn json(&self) -> Value {
        json!({
            "keysCount": self.keys_count,
            "metricsCount": self.metrics_count,
            "metricsDuration": self.metrics_duration,
        })
    }
}

// ---------------------------------------------------------------------------
// TestCase
// ---------------------------------------------------------------------------

/// A named bundle of captured checks, assumptions, and metrics for one
/// execution of a workflow under a `{team, suite, version}`.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    metadata: Metadata,
    results: BTreeMap<String, ResultEntry>,
    tics: BTreeMap<String, DateTime<Utc>>,
    tocs: BTreeMap<String, DateTime<Utc>>,
    posted: bool,
}

impl TestCase {
    /// Create a fresh test case; `built_at` is fixed to the current UTC time
    /// with millisecond precision so the platform interprets it consistently
    /// regardless of the submitting host's timezone.
    pub fn new(teamslug: &str, testsuite: &str, version: &str, testcase: &str) -> Self {
        let built_at = Utc::now().format("%FT%T%.3fZ").to_string();
        Self {
            metadata: Metadata {
                teamslug: teamslug.to_string(),
                testsuite: testsuite.to_string(),
                version: version.to_string(),
                testcase: testcase.to_string(),
                built_at,
            },
            results: BTreeMap::new(),
            tics: BTreeMap::new(),
            tocs: BTreeMap::new(),
            posted: false,
        }
    }

    /// Identity of this test case.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Captured results, ordered by key.
    pub fn results(&self) -> &BTreeMap<String, ResultEntry> {
        &self.results
    }

    /// Whether this case has been submitted and not re-dirtied since.
    pub fn is_posted(&self) -> bool {
        self.posted
    }

    /// Mark this case as submitted.
    pub fn mark_posted(&mut self) {
        self.posted = true;
    }

    /// Capture a value that contributes to regression scoring.
    /// Replaces any existing value under the same key.
    pub fn check(&mut self, key: &str, value: DataPoint) {
        self.results.insert(
            key.to_string(),
            ResultEntry {
                value,
                category: Category::Check,
            },
        );
        self.posted = false;
    }

    /// Capture an invariant assumption. Replaces any existing value.
    pub fn assume(&mut self, key: &str, value: DataPoint) {
        self.results.insert(
            key.to_string(),
            ResultEntry {
                value,
                category: Category::Assume,
            },
        );
        self.posted = false;
    }

    /// Append to the array stored under `key`, creating a one-element array
    /// if the key is new. Fails if the key holds anything but an array.
    pub fn add_array_element(&mut self, key: &str, value: DataPoint) -> Result<(), CaseError> {
        match self.results.get_mut(key) {
            None => {
                let mut array = DataPoint::array();
                array.push_back(value).expect("node is an array");
                self.results.insert(
                    key.to_string(),
                    ResultEntry {
                        value: array,
                        category: Category::Check,
                    },
                );
            }
            Some(entry) => {
                if entry.value.kind() != ValueKind::Array {
                    return Err(CaseError::TypeConflict {
                        key: key.to_string(),
                    });
                }
                entry.value.push_back(value).expect("node is an array");
            }
        }
        self.posted = false;
        Ok(())
    }

    /// Increment the unsigned counter stored under `key`, creating it at one
    /// if the key is new. Fails if the key holds anything but an unsigned
    /// number.
    pub fn add_hit_count(&mut self, key: &str) -> Result<(), CaseError> {
        match self.results.get_mut(key) {
            None => {
                self.results.insert(
                    key.to_string(),
                    ResultEntry {
                        value: DataPoint::number_unsigned(1),
                        category: Category::Check,
                    },
                );
            }
            Some(entry) => {
                entry.value.increment().map_err(|_| CaseError::TypeConflict {
                    key: key.to_string(),
                })?;
            }
        }
        self.posted = false;
        Ok(())
    }

    /// Start the metric `key`. A repeated `tic` before the matching `toc`
    /// keeps the original start instant.
    pub fn tic(&mut self, key: &str) {
        self.tics.entry(key.to_string()).or_insert_with(Utc::now);
        self.posted = false;
    }

    /// Finalize the metric `key`. Fails if the metric was never started.
    pub fn toc(&mut self, key: &str) -> Result<(), CaseError> {
        if !self.tics.contains_key(key) {
            return Err(CaseError::NotFound {
                key: key.to_string(),
            });
        }
        self.tocs.insert(key.to_string(), Utc::now());
        self.posted = false;
        Ok(())
    }

    /// Record a metric directly as a duration: a zero start with the end
    /// offset by `duration_ms`.
    pub fn add_metric(&mut self, key: &str, duration_ms: u64) {
        let start = DateTime::UNIX_EPOCH;
        let end = start + Duration::milliseconds(duration_ms as i64);
        self.tics.entry(key.to_string()).or_insert(start);
        self.tocs.insert(key.to_string(), end);
        self.posted = false;
    }

    /// Completed metrics as integer-millisecond durations, ordered by key.
    /// A dangling `tic` with no matching `toc` is excluded.
    pub fn metrics(&self) -> BTreeMap<String, i64> {
        self.tics
            .iter()
            .filter_map(|(key, tic)| {
                self.tocs
                    .get(key)
                    .map(|toc| (key.clone(), (*toc - *tic).num_milliseconds()))
            })
            .collect()
    }

    /// Drop all captured results and metrics.
    pub fn clear(&mut self) {
        self.results.clear();
        self.tics.clear();
        self.tocs.clear();
        self.posted = false;
    }

    /// Aggregate counts for this case.
    pub fn overview(&self) -> Overview {
        let metrics = self.metrics();
        Overview {
            keys_count: self.results.len() as u32,
            metrics_count: metrics.len() as u32,
            metrics_duration: metrics.values().sum(),
        }
    }

    /// JSON document for this case: results and assumptions as sorted
    /// `{key, value}` lists with values in canonical string form.
    pub fn json(&self) -> Value {
        let entries = |category: Category| -> Vec<Value> {
            self.results
                .iter()
                .filter(|(_, entry)| entry.category == category)
                .map(|(key, entry)| json!({ "key": key, "value": entry.value.to_string() }))
                .collect()
        };
        let metrics: Vec<Value> = self
            .metrics()
            .iter()
            .map(|(key, duration)| {
                json!({ "key": key, "value": DataPoint::number_signed(*duration).to_string() })
            })
            .collect();
        json!({
            "metadata": self.metadata.json(),
            "results": entries(Category::Check),
            "assertion": entries(Category::Assume),
            "metrics": metrics,
        })
    }

    /// Encode this case as a single message buffer.
    pub fn encode(&self) -> Vec<u8> {
        encode_message(&self.to_message())
    }

    /// Decode a single message buffer into a (posted) test case.
    pub fn decode(buffer: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self::from_message(decode_message(buffer)?))
    }

    /// Encode a batch of cases into a `Messages` envelope.
    pub fn serialize(cases: &[TestCase]) -> Vec<u8> {
        let messages: Vec<Message> = cases.iter().map(TestCase::to_message).collect();
        encode_batch(&messages)
    }

    /// Decode a `Messages` envelope into (posted) test cases.
    pub fn deserialize(buffer: &[u8]) -> Result<Vec<TestCase>, DecodeError> {
        Ok(decode_batch(buffer)?
            .into_iter()
            .map(Self::from_message)
            .collect())
    }

    fn to_message(&self) -> Message {
        Message {
            metadata: touchstone_wire::Metadata {
                teamslug: self.metadata.teamslug.clone(),
                testsuite: self.metadata.testsuite.clone(),
                version: self.metadata.version.clone(),
                testcase: self.metadata.testcase.clone(),
                built_at: self.metadata.built_at.clone(),
            },
            results: self
                .results
                .iter()
                .map(|(key, entry)| ResultRecord {
                    key: key.clone(),
                    value: entry.value.clone(),
                    category: entry.category.to_wire(),
                })
                .collect(),
            metrics: self
                .metrics()
                .iter()
                .map(|(key, duration_ms)| MetricRecord {
                    key: key.clone(),
                    duration_ms: *duration_ms,
                })
                .collect(),
        }
    }

    /// Reconstruct a case from its decoded message. Metric durations are
    /// re-expressed as zero-start spans; the case is marked as posted.
    pub fn from_message(message: Message) -> Self {
        let mut tics = BTreeMap::new();
        let mut tocs = BTreeMap::new();
        for metric in &message.metrics {
            let start = DateTime::UNIX_EPOCH;
            tics.insert(metric.key.clone(), start);
            tocs.insert(
                metric.key.clone(),
                start + Duration::milliseconds(metric.duration_ms),
            );
        }
        Self {
            metadata: Metadata {
                teamslug: message.metadata.teamslug,
                testsuite: message.metadata.testsuite,
                version: message.metadata.version,
                testcase: message.metadata.testcase,
                built_at: message.metadata.built_at,
            },
            results: message
                .results
                .into_iter()
                .map(|record| {
                    (
                        record.key,
                        ResultEntry {
                            value: record.value,
                            category: Category::from_wire(record.category),
                        },
                    )
                })
                .collect(),
            tics,
            tocs,
            posted: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn case() -> TestCase {
        TestCase::new("acme", "suite", "v1.0", "case-1")
    }

    #[test]
    fn built_at_is_iso8601_utc_with_milliseconds() {
        let tc = case();
        let built_at = &tc.metadata().built_at;
        assert!(built_at.ends_with('Z'), "{built_at}");
        assert_eq!(built_at.len(), "2024-01-01T00:00:00.000Z".len());
    }

    #[test]
    fn check_replaces_existing_value() {
        let mut tc = case();
        tc.check("k", DataPoint::number_signed(1));
        tc.check("k", DataPoint::string("two"));
        assert_eq!(
            tc.results()["k"].value,
            DataPoint::string("two"),
            "check is insert-or-replace"
        );
    }

    #[test]
    fn hit_counts_accumulate() {
        let mut tc = case();
        tc.add_hit_count("k").unwrap();
        tc.add_hit_count("k").unwrap();
        tc.add_hit_count("m").unwrap();
        assert_eq!(tc.results()["k"].value, DataPoint::number_unsigned(2));
        assert_eq!(tc.results()["m"].value, DataPoint::number_unsigned(1));
    }

    #[test]
    fn hit_count_on_other_type_is_conflict() {
        let mut tc = case();
        tc.check("k", DataPoint::string("text"));
        let err = tc.add_hit_count("k").unwrap_err();
        assert_eq!(err, CaseError::TypeConflict { key: "k".into() });
    }

    #[test]
    fn array_elements_append() {
        let mut tc = case();
        tc.add_array_element("list", DataPoint::number_signed(1))
            .unwrap();
        tc.add_array_element("list", DataPoint::number_signed(2))
            .unwrap();
        assert_eq!(tc.results()["list"].value.to_string(), "[1,2]");
    }

    #[test]
    fn array_element_on_other_type_is_conflict() {
        let mut tc = case();
        tc.add_hit_count("list").unwrap();
        let err = tc
            .add_array_element("list", DataPoint::boolean(true))
            .unwrap_err();
        assert_eq!(err, CaseError::TypeConflict { key: "list".into() });
    }

    #[test]
    fn toc_without_tic_is_not_found() {
        let mut tc = case();
        let err = tc.toc("t").unwrap_err();
        assert_eq!(err, CaseError::NotFound { key: "t".into() });
    }

    #[test]
    fn dangling_tic_is_excluded_from_metrics() {
        let mut tc = case();
        tc.tic("open");
        tc.tic("closed");
        tc.toc("closed").unwrap();
        let metrics = tc.metrics();
        assert!(metrics.contains_key("closed"));
        assert!(!metrics.contains_key("open"));
    }

    #[test]
    fn add_metric_records_exact_duration() {
        let mut tc = case();
        tc.add_metric("slow", 1500);
        assert_eq!(tc.metrics()["slow"], 1500);
    }

    #[test]
    fn overview_counts() {
        let mut tc = case();
        tc.check("a", DataPoint::boolean(true));
        tc.assume("b", DataPoint::boolean(true));
        tc.add_metric("m1", 10);
        tc.add_metric("m2", 32);
        tc.tic("dangling");
        let overview = tc.overview();
        assert_eq!(overview.keys_count, 2);
        assert_eq!(overview.metrics_count, 2);
        assert_eq!(overview.metrics_duration, 42);
    }

    #[test]
    fn json_lists_are_sorted_by_key() {
        let mut tc = case();
        tc.add_hit_count("m").unwrap();
        tc.add_hit_count("k").unwrap();
        tc.add_hit_count("k").unwrap();
        let doc = tc.json();
        assert_eq!(
            doc["results"],
            serde_json::json!([
                { "key": "k", "value": "2" },
                { "key": "m", "value": "1" },
            ])
        );
        assert_eq!(doc["assertion"], serde_json::json!([]));
    }

    #[test]
    fn assumptions_go_to_the_assertion_list() {
        let mut tc = case();
        tc.assume("user", DataPoint::string("alice"));
        let doc = tc.json();
        assert_eq!(
            doc["assertion"],
            serde_json::json!([{ "key": "user", "value": "\"alice\"" }])
        );
        assert_eq!(doc["results"], serde_json::json!([]));
    }

    #[test]
    fn clear_drops_everything_and_dirties() {
        let mut tc = case();
        tc.check("a", DataPoint::boolean(true));
        tc.add_metric("m", 5);
        tc.mark_posted();
        tc.clear();
        assert!(!tc.is_posted());
        assert!(tc.results().is_empty());
        assert!(tc.metrics().is_empty());
    }

    #[test]
    fn capture_after_post_re_dirties() {
        let mut tc = case();
        tc.check("a", DataPoint::boolean(true));
        tc.mark_posted();
        tc.check("a", DataPoint::boolean(false));
        assert!(!tc.is_posted());
    }

    #[test]
    fn encode_decode_preserves_results_and_metrics() {
        let mut tc = case();
        tc.check("signed", DataPoint::number_signed(-3));
        tc.check("unsigned", DataPoint::number_unsigned(3));
        tc.assume("who", DataPoint::string("alice"));
        tc.add_metric("runtime", 250);

        let decoded = TestCase::decode(&tc.encode()).unwrap();
        assert!(decoded.is_posted());
        assert_eq!(decoded.metadata(), tc.metadata());
        assert_eq!(decoded.results(), tc.results());
        assert_eq!(decoded.metrics(), tc.metrics());
    }

    #[test]
    fn batch_roundtrip_preserves_every_case() {
        let mut first = case();
        first.add_hit_count("k").unwrap();
        let mut second = TestCase::new("acme", "suite", "v1.0", "case-2");
        second.add_metric("m", 7);

        let buffer = TestCase::serialize(&[first.clone(), second.clone()]);
        let decoded = TestCase::deserialize(&buffer).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].results(), first.results());
        assert_eq!(decoded[1].metrics(), second.metrics());
    }
}
