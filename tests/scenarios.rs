// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end scenarios exercising capture, serialization, and comparison
//! together.

use touchstone::{CaseComparison, DataPoint, TestCase};

fn case(name: &str) -> TestCase {
    TestCase::new("acme", "suite", "v1.0", name)
}

// ---------------------------------------------------------------------------
// Empty-vs-empty comparison
// ---------------------------------------------------------------------------

#[test]
fn comparing_two_empty_cases_is_a_perfect_match() {
    let cmp = CaseComparison::new(&case("src"), &case("dst"));

    let overview = cmp.overview().json();
    assert_eq!(overview["keysCountCommon"], 0);
    assert_eq!(overview["keysCountFresh"], 0);
    assert_eq!(overview["keysCountMissing"], 0);
    assert_eq!(overview["keysScore"], 1.0);

    let body = cmp.json();
    for bucket in ["assertions", "results", "metrics"] {
        assert_eq!(body[bucket]["commonKeys"], serde_json::json!([]));
        assert_eq!(body[bucket]["missingKeys"], serde_json::json!([]));
        assert_eq!(body[bucket]["newKeys"], serde_json::json!([]));
    }
}

// ---------------------------------------------------------------------------
// Array of strings
// ---------------------------------------------------------------------------

#[test]
fn changed_string_array_produces_a_scored_common_entry() {
    let mut src = case("src");
    src.add_array_element("chanteur", DataPoint::string("leo-ferre"))
        .unwrap();
    let mut dst = case("dst");
    dst.add_array_element("chanteur", DataPoint::string("jean-ferrat"))
        .unwrap();

    let cmp = CaseComparison::new(&src, &dst);
    let entry = &cmp.results().json()["commonKeys"][0];
    assert_eq!(entry["name"], "chanteur");
    assert_eq!(entry["score"], 0.0);
    assert_eq!(entry["srcType"], "array");
    assert_eq!(entry["srcValue"], "[\"leo-ferre\"]");
    assert_eq!(entry["dstValue"], "[\"jean-ferrat\"]");
}

// ---------------------------------------------------------------------------
// Hit counters
// ---------------------------------------------------------------------------

#[test]
fn hit_counters_accumulate_and_project_sorted() {
    let mut tc = case("counting");
    tc.add_hit_count("k").unwrap();
    tc.add_hit_count("k").unwrap();
    tc.add_hit_count("m").unwrap();

    assert_eq!(tc.results()["k"].value, DataPoint::number_unsigned(2));
    assert_eq!(tc.results()["m"].value, DataPoint::number_unsigned(1));

    let doc = tc.json();
    assert_eq!(
        doc["results"],
        serde_json::json!([
            { "key": "k", "value": "2" },
            { "key": "m", "value": "1" },
        ])
    );
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[test]
fn metric_partition_counts_common_fresh_and_missing() {
    let mut src = case("src");
    src.tic("a");
    src.toc("a").unwrap();
    src.tic("b");
    src.toc("b").unwrap();
    let mut dst = case("dst");
    dst.tic("a");
    dst.toc("a").unwrap();
    dst.tic("c");
    dst.toc("c").unwrap();

    let cmp = CaseComparison::new(&src, &dst);
    let overview = cmp.overview();
    assert_eq!(overview.metrics_count_common, 1);
    assert_eq!(overview.metrics_count_fresh, 1);
    assert_eq!(overview.metrics_count_missing, 1);

    // Both sides completed "a" in well under the tolerance band, so the
    // common metric compares perfect.
    let common = &cmp.metrics().common["a"];
    assert_eq!(common.score, 1.0);
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn serialized_case_reconstructs_results_and_metrics() {
    let mut tc = case("roundtrip");
    tc.check("flag", DataPoint::boolean(true));
    tc.check("count", DataPoint::number_unsigned(3));
    tc.check("delta", DataPoint::number_double(0.5));
    tc.assume("who", DataPoint::string("alice"));
    tc.add_array_element("steps", DataPoint::number_signed(1))
        .unwrap();
    tc.add_metric("runtime", 128);

    let restored = TestCase::deserialize(&TestCase::serialize(std::slice::from_ref(&tc))).unwrap();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].results(), tc.results());
    assert_eq!(restored[0].metrics(), tc.metrics());
    assert_eq!(restored[0].metadata(), tc.metadata());
}

#[test]
fn self_comparison_of_a_rich_case_is_perfect() {
    let mut tc = case("rich");
    tc.check("flag", DataPoint::boolean(true));
    tc.check("count", DataPoint::number_unsigned(3));
    tc.assume("who", DataPoint::string("alice"));
    let mut nested = DataPoint::object("Student");
    nested
        .add_member("gpa", DataPoint::number_float(3.9))
        .unwrap();
    tc.check("student", nested);
    tc.add_metric("runtime", 64);

    let cmp = CaseComparison::new(&tc, &tc.clone());
    assert_eq!(cmp.score_results(), 1.0);
    for record in cmp.results().common.values() {
        assert!(record.is_perfect());
    }
}

#[test]
fn comparison_is_insensitive_to_member_insertion_order() {
    let mut forward = DataPoint::object("Student");
    forward
        .add_member("name", DataPoint::string("alice"))
        .unwrap();
    forward
        .add_member("gpa", DataPoint::number_double(3.9))
        .unwrap();
    let mut backward = DataPoint::object("Student");
    backward
        .add_member("gpa", DataPoint::number_double(3.9))
        .unwrap();
    backward
        .add_member("name", DataPoint::string("alice"))
        .unwrap();

    let mut src = case("src");
    src.check("student", forward);
    let mut dst = case("dst");
    dst.check("student", backward);

    let cmp = CaseComparison::new(&src, &dst);
    assert!(cmp.results().common["student"].is_perfect());
}
