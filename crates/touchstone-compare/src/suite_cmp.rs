// SPDX-License-Identifier: MIT OR Apache-2.0
//! Comparison of two collections of test cases, keyed by case slug.

use std::collections::BTreeMap;

use serde_json::{Value, json};
use touchstone_case::{Metadata, TestCase};

use crate::case_cmp::CaseComparison;

/// Comparison of a candidate collection of cases against a reference
/// collection, as produced when diffing two result files.
#[derive(Debug, Clone, Default)]
pub struct SuiteComparison {
    /// Case slugs present in both collections, fully compared.
    pub common: BTreeMap<String, CaseComparison>,
    /// Cases present in the reference collection only.
    pub missing: BTreeMap<String, Metadata>,
    /// Cases present in the candidate collection only.
    pub fresh: BTreeMap<String, Metadata>,
}

impl SuiteComparison {
    /// Compare `src` (candidate) against `dst` (reference).
    pub fn new(
        src: &BTreeMap<String, TestCase>,
        dst: &BTreeMap<String, TestCase>,
    ) -> Self {
        let mut cmp = Self::default();
        for (slug, src_case) in src {
            match dst.get(slug) {
                Some(dst_case) => {
                    cmp.common
                        .insert(slug.clone(), CaseComparison::new(src_case, dst_case));
                }
                None => {
                    cmp.fresh.insert(slug.clone(), src_case.metadata().clone());
                }
            }
        }
        for (slug, dst_case) in dst {
            if !src.contains_key(slug) {
                cmp.missing
                    .insert(slug.clone(), dst_case.metadata().clone());
            }
        }
        cmp
    }

    /// JSON rendering: `{ newCases, missingCases, commonCases }`.
    pub fn json(&self) -> Value {
        let fresh: Vec<Value> = self.fresh.values().map(Metadata::json).collect();
        let missing: Vec<Value> = self.missing.values().map(Metadata::json).collect();
        let common: Vec<Value> = self.common.values().map(CaseComparison::json).collect();
        json!({
            "newCases": fresh,
            "missingCases": missing,
            "commonCases": common,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use touchstone_types::DataPoint;

    fn collection(names: &[&str]) -> BTreeMap<String, TestCase> {
        names
            .iter()
            .map(|name| {
                let mut case = TestCase::new("acme", "suite", "v1.0", name);
                case.check("key", DataPoint::string(*name));
                (name.to_string(), case)
            })
            .collect()
    }

    #[test]
    fn cases_are_partitioned_by_slug() {
        let src = collection(&["both", "candidate-only"]);
        let dst = collection(&["both", "reference-only"]);
        let cmp = SuiteComparison::new(&src, &dst);
        assert!(cmp.common.contains_key("both"));
        assert!(cmp.fresh.contains_key("candidate-only"));
        assert!(cmp.missing.contains_key("reference-only"));
    }

    #[test]
    fn common_cases_are_fully_compared() {
        let src = collection(&["case-1"]);
        let dst = collection(&["case-1"]);
        let cmp = SuiteComparison::new(&src, &dst);
        assert_eq!(cmp.common["case-1"].score_results(), 1.0);
    }

    #[test]
    fn json_buckets_carry_metadata_and_bodies() {
        let src = collection(&["both", "candidate-only"]);
        let dst = collection(&["both", "reference-only"]);
        let doc = SuiteComparison::new(&src, &dst).json();
        assert_eq!(doc["newCases"][0]["testcase"], "candidate-only");
        assert_eq!(doc["missingCases"][0]["testcase"], "reference-only");
        assert_eq!(doc["commonCases"][0]["src"]["testcase"], "both");
    }

    #[test]
    fn empty_collections_compare_empty() {
        let cmp = SuiteComparison::new(&BTreeMap::new(), &BTreeMap::new());
        assert!(cmp.common.is_empty());
        let doc = cmp.json();
        assert_eq!(doc["newCases"], json!([]));
        assert_eq!(doc["missingCases"], json!([]));
        assert_eq!(doc["commonCases"], json!([]));
    }
}
