// SPDX-License-Identifier: MIT OR Apache-2.0
//! The `{common, missing, fresh}` partition of a keyed comparison.

use std::collections::BTreeMap;

use serde_json::{Value, json};
use touchstone_types::{DataPoint, float_json};

use crate::diff::{TypeComparison, compare};

/// Partition of one category of keys across a compared pair.
///
/// `common` holds a comparison record per key present on both sides,
/// `missing` the reference-side values whose keys the candidate lacks, and
/// `fresh` the candidate-side values whose keys are new.
#[derive(Debug, Clone, Default)]
pub struct Cellar {
    /// Keys present on both sides, with their comparison records.
    pub common: BTreeMap<String, TypeComparison>,
    /// Keys present on the reference side only.
    pub missing: BTreeMap<String, DataPoint>,
    /// Keys present on the candidate side only.
    pub fresh: BTreeMap<String, DataPoint>,
}

impl Cellar {
    /// Partition `src` (candidate) against `dst` (reference).
    pub fn build(
        src: &BTreeMap<String, DataPoint>,
        dst: &BTreeMap<String, DataPoint>,
    ) -> Self {
        let mut cellar = Self::default();
        for (key, dst_value) in dst {
            match src.get(key) {
                Some(src_value) => {
                    cellar
                        .common
                        .insert(key.clone(), compare(src_value, dst_value));
                }
                None => {
                    cellar.missing.insert(key.clone(), dst_value.clone());
                }
            }
        }
        for (key, src_value) in src {
            if !dst.contains_key(key) {
                cellar.fresh.insert(key.clone(), src_value.clone());
            }
        }
        cellar
    }

    /// Sum of the comparison scores over the common keys.
    pub fn common_score_sum(&self) -> f64 {
        self.common.values().map(|cmp| cmp.score).sum()
    }

    /// JSON rendering: `{ commonKeys, missingKeys, newKeys }`.
    ///
    /// Common entries omit `dstType` unless the kinds differ, omit
    /// `dstValue` for perfect matches, and omit `desc` when empty — absent
    /// fields keep the platform payloads compact and the diffs stable.
    pub fn json(&self) -> Value {
        let common: Vec<Value> = self
            .common
            .iter()
            .map(|(name, cmp)| {
                let mut entry = json!({
                    "name": name,
                    "score": float_json(cmp.score),
                    "srcType": cmp.src_type.label(),
                    "srcValue": cmp.src_value,
                });
                let fields = entry.as_object_mut().expect("entry is an object");
                if let Some(dst_type) = cmp.dst_type {
                    fields.insert("dstType".to_string(), json!(dst_type.label()));
                }
                if let Some(dst_value) = &cmp.dst_value {
                    fields.insert("dstValue".to_string(), json!(dst_value));
                }
                if !cmp.desc.is_empty() {
                    fields.insert("desc".to_string(), json!(cmp.desc));
                }
                entry
            })
            .collect();

        let missing: Vec<Value> = self
            .missing
            .iter()
            .map(|(name, value)| {
                json!({
                    "name": name,
                    "dstType": value.kind().label(),
                    "dstValue": value.to_string(),
                })
            })
            .collect();

        let fresh: Vec<Value> = self
            .fresh
            .iter()
            .map(|(name, value)| {
                json!({
                    "name": name,
                    "srcType": value.kind().label(),
                    "srcValue": value.to_string(),
                })
            })
            .collect();

        json!({
            "commonKeys": common,
            "missingKeys": missing,
            "newKeys": fresh,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
