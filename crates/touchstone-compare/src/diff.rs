// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pairwise comparison of value nodes.

use std::collections::{BTreeMap, BTreeSet};

use touchstone_types::{DataPoint, ValueKind};

/// Relative-change band within which a numeric difference earns partial
/// credit, and past which array size changes or element diffs are considered
/// too noisy to describe element by element.
const THRESHOLD: f64 = 0.2;

/// Element diffs are always described when fewer than this many elements
/// differ, regardless of the ratio.
const DIFF_SIZE_THRESHOLD: usize = 10;

// ---------------------------------------------------------------------------
// TypeComparison
// ---------------------------------------------------------------------------

/// Whether a comparison found the two sides identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchType {
    /// The two sides are identical.
    Perfect,
    /// Anything short of identical.
    #[default]
    None,
}

/// Outcome of comparing one pair of value nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeComparison {
    /// Kind of the candidate node.
    pub src_type: ValueKind,
    /// Kind of the reference node; recorded only when it differs.
    pub dst_type: Option<ValueKind>,
    /// Canonical string form of the candidate node.
    pub src_value: String,
    /// Canonical string form of the reference node; recorded only for
    /// non-perfect matches.
    pub dst_value: Option<String>,
    /// Score in `[0, 1]`.
    pub score: f64,
    /// Perfect or not.
    pub match_type: MatchType,
    /// Human-readable descriptions of the differences, deduplicated and
    /// ordered.
    pub desc: BTreeSet<String>,
}

impl TypeComparison {
    fn new(src: &DataPoint) -> Self {
        Self {
            src_type: src.kind(),
            dst_type: None,
            src_value: src.to_string(),
            dst_value: None,
            score: 0.0,
            match_type: MatchType::None,
            desc: BTreeSet::new(),
        }
    }

    fn perfect(&mut self) {
        self.match_type = MatchType::Perfect;
        self.score = 1.0;
    }

    /// Whether the two sides were found identical.
    pub fn is_perfect(&self) -> bool {
        self.match_type == MatchType::Perfect
    }
}

// ---------------------------------------------------------------------------
// Flatten
// ---------------------------------------------------------------------------

/// Recursively project a container node into a map from path to leaf.
///
/// Array elements are keyed `[i]`, object members by name; nested paths
/// concatenate, with a `.` separator under object members. Leaves flatten
/// to the empty map — they are their own value.
pub fn flatten(input: &DataPoint) -> BTreeMap<String, DataPoint> {
    let mut entries = BTreeMap::new();
    match input {
        DataPoint::Array(values) => {
            for (index, value) in values.iter().enumerate() {
                let name = format!("[{index}]");
                let nested = flatten(value);
                if nested.is_empty() {
                    entries.insert(name, value.clone());
                    continue;
                }
                for (key, leaf) in nested {
                    entries.insert(format!("{name}{key}"), leaf);
                }
            }
        }
        DataPoint::Object { members, .. } => {
            for (name, value) in members {
                let nested = flatten(value);
                if nested.is_empty() {
                    entries.insert(name.clone(), value.clone());
                    continue;
                }
                for (key, leaf) in nested {
                    entries.insert(format!("{name}.{key}"), leaf);
                }
            }
        }
        _ => {}
    }
    entries
}

// ---------------------------------------------------------------------------
// compare
// ---------------------------------------------------------------------------

/// Compare a candidate node against a reference node.
pub fn compare(src: &DataPoint, dst: &DataPoint) -> TypeComparison {
    let mut cmp = TypeComparison::new(src);

    // Two result keys of different kinds are completely different; no
    // partial credit across the boolean/number/string/container boundary.
    if src.kind() != dst.kind() {
        cmp.dst_type = Some(dst.kind());
        cmp.dst_value = Some(dst.to_string());
        cmp.desc.insert("result types are different".to_string());
        return cmp;
    }

    match (src, dst) {
        (DataPoint::Boolean(a), DataPoint::Boolean(b)) => {
            if a == b {
                cmp.perfect();
            } else {
                cmp.dst_value = Some(dst.to_string());
            }
        }
        (DataPoint::Signed(a), DataPoint::Signed(b)) => {
            compare_number(&mut cmp, a == b, *a as f64, *b as f64);
            if !cmp.is_perfect() {
                cmp.dst_value = Some(dst.to_string());
            }
        }
        (DataPoint::Unsigned(a), DataPoint::Unsigned(b)) => {
            compare_number(&mut cmp, a == b, *a as f64, *b as f64);
            if !cmp.is_perfect() {
                cmp.dst_value = Some(dst.to_string());
            }
        }
        (DataPoint::Float(a), DataPoint::Float(b)) => {
            compare_number(&mut cmp, a == b, f64::from(*a), f64::from(*b));
            if !cmp.is_perfect() {
                cmp.dst_value = Some(dst.to_string());
            }
        }
        (DataPoint::Double(a), DataPoint::Double(b)) => {
            compare_number(&mut cmp, a == b, *a, *b);
            if !cmp.is_perfect() {
                cmp.dst_value = Some(dst.to_string());
            }
        }
        (DataPoint::Text(a), DataPoint::Text(b)) => {
            if a == b {
                cmp.perfect();
            } else {
                cmp.dst_value = Some(dst.to_string());
            }
        }
        (DataPoint::Array(_), DataPoint::Array(_)) => {
            compare_arrays(src, dst, &mut cmp);
        }
        (DataPoint::Object { .. }, DataPoint::Object { .. }) => {
            compare_objects(src, dst, &mut cmp);
            if !cmp.is_perfect() {
                cmp.dst_value = Some(dst.to_string());
            }
        }
        _ => unreachable!("kinds verified equal above"),
    }

    cmp
}

/// Numeric tolerance: equal values are perfect; a relative change strictly
/// inside the threshold earns `1 - percent` and is described relatively;
/// anything else scores zero and is described by absolute magnitude.
fn compare_number(cmp: &mut TypeComparison, equal: bool, src: f64, dst: f64) {
    if equal {
        cmp.perfect();
        return;
    }
    let diff = src - dst;
    let percent = if dst == 0.0 { 0.0 } else { (diff / dst).abs() };
    let difference = if percent == 0.0 || percent > THRESHOLD {
        format!("{:.6}", diff.abs())
    } else {
        format!("{:.6}percent ", percent * 100.0)
    };
    if percent > 0.0 && percent < THRESHOLD {
        cmp.score = 1.0 - percent;
    }
    let direction = if diff > 0.0 { "larger" } else { "smaller" };
    cmp.desc.insert(format!("value is {direction} by {difference}"));
}

fn compare_arrays(src: &DataPoint, dst: &DataPoint, cmp: &mut TypeComparison) {
    let src_members: Vec<DataPoint> = flatten(src).into_values().collect();
    let dst_members: Vec<DataPoint> = flatten(dst).into_values().collect();
    let lo = src_members.len().min(dst_members.len());
    let hi = src_members.len().max(dst_members.len());

    // Two empty arrays are identical; handling this up front also protects
    // the size-ratio division below.
    if hi == 0 {
        cmp.perfect();
        return;
    }

    let diff_range = hi - lo;
    if diff_range != 0 {
        let change = if src_members.len() < dst_members.len() {
            "shrunk"
        } else {
            "grown"
        };
        cmp.desc
            .insert(format!("array size {change} by {diff_range} elements"));
    }

    // Element-wise information stops being helpful once the size change is
    // itself substantial, or when the candidate side is empty.
    let size_ratio = diff_range as f64 / hi as f64;
    if size_ratio > THRESHOLD || src_members.is_empty() {
        cmp.dst_value = Some(dst.to_string());
        return;
    }

    let mut score_earned = 0.0;
    let mut differences: BTreeMap<usize, BTreeSet<String>> = BTreeMap::new();
    for index in 0..lo {
        let child = compare(&src_members[index], &dst_members[index]);
        score_earned += child.score;
        if !child.is_perfect() {
            differences.insert(index, child.desc);
        }
    }
    cmp.score = score_earned / hi as f64;

    // Per-element descriptions are suppressed when too many elements differ
    // for the list to be readable; the aggregate score still stands.
    let diff_ratio = differences.len() as f64 / src_members.len() as f64;
    if diff_ratio < THRESHOLD || differences.len() < DIFF_SIZE_THRESHOLD {
        for (index, messages) in &differences {
            for message in messages {
                cmp.desc.insert(format!("[{index}]:{message}"));
            }
        }
    }

    if cmp.score == 1.0 {
        cmp.match_type = MatchType::Perfect;
        return;
    }
    cmp.dst_value = Some(dst.to_string());
}

fn compare_objects(src: &DataPoint, dst: &DataPoint, cmp: &mut TypeComparison) {
    let src_members = flatten(src);
    let dst_members = flatten(dst);

    let mut score_earned = 0.0;
    let mut score_total = 0u32;
    for (key, src_member) in &src_members {
        score_total += 1;
        match dst_members.get(key) {
            Some(dst_member) => {
                let child = compare(src_member, dst_member);
                score_earned += child.score;
                if child.is_perfect() {
                    continue;
                }
                for message in &child.desc {
                    cmp.desc.insert(format!("{key}: {message}"));
                }
            }
            None => {
                cmp.desc.insert(format!("{key}: missing"));
            }
        }
    }
    for key in dst_members.keys() {
        if !src_members.contains_key(key) {
            cmp.desc.insert(format!("{key}: new"));
            score_total += 1;
        }
    }

    if score_earned == f64::from(score_total) {
        cmp.perfect();
        return;
    }
    cmp.score = score_earned / f64::from(score_total);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
