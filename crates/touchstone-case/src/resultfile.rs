// SPDX-License-Identifier: MIT OR Apache-2.0
//! Local result files: batches of test cases persisted in the binary
//! envelope.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use touchstone_wire::decode_batch;

use crate::testcase::TestCase;

/// Errors from reading or writing a result file.
#[derive(Debug, thiserror::Error)]
pub enum ResultFileError {
    /// The file does not exist or does not hold a valid batch envelope.
    #[error("result file invalid: {path}")]
    Invalid {
        /// Path of the offending file.
        path: PathBuf,
    },

    /// A filesystem operation failed.
    #[error("failed to save content to disk: {0}")]
    Io(#[source] std::io::Error),
}

/// A batch of test cases stored on disk in the binary envelope.
///
/// The file content is parsed lazily: [`validate`](Self::validate) and
/// [`parse`](Self::parse) read from disk until [`load`](Self::load) or
/// [`save`](Self::save) populate the in-memory view.
#[derive(Debug, Clone, Default)]
pub struct ResultFile {
    path: PathBuf,
    cases: BTreeMap<String, TestCase>,
}

impl ResultFile {
    /// Refer to the result file at `path` without touching the disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cases: BTreeMap::new(),
        }
    }

    /// Path this result file refers to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file holds a decodable batch envelope.
    pub fn validate(&self) -> bool {
        // Content already loaded has already been validated.
        if !self.cases.is_empty() {
            return true;
        }
        match std::fs::read(&self.path) {
            Ok(buffer) => decode_batch(&buffer).is_ok(),
            Err(_) => false,
        }
    }

    /// Parse the stored cases, keyed by case slug.
    pub fn parse(&self) -> Result<BTreeMap<String, TestCase>, ResultFileError> {
        if !self.cases.is_empty() {
            return Ok(self.cases.clone());
        }
        let buffer = std::fs::read(&self.path).map_err(|_| ResultFileError::Invalid {
            path: self.path.clone(),
        })?;
        let cases = TestCase::deserialize(&buffer).map_err(|_| ResultFileError::Invalid {
            path: self.path.clone(),
        })?;
        Ok(cases
            .into_iter()
            .map(|case| (case.metadata().testcase.clone(), case))
            .collect())
    }

    /// Parse the file and keep the cases in memory.
    pub fn load(&mut self) -> Result<(), ResultFileError> {
        self.cases = self.parse()?;
        Ok(())
    }

    /// Whether the cases are held in memory.
    pub fn is_loaded(&self) -> bool {
        !self.cases.is_empty()
    }

    /// The in-memory cases, keyed by case slug.
    pub fn cases(&self) -> &BTreeMap<String, TestCase> {
        &self.cases
    }

    /// Write the given cases to disk, creating parent directories as
    /// needed, and keep them as the in-memory view.
    pub fn save(&mut self, cases: &[TestCase]) -> Result<(), ResultFileError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(ResultFileError::Io)?;
        }
        std::fs::write(&self.path, TestCase::serialize(cases)).map_err(ResultFileError::Io)?;
        self.cases = cases
            .iter()
            .map(|case| (case.metadata().testcase.clone(), case.clone()))
            .collect();
        Ok(())
    }

    /// Absorb the cases of another result file; on slug collisions the
    /// already-held case wins.
    pub fn merge(&mut self, other: &ResultFile) -> Result<(), ResultFileError> {
        for (name, case) in other.parse()? {
            self.cases.entry(name).or_insert(case);
        }
        Ok(())
    }

    /// JSON documents of the stored cases, one per case.
    pub fn json(&self) -> Result<Vec<Value>, ResultFileError> {
        Ok(self.parse()?.values().map(TestCase::json).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
