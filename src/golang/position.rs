// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shared file/offset registry.
//!
//! Every parsed file is registered once and identified by a [`FileId`]; byte
//! offsets inside it can later be turned into `file:line:column` positions for
//! diagnostics. The registry is shared by all workers of a run and is safe for
//! concurrent use: registration takes a short write lock, lookups a read lock.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Handle for a file registered in a [`PositionRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(usize);

/// A resolved source position (1-based line and column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub path: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path.display(), self.line, self.column)
    }
}

#[derive(Debug)]
struct FileLines {
    path: PathBuf,
    line_starts: Vec<usize>,
}

/// Registry of line tables for every file parsed during a run.
#[derive(Debug, Default)]
pub struct PositionRegistry {
    files: RwLock<Vec<FileLines>>,
}

impl PositionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and its contents, returning its id.
    pub fn add_file(&self, path: &Path, source: &str) -> FileId {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );

        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        files.push(FileLines {
            path: path.to_path_buf(),
            line_starts,
        });
        FileId(files.len() - 1)
    }

    /// Translate a byte offset within a registered file into a position.
    pub fn position(&self, file: FileId, offset: usize) -> Option<Position> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        let lines = files.get(file.0)?;
        let line = match lines.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        Some(Position {
            path: lines.path.clone(),
            line: line + 1,
            column: offset - lines.line_starts[line] + 1,
        })
    }

    /// Path a file was registered under.
    pub fn path(&self, file: FileId) -> Option<PathBuf> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        files.get(file.0).map(|f| f.path.clone())
    }

    pub fn file_count(&self) -> usize {
        self.files.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
