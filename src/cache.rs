// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Package cache shared by every worker of a run.
//!
//! Two independent maps keyed by import path hold loaded package metadata and
//! parsed syntax. Each key owns a once-cell, so concurrent callers asking for
//! the same package wait for a single load instead of racing. Failed loads are
//! memoized as well. Nothing is evicted; the cache lives for one invocation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::OnceCell;

use crate::error::LoadError;
use crate::golang::{parse_package, PackageRef, ParsedPackage, PositionRegistry, SourceLoader};

type Slot<T> = Arc<OnceCell<Result<Arc<T>, LoadError>>>;

/// A loaded package together with its parsed files.
#[derive(Debug, Clone)]
pub struct PackageContext {
    pub package: Arc<PackageRef>,
    pub parsed: Arc<ParsedPackage>,
}

impl PackageContext {
    pub fn import_path(&self) -> &str {
        &self.package.import_path
    }
}

/// Concurrency-safe memoization over a [`SourceLoader`].
pub struct PackageCache {
    loader: Arc<dyn SourceLoader>,
    registry: Arc<PositionRegistry>,
    packages: RwLock<HashMap<String, Slot<PackageRef>>>,
    parsed: RwLock<HashMap<String, Slot<ParsedPackage>>>,
    loads: AtomicUsize,
    parses: AtomicUsize,
}

impl PackageCache {
    pub fn new(loader: Arc<dyn SourceLoader>, registry: Arc<PositionRegistry>) -> Self {
        Self {
            loader,
            registry,
            packages: RwLock::new(HashMap::new()),
            parsed: RwLock::new(HashMap::new()),
            loads: AtomicUsize::new(0),
            parses: AtomicUsize::new(0),
        }
    }

    /// Insert already-loaded packages without triggering loads.
    ///
    /// Entries that are already present are left untouched.
    pub fn seed(&self, packages: impl IntoIterator<Item = PackageRef>) {
        let mut map = self.packages.write().unwrap_or_else(PoisonError::into_inner);
        for package in packages {
            let key = package.import_path.clone();
            let slot = map.entry(key).or_default();
            let _ = slot.set(Ok(Arc::new(package)));
        }
    }

    /// Package metadata, loading it on first use.
    pub fn package(&self, import_path: &str) -> Result<Arc<PackageRef>, LoadError> {
        let slot = slot_for(&self.packages, import_path);
        slot.get_or_init(|| {
            self.loads.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("loading package {}", import_path);
            self.loader.load(import_path).map(Arc::new)
        })
        .clone()
    }

    /// Parsed syntax of a package, loading and parsing it on first use.
    pub fn parsed(&self, import_path: &str) -> Result<Arc<ParsedPackage>, LoadError> {
        let slot = slot_for(&self.parsed, import_path);
        slot.get_or_init(|| {
            let package = self.package(import_path)?;
            self.parses.fetch_add(1, Ordering::Relaxed);
            parse_package(&package, &self.registry).map(Arc::new)
        })
        .clone()
    }

    /// Metadata and syntax of a package.
    pub fn context(&self, import_path: &str) -> Result<PackageContext, LoadError> {
        Ok(PackageContext {
            package: self.package(import_path)?,
            parsed: self.parsed(import_path)?,
        })
    }

    /// Number of loads performed through the loader (seeded entries excluded).
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::Relaxed)
    }
}

/// Fetch or create the once-cell for `key`: read lock first, write lock on miss.
fn slot_for<T>(map: &RwLock<HashMap<String, Slot<T>>>, key: &str) -> Slot<T> {
    if let Some(slot) = map
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(key)
    {
        return Arc::clone(slot);
    }
    let mut map = map.write().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(map.entry(key.to_string()).or_default())
}
