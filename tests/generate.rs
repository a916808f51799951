// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end generation runs over small Go modules on disk.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use ddtrace_gen::config::load_config;
use ddtrace_gen::generate::{run, run_single, GenerateOptions};
use ddtrace_gen::RunReport;

// ============================================================================
// Fixtures
// ============================================================================

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn module(config: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "go.mod", "module example.com/shop\n\ngo 1.22\n");
    write(dir.path(), ".ddtrace.yaml", config);
    write(
        dir.path(),
        "model/model.go",
        "package model\n\ntype Order struct {\n\tID string\n}\n",
    );
    dir
}

async fn generate(dir: &TempDir, options: &GenerateOptions) -> RunReport {
    let config_path = dir.path().join(".ddtrace.yaml");
    let config = load_config(&config_path).unwrap();
    run(&config, &config_path, options).await.unwrap()
}

fn forced() -> GenerateOptions {
    GenerateOptions {
        force: true,
        ..GenerateOptions::default()
    }
}

fn read(dir: &TempDir, rel: &str) -> String {
    fs::read_to_string(dir.path().join(rel)).unwrap()
}

fn trace_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default();
    files.retain(|p| p.to_string_lossy().ends_with("_trace.go"));
    files.sort();
    files
}

const ORDERS: &str = r#"package orders

import (
	"context"

	"example.com/shop/model"
)

// Store persists orders.
type Store interface {
	Get(ctx context.Context, id string) (*model.Order, error)
	Put(ctx context.Context, o *model.Order) error
	Delete(ctx context.Context, id string) error
}

// Marker has nothing to trace.
type Marker interface{}
"#;

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_two_interfaces_one_empty() {
    let dir = module("packages:\n  ./orders: {}\n");
    write(dir.path(), "orders/orders.go", ORDERS);

    let report = generate(&dir, &GenerateOptions::default()).await;
    assert_eq!(report.files_written, 1);
    assert_eq!(report.interfaces_generated, 1);
    assert_eq!(report.interfaces_skipped, 1);

    let out = dir.path().join("orders/trace");
    assert_eq!(trace_files(&out), vec![out.join("orders_trace.go")]);

    let content = read(&dir, "orders/trace/orders_trace.go");
    assert!(content.starts_with("// Code generated by ddtrace. DO NOT EDIT.\n// source: orders.go\n"));
    assert_eq!(content.matches("struct {").count(), 1);
    assert!(content.contains("type StoreWithTracing struct {\n\torders.Store\n"));
    assert!(!content.contains("Marker"));
    for method in ["Get", "Put", "Delete"] {
        assert!(content.contains(&format!("_d._cfg.StartSpan(ctx, \"Store.{method}\")")));
    }
}

#[tokio::test]
async fn test_second_run_is_byte_identical() {
    let dir = module("packages:\n  ./orders: {}\n");
    write(dir.path(), "orders/orders.go", ORDERS);

    generate(&dir, &GenerateOptions::default()).await;
    let first = read(&dir, "orders/trace/orders_trace.go");

    let report = generate(&dir, &forced()).await;
    assert_eq!(report.files_written, 0);
    assert_eq!(report.files_unchanged, 1);
    assert_eq!(read(&dir, "orders/trace/orders_trace.go"), first);
}

#[tokio::test]
async fn test_pass_through_methods() {
    let dir = module("packages:\n  ./cache: {}\n");
    write(
        dir.path(),
        "cache/cache.go",
        r#"package cache

import "context"

type Cache interface {
	Fetch(ctx context.Context, key string) ([]byte, error)
	Len() int
	Flush()
}
"#,
    );

    generate(&dir, &GenerateOptions::default()).await;
    let content = read(&dir, "cache/trace/cache_trace.go");

    let len = &content[content.find("func (_d CacheWithTracing) Len()").unwrap()..];
    let len = &len[..len.find("\n}\n").unwrap()];
    assert!(!len.contains("StartSpan"));
    assert!(len.contains("return _d.Cache.Len()"));

    let flush = &content[content.find("func (_d CacheWithTracing) Flush()").unwrap()..];
    assert!(flush.starts_with("func (_d CacheWithTracing) Flush() {\n\t_d.Cache.Flush()\n}"));
}

#[tokio::test]
async fn test_ignore_directive() {
    let dir = module("packages:\n  ./billing: {}\n");
    write(
        dir.path(),
        "billing/billing.go",
        r#"package billing

import "context"

type Charger interface {
	Charge(ctx context.Context, cents int64) error
}

// Refunder is wired by hand.
//ddtrace:ignore
type Refunder interface {
	Refund(ctx context.Context, id string) error
}
"#,
    );

    generate(&dir, &GenerateOptions::default()).await;
    let content = read(&dir, "billing/trace/billing_trace.go");
    assert!(content.contains("ChargerWithTracing"));
    assert!(!content.contains("Refund"));
}

#[tokio::test]
async fn test_embedding_precedence() {
    let dir = module("packages:\n  ./svc: {}\n");
    write(
        dir.path(),
        "svc/svc.go",
        r#"package svc

import "context"

type Reader interface {
	Load(ctx context.Context, id string) (string, error)
}

type Loader interface {
	Load(ctx context.Context, id int) error
}

type Both interface {
	Reader
	Loader
}

type Own interface {
	Reader
	Load(ctx context.Context) error
}
"#,
    );

    generate(&dir, &GenerateOptions::default()).await;
    let content = read(&dir, "svc/trace/svc_trace.go");
    assert!(content.contains(
        "func (_d BothWithTracing) Load(ctx context.Context, id string) (r0 string, err error) {"
    ));
    assert!(content.contains("func (_d OwnWithTracing) Load(ctx context.Context) (err error) {"));
}

#[tokio::test]
async fn test_cross_package_embed() {
    let dir = module("packages:\n  ./api: {}\n");
    write(
        dir.path(),
        "model/repo.go",
        "package model\n\nimport \"context\"\n\ntype Repo interface {\n\tFind(ctx context.Context, id string) (*Order, error)\n}\n",
    );
    write(
        dir.path(),
        "api/api.go",
        "package api\n\nimport \"example.com/shop/model\"\n\ntype Repo interface {\n\tmodel.Repo\n}\n",
    );

    generate(&dir, &GenerateOptions::default()).await;
    let content = read(&dir, "api/trace/api_trace.go");
    assert!(content.contains("\"example.com/shop/model\""));
    assert!(content.contains("Find(ctx context.Context, id string) (r0 *model.Order, err error)"));
}

// ============================================================================
// Batch behavior
// ============================================================================

#[tokio::test]
async fn test_touched_config_regenerates_everything() {
    let dir = module("packages:\n  ./...: {}\n");
    write(dir.path(), "orders/orders.go", ORDERS);
    write(
        dir.path(),
        "users/users.go",
        "package users\n\nimport \"context\"\n\ntype Users interface {\n\tGet(ctx context.Context, id string) error\n}\n",
    );

    let first = generate(&dir, &GenerateOptions::default()).await;
    assert_eq!(first.files_written, 2);

    let second = generate(&dir, &GenerateOptions::default()).await;
    // model declares no interfaces, so it never has output and is always rechecked.
    assert_eq!(second.packages_up_to_date, 2);
    assert_eq!(second.files_unchanged + second.files_written, 0);

    File::options()
        .write(true)
        .open(dir.path().join(".ddtrace.yaml"))
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(60))
        .unwrap();

    let third = generate(&dir, &GenerateOptions::default()).await;
    assert_eq!(third.packages_up_to_date, 0);
    assert_eq!(third.packages_processed, 3);
    assert_eq!(third.files_unchanged, 2);
}

#[tokio::test]
async fn test_output_directory_is_not_scanned() {
    let dir = module("output: gen\npackages:\n  ./...: {}\n");
    write(dir.path(), "orders/orders.go", ORDERS);
    write(
        dir.path(),
        "orders/gen/handwritten.go",
        "package gen\n\nimport \"context\"\n\ntype Extra interface {\n\tRun(ctx context.Context) error\n}\n",
    );

    let report = generate(&dir, &GenerateOptions::default()).await;
    assert_eq!(report.files_written, 1);
    assert!(dir.path().join("orders/gen/orders_trace.go").exists());
    assert!(!dir.path().join("orders/gen/gen").exists());

    let content = read(&dir, "orders/gen/orders_trace.go");
    assert!(content.contains("package gen\n"));
}

#[tokio::test]
async fn test_dotted_output_directory_is_not_scanned() {
    let dir = module("output: ./trace\npackages:\n  ./...: {}\n");
    write(dir.path(), "orders/orders.go", ORDERS);
    write(
        dir.path(),
        "orders/trace/extra.go",
        "package trace\n\nimport \"context\"\n\ntype Extra interface {\n\tRun(ctx context.Context) error\n}\n",
    );

    let report = generate(&dir, &GenerateOptions::default()).await;
    assert_eq!(report.interfaces_generated, 1);
    assert!(dir.path().join("orders/trace/orders_trace.go").exists());
    assert!(!dir.path().join("orders/trace/trace").exists());
}

#[tokio::test]
async fn test_failed_resolution_skips_only_that_interface() {
    let dir = module("packages:\n  ./svc: {}\n");
    write(
        dir.path(),
        "svc/svc.go",
        r#"package svc

import "context"

type Good interface {
	Run(ctx context.Context) error
}

type Bad interface {
	nope.Thing
}

type Ping interface {
	Pong
}

type Pong interface {
	Ping
}
"#,
    );

    let report = generate(&dir, &GenerateOptions::default()).await;
    assert_eq!(report.packages_failed, 0);
    assert_eq!(report.interfaces_generated, 1);
    assert_eq!(report.interfaces_skipped, 3);

    let content = read(&dir, "svc/trace/svc_trace.go");
    assert!(content.contains("GoodWithTracing"));
    assert!(!content.contains("BadWithTracing"));
    assert!(!content.contains("PingWithTracing"));
}

#[tokio::test]
async fn test_nothing_to_generate_is_not_an_error() {
    let dir = module("packages:\n  ./...: {}\n");
    let report = generate(&dir, &GenerateOptions::default()).await;
    assert_eq!(report.interfaces_generated, 0);
    assert_eq!(report.files_written, 0);
}

#[tokio::test]
async fn test_per_interface_overrides() {
    let dir = module(
        "no-generate: true\npackages:\n  ./orders:\n    output: traced\n    interfaces:\n      Store:\n        decorator-name: TracedStore\n        span-prefix: orders.store\n",
    );
    write(dir.path(), "orders/orders.go", ORDERS);

    generate(&dir, &GenerateOptions::default()).await;
    let content = read(&dir, "orders/traced/orders_trace.go");
    assert!(content.contains("type TracedStore struct {"));
    assert!(content.contains("func NewTracedStore(base orders.Store, opts ...tracing.TracingOption) TracedStore {"));
    assert!(content.contains("StartSpan(ctx, \"orders.store.Get\")"));
    assert!(!content.contains("go:generate"));
}

#[tokio::test]
async fn test_single_package_mode() {
    let dir = module("packages: {}\n");
    write(dir.path(), "orders/orders.go", ORDERS);

    let report = run_single(dir.path(), "./orders", "./trace", &GenerateOptions::default())
        .await
        .unwrap();
    assert_eq!(report.files_written, 1);
    let content = read(&dir, "orders/trace/orders_trace.go");
    assert!(content.contains("//go:generate ddtrace gen -p example.com/shop/orders -o ./trace\n"));
}
