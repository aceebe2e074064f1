//! Criterion benchmarks for the lazy parsing and navigation pipeline.
//!
//! The point of a lazy tree is to pay only for the paths you navigate, so
//! these benchmarks compare full eager access against navigating a single
//! deep path, on the same document.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use lazytree_core::document::Document;
use lazytree_core::options::DiffMode;
use lazytree_core::tree::VirtualTree;

/// A catalog-shaped document with `n` items, each with a handful of scalar
/// fields and a small nested object — deep enough to make scanning the
/// whole thing vs. a single path observably different.
fn build_catalog(n: usize) -> String {
    let mut items = String::new();
    for i in 0..n {
        if i > 0 {
            items.push(',');
        }
        items.push_str(&format!(
            r#"{{"sku": "SKU-{i}", "price": {price}, "tags": ["a", "b", "c"], "meta": {{"weight": {weight}, "active": true}}}}"#,
            i = i,
            price = i as f64 * 1.5,
            weight = i % 7,
        ));
    }
    format!(r#"{{"name": "catalog", "items": [{items}]}}"#)
}

fn bench_parse_only(c: &mut Criterion) {
    let text = build_catalog(500);
    c.bench_function("parse/catalog_500", |b| {
        b.iter(|| Document::parse(black_box(&text)).unwrap())
    });
}

fn bench_navigate_single_path(c: &mut Criterion) {
    let text = build_catalog(500);
    c.bench_function("navigate/single_deep_path", |b| {
        b.iter(|| {
            let doc = Document::parse(black_box(&text)).unwrap();
            let tree = VirtualTree::root(doc);
            black_box(tree.member("items").element(250).member("meta").member("weight").value().unwrap())
        })
    });
}

fn bench_navigate_every_item(c: &mut Criterion) {
    let text = build_catalog(500);
    c.bench_function("navigate/every_item_sku", |b| {
        b.iter(|| {
            let doc = Document::parse(black_box(&text)).unwrap();
            let tree = VirtualTree::root(doc);
            let count = tree.member("items").size().unwrap();
            for i in 0..count {
                black_box(tree.member("items").element(i).member("sku").value().unwrap());
            }
        })
    });
}

fn bench_diff_strict(c: &mut Criterion) {
    let expected_text = build_catalog(200);
    let mut actual_text = build_catalog(200);
    actual_text = actual_text.replacen("SKU-50", "SKU-CHANGED", 1);

    c.bench_function("diff/strict_catalog_200", |b| {
        b.iter(|| {
            let expected = VirtualTree::root(Document::parse(black_box(&expected_text)).unwrap());
            let actual = VirtualTree::root(Document::parse(black_box(&actual_text)).unwrap());
            black_box(lazytree_core::diff::diff(&expected, &actual, &DiffMode::strict()))
        })
    });
}

criterion_group!(
    benches,
    bench_parse_only,
    bench_navigate_single_path,
    bench_navigate_every_item,
    bench_diff_strict,
);
criterion_main!(benches);
