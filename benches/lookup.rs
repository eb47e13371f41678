// ABOUTME: Benchmarks for hardware tree lookup and access performance
// ABOUTME: Measures path parsing, resolution and register reads using Criterion

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use hwtree::{BitWidth, Builder, ConstantField, HwTree, LookupMode, Path, ScopeId, SimBinding};
use std::hint::black_box;
use std::rc::Rc;

/// Build a tree of `width` cpu scopes, each with a register and a field
fn build_tree(width: usize) -> (HwTree, ScopeId) {
    let sim = Rc::new(SimBinding::new());
    let mut tree = HwTree::with_binding(sim);
    let mut builder = Builder::new(&mut tree);
    for index in 0..width {
        builder.open_scope("cpu[]", None);
        builder.bookmark("cpu");
        builder
            .register("%eax", index as u64 * 4, BitWidth::Bits32)
            .unwrap();
        builder.field("id", ConstantField::new(index as u64)).unwrap();
        builder.close_scope(None).unwrap();
    }
    builder.alias("first", "cpu[0]/%eax").unwrap();
    let root = builder.finish();
    (tree, root)
}

fn bench_path_parsing(c: &mut Criterion) {
    c.bench_function("parse_path", |b| {
        b.iter(|| Path::parse(black_box("/bus/pci[3]/dev[-1]/$cfg/../vendor")))
    });
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");

    for width in [4, 64, 1024] {
        let (tree, root) = build_tree(width);
        let path = Path::parse("cpu[-1]/%eax");
        group.bench_with_input(BenchmarkId::new("array_tail", width), &path, |b, path| {
            b.iter(|| tree.lookup(root, path, LookupMode::Literal).unwrap())
        });
    }

    let (tree, root) = build_tree(16);
    let alias = Path::parse("first");
    group.bench_function("follow_alias", |b| {
        b.iter(|| tree.lookup(root, &alias, LookupMode::FollowAliases).unwrap())
    });

    let cpu = tree
        .scope(root)
        .lookup_scope("cpu[7]")
        .unwrap()
        .unwrap()
        .id();
    let bookmark = Path::parse("$cpu/id");
    group.bench_function("bookmark", |b| {
        b.iter(|| tree.read(cpu, &bookmark).unwrap())
    });

    group.finish();
}

fn bench_register_read(c: &mut Criterion) {
    let (tree, root) = build_tree(16);
    let path = Path::parse("/cpu[3]/%eax");

    c.bench_function("read_register", |b| {
        b.iter(|| tree.read(root, &path).unwrap())
    });
}

fn bench_walk(c: &mut Criterion) {
    let (tree, root) = build_tree(256);

    c.bench_function("walk_tree", |b| b.iter(|| tree.walk(root).count()));
}

criterion_group!(
    benches,
    bench_path_parsing,
    bench_lookup,
    bench_register_read,
    bench_walk
);
criterion_main!(benches);
