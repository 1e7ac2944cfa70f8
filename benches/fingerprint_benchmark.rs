use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hookenv::catalog::Catalog;
use hookenv::fingerprint;
use std::path::Path;

fn benchmark_repo_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("repo_fingerprint");

    for count in [0usize, 5, 50] {
        let deps: Vec<String> = (0..count).map(|i| format!("package-{i}==1.{i}.0")).collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &deps, |b, deps| {
            b.iter(|| {
                fingerprint::repo_dir_name(
                    black_box("https://github.com/psf/black"),
                    black_box("23.1.0"),
                    black_box(deps),
                )
            })
        });
    }

    group.finish();
}

fn benchmark_environment_name(c: &mut Criterion) {
    c.bench_function("environment_name", |b| {
        b.iter(|| {
            for language in ["python", "nodejs", "golang", "rust", "system"] {
                black_box(fingerprint::environment_name(black_box(language), "default"));
            }
        })
    });
}

fn benchmark_catalog_lookup(c: &mut Criterion) {
    let catalog = Catalog::in_memory().unwrap();
    for i in 0..500 {
        catalog
            .put_repo_entry(
                &format!("https://example/repo{i}"),
                "v1",
                Path::new(&format!("/cache/repos/repo{i:012}")),
            )
            .unwrap();
    }

    c.bench_function("catalog_get_repo_path", |b| {
        b.iter(|| {
            catalog
                .get_repo_path(black_box("https://example/repo250"), black_box("v1"))
                .unwrap()
        })
    });
}

criterion_group!(
    benches,
    benchmark_repo_fingerprint,
    benchmark_environment_name,
    benchmark_catalog_lookup
);
criterion_main!(benches);
