//! Storage backend benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use objgraph_bench::random_text;
use objgraph_storage::{FileBackend, InMemoryBackend, RecordBackend, RecordKey};
use tempfile::TempDir;

fn key(i: usize) -> RecordKey {
    RecordKey::new("Bench", format!("id-{i}")).unwrap()
}

/// Benchmark InMemoryBackend writes.
fn bench_inmemory_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("inmemory_write");

    for size in [64, 256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let backend = InMemoryBackend::new();
            let text = random_text(size);
            let key = key(0);

            b.iter(|| backend.write(black_box(&key), black_box(&text)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark InMemoryBackend reads.
fn bench_inmemory_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("inmemory_read");

    for size in [64, 256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let backend = InMemoryBackend::new();
            let key = key(0);
            backend.write(&key, &random_text(size)).unwrap();

            b.iter(|| black_box(backend.read(black_box(&key)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark FileBackend writes, with and without fsync.
fn bench_file_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_write");

    // Use larger sample size for file operations
    group.sample_size(50);

    for size in [256, 4096].iter() {
        for sync in [false, true] {
            group.throughput(Throughput::Bytes(*size as u64));
            group.bench_with_input(
                BenchmarkId::new(if sync { "sync" } else { "nosync" }, size),
                size,
                |b, &size| {
                    let temp_dir = TempDir::new().unwrap();
                    let backend = FileBackend::with_options(temp_dir.path(), "rec", sync).unwrap();
                    let text = random_text(size);
                    let key = key(0);

                    b.iter(|| backend.write(black_box(&key), black_box(&text)).unwrap());
                },
            );
        }
    }

    group.finish();
}

/// Benchmark FileBackend reads.
fn bench_file_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_read");
    group.sample_size(50);

    for size in [256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let temp_dir = TempDir::new().unwrap();
            let backend = FileBackend::open(temp_dir.path()).unwrap();
            let key = key(0);
            backend.write(&key, &random_text(size)).unwrap();

            b.iter(|| black_box(backend.read(black_box(&key)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark listing identities of a type.
fn bench_list_ids(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_ids");
    group.sample_size(20);

    for count in [100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));

        group.bench_with_input(BenchmarkId::new("inmemory", count), count, |b, &count| {
            let backend = InMemoryBackend::new();
            for i in 0..count {
                backend.write(&key(i), "{6:x}").unwrap();
            }
            b.iter(|| black_box(backend.list_ids(black_box("Bench")).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("file", count), count, |b, &count| {
            let temp_dir = TempDir::new().unwrap();
            let backend = FileBackend::with_options(temp_dir.path(), "rec", false).unwrap();
            for i in 0..count {
                backend.write(&key(i), "{6:x}").unwrap();
            }
            b.iter(|| black_box(backend.list_ids(black_box("Bench")).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark existence checks against a populated file store.
fn bench_exists(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let backend = FileBackend::with_options(temp_dir.path(), "rec", false).unwrap();
    for i in 0..1000 {
        backend.write(&key(i), "{6:x}").unwrap();
    }

    let mut idx = 0;
    c.bench_function("file_exists_1000_records", |b| {
        b.iter(|| {
            // Look up hits and misses in pseudo-random order
            let found = backend.exists(black_box(&key((idx * 7) % 2000))).unwrap();
            idx = (idx + 1) % 2000;
            black_box(found);
        });
    });
}

criterion_group!(
    benches,
    bench_inmemory_write,
    bench_inmemory_read,
    bench_file_write,
    bench_file_read,
    bench_list_ids,
    bench_exists,
);

criterion_main!(benches);
