use criterion::{black_box, criterion_group, criterion_main, Criterion};
use multiverse::{EngineConfig, Supervisor};
use multiverse_cli::surface;

/// A long chain of plain mutations, each reading the previous event. No
/// forking or prophecy machinery triggers, so this isolates the cost of
/// statement dispatch and lazy evaluation from the concurrency machinery.
fn mutation_chain(len: usize) -> String {
    let mut src = String::from("x = 1\n");
    for _ in 1..len {
        src.push_str("x = x:-1 + 1\n");
    }
    src.push_str("out = x:0\n");
    src
}

/// A prophecy declared early and satisfied much later, forcing the
/// resolver to re-check it on every intervening step until it resolves.
fn long_pending_prophecy(len: usize) -> String {
    let mut src = String::from("x = 1\n");
    src.push_str(&format!("x:+{len} = {len}\n"));
    for _ in 1..len {
        src.push_str("x = x:-1 + 1\n");
    }
    src.push_str(&format!("x = {len}\n"));
    src
}

/// A single revision in the middle of an otherwise uneventful mutation
/// chain, forking one child universe that re-executes the tail on its own
/// thread. Unlike a chain of revisions, this keeps the universe count fixed
/// at two regardless of `len`, so it isolates the cost of one fork-and-join
/// against a context of a given size rather than compounding forks on top
/// of forks.
fn single_revision(len: usize) -> String {
    let mut src = String::from("x = 1\n");
    for _ in 1..len / 2 {
        src.push_str("x = x:-1 + 1\n");
    }
    src.push_str("x:0 = -1\n");
    for _ in len / 2..len {
        src.push_str("x = x:-1 + 1\n");
    }
    src
}

fn run_program(src: &str) {
    let (program, var_count) = surface::compile(src).expect("fixture program must compile");
    let report = Supervisor::new().run(program, var_count, EngineConfig::new());
    black_box(report);
}

fn criterion_benchmark(c: &mut Criterion) {
    let chain_100 = mutation_chain(100);
    c.bench_function("mutation_chain_100", |b| b.iter(|| run_program(&chain_100)));

    let prophecy_100 = long_pending_prophecy(100);
    c.bench_function("long_pending_prophecy_100", |b| b.iter(|| run_program(&prophecy_100)));

    let revision_100 = single_revision(100);
    c.bench_function("single_revision_100", |b| b.iter(|| run_program(&revision_100)));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
