use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use crossbeam_channel::unbounded;
use jobpool::{Dispatcher, Job, PoolConfig, WorkerId};
use std::hint::black_box;
use std::time::Instant;

// Total number of jobs pushed through the pool per benchmark iteration
const TOTAL_JOBS: usize = 10_000;

/// A small CPU-bound job so the benchmark measures pool overhead, not sleep.
struct Spin(u64);

impl Job for Spin {
    fn run(&mut self, worker: WorkerId) {
        let mut acc = self.0 ^ worker.get() as u64;
        for i in 0..64 {
            acc = acc.wrapping_mul(6364136223846793005).wrapping_add(i);
        }
        self.0 = black_box(acc);
    }
}

/// Push `TOTAL_JOBS` through pools of increasing size, retrying on
/// backpressure and waiting for every exit notification.
fn bench_throughput(c: &mut Criterion, group_name: &str, max_pending_jobs: usize) {
    let mut group = c.benchmark_group(group_name);

    for num_workers in [1, 2, 4, 8] {
        group.throughput(Throughput::Elements(TOTAL_JOBS as u64));
        group.bench_function(
            format!("elems/{}/workers/{}", TOTAL_JOBS, num_workers),
            |b| {
                b.iter_custom(|iters| {
                    let start = Instant::now();

                    for _ in 0..iters {
                        let (exit_tx, exit_rx) = unbounded();
                        let pool = Dispatcher::new(
                            PoolConfig::new(num_workers, max_pending_jobs),
                            Some(exit_tx),
                        )
                        .unwrap();
                        pool.run().unwrap();

                        for i in 0..TOTAL_JOBS {
                            let mut job = Spin(i as u64);
                            while let Err(full) = pool.try_enqueue(job) {
                                job = full.into_inner();
                                std::thread::yield_now();
                            }
                        }
                        for _ in 0..TOTAL_JOBS {
                            black_box(exit_rx.recv().unwrap());
                        }

                        for worker in pool.workers() {
                            worker.stop().unwrap();
                        }
                    }

                    start.elapsed()
                });
            },
        );
    }

    group.finish();
}

fn benchmark_shallow_queue(c: &mut Criterion) {
    bench_throughput(c, "pool/queue/1", 1)
}

fn benchmark_deep_queue(c: &mut Criterion) {
    bench_throughput(c, "pool/queue/256", 256)
}

criterion_group!(benches, benchmark_shallow_queue, benchmark_deep_queue);
criterion_main!(benches);
