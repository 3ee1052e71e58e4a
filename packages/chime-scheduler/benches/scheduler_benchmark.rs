use chime_scheduler::{LocalScheduler, SchedulerBuilder};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn benchmark_microtasks(c: &mut Criterion) {
    c.bench_function("schedule_microtask 1000", |b| {
        b.iter(|| {
            let scheduler = LocalScheduler::new();
            for _ in 0..1000 {
                scheduler.schedule_microtask(|| {
                    black_box(1 + 1);
                });
            }
            scheduler.run().unwrap();
        })
    });
}

fn benchmark_timers(c: &mut Criterion) {
    c.bench_function("schedule_timer 1000", |b| {
        b.iter(|| {
            let scheduler = SchedulerBuilder::new().log_task_errors(false).build();
            for i in 0..1000 {
                scheduler
                    .schedule_timer(black_box((i * 7919) % 1000), || {
                        black_box(1 + 1);
                    })
                    .unwrap();
            }
            scheduler.run().unwrap();
        })
    });
}

criterion_group!(benches, benchmark_microtasks, benchmark_timers);
criterion_main!(benches);
