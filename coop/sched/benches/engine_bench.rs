//! Admission and drain throughput for the scheduling engine.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use coop_sched::{ManualHost, Priority, ScheduleOptions, Scheduler, TaskStep};

fn bench_schedule_and_drain(c: &mut Criterion) {
    c.bench_function("schedule_and_drain_1k", |b| {
        b.iter(|| {
            let host = ManualHost::new();
            let scheduler = Scheduler::new(Arc::new(host.clone()));
            for i in 0..1_000u64 {
                let priority = match i % 4 {
                    0 => Priority::UserBlocking,
                    1 => Priority::Normal,
                    2 => Priority::Low,
                    _ => Priority::Idle,
                };
                scheduler.schedule(
                    priority,
                    |_| Ok(TaskStep::Complete),
                    ScheduleOptions::default(),
                );
            }
            host.pump(&scheduler);
        });
    });
}

fn bench_yielding_task(c: &mut Criterion) {
    c.bench_function("yield_chain_100", |b| {
        b.iter(|| {
            let host = ManualHost::new();
            let scheduler = Scheduler::new(Arc::new(host.clone()));
            fn step(remaining: u32) -> coop_sched::TaskResult {
                if remaining == 0 {
                    Ok(TaskStep::Complete)
                } else {
                    Ok(TaskStep::continue_with(move |_| step(remaining - 1)))
                }
            }
            scheduler.schedule(
                Priority::Normal,
                |_| step(100),
                ScheduleOptions::default(),
            );
            host.pump(&scheduler);
        });
    });
}

criterion_group!(benches, bench_schedule_and_drain, bench_yielding_task);
criterion_main!(benches);
