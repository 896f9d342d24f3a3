//! Cooperative scheduling demonstration.
//!
//! Drives the scheduler through a deterministic manual host with a mix of
//! work shapes:
//! - a Normal-priority render task that works in yielding 4ms chunks,
//! - a UserBlocking input task arriving while the render is mid-flight,
//! - a delayed housekeeping task,
//! - an Idle-priority cache trim,
//! - a speculative prefetch that gets cancelled before it runs,
//! - and a thumbnail task that fails, showing fault re-surfacing.
//!
//! Profiling is on for the whole run; the decoded event log and the final
//! counter cells are printed at the end.

use std::sync::Arc;

use coop_sched::{
    ManualHost, Priority, ScheduleOptions, Scheduler, TaskResult, TaskFault, TaskStep, TimeDelta,
};
use coop_trace::decode_events;

fn render_chunk(host: ManualHost, remaining: u32) -> TaskResult {
    println!("  render: working ({remaining} chunks left)");
    host.advance(TimeDelta::from_millis(4));
    if remaining == 0 {
        println!("  render: done");
        Ok(TaskStep::Complete)
    } else {
        Ok(TaskStep::continue_with(move |_| {
            render_chunk(host, remaining - 1)
        }))
    }
}

fn main() {
    let host = ManualHost::new();
    let scheduler = Arc::new(Scheduler::new(Arc::new(host.clone())));
    scheduler.start_profiling();

    println!("== scheduling ==");

    let render_host = host.clone();
    scheduler.schedule(
        Priority::Normal,
        move |_| render_chunk(render_host, 3),
        ScheduleOptions::default().with_label("render"),
    );

    // Arrives 6ms in, while the render task is between chunks.
    let input_sched = Arc::clone(&scheduler);
    scheduler.schedule(
        Priority::Normal,
        move |_| {
            input_sched.schedule(
                Priority::UserBlocking,
                |_| {
                    println!("  input: handled click");
                    Ok(TaskStep::Complete)
                },
                ScheduleOptions::default().with_label("input"),
            );
            Ok(TaskStep::Complete)
        },
        ScheduleOptions::delayed(TimeDelta::from_millis(6)).with_label("input-arrival"),
    );

    scheduler.schedule(
        Priority::Low,
        |_| {
            println!("  housekeeping: compacted state");
            Ok(TaskStep::Complete)
        },
        ScheduleOptions::delayed(TimeDelta::from_millis(25)).with_label("housekeeping"),
    );

    scheduler.schedule(
        Priority::Idle,
        |_| {
            println!("  idle: trimmed caches");
            Ok(TaskStep::Complete)
        },
        ScheduleOptions::default().with_label("cache-trim"),
    );

    let speculative = scheduler.schedule(
        Priority::Low,
        |_| {
            println!("  prefetch: should never run");
            Ok(TaskStep::Complete)
        },
        ScheduleOptions::default().with_label("prefetch"),
    );

    scheduler.schedule(
        Priority::Normal,
        |_| Err(TaskFault::new("thumbnail decode failed")),
        ScheduleOptions::default().with_label("thumbnail"),
    );

    println!("queued: {} live tasks", scheduler.queue_size());
    scheduler.cancel(&speculative);
    println!("cancelled prefetch; {} live tasks remain", scheduler.queue_size());

    println!("== running ==");
    let turns = host.pump(&scheduler);
    println!("host took {turns} turns to drain the queue");

    for (task, fault) in host.take_faults() {
        println!("unhandled fault from {task}: {fault}");
    }

    println!("== trace ==");
    if let Some(log) = scheduler.stop_profiling() {
        for event in decode_events(&log) {
            println!("  {event:?}");
        }
    }

    let counters = scheduler.profiler().counters();
    println!(
        "final counters: priority={} task={} run={} queue={}",
        counters.current_priority, counters.current_task, counters.current_run, counters.queue_size
    );
}
