//! Engine behavior tests for coop-sched

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use coop_sched::{
    decode_events, HostBinding, ManualHost, Priority, ScheduleOptions, Scheduler, TaskFault,
    TaskId, TaskStep, TimeDelta, Timestamp, TraceEvent,
};

fn setup() -> (ManualHost, Arc<Scheduler>) {
    let host = ManualHost::new();
    let scheduler = Arc::new(Scheduler::new(Arc::new(host.clone())));
    (host, scheduler)
}

fn runs_of(events: &[TraceEvent], task: TaskId) -> Vec<u64> {
    events
        .iter()
        .filter_map(|event| match *event {
            TraceEvent::TaskRun { task: t, run, .. } if t == task => Some(run.raw()),
            _ => None,
        })
        .collect()
}

fn count_kind(events: &[TraceEvent], pred: impl Fn(&TraceEvent) -> bool) -> usize {
    events.iter().filter(|&event| pred(event)).count()
}

#[test]
fn test_queue_size_counts_live_tasks_across_both_queues() {
    let (host, scheduler) = setup();
    let a = scheduler.schedule(
        Priority::Normal,
        |_| Ok(TaskStep::Complete),
        ScheduleOptions::default(),
    );
    let _b = scheduler.schedule(
        Priority::Low,
        |_| Ok(TaskStep::Complete),
        ScheduleOptions::default(),
    );
    let c = scheduler.schedule(
        Priority::Normal,
        |_| Ok(TaskStep::Complete),
        ScheduleOptions::delayed(TimeDelta::from_millis(100)),
    );
    assert_eq!(scheduler.queue_size(), 3);

    scheduler.cancel(&a);
    assert_eq!(scheduler.queue_size(), 2);
    // Cancellation reaches into the timer queue just as well.
    scheduler.cancel(&c);
    assert_eq!(scheduler.queue_size(), 1);

    host.pump(&scheduler);
    assert_eq!(scheduler.queue_size(), 0);
    assert!(!scheduler.has_pending_work());
}

#[test]
fn test_continuations_keep_id_and_increment_run() {
    let (host, scheduler) = setup();
    scheduler.start_profiling();

    let handle = scheduler.schedule(
        Priority::Normal,
        |_| {
            Ok(TaskStep::continue_with(|_| {
                Ok(TaskStep::continue_with(|_| Ok(TaskStep::Complete)))
            }))
        },
        ScheduleOptions::default(),
    );
    host.pump(&scheduler);

    let events = decode_events(&scheduler.stop_profiling().unwrap());
    let runs = runs_of(&events, handle.id());
    assert_eq!(runs.len(), 3);
    assert!(runs[0] < runs[1] && runs[1] < runs[2]);
    assert_eq!(
        count_kind(&events, |e| matches!(e, TraceEvent::TaskYield { .. })),
        2
    );
    assert_eq!(
        count_kind(&events, |e| matches!(e, TraceEvent::TaskComplete { .. })),
        1
    );
}

#[test]
fn test_cancel_before_first_run() {
    let (host, scheduler) = setup();
    scheduler.start_profiling();

    let handle = scheduler.schedule(
        Priority::Normal,
        |_| Ok(TaskStep::Complete),
        ScheduleOptions::default(),
    );
    scheduler.cancel(&handle);
    host.pump(&scheduler);

    let events = decode_events(&scheduler.stop_profiling().unwrap());
    assert_eq!(
        count_kind(&events, |e| matches!(e, TraceEvent::TaskCancel { .. })),
        1
    );
    assert_eq!(
        count_kind(&events, |e| matches!(e, TraceEvent::TaskRun { .. })),
        0
    );
    assert_eq!(
        count_kind(&events, |e| matches!(e, TraceEvent::TaskComplete { .. })),
        0
    );
}

#[test]
fn test_repeated_cancel_emits_one_event() {
    let (_host, scheduler) = setup();
    scheduler.start_profiling();

    let handle = scheduler.schedule(
        Priority::Low,
        |_| Ok(TaskStep::Complete),
        ScheduleOptions::default(),
    );
    for _ in 0..5 {
        scheduler.cancel(&handle);
    }

    let events = decode_events(&scheduler.stop_profiling().unwrap());
    assert_eq!(
        count_kind(&events, |e| matches!(e, TraceEvent::TaskCancel { .. })),
        1
    );
    assert_eq!(scheduler.queue_size(), 0);
}

#[test]
fn test_cancel_after_completion_is_a_no_op() {
    let (host, scheduler) = setup();
    scheduler.start_profiling();

    let handle = scheduler.schedule(
        Priority::Normal,
        |_| Ok(TaskStep::Complete),
        ScheduleOptions::default(),
    );
    host.pump(&scheduler);
    assert!(!handle.is_live());

    scheduler.cancel(&handle);
    scheduler.cancel(&handle);

    let events = decode_events(&scheduler.stop_profiling().unwrap());
    assert_eq!(
        count_kind(&events, |e| matches!(e, TraceEvent::TaskCancel { .. })),
        0
    );
    assert_eq!(scheduler.queue_size(), 0);
}

#[test]
fn test_urgent_arrival_preempts_resumption() {
    let (host, scheduler) = setup();
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let h = host.clone();
    let sched = Arc::clone(&scheduler);
    let order_a = Arc::clone(&order);
    scheduler.schedule(
        Priority::Normal,
        move |_| {
            order_a.lock().unwrap().push("A1");
            // 100 units of work, then B arrives mid-run.
            h.advance(TimeDelta::from_millis(100));
            let order_b = Arc::clone(&order_a);
            sched.schedule(
                Priority::UserBlocking,
                move |_| {
                    order_b.lock().unwrap().push("B");
                    Ok(TaskStep::Complete)
                },
                ScheduleOptions::default(),
            );
            h.advance(TimeDelta::from_millis(200));
            let order_a2 = Arc::clone(&order_a);
            Ok(TaskStep::continue_with(move |_| {
                order_a2.lock().unwrap().push("A2");
                Ok(TaskStep::Complete)
            }))
        },
        ScheduleOptions::default(),
    );

    host.pump(&scheduler);
    // B's earlier deadline beats A's resumption.
    assert_eq!(*order.lock().unwrap(), vec!["A1", "B", "A2"]);
}

#[test]
fn test_fault_does_not_starve_queue() {
    let (host, scheduler) = setup();
    scheduler.start_profiling();

    let failing = scheduler.schedule(
        Priority::Normal,
        |_| Err(TaskFault::new("boom")),
        ScheduleOptions::default(),
    );
    let ran = Arc::new(AtomicBool::new(false));
    let ran_flag = Arc::clone(&ran);
    scheduler.schedule(
        Priority::Normal,
        move |_| {
            ran_flag.store(true, Ordering::SeqCst);
            Ok(TaskStep::Complete)
        },
        ScheduleOptions::default(),
    );

    host.pump(&scheduler);
    assert!(ran.load(Ordering::SeqCst));

    let faults = host.take_faults();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].0, failing.id());
    assert_eq!(faults[0].1.message(), "boom");

    let events = decode_events(&scheduler.stop_profiling().unwrap());
    assert_eq!(
        count_kind(&events, |e| matches!(e, TraceEvent::TaskError { .. })),
        1
    );
    assert_eq!(
        count_kind(&events, |e| matches!(e, TraceEvent::TaskComplete { .. })),
        1
    );
}

#[test]
fn test_priorities_run_in_deadline_order_and_idle_is_not_starved() {
    let (host, scheduler) = setup();
    let order: Arc<Mutex<Vec<Priority>>> = Arc::new(Mutex::new(Vec::new()));

    for priority in [
        Priority::Idle,
        Priority::Normal,
        Priority::UserBlocking,
        Priority::Low,
    ] {
        let order = Arc::clone(&order);
        scheduler.schedule(
            priority,
            move |_| {
                order.lock().unwrap().push(priority);
                Ok(TaskStep::Complete)
            },
            ScheduleOptions::default(),
        );
    }

    host.pump(&scheduler);
    assert_eq!(
        *order.lock().unwrap(),
        vec![
            Priority::UserBlocking,
            Priority::Normal,
            Priority::Low,
            Priority::Idle,
        ]
    );
}

#[test]
fn test_delayed_task_waits_for_start_time() {
    let (host, scheduler) = setup();
    let ran_at: Arc<Mutex<Option<Timestamp>>> = Arc::new(Mutex::new(None));

    let h = host.clone();
    let ran = Arc::clone(&ran_at);
    scheduler.schedule(
        Priority::Normal,
        move |_| {
            *ran.lock().unwrap() = Some(h.now());
            Ok(TaskStep::Complete)
        },
        ScheduleOptions::delayed(TimeDelta::from_millis(40)),
    );

    assert!(host.pending_timeout().is_some());
    assert!(!host.callback_requested());

    host.pump(&scheduler);
    assert_eq!(*ran_at.lock().unwrap(), Some(Timestamp::from_millis(40)));
}

#[test]
fn test_delayed_tasks_fire_in_start_time_order() {
    let (host, scheduler) = setup();
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let late = Arc::clone(&order);
    scheduler.schedule(
        Priority::Normal,
        move |_| {
            late.lock().unwrap().push("late");
            Ok(TaskStep::Complete)
        },
        ScheduleOptions::delayed(TimeDelta::from_millis(80)),
    );
    // Scheduling an earlier timer retargets the pending host timeout.
    let early = Arc::clone(&order);
    scheduler.schedule(
        Priority::Normal,
        move |_| {
            early.lock().unwrap().push("early");
            Ok(TaskStep::Complete)
        },
        ScheduleOptions::delayed(TimeDelta::from_millis(30)),
    );
    assert_eq!(host.pending_timeout(), Some(Timestamp::from_millis(30)));

    host.pump(&scheduler);
    assert_eq!(*order.lock().unwrap(), vec!["early", "late"]);
}

#[test]
fn test_should_yield_composes_urgent_arrival() {
    let (host, scheduler) = setup();
    let observed: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));

    let sched = Arc::clone(&scheduler);
    let seen = Arc::clone(&observed);
    scheduler.schedule(
        Priority::Normal,
        move |_| {
            assert_eq!(sched.current_priority_level(), Some(Priority::Normal));
            seen.lock().unwrap().push(sched.should_yield());
            sched.schedule(
                Priority::Immediate,
                |_| Ok(TaskStep::Complete),
                ScheduleOptions::default(),
            );
            seen.lock().unwrap().push(sched.should_yield());
            Ok(TaskStep::Complete)
        },
        ScheduleOptions::default(),
    );

    host.pump(&scheduler);
    // Quiet before the urgent arrival, yielding right after it.
    assert_eq!(*observed.lock().unwrap(), vec![false, true]);
}

#[test]
fn test_run_with_priority_nests_and_restores() {
    let (_host, scheduler) = setup();
    assert_eq!(scheduler.current_priority_level(), None);

    scheduler.run_with_priority(Priority::UserBlocking, || {
        assert_eq!(
            scheduler.current_priority_level(),
            Some(Priority::UserBlocking)
        );
        scheduler.run_with_priority(Priority::Idle, || {
            assert_eq!(scheduler.current_priority_level(), Some(Priority::Idle));
        });
        assert_eq!(
            scheduler.current_priority_level(),
            Some(Priority::UserBlocking)
        );
    });
    assert_eq!(scheduler.current_priority_level(), None);
}

#[test]
fn test_flush_with_did_timeout_runs_only_expired_tasks() {
    let (host, scheduler) = setup();
    let ran: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let immediate = Arc::clone(&ran);
    scheduler.schedule(
        Priority::Immediate,
        move |did_expire| {
            assert!(did_expire);
            immediate.lock().unwrap().push("immediate");
            Ok(TaskStep::Complete)
        },
        ScheduleOptions::default(),
    );
    let normal = Arc::clone(&ran);
    scheduler.schedule(
        Priority::Normal,
        move |_| {
            normal.lock().unwrap().push("normal");
            Ok(TaskStep::Complete)
        },
        ScheduleOptions::default(),
    );

    // The host grants no idle time on this entry.
    let has_more = scheduler.flush_work(true);
    assert!(has_more);
    assert_eq!(*ran.lock().unwrap(), vec!["immediate"]);
    assert!(host.callback_requested());

    host.pump(&scheduler);
    assert_eq!(*ran.lock().unwrap(), vec!["immediate", "normal"]);
}

#[test]
fn test_cancel_from_inside_another_task() {
    let (host, scheduler) = setup();
    scheduler.start_profiling();

    let victim_ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&victim_ran);
    let victim = scheduler.schedule(
        Priority::Low,
        move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(TaskStep::Complete)
        },
        ScheduleOptions::default(),
    );

    let sched = Arc::clone(&scheduler);
    scheduler.schedule(
        Priority::Normal,
        move |_| {
            sched.cancel(&victim);
            Ok(TaskStep::Complete)
        },
        ScheduleOptions::default(),
    );

    host.pump(&scheduler);
    assert!(!victim_ran.load(Ordering::SeqCst));

    let events = decode_events(&scheduler.stop_profiling().unwrap());
    assert_eq!(
        count_kind(&events, |e| matches!(e, TraceEvent::TaskCancel { .. })),
        1
    );
}

#[test]
fn test_suspend_resume_bracket_each_slice() {
    let (host, scheduler) = setup();
    scheduler.start_profiling();

    let h = host.clone();
    scheduler.schedule(
        Priority::Normal,
        move |_| {
            // Burn past the quantum so the continuation lands in slice two.
            h.advance(TimeDelta::from_millis(10));
            Ok(TaskStep::continue_with(|_| Ok(TaskStep::Complete)))
        },
        ScheduleOptions::default(),
    );

    host.pump(&scheduler);

    let events = decode_events(&scheduler.stop_profiling().unwrap());
    let marks: Vec<&TraceEvent> = events
        .iter()
        .filter(|e| {
            matches!(
                e,
                TraceEvent::SchedulerSuspend { .. } | TraceEvent::SchedulerResume { .. }
            )
        })
        .collect();
    // Two slices: resume/suspend around each.
    assert_eq!(marks.len(), 4);
    assert!(matches!(marks[0], TraceEvent::SchedulerResume { .. }));
    assert!(matches!(marks[1], TraceEvent::SchedulerSuspend { .. }));
    assert!(matches!(marks[2], TraceEvent::SchedulerResume { .. }));
    assert!(matches!(marks[3], TraceEvent::SchedulerSuspend { .. }));

    assert_eq!(
        count_kind(&events, |e| matches!(e, TraceEvent::TaskRun { .. })),
        2
    );
}

#[test]
fn test_handle_reports_label_and_liveness() {
    let (host, scheduler) = setup();
    let handle = scheduler.schedule(
        Priority::Normal,
        |_| Ok(TaskStep::Complete),
        ScheduleOptions::default().with_label("render pass"),
    );
    assert_eq!(handle.label(), Some("render pass"));
    assert_eq!(handle.priority(), Priority::Normal);
    assert!(handle.is_live());

    host.pump(&scheduler);
    assert!(!handle.is_live());
}
