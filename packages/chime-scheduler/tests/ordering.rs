use chime_scheduler::LocalScheduler;
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn push(log: &Log, entry: impl Into<String>) {
    log.borrow_mut().push(entry.into());
}

#[test]
fn test_execution_order() {
    init_tracing();
    let scheduler = LocalScheduler::new();
    let log: Log = Rc::default();

    // Schedule tasks in mixed order
    {
        let log = log.clone();
        scheduler
            .schedule_timer(0, move || push(&log, "timer"))
            .unwrap();
    }

    {
        let log = log.clone();
        scheduler.schedule_microtask(move || push(&log, "microtask"));
    }

    scheduler.run().unwrap();

    // A zero-delay timer still yields to the microtask queue
    assert_eq!(*log.borrow(), vec!["microtask", "timer"]);
}

#[test]
fn test_microtask_chaining() {
    // Microtasks scheduled by microtasks run in the same drain
    let scheduler = Rc::new(LocalScheduler::new());
    let log: Log = Rc::default();

    {
        let log = log.clone();
        let sch = scheduler.clone();
        scheduler.schedule_timer(1, {
            let log = log.clone();
            move || push(&log, "timer")
        })
        .unwrap();

        scheduler.schedule_microtask(move || {
            push(&log, "task1");

            let log = log.clone();
            sch.schedule_microtask(move || push(&log, "task2"));
        });
    }

    scheduler.run().unwrap();

    assert_eq!(*log.borrow(), vec!["task1", "task2", "timer"]);
}

#[test]
fn test_timers_fire_by_deadline_then_insertion() {
    init_tracing();
    let scheduler = LocalScheduler::new();
    let log: Log = Rc::default();

    for (name, delay) in [("c", 30), ("a1", 10), ("b", 20), ("a2", 10), ("z", 0)] {
        let log = log.clone();
        scheduler
            .schedule_timer(delay, move || push(&log, name))
            .unwrap();
    }

    let report = scheduler.run().unwrap();

    assert_eq!(*log.borrow(), vec!["z", "a1", "a2", "b", "c"]);
    assert_eq!(report.timers_fired, 5);
    assert_eq!(report.ended_at, 30);
}

#[test]
fn test_microtasks_drain_between_timers() {
    let scheduler = Rc::new(LocalScheduler::new());
    let log: Log = Rc::default();

    for name in ["first", "second"] {
        let log = log.clone();
        let sch = scheduler.clone();
        scheduler
            .schedule_timer(100, move || {
                push(&log, name);
                let log = log.clone();
                let sch2 = sch.clone();
                sch.schedule_microtask(move || {
                    push(&log, format!("{name}:micro"));
                    let log = log.clone();
                    sch2.schedule_microtask(move || push(&log, format!("{name}:micro2")));
                });
            })
            .unwrap();
    }

    scheduler.run().unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            "first",
            "first:micro",
            "first:micro2",
            "second",
            "second:micro",
            "second:micro2",
        ]
    );
}

#[test]
fn test_timer_scheduled_from_timer_is_relative_to_its_deadline() {
    let scheduler = Rc::new(LocalScheduler::new());
    let fired_at = Rc::new(RefCell::new(Vec::new()));

    {
        let sch = scheduler.clone();
        let fired_at = fired_at.clone();
        scheduler
            .schedule_timer(1000, move || {
                fired_at.borrow_mut().push(sch.now());
                let inner_sch = sch.clone();
                let fired_at = fired_at.clone();
                sch.schedule_timer(500, move || fired_at.borrow_mut().push(inner_sch.now()))
                    .unwrap();
            })
            .unwrap();
    }
    {
        let sch = scheduler.clone();
        let fired_at = fired_at.clone();
        scheduler
            .schedule_timer(2000, move || fired_at.borrow_mut().push(sch.now()))
            .unwrap();
    }

    scheduler.run().unwrap();

    assert_eq!(*fired_at.borrow(), vec![1000, 1500, 2000]);
}

#[test]
fn test_run_microtasks_leaves_timers_queued() {
    let scheduler = LocalScheduler::new();
    let log: Log = Rc::default();

    {
        let log = log.clone();
        scheduler
            .schedule_timer(0, move || push(&log, "timer"))
            .unwrap();
    }
    {
        let log = log.clone();
        scheduler.schedule_microtask(move || push(&log, "microtask"));
    }

    let report = scheduler.run_microtasks().unwrap();

    assert_eq!(report.microtasks_run, 1);
    assert_eq!(*log.borrow(), vec!["microtask"]);
    assert_eq!(scheduler.pending_timers(), 1);
}
