use crate::error::{TaskError, TaskKind};
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

/// A unit of deferred work. Tasks carry no state beyond their closure.
pub type Task = Box<dyn FnOnce()>;

thread_local! {
    static SILENCED: Cell<bool> = const { Cell::new(false) };
}

static QUIET_HOOK: Once = Once::new();

/// Wraps the process panic hook once so that panics raised while
/// [`SILENCED`] is set on the current thread skip the default report.
/// Panics anywhere else still reach the previous hook.
fn install_quiet_hook() {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !SILENCED.with(Cell::get) {
                previous(info);
            }
        }));
    });
}

/// Whether task panics on this thread currently bypass the panic hook.
pub fn panics_silenced() -> bool {
    SILENCED.with(Cell::get)
}

/// Run a task to completion, turning a panic into a [`TaskError`].
///
/// A panicking task is the scheduler's equivalent of a callback that throws:
/// the failure is contained to this task so the loop can move on. With
/// `silence` set, the panic is not printed by the panic hook; the
/// [`TaskError`] is its only report.
pub(crate) fn run_guarded(
    task: Task,
    kind: TaskKind,
    at: u64,
    silence: bool,
) -> Result<(), TaskError> {
    if silence {
        install_quiet_hook();
    }
    let outer = SILENCED.with(|s| s.replace(silence));
    let result = panic::catch_unwind(AssertUnwindSafe(task));
    SILENCED.with(|s| s.set(outer));

    result.map_err(|payload| TaskError {
        kind,
        at,
        message: panic_message(payload.as_ref()),
    })
}

/// Best-effort extraction of the message a panic was raised with.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "task panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(f: impl FnOnce() + 'static) -> Task {
        Box::new(f)
    }

    #[test]
    fn completed_task_is_ok() {
        let task = boxed(|| {});
        assert!(run_guarded(task, TaskKind::Microtask, 0, false).is_ok());
    }

    #[test]
    fn panic_becomes_task_error() {
        let task = boxed(|| panic!("boom"));
        let err = run_guarded(task, TaskKind::Microtask, 42, false).unwrap_err();

        assert_eq!(err.kind, TaskKind::Microtask);
        assert_eq!(err.at, 42);
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn formatted_panic_message_is_kept() {
        let task = boxed(|| panic!("bad value {}", 7));
        let err = run_guarded(task, TaskKind::Microtask, 0, true).unwrap_err();
        assert_eq!(err.message, "bad value 7");
    }

    #[test]
    fn silencing_is_scoped_to_the_task() {
        let seen = std::rc::Rc::new(Cell::new(false));
        let task = boxed({
            let seen = seen.clone();
            move || {
                seen.set(panics_silenced());
                panic!("quiet failure");
            }
        });

        let err = run_guarded(task, TaskKind::Microtask, 0, true).unwrap_err();

        assert!(seen.get());
        assert!(!panics_silenced());
        assert_eq!(err.message, "quiet failure");
    }

    #[test]
    fn loud_task_inside_quiet_task_restores_outer_state() {
        let inner_seen = std::rc::Rc::new(Cell::new(true));
        let task = boxed({
            let inner_seen = inner_seen.clone();
            move || {
                let loud = boxed(move || inner_seen.set(panics_silenced()));
                run_guarded(loud, TaskKind::Microtask, 0, false).unwrap();
                assert!(panics_silenced());
            }
        });

        run_guarded(task, TaskKind::Microtask, 0, true).unwrap();
        assert!(!inner_seen.get());
    }
}
