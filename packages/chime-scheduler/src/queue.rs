use crate::task::Task;
use std::cell::RefCell;
use std::collections::VecDeque;

/// A strict FIFO queue of microtasks.
/// The scheduler is single-threaded, so a RefCell<VecDeque> is enough.
/// Callers pop one task at a time so tasks can push while the queue drains.
#[derive(Default)]
pub struct MicrotaskQueue {
    queue: RefCell<VecDeque<Task>>,
}

impl MicrotaskQueue {
    pub fn new() -> Self {
        Self {
            queue: RefCell::new(VecDeque::new()),
        }
    }

    pub fn push(&self, task: Task) {
        self.queue.borrow_mut().push_back(task);
    }

    pub fn pop(&self) -> Option<Task> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn pops_in_push_order() {
        let queue = MicrotaskQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let log = log.clone();
            queue.push(Box::new(move || log.borrow_mut().push(i)));
        }
        assert_eq!(queue.len(), 3);

        while let Some(task) = queue.pop() {
            task();
        }

        assert!(queue.is_empty());
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }
}
