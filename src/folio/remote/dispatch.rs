use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Decides where remote jobs run.
pub trait Dispatcher {
    /// Returns false if the job could not be started and will never run.
    fn dispatch(&self, job: Job) -> bool;
}

/// Runs every job on its own background thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDispatcher;

impl Dispatcher for ThreadDispatcher {
    fn dispatch(&self, job: Job) -> bool {
        let spawned = std::thread::Builder::new()
            .name("folio-remote".to_string())
            .spawn(job);
        match spawned {
            Ok(_) => true,
            Err(e) => {
                log::warn!("could not start remote job: {}", e);
                false
            }
        }
    }
}

/// Queues jobs until the caller runs them.
///
/// Clones share one queue, so a test can keep a handle while the engine owns
/// another and decide exactly when each remote call completes.
#[derive(Default, Clone)]
pub struct ManualDispatcher {
    queue: Rc<RefCell<VecDeque<Job>>>,
}

impl ManualDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Runs the oldest queued job. Returns false if none was queued.
    pub fn run_next(&self) -> bool {
        let job = self.queue.borrow_mut().pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Runs the newest queued job first, to simulate out-of-order completion.
    pub fn run_last(&self) -> bool {
        let job = self.queue.borrow_mut().pop_back();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl Dispatcher for ManualDispatcher {
    fn dispatch(&self, job: Job) -> bool {
        self.queue.borrow_mut().push_back(job);
        true
    }
}
