// Test-only objects that report how many of them are alive. Every test makes its own
// Tracker so tests running in parallel don't see each other's objects.
use std::sync::{
    atomic::{ AtomicIsize, Ordering },
    Arc
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone, Default)]
pub struct Tracker(Arc<AtomicIsize>);

impl Tracker {
    pub fn new() -> Self { Self::default() }
    pub fn alive_count(&self) -> isize { self.0.load(Ordering::SeqCst) }
    pub fn make(&self) -> Traced { Traced::new(self) }
    pub fn make_raw(&self) -> *mut Traced { Box::into_raw(Box::new(self.make())) }
}

#[derive(Debug)]
pub struct Traced {
    alive: Arc<AtomicIsize>
}

impl Traced {
    pub fn new(tracker: &Tracker) -> Self {
        tracker.0.fetch_add(1, Ordering::SeqCst);
        Self { alive: tracker.0.clone() }
    }
}

impl Drop for Traced {
    fn drop(&mut self) {
        self.alive.fetch_sub(1, Ordering::SeqCst);
    }
}
