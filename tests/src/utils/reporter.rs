use std::sync::Mutex;

use gmf_core::{Hit, Reporter};

/// Keeps every hit in memory.
#[derive(Default)]
pub struct CollectingReporter {
    hits: Mutex<Vec<Hit>>,
}

impl CollectingReporter {
    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }
}

impl Reporter for CollectingReporter {
    fn report(&self, hit: &Hit) {
        self.hits.lock().unwrap().push(hit.clone());
    }
}
