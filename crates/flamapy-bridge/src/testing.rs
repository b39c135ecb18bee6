//! Engine doubles shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use flamapy_embed::{Engine, EngineValue, Result};

type Reply = Box<dyn FnMut(&str) -> Result<EngineValue> + Send>;

/// Everything a [`RecordingEngine`] saw
#[derive(Default)]
pub struct Journal {
    pub staged: Mutex<Vec<(String, String)>>,
    pub scripts: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl Journal {
    pub fn staged(&self) -> Vec<(String, String)> {
        self.staged.lock().unwrap().clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }
}

/// Records staged files and executed source, answering with `reply`
pub struct RecordingEngine {
    journal: Arc<Journal>,
    reply: Reply,
}

impl RecordingEngine {
    pub fn new(
        reply: impl FnMut(&str) -> Result<EngineValue> + Send + 'static,
    ) -> (Self, Arc<Journal>) {
        let journal = Arc::new(Journal::default());
        let engine = Self {
            journal: journal.clone(),
            reply: Box::new(reply),
        };
        (engine, journal)
    }
}

impl Engine for RecordingEngine {
    fn stage(&mut self, name: &str, contents: &str) -> Result<String> {
        self.journal
            .staged
            .lock()
            .unwrap()
            .push((name.to_string(), contents.to_string()));
        Ok(format!("/staged/{}", name))
    }

    fn execute(&mut self, source: &str) -> Result<EngineValue> {
        let now = self.journal.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.journal.max_in_flight.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(5));

        self.journal.scripts.lock().unwrap().push(source.to_string());
        let reply = (self.reply)(source);
        self.journal.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }
}
