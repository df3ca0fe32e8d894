#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use faultscope::{Failure, Handler};

#[derive(Debug, thiserror::Error)]
pub enum TestError {
    #[error("invalid value")]
    Value,
    #[error("invalid type")]
    Type,
    #[error("missing key")]
    Key,
    #[error("index out of range")]
    Index,
}

/// Sink remembering every failure it receives.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Failure>>>);

impl Recorder {
    pub fn handler(&self) -> Handler {
        let failures = self.0.clone();
        Handler::new(move |failure| failures.lock().unwrap().push(failure.clone()))
    }

    pub fn failures(&self) -> Vec<Failure> {
        self.0.lock().unwrap().clone()
    }

    pub fn sources(&self) -> Vec<String> {
        self.failures()
            .iter()
            .map(|failure| failure.source().to_string())
            .collect()
    }
}
