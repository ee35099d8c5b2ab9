//! Scripted mock transport for testing.
//!
//! Plays back a queue of open results and a queue of read outcomes, and
//! records every open attempt, write and close. Clones share the same
//! script, so a test can keep one clone for inspection while the
//! supervisor owns another.

use crate::bigben::transport::{Connection, Transport, TransportError};
use log::debug;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

/// One scripted read outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStep {
    Report(Vec<u8>),
    Timeout,
    NoDevice,
    Error(String),
}

#[derive(Default)]
struct Script {
    opens: VecDeque<Result<(), TransportError>>,
    reads: VecDeque<ReadStep>,
    open_attempts: Vec<Instant>,
    writes: Vec<Vec<u8>>,
    closes: usize,
    reads_served: usize,
}

/// Mock transport that follows a script instead of touching hardware
#[derive(Clone, Default)]
pub struct MockTransport {
    script: Arc<Mutex<Script>>,
}

impl MockTransport {
    /// Create a mock whose opens always succeed and whose reads time out
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue the result of the next `open()` call
    pub fn push_open(&self, result: Result<(), TransportError>) -> &Self {
        self.script().opens.push_back(result);
        self
    }

    /// Queue the next read outcome
    pub fn push_read(&self, step: ReadStep) -> &Self {
        self.script().reads.push_back(step);
        self
    }

    /// Queue a raw report to be returned by the next read
    pub fn push_report(&self, bytes: &[u8]) -> &Self {
        self.push_read(ReadStep::Report(bytes.to_vec()))
    }

    /// Instants of every `open()` call, successful or not
    pub fn open_attempts(&self) -> Vec<Instant> {
        self.script().open_attempts.clone()
    }

    /// Every buffer written through any connection
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.script().writes.clone()
    }

    /// How many connections have been closed
    pub fn closes(&self) -> usize {
        self.script().closes
    }

    /// How many scripted reads have been consumed
    pub fn reads_served(&self) -> usize {
        self.script().reads_served
    }

    /// Reads still waiting in the script
    pub fn pending_reads(&self) -> usize {
        self.script().reads.len()
    }
}

impl Transport for MockTransport {
    type Connection = MockConnection;

    fn open(&mut self) -> Result<MockConnection, TransportError> {
        let result = {
            let mut script = self.script();
            script.open_attempts.push(Instant::now());
            script.opens.pop_front().unwrap_or(Ok(()))
        };
        debug!("[MOCK TRANSPORT] open -> {:?}", result);
        result.map(|()| MockConnection {
            script: Arc::clone(&self.script),
        })
    }
}

/// Connection handed out by [`MockTransport`]
pub struct MockConnection {
    script: Arc<Mutex<Script>>,
}

impl Connection for MockConnection {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
        let step = {
            let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
            let step = script.reads.pop_front();
            if step.is_some() {
                script.reads_served += 1;
            }
            step
        };

        match step {
            Some(ReadStep::Report(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(ReadStep::Timeout) => Err(TransportError::Timeout),
            Some(ReadStep::NoDevice) => Err(TransportError::NoDevice),
            Some(ReadStep::Error(msg)) => Err(TransportError::Other(msg)),
            None => {
                // Idle device: behave like a blocking read that times out
                thread::sleep(timeout.min(Duration::from_millis(2)));
                Err(TransportError::Timeout)
            }
        }
    }

    fn write(&mut self, buf: &[u8], _timeout: Duration) -> Result<(), TransportError> {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        script.writes.push(buf.to_vec());
        Ok(())
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        script.closes += 1;
    }
}
