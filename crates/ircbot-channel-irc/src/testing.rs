//! Scripted in-memory transport for driving the poll loop in tests.
//!
//! Each call to `wait_readable` consumes one scripted step. Once the script
//! runs out the transport reports [`TransportError::Closed`], which ends the
//! loop.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::transport::{Readiness, Transport, TransportError};

/// One scripted poll-loop iteration.
#[derive(Debug, Clone)]
pub enum Step {
    /// Data becomes readable and the next `read` returns these bytes.
    Data(Vec<u8>),
    /// The wait times out with nothing to read.
    Idle,
}

/// Handle for inspecting what a [`ScriptedTransport`] was asked to write.
#[derive(Debug, Clone, Default)]
pub struct WriteLog(Arc<Mutex<Vec<String>>>);

impl WriteLog {
    pub fn lines(&self) -> Vec<String> {
        self.0.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn contains(&self, line: &str) -> bool {
        self.lines().iter().any(|l| l == line)
    }
}

#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: VecDeque<Step>,
    ready: Option<Vec<u8>>,
    writes: WriteLog,
    connected: bool,
    fail_connect: bool,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Script made of one read per line.
    pub fn from_lines(lines: &[&str]) -> Self {
        Self::new(
            lines
                .iter()
                .map(|l| Step::Data(format!("{l}\r\n").into_bytes())),
        )
    }

    /// Make `connect` fail.
    pub fn refusing() -> Self {
        Self {
            fail_connect: true,
            ..Self::default()
        }
    }

    pub fn write_log(&self) -> WriteLog {
        self.writes.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.fail_connect {
            return Err(TransportError::Connect {
                addr: "scripted".into(),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            });
        }
        self.connected = true;
        Ok(())
    }

    async fn wait_readable(&mut self, _timeout: Duration) -> Result<Readiness, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        match self.script.pop_front() {
            Some(Step::Data(bytes)) => {
                self.ready = Some(bytes);
                Ok(Readiness::Ready)
            }
            Some(Step::Idle) => Ok(Readiness::Timeout),
            None => Err(TransportError::Closed),
        }
    }

    async fn read(&mut self, max_bytes: usize) -> Result<Vec<u8>, TransportError> {
        let mut bytes = self.ready.take().unwrap_or_default();
        if bytes.len() > max_bytes {
            let rest = bytes.split_off(max_bytes);
            self.script.push_front(Step::Data(rest));
        }
        Ok(bytes)
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        if let Ok(mut writes) = self.writes.0.lock() {
            writes.push(String::from_utf8_lossy(data).to_string());
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.connected = false;
        Ok(())
    }
}
