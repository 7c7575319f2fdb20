/*!
In-process transport.

A pair of connected endpoints built on `std::sync::mpsc`, one channel per
direction. Each endpoint can be moved to its own thread.
*/

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crate::channel::Transport;
use crate::core::{
    error::{Error, Result},
    message::Frame,
};

/// One end of an in-process duplex link
#[derive(Debug)]
pub struct MemoryTransport {
    tx: Sender<Frame>,
    rx: Receiver<Frame>,
    timeout: Option<Duration>,
}

impl MemoryTransport {
    /// Create two connected endpoints
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel();
        let (b_tx, a_rx) = mpsc::channel();
        (
            Self { tx: a_tx, rx: a_rx, timeout: None },
            Self { tx: b_tx, rx: b_rx, timeout: None },
        )
    }

    /// Fail receives that wait longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Transport for MemoryTransport {
    fn send_frame(&mut self, frame: Frame) -> Result<()> {
        self.tx.send(frame).map_err(|_| Error::TransportClosed)
    }

    fn receive_frame(&mut self) -> Result<Frame> {
        match self.timeout {
            None => self.rx.recv().map_err(|_| Error::TransportClosed),
            Some(timeout) => self.rx.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => Error::Timeout(timeout.as_millis() as u64),
                RecvTimeoutError::Disconnected => Error::TransportClosed,
            }),
        }
    }
}
