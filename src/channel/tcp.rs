/*!
TCP transport.

Frames are written back to back on one stream in the layout documented in
[`crate::core::message::format`].
*/

use std::io::{self, BufReader, BufWriter};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::channel::Transport;
use crate::core::{
    error::{Error, Result},
    message::Frame,
};

/// Framed transport over a TCP stream
#[derive(Debug)]
pub struct TcpTransport {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    timeout: Option<Duration>,
}

impl TcpTransport {
    /// Connect to a listening peer
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        debug!(peer = ?stream.peer_addr().ok(), "connected");
        Self::from_stream(stream)
    }

    /// Accept one peer on `listener`
    pub fn accept(listener: &TcpListener) -> Result<Self> {
        let (stream, peer) = listener.accept()?;
        debug!(%peer, "accepted connection");
        Self::from_stream(stream)
    }

    /// Wrap a connected stream
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let writer = BufWriter::new(stream.try_clone()?);
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
            timeout: None,
        })
    }

    /// Fail receives that wait longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.reader.get_ref().set_read_timeout(Some(timeout))?;
        self.timeout = Some(timeout);
        Ok(self)
    }
}

impl Transport for TcpTransport {
    fn send_frame(&mut self, frame: Frame) -> Result<()> {
        frame.write(&mut self.writer).map_err(closed_or)
    }

    fn receive_frame(&mut self) -> Result<Frame> {
        Frame::read(&mut self.reader).map_err(|e| match e {
            Error::Io(ref io_err)
                if matches!(io_err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
            {
                Error::Timeout(self.timeout.map_or(0, |t| t.as_millis() as u64))
            }
            other => closed_or(other),
        })
    }
}

fn closed_or(err: Error) -> Error {
    match err {
        Error::Io(ref io_err)
            if matches!(
                io_err.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
            ) =>
        {
            Error::TransportClosed
        }
        other => other,
    }
}
