/*!
Message channels between the two parties.

Two seams:

- [`Transport`] moves raw [`Frame`]s in FIFO order. Memory and TCP
  implementations live in the submodules.
- [`MessageChannel`] moves typed messages. [`AuthenticatedChannel`] is the
  implementation the protocol runs over; test doubles can implement it too.

Every message sent through an [`AuthenticatedChannel`] carries an
HMAC-SHA256 tag in its body (`payload ‖ tag`). A receiver checks the tag
before looking at the header or decoding the payload, and a failed check
ends the run.
*/

pub mod memory;
pub mod tcp;

use tracing::{trace, warn};

use crate::core::{
    constants::sizes,
    error::{IntegrityError, Result, malformed},
    message::{Frame, Message, MessageType, Payload},
    security::mac::{ChannelKeys, PresharedKey, Tag},
    state::Role,
};
use crate::{desync_err, integrity_err};

pub use memory::MemoryTransport;
pub use tcp::TcpTransport;

/// Duplex frame transport with FIFO delivery per direction
pub trait Transport {
    /// Send a frame; does not wait for the peer
    fn send_frame(&mut self, frame: Frame) -> Result<()>;

    /// Block until the next frame arrives
    fn receive_frame(&mut self) -> Result<Frame>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_frame(&mut self, frame: Frame) -> Result<()> {
        (**self).send_frame(frame)
    }

    fn receive_frame(&mut self) -> Result<Frame> {
        (**self).receive_frame()
    }
}

/// Typed message channel used by the protocol stages
pub trait MessageChannel {
    /// Send one message
    fn send(&mut self, msg_type: MessageType, payload: Payload) -> Result<()>;

    /// Block until the next message arrives
    fn receive(&mut self) -> Result<Message>;

    /// Receive the next message and require it to be of type `expected`
    fn expect(&mut self, expected: MessageType) -> Result<Payload> {
        let message = self.receive()?;
        if message.msg_type != expected {
            return desync_err!(expected, message.msg_type);
        }
        Ok(message.payload)
    }
}

impl<C: MessageChannel + ?Sized> MessageChannel for &mut C {
    fn send(&mut self, msg_type: MessageType, payload: Payload) -> Result<()> {
        (**self).send(msg_type, payload)
    }

    fn receive(&mut self) -> Result<Message> {
        (**self).receive()
    }
}

/// Message channel that authenticates every message over a [`Transport`]
#[derive(Debug)]
pub struct AuthenticatedChannel<T: Transport> {
    transport: T,
    keys: ChannelKeys,
    role: Role,
    sent: u64,
    received: u64,
}

impl<T: Transport> AuthenticatedChannel<T> {
    /// Wrap `transport`, deriving this party's MAC keys from `psk`
    pub fn new(transport: T, psk: &PresharedKey, role: Role) -> Result<Self> {
        Ok(Self {
            transport,
            keys: ChannelKeys::derive(psk, role)?,
            role,
            sent: 0,
            received: 0,
        })
    }

    /// Role this channel was created for
    pub fn role(&self) -> Role {
        self.role
    }

    /// Number of messages sent
    pub fn messages_sent(&self) -> u64 {
        self.sent
    }

    /// Number of messages received and verified
    pub fn messages_received(&self) -> u64 {
        self.received
    }

    /// Give back the transport
    pub fn into_inner(self) -> T {
        self.transport
    }
}

impl<T: Transport> MessageChannel for AuthenticatedChannel<T> {
    fn send(&mut self, msg_type: MessageType, payload: Payload) -> Result<()> {
        let message = Message::new(msg_type, payload)?;
        let header = message.msg_type.as_str();
        let mut body = message.payload.encode()?;
        let tag = self.keys.sign(self.sent, header, &body)?;
        body.extend_from_slice(&tag);

        trace!(role = %self.role, header, seq = self.sent, "sending message");
        self.transport.send_frame(Frame::new(header, body))?;
        self.sent += 1;
        Ok(())
    }

    fn receive(&mut self) -> Result<Message> {
        let frame = self.transport.receive_frame()?;

        if frame.body.len() < sizes::TAG_SIZE {
            warn!(role = %self.role, header = %frame.header, "envelope too short for a tag");
            return malformed("envelope too short for a tag");
        }
        let (payload, tag_bytes) = frame.body.split_at(frame.body.len() - sizes::TAG_SIZE);
        let mut tag: Tag = [0u8; sizes::TAG_SIZE];
        tag.copy_from_slice(tag_bytes);

        if !self.keys.verify(self.received, &frame.header, payload, &tag)? {
            warn!(role = %self.role, seq = self.received, "authentication tag mismatch");
            return integrity_err!(IntegrityError::TagMismatch);
        }
        self.received += 1;

        let msg_type = match MessageType::from_header(&frame.header) {
            Some(t) => t,
            None => return desync_err!("known message header", frame.header),
        };
        let payload = Payload::decode(msg_type, payload)?;
        trace!(role = %self.role, header = %msg_type, "received message");

        Ok(Message { msg_type, payload })
    }
}
