/*!
Wire formats for the QKD protocol.

Two layers live here:

- [`Payload`]: the typed content of a message and its canonical byte
  encoding. All integers are big-endian and every list is length-prefixed,
  so the encoding of a given payload is unique. Decoding is strict:
  trailing bytes, bad lengths or non-zero padding are rejected.
- [`Frame`]: what a transport carries, a header string plus an opaque body.

Frame layout on byte-stream transports:
- Version (1 byte)
- Header length (2 bytes, big-endian), header (UTF-8)
- Body length (4 bytes, big-endian), body
*/

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ByteOrder, ReadBytesExt, WriteBytesExt};

use crate::core::{
    bits::{pack_bits, unpack_bits},
    constants::{VERSION, sizes},
    error::{Error, Result, malformed},
    message::types::{MessageType, PayloadKind},
};
use crate::{contract_err, desync_err};

/// Typed message content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// No content
    Empty,
    /// Global key indices
    Indices(Vec<usize>),
    /// A single bit
    Bit(u8),
    /// A single global index
    Index(usize),
    /// A list of bits
    Bits(Vec<u8>),
    /// Verification salt and hash, as field elements
    VerifySeed {
        /// Random non-zero evaluation point
        salt: u128,
        /// Hash of the sender's key at `salt`
        hash: u128,
    },
    /// A boolean
    Flag(bool),
}

impl Payload {
    /// Shape of this payload
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Empty => PayloadKind::Empty,
            Payload::Indices(_) => PayloadKind::Indices,
            Payload::Bit(_) => PayloadKind::Bit,
            Payload::Index(_) => PayloadKind::Index,
            Payload::Bits(_) => PayloadKind::Bits,
            Payload::VerifySeed { .. } => PayloadKind::VerifySeed,
            Payload::Flag(_) => PayloadKind::Flag,
        }
    }

    /// Canonical byte encoding
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Payload::Empty => {}
            Payload::Indices(indices) => {
                out.write_u32::<BigEndian>(len_u32(indices.len())?)?;
                for &i in indices {
                    out.write_u64::<BigEndian>(i as u64)?;
                }
            }
            Payload::Bit(bit) => {
                if *bit > 1 {
                    return contract_err!("{} is not a bit", bit);
                }
                out.push(*bit);
            }
            Payload::Index(i) => out.write_u64::<BigEndian>(*i as u64)?,
            Payload::Bits(bits) => {
                if bits.iter().any(|&b| b > 1) {
                    return contract_err!("bit list holds a non-bit value");
                }
                out.write_u32::<BigEndian>(len_u32(bits.len())?)?;
                out.extend_from_slice(&pack_bits(bits));
            }
            Payload::VerifySeed { salt, hash } => {
                out.write_u128::<BigEndian>(*salt)?;
                out.write_u128::<BigEndian>(*hash)?;
            }
            Payload::Flag(flag) => out.push(*flag as u8),
        }
        Ok(out)
    }

    /// Decode the payload of a message of type `msg_type`
    pub fn decode(msg_type: MessageType, bytes: &[u8]) -> Result<Self> {
        let mut cursor = bytes;
        let payload = match msg_type.payload_kind() {
            PayloadKind::Empty => Payload::Empty,
            PayloadKind::Indices => {
                let count = read_u32(&mut cursor)? as usize;
                if cursor.len() != count.saturating_mul(8) {
                    return malformed("index list length mismatch");
                }
                let mut indices = Vec::with_capacity(count);
                for _ in 0..count {
                    indices.push(to_index(read_u64(&mut cursor)?)?);
                }
                Payload::Indices(indices)
            }
            PayloadKind::Bit => match read_u8(&mut cursor)? {
                b @ (0 | 1) => Payload::Bit(b),
                other => return malformed(format!("{} is not a bit", other)),
            },
            PayloadKind::Index => Payload::Index(to_index(read_u64(&mut cursor)?)?),
            PayloadKind::Bits => {
                let count = read_u32(&mut cursor)? as usize;
                let bits = match unpack_bits(cursor, count) {
                    Ok(bits) => bits,
                    Err(_) => return malformed("bit list length or padding invalid"),
                };
                cursor = &[];
                Payload::Bits(bits)
            }
            PayloadKind::VerifySeed => {
                let salt = read_u128(&mut cursor)?;
                let hash = read_u128(&mut cursor)?;
                Payload::VerifySeed { salt, hash }
            }
            PayloadKind::Flag => match read_u8(&mut cursor)? {
                0 => Payload::Flag(false),
                1 => Payload::Flag(true),
                other => return malformed(format!("{} is not a flag", other)),
            },
        };
        if !cursor.is_empty() {
            return malformed(format!("{} trailing bytes", cursor.len()));
        }
        Ok(payload)
    }

    /// Index list, or desync for any other shape
    pub fn into_indices(self) -> Result<Vec<usize>> {
        match self {
            Payload::Indices(v) => Ok(v),
            other => desync_err!("index list", format!("{:?}", other.kind())),
        }
    }

    /// Single bit, or desync for any other shape
    pub fn into_bit(self) -> Result<u8> {
        match self {
            Payload::Bit(b) => Ok(b),
            other => desync_err!("bit", format!("{:?}", other.kind())),
        }
    }

    /// Single index, or desync for any other shape
    pub fn into_index(self) -> Result<usize> {
        match self {
            Payload::Index(i) => Ok(i),
            other => desync_err!("index", format!("{:?}", other.kind())),
        }
    }

    /// Bit list, or desync for any other shape
    pub fn into_bits(self) -> Result<Vec<u8>> {
        match self {
            Payload::Bits(v) => Ok(v),
            other => desync_err!("bit list", format!("{:?}", other.kind())),
        }
    }

    /// Salt and hash, or desync for any other shape
    pub fn into_verify_seed(self) -> Result<(u128, u128)> {
        match self {
            Payload::VerifySeed { salt, hash } => Ok((salt, hash)),
            other => desync_err!("verification seed", format!("{:?}", other.kind())),
        }
    }

    /// Boolean, or desync for any other shape
    pub fn into_flag(self) -> Result<bool> {
        match self {
            Payload::Flag(f) => Ok(f),
            other => desync_err!("flag", format!("{:?}", other.kind())),
        }
    }
}

/// A typed protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message type
    pub msg_type: MessageType,
    /// Message content
    pub payload: Payload,
}

impl Message {
    /// Create a message, checking the payload shape against the type
    pub fn new(msg_type: MessageType, payload: Payload) -> Result<Self> {
        if msg_type.payload_kind() != payload.kind() {
            return contract_err!(
                "{} expects a {:?} payload, got {:?}",
                msg_type,
                msg_type.payload_kind(),
                payload.kind()
            );
        }
        Ok(Self { msg_type, payload })
    }
}

/// Canonical bytes authenticated for one message.
///
/// `counter` is the per-direction message number; header and payload are
/// length-prefixed so no two (header, payload) pairs share an encoding.
pub fn mac_input(counter: u64, header: &str, payload: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(8 + 2 + header.len() + 4 + payload.len());
    out.write_u64::<BigEndian>(counter)?;
    out.write_u16::<BigEndian>(header_len_u16(header)?)?;
    out.extend_from_slice(header.as_bytes());
    out.write_u32::<BigEndian>(len_u32(payload.len())?)?;
    out.extend_from_slice(payload);
    Ok(out)
}

/// One unit handed to a transport: header string and opaque body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Header string
    pub header: String,
    /// Body bytes
    pub body: Vec<u8>,
}

impl Frame {
    /// Create a new frame
    pub fn new(header: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            header: header.into(),
            body,
        }
    }

    /// Serialize the frame
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(
            sizes::FRAME_PREFIX_SIZE + self.header.len() + 4 + self.body.len(),
        );
        self.write(&mut out)?;
        Ok(out)
    }

    /// Write the frame to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        if self.body.len() > sizes::MAX_BODY_LEN {
            return contract_err!("frame body of {} bytes exceeds limit", self.body.len());
        }
        let mut prefix = [0u8; sizes::FRAME_PREFIX_SIZE];
        prefix[0] = VERSION;
        BigEndian::write_u16(&mut prefix[1..3], header_len_u16(&self.header)?);
        writer.write_all(&prefix)?;
        writer.write_all(self.header.as_bytes())?;
        writer.write_u32::<BigEndian>(len_u32(self.body.len())?)?;
        writer.write_all(&self.body)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a frame from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut prefix = [0u8; sizes::FRAME_PREFIX_SIZE];
        reader.read_exact(&mut prefix)?;

        let version = prefix[0];
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let header_len = BigEndian::read_u16(&prefix[1..3]) as usize;
        if header_len > sizes::MAX_HEADER_LEN {
            return malformed(format!("header of {} bytes exceeds limit", header_len));
        }
        let mut header = vec![0u8; header_len];
        reader.read_exact(&mut header)?;
        let header = match String::from_utf8(header) {
            Ok(h) => h,
            Err(_) => return malformed("header is not UTF-8"),
        };

        let body_len = reader.read_u32::<BigEndian>()? as usize;
        if body_len > sizes::MAX_BODY_LEN {
            return malformed(format!("body of {} bytes exceeds limit", body_len));
        }
        let mut body = vec![0u8; body_len];
        reader.read_exact(&mut body)?;

        Ok(Self { header, body })
    }

    /// Parse a frame from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = io::Cursor::new(bytes);
        let frame = Self::read(&mut cursor)?;
        if cursor.position() as usize != bytes.len() {
            return malformed("trailing bytes after frame");
        }
        Ok(frame)
    }
}

fn len_u32(len: usize) -> Result<u32> {
    match u32::try_from(len) {
        Ok(l) => Ok(l),
        Err(_) => contract_err!("length {} does not fit the wire format", len),
    }
}

fn header_len_u16(header: &str) -> Result<u16> {
    if header.len() > sizes::MAX_HEADER_LEN {
        return contract_err!("header of {} bytes exceeds limit", header.len());
    }
    Ok(header.len() as u16)
}

fn to_index(value: u64) -> Result<usize> {
    match usize::try_from(value) {
        Ok(i) => Ok(i),
        Err(_) => malformed(format!("index {} does not fit this platform", value)),
    }
}

fn short<T>(_: io::Error) -> Result<T> {
    malformed("payload truncated")
}

fn read_u8(cursor: &mut &[u8]) -> Result<u8> {
    cursor.read_u8().or_else(short)
}

fn read_u32(cursor: &mut &[u8]) -> Result<u32> {
    cursor.read_u32::<BigEndian>().or_else(short)
}

fn read_u64(cursor: &mut &[u8]) -> Result<u64> {
    cursor.read_u64::<BigEndian>().or_else(short)
}

fn read_u128(cursor: &mut &[u8]) -> Result<u128> {
    cursor.read_u128::<BigEndian>().or_else(short)
}
