/*!
Message authentication for the protocol channel.

Both parties hold the same pre-shared secret. HKDF-SHA256 turns it into one
HMAC-SHA256 key per direction, so a party never accepts a message it sent
itself. Each tag also covers the per-direction message counter.
*/

use std::fmt;

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::core::{
    constants::{HKDF_INFO_I2R, HKDF_INFO_R2I, HKDF_SALT, sizes},
    error::{Error, Result},
    message::format::mac_input,
    security::constant_time::constant_time_eq_arrays,
    state::Role,
};

type HmacSha256 = Hmac<Sha256>;

/// Authentication tag
pub type Tag = [u8; sizes::TAG_SIZE];

/// Pre-shared authentication secret. Wiped on drop, never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PresharedKey(Vec<u8>);

impl PresharedKey {
    /// Wrap a secret of at least [`sizes::MIN_PSK_SIZE`] bytes
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self> {
        let secret = secret.into();
        if secret.len() < sizes::MIN_PSK_SIZE {
            return Err(Error::InvalidConfig(format!(
                "pre-shared key must be at least {} bytes",
                sizes::MIN_PSK_SIZE
            )));
        }
        Ok(Self(secret))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PresharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PresharedKey(<redacted>)")
    }
}

/// Directional MAC keys for one party
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ChannelKeys {
    send: [u8; sizes::MAC_KEY_SIZE],
    recv: [u8; sizes::MAC_KEY_SIZE],
}

impl ChannelKeys {
    /// Derive this party's send and receive keys
    pub fn derive(psk: &PresharedKey, role: Role) -> Result<Self> {
        let hkdf = Hkdf::<Sha256>::new(Some(HKDF_SALT), psk.as_bytes());

        let mut i2r = [0u8; sizes::MAC_KEY_SIZE];
        let mut r2i = [0u8; sizes::MAC_KEY_SIZE];
        hkdf.expand(HKDF_INFO_I2R, &mut i2r)
            .map_err(|_| Error::InvalidConfig("MAC key derivation failed".into()))?;
        hkdf.expand(HKDF_INFO_R2I, &mut r2i)
            .map_err(|_| Error::InvalidConfig("MAC key derivation failed".into()))?;

        let keys = match role {
            Role::Initiator => Self { send: i2r, recv: r2i },
            Role::Responder => Self { send: r2i, recv: i2r },
        };
        i2r.zeroize();
        r2i.zeroize();
        Ok(keys)
    }

    /// Tag an outgoing message
    pub fn sign(&self, counter: u64, header: &str, payload: &[u8]) -> Result<Tag> {
        compute_tag(&self.send, counter, header, payload)
    }

    /// Check the tag of an incoming message in constant time
    pub fn verify(&self, counter: u64, header: &str, payload: &[u8], tag: &Tag) -> Result<bool> {
        let expected = compute_tag(&self.recv, counter, header, payload)?;
        Ok(constant_time_eq_arrays(&expected, tag))
    }
}

impl fmt::Debug for ChannelKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChannelKeys(<redacted>)")
    }
}

/// HMAC-SHA256 over the canonical message bytes
pub fn compute_tag(key: &[u8], counter: u64, header: &str, payload: &[u8]) -> Result<Tag> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|_| Error::InvalidConfig("invalid MAC key length".into()))?;
    mac.update(&mac_input(counter, header, payload)?);
    Ok(mac.finalize().into_bytes().into())
}
