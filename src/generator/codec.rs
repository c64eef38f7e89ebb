//! Framing for serialized generator state.
//!
//! Each frame is a version byte, a little-endian `u32` payload length and a
//! bincode payload. Frames can be concatenated; [`decode`] consumes exactly
//! one from the front of its input.

use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::error::StateError;

/// Bumped whenever the layout of the serialized state changes.
pub const STATE_VERSION: u8 = 1;

const HEADER_LEN: usize = 1 + 4;

pub(crate) fn encode<T: Serialize>(state: &T, out: &mut Vec<u8>) -> Result<(), StateError> {
    let payload = bincode::serialize(state)?;
    let len = u32::try_from(payload.len()).map_err(|_| StateError::TooLarge(payload.len()))?;
    out.reserve(HEADER_LEN + payload.len());
    out.push(STATE_VERSION);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(())
}

pub(crate) fn decode<T: DeserializeOwned>(input: &mut &[u8]) -> Result<T, StateError> {
    let Some((&version, rest)) = input.split_first() else {
        return Err(StateError::Truncated {
            needed: HEADER_LEN,
            available: 0,
        });
    };
    if version != STATE_VERSION {
        debug!(found = version, expected = STATE_VERSION, "rejecting generator state");
        return Err(StateError::UnsupportedVersion {
            found: version,
            expected: STATE_VERSION,
        });
    }
    let Some((len_bytes, rest)) = rest.split_first_chunk::<4>() else {
        return Err(StateError::Truncated {
            needed: HEADER_LEN,
            available: input.len(),
        });
    };
    let len = u32::from_le_bytes(*len_bytes) as usize;
    if rest.len() < len {
        return Err(StateError::Truncated {
            needed: HEADER_LEN + len,
            available: input.len(),
        });
    }
    let (payload, rest) = rest.split_at(len);
    let state = bincode::deserialize(payload)?;
    *input = rest;
    Ok(state)
}
