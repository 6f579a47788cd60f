use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::constant::MAX_PAYLOAD_LENGTH;
use crate::error::{Error, Result};

/// MySQL packet header (zero-copy)
///
/// Layout matches MySQL wire protocol:
/// - length: 3 bytes (little-endian, payload length)
/// - sequence_id: 1 byte
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct PacketHeader {
    pub length: [u8; 3],
    pub sequence_id: u8,
}

impl PacketHeader {
    pub const SIZE: usize = 4;

    /// Build a header, rejecting payloads that need more than one packet
    pub fn encode(length: usize, sequence_id: u8) -> Result<Self> {
        if length > MAX_PAYLOAD_LENGTH {
            return Err(Error::PayloadTooLarge(length));
        }
        let len = u32::to_le_bytes(length as u32);
        Ok(Self {
            length: [len[0], len[1], len[2]],
            sequence_id,
        })
    }

    pub fn length(&self) -> usize {
        u32::from_le_bytes([self.length[0], self.length[1], self.length[2], 0]) as usize
    }

    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(header, _)| header)
            .map_err(|_| Error::InvalidPacket)
    }
}

/// Frame `payload` as one packet carrying `sequence_id`
///
/// Payloads larger than 0xFFFFFF bytes are an error; they are never split.
pub fn encode(payload: &[u8], sequence_id: u8) -> Result<Vec<u8>> {
    let header = PacketHeader::encode(payload.len(), sequence_id)?;
    let mut out = Vec::with_capacity(PacketHeader::SIZE + payload.len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Split one packet off the front of `raw`
///
/// Returns `(length, sequence_id, payload)`. `raw` must already hold the whole
/// packet; there is no reassembly across reads.
pub fn decode(raw: &[u8]) -> Result<(usize, u8, &[u8])> {
    let header = PacketHeader::from_bytes(raw)?;
    let length = header.length();
    let payload = raw
        .get(PacketHeader::SIZE..PacketHeader::SIZE + length)
        .ok_or(Error::InvalidPacket)?;
    Ok((length, header.sequence_id, payload))
}

/// Server-side sequence id counter for one client exchange
///
/// Every packet the server sends carries the next id; ids wrap at 256.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceId(u8);

impl SequenceId {
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Start the server's numbering for a greeting (first packet is `0`)
    pub fn start() -> Self {
        Self(0)
    }

    /// The first server response to a client packet uses `client_sequence + 1`
    pub fn reply_to(client_sequence: u8) -> Self {
        Self(client_sequence.wrapping_add(1))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Return the current id and advance to the next one
    pub fn advance(&mut self) -> u8 {
        let current = self.0;
        self.0 = self.0.wrapping_add(1);
        current
    }
}
