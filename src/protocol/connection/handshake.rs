use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::constant::{CapabilityFlags, PROTOCOL_VERSION};
use crate::error::{Error, Result};
use crate::opts::ServerIdentity;
use crate::protocol::packet::PacketHeader;
use crate::protocol::primitive::*;

/// Connection id advertised in every greeting
pub const CONNECTION_ID: u32 = 1;

/// Advertised auth-plugin-data length: 20 salt bytes + 1
const AUTH_PLUGIN_DATA_LEN: u8 = 21;

/// Offset of the username inside the raw handshake-response packet (header included)
pub const USERNAME_OFFSET: usize = 23;

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
struct GreetingFixedFields {
    connection_id: U32LE,
    auth_data_part1: [u8; 8],
    filler: u8,
    capability_flags_lower: U16LE,
    charset: u8,
    status_flags: U16LE,
    capability_flags_upper: U16LE,
    auth_data_len: u8,
}

/// Write the protocol-10 greeting payload
///
/// Layout: `0x0a`, version + NUL, connection id (4 LE), salt[0..8], 0x00,
/// capabilities low (2 LE), charset, status (2 LE), capabilities high (2 LE),
/// 0x15, 10 zero bytes, salt[8..20], plugin name + NUL.
pub fn write_initial_handshake(out: &mut Vec<u8>, identity: &ServerIdentity) {
    let salt = identity.salt.as_bytes();
    let caps = identity.capability_flags.bits();

    let mut auth_data_part1 = [0u8; 8];
    auth_data_part1.copy_from_slice(&salt[..8]);

    let fixed = GreetingFixedFields {
        connection_id: U32LE::new(CONNECTION_ID),
        auth_data_part1,
        filler: 0,
        capability_flags_lower: U16LE::new((caps & 0xFFFF) as u16),
        charset: identity.charset,
        status_flags: U16LE::new(identity.status_flags.bits()),
        capability_flags_upper: U16LE::new((caps >> 16) as u16),
        auth_data_len: AUTH_PLUGIN_DATA_LEN,
    };

    write_int_1(out, PROTOCOL_VERSION);
    write_string_null(out, &identity.server_version);
    write_bytes_fix(out, fixed.as_bytes());
    write_bytes_fix(out, &[0u8; 10]);
    write_bytes_fix(out, &salt[8..]);
    write_string_null(out, &identity.auth_plugin);
}

/// Handshake response packet sent by the client
#[derive(Debug, Clone)]
pub struct HandshakeResponse<'a> {
    pub sequence_id: u8,
    pub capability_flags: CapabilityFlags,
    pub max_packet_size: u32,
    pub charset: u8,
    /// Invalid UTF-8 is dropped
    pub username: String,
    pub auth_response: &'a [u8],
}

/// Read the client's handshake response from a raw packet (header included)
///
/// Fields: header (4), capabilities (4 LE), max packet size (4 LE), charset (1),
/// then a NUL-terminated username found from offset 23, then a 1-byte
/// auth-response length and that many bytes.
pub fn read_handshake_response(packet: &[u8]) -> Result<HandshakeResponse<'_>> {
    let header = PacketHeader::from_bytes(packet)
        .map_err(|_| Error::MalformedHandshake("packet shorter than its header"))?;
    let sequence_id = header.sequence_id;

    let data = &packet[PacketHeader::SIZE..];
    let (cap_bits, data) =
        read_int_4(data).map_err(|_| Error::MalformedHandshake("missing capability flags"))?;
    let (max_packet_size, data) =
        read_int_4(data).map_err(|_| Error::MalformedHandshake("missing max packet size"))?;
    let (charset, _) = read_int_1(data).map_err(|_| Error::MalformedHandshake("missing charset"))?;

    let capability_flags = CapabilityFlags::from_bits_retain(cap_bits);
    if !capability_flags.contains(CapabilityFlags::CLIENT_PLUGIN_AUTH) {
        return Err(Error::UnsupportedAuthPlugin);
    }

    let (username, rest) = packet
        .get(USERNAME_OFFSET..)
        .and_then(|tail| read_string_null(tail).ok())
        .ok_or(Error::MalformedHandshake("no username terminator"))?;

    // A short packet yields a short (or empty) auth response rather than an error.
    let (auth_len, rest) = read_int_1(rest).unwrap_or((0, rest));
    let auth_response = &rest[..rest.len().min(auth_len as usize)];

    Ok(HandshakeResponse {
        sequence_id,
        capability_flags,
        max_packet_size,
        charset,
        username: crate::protocol::decode_text(username),
        auth_response,
    })
}
