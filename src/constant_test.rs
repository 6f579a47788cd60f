use crate::constant::{CapabilityFlags, CommandByte, DEFAULT_SERVER_CAPABILITIES, ServerStatusFlags};

#[test]
fn default_capabilities_match_advertised_value() {
    assert_eq!(DEFAULT_SERVER_CAPABILITIES.bits(), 0x00A0_D7FF);
    assert!(DEFAULT_SERVER_CAPABILITIES.contains(CapabilityFlags::CLIENT_PROTOCOL_41));
    assert!(DEFAULT_SERVER_CAPABILITIES.contains(CapabilityFlags::CLIENT_RESERVED2));
    assert!(!DEFAULT_SERVER_CAPABILITIES.contains(CapabilityFlags::CLIENT_PLUGIN_AUTH));
}

#[test]
fn capability_halves_split_on_16_bits() {
    let caps = CapabilityFlags::CLIENT_PLUGIN_AUTH | CapabilityFlags::CLIENT_PROTOCOL_41;
    assert_eq!(caps.bits() & 0xFFFF, 0x0200);
    assert_eq!(caps.bits() >> 16, 0x0008);
}

#[test]
fn autocommit_status_is_0x0002() {
    assert_eq!(ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT.bits(), 0x0002);
}

#[test]
fn command_byte_from_u8() {
    assert_eq!(CommandByte::from_u8(0x01), Some(CommandByte::Quit));
    assert_eq!(CommandByte::from_u8(0x02), Some(CommandByte::InitDb));
    assert_eq!(CommandByte::from_u8(0x03), Some(CommandByte::Query));
    assert_eq!(CommandByte::from_u8(0x0e), Some(CommandByte::Ping));
    assert_eq!(CommandByte::from_u8(0x16), None);
}
