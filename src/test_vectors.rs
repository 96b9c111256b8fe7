// Receiver key of the ECDH-ES + AES-KW example in
// draft-ietf-suit-firmware-encryption

pub const RECEIVER_X: [u8; 32] = [
    0x58, 0x86, 0xCD, 0x61, 0xDD, 0x87, 0x58, 0x62, 0xE5, 0xAA, 0xA8, 0x20,
    0xE7, 0xA1, 0x52, 0x74, 0xC9, 0x68, 0xA9, 0xBC, 0x96, 0x04, 0x8D, 0xDC,
    0xAC, 0xE3, 0x2F, 0x50, 0xC3, 0x65, 0x1B, 0xA3,
];
pub const RECEIVER_Y: [u8; 32] = [
    0x9E, 0xED, 0x81, 0x25, 0xE9, 0x32, 0xCD, 0x60, 0xC0, 0xEA, 0xD3, 0x65,
    0x0D, 0x0A, 0x48, 0x5C, 0xF7, 0x26, 0xD3, 0x78, 0xD1, 0xB0, 0x16, 0xED,
    0x42, 0x98, 0xB2, 0x96, 0x1E, 0x25, 0x8F, 0x1B,
];
pub const RECEIVER_D: [u8; 32] = [
    0x60, 0xFE, 0x6D, 0xD6, 0xD8, 0x5D, 0x57, 0x40, 0xA5, 0x34, 0x9B, 0x6F,
    0x91, 0x26, 0x7E, 0xEA, 0xC5, 0xBA, 0x81, 0xB8, 0xCB, 0x53, 0xEE, 0x24,
    0x9E, 0x4B, 0x4E, 0xB1, 0x02, 0xC4, 0x76, 0xB3,
];
pub const RECEIVER_KID: &[u8] = b"kid-2";

pub const SUIT_KDF_OTHER: &[u8] = b"SUIT Payload Encryption";
pub const SUIT_PLAINTEXT: &[u8] = b"This is a real firmware image.";

// [-3, [nil, nil, nil], [nil, nil, nil],
//  [128, h'A101381C', 'SUIT Payload Encryption']]
pub const SUIT_CONTEXT_INFO: [u8; 42] = [
    0x84, 0x22, 0x83, 0xF6, 0xF6, 0xF6, 0x83, 0xF6, 0xF6, 0xF6, 0x83, 0x18,
    0x80, 0x44, 0xA1, 0x01, 0x38, 0x1C, 0x57, 0x53, 0x55, 0x49, 0x54, 0x20,
    0x50, 0x61, 0x79, 0x6C, 0x6F, 0x61, 0x64, 0x20, 0x45, 0x6E, 0x63, 0x72,
    0x79, 0x70, 0x74, 0x69, 0x6F, 0x6E,
];

/// The order n of the P-256 group.
pub const P256_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xBC, 0xE6, 0xFA, 0xAD, 0xA7, 0x17, 0x9E, 0x84,
    0xF3, 0xB9, 0xCA, 0xC2, 0xFC, 0x63, 0x25, 0x51,
];
