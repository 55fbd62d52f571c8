use std::path::PathBuf;

/// Read a capture stored as a hex string under `tests/packet_examples`.
pub fn file_to_packet(fname: &str) -> Vec<u8> {
    let mut program_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    program_path.push("tests");
    program_path.push("packet_examples");
    program_path.push(fname);

    let content = std::fs::read_to_string(program_path).unwrap();
    let content = content.trim();

    let mut res = Vec::with_capacity(content.len() / 2);
    let mut start_idx = 0;
    while start_idx < content.len() {
        res.push(u8::from_str_radix(&content[start_idx..start_idx + 2], 16).unwrap());
        start_idx += 2;
    }

    res
}

/// The 40-byte packet `1.2.3.4 -> 8.8.8.8`, TCP from port 32 to port 12.
#[allow(dead_code)]
pub const IP_TCP_PACKET: [u8; 40] = [
    0x45, 0x00, 0x00, 0x28, 0x00, 0x01, 0x00, 0x00, 0x80, 0x06, 0x26, 0xba, 0x01, 0x02, 0x03, 0x04,
    0x08, 0x08, 0x08, 0x08, 0x00, 0x20, 0x00, 0x0c, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x50, 0x00, 0x7f, 0xa6, 0x1b, 0xfd, 0x00, 0x00,
];
