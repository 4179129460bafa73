/// Dallas/Maxim CRC-8 (x^8 + x^5 + x^4 + 1, reflected), continuing from `crc`.
pub fn compute_partial_crc8(crc: u8, data: &[u8]) -> u8 {
    let mut crc = crc;
    for byte in data.iter() {
        let mut byte = *byte;
        for _ in 0..8 {
            let mix = (crc ^ byte) & 0x01;
            crc >>= 1;
            if mix != 0x00 {
                crc ^= 0x8C;
            }
            byte >>= 1;
        }
    }
    crc
}

/// CRC-8 over `data` as computed by the device for ROM codes.
pub fn crc8(data: &[u8]) -> u8 {
    compute_partial_crc8(0, data)
}

/// CRC-16 (x^16 + x^15 + x^2 + 1, reflected), continuing from `crc`.
pub fn compute_partial_crc16(crc: u16, data: &[u8]) -> u16 {
    let mut crc = crc;
    for byte in data.iter() {
        let mut byte = *byte;
        for _ in 0..8 {
            let mix = (crc ^ byte as u16) & 0x0001;
            crc >>= 1;
            if mix != 0x0000 {
                crc ^= 0xA001;
            }
            byte >>= 1;
        }
    }
    crc
}

/// CRC-16 over `data`. The device transmits the inverse of this value,
/// least significant byte first.
pub fn crc16(data: &[u8]) -> u16 {
    compute_partial_crc16(0, data)
}
