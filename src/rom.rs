use crate::{crc::crc8, Error};
use core::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    ops::Deref,
    str::FromStr,
};

/// 64-bit registration number: family code, 48-bit serial, CRC-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct RomCode {
    raw: [u8; Self::BYTES as usize],
}

impl Default for RomCode {
    fn default() -> Self {
        Self::from([0; Self::BYTES as usize])
    }
}

impl From<[u8; Self::BYTES as usize]> for RomCode {
    fn from(raw: [u8; Self::BYTES as usize]) -> Self {
        RomCode { raw }
    }
}

impl From<RomCode> for [u8; RomCode::BYTES as usize] {
    fn from(rom: RomCode) -> [u8; RomCode::BYTES as usize] {
        rom.raw
    }
}

impl From<RomCode> for u64 {
    fn from(rom: RomCode) -> u64 {
        u64::from_le_bytes(rom.raw)
    }
}

impl Deref for RomCode {
    type Target = [u8; Self::BYTES as usize];

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl AsRef<[u8]> for RomCode {
    fn as_ref(&self) -> &[u8] {
        self.deref() as _
    }
}

impl RomCode {
    /// The length of a ROM code in bytes
    pub const BYTES: u8 = 8;

    /// The length of a ROM code in bits
    pub const BITS: u8 = Self::BYTES * 8;

    /// Builds a code from family and serial, appending the CRC.
    pub fn new(family: u8, serial: [u8; 6]) -> Self {
        let mut raw = [family, 0, 0, 0, 0, 0, 0, 0];
        raw[1..7].copy_from_slice(&serial);
        raw[7] = crc8(&raw[..7]);
        Self { raw }
    }

    pub fn family_code(&self) -> u8 {
        self[0]
    }

    pub fn serial(&self) -> &[u8] {
        &self[1..7]
    }

    pub fn crc(&self) -> u8 {
        self[7]
    }

    pub fn is_valid(&self) -> bool {
        crc8(&self[..7]) == self.crc()
    }

    pub fn ensure_correct_crc8<E: Debug>(&self) -> Result<(), Error<E>> {
        let computed = crc8(&self[..7]);
        if computed != self.crc() {
            Err(Error::CrcMismatch(computed as u16, self.crc() as u16))
        } else {
            Ok(())
        }
    }

    pub(crate) fn bit(&self, bit: u8) -> bool {
        self.raw[(bit / 8) as usize] & (0x01 << (bit % 8)) != 0x00
    }
}

/// Error type
#[derive(Debug, PartialEq, Eq)]
pub enum RomCodeError {
    NotEnough,
    Invalid,
}

fn hex_to_u8(c: char) -> Option<u8> {
    c.to_digit(16).map(|v| v as u8)
}

impl FromStr for RomCode {
    type Err = RomCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut raw = [0u8; Self::BYTES as usize];
        let mut chars = s.chars().filter(|c| !c.is_whitespace() && *c != ':');

        for byte in raw.iter_mut() {
            match (chars.next(), chars.next()) {
                (Some(h), Some(l)) => match (hex_to_u8(h), hex_to_u8(l)) {
                    (Some(h), Some(l)) => {
                        *byte = (h << 4) | l;
                    }
                    _ => return Err(RomCodeError::Invalid),
                },
                _ => return Err(RomCodeError::NotEnough),
            }
        }

        Ok(Self::from(raw))
    }
}

impl Display for RomCode {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self[0], self[1], self[2], self[3], self[4], self[5], self[6], self[7],
        )
    }
}
