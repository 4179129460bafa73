use crate::Error;
use core::fmt::Debug;

/// Protection code stored in a page or copy protection byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Protection {
    Open = 0x00,
    WriteProtect = 0x55,
    EpromMode = 0xAA,
}

impl Protection {
    /// Any value other than the two protection codes leaves the page open.
    pub fn from_code(code: u8) -> Self {
        match code {
            0x55 => Protection::WriteProtect,
            0xAA => Protection::EpromMode,
            _ => Protection::Open,
        }
    }

    pub fn code(&self) -> u8 {
        *self as _
    }

    pub fn is_legal_code(code: u8) -> bool {
        matches!(code, 0x00 | 0x55 | 0xAA)
    }
}

/// Register row at [`ConfigControl::ADDRESS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigControl {
    pub page_protection: [u8; 4],
    pub copy_protection: u8,
    pub factory_byte: u8,
    pub user_byte_0: u8,
    pub user_byte_1: u8,
}

impl ConfigControl {
    pub const ADDRESS: u16 = 0x0080;
    pub const BYTES: usize = 8;

    pub fn page(&self, page: usize) -> Protection {
        Protection::from_code(self.page_protection[page])
    }

    pub fn set_page(&mut self, page: usize, protection: Protection) {
        self.page_protection[page] = protection.code();
    }

    pub fn copy(&self) -> Protection {
        Protection::from_code(self.copy_protection)
    }

    pub fn set_copy(&mut self, protection: Protection) {
        self.copy_protection = protection.code();
    }

    /// Rejects any protection byte outside the documented codes.
    pub fn validate<E: Debug>(&self) -> Result<(), Error<E>> {
        self.page_protection
            .iter()
            .chain(core::iter::once(&self.copy_protection))
            .find(|code| !Protection::is_legal_code(**code))
            .map_or(Ok(()), |code| Err(Error::InvalidConfig(*code)))
    }

    pub fn to_bytes(&self) -> [u8; Self::BYTES] {
        let p = &self.page_protection;
        [
            p[0],
            p[1],
            p[2],
            p[3],
            self.copy_protection,
            self.factory_byte,
            self.user_byte_0,
            self.user_byte_1,
        ]
    }
}

impl From<[u8; ConfigControl::BYTES]> for ConfigControl {
    fn from(raw: [u8; ConfigControl::BYTES]) -> Self {
        ConfigControl {
            page_protection: [raw[0], raw[1], raw[2], raw[3]],
            copy_protection: raw[4],
            factory_byte: raw[5],
            user_byte_0: raw[6],
            user_byte_1: raw[7],
        }
    }
}
