use crate::{wire::Speed, Command};

/// ROM selection used in front of every memory transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Mode {
    #[default]
    SkipRom = 0x00,
    OverdriveSkipRom = 0x01,
    MatchRom = 0x02,
    OverdriveMatchRom = 0x03,
    Resume = 0x04,
    OverdriveResume = 0x05,
}

impl Mode {
    pub fn command(&self) -> Command {
        match self {
            Mode::SkipRom => Command::SkipRom,
            Mode::OverdriveSkipRom => Command::OverdriveSkipRom,
            Mode::MatchRom => Command::MatchRom,
            Mode::OverdriveMatchRom => Command::OverdriveMatchRom,
            Mode::Resume | Mode::OverdriveResume => Command::Resume,
        }
    }

    pub fn is_overdrive(&self) -> bool {
        matches!(
            self,
            Mode::OverdriveSkipRom | Mode::OverdriveMatchRom | Mode::OverdriveResume
        )
    }

    /// Whether the ROM code follows the command byte.
    pub fn sends_rom(&self) -> bool {
        matches!(self, Mode::MatchRom | Mode::OverdriveMatchRom)
    }

    /// Speed of the reset pulse and of the command byte.
    ///
    /// Only a resume can start in overdrive: the device must already be there
    /// from an earlier overdrive match.
    pub(crate) fn select_speed(&self) -> Speed {
        match self {
            Mode::OverdriveResume => Speed::Overdrive,
            _ => Speed::Standard,
        }
    }

    /// Speed of the ROM bytes and everything after.
    pub(crate) fn data_speed(&self) -> Speed {
        if self.is_overdrive() {
            Speed::Overdrive
        } else {
            Speed::Standard
        }
    }
}
