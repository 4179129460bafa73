pub trait OpCode {
    fn op_code(&self) -> u8;
}

/// ROM function commands, sent right after a reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    ReadRom = 0x33,
    MatchRom = 0x55,
    OverdriveMatchRom = 0x69,
    SkipRom = 0xCC,
    OverdriveSkipRom = 0x3C,
    Resume = 0xA5,
    SearchRom = 0xF0,
}

impl OpCode for Command {
    fn op_code(&self) -> u8 {
        *self as _
    }
}

/// Memory function commands, sent once the device is selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MemoryCommand {
    WriteScratchpad = 0x0F,
    ReadScratchpad = 0xAA,
    CopyScratchpad = 0x55,
    ReadMemory = 0xF0,
}

impl OpCode for MemoryCommand {
    fn op_code(&self) -> u8 {
        *self as _
    }
}
