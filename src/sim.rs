//! Line level model of DS2431 devices sharing one wire.
//!
//! Devices see the same edges a real bus would carry and answer by holding
//! the line low. Time only advances through the bus delays, which makes every
//! run deterministic.

use crate::{crc::crc16, Bus, RomCode};
use std::{collections::VecDeque, fmt::Arguments};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimFault;

/// Shortest low time taken as a standard speed reset.
const STANDARD_RESET_US: u64 = 480;
/// Shortest low time taken as a reset by a device in overdrive.
const OVERDRIVE_RESET_US: u64 = 48;
const EEPROM_PROGRAM_US: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Receive {
    WriteScratchpad,
    CopyScratchpad,
    ReadMemory,
}

/// What to send once the transmit queue runs dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum After {
    Fill(u8),
    Memory(u16),
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    RomCommand,
    MatchRom,
    /// step 0 sends the bit, 1 its complement, 2 receives the direction
    SearchRom { bit: u8, step: u8 },
    Function,
    Receive(Receive),
    Transmit(After),
}

pub struct SimDevice {
    rom: RomCode,
    pub memory: [u8; 0x90],
    scratchpad: [u8; 8],
    ta: u16,
    es: u8,
    overdrive: bool,
    resume: bool,
    corrupt_echo: bool,
    corrupt_write_crc: bool,
    stuck_low: bool,
    phase: Phase,
    rx: Vec<u8>,
    rx_byte: u8,
    rx_bits: u8,
    tx: VecDeque<u8>,
    tx_mask: u8,
    sending: bool,
    hold_until: u64,
    presence: (u64, u64),
    ready_at: u64,
    pub copies: usize,
}

impl SimDevice {
    pub fn new(rom: RomCode) -> Self {
        let mut memory = [0xFF; 0x90];
        memory[0x80..0x88].copy_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0xAA, 0xFF, 0xFF]);
        SimDevice {
            rom,
            memory,
            scratchpad: [0xFF; 8],
            ta: 0,
            es: 0,
            overdrive: false,
            resume: false,
            corrupt_echo: false,
            corrupt_write_crc: false,
            stuck_low: false,
            phase: Phase::Idle,
            rx: Vec::new(),
            rx_byte: 0,
            rx_bits: 0,
            tx: VecDeque::new(),
            tx_mask: 0x01,
            sending: false,
            hold_until: 0,
            presence: (0, 0),
            ready_at: 0,
            copies: 0,
        }
    }

    pub fn with_memory(mut self, address: usize, data: &[u8]) -> Self {
        self.memory[address..address + data.len()].copy_from_slice(data);
        self
    }

    /// Flips a data bit of every scratchpad echo after its CRC was computed.
    pub fn corrupting_echo(mut self) -> Self {
        self.corrupt_echo = true;
        self
    }

    /// Flips a bit of the CRC sent after a Write Scratchpad that fills a row.
    pub fn corrupting_write_crc(mut self) -> Self {
        self.corrupt_write_crc = true;
        self
    }

    /// Keeps holding the line once a presence pulse starts.
    pub fn stuck_low(mut self) -> Self {
        self.stuck_low = true;
        self
    }

    /// Changes a scratchpad byte behind the master's back.
    pub fn overwrite_scratchpad(&mut self, offset: usize, value: u8) {
        self.scratchpad[offset] = value;
    }

    fn hold_us(&self) -> u64 {
        if self.overdrive {
            4
        } else {
            30
        }
    }

    fn sample_us(&self) -> u64 {
        if self.overdrive {
            5
        } else {
            15
        }
    }

    fn pulls_low(&self, now: u64) -> bool {
        now < self.hold_until || (self.presence.0 <= now && now < self.presence.1)
    }

    fn reset(&mut self, now: u64, overdrive: bool) {
        self.overdrive = overdrive;
        self.phase = Phase::RomCommand;
        self.rx.clear();
        self.rx_byte = 0;
        self.rx_bits = 0;
        self.tx.clear();
        self.tx_mask = 0x01;
        self.sending = false;
        self.hold_until = 0;
        self.ready_at = 0;
        self.presence = if overdrive {
            (now + 3, now + 10)
        } else {
            (now + 20, now + 120)
        };
        if self.stuck_low {
            self.presence.1 = u64::MAX;
        }
    }

    fn falling_edge(&mut self, now: u64) {
        self.sending = false;
        if let Some(bit) = self.tx_bit(now) {
            self.sending = true;
            if !bit {
                self.hold_until = now + self.hold_us();
            }
        }
    }

    fn rising_edge(&mut self, low: u64, now: u64) {
        if low >= STANDARD_RESET_US {
            self.reset(now, false);
        } else if self.overdrive && low >= OVERDRIVE_RESET_US {
            self.reset(now, true);
        } else if self.sending {
            self.sending = false;
            self.tx_advance();
        } else {
            let bit = low < self.sample_us();
            self.rx_bit(bit, now);
        }
    }

    fn tx_bit(&mut self, now: u64) -> Option<bool> {
        match self.phase {
            Phase::SearchRom { bit, step } if step < 2 => {
                let own = self.rom.bit(bit);
                Some(if step == 0 { own } else { !own })
            }
            Phase::Transmit(_) if now >= self.ready_at => {
                let byte = self.tx_byte()?;
                Some(byte & self.tx_mask != 0)
            }
            _ => None,
        }
    }

    fn tx_byte(&mut self) -> Option<u8> {
        if self.tx.is_empty() {
            match self.phase {
                Phase::Transmit(After::Fill(byte)) => self.tx.push_back(byte),
                Phase::Transmit(After::Memory(address)) => {
                    let byte = self.memory.get(address as usize).copied().unwrap_or(0xFF);
                    self.tx.push_back(byte);
                    self.phase = Phase::Transmit(After::Memory(address + 1));
                }
                _ => {
                    self.phase = Phase::Function;
                    return None;
                }
            }
        }
        self.tx.front().copied()
    }

    fn tx_advance(&mut self) {
        if let Phase::SearchRom { bit, step } = self.phase {
            self.phase = Phase::SearchRom { bit, step: step + 1 };
        } else if self.tx_mask == 0x80 {
            self.tx_mask = 0x01;
            self.tx.pop_front();
        } else {
            self.tx_mask <<= 1;
        }
    }

    fn rx_bit(&mut self, bit: bool, now: u64) {
        match self.phase {
            Phase::Idle | Phase::Transmit(_) => {}
            Phase::SearchRom { bit: index, step } => {
                if step != 2 {
                    return;
                }
                if bit != self.rom.bit(index) {
                    self.resume = false;
                    self.phase = Phase::Idle;
                } else if index + 1 == RomCode::BITS {
                    self.resume = true;
                    self.phase = Phase::Function;
                } else {
                    self.phase = Phase::SearchRom {
                        bit: index + 1,
                        step: 0,
                    };
                }
            }
            _ => {
                if bit {
                    self.rx_byte |= 1 << self.rx_bits;
                }
                self.rx_bits += 1;
                if self.rx_bits == 8 {
                    let byte = self.rx_byte;
                    self.rx_byte = 0;
                    self.rx_bits = 0;
                    self.on_byte(byte, now);
                }
            }
        }
    }

    fn on_byte(&mut self, byte: u8, now: u64) {
        match self.phase {
            Phase::RomCommand => self.rom_command(byte),
            Phase::MatchRom => {
                self.rx.push(byte);
                if self.rx.len() == RomCode::BYTES as usize {
                    let matched = self.rx[..] == self.rom[..];
                    self.rx.clear();
                    self.resume = matched;
                    self.phase = if matched { Phase::Function } else { Phase::Idle };
                }
            }
            Phase::Function => self.function(byte),
            Phase::Receive(what) => {
                self.rx.push(byte);
                self.receive(what, now);
            }
            _ => {}
        }
    }

    fn rom_command(&mut self, byte: u8) {
        self.phase = match byte {
            0x33 => {
                self.resume = false;
                self.tx.extend(self.rom.iter());
                Phase::Transmit(After::Function)
            }
            0x55 => Phase::MatchRom,
            0x69 => {
                self.overdrive = true;
                Phase::MatchRom
            }
            0xCC => {
                self.resume = false;
                Phase::Function
            }
            0x3C => {
                self.resume = false;
                self.overdrive = true;
                Phase::Function
            }
            0xA5 if self.resume => Phase::Function,
            0xF0 => Phase::SearchRom { bit: 0, step: 0 },
            _ => Phase::Idle,
        };
    }

    fn function(&mut self, byte: u8) {
        self.rx.clear();
        self.phase = match byte {
            0x0F => Phase::Receive(Receive::WriteScratchpad),
            0xAA => {
                self.queue_scratchpad();
                Phase::Transmit(After::Fill(0xFF))
            }
            0x55 => Phase::Receive(Receive::CopyScratchpad),
            0xF0 => Phase::Receive(Receive::ReadMemory),
            _ => Phase::Idle,
        };
    }

    fn queue_scratchpad(&mut self) {
        let [ta1, ta2] = self.ta.to_le_bytes();
        let start = (self.ta % 8) as usize;
        let end = (self.es & 0x07) as usize;

        let mut frame = vec![0xAA, ta1, ta2, self.es];
        if end >= start {
            frame.extend_from_slice(&self.scratchpad[start..=end]);
        }
        let crc = !crc16(&frame);

        let mut echo = frame.split_off(1);
        if self.corrupt_echo && echo.len() > 3 {
            echo[3] ^= 0x01;
        }
        self.tx.extend(echo);
        self.tx.extend(crc.to_le_bytes());
    }

    fn receive(&mut self, what: Receive, now: u64) {
        match what {
            Receive::WriteScratchpad => {
                if self.rx.len() == 2 {
                    self.ta = u16::from_le_bytes([self.rx[0], self.rx[1]]);
                    self.es = (self.ta % 8) as u8;
                } else if self.rx.len() > 2 {
                    let offset = (self.ta % 8) as usize + self.rx.len() - 3;
                    self.scratchpad[offset] = self.rx[self.rx.len() - 1];
                    self.es = offset as u8;
                    if offset == 7 {
                        let mut frame = vec![0x0F];
                        frame.extend_from_slice(&self.rx);
                        let mut crc = !crc16(&frame);
                        if self.corrupt_write_crc {
                            crc ^= 0x0001;
                        }
                        self.tx.extend(crc.to_le_bytes());
                        self.phase = Phase::Transmit(After::Fill(0xFF));
                    }
                }
            }
            Receive::CopyScratchpad => {
                if self.rx.len() == 3 {
                    let ta = u16::from_le_bytes([self.rx[0], self.rx[1]]);
                    let row = ta as usize;
                    let authorized = ta == self.ta
                        && self.rx[2] == self.es
                        && self.es & 0x07 == 0x07
                        && ta % 8 == 0
                        && row + 8 <= self.memory.len();
                    if authorized {
                        self.memory[row..row + 8].copy_from_slice(&self.scratchpad);
                        self.es |= 0x80;
                        self.copies += 1;
                        self.ready_at = now + EEPROM_PROGRAM_US;
                        self.phase = Phase::Transmit(After::Fill(0xAA));
                    } else {
                        self.phase = Phase::Transmit(After::Fill(0xFF));
                    }
                }
            }
            Receive::ReadMemory => {
                if self.rx.len() == 2 {
                    let address = u16::from_le_bytes([self.rx[0], self.rx[1]]);
                    self.phase = Phase::Transmit(After::Memory(address));
                }
            }
        }
    }
}

/// Wired-AND bus with a clock driven by the delays.
pub struct SimBus {
    pub devices: Vec<SimDevice>,
    pub inits: usize,
    pub deinits: usize,
    /// Everything sent through [`Bus::debug_print`]
    pub messages: Vec<String>,
    now: u64,
    level: bool,
    fell_at: u64,
    irq_depth: usize,
    irq_underflow: bool,
    unguarded: usize,
    reads: usize,
    writes: usize,
    fail_after: Option<usize>,
}

impl SimBus {
    pub fn new(devices: Vec<SimDevice>) -> Self {
        SimBus {
            devices,
            inits: 0,
            deinits: 0,
            messages: Vec::new(),
            now: 0,
            level: true,
            fell_at: 0,
            irq_depth: 0,
            irq_underflow: false,
            unguarded: 0,
            reads: 0,
            writes: 0,
            fail_after: None,
        }
    }

    /// Every write after the next `writes` ones fails.
    pub fn fail_after_writes(&mut self, writes: usize) {
        self.fail_after = Some(self.writes + writes);
    }

    pub fn irq_balanced(&self) -> bool {
        self.irq_depth == 0 && !self.irq_underflow
    }

    /// Line accesses made with interrupts enabled.
    pub fn unguarded(&self) -> usize {
        self.unguarded
    }

    pub fn transactions(&self) -> usize {
        self.reads + self.writes
    }

    fn access(&mut self) {
        if self.irq_depth == 0 {
            self.unguarded += 1;
        }
    }
}

impl Bus for SimBus {
    type Error = SimFault;

    fn bus_init(&mut self) -> Result<(), SimFault> {
        self.inits += 1;
        Ok(())
    }

    fn bus_deinit(&mut self) -> Result<(), SimFault> {
        self.deinits += 1;
        Ok(())
    }

    fn bus_read(&mut self) -> Result<bool, SimFault> {
        self.access();
        self.reads += 1;
        let now = self.now;
        Ok(self.level && !self.devices.iter().any(|d| d.pulls_low(now)))
    }

    fn bus_write(&mut self, level: bool) -> Result<(), SimFault> {
        self.access();
        self.writes += 1;
        if self.fail_after.map_or(false, |limit| self.writes > limit) {
            return Err(SimFault);
        }
        if level != self.level {
            let now = self.now;
            if level {
                let low = now - self.fell_at;
                self.devices.iter_mut().for_each(|d| d.rising_edge(low, now));
            } else {
                self.fell_at = now;
                self.devices.iter_mut().for_each(|d| d.falling_edge(now));
            }
            self.level = level;
        }
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) {
        self.now += u64::from(ms) * 1000;
    }

    fn delay_us(&mut self, us: u32) {
        self.now += u64::from(us);
    }

    fn enable_irq(&mut self) {
        if self.irq_depth == 0 {
            self.irq_underflow = true;
        } else {
            self.irq_depth -= 1;
        }
    }

    fn disable_irq(&mut self) {
        self.irq_depth += 1;
    }

    fn debug_print(&mut self, args: Arguments<'_>) {
        self.messages.push(args.to_string());
    }
}
