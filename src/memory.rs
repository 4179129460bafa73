use crate::{
    crc::{compute_partial_crc16, crc16},
    Bus, ConfigControl, Ds2431, Error, MemoryCommand, OpCode,
};
use byteorder::{ByteOrder, LittleEndian};
use core::fmt::Debug;

/// Size of the user EEPROM in bytes.
pub const MEMORY_SIZE: u16 = 0x0080;
/// Scratchpad and copy granularity.
pub const ROW_SIZE: u16 = 8;
/// Protection granularity.
pub const PAGE_SIZE: u16 = 32;

/// End of the register row, the last address the scratchpad accepts.
const SCRATCHPAD_LIMIT: u16 = 0x0088;
/// Read Memory may run past the register row into the reserved bytes.
const READ_LIMIT: u16 = 0x0090;

/// Status byte the device keeps sending once a copy has completed.
const COPY_DONE: u8 = 0xAA;

const ES_OFFSET_MASK: u8 = 0x07;
const ES_PARTIAL: u8 = 0x20;
const ES_AUTHORIZED: u8 = 0x80;

/// Scratchpad contents as reported by Read Scratchpad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scratchpad {
    /// Target address TA1/TA2
    pub address: u16,
    /// Ending offset and status flags
    pub es: u8,
    data: [u8; ROW_SIZE as usize],
    len: u8,
}

impl Scratchpad {
    /// Valid bytes, from the target offset up to the ending offset.
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    pub fn ending_offset(&self) -> u8 {
        self.es & ES_OFFSET_MASK
    }

    /// Set when the last write ended in the middle of a byte.
    pub fn is_partial(&self) -> bool {
        self.es & ES_PARTIAL != 0
    }

    /// Set once a copy of this scratchpad was accepted.
    pub fn is_authorized(&self) -> bool {
        self.es & ES_AUTHORIZED != 0
    }

    fn span(address: u16, es: u8) -> usize {
        let start = (address % ROW_SIZE) as usize;
        let end = (es & ES_OFFSET_MASK) as usize;
        if end >= start {
            end - start + 1
        } else {
            0
        }
    }
}

/// What the last Write Scratchpad put on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Staged {
    address: u16,
    data: [u8; ROW_SIZE as usize],
    len: u8,
}

impl Staged {
    fn matches(&self, pad: &Scratchpad) -> bool {
        self.address == pad.address && !pad.is_partial() && pad.data() == self.data()
    }

    fn data(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }
}

/// Authorization pattern of a verified scratchpad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Verified {
    address: u16,
    es: u8,
}

/// Scratchpad bookkeeping of a session.
///
/// A copy is only issued for the exact (address, es) pattern that the last
/// successful read back returned for the staged data.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Ledger {
    staged: Option<Staged>,
    verified: Option<Verified>,
}

fn check_range<E: Debug>(address: u16, len: usize, limit: u16) -> Result<(), Error<E>> {
    if address as usize + len > limit as usize {
        Err(Error::OutOfRange)
    } else {
        Ok(())
    }
}

/// Checks an inverted little endian CRC-16 as the device sends it.
fn check_crc16<E: Debug>(computed: u16, tail: &[u8; 2]) -> Result<(), Error<E>> {
    let received = !LittleEndian::read_u16(tail);
    if computed != received {
        Err(Error::CrcMismatch(computed, received))
    } else {
        Ok(())
    }
}

fn target_address(address: u16) -> [u8; 2] {
    let mut ta = [0u8; 2];
    LittleEndian::write_u16(&mut ta, address);
    ta
}

impl<B: Bus> Ds2431<B> {
    /// Reads raw memory, register row and reserved bytes included.
    pub fn read_memory(&mut self, address: u16, buf: &mut [u8]) -> Result<(), Error<B::Error>> {
        self.ensure_initialized()?;
        check_range(address, buf.len(), READ_LIMIT)?;
        if buf.is_empty() {
            return Ok(());
        }
        self.read_memory_raw(address, buf)
            .map_err(|e| self.fail("read memory", e))
    }

    fn read_memory_raw(&mut self, address: u16, buf: &mut [u8]) -> Result<(), Error<B::Error>> {
        let speed = self.address()?;
        self.wire.write_command(speed, MemoryCommand::ReadMemory)?;
        self.wire.write_bytes(speed, &target_address(address))?;
        self.wire.read_bytes(speed, buf)?;
        Ok(())
    }

    /// Stages up to one row of data in the scratchpad.
    ///
    /// `data` must not cross a row boundary. Invalidates any earlier read
    /// back, so a following copy needs a fresh
    /// [`read_scratchpad`](Ds2431::read_scratchpad).
    pub fn write_scratchpad(&mut self, address: u16, data: &[u8]) -> Result<(), Error<B::Error>> {
        self.ensure_initialized()?;
        check_range(address, data.len(), SCRATCHPAD_LIMIT)?;
        let offset = (address % ROW_SIZE) as usize;
        if data.is_empty() || offset + data.len() > ROW_SIZE as usize {
            return Err(Error::OutOfRange);
        }

        self.ledger = Ledger::default();
        self.write_scratchpad_raw(address, data)
            .map_err(|e| self.fail("write scratchpad", e))?;

        let mut staged = Staged {
            address,
            data: [0; ROW_SIZE as usize],
            len: data.len() as u8,
        };
        staged.data[..data.len()].copy_from_slice(data);
        self.ledger.staged = Some(staged);
        Ok(())
    }

    fn write_scratchpad_raw(&mut self, address: u16, data: &[u8]) -> Result<(), Error<B::Error>> {
        let speed = self.address()?;
        let ta = target_address(address);
        self.wire
            .write_command(speed, MemoryCommand::WriteScratchpad)?;
        self.wire.write_bytes(speed, &ta)?;
        self.wire.write_bytes(speed, data)?;

        // The device only appends a CRC when the write reached the row end.
        if (address % ROW_SIZE) as usize + data.len() == ROW_SIZE as usize {
            let mut tail = [0u8; 2];
            self.wire.read_bytes(speed, &mut tail)?;
            let crc = crc16(&[MemoryCommand::WriteScratchpad.op_code(), ta[0], ta[1]]);
            check_crc16(compute_partial_crc16(crc, data), &tail)?;
        }
        Ok(())
    }

    /// Reads the scratchpad back and verifies it against the staged data.
    ///
    /// When it matches what this handle staged, the returned address and `es`
    /// authorize exactly one [`copy_scratchpad`](Ds2431::copy_scratchpad).
    /// Contents this handle did not stage are returned but never authorized.
    pub fn read_scratchpad(&mut self) -> Result<Scratchpad, Error<B::Error>> {
        self.ensure_initialized()?;
        self.ledger.verified = None;
        let pad = self
            .read_scratchpad_raw()
            .map_err(|e| self.fail("read scratchpad", e))?;

        match self.ledger.staged {
            Some(staged) if !staged.matches(&pad) => {
                Err(self.fail("verify scratchpad", Error::EchoMismatch))
            }
            Some(_) => {
                self.ledger.verified = Some(Verified {
                    address: pad.address,
                    es: pad.es,
                });
                Ok(pad)
            }
            // nothing staged by this handle, so nothing to authorize
            None => Ok(pad),
        }
    }

    fn read_scratchpad_raw(&mut self) -> Result<Scratchpad, Error<B::Error>> {
        let speed = self.address()?;
        let cmd = MemoryCommand::ReadScratchpad;
        self.wire.write_command(speed, cmd)?;

        let mut header = [0u8; 3];
        self.wire.read_bytes(speed, &mut header)?;
        let address = LittleEndian::read_u16(&header[..2]);
        let es = header[2];

        let len = Scratchpad::span(address, es);
        let mut data = [0u8; ROW_SIZE as usize];
        self.wire.read_bytes(speed, &mut data[..len])?;

        let mut tail = [0u8; 2];
        self.wire.read_bytes(speed, &mut tail)?;
        let crc = compute_partial_crc16(crc16(&[cmd.op_code()]), &header);
        check_crc16(compute_partial_crc16(crc, &data[..len]), &tail)?;

        Ok(Scratchpad {
            address,
            es,
            data,
            len: len as u8,
        })
    }

    /// Commits the scratchpad to EEPROM.
    ///
    /// `address` and `es` must be the pattern returned by the last successful
    /// [`read_scratchpad`](Ds2431::read_scratchpad), otherwise nothing is sent
    /// and [`Error::ProtocolViolation`] is returned.
    pub fn copy_scratchpad(&mut self, address: u16, es: u8) -> Result<(), Error<B::Error>> {
        self.ensure_initialized()?;
        if self.ledger.verified != Some(Verified { address, es }) {
            return Err(self.fail("copy scratchpad", Error::ProtocolViolation));
        }

        // One authorization, one copy.
        self.ledger = Ledger::default();
        self.copy_scratchpad_raw(address, es)
            .map_err(|e| self.fail("copy scratchpad", e))
    }

    fn copy_scratchpad_raw(&mut self, address: u16, es: u8) -> Result<(), Error<B::Error>> {
        let speed = self.address()?;
        let ta = target_address(address);
        self.wire
            .write_command(speed, MemoryCommand::CopyScratchpad)?;
        self.wire.write_bytes(speed, &[ta[0], ta[1], es])?;

        // Interrupts stay enabled while the EEPROM is programmed.
        let delay = self.config.copy_delay_ms;
        self.wire.bus_mut().delay_ms(delay);

        match self.wire.read_byte(speed)? {
            COPY_DONE => Ok(()),
            status => Err(Error::UnexpectedResponse(status)),
        }
    }

    /// Reads user memory.
    pub fn read(&mut self, address: u16, buf: &mut [u8]) -> Result<(), Error<B::Error>> {
        self.ensure_initialized()?;
        check_range(address, buf.len(), MEMORY_SIZE)?;
        self.read_memory(address, buf)
    }

    /// Writes user memory at any offset and length.
    ///
    /// Data is programmed row by row. Rows that are only partly covered are
    /// read first and merged, so the other bytes keep their content. A row is
    /// either fully programmed or left untouched.
    pub fn write(&mut self, address: u16, data: &[u8]) -> Result<(), Error<B::Error>> {
        self.ensure_initialized()?;
        check_range(address, data.len(), MEMORY_SIZE)?;

        let mut address = address;
        let mut data = data;
        while !data.is_empty() {
            let offset = address % ROW_SIZE;
            let row = address - offset;
            let take = data.len().min((ROW_SIZE - offset) as usize);

            let mut buf = [0u8; ROW_SIZE as usize];
            if take < ROW_SIZE as usize {
                self.read_memory(row, &mut buf)?;
            }
            buf[offset as usize..offset as usize + take].copy_from_slice(&data[..take]);
            self.write_row(row, &buf)?;

            address += take as u16;
            data = &data[take..];
        }
        Ok(())
    }

    /// Write, verify and copy one full row.
    pub(crate) fn write_row(&mut self, row: u16, buf: &[u8; ROW_SIZE as usize]) -> Result<(), Error<B::Error>> {
        log::trace!("ds2431: programming row {:#06x}", row);
        self.write_scratchpad(row, buf)?;
        let pad = self.read_scratchpad()?;
        self.copy_scratchpad(pad.address, pad.es)
    }

    pub fn read_memory_config(&mut self) -> Result<ConfigControl, Error<B::Error>> {
        let mut raw = [0u8; ConfigControl::BYTES];
        self.read_memory(ConfigControl::ADDRESS, &mut raw)?;
        Ok(ConfigControl::from(raw))
    }

    /// Programs the register row. Protection codes are checked before the bus
    /// is touched.
    pub fn write_memory_config(&mut self, config: &ConfigControl) -> Result<(), Error<B::Error>> {
        self.ensure_initialized()?;
        if let Err(e) = config.validate() {
            return Err(self.fail("write memory config", e));
        }
        self.write_row(ConfigControl::ADDRESS, &config.to_bytes())
    }
}
