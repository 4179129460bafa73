use crate::{
    bus::{Bus, Critical},
    Error, OpCode,
};

/// Bus speed of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Speed {
    #[default]
    Standard,
    Overdrive,
}

/// Slot durations in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTiming {
    pub reset_low: u32,
    pub presence_wait: u32,
    pub write_one_low: u32,
    pub write_one_recovery: u32,
    pub write_zero_low: u32,
    pub write_zero_recovery: u32,
    pub read_low: u32,
    pub read_sample: u32,
    pub read_recovery: u32,
}

impl SlotTiming {
    pub const STANDARD: SlotTiming = SlotTiming {
        reset_low: 550,
        presence_wait: 15,
        write_one_low: 2,
        write_one_recovery: 65,
        write_zero_low: 65,
        write_zero_recovery: 2,
        read_low: 2,
        read_sample: 12,
        read_recovery: 50,
    };

    pub const OVERDRIVE: SlotTiming = SlotTiming {
        reset_low: 70,
        presence_wait: 2,
        write_one_low: 1,
        write_one_recovery: 10,
        write_zero_low: 10,
        write_zero_recovery: 2,
        read_low: 1,
        read_sample: 0,
        read_recovery: 10,
    };
}

impl Speed {
    pub fn timing(&self) -> &'static SlotTiming {
        match self {
            Speed::Standard => &SlotTiming::STANDARD,
            Speed::Overdrive => &SlotTiming::OVERDRIVE,
        }
    }
}

/// 1µs polls waiting for the presence pulse to start
const PRESENCE_POLLS: u32 = 200;
/// 1µs polls waiting for the line to be released again
const RELEASE_POLLS: u32 = 240;

/// 1-Wire time slots generated on top of a [`Bus`].
pub struct Wire<B: Bus> {
    bus: B,
}

impl<B: Bus> Wire<B> {
    pub fn new(bus: B) -> Self {
        Wire { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn release(self) -> B {
        self.bus
    }

    /// Performs a reset and listens for a presence pulse
    /// Returns Err(NoPresence) if no device pulled the line low and
    /// Err(WireFault) if the line never came back high
    pub fn reset(&mut self, speed: Speed) -> Result<(), Error<B::Error>> {
        let timing = speed.timing();
        let mut bus = Critical::new(&mut self.bus);

        bus.bus_write(false)?;
        bus.delay_us(timing.reset_low);
        bus.bus_write(true)?;
        bus.delay_us(timing.presence_wait);

        let mut polls = 0;
        while bus.bus_read()? {
            polls += 1;
            if polls >= PRESENCE_POLLS {
                return Err(Error::NoPresence);
            }
            bus.delay_us(1);
        }

        polls = 0;
        while !bus.bus_read()? {
            polls += 1;
            if polls >= RELEASE_POLLS {
                return Err(Error::WireFault);
            }
            bus.delay_us(1);
        }
        Ok(())
    }

    pub fn reset_presence(&mut self, speed: Speed) -> Result<bool, Error<B::Error>> {
        self.reset(speed).map(|_| true).or_else(|error| {
            if matches!(error, Error::NoPresence) {
                Ok(false)
            } else {
                Err(error)
            }
        })
    }

    pub fn read_bytes(&mut self, speed: Speed, dst: &mut [u8]) -> Result<(), B::Error> {
        for d in dst {
            *d = self.read_byte(speed)?;
        }
        Ok(())
    }

    pub fn read_byte(&mut self, speed: Speed) -> Result<u8, B::Error> {
        let timing = speed.timing();
        let mut bus = Critical::new(&mut self.bus);
        let mut byte = 0_u8;
        for _ in 0..8 {
            byte >>= 1;
            if read_slot(&mut *bus, timing)? {
                byte |= 0x80;
            }
        }
        Ok(byte)
    }

    /// Reads an id bit and its complement during a search.
    pub fn read_bit_pair(&mut self, speed: Speed) -> Result<(bool, bool), B::Error> {
        let timing = speed.timing();
        let mut bus = Critical::new(&mut self.bus);
        let bit = read_slot(&mut *bus, timing)?;
        let complement = read_slot(&mut *bus, timing)?;
        Ok((bit, complement))
    }

    pub fn write_command(&mut self, speed: Speed, cmd: impl OpCode) -> Result<(), B::Error> {
        self.write_byte(speed, cmd.op_code())
    }

    pub fn write_bytes(&mut self, speed: Speed, bytes: &[u8]) -> Result<(), B::Error> {
        for b in bytes {
            self.write_byte(speed, *b)?;
        }
        Ok(())
    }

    pub fn write_byte(&mut self, speed: Speed, byte: u8) -> Result<(), B::Error> {
        let timing = speed.timing();
        let mut bus = Critical::new(&mut self.bus);
        let mut byte = byte;
        for _ in 0..8 {
            write_slot(&mut *bus, timing, (byte & 0x01) == 0x01)?;
            byte >>= 1;
        }
        Ok(())
    }

    pub fn write_bit(&mut self, speed: Speed, high: bool) -> Result<(), B::Error> {
        let timing = speed.timing();
        let mut bus = Critical::new(&mut self.bus);
        write_slot(&mut *bus, timing, high)
    }
}

fn read_slot<B: Bus>(bus: &mut B, timing: &SlotTiming) -> Result<bool, B::Error> {
    bus.bus_write(false)?;
    bus.delay_us(timing.read_low);
    bus.bus_write(true)?;
    bus.delay_us(timing.read_sample);
    let val = bus.bus_read()?;
    bus.delay_us(timing.read_recovery);
    Ok(val)
}

fn write_slot<B: Bus>(bus: &mut B, timing: &SlotTiming, high: bool) -> Result<(), B::Error> {
    bus.bus_write(false)?;
    bus.delay_us(if high {
        timing.write_one_low
    } else {
        timing.write_zero_low
    });
    bus.bus_write(true)?;
    bus.delay_us(if high {
        timing.write_one_recovery
    } else {
        timing.write_zero_recovery
    });
    Ok(())
}
