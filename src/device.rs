use crate::{
    info::{ChipInfo, INFO},
    memory::Ledger,
    Bus, Command, Config, Error, Mode, RomCode, Speed, Wire,
};

/// Lifecycle of a [`Ds2431`] session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Uninitialized,
    Initialized,
    /// Terminal, the adapter has been shut down.
    Deinitialized,
}

/// One DS2431 on a 1-Wire bus.
///
/// The handle owns the bus adapter and remembers how the device is selected
/// ([`Mode`] and [`RomCode`]). All bus operations need `&mut self`, so a
/// session can not be driven from two places at once.
pub struct Ds2431<B: Bus> {
    pub(crate) wire: Wire<B>,
    pub(crate) config: Config,
    pub(crate) ledger: Ledger,
    mode: Mode,
    rom: RomCode,
    state: State,
}

impl<B: Bus> Ds2431<B> {
    /// Family code of the DS2431
    pub const FAMILY_CODE: u8 = 0x2D;

    pub fn new(bus: B) -> Self {
        Ds2431 {
            wire: Wire::new(bus),
            config: Config::default(),
            ledger: Ledger::default(),
            mode: Mode::default(),
            rom: RomCode::default(),
            state: State::Uninitialized,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_rom(mut self, rom: RomCode) -> Self {
        self.rom = rom;
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Creates and initializes a handle in one step.
    pub fn open(bus: B, mode: Mode) -> Result<Self, Error<B::Error>> {
        let mut device = Self::new(bus).with_mode(mode);
        device.init()?;
        Ok(device)
    }

    /// Brings up the adapter. The bus is not probed; use
    /// [`search`](Ds2431::search) or [`read_rom`](Ds2431::read_rom) for that.
    pub fn init(&mut self) -> Result<(), Error<B::Error>> {
        match self.state {
            State::Initialized => Ok(()),
            State::Deinitialized => Err(Error::NotInitialized),
            State::Uninitialized => {
                if let Err(e) = self.wire.bus_mut().bus_init() {
                    return Err(self.fail("bus init", Error::PortError(e)));
                }
                self.state = State::Initialized;
                log::trace!("ds2431: initialized in {:?}", self.mode);
                Ok(())
            }
        }
    }

    pub fn deinit(&mut self) -> Result<(), Error<B::Error>> {
        self.ensure_initialized()?;
        if let Err(e) = self.wire.bus_mut().bus_deinit() {
            return Err(self.fail("bus deinit", Error::PortError(e)));
        }
        self.state = State::Deinitialized;
        self.ledger = Ledger::default();
        Ok(())
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state == State::Initialized
    }

    pub fn release(self) -> B {
        self.wire.release()
    }

    pub fn bus(&self) -> &B {
        self.wire.bus()
    }

    pub fn bus_mut(&mut self) -> &mut B {
        self.wire.bus_mut()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn rom(&self) -> RomCode {
        self.rom
    }

    /// Targets another device; any scratchpad bookkeeping belongs to the old one.
    pub fn set_rom(&mut self, rom: RomCode) {
        if rom != self.rom {
            self.ledger = Ledger::default();
        }
        self.rom = rom;
    }

    /// Whether `rom` is the code this handle addresses.
    pub fn rom_match(&self, rom: &RomCode) -> bool {
        self.rom == *rom
    }

    pub fn info() -> &'static ChipInfo {
        &INFO
    }

    pub(crate) fn ensure_initialized(&self) -> Result<(), Error<B::Error>> {
        if self.state == State::Initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    /// Reports a failed operation to the log and the adapter's debug sink.
    pub(crate) fn fail(&mut self, what: &str, error: Error<B::Error>) -> Error<B::Error> {
        report!(self.wire.bus_mut(), "ds2431: {} failed: {}", what, error);
        error
    }

    /// Reset, then address the device with `mode`.
    ///
    /// Match variants send `rom`, or the cached code when `None`. Returns the
    /// speed the following memory command has to use.
    pub fn select(&mut self, mode: Mode, rom: Option<&RomCode>) -> Result<Speed, Error<B::Error>> {
        self.ensure_initialized()?;
        let rom = rom.copied().unwrap_or(self.rom);
        self.select_raw(mode, &rom)
            .map_err(|e| self.fail("select", e))
    }

    /// Selects with the handle's own mode and code.
    pub(crate) fn address(&mut self) -> Result<Speed, Error<B::Error>> {
        let rom = self.rom;
        self.select_raw(self.mode, &rom)
    }

    fn select_raw(&mut self, mode: Mode, rom: &RomCode) -> Result<Speed, Error<B::Error>> {
        log::trace!("ds2431: select {:?}", mode);
        let speed = mode.select_speed();
        self.wire.reset(speed)?;
        self.wire.write_command(speed, mode.command())?;
        let speed = mode.data_speed();
        if mode.sends_rom() {
            self.wire.write_bytes(speed, rom.as_ref())?;
        }
        Ok(speed)
    }

    /// Reads the code of the only device on the bus and caches it.
    pub fn read_rom(&mut self) -> Result<RomCode, Error<B::Error>> {
        self.ensure_initialized()?;
        let rom = self.read_rom_raw().map_err(|e| self.fail("read rom", e))?;
        self.set_rom(rom);
        Ok(rom)
    }

    fn read_rom_raw(&mut self) -> Result<RomCode, Error<B::Error>> {
        self.wire.reset(Speed::Standard)?;
        self.wire.write_command(Speed::Standard, Command::ReadRom)?;
        let mut raw = [0u8; RomCode::BYTES as usize];
        self.wire.read_bytes(Speed::Standard, &mut raw)?;
        let rom = RomCode::from(raw);
        rom.ensure_correct_crc8()?;
        Ok(rom)
    }

    /// Matches `rom` and resets, leaving that device ready for
    /// [`Mode::Resume`], or [`Mode::OverdriveResume`] when `overdrive` is set.
    pub fn arm_resume(&mut self, overdrive: bool, rom: &RomCode) -> Result<(), Error<B::Error>> {
        let mode = if overdrive {
            Mode::OverdriveMatchRom
        } else {
            Mode::MatchRom
        };
        let speed = self.select(mode, Some(rom))?;
        if let Err(e) = self.wire.reset(speed) {
            return Err(self.fail("resume reset", e));
        }
        self.set_rom(*rom);
        Ok(())
    }
}
