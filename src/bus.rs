use core::{
    fmt::{Arguments, Debug},
    ops::{Deref, DerefMut},
};

/// Line level primitives the driver is built on.
///
/// The driver generates all 1-Wire time slots itself from these calls, so an
/// implementation only has to drive the open-drain line, sample it and wait.
/// `bus_write(true)` releases the line (pulled up), `bus_write(false)` pulls
/// it low. `bus_read` samples the current level.
pub trait Bus {
    type Error: Debug;

    fn bus_init(&mut self) -> Result<(), Self::Error>;

    fn bus_deinit(&mut self) -> Result<(), Self::Error>;

    fn bus_read(&mut self) -> Result<bool, Self::Error>;

    fn bus_write(&mut self, level: bool) -> Result<(), Self::Error>;

    fn delay_ms(&mut self, ms: u32);

    fn delay_us(&mut self, us: u32);

    fn enable_irq(&mut self);

    fn disable_irq(&mut self);

    /// Sink for driver diagnostics. Purely advisory.
    fn debug_print(&mut self, _args: Arguments<'_>) {}
}

/// Interrupts stay masked while this guard lives, on every exit path.
pub(crate) struct Critical<'a, B: Bus> {
    bus: &'a mut B,
}

impl<'a, B: Bus> Critical<'a, B> {
    pub(crate) fn new(bus: &'a mut B) -> Self {
        bus.disable_irq();
        Critical { bus }
    }
}

impl<B: Bus> Deref for Critical<'_, B> {
    type Target = B;

    fn deref(&self) -> &Self::Target {
        self.bus
    }
}

impl<B: Bus> DerefMut for Critical<'_, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.bus
    }
}

impl<B: Bus> Drop for Critical<'_, B> {
    fn drop(&mut self) {
        self.bus.enable_irq();
    }
}
