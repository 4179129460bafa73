use crate::Bus;
use core::fmt::Arguments;
use embedded_hal::{
    delay::DelayNs,
    digital::{Error, ErrorType, InputPin, OutputPin},
};

pub trait IoWire {
    type Error: Error;

    /// Is the input pin high?
    fn is_high(&mut self) -> Result<bool, Self::Error>;

    /// Drives the pin low
    ///
    /// *NOTE* the actual electrical state of the pin may not actually be low, e.g. due to external
    /// electrical sources
    fn set_low(&mut self) -> Result<(), Self::Error>;

    /// Drives the pin high
    ///
    /// *NOTE* the actual electrical state of the pin may not actually be high, e.g. due to external
    /// electrical sources
    fn set_high(&mut self) -> Result<(), Self::Error>;
}

/// Single line config wrapper
impl<IO> IoWire for (IO,)
where
    IO: ErrorType + OutputPin + InputPin,
{
    type Error = IO::Error;

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }
}

/// Dual line config wrapper
impl<E, I, O> IoWire for (I, O)
where
    E: Error,
    I: ErrorType<Error = E> + InputPin,
    O: ErrorType<Error = E> + OutputPin,
{
    type Error = E;

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.1.set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.1.set_high()
    }
}

/// Inverted wire wrapper
pub struct Inverted<P>(pub P);

impl<I: ErrorType> ErrorType for Inverted<I> {
    type Error = I::Error;
}

impl<I> InputPin for Inverted<I>
where
    I: InputPin,
{
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }
}

impl<O> OutputPin for Inverted<O>
where
    O: OutputPin,
{
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }
}

fn no_irq() {}

/// [`Bus`] over an open-drain GPIO and an embedded-hal delay.
///
/// Interrupt masking defaults to a no-op; platforms that need it hand in
/// their own functions with [`PinBus::with_irq`].
pub struct PinBus<W: IoWire, D: DelayNs> {
    wire: W,
    delay: D,
    disable_irq: fn(),
    enable_irq: fn(),
}

impl<W: IoWire, D: DelayNs> PinBus<W, D> {
    pub fn new(wire: W, delay: D) -> Self {
        PinBus {
            wire,
            delay,
            disable_irq: no_irq,
            enable_irq: no_irq,
        }
    }

    pub fn with_irq(mut self, disable: fn(), enable: fn()) -> Self {
        self.disable_irq = disable;
        self.enable_irq = enable;
        self
    }

    pub fn release(self) -> (W, D) {
        (self.wire, self.delay)
    }
}

impl<W: IoWire, D: DelayNs> Bus for PinBus<W, D> {
    type Error = W::Error;

    fn bus_init(&mut self) -> Result<(), Self::Error> {
        self.wire.set_high()
    }

    fn bus_deinit(&mut self) -> Result<(), Self::Error> {
        self.wire.set_high()
    }

    fn bus_read(&mut self) -> Result<bool, Self::Error> {
        self.wire.is_high()
    }

    fn bus_write(&mut self, level: bool) -> Result<(), Self::Error> {
        if level {
            self.wire.set_high()
        } else {
            self.wire.set_low()
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn enable_irq(&mut self) {
        (self.enable_irq)();
    }

    fn disable_irq(&mut self) {
        (self.disable_irq)();
    }

    fn debug_print(&mut self, args: Arguments<'_>) {
        log::debug!("{}", args);
    }
}
