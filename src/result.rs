use core::fmt::Debug;

/// Error type
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error<E: Sized + Debug> {
    /// Adapter failed to drive or sample the wire
    #[error("bus adapter error: {0:?}")]
    PortError(E),
    /// No presence on wire
    #[error("no presence pulse after reset")]
    NoPresence,
    /// Wire not released after the presence pulse
    #[error("wire held low after presence pulse")]
    WireFault,
    /// Computed and received checksum
    #[error("crc mismatch: computed {0:#06x}, received {1:#06x}")]
    CrcMismatch(u16, u16),
    /// Scratchpad read back intact but not what was staged
    #[error("scratchpad echo differs from staged data")]
    EchoMismatch,
    #[error("device not initialized")]
    NotInitialized,
    #[error("address range out of bounds")]
    OutOfRange,
    #[error("invalid protection code {0:#04x}")]
    InvalidConfig(u8),
    /// Copy scratchpad without a verified read back of the same data
    #[error("copy scratchpad without verified read back")]
    ProtocolViolation,
    #[error("unexpected response byte {0:#04x}")]
    UnexpectedResponse(u8),
}

impl<E: Sized + Debug> Error<E> {
    /// Errors raised by the wire itself rather than by the protocol.
    pub fn is_bus_error(&self) -> bool {
        matches!(
            self,
            Error::PortError(_) | Error::NoPresence | Error::WireFault
        )
    }
}

impl<E: Sized + Debug> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::PortError(e)
    }
}
