#![cfg_attr(not(test), no_std)]
#![doc = include_str!("../README.md")]

/// Logs a diagnostic and hands it to the adapter's debug sink.
macro_rules! report {
    ($bus:expr, $($arg:tt)*) => {{
        log::debug!($($arg)*);
        $bus.debug_print(format_args!($($arg)*));
    }};
}

mod bus;
mod command;
mod config;
pub mod crc;
mod device;
mod info;
#[cfg(feature = "pin-bus")]
mod iowire;
mod memory;
mod memory_config;
mod mode;
mod result;
mod rom;
mod search;
#[cfg(test)]
mod sim;
mod wire;

pub use bus::Bus;
pub use command::{Command, MemoryCommand, OpCode};
pub use config::Config;
pub use crc::{crc16, crc8};
pub use device::{Ds2431, State};
pub use info::{info, ChipInfo, INFO};
#[cfg(feature = "pin-bus")]
pub use iowire::{Inverted, IoWire, PinBus};
pub use memory::{Scratchpad, MEMORY_SIZE, PAGE_SIZE, ROW_SIZE};
pub use memory_config::{ConfigControl, Protection};
pub use mode::Mode;
pub use result::Error;
pub use rom::{RomCode, RomCodeError};
pub use search::RomSearch;
pub use wire::{SlotTiming, Speed, Wire};
