/// Driver settings that are not part of the device state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Time the device needs to commit a scratchpad row to EEPROM.
    pub copy_delay_ms: u32,
    /// Upper bound on codes returned by one search.
    pub search_limit: usize,
}

impl Config {
    pub const DEFAULT_COPY_DELAY_MS: u32 = 10;
    pub const MAX_SEARCH_SIZE: usize = 64;

    pub fn with_copy_delay_ms(mut self, ms: u32) -> Self {
        self.copy_delay_ms = ms;
        self
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            copy_delay_ms: Self::DEFAULT_COPY_DELAY_MS,
            search_limit: Self::MAX_SEARCH_SIZE,
        }
    }
}
