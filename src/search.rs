use crate::{Bus, Command, Ds2431, Error, RomCode, Speed, Wire};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum SearchState {
    #[default]
    Initialized,
    DeviceFound,
    End,
}

/// Path through the ROM tree taken by the previous pass.
#[derive(Debug, Clone, Default)]
struct DeviceSearch {
    rom: [u8; RomCode::BYTES as usize],
    /// Branch points where the 1 side is still unexplored
    discrepancies: [u8; RomCode::BYTES as usize],
    state: SearchState,
}

impl DeviceSearch {
    fn last_discrepancy(&self) -> Option<u8> {
        (0..RomCode::BITS)
            .rev()
            .find(|bit| is_bit_set(&self.discrepancies, *bit))
    }
}

fn is_bit_set(array: &[u8], bit: u8) -> bool {
    array[(bit / 8) as usize] & (0x01 << (bit % 8)) != 0x00
}

fn write_bit(array: &mut [u8], bit: u8, value: bool) {
    let mask = 0x01 << (bit % 8);
    if value {
        array[(bit / 8) as usize] |= mask;
    } else {
        array[(bit / 8) as usize] &= !mask;
    }
}

impl<B: Bus> Wire<B> {
    /// One pass of the Search ROM algorithm.
    ///
    /// At a new discrepancy the 0 branch is taken first and remembered. The
    /// next pass replays the path up to the deepest remembered discrepancy
    /// and takes its 1 branch, so codes come out in ascending order of their
    /// bits as sent on the wire.
    fn search_next(&mut self, search: &mut DeviceSearch) -> Result<Option<RomCode>, Error<B::Error>> {
        if search.state == SearchState::End {
            return Ok(None);
        }

        let last_discrepancy = search.last_discrepancy();
        if last_discrepancy.is_none() && search.state == SearchState::DeviceFound {
            // the previous pass met no branch left to take
            search.state = SearchState::End;
            return Ok(None);
        }

        log::trace!("ds2431: search pass, last discrepancy {:?}", last_discrepancy);
        if !self.reset_presence(Speed::Standard)? {
            search.state = SearchState::End;
            return Ok(None);
        }
        self.write_command(Speed::Standard, Command::SearchRom)?;

        let mut discrepancy_found = false;
        for i in 0..RomCode::BITS {
            let (bit, complement) = self.read_bit_pair(Speed::Standard)?;
            let direction = match (bit, complement) {
                // nobody answered
                (true, true) => {
                    search.state = SearchState::End;
                    return Ok(None);
                }
                _ if last_discrepancy == Some(i) => {
                    write_bit(&mut search.discrepancies, i, false);
                    true
                }
                _ if last_discrepancy.map_or(false, |last| i < last) => {
                    RomCode::from(search.rom).bit(i)
                }
                (false, false) => {
                    discrepancy_found = true;
                    write_bit(&mut search.discrepancies, i, true);
                    false
                }
                (bit, _) => bit,
            };
            write_bit(&mut search.rom, i, direction);
            self.write_bit(Speed::Standard, direction)?;
        }

        search.state = if !discrepancy_found && search.last_discrepancy().is_none() {
            SearchState::End
        } else {
            SearchState::DeviceFound
        };
        Ok(Some(RomCode::from(search.rom)))
    }
}

/// Iterator over the codes found on the bus.
///
/// Codes with a bad CRC are reported and skipped. A bus error is yielded
/// once and ends the iteration.
pub struct RomSearch<'a, B: Bus> {
    search: Option<DeviceSearch>,
    wire: &'a mut Wire<B>,
    remaining: usize,
}

impl<B: Bus> Iterator for RomSearch<'_, B> {
    type Item = Result<RomCode, Error<B::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            let mut search = self.search.take()?;
            match self.wire.search_next(&mut search) {
                Ok(None) => return None,
                Ok(Some(rom)) => {
                    self.search = Some(search);
                    if let Err(e) = rom.ensure_correct_crc8::<B::Error>() {
                        report!(self.wire.bus_mut(), "ds2431: search skipped {}: {}", rom, e);
                        continue;
                    }
                    self.remaining -= 1;
                    return Some(Ok(rom));
                }
                Err(e) => {
                    report!(self.wire.bus_mut(), "ds2431: search failed: {}", e);
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

impl<B: Bus> Ds2431<B> {
    /// Enumerates up to `max_devices` codes, capped by
    /// [`Config::search_limit`](crate::Config::search_limit).
    ///
    /// An empty bus yields nothing.
    pub fn search(&mut self, max_devices: usize) -> Result<RomSearch<'_, B>, Error<B::Error>> {
        self.ensure_initialized()?;
        Ok(RomSearch {
            search: Some(DeviceSearch::default()),
            remaining: max_devices.min(self.config.search_limit),
            wire: &mut self.wire,
        })
    }

    /// Fills `roms` from the front and returns how many were found.
    pub fn search_into(&mut self, roms: &mut [RomCode]) -> Result<usize, Error<B::Error>> {
        let limit = roms.len();
        let mut count = 0;
        for (slot, rom) in roms.iter_mut().zip(self.search(limit)?) {
            *slot = rom?;
            count += 1;
        }
        Ok(count)
    }
}
