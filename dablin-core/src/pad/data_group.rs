//! Generic MSC Data Group reassembly: accumulate Data Subfields up to an
//! announced or discovered size, then hand the complete group to the caller.

use crate::crc::CCITT;

/// Common reassembly behaviour shared by the DGLI, Dynamic Label and MOT
/// data group decoders. A concrete decoder drives [`process_data_subfield`]
/// and implements [`decode`] to interpret the assembled bytes.
pub trait DataGroup {
    /// Raw, growing buffer (sized to the largest group this decoder handles).
    fn raw_mut(&mut self) -> &mut Vec<u8>;
    fn raw(&self) -> &[u8];
    fn size(&self) -> usize;
    fn set_size(&mut self, size: usize);
    fn size_needed(&self) -> usize;
    fn set_size_needed(&mut self, size: usize);
    fn initial_needed_size(&self) -> usize;
    fn max_size(&self) -> usize;

    /// Interprets the fully assembled group. Returning `false` discards it
    /// (e.g. bad CRC); `true` means the caller should take the result.
    fn decode(&mut self) -> bool;

    fn reset(&mut self) {
        self.set_size(0);
        let needed = self.initial_needed_size();
        self.set_size_needed(needed);
    }

    /// Feeds one Data Subfield. `start` marks the first subfield of a group.
    /// Returns `true` once a complete, successfully decoded group is ready.
    fn process_data_subfield(&mut self, start: bool, data: &[u8]) -> bool {
        if start {
            self.reset();
        } else if self.size() == 0 {
            // ignore continuation without a previous start
            return false;
        }

        if self.size() >= self.size_needed() {
            return false;
        }
        if self.size() == self.max_size() {
            return false;
        }

        let copy_len = data.len().min(self.max_size() - self.size());
        let size = self.size();
        self.raw_mut()[size..size + copy_len].copy_from_slice(&data[..copy_len]);
        self.set_size(size + copy_len);

        if self.size() < self.size_needed() {
            return false;
        }

        self.decode()
    }

    /// Raises the size threshold once it becomes known (e.g. from a DGLI),
    /// returning whether the group is already complete at the new threshold.
    fn ensure_size(&mut self, desired_size: usize) -> bool {
        self.set_size_needed(desired_size);
        self.size() >= self.size_needed()
    }

    /// Validates the trailing CRC-16-CCITT over the first `len` bytes.
    fn check_crc(&self, len: usize) -> bool {
        if self.size() < len + 2 {
            return false;
        }
        let raw = self.raw();
        let crc_stored = u16::from_be_bytes([raw[len], raw[len + 1]]);
        let crc_calced = CCITT.calc(&raw[..len]);
        crc_stored == crc_calced
    }
}

/// Plain storage shared by every [`DataGroup`] implementor.
#[derive(Debug, Clone)]
pub struct DataGroupState {
    pub raw: Vec<u8>,
    pub size: usize,
    pub size_needed: usize,
}

impl DataGroupState {
    pub fn new(max_size: usize, initial_needed: usize) -> Self {
        DataGroupState {
            raw: vec![0u8; max_size],
            size: 0,
            size_needed: initial_needed,
        }
    }
}
