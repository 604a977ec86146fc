//! Reassembles the MOT MSC Data Group carried as X-PAD data subfields, using
//! the length announced by the preceding DGLI.

use super::data_group::{DataGroup, DataGroupState};

/// Upper bound on a single MOT X-PAD data group. The DGLI length field is
/// 14 bits wide (max 16383); X-PAD-carried MOT objects in practice stay well
/// under this.
const MAX_SIZE: usize = 1 << 14;

#[derive(Debug)]
pub struct MotSubfieldDecoder {
    state: DataGroupState,
    len: usize,
}

impl MotSubfieldDecoder {
    pub fn new() -> Self {
        MotSubfieldDecoder {
            state: DataGroupState::new(MAX_SIZE, 0),
            len: 0,
        }
    }

    /// Sets the length of the data group about to start, taken from the
    /// preceding DGLI. Must be called before processing the first (`start`)
    /// subfield of the group.
    pub fn set_len(&mut self, len: usize) {
        self.len = len.min(MAX_SIZE);
    }

    pub fn take_data_group(&self) -> Vec<u8> {
        self.raw()[..self.len].to_vec()
    }
}

impl Default for MotSubfieldDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DataGroup for MotSubfieldDecoder {
    fn raw_mut(&mut self) -> &mut Vec<u8> {
        &mut self.state.raw
    }
    fn raw(&self) -> &[u8] {
        &self.state.raw
    }
    fn size(&self) -> usize {
        self.state.size
    }
    fn set_size(&mut self, size: usize) {
        self.state.size = size;
    }
    fn size_needed(&self) -> usize {
        self.state.size_needed
    }
    fn set_size_needed(&mut self, size: usize) {
        self.state.size_needed = size;
    }
    fn initial_needed_size(&self) -> usize {
        self.len
    }
    fn max_size(&self) -> usize {
        MAX_SIZE
    }

    fn decode(&mut self) -> bool {
        if self.len < 2 {
            return false;
        }
        self.check_crc(self.len - 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::CCITT;

    #[test]
    fn reassembles_group_once_announced_length_reached() {
        let mut dec = MotSubfieldDecoder::new();
        let body = vec![1u8, 2, 3, 4, 5, 6];
        let crc = CCITT.calc(&body);
        let mut dg = body.clone();
        dg.extend_from_slice(&crc.to_be_bytes());

        dec.set_len(dg.len());
        assert!(!dec.process_data_subfield(true, &dg[..4]));
        assert!(dec.process_data_subfield(false, &dg[4..]));
        assert_eq!(dec.take_data_group(), dg);
    }

    #[test]
    fn rejects_bad_crc() {
        let mut dec = MotSubfieldDecoder::new();
        let dg = vec![1u8, 2, 3, 0, 0];
        dec.set_len(dg.len());
        assert!(!dec.process_data_subfield(true, &dg));
    }
}
