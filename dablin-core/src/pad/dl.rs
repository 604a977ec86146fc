//! Dynamic Label (DL) and DL Plus decoding: segment reassembly, remove-label
//! and DL Plus commands, content tagging.

use std::collections::BTreeMap;

use crate::charset;
use crate::pad::data_group::{DataGroup, DataGroupState};

const DL_SEG_MAX_LEN: usize = 16;
const DL_MAX_LEN: usize = 128;
const CRC_LEN: usize = 2;

/// One raw Dynamic Label segment, still keyed by its segment number.
#[derive(Debug, Clone)]
pub struct DlSeg {
    prefix: [u8; 2],
    pub chars: Vec<u8>,
}

impl DlSeg {
    fn new(prefix: [u8; 2], chars: Vec<u8>) -> Self {
        DlSeg { prefix, chars }
    }

    /// Same physical bit, read as the plain Toggle flag for ordinary segments.
    pub fn toggle(&self) -> bool {
        self.prefix[0] & 0x80 != 0
    }

    /// Same bit as [`toggle`](Self::toggle), read as the DL Plus link flag
    /// when the segment carries a DL Plus command.
    pub fn dl_plus_link(&self) -> bool {
        self.toggle()
    }

    pub fn seg_num(&self) -> u8 {
        (self.prefix[1] >> 1) & 0x07
    }

    pub fn last(&self) -> bool {
        self.prefix[0] & 0x20 != 0
    }

    pub fn charset(&self) -> u8 {
        self.prefix[1] >> 4
    }
}

/// One tagged object inside a decoded DL Plus label.
#[derive(Debug, Clone)]
pub struct DlPlusObject {
    pub content_type: u8,
    pub text: String,
}

/// A fully decoded Dynamic Label, with DL Plus tags if present.
#[derive(Debug, Clone, Default)]
pub struct DlLabel {
    pub raw: Vec<u8>,
    pub charset: u8,
    pub dl_plus_item_toggle: bool,
    pub dl_plus_item_running: bool,
    pub dl_plus_objects: Vec<DlPlusObject>,
}

impl DlLabel {
    pub fn text(&self) -> String {
        charset::convert_text_to_utf8(&self.raw, self.charset, false)
            .map(|c| c.text)
            .unwrap_or_default()
    }
}

/// Reassembles up to 8 segments (numbered 0-7) of either the plain label or
/// a DL Plus command, keyed by their toggle/link bit.
#[derive(Default)]
pub struct DlSegReassembler {
    segs: BTreeMap<u8, DlSeg>,
    pub label_raw: Vec<u8>,
}

impl DlSegReassembler {
    pub fn reset(&mut self) {
        self.segs.clear();
        self.label_raw.clear();
    }

    fn toggle(&self) -> Option<bool> {
        self.segs.values().next().map(|s| s.toggle())
    }

    /// Adds a segment, assuming any stale opposite-toggle state has already
    /// been cleared by the caller (see `pad_decoder.cpp:364-368`, which
    /// invalidates the whole segment cache - not just the stream matching
    /// the incoming flag - on a toggle flip).
    pub fn add_segment(&mut self, seg: DlSeg) -> bool {
        if self.segs.contains_key(&seg.seg_num()) {
            return false;
        }
        self.segs.insert(seg.seg_num(), seg);

        self.check_for_complete_label()
    }

    pub fn check_for_complete_label(&mut self) -> bool {
        let mut segs_found = 0u8;
        for i in 0..8u8 {
            let seg = match self.segs.get(&i) {
                Some(seg) => seg,
                None => return false,
            };
            segs_found += 1;
            if seg.last() {
                break;
            }
            if i == 7 {
                return false;
            }
        }

        self.label_raw.clear();
        for i in 0..segs_found {
            if let Some(seg) = self.segs.get(&i) {
                self.label_raw.extend_from_slice(&seg.chars);
            }
        }
        true
    }
}

/// Decodes a stream of Dynamic Label / DL Plus Data Groups into complete
/// labels, tracking the currently visible label across toggles.
pub struct DynamicLabelDecoder {
    state: DataGroupState,
    dl_sr: DlSegReassembler,
    dl_plus_sr: DlSegReassembler,
    label: DlLabel,
}

impl Default for DynamicLabelDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicLabelDecoder {
    pub fn new() -> Self {
        let mut d = DynamicLabelDecoder {
            state: DataGroupState::new(DL_MAX_LEN + CRC_LEN, 2),
            dl_sr: DlSegReassembler::default(),
            dl_plus_sr: DlSegReassembler::default(),
            label: DlLabel::default(),
        };
        d.reset();
        d
    }

    pub fn label(&self) -> &DlLabel {
        &self.label
    }

    fn append_dl_plus(&mut self) {
        let cmd = self.dl_plus_sr.label_raw.clone();
        if cmd.is_empty() || cmd[0] >> 4 != 0b0000 {
            return;
        }

        self.label.dl_plus_item_toggle = cmd[0] & 0x08 != 0;
        self.label.dl_plus_item_running = cmd[0] & 0x04 != 0;
        let nt = (cmd[0] & 0x03) as usize;

        let label_text = self.label.text();
        let label_chars: Vec<char> = label_text.chars().collect();

        self.label.dl_plus_objects.clear();
        for i in 0..=nt {
            let base = 1 + i * 3;
            if base + 2 >= cmd.len() {
                break;
            }
            let content_type = cmd[base] & 0x7F;
            let start_marker = (cmd[base + 1] & 0x7F) as usize;
            let length_marker = (cmd[base + 2] & 0x7F) as usize;

            let text = if content_type != 0 {
                label_chars
                    .iter()
                    .skip(start_marker)
                    .take(length_marker + 1)
                    .collect()
            } else {
                String::new()
            };

            self.label.dl_plus_objects.push(DlPlusObject { content_type, text });
        }
    }
}

impl DataGroup for DynamicLabelDecoder {
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
        2
    }
    fn max_size(&self) -> usize {
        self.state.raw.len()
    }

    fn reset(&mut self) {
        self.state.size = 0;
        self.state.size_needed = self.initial_needed_size();
    }

    fn decode(&mut self) -> bool {
        let command = self.state.raw[0] & 0x10 != 0;

        let mut field_len = 0usize;
        let mut cmd_remove_label = false;
        let mut cmd_dl_plus = false;

        if command {
            match self.state.raw[0] & 0x0F {
                0x01 => cmd_remove_label = true,
                0x02 => {
                    cmd_dl_plus = true;
                    field_len = (self.state.raw[1] & 0x0F) as usize + 1;
                }
                _ => {
                    self.reset();
                    return false;
                }
            }
        } else {
            field_len = (self.state.raw[0] & 0x0F) as usize + 1;
        }

        let real_len = 2 + field_len;
        if !self.ensure_size(real_len + CRC_LEN) {
            return false;
        }

        if !self.check_crc(real_len) {
            self.reset();
            return false;
        }

        if cmd_remove_label {
            self.reset();
            self.label = DlLabel::default();
            return true;
        }

        let mut prefix = [0u8; 2];
        prefix.copy_from_slice(&self.state.raw[0..2]);
        let chars = self.state.raw[2..2 + field_len.min(DL_SEG_MAX_LEN)].to_vec();
        let seg = DlSeg::new(prefix, chars);

        // A toggle/link-bit flip invalidates everything cached so far, for
        // both the plain-label and DL Plus streams (not just the one the
        // incoming segment belongs to) - a stale DL Plus reassembler must
        // not survive a plain DL toggle flip, or vice versa.
        let seg_flag = if cmd_dl_plus { seg.dl_plus_link() } else { seg.toggle() };
        let current_flag = if cmd_dl_plus { self.dl_plus_sr.toggle() } else { self.dl_sr.toggle() };
        if current_flag.is_some_and(|current| current != seg_flag) {
            self.dl_sr.reset();
            self.dl_plus_sr.reset();
        }

        self.reset();

        let completed = if cmd_dl_plus {
            if !self.dl_plus_sr.add_segment(seg) {
                return false;
            }
            if !self.dl_sr.check_for_complete_label() {
                return false;
            }
            true
        } else {
            self.dl_sr.add_segment(seg)
        };

        if !completed {
            return false;
        }

        self.label = DlLabel {
            raw: self.dl_sr.label_raw.clone(),
            charset: self.dl_sr.segs.get(&0).map(|s| s.charset()).unwrap_or(0),
            ..Default::default()
        };

        if self.dl_plus_sr.check_for_complete_label() {
            self.append_dl_plus();
        }

        true
    }
}

/// DL Plus content type names, index = tag value (0-63); values 64+ are
/// reserved.
pub const DL_PLUS_CONTENT_TYPES: [&str; 64] = [
    "DUMMY",
    "ITEM.TITLE",
    "ITEM.ALBUM",
    "ITEM.TRACKNUMBER",
    "ITEM.ARTIST",
    "ITEM.COMPOSITION",
    "ITEM.MOVEMENT",
    "ITEM.CONDUCTOR",
    "ITEM.COMPOSER",
    "ITEM.BAND",
    "ITEM.COMMENT",
    "ITEM.GENRE",
    "INFO.NEWS",
    "INFO.NEWS.LOCAL",
    "INFO.STOCKMARKET",
    "INFO.SPORT",
    "INFO.LOTTERY",
    "INFO.HOROSCOPE",
    "INFO.DAILY_DIVERSION",
    "INFO.HEALTH",
    "INFO.EVENT",
    "INFO.SCENE",
    "INFO.CINEMA",
    "INFO.TV",
    "INFO.DATE_TIME",
    "INFO.WEATHER",
    "INFO.TRAFFIC",
    "INFO.ALARM",
    "INFO.ADVERTISEMENT",
    "INFO.URL",
    "INFO.OTHER",
    "STATIONNAME.SHORT",
    "STATIONNAME.LONG",
    "PROGRAMME.NOW",
    "PROGRAMME.NEXT",
    "PROGRAMME.PART",
    "PROGRAMME.HOST",
    "PROGRAMME.EDITORIAL_STAFF",
    "PROGRAMME.FREQUENCY",
    "PROGRAMME.HOMEPAGE",
    "PROGRAMME.SUBCHANNEL",
    "PHONE.HOTLINE",
    "PHONE.STUDIO",
    "PHONE.OTHER",
    "SMS.STUDIO",
    "SMS.OTHER",
    "EMAIL.HOTLINE",
    "EMAIL.STUDIO",
    "EMAIL.OTHER",
    "MMS.OTHER",
    "CHAT",
    "CHAT.CENTER",
    "VOTE.QUESTION",
    "VOTE.CENTRE",
    "(reserved)",
    "(reserved)",
    "(private class)",
    "(private class)",
    "(private class)",
    "DESCRIPTOR.PLACE",
    "DESCRIPTOR.APPOINTMENT",
    "DESCRIPTOR.IDENTIFIER",
    "DESCRIPTOR.PURCHASE",
    "DESCRIPTOR.GET_DATA",
];

pub fn dl_plus_content_type_name(value: u8) -> &'static str {
    DL_PLUS_CONTENT_TYPES
        .get(value as usize)
        .copied()
        .unwrap_or("(reserved)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::CCITT;

    fn dg_with_crc(mut body: Vec<u8>) -> Vec<u8> {
        let crc = CCITT.calc(&body);
        body.extend_from_slice(&crc.to_be_bytes());
        body
    }

    #[test]
    fn single_segment_label_decodes() {
        // prefix byte0: toggle=0, first=1(0x40), last=1(0x20) => single segment; field_len-1 = 4 (5 chars)
        let byte0 = 0x40 | 0x20 | 0x04;
        // prefix byte1: charset=0, segnum=0
        let byte1 = 0x00;
        let mut body = vec![byte0, byte1];
        body.extend_from_slice(b"Hello");
        let dg = dg_with_crc(body);

        let mut decoder = DynamicLabelDecoder::new();
        assert!(decoder.process_data_subfield(true, &dg));
        assert_eq!(decoder.label().text(), "Hello");
    }

    #[test]
    fn remove_label_clears_text() {
        let byte0 = 0x10 | 0x01; // command=1, code=remove label
        let body = vec![byte0, 0x00];
        let dg = dg_with_crc(body);

        let mut decoder = DynamicLabelDecoder::new();
        assert!(decoder.process_data_subfield(true, &dg));
        assert!(decoder.label().raw.is_empty());
    }

    #[test]
    fn content_type_name_lookup() {
        assert_eq!(dl_plus_content_type_name(1), "ITEM.TITLE");
        assert_eq!(dl_plus_content_type_name(200), "(reserved)");
    }
}
