//! PAD (Programme-Associated Data) decoding: F-PAD/X-PAD framing, Content
//! Indicator routing, and the Dynamic Label / MOT slideshow decoders it
//! feeds.

mod data_group;
mod dgli;
mod dl;
mod mot_subfield;

pub use data_group::DataGroup;
pub use dgli::DgliDecoder;
pub use dl::{dl_plus_content_type_name, DlLabel, DlPlusObject, DynamicLabelDecoder};
pub use mot_subfield::MotSubfieldDecoder;

use crate::mot::{MotFile, MotManager, MotManagerObserver, CONTENT_SUB_TYPE_JFIF, CONTENT_SUB_TYPE_PNG, CONTENT_TYPE_IMAGE};

/// Content Indicator length table, indexed by the 3-bit length field.
pub const XPAD_CI_LENS: [usize; 8] = [4, 6, 8, 12, 16, 24, 32, 48];

/// One X-PAD Content Indicator: a data subfield's type and byte length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XpadCi {
    pub len: usize,
    pub ci_type: Option<u8>,
}

impl XpadCi {
    pub fn reset(&mut self) {
        *self = XpadCi::default();
    }

    fn from_raw(ci_raw: u8) -> Self {
        let ci_type = ci_raw & 0x1F;
        let len = XPAD_CI_LENS[((ci_raw & 0xE0) >> 5) as usize];
        XpadCi {
            len,
            ci_type: if ci_type == 0 { None } else { Some(ci_type) },
        }
    }
}

/// Receives decoded PAD content: the current Dynamic Label, completed
/// slideshow images, and length-policy violations.
pub trait PadDecoderObserver {
    fn pad_change_dynamic_label(&mut self, _label: &DlLabel) {}
    fn pad_change_slide(&mut self, _file: &MotFile) {}
    fn pad_length_error(&mut self, _announced_len: usize, _available_len: usize) {}
}

#[derive(Default)]
struct MotCollector {
    file: Option<MotFile>,
}

impl MotManagerObserver for MotCollector {
    fn mot_file_completed(&mut self, file: &MotFile) {
        self.file = Some(file.clone());
    }
}

/// Top-level PAD decoder: splits F-PAD/X-PAD, builds the Content Indicator
/// list for the current frame, and routes each Data Subfield to the DGLI,
/// Dynamic Label, or MOT decoder.
pub struct PadDecoder<O: PadDecoderObserver> {
    observer: O,
    /// When set, X-PAD whose announced length falls short of the available
    /// length is processed anyway instead of discarded (see ETSI TS 102 563
    /// §5.4.3); also tolerates an omitted CI list on a frame with no X-PAD.
    loose: bool,

    mot_app_type: Option<u8>,
    last_xpad_ci: XpadCi,

    dl_decoder: DynamicLabelDecoder,
    dgli_decoder: DgliDecoder,
    mot_decoder: MotSubfieldDecoder,
    mot_manager: MotManager<MotCollector>,
}

impl<O: PadDecoderObserver> PadDecoder<O> {
    pub fn new(observer: O, loose: bool) -> Self {
        PadDecoder {
            observer,
            loose,
            mot_app_type: None,
            last_xpad_ci: XpadCi::default(),
            dl_decoder: DynamicLabelDecoder::default(),
            dgli_decoder: DgliDecoder::new(),
            mot_decoder: MotSubfieldDecoder::new(),
            mot_manager: MotManager::new(MotCollector::default()),
        }
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn reset(&mut self) {
        self.mot_app_type = None;
        self.last_xpad_ci.reset();
        self.dl_decoder = DynamicLabelDecoder::default();
        self.dgli_decoder = DgliDecoder::new();
        self.mot_decoder = MotSubfieldDecoder::new();
        self.mot_manager.reset();
    }

    /// Sets the X-PAD Content Indicator type (0-31) carrying the MOT
    /// slideshow for the currently selected service component, derived from
    /// its FIG 0/13 user application data. `None` disables MOT handling.
    pub fn set_mot_app_type(&mut self, mot_app_type: Option<u8>) {
        self.mot_app_type = mot_app_type;
    }

    /// Processes one frame/AU's F-PAD (2 bytes) and X-PAD (reversed byte
    /// order on the wire; `xpad_data` must already be in transmission
    /// order). `exact_xpad_len` marks sources (DAB+ superframes) where the
    /// X-PAD length is known exactly, enabling the length mismatch check.
    pub fn process(&mut self, xpad_data: &[u8], exact_xpad_len: bool, fpad_data: [u8; 2]) {
        // undo reversed byte order + trim long MP2 frames
        let used_len = xpad_data.len();
        let mut xpad: Vec<u8> = xpad_data.iter().rev().cloned().collect();
        xpad.truncate(used_len);

        let fpad_type = fpad_data[0] >> 6;
        let xpad_ind = (fpad_data[0] & 0x30) >> 4;
        let ci_flag = fpad_data[1] & 0x02 != 0;

        let prev_xpad_ci = self.last_xpad_ci;
        self.last_xpad_ci.reset();

        let mut xpad_cis: Vec<XpadCi> = Vec::new();
        let mut xpad_cis_len: Option<usize> = None;

        if fpad_type == 0b00 {
            if ci_flag {
                match xpad_ind {
                    0b01 => {
                        // short X-PAD: single CI, implicit length 4
                        if xpad.is_empty() {
                            return;
                        }
                        let ci_type = xpad[0] & 0x1F;
                        if ci_type != 0 {
                            xpad_cis_len = Some(1);
                            xpad_cis.push(XpadCi {
                                len: 3,
                                ci_type: Some(ci_type),
                            });
                        }
                    }
                    0b10 => {
                        // variable size X-PAD: up to 4 CIs, end marker 0x00
                        let mut len = 0usize;
                        for i in 0..4 {
                            if xpad.len() < i + 1 {
                                return;
                            }
                            let ci_raw = xpad[i];
                            len += 1;
                            if ci_raw & 0x1F == 0x00 {
                                break;
                            }
                            xpad_cis.push(XpadCi::from_raw(ci_raw));
                        }
                        xpad_cis_len = Some(len);
                    }
                    _ => {}
                }
            } else if matches!(xpad_ind, 0b01 | 0b10) {
                // CI list omitted: continue the previous frame's last CI
                if prev_xpad_ci.ci_type.is_some() {
                    xpad_cis_len = Some(0);
                    xpad_cis.push(prev_xpad_ci);
                }
            }
        }

        if xpad_cis.is_empty() {
            // The CI list may legitimately be omitted if the last subfield of
            // the previous frame/AU's X-PAD is continued. Some encoders
            // wrongly omit it whenever the previous frame simply had no
            // X-PAD at all; `loose` keeps the pending CI alive for those.
            if self.loose {
                self.last_xpad_ci = prev_xpad_ci;
            }
            return;
        }
        let xpad_cis_len = xpad_cis_len.unwrap_or(0);

        let announced_xpad_len: usize =
            xpad_cis_len + xpad_cis.iter().map(|ci| ci.len).sum::<usize>();

        if announced_xpad_len > xpad.len() {
            return;
        }
        if exact_xpad_len && !self.loose && announced_xpad_len < xpad.len() {
            self.observer.pad_length_error(announced_xpad_len, xpad.len());
            return;
        }

        let mut xpad_offset = xpad_cis_len;
        let mut xpad_ci_type_continued: Option<u8> = None;

        for xpad_ci in &xpad_cis {
            let dgli_len = self.dgli_decoder.take_len();
            let subfield = &xpad[xpad_offset..xpad_offset + xpad_ci.len];

            match xpad_ci.ci_type {
                Some(1) => {
                    // Data Group Length Indicator
                    self.dgli_decoder.process_data_subfield(ci_flag, subfield);
                    xpad_ci_type_continued = Some(1);
                }
                Some(t @ (2 | 3)) => {
                    // Dynamic Label segment: start (2) or continuation (3)
                    if self.dl_decoder.process_data_subfield(t == 2, subfield) {
                        self.observer.pad_change_dynamic_label(self.dl_decoder.label());
                    }
                    xpad_ci_type_continued = Some(3);
                }
                Some(t) => {
                    if let Some(mot_app_type) = self.mot_app_type {
                        if t == mot_app_type || t == mot_app_type + 1 {
                            let start = t == mot_app_type;
                            if start {
                                self.mot_decoder.set_len(dgli_len);
                            }
                            if self.mot_decoder.process_data_subfield(start, subfield) {
                                let dg = self.mot_decoder.take_data_group();
                                if self.mot_manager.handle_data_group(&dg) {
                                    if let Some(file) = self.mot_manager.observer_mut().file.take() {
                                        self.handle_mot_file(&file);
                                    }
                                }
                            }
                            xpad_ci_type_continued = Some(mot_app_type + 1);
                        }
                    }
                }
                None => {}
            }

            xpad_offset += xpad_ci.len;
        }

        self.last_xpad_ci = XpadCi {
            len: xpad_offset,
            ci_type: xpad_ci_type_continued,
        };
    }

    fn handle_mot_file(&mut self, file: &MotFile) {
        let show_slide = file.content_type == CONTENT_TYPE_IMAGE
            && matches!(file.content_sub_type, CONTENT_SUB_TYPE_JFIF | CONTENT_SUB_TYPE_PNG);
        if show_slide {
            self.observer.pad_change_slide(file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        labels: Vec<String>,
        length_errors: Vec<(usize, usize)>,
    }

    impl PadDecoderObserver for Recorder {
        fn pad_change_dynamic_label(&mut self, label: &DlLabel) {
            self.labels.push(label.text());
        }
        fn pad_length_error(&mut self, announced_len: usize, available_len: usize) {
            self.length_errors.push((announced_len, available_len));
        }
    }

    #[test]
    fn xpad_ci_from_raw_decodes_length_and_type() {
        let ci = XpadCi::from_raw(0b001_00010); // len index 1 -> 6, type 2
        assert_eq!(ci.len, 6);
        assert_eq!(ci.ci_type, Some(2));
    }

    #[test]
    fn end_marker_ci_type_is_none() {
        let ci = XpadCi::from_raw(0x00);
        assert_eq!(ci.ci_type, None);
    }

    #[test]
    fn no_ci_list_and_no_previous_ci_is_ignored() {
        let mut pad = PadDecoder::new(Recorder::default(), false);
        pad.process(&[], false, [0x00, 0x00]);
        assert!(pad.observer.labels.is_empty());
    }
}
