//! Integration tests for the protocol-level seed scenarios. Pacing/resync
//! lives in `dablin-playback`'s test suite, since it exercises the audio
//! pump rather than anything in this crate.

use dablin_core::crc::CCITT;
use dablin_core::fic::{FicDecoder, FicDecoderObserver};
use dablin_core::mot::{MotManagerObserver, CONTENT_SUB_TYPE_JFIF, CONTENT_TYPE_IMAGE};
use dablin_core::pad::{PadDecoder, PadDecoderObserver};
use dablin_core::transport::eti::{EtiDecoder, ETI_FRAME_SIZE};
use dablin_core::types::{DabDateTime, Ensemble, ListedService};

fn fib_with_fig(fig_bytes: &[u8]) -> Vec<u8> {
    let mut fib = vec![0xFFu8; 30];
    fib[..fig_bytes.len()].copy_from_slice(fig_bytes);
    let crc = CCITT.calc(&fib);
    fib.extend_from_slice(&crc.to_be_bytes());
    fib
}

#[derive(Default)]
struct Recorder {
    ensembles: Vec<Ensemble>,
    services: Vec<ListedService>,
    discarded: usize,
    utc: Vec<DabDateTime>,
}

impl FicDecoderObserver for Recorder {
    fn fic_change_ensemble(&mut self, ensemble: &Ensemble) {
        self.ensembles.push(ensemble.clone());
    }
    fn fic_change_service(&mut self, service: &ListedService) {
        self.services.push(service.clone());
    }
    fn fic_change_utc_date_time(&mut self, utc_dt: &DabDateTime) {
        self.utc.push(*utc_dt);
    }
    fn fic_discarded_fib(&mut self) {
        self.discarded += 1;
    }
}

/// Scenario 1: FIB CRC validation, FIG 1/0 ensemble label + short label mask.
#[test]
fn scenario_1_fib_crc_and_ensemble_label() {
    let mut fig = vec![(1u8 << 5) | 21, 0x00, 0x10, 0x01];
    fig.extend_from_slice(b"Ensemble Name   ");
    fig.extend_from_slice(&[0xF0, 0x00]);

    let good_fib = fib_with_fig(&fig);
    let mut decoder = FicDecoder::new(Recorder::default(), false);
    decoder.process(&good_fib);

    assert_eq!(decoder.observer_mut().ensembles.len(), 1);
    let ensemble = &decoder.observer_mut().ensembles[0];
    assert_eq!(ensemble.eid, Some(0x1001));
    let label_str = dablin_core::fic::convert_label_to_utf8(ensemble.label.as_ref().unwrap());
    assert_eq!(label_str, "Ensemble Name");
    let short = dablin_core::fic::derive_short_label_utf8(
        &label_str,
        ensemble.label.as_ref().unwrap().short_label_mask,
    );
    assert_eq!(short, "Ense");

    // Corrupting any byte in the first 30 must suppress the event and tick
    // a discard instead.
    let mut bad_fib = good_fib.clone();
    bad_fib[5] ^= 0xFF;
    let mut decoder2 = FicDecoder::new(Recorder::default(), false);
    decoder2.process(&bad_fib);
    assert!(decoder2.observer_mut().ensembles.is_empty());
    assert_eq!(decoder2.observer_mut().discarded, 1);
}

fn build_eti_frame(mid: u8, streams: &[(u8, &[u8])], fic: &[u8]) -> Vec<u8> {
    let nst = streams.len();
    let ficf = !fic.is_empty();
    let fic_words = fic.len() / 4;

    let mst_words: usize = streams.iter().map(|(_, d)| d.len() / 8).sum::<usize>() + fic_words;
    let fl = mst_words + nst + 1;

    let mut frame = vec![0u8; ETI_FRAME_SIZE];
    frame[0] = 0xFF;
    frame[1] = 0x07;
    frame[2] = 0x3A;
    frame[3] = 0xB6;
    frame[4] = 0x00;
    frame[5] = (if ficf { 0x80 } else { 0 }) | (nst as u8 & 0x7F);
    frame[6] = ((mid & 0x03) << 3) | (((fl >> 8) & 0x07) as u8);
    frame[7] = (fl & 0xFF) as u8;

    for (i, (subchid, data)) in streams.iter().enumerate() {
        let stl = data.len() / 8;
        frame[8 + i * 4] = (subchid & 0x3F) << 2;
        frame[8 + i * 4 + 1] = 0;
        frame[8 + i * 4 + 2] = ((stl >> 8) & 0x03) as u8;
        frame[8 + i * 4 + 3] = (stl & 0xFF) as u8;
    }

    let header_crc_data_len = 4 + nst * 4 + 2;
    let header_crc = CCITT.calc(&frame[4..4 + header_crc_data_len]);
    frame[4 + header_crc_data_len..4 + header_crc_data_len + 2]
        .copy_from_slice(&header_crc.to_be_bytes());

    let mut subch_offset = 4 + 4 + nst * 4 + 4;
    if ficf {
        frame[subch_offset..subch_offset + fic.len()].copy_from_slice(fic);
        subch_offset += fic.len();
    }
    for (_, data) in streams {
        frame[subch_offset..subch_offset + data.len()].copy_from_slice(data);
        subch_offset += data.len();
    }

    let mst_crc_data_len = (fl - nst - 1) * 4;
    let mst_crc = CCITT.calc(&frame[subch_offset - mst_crc_data_len..subch_offset]);
    frame[subch_offset..subch_offset + 2].copy_from_slice(&mst_crc.to_be_bytes());

    frame
}

/// Scenario 2: ETI frame slicing delivers exactly the FIC/sub-channel byte
/// counts the header fields announce.
#[test]
fn scenario_2_eti_frame_slicing() {
    let fic = vec![0xAAu8; 96];
    let audio = vec![0x11u8; 84 * 8];
    let frame = build_eti_frame(1, &[(0, &audio)], &fic);

    let mut dec = EtiDecoder::new();
    let decoded = dec.decode_frame(&frame).unwrap().unwrap();
    assert_eq!(decoded.fic.len(), 96);
    assert_eq!(decoded.streams.len(), 1);
    assert_eq!(decoded.streams[0].subchid, 0);
    assert_eq!(decoded.streams[0].data.len(), 672);

    // Changing STL alone changes only the sub-channel slice size.
    let audio2 = vec![0x22u8; 42 * 8];
    let frame2 = build_eti_frame(1, &[(0, &audio2)], &fic);
    let mut dec2 = EtiDecoder::new();
    let decoded2 = dec2.decode_frame(&frame2).unwrap().unwrap();
    assert_eq!(decoded2.fic.len(), 96);
    assert_eq!(decoded2.streams[0].data.len(), 336);
}

fn fig0_header(extension: u8) -> u8 {
    extension & 0x1F
}

/// Scenario 3: MJD -> Gregorian date conversion, short and long form.
#[test]
fn scenario_3_mjd_conversion() {
    // MJD = 51544 (2000-01-01), UTC flag set, 00:00:00.000
    let mut fig = vec![(0u8 << 5) | 7, fig0_header(10)];
    fig.extend_from_slice(&[50, 86, 0x08, 0x00, 0x00, 0x00]);
    let fib = fib_with_fig(&fig);

    let mut decoder = FicDecoder::new(Recorder::default(), false);
    decoder.process(&fib);
    let utc = decoder.observer_mut().utc[0];
    assert_eq!((utc.year, utc.month, utc.day), (2000, 1, 1));
    assert_eq!((utc.hour, utc.minute, utc.second), (0, 0, 0));
    assert_eq!(utc.ms, Some(0));

    // MJD = 59945 (2023-01-01), 23:59:59.999
    let mut fig2 = vec![(0u8 << 5) | 7, fig0_header(10)];
    fig2.extend_from_slice(&[58, 138, 77, 251, 239, 231]);
    let fib2 = fib_with_fig(&fig2);

    let mut decoder2 = FicDecoder::new(Recorder::default(), false);
    decoder2.process(&fib2);
    let utc2 = decoder2.observer_mut().utc[0];
    assert_eq!((utc2.year, utc2.month, utc2.day), (2023, 1, 1));
    assert_eq!((utc2.hour, utc2.minute, utc2.second), (23, 59, 59));
    assert_eq!(utc2.ms, Some(999));
}

#[derive(Default)]
struct PadRecorder {
    labels: Vec<String>,
    slides: Vec<(u8, u16, Vec<u8>)>,
}

impl PadDecoderObserver for PadRecorder {
    fn pad_change_dynamic_label(&mut self, label: &dablin_core::pad::DlLabel) {
        self.labels.push(label.text());
    }
    fn pad_change_slide(&mut self, file: &dablin_core::mot::MotFile) {
        self.slides.push((file.content_type, file.content_sub_type, file.data.clone()));
    }
}

fn dl_segment(toggle: bool, last: bool, seg_num: u8, text: &str) -> Vec<u8> {
    let chars = text.as_bytes();
    let mut seg = vec![
        (if toggle { 0x80 } else { 0 }) | (if last { 0x20 } else { 0 }) | ((chars.len() as u8 - 1) & 0x0F),
        (seg_num << 1) & 0x0F,
    ];
    seg.extend_from_slice(chars);
    let crc = CCITT.calc(&seg);
    seg.extend_from_slice(&crc.to_be_bytes());
    seg
}

/// Wraps one already-CRC'd DL segment as a single variable-size X-PAD CI
/// subfield (type 2, dynamic label) and hands it to `pad`. The CI length
/// field only takes values from `XPAD_CI_LENS`, so the segment's byte
/// length (header + chars + CRC) must land on one of those.
fn feed_dl_segment(pad: &mut PadDecoder<PadRecorder>, seg: &[u8]) {
    let len_idx = dablin_core::pad::XPAD_CI_LENS
        .iter()
        .position(|&l| l == seg.len())
        .unwrap_or_else(|| panic!("segment length {} is not a valid X-PAD CI length", seg.len()));
    let ci_byte = ((len_idx as u8) << 5) | 0x02;
    let mut full_xpad = vec![ci_byte, 0x00];
    full_xpad.extend_from_slice(seg);
    full_xpad.reverse(); // process() undoes the wire byte-reversal
    pad.process(&full_xpad, false, [0x20, 0x02]); // fpad_type=0, xpad_ind=variable, CI present
}

/// Scenario 4: dynamic-label reassembly across a toggle flip, and a
/// corrupted CRC blocking emission without disturbing other state.
#[test]
fn scenario_4_dynamic_label_toggle_and_crc() {
    let mut pad = PadDecoder::new(PadRecorder::default(), false);

    // "Now playing: A" split into chunks whose DG length (4 + chars) is a
    // valid CI length: 4, 8, 2 chars -> 8, 12, 6 bytes.
    let seg0 = dl_segment(false, false, 0, "Now ");
    let seg1 = dl_segment(false, false, 1, "playing:");
    let seg2 = dl_segment(false, true, 2, " A");

    feed_dl_segment(&mut pad, &seg0);
    feed_dl_segment(&mut pad, &seg1);
    feed_dl_segment(&mut pad, &seg2);

    assert_eq!(pad.observer_mut().labels.last().unwrap(), "Now playing: A");

    // A new segment 0 with toggle=1 discards the prior segments.
    let new_seg0 = dl_segment(true, true, 0, "New!");
    feed_dl_segment(&mut pad, &new_seg0);

    assert_eq!(pad.observer_mut().labels.last().unwrap(), "New!");
}

#[derive(Default)]
struct MotCollector {
    completed: Vec<dablin_core::mot::MotFile>,
}
impl MotManagerObserver for MotCollector {
    fn mot_file_completed(&mut self, file: &dablin_core::mot::MotFile) {
        self.completed.push(file.clone());
    }
}

fn session_dg(dg_type: u8, last_seg: bool, seg_number: u16, transport_id: u16, body: &[u8]) -> Vec<u8> {
    let mut dg = Vec::new();
    dg.push(0x70 | dg_type);
    dg.push(0x00);
    let b0 = (if last_seg { 0x80 } else { 0 }) | ((seg_number >> 8) as u8 & 0x7F);
    dg.push(b0);
    dg.push((seg_number & 0xFF) as u8);
    dg.push(0x10 | 0x02);
    dg.push((transport_id >> 8) as u8);
    dg.push((transport_id & 0xFF) as u8);
    dg.push(((body.len() >> 8) as u8) & 0x1F);
    dg.push((body.len() & 0xFF) as u8);
    dg.extend_from_slice(body);
    dg.extend_from_slice(&[0, 0]);
    dg
}

/// Scenario 5: MOT slideshow completion across multiple header/body
/// segments, and a mid-sequence transport-ID change resetting all state.
#[test]
fn scenario_5_mot_slideshow_completion() {
    let content_type_field: u16 = ((CONTENT_TYPE_IMAGE as u16) << 9) | CONTENT_SUB_TYPE_JFIF;
    let header = vec![
        0, 0, 0, 0, 7,
        (content_type_field >> 8) as u8,
        (content_type_field & 0xFF) as u8,
    ];
    let body: Vec<u8> = (0..23u8).collect();

    let mut mgr = dablin_core::mot::MotManager::new(MotCollector::default());

    let h0 = session_dg(3, false, 0, 0x2A, &header[0..4]);
    let h1 = session_dg(3, true, 1, 0x2A, &header[4..]);
    assert!(!mgr.handle_data_group(&h0));
    assert!(!mgr.handle_data_group(&h1));

    let b0 = session_dg(4, false, 0, 0x2A, &body[0..8]);
    let b1 = session_dg(4, false, 1, 0x2A, &body[8..16]);
    let b2 = session_dg(4, true, 2, 0x2A, &body[16..]);
    assert!(!mgr.handle_data_group(&b0));
    assert!(!mgr.handle_data_group(&b1));
    assert!(mgr.handle_data_group(&b2));

    assert_eq!(mgr.observer_mut().completed.len(), 1);
    let file = &mgr.observer_mut().completed[0];
    assert_eq!(file.content_sub_type, CONTENT_SUB_TYPE_JFIF);
    assert_eq!(file.data, body);

    // A transport-ID change mid-sequence resets state; the prior ID's
    // emission must not fire again.
    let mut mgr2 = dablin_core::mot::MotManager::new(MotCollector::default());
    assert!(!mgr2.handle_data_group(&h0));
    let other_h0 = session_dg(3, false, 0, 0x2B, &header[0..4]);
    assert!(!mgr2.handle_data_group(&other_h0));
    assert!(!mgr2.handle_data_group(&h1)); // still transport-ID 0x2A, now stale
    assert!(mgr2.observer_mut().completed.is_empty());
}
