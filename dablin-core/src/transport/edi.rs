//! EDI (Encoder/Distribution Interface): AF packets carrying a DETI payload,
//! and the `fio_` file-IO wrapper some captures prepend around AF packets.
//!
//! Only AF (unprotected) packets are decoded, per spec; a PF ("protected
//! frame") sync is never registered, so a PF stream is never framed at all
//! rather than misdecoded - matching the reference implementation, whose
//! `EDISource` only recognises "AF" and "fio_" as sync magics.

use crate::crc::CCITT;
use crate::error::{Error, Result};

use super::eti::EtiStream;
use super::{FrameCheck, Framer, SyncMagic};

const SYNC_AF: [u8; 2] = *b"AF";
const SYNC_FIO: [u8; 4] = *b"fio_";

static EDI_SYNC_MAGICS: [SyncMagic; 2] = [
    SyncMagic { offset: 0, bytes: &SYNC_AF, name: "AF" },
    SyncMagic { offset: 0, bytes: &SYNC_FIO, name: "fio_" },
];

/// Two-phase framer: an 8-byte prefix reveals `LEN` (payload length, in
/// bytes for an AF packet or in bits for a `fio_` wrapper); the buffer is
/// then resized to the full packet and refilled.
#[derive(Debug, Default)]
pub struct EdiFramer;

impl Framer for EdiFramer {
    fn sync_magics(&self) -> &'static [SyncMagic] {
        &EDI_SYNC_MAGICS
    }

    fn initial_frame_size(&self) -> usize {
        8
    }

    fn check_frame_completed(&mut self, buf: &[u8], sync_name: &'static str) -> FrameCheck {
        if buf.len() > 8 {
            return FrameCheck::Complete;
        }
        if sync_name == "AF" {
            let len = u32::from_be_bytes([buf[2], buf[3], buf[4], buf[5]]) as usize;
            FrameCheck::Incomplete { new_size: 10 + len + 2 }
        } else {
            let len_bits = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;
            FrameCheck::Incomplete { new_size: 4 + 4 + len_bits / 8 }
        }
    }
}

/// One DETI payload decoded out of an AF packet's `deti` TAG item: FIC
/// bytes (if `FICF` was set) plus every `est<n>` sub-channel stream found in
/// the same packet.
#[derive(Debug, Clone, Default)]
pub struct EdiFrame {
    pub fic: Vec<u8>,
    pub streams: Vec<EtiStream>,
}

struct TagItem<'a> {
    name: [u8; 4],
    value: &'a [u8],
}

fn iter_tag_items(payload: &[u8]) -> impl Iterator<Item = TagItem<'_>> {
    let mut offset = 0usize;
    std::iter::from_fn(move || {
        if payload.len() < offset + 8 {
            return None;
        }
        let name = [payload[offset], payload[offset + 1], payload[offset + 2], payload[offset + 3]];
        let len_bits = u32::from_be_bytes([
            payload[offset + 4],
            payload[offset + 5],
            payload[offset + 6],
            payload[offset + 7],
        ]) as usize;
        let len_bytes = (len_bits + 7) / 8;
        let value_start = offset + 8;
        if payload.len() < value_start + len_bytes {
            return None;
        }
        let value = &payload[value_start..value_start + len_bytes];
        offset = value_start + len_bytes;
        Some(TagItem { name, value })
    })
}

/// Decodes one complete AF packet (as framed by [`EdiFramer`]): validates
/// `MAJ`/`MIN`/`PT`/`CF` and the trailing CRC-16-CCITT, then walks its TAG
/// items for `deti` (FIC) and `est<n>` (sub-channel, filtered to
/// `selected_subchid`) payloads.
pub fn decode_af_packet(buf: &[u8], selected_subchid: Option<u8>) -> Result<EdiFrame> {
    if buf.len() < 10 {
        return Err(Error::ShortFrame);
    }
    if &buf[0..2] != b"AF" {
        return Err(Error::UnsupportedAfHeader);
    }
    let len = u32::from_be_bytes([buf[2], buf[3], buf[4], buf[5]]) as usize;
    if buf.len() != 10 + len + 2 {
        return Err(Error::ShortFrame);
    }

    let cf = buf[8] & 0x80 != 0;
    let maj = (buf[8] & 0x70) >> 4;
    let min = buf[8] & 0x0F;
    let pt = buf[9];
    if !cf || maj != 1 || min != 0 || pt != b'T' {
        return Err(Error::UnsupportedAfHeader);
    }

    let crc_stored = u16::from_be_bytes([buf[10 + len], buf[10 + len + 1]]);
    let crc_calced = CCITT.calc(&buf[..10 + len]);
    if crc_stored != crc_calced {
        return Err(Error::BodyCrcMismatch);
    }

    let payload = &buf[10..10 + len];
    let mut frame = EdiFrame::default();

    for item in iter_tag_items(payload) {
        match item.name {
            [b'*', b'p', b't', b'r'] | [b'*', b'd', b'm', b'y'] => {}
            [b'd', b'e', b't', b'i'] => decode_deti(item.value, &mut frame)?,
            [b'e', b's', b't', n] if (1..=64).contains(&n) => {
                decode_est(item.value, selected_subchid, &mut frame)?
            }
            [b'i', b'n', b'f', b'o'] => {
                log::info!("EDI info TAG item: {}", String::from_utf8_lossy(item.value));
            }
            [b'n', b'a', b's', b'c'] | [b'f', b'r', b'p', b'd'] | [b't', b'i', b'm', b'e'] => {}
            other => log::debug!(
                "ignored unsupported EDI TAG item '{}'",
                String::from_utf8_lossy(&other)
            ),
        }
    }

    Ok(frame)
}

/// Decodes a `fio_` file-IO wrapper: finds the `afpf` TAG item (an
/// encapsulated AF packet) and decodes it; other TAG items are ignored.
pub fn decode_fio_packet(buf: &[u8], selected_subchid: Option<u8>) -> Result<Option<EdiFrame>> {
    if buf.len() < 8 || &buf[0..4] != b"fio_" {
        return Err(Error::UnsupportedAfHeader);
    }
    let len_bits = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;
    let len_bytes = len_bits / 8;
    if buf.len() < 8 + len_bytes {
        return Err(Error::ShortFrame);
    }

    let payload = &buf[8..8 + len_bytes];
    for item in iter_tag_items(payload) {
        if &item.name == b"afpf" {
            return Ok(Some(decode_af_packet(item.value, selected_subchid)?));
        }
    }
    Ok(None)
}

/// Dispatches on the sync name a [`super::FrameAssembler`] reported.
pub fn decode_frame(buf: &[u8], sync_name: &str, selected_subchid: Option<u8>) -> Result<Option<EdiFrame>> {
    match sync_name {
        "AF" => decode_af_packet(buf, selected_subchid).map(Some),
        "fio_" => decode_fio_packet(buf, selected_subchid),
        _ => Err(Error::UnsupportedAfHeader),
    }
}

fn decode_deti(tag_value: &[u8], frame: &mut EdiFrame) -> Result<()> {
    if tag_value.len() < 6 {
        return Err(Error::ShortFrame);
    }
    let atstf = tag_value[0] & 0x80 != 0;
    let ficf = tag_value[0] & 0x40 != 0;

    if tag_value[2] != 0xFF {
        return Err(Error::UnsupportedAfHeader);
    }

    let mid = tag_value[3] >> 6;
    let fic_len = if ficf {
        if mid == 3 {
            128
        } else {
            96
        }
    } else {
        0
    };

    let expected_len = 2 + 4 + if atstf { 8 } else { 0 } + fic_len;
    if tag_value.len() < expected_len {
        return Err(Error::ShortFrame);
    }

    if fic_len > 0 {
        let fic_start = 6 + if atstf { 8 } else { 0 };
        frame.fic = tag_value[fic_start..fic_start + fic_len].to_vec();
    }
    Ok(())
}

fn decode_est(tag_value: &[u8], selected_subchid: Option<u8>, frame: &mut EdiFrame) -> Result<()> {
    if tag_value.len() < 3 {
        return Err(Error::ShortFrame);
    }
    let subchid = tag_value[0] >> 2;
    if selected_subchid != Some(subchid) {
        return Ok(());
    }
    frame.streams.push(EtiStream { subchid, data: tag_value[3..].to_vec() });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_af_packet(deti_value: &[u8], est_items: &[(u8, &[u8])]) -> Vec<u8> {
        let mut payload = Vec::new();

        payload.extend_from_slice(b"deti");
        payload.extend_from_slice(&((deti_value.len() * 8) as u32).to_be_bytes());
        payload.extend_from_slice(deti_value);

        for (subchid, data) in est_items {
            let mut value = vec![subchid << 2];
            value.push(0);
            value.push(0);
            value.extend_from_slice(data);
            payload.extend_from_slice(&[b'e', b's', b't', 1]);
            payload.extend_from_slice(&((value.len() * 8) as u32).to_be_bytes());
            payload.extend_from_slice(&value);
        }

        let len = payload.len() as u32;
        let mut packet = Vec::new();
        packet.extend_from_slice(b"AF");
        packet.extend_from_slice(&len.to_be_bytes());
        packet.extend_from_slice(&[0, 0]); // SEQ, ignored by the decoder
        packet.push(0x80 | (1 << 4)); // CF=1, MAJ=1, MIN=0
        packet.push(b'T');
        packet.extend_from_slice(&payload);

        let crc = CCITT.calc(&packet);
        packet.extend_from_slice(&crc.to_be_bytes());
        packet
    }

    #[test]
    fn decodes_fic_from_deti_tag() {
        // FICF=1, mid=3 (FIC length 128 bytes); flags byte, reserved,
        // STAT=0xFF, MID<<6.
        let mut deti_value = vec![0x40, 0x00, 0xFF, 0b11_000000, 0x00, 0x00];
        deti_value.extend(vec![0xAAu8; 128]);

        let packet = build_af_packet(&deti_value, &[]);
        let frame = decode_af_packet(&packet, None).unwrap();
        assert_eq!(frame.fic.len(), 128);
        assert!(frame.fic.iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn rejects_bad_crc() {
        let deti_value = vec![0x00, 0x00, 0xFF, 0x00, 0, 0, 0, 0];
        let mut packet = build_af_packet(&deti_value, &[]);
        let last = packet.len() - 1;
        packet[last] ^= 0xFF;
        assert!(matches!(decode_af_packet(&packet, None), Err(Error::BodyCrcMismatch)));
    }

    #[test]
    fn rejects_wrong_maj() {
        let deti_value = vec![0x00, 0x00, 0xFF, 0x00, 0, 0, 0, 0];
        let mut packet = build_af_packet(&deti_value, &[]);
        packet[8] = 0x80; // MAJ=0
        assert!(matches!(decode_af_packet(&packet, None), Err(Error::UnsupportedAfHeader)));
    }

    #[test]
    fn est_stream_filtered_by_selected_subchid() {
        let deti_value = vec![0x00, 0x00, 0xFF, 0x00, 0, 0, 0, 0];
        let packet = build_af_packet(&deti_value, &[(5, &[0x11, 0x22])]);
        let frame = decode_af_packet(&packet, Some(5)).unwrap();
        assert_eq!(frame.streams.len(), 1);
        assert_eq!(frame.streams[0].data, vec![0x11, 0x22]);

        let frame_other = decode_af_packet(&packet, Some(6)).unwrap();
        assert!(frame_other.streams.is_empty());
    }
}
