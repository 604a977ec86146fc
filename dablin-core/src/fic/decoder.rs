//! FIC (Fast Information Channel) decoder: FIB framing, FIG 0 and FIG 1
//! extensions, and the ensemble/service/date-time catalog they build up.

use std::collections::BTreeMap;

use crate::charset::{self, trim_label};
use crate::crc::CCITT;
use crate::fic::tables;
use crate::types::{AswCluster, AudioService, DabDateTime, Ensemble, FicLabel, ListedService, Service, SubChannel};

/// Receives catalog updates as the FIC decoder assembles them. All methods
/// have no-op defaults; implement only what you need.
pub trait FicDecoderObserver {
    fn fic_change_ensemble(&mut self, _ensemble: &Ensemble) {}
    fn fic_change_service(&mut self, _service: &ListedService) {}
    fn fic_change_utc_date_time(&mut self, _utc_dt: &DabDateTime) {}
    fn fic_discarded_fib(&mut self) {}
}

struct Fig0Header {
    cn: bool,
    oe: bool,
    pd: bool,
    extension: u8,
}

impl Fig0Header {
    fn new(data: u8) -> Self {
        Fig0Header {
            cn: data & 0x80 != 0,
            oe: data & 0x40 != 0,
            pd: data & 0x20 != 0,
            extension: data & 0x1F,
        }
    }
}

struct Fig1Header {
    charset: u8,
    oe: bool,
    extension: u8,
}

impl Fig1Header {
    fn new(data: u8) -> Self {
        Fig1Header {
            charset: data >> 4,
            oe: data & 0x08 != 0,
            extension: data & 0x07,
        }
    }
}

/// Decodes a FIC byte stream (always a multiple of 32-byte FIBs) into an
/// ensemble/service catalog, reporting changes to an observer as they occur.
pub struct FicDecoder<O: FicDecoderObserver> {
    observer: O,
    disable_dyn_msgs: bool,

    ensemble: Ensemble,
    services: BTreeMap<u16, Service>,
    subchannels: BTreeMap<u8, SubChannel>,
    utc_dt: Option<DabDateTime>,
}

impl<O: FicDecoderObserver> FicDecoder<O> {
    pub fn new(observer: O, disable_dyn_msgs: bool) -> Self {
        FicDecoder {
            observer,
            disable_dyn_msgs,
            ensemble: Ensemble::default(),
            services: BTreeMap::new(),
            subchannels: BTreeMap::new(),
            utc_dt: None,
        }
    }

    pub fn reset(&mut self) {
        self.ensemble = Ensemble::default();
        self.services.clear();
        self.subchannels.clear();
        self.utc_dt = None;
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Processes a run of complete FIBs (32 bytes each, CRC included).
    pub fn process(&mut self, data: &[u8]) {
        if data.len() % 32 != 0 {
            log::warn!(
                "fic: ignoring non-integer FIB count FIC data with {} bytes",
                data.len()
            );
            return;
        }

        for fib in data.chunks_exact(32) {
            self.process_fib(fib);
        }
    }

    fn process_fib(&mut self, data: &[u8]) {
        let crc_stored = u16::from_be_bytes([data[30], data[31]]);
        let crc_calced = CCITT.calc(&data[..30]);
        if crc_stored != crc_calced {
            self.observer.fic_discarded_fib();
            return;
        }

        let mut offset = 0usize;
        while offset < 30 && data[offset] != 0xFF {
            let fig_type = data[offset] >> 5;
            let len = (data[offset] & 0x1F) as usize;
            offset += 1;

            if offset + len > 30 {
                break;
            }

            match fig_type {
                0 => self.process_fig0(&data[offset..offset + len]),
                1 => self.process_fig1(&data[offset..offset + len]),
                _ => {}
            }
            offset += len;
        }
    }

    fn process_fig0(&mut self, data: &[u8]) {
        if data.is_empty() {
            log::warn!("fic: received empty FIG 0");
            return;
        }

        let header = Fig0Header::new(data[0]);
        let body = &data[1..];

        // ignore next config/other ensembles/data services
        if header.cn || header.oe || header.pd {
            return;
        }

        match header.extension {
            1 => self.process_fig0_1(body),
            2 => self.process_fig0_2(body),
            5 => self.process_fig0_5(body),
            8 => self.process_fig0_8(body),
            9 => self.process_fig0_9(body),
            10 => self.process_fig0_10(body),
            13 => self.process_fig0_13(body),
            17 => self.process_fig0_17(body),
            18 => self.process_fig0_18(body),
            19 => self.process_fig0_19(body),
            _ => {}
        }
    }

    fn process_fig0_1(&mut self, data: &[u8]) {
        let mut offset = 0usize;
        while offset + 2 <= data.len() {
            let subchid = data[offset] >> 2;
            let start = ((data[offset] as u16 & 0x03) << 8) | data[offset + 1] as u16;
            offset += 2;

            if offset >= data.len() {
                break;
            }

            let mut sc = SubChannel {
                start,
                ..Default::default()
            };

            let short_long_form = data[offset] & 0x80 != 0;
            if short_long_form {
                if offset + 2 > data.len() {
                    break;
                }
                let option = (data[offset] & 0x70) >> 4;
                let pl = ((data[offset] & 0x0C) >> 2) as usize;
                let subch_size = ((data[offset] as u16 & 0x03) << 8) | data[offset + 1] as u16;

                match option {
                    0b000 => {
                        sc.size = subch_size;
                        sc.pl = format!("EEP {}-A", pl + 1);
                        sc.bitrate = subch_size / tables::EEP_A_SIZE_FACTORS[pl] * 8;
                    }
                    0b001 => {
                        sc.size = subch_size;
                        sc.pl = format!("EEP {}-B", pl + 1);
                        sc.bitrate = subch_size / tables::EEP_B_SIZE_FACTORS[pl] * 32;
                    }
                    _ => {}
                }
                offset += 2;
            } else {
                let table_switch = data[offset] & 0x40 != 0;
                if !table_switch {
                    let table_index = (data[offset] & 0x3F) as usize;
                    sc.size = tables::UEP_SIZES[table_index];
                    sc.pl = format!("UEP {}", tables::UEP_PLS[table_index]);
                    sc.bitrate = tables::UEP_BITRATES[table_index];
                }
                offset += 1;
            }

            if !sc.is_none() {
                let current = self.subchannels.entry(subchid).or_default();
                sc.language = current.language; // ignored for comparison
                if *current != sc {
                    *current = sc.clone();

                    log::info!(
                        "fic: SubChId {:2}: start {:3} CUs, size {:3} CUs, PL {:7} = {:3} kBit/s",
                        subchid,
                        sc.start,
                        sc.size,
                        sc.pl,
                        sc.bitrate
                    );

                    self.update_subchannel(subchid);
                }
            }
        }
    }

    fn process_fig0_2(&mut self, data: &[u8]) {
        let mut offset = 0usize;
        while offset + 3 <= data.len() {
            let sid = u16::from_be_bytes([data[offset], data[offset + 1]]);
            offset += 2;

            let num_comps = (data[offset] & 0x0F) as usize;
            offset += 1;

            for _ in 0..num_comps {
                if offset + 2 > data.len() {
                    break;
                }
                let tmid = data[offset] >> 6;

                if tmid == 0b00 {
                    let ascty = data[offset] & 0x3F;
                    let subchid = data[offset + 1] >> 2;
                    let ps = data[offset + 1] & 0x02 != 0;
                    let ca = data[offset + 1] & 0x01 != 0;

                    if !ca && (ascty == 0 || ascty == 63) {
                        let dab_plus = ascty == 63;
                        let audio_service = AudioService::new(subchid, dab_plus);

                        let service = self.services.entry(sid).or_insert_with(|| Service::new(sid));
                        let is_primary_now = service.pri_comp_subchid == Some(subchid);
                        let current = service.audio_comps.entry(subchid).or_default();
                        if *current != audio_service || ps != is_primary_now {
                            *current = audio_service;
                            if ps {
                                service.pri_comp_subchid = Some(subchid);
                            }

                            log::info!(
                                "fic: SId {:#06X}: audio service (SubChId {:2}, {:4}, {})",
                                sid,
                                subchid,
                                if dab_plus { "DAB+" } else { "DAB" },
                                if ps { "primary" } else { "secondary" }
                            );

                            let service = self.services.get(&sid).unwrap().clone();
                            self.update_service(&service);
                        }
                    }
                }

                offset += 2;
            }
        }
    }

    fn process_fig0_5(&mut self, data: &[u8]) {
        let mut offset = 0usize;
        while offset < data.len() {
            let ls_flag = data[offset] & 0x80 != 0;
            if ls_flag {
                offset += 3;
            } else {
                if offset + 2 > data.len() {
                    break;
                }
                let msc_fic_flag = data[offset] & 0x40 != 0;
                if !msc_fic_flag {
                    let subchid = data[offset] & 0x3F;
                    let language = data[offset + 1];

                    let current = self.subchannels.entry(subchid).or_default();
                    if current.language != Some(language) {
                        current.language = Some(language);

                        log::info!(
                            "fic: SubChId {:2}: language '{}'",
                            subchid,
                            tables::language_name(language)
                        );

                        self.update_subchannel(subchid);
                    }
                }
                offset += 2;
            }
        }
    }

    fn process_fig0_8(&mut self, data: &[u8]) {
        let mut offset = 0usize;
        while offset + 3 <= data.len() {
            let sid = u16::from_be_bytes([data[offset], data[offset + 1]]);
            offset += 2;

            let ext_flag = data[offset] & 0x80 != 0;
            let scids = data[offset] & 0x0F;
            offset += 1;

            if offset >= data.len() {
                break;
            }

            let ls_flag = data[offset] & 0x80 != 0;
            if ls_flag {
                offset += 2;
            } else {
                let msc_fic_flag = data[offset] & 0x40 != 0;
                if !msc_fic_flag {
                    let subchid = data[offset] & 0x3F;

                    let service = self.services.entry(sid).or_insert_with(|| Service::new(sid));
                    let new_comp = !service.comp_defs.contains_key(&scids);
                    let current = service.comp_defs.entry(scids).or_insert(subchid);
                    if new_comp || *current != subchid {
                        *current = subchid;

                        log::info!(
                            "fic: SId {:#06X}, SCIdS {:2}: MSC service component (SubChId {:2})",
                            sid,
                            scids,
                            subchid
                        );

                        let service = self.services.get(&sid).unwrap().clone();
                        self.update_service(&service);
                    }
                }
                offset += 1;
            }

            if ext_flag {
                offset += 1;
            }
        }
    }

    fn process_fig0_9(&mut self, data: &[u8]) {
        if data.len() < 3 {
            return;
        }

        let mut new_ensemble = self.ensemble.clone();
        let lto_sign: i8 = if data[0] & 0x20 != 0 { -1 } else { 1 };
        new_ensemble.lto = Some(lto_sign * (data[0] & 0x1F) as i8);
        new_ensemble.ecc = Some(data[1]);
        new_ensemble.inter_table_id = Some(data[2]);

        if self.ensemble != new_ensemble {
            self.ensemble = new_ensemble;

            log::info!(
                "fic: ECC: {:#04X}, LTO: {}, international table ID: {:#04X} ({})",
                self.ensemble.ecc.unwrap(),
                tables::lto_to_string(self.ensemble.lto.unwrap()),
                self.ensemble.inter_table_id.unwrap(),
                tables::inter_table_name(self.ensemble.inter_table_id.unwrap())
            );

            self.update_ensemble();

            let services: Vec<Service> = self
                .services
                .values()
                .filter(|s| s.pty_static.is_some() || s.pty_dynamic.is_some())
                .cloned()
                .collect();
            for service in &services {
                self.update_service(service);
            }
        }
    }

    fn process_fig0_10(&mut self, data: &[u8]) {
        if data.len() < 4 {
            return;
        }

        let mjd = ((data[0] as i32 & 0x7F) << 10) | ((data[1] as i32) << 2) | (data[2] as i32 >> 6);

        let y0 = ((mjd as f64 - 15078.2) / 365.25).floor();
        let m0 = ((mjd as f64 - 14956.1 - (y0 * 365.25).floor()) / 30.6001).floor();
        let d = mjd as f64 - 14956.0 - (y0 * 365.25).floor() - (m0 * 30.6001).floor();
        let k = if m0 == 14.0 || m0 == 15.0 { 1 } else { 0 };
        let y = y0 as i32 + k;
        let m = m0 as i32 - 1 - k * 12;

        let utc_flag = data[2] & 0x08 != 0;
        let hour = (((data[2] & 0x07) as u32) << 2) | (data[3] as u32 >> 6);
        let minute = data[3] as u32 & 0x3F;

        let (second, ms) = if utc_flag {
            if data.len() < 6 {
                return;
            }
            (data[4] as u32 >> 2, Some((((data[4] & 0x03) as u16) << 8) | data[5] as u16))
        } else {
            (0, None)
        };

        let new_utc_dt = DabDateTime {
            year: y + 1900,
            month: m as u32,
            day: d as u32,
            hour,
            minute,
            second,
            ms,
        };

        if self.utc_dt != Some(new_utc_dt) {
            if self.utc_dt.is_none() {
                log::info!(
                    "fic: UTC date/time: {}",
                    convert_date_time_to_string(&new_utc_dt, 0, true)
                );
            }

            self.utc_dt = Some(new_utc_dt);
            self.observer.fic_change_utc_date_time(&new_utc_dt);
        }
    }

    fn process_fig0_13(&mut self, data: &[u8]) {
        let mut offset = 0usize;
        while offset + 3 <= data.len() {
            let sid = u16::from_be_bytes([data[offset], data[offset + 1]]);
            offset += 2;

            let scids = data[offset] >> 4;
            let num_uas = (data[offset] & 0x0F) as usize;
            offset += 1;

            for _ in 0..num_uas {
                if offset + 2 > data.len() {
                    break;
                }
                let ua_type = ((data[offset] as u16) << 3) | (data[offset + 1] as u16 >> 5);
                let ua_data_length = (data[offset + 1] & 0x1F) as usize;
                offset += 2;

                if ua_type == 0x002 {
                    let service = self.services.entry(sid).or_insert_with(|| Service::new(sid));
                    if !service.comp_sls_uas.contains_key(&scids) {
                        let end = (offset + ua_data_length).min(data.len());
                        let ua_data = data[offset..end].to_vec();

                        log::info!(
                            "fic: SId {:#06X}, SCIdS {:2}: Slideshow ({} bytes UA data)",
                            sid,
                            scids,
                            ua_data.len()
                        );

                        service.comp_sls_uas.insert(scids, ua_data);

                        let service = self.services.get(&sid).unwrap().clone();
                        self.update_service(&service);
                    }
                }

                offset += ua_data_length;
            }
        }
    }

    fn process_fig0_17(&mut self, data: &[u8]) {
        let mut offset = 0usize;
        while offset + 3 <= data.len() {
            let sid = u16::from_be_bytes([data[offset], data[offset + 1]]);
            let sd = data[offset + 2] & 0x80 != 0;
            let l_flag = data[offset + 2] & 0x20 != 0;
            let cc_flag = data[offset + 2] & 0x10 != 0;
            offset += 3;

            if l_flag {
                offset += 1;
            }
            if offset >= data.len() {
                break;
            }

            let pty = data[offset] & 0x1F;
            offset += 1;

            if cc_flag {
                offset += 1;
            }

            let service = self.services.entry(sid).or_insert_with(|| Service::new(sid));
            let current = if sd {
                &mut service.pty_dynamic
            } else {
                &mut service.pty_static
            };

            if *current != Some(pty) {
                let show_msg = !(self.disable_dyn_msgs && sd && current.is_some());
                *current = Some(pty);

                if show_msg {
                    // assumes international table ID 0x01 here, as the original does
                    log::info!(
                        "fic: SId {:#06X}: programme type ({}): '{}'",
                        sid,
                        if sd { "dynamic" } else { "static" },
                        tables::pty_name(pty, 0x01)
                    );
                }

                let service = self.services.get(&sid).unwrap().clone();
                self.update_service(&service);
            }
        }
    }

    fn process_fig0_18(&mut self, data: &[u8]) {
        let mut offset = 0usize;
        while offset + 5 <= data.len() {
            let sid = u16::from_be_bytes([data[offset], data[offset + 1]]);
            let asu_flags = u16::from_be_bytes([data[offset + 2], data[offset + 3]]);
            let number_of_clusters = (data[offset + 4] & 0x1F) as usize;
            offset += 5;

            let mut cids = std::collections::BTreeSet::new();
            for _ in 0..number_of_clusters {
                if offset >= data.len() {
                    break;
                }
                cids.insert(data[offset]);
                offset += 1;
            }

            let service = self.services.entry(sid).or_insert_with(|| Service::new(sid));
            if service.asu_flags != asu_flags || service.cids != cids {
                service.asu_flags = asu_flags;
                service.cids = cids.clone();

                let cids_str = cids
                    .iter()
                    .map(|cid| format!("{cid:#04X}"))
                    .collect::<Vec<_>>()
                    .join("/");

                log::info!(
                    "fic: SId {:#06X}: ASu flags {:#06X}, cluster(s) {}",
                    sid,
                    asu_flags,
                    cids_str
                );

                let service = self.services.get(&sid).unwrap().clone();
                self.update_service(&service);
            }
        }
    }

    fn process_fig0_19(&mut self, data: &[u8]) {
        let mut offset = 0usize;
        while offset + 4 <= data.len() {
            let cid = data[offset];
            let asw_flags = u16::from_be_bytes([data[offset + 1], data[offset + 2]]);
            let region_flag = data[offset + 3] & 0x40 != 0;
            let subchid = data[offset + 3] & 0x3F;
            offset += if region_flag { 5 } else { 4 };

            let ac = AswCluster { asw_flags, subchid };
            let current = self.ensemble.asw_clusters.entry(cid).or_insert(AswCluster {
                asw_flags: 0,
                subchid: 0,
            });
            if *current != ac {
                *current = ac;

                if !self.disable_dyn_msgs {
                    log::info!(
                        "fic: ASw cluster {:#04X}: flags {:#06X}, SubChId {:2}",
                        cid,
                        asw_flags,
                        subchid
                    );
                }

                self.update_ensemble();

                let services: Vec<Service> = self
                    .services
                    .values()
                    .filter(|s| s.cids.contains(&cid))
                    .cloned()
                    .collect();
                for service in &services {
                    self.update_service(service);
                }
            }
        }
    }

    fn process_fig1(&mut self, data: &[u8]) {
        if data.is_empty() {
            log::warn!("fic: received empty FIG 1");
            return;
        }

        let header = Fig1Header::new(data[0]);
        let body = &data[1..];

        if header.oe {
            return;
        }

        let len_id = match header.extension {
            0 | 1 => 2,
            4 => {
                if body.is_empty() || body[0] & 0x80 != 0 {
                    return;
                }
                3
            }
            _ => return,
        };

        let len_calced = len_id + 16 + 2;
        if body.len() != len_calced {
            log::warn!(
                "fic: received FIG 1/{} having {} field bytes (expected: {})",
                header.extension,
                body.len(),
                len_calced
            );
            return;
        }

        let mut label_bytes = [0u8; 16];
        label_bytes.copy_from_slice(&body[len_id..len_id + 16]);
        let label = FicLabel {
            charset: header.charset,
            label: label_bytes,
            short_label_mask: u16::from_be_bytes([body[len_id + 16], body[len_id + 17]]),
        };

        match header.extension {
            0 => {
                let eid = u16::from_be_bytes([body[0], body[1]]);
                self.process_fig1_0(eid, label);
            }
            1 => {
                let sid = u16::from_be_bytes([body[0], body[1]]);
                self.process_fig1_1(sid, label);
            }
            4 => {
                let scids = body[0] & 0x0F;
                let sid = u16::from_be_bytes([body[1], body[2]]);
                self.process_fig1_4(sid, scids, label);
            }
            _ => {}
        }
    }

    fn process_fig1_0(&mut self, eid: u16, label: FicLabel) {
        if self.ensemble.eid != Some(eid) || self.ensemble.label.as_ref() != Some(&label) {
            self.ensemble.eid = Some(eid);
            self.ensemble.label = Some(label.clone());

            let label_str = convert_label_to_utf8(&label);
            let short_label_str = derive_short_label_utf8(&label_str, label.short_label_mask);
            log::info!(
                "fic: EId {:#06X}: ensemble label '{}' ('{}')",
                eid,
                label_str,
                short_label_str
            );

            self.update_ensemble();
        }
    }

    fn process_fig1_1(&mut self, sid: u16, label: FicLabel) {
        let service = self.services.entry(sid).or_insert_with(|| Service::new(sid));
        if service.label.as_ref() != Some(&label) {
            service.label = Some(label.clone());

            let label_str = convert_label_to_utf8(&label);
            let short_label_str = derive_short_label_utf8(&label_str, label.short_label_mask);
            log::info!(
                "fic: SId {:#06X}: programme service label '{}' ('{}')",
                sid,
                label_str,
                short_label_str
            );

            let service = self.services.get(&sid).unwrap().clone();
            self.update_service(&service);
        }
    }

    fn process_fig1_4(&mut self, sid: u16, scids: u8, label: FicLabel) {
        let service = self.services.entry(sid).or_insert_with(|| Service::new(sid));
        let current = service.comp_labels.get(&scids);
        if current != Some(&label) {
            service.comp_labels.insert(scids, label.clone());

            let label_str = convert_label_to_utf8(&label);
            let short_label_str = derive_short_label_utf8(&label_str, label.short_label_mask);
            log::info!(
                "fic: SId {:#06X}, SCIdS {:2}: service component label '{}' ('{}')",
                sid,
                scids,
                label_str,
                short_label_str
            );

            let service = self.services.get(&sid).unwrap().clone();
            self.update_service(&service);
        }
    }

    fn update_subchannel(&mut self, subchid: u8) {
        let services: Vec<Service> = self
            .services
            .values()
            .filter(|s| s.audio_comps.contains_key(&subchid))
            .cloned()
            .collect();
        for service in &services {
            self.update_service(service);
        }
    }

    fn update_service(&mut self, service: &Service) {
        if !service.has_pri_comp_subchid() || !service.has_label() {
            return;
        }

        let mut multi_comps = false;
        for (&scids, &subchid) in &service.comp_defs {
            if Some(subchid) == service.pri_comp_subchid || !service.audio_comps.contains_key(&subchid) {
                continue;
            }
            self.update_listed_service(service, Some(scids), true);
            multi_comps = true;
        }

        self.update_listed_service(service, None, multi_comps);
    }

    fn update_listed_service(&mut self, service: &Service, scids: Option<u8>, multi_comps: bool) {
        let mut label = service.label.clone().unwrap();
        let pri_comp_subchid = service.pri_comp_subchid;

        let audio_service = match scids {
            None => *service.audio_comps.get(&pri_comp_subchid.unwrap()).unwrap(),
            Some(scids) => {
                let subchid = *service.comp_defs.get(&scids).unwrap();
                if let Some(comp_label) = service.comp_labels.get(&scids) {
                    label = comp_label.clone();
                }
                *service.audio_comps.get(&subchid).unwrap()
            }
        };

        let subchannel = audio_service
            .subchid
            .and_then(|subchid| self.subchannels.get(&subchid).cloned());

        // derive the SCIdS needed for Slideshow lookup (X-PAD only) if not given
        let mut sls_scids = scids;
        if sls_scids.is_none() {
            for (&scid, &subchid) in &service.comp_defs {
                if Some(subchid) == audio_service.subchid {
                    sls_scids = Some(scid);
                    break;
                }
            }
        }
        let sls_app_type = sls_scids
            .and_then(|scids| service.comp_sls_uas.get(&scids))
            .and_then(|ua_data| get_sls_app_type(ua_data));

        let listed = ListedService {
            sid: service.sid,
            scids,
            subchannel,
            audio_service,
            label,
            pty_static: service.pty_static,
            pty_dynamic: service.pty_dynamic,
            sls_app_type,
            asu_flags: service.asu_flags,
            cids: service.cids.clone(),
            pri_comp_subchid,
            multi_comps,
        };

        self.observer.fic_change_service(&listed);
    }

    fn update_ensemble(&mut self) {
        if self.ensemble.label.is_none() {
            return;
        }
        let ensemble = self.ensemble.clone();
        self.observer.fic_change_ensemble(&ensemble);
    }
}

fn get_sls_app_type(ua_data: &[u8]) -> Option<u8> {
    let (ca_flag, xpad_app_type, dg_flag, dscty) = if ua_data.len() >= 2 {
        (
            ua_data[0] & 0x80 != 0,
            ua_data[0] & 0x1F,
            ua_data[1] & 0x80 != 0,
            ua_data[1] & 0x3F,
        )
    } else {
        (false, 12, false, 60)
    };

    if !ca_flag && !dg_flag && dscty == 60 {
        Some(xpad_app_type)
    } else {
        None
    }
}

/// Renders a label's repertoire bytes to UTF-8, trimming trailing spaces.
pub fn convert_label_to_utf8(label: &FicLabel) -> String {
    match charset::convert_text_to_utf8(&label.label, label.charset as u8, false) {
        Ok(converted) => trim_label(&converted.text).to_string(),
        Err(_) => String::new(),
    }
}

/// Picks out the short-label characters a 16-bit mask selects, by codepoint
/// (not byte) index into the already-trimmed long label.
pub fn derive_short_label_utf8(long_label: &str, short_label_mask: u16) -> String {
    long_label
        .chars()
        .enumerate()
        .filter(|(i, _)| short_label_mask & (0x8000 >> i) != 0)
        .map(|(_, c)| c)
        .collect()
}

/// Renders a decoded UTC date/time, optionally shifted by a Local Time
/// Offset (in half-hour units) and with millisecond precision.
pub fn convert_date_time_to_string(utc_dt: &DabDateTime, lto: i8, output_ms: bool) -> String {
    use chrono::{Duration, NaiveDate, Timelike};

    let naive = NaiveDate::from_ymd_opt(utc_dt.year, utc_dt.month, utc_dt.day)
        .and_then(|d| d.and_hms_opt(utc_dt.hour, utc_dt.minute, utc_dt.second));

    let naive = match naive {
        Some(dt) => dt,
        None => return "(invalid date/time)".to_string(),
    };

    let shifted = if lto != 0 {
        naive + Duration::minutes(lto as i64 * 30)
    } else {
        naive
    };

    let mut result = format!(
        "{}, {} - ",
        shifted.format("%Y-%m-%d"),
        shifted.format("%a")
    );

    if let Some(ms) = utc_dt.ms {
        result += &shifted.format("%H:%M:%S").to_string();
        if output_ms {
            result += &format!(".{:03}", ms);
        }
    } else {
        result += &format!("{:02}:{:02}", shifted.hour(), shifted.minute());
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingObserver {
        ensembles: Vec<Ensemble>,
        services: Vec<ListedService>,
        discarded: usize,
    }

    impl FicDecoderObserver for RecordingObserver {
        fn fic_change_ensemble(&mut self, ensemble: &Ensemble) {
            self.ensembles.push(ensemble.clone());
        }
        fn fic_change_service(&mut self, service: &ListedService) {
            self.services.push(service.clone());
        }
        fn fic_discarded_fib(&mut self) {
            self.discarded += 1;
        }
    }

    fn fib_with_fig(fig_bytes: &[u8]) -> Vec<u8> {
        let mut fib = vec![0xFFu8; 30];
        fib[..fig_bytes.len()].copy_from_slice(fig_bytes);
        let crc = CCITT.calc(&fib);
        fib.extend_from_slice(&crc.to_be_bytes());
        fib
    }

    #[test]
    fn bad_crc_is_discarded() {
        let mut fib = vec![0u8; 32];
        fib[30] = 0x00;
        fib[31] = 0x00;
        let mut decoder = FicDecoder::new(RecordingObserver::default(), false);
        decoder.process(&fib);
        assert_eq!(decoder.observer.discarded, 1);
    }

    #[test]
    fn non_multiple_of_32_is_ignored() {
        let mut decoder = FicDecoder::new(RecordingObserver::default(), false);
        decoder.process(&[0u8; 10]);
        assert_eq!(decoder.observer.discarded, 0);
    }

    #[test]
    fn fig1_0_ensemble_label_updates() {
        let mut fig = vec![0x20u8]; // type 1, len 0 placeholder, fixed below
        fig.clear();
        // FIG header byte: type=1 (bits7-5=001), len=21 (2 id + 16 label + 2 mask + 1 header = 21)
        fig.push((1 << 5) | 21);
        fig.push(0x00); // FIG1 header: charset=0, oe=0, ext=0 (ensemble)
        fig.push(0x10); // EId hi
        fig.push(0x01); // EId lo
        fig.extend_from_slice(b"Test Ensemble   "); // 16 bytes label
        fig.extend_from_slice(&[0xFF, 0xFF]); // short label mask: all chars

        let fib = fib_with_fig(&fig);
        let mut decoder = FicDecoder::new(RecordingObserver::default(), false);
        decoder.process(&fib);

        assert_eq!(decoder.observer.ensembles.len(), 1);
        assert_eq!(decoder.observer.ensembles[0].eid, Some(0x1001));
    }

    #[test]
    fn derive_short_label_uses_mask() {
        let short = derive_short_label_utf8("Classic FM", 0xFE00);
        assert_eq!(short, "Classic");
    }

    #[test]
    fn date_time_short_form_renders() {
        let dt = DabDateTime {
            year: 2024,
            month: 1,
            day: 15,
            hour: 13,
            minute: 30,
            second: 0,
            ms: None,
        };
        let s = convert_date_time_to_string(&dt, 0, true);
        assert!(s.contains("13:30"));
    }
}
