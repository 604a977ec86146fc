//! Normalised FIC catalog types: ensemble, service, sub-channel, and the
//! denormalised `ListedService` projection handed to consumers.

use std::collections::{BTreeMap, BTreeSet};

/// A FIC label: 16 raw repertoire bytes plus the charset they're encoded in
/// and the short-label selection mask. `None` (no FIG 1/x seen yet) is
/// represented by wrapping this in `Option`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FicLabel {
    pub charset: u8,
    pub label: [u8; 16],
    pub short_label_mask: u16,
}

/// An announcement-switching cluster entry, keyed by cluster ID at the
/// ensemble level (FIG 0/19).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AswCluster {
    pub asw_flags: u16,
    pub subchid: u8,
}

/// Ensemble identity and metadata, built incrementally from FIG 1/0, 0/9 and
/// 0/19. Created on first FIG 1/0; never torn down while the session runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ensemble {
    pub eid: Option<u16>,
    pub label: Option<FicLabel>,
    pub ecc: Option<u8>,
    /// Local Time Offset in half-hour units, signed.
    pub lto: Option<i8>,
    pub inter_table_id: Option<u8>,
    pub asw_clusters: BTreeMap<u8, AswCluster>,
}

impl Ensemble {
    pub fn is_ready(&self) -> bool {
        self.label.is_some()
    }
}

/// A Main Service Channel sub-channel's structural parameters, from FIG 0/1
/// (size/protection/bitrate) and FIG 0/5 (language).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubChannel {
    pub start: u16,
    pub size: u16,
    /// Protection level label, e.g. "UEP 3" or "EEP 2-A".
    pub pl: String,
    pub bitrate: u16,
    pub language: Option<u8>,
}

impl SubChannel {
    pub fn is_none(&self) -> bool {
        self.pl.is_empty() && self.language.is_none()
    }
}

/// The audio selection handle: which sub-channel, and which codec family.
/// `subchid = None` denotes "nothing selected" (silence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioService {
    pub subchid: Option<u8>,
    pub dab_plus: bool,
}

impl AudioService {
    pub const NONE: AudioService = AudioService {
        subchid: None,
        dab_plus: false,
    };

    pub fn new(subchid: u8, dab_plus: bool) -> Self {
        AudioService {
            subchid: Some(subchid),
            dab_plus,
        }
    }

    pub fn is_none(&self) -> bool {
        self.subchid.is_none()
    }
}

pub type UaData = Vec<u8>;

/// Normalised service state, built from FIG 0/2, 0/5, 0/8, 0/13, 0/17, 0/18,
/// 1/1 and 1/4.
#[derive(Debug, Clone, Default)]
pub struct Service {
    pub sid: u16,
    pub pri_comp_subchid: Option<u8>,
    pub label: Option<FicLabel>,
    pub pty_static: Option<u8>,
    pub pty_dynamic: Option<u8>,
    pub asu_flags: u16,
    pub cids: BTreeSet<u8>,

    /// SubChId -> AudioService, from FIG 0/2.
    pub audio_comps: BTreeMap<u8, AudioService>,
    /// SCIdS -> SubChId, from FIG 0/8.
    pub comp_defs: BTreeMap<u8, u8>,
    /// SCIdS -> component label, from FIG 1/4.
    pub comp_labels: BTreeMap<u8, FicLabel>,
    /// SCIdS -> Slideshow user-application data, from FIG 0/13.
    pub comp_sls_uas: BTreeMap<u8, UaData>,
}

impl Service {
    pub fn new(sid: u16) -> Self {
        Service {
            sid,
            ..Default::default()
        }
    }

    pub fn has_pri_comp_subchid(&self) -> bool {
        self.pri_comp_subchid.is_some()
    }

    pub fn has_label(&self) -> bool {
        self.label.is_some()
    }
}

/// A denormalised projection of one service component, rebuilt on every
/// structural change and handed to observers. `scids = None` is the primary
/// component.
#[derive(Debug, Clone)]
pub struct ListedService {
    pub sid: u16,
    pub scids: Option<u8>,
    pub subchannel: Option<SubChannel>,
    pub audio_service: AudioService,
    pub label: FicLabel,
    pub pty_static: Option<u8>,
    pub pty_dynamic: Option<u8>,
    pub sls_app_type: Option<u8>,
    pub asu_flags: u16,
    pub cids: BTreeSet<u8>,
    /// Only used for sorting a presented list; not semantically significant.
    pub pri_comp_subchid: Option<u8>,
    pub multi_comps: bool,
}

impl ListedService {
    pub fn is_primary(&self) -> bool {
        self.scids.is_none()
    }

    pub fn has_sls(&self) -> bool {
        self.sls_app_type.is_some()
    }
}

/// UTC date/time as broken down by FIG 0/10, plus optional milliseconds
/// (present only in long form).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DabDateTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub ms: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_service_equality_uses_both_fields() {
        let a = AudioService::new(5, true);
        let b = AudioService::new(5, false);
        assert_ne!(a, b);
        assert_eq!(a, AudioService::new(5, true));
    }

    #[test]
    fn service_not_ready_without_primary_or_label() {
        let s = Service::new(0x1234);
        assert!(!s.has_pri_comp_subchid());
        assert!(!s.has_label());
    }
}
