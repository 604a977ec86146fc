//! The text-build reference receiver: wires a byte source through transport
//! framing, FIC cataloguing, and the audio pump, logging catalog/PAD events
//! as they occur. Grounded on `dablin.cpp::main`'s single-pass wiring: parse
//! options, open one source, feed frames until EOF or a fatal error.

mod args;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;

use dablin_core::fic::{
    convert_date_time_to_string, convert_label_to_utf8, FicDecoder, FicDecoderObserver,
};
use dablin_core::mot::MotFile;
use dablin_core::pad::{DlLabel, PadDecoderObserver};
use dablin_core::transport::edi::{self, EdiFramer};
use dablin_core::transport::eti::{EtiDecoder, EtiFramer, EtiStream};
use dablin_core::transport::{FrameAssembler, FrameStep, ProgressEstimator};
use dablin_core::types::{DabDateTime, Ensemble, ListedService};

use dablin_playback::audio_output::AudioOutput;
use dablin_playback::cpal_output::CpalOutput;
use dablin_playback::ensemble_player::EnsemblePlayer;
use dablin_playback::pcm_output::PcmOutput;
use dablin_playback::source::live::{self, CaptureBinary, ChannelSelection};
use dablin_playback::source::{PollEvent, SourceReader};

use args::{Args, InitialSelector, TransportFormat};

/// How an encoder's own X-PAD CI-list omission quirk is tolerated; no CLI
/// flag exposes this (the upstream flag set doesn't name one), so it's a
/// fixed default rather than a configuration surface.
const LOOSE_XPAD: bool = true;

/// PAD event logging, shared by every selected service across reselections.
#[derive(Clone, Default)]
struct DablinPadObserver;

impl PadDecoderObserver for DablinPadObserver {
    fn pad_change_dynamic_label(&mut self, label: &DlLabel) {
        log::info!("PAD: dynamic label: \"{}\"", label.text());
        for obj in &label.dl_plus_objects {
            log::info!("PAD: DL Plus tag {}: \"{}\"", obj.content_type, obj.text);
        }
    }

    fn pad_change_slide(&mut self, file: &MotFile) {
        log::info!(
            "PAD: slideshow: {} bytes, content sub-type {:#05X}{}",
            file.data.len(),
            file.content_sub_type,
            file.content_name.as_deref().map(|n| format!(", \"{n}\"")).unwrap_or_default(),
        );
    }

    fn pad_length_error(&mut self, announced_len: usize, available_len: usize) {
        log::warn!(
            "PAD: X-PAD length mismatch: announced {announced_len}, available {available_len}"
        );
    }
}

/// Catalogs the ensemble/service list as the FIC decoder reports it, and
/// performs the one-shot initial-service selection once a matching service
/// appears.
struct DablinFicObserver {
    selector: InitialSelector,
    selected: bool,
    player: Arc<EnsemblePlayer<DablinPadObserver>>,
}

impl DablinFicObserver {
    fn matches(&self, service: &ListedService) -> bool {
        match &self.selector {
            InitialSelector::None => false,
            InitialSelector::Label(label) => convert_label_to_utf8(&service.label) == *label,
            InitialSelector::FirstFound => service.audio_service.subchid.is_some(),
            InitialSelector::Sid { sid, scids } => {
                service.sid == *sid && service.scids == *scids
            }
            InitialSelector::SubchidDab(subchid) => {
                service.audio_service.subchid == Some(*subchid) && !service.audio_service.dab_plus
            }
            InitialSelector::SubchidDabPlus(subchid) => {
                service.audio_service.subchid == Some(*subchid) && service.audio_service.dab_plus
            }
        }
    }
}

impl FicDecoderObserver for DablinFicObserver {
    fn fic_change_ensemble(&mut self, ensemble: &Ensemble) {
        if let Some(label) = &ensemble.label {
            log::info!("ensemble: \"{}\"", convert_label_to_utf8(label));
        }
    }

    fn fic_change_service(&mut self, service: &ListedService) {
        log::info!(
            "service: SId {:#06X}{}: \"{}\"{}",
            service.sid,
            service.scids.map(|s| format!(", SCIdS {s}")).unwrap_or_default(),
            convert_label_to_utf8(&service.label),
            service
                .audio_service
                .subchid
                .map(|s| format!(" (SubChId {s}, {})", if service.audio_service.dab_plus { "DAB+" } else { "DAB" }))
                .unwrap_or_default(),
        );

        if !self.selected && self.matches(service) {
            self.selected = true;
            self.player.set_audio_service(service.audio_service, service.sls_app_type);
            log::info!("selected service SId {:#06X}", service.sid);
        }
    }

    fn fic_change_utc_date_time(&mut self, utc_dt: &DabDateTime) {
        log::info!("UTC date/time: {}", convert_date_time_to_string(utc_dt, 0, true));
    }
}

/// The two wire formats share the assembler/frame-decode shape but not the
/// concrete `Framer`/decode-function types; this holds whichever one the
/// `-f` flag selected.
enum AnyAssembler {
    Eti(FrameAssembler<EtiFramer>, EtiDecoder),
    Edi(FrameAssembler<EdiFramer>),
}

/// One decoded frame's FIC bytes and selected-sub-channel streams, common to
/// both wire formats.
struct DecodedFrame {
    fic: Vec<u8>,
    streams: Vec<EtiStream>,
}

impl AnyAssembler {
    fn new(format: TransportFormat) -> Self {
        match format {
            TransportFormat::Eti => AnyAssembler::Eti(FrameAssembler::new(EtiFramer), EtiDecoder::new()),
            TransportFormat::Edi => AnyAssembler::Edi(FrameAssembler::new(EdiFramer)),
        }
    }

    /// Copies `bytes` into the assembler's buffer (looping across refills as
    /// needed) and invokes `on_frame` for every frame it completes. EDI's
    /// `est<n>` filtering happens inline during decode, so `selected_subchid`
    /// is read fresh before each frame rather than once per chunk - the
    /// selection can change between two frames carried in the same read().
    fn feed(
        &mut self,
        mut bytes: &[u8],
        mut selected_subchid: impl FnMut() -> Option<u8>,
        mut on_frame: impl FnMut(DecodedFrame, Option<u8>),
    ) {
        while !bytes.is_empty() {
            let step = match self {
                AnyAssembler::Eti(asm, _) => {
                    let spare = asm.spare_mut();
                    let n = spare.len().min(bytes.len());
                    spare[..n].copy_from_slice(&bytes[..n]);
                    bytes = &bytes[n..];
                    asm.fill(n)
                }
                AnyAssembler::Edi(asm) => {
                    let spare = asm.spare_mut();
                    let n = spare.len().min(bytes.len());
                    spare[..n].copy_from_slice(&bytes[..n]);
                    bytes = &bytes[n..];
                    asm.fill(n)
                }
            };

            let (sync_name, sync_skipped, frame) = match step {
                FrameStep::NeedMore => continue,
                FrameStep::Frame { sync_name, sync_skipped, frame } => (sync_name, sync_skipped, frame),
            };
            if sync_skipped > 0 {
                log::warn!("resynced after skipping {sync_skipped} bytes");
            }

            let subchid = selected_subchid();
            let decoded = match self {
                AnyAssembler::Eti(_, dec) => match dec.decode_frame(&frame) {
                    Ok(Some(f)) => Some(DecodedFrame { fic: f.fic, streams: f.streams }),
                    Ok(None) => None,
                    Err(e) => {
                        log::warn!("frame dropped: {e}");
                        None
                    }
                },
                AnyAssembler::Edi(_) => match edi::decode_frame(&frame, sync_name, subchid) {
                    Ok(Some(f)) => Some(DecodedFrame { fic: f.fic, streams: f.streams }),
                    Ok(None) => None,
                    Err(e) => {
                        log::warn!("frame dropped: {e}");
                        None
                    }
                },
            };

            if let Some(decoded) = decoded {
                on_frame(decoded, subchid);
            }
        }
    }
}

fn build_source(args: &Args) -> anyhow::Result<(SourceReader, Option<std::process::Child>)> {
    if let Some(binary) = &args.capture_binary {
        let kind: CaptureBinary = args
            .capture_kind
            .context("-d requires -D to name the capture binary's argv convention")?
            .into();
        let channel_arg = args.channel.as_deref().context("-d requires -c <channel>")?;
        let channel = ChannelSelection::parse(channel_arg);
        let gain = channel.resolve_gain(args.gain_mode().map_err(anyhow::Error::msg)?);
        let (child, reader) = live::spawn(binary, kind, &channel, gain)?;
        return Ok((reader, Some(child)));
    }

    match &args.input {
        Some(path) => Ok((SourceReader::open_file(Path::new(path))?, None)),
        None => Ok((SourceReader::stdin(), None)),
    }
}

fn build_audio_output(args: &Args) -> anyhow::Result<Box<dyn AudioOutput + Send>> {
    if args.pcm_stdout {
        Ok(Box::new(PcmOutput::new()))
    } else {
        Ok(Box::new(CpalOutput::new().context("failed to initialise audio device")?))
    }
}

fn run(args: Args) -> anyhow::Result<i32> {
    let selector = match args.initial_selector() {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("dablin: {msg}");
            return Ok(1);
        }
    };
    if let Err(msg) = args.gain_mode() {
        eprintln!("dablin: {msg}");
        return Ok(1);
    }

    let (mut source, mut child) = build_source(&args)?;
    let bytes_total = source.bytes_total();

    let audio_output = build_audio_output(&args)?;
    let player = Arc::new(EnsemblePlayer::new(audio_output, DablinPadObserver, LOOSE_XPAD, !args.no_catch_up));

    let fic_observer = DablinFicObserver { selector, selected: false, player: player.clone() };
    let mut fic_decoder = FicDecoder::new(fic_observer, args.suppress_dynamic_fic);

    let mut assembler = AnyAssembler::new(args.format);
    let mut progress = ProgressEstimator::new();
    let mut last_progress_log = Instant::now();

    loop {
        match source.poll()? {
            PollEvent::Eof => break,
            PollEvent::Idle => continue,
            PollEvent::Data(chunk) => {
                let untouched = args.untouched_stdout;

                assembler.feed(
                    &chunk,
                    || player.current_audio_service().subchid,
                    |decoded, selected_subchid| {
                        player.pace();
                        progress.record_frame(
                            decoded.fic.len() + decoded.streams.iter().map(|s| s.data.len()).sum::<usize>(),
                        );

                        if !decoded.fic.is_empty() {
                            fic_decoder.process(&decoded.fic);
                        }

                        for stream in &decoded.streams {
                            if untouched && Some(stream.subchid) == selected_subchid {
                                if let Err(e) = std::io::stdout().write_all(&stream.data) {
                                    log::error!("untouched stream: error writing to stdout: {e}");
                                }
                            } else {
                                player.feed(stream.subchid, &stream.data);
                            }
                        }
                    },
                );

                if last_progress_log.elapsed() >= Duration::from_millis(500) {
                    last_progress_log = Instant::now();
                    if let Some((fraction, text)) = progress.estimate(bytes_total) {
                        log::debug!("progress: {text} ({:.1}%)", fraction * 100.0);
                    }
                }
            }
        }
    }

    if let Some(child) = child.as_mut() {
        let _ = child.kill();
        let _ = child.wait();
    }

    Ok(0)
}

fn main() {
    let args = match Args::try_parse() {
        Ok(a) => a,
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_env("DABLIN_LOG")
        .init();

    log::debug!("{args:#?}");

    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("dablin: {e:#}");
            std::process::exit(1);
        }
    }
}
