//! Platform audio-device sink, backed by `cpal` and a shared byte ring
//! buffer (`dablin_core::RingBuffer`) between the decoder thread (writer)
//! and the device callback (reader).
//!
//! Playback only starts once the buffer holds at least 25% of its capacity,
//! mirroring the buffering/underrun guard a blocking ring buffer applies
//! before handing samples to the device callback; starved reads are filled
//! with silence rather than stalling the callback.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Sample, SampleFormat, Stream, StreamConfig};

use crate::audio_output::AudioOutput;
use crate::error::{Error, Result};
use dablin_core::RingBuffer;

/// Ring buffer sized for this many milliseconds of audio at the current
/// format.
const BUFFER_MS: usize = 500;

/// Playback is gated until the buffer fills to this fraction of capacity.
const START_THRESHOLD: f64 = 0.25;

struct Shared {
    ring: Mutex<RingBuffer>,
    started: std::sync::atomic::AtomicBool,
    volume: Mutex<f32>,
    mute: std::sync::atomic::AtomicBool,
}

pub struct CpalOutput {
    samplerate: u32,
    channels: u8,
    shared: Option<Arc<Shared>>,
    stream: Option<Stream>,
    device: Device,
}

impl CpalOutput {
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::DeviceInit("no default output device".into()))?;
        Ok(CpalOutput { samplerate: 0, channels: 0, shared: None, stream: None, device })
    }

    fn build_stream(&mut self, samplerate: u32, channels: u8) -> Result<()> {
        let config = StreamConfig {
            channels: channels as cpal::ChannelCount,
            sample_rate: cpal::SampleRate(samplerate),
            buffer_size: cpal::BufferSize::Default,
        };

        let bytes_per_sample = 2usize; // i16
        let ring_len = ((BUFFER_MS * samplerate as usize) / 1000) * channels as usize * bytes_per_sample;
        let shared = Arc::new(Shared {
            ring: Mutex::new(RingBuffer::new(ring_len.max(bytes_per_sample))),
            started: std::sync::atomic::AtomicBool::new(false),
            volume: Mutex::new(1.0),
            mute: std::sync::atomic::AtomicBool::new(false),
        });

        let cb_shared = shared.clone();
        let err_fn = |e| log::error!("cpal output: stream error: {e}");

        let sample_format = self.device.default_output_config().map(|c| c.sample_format()).unwrap_or(SampleFormat::I16);

        let stream = match sample_format {
            SampleFormat::I16 => self.device.build_output_stream(
                &config,
                move |data: &mut [i16], _| fill_i16(data, &cb_shared),
                err_fn,
                None,
            ),
            _ => self.device.build_output_stream(
                &config,
                move |data: &mut [f32], _| fill_f32(data, &cb_shared),
                err_fn,
                None,
            ),
        }
        .map_err(|e| Error::DeviceInit(format!("failed to build output stream: {e}")))?;

        stream.play().map_err(|e| Error::DeviceInit(format!("failed to start stream: {e}")))?;

        self.shared = Some(shared);
        self.stream = Some(stream);
        Ok(())
    }
}

fn drain_gated(shared: &Shared, want: usize) -> Option<usize> {
    let mut ring = shared.ring.lock().unwrap();
    if !shared.started.load(std::sync::atomic::Ordering::Acquire) {
        if (ring.size() as f64) < (ring.capacity() as f64) * START_THRESHOLD {
            return None;
        }
        shared.started.store(true, std::sync::atomic::Ordering::Release);
    }
    let _ = want;
    Some(ring.size())
}

fn fill_i16(data: &mut [i16], shared: &Shared) {
    if shared.mute.load(std::sync::atomic::Ordering::Acquire) || drain_gated(shared, data.len() * 2).is_none() {
        data.iter_mut().for_each(|s| *s = Sample::EQUILIBRIUM);
        return;
    }
    let mut bytes = vec![0u8; data.len() * 2];
    let filled = shared.ring.lock().unwrap().read(Some(&mut bytes));
    let volume = *shared.volume.lock().unwrap();
    for (i, chunk) in bytes[..filled].chunks_exact(2).enumerate() {
        let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
        data[i] = ((sample as f32) * volume) as i16;
    }
    for s in &mut data[filled / 2..] {
        *s = Sample::EQUILIBRIUM;
    }
}

fn fill_f32(data: &mut [f32], shared: &Shared) {
    if shared.mute.load(std::sync::atomic::Ordering::Acquire) || drain_gated(shared, data.len() * 2).is_none() {
        data.iter_mut().for_each(|s| *s = Sample::EQUILIBRIUM);
        return;
    }
    let mut bytes = vec![0u8; data.len() * 2];
    let filled = shared.ring.lock().unwrap().read(Some(&mut bytes));
    let volume = *shared.volume.lock().unwrap();
    for (i, chunk) in bytes[..filled].chunks_exact(2).enumerate() {
        let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
        data[i] = (sample as f32 / i16::MAX as f32) * volume;
    }
    for s in &mut data[filled / 2..] {
        *s = Sample::EQUILIBRIUM;
    }
}

impl AudioOutput for CpalOutput {
    fn start_audio(&mut self, samplerate: u32, channels: u8, _float32: bool) {
        if self.samplerate == samplerate && self.channels == channels && self.stream.is_some() {
            return;
        }
        self.samplerate = samplerate;
        self.channels = channels;
        if let Err(e) = self.build_stream(samplerate, channels) {
            log::error!("cpal output: {e}");
        }
    }

    fn put_audio(&mut self, data: &[u8]) {
        if let Some(shared) = &self.shared {
            let mut ring = shared.ring.lock().unwrap();
            let written = ring.write(data);
            if written < data.len() {
                log::warn!("cpal output: ring buffer overflow, dropped {} bytes", data.len() - written);
            }
        }
    }

    fn stop_audio(&mut self) {
        if let Some(stream) = &self.stream {
            let _ = stream.pause();
        }
        self.stream = None;
        self.shared = None;
    }

    fn set_audio_mute(&mut self, mute: bool) {
        if let Some(shared) = &self.shared {
            shared.mute.store(mute, std::sync::atomic::Ordering::Release);
        }
    }

    fn set_audio_volume(&mut self, volume: f64) {
        if let Some(shared) = &self.shared {
            *shared.volume.lock().unwrap() = volume as f32;
        }
    }

    fn has_audio_volume_control(&self) -> bool {
        true
    }
}
