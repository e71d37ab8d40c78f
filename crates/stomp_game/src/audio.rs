//! Sound effects: WAV clips decoded at boot, mixed into one cpal output
//! stream.
//!
//! The play pass only queues sound ids on the engine. `main` drains them
//! every fixed step into a `SoundSink`; `CpalAudio` is the real sink. When no
//! output device is available the game keeps running silently.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::assets::AssetRegistry;
use crate::error::{GameError, GameResult};

pub const OUTPUT_SAMPLE_RATE: u32 = 44_100;
const OUTPUT_CHANNELS: u16 = 2;
const OUTPUT_GAIN: f32 = 0.8;
const MAX_VOICES: usize = 16;

/// Receives every sound id the engine was asked to play.
pub trait SoundSink {
    fn play(&mut self, sound: &str);
}

/// Mono samples at `OUTPUT_SAMPLE_RATE`.
#[derive(Debug, Clone)]
pub struct SoundClip {
    samples: Arc<[f32]>,
}

impl SoundClip {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct SoundBank {
    clips: HashMap<String, SoundClip>,
}

impl SoundBank {
    pub fn get(&self, id: &str) -> Option<&SoundClip> {
        self.clips.get(id)
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.clips.len()
    }
}

/// Decode every sound in the manifest. Paths resolve against `root`.
pub fn load_sound_bank(assets: &AssetRegistry, root: &Path) -> GameResult<SoundBank> {
    let mut bank = SoundBank::default();
    for (id, path) in assets.sounds() {
        let sound_error = |reason: String| GameError::AssetLoad {
            id: id.clone(),
            reason,
        };
        let bytes = fs::read(root.join(path))
            .map_err(|e| sound_error(format!("failed to read {path}: {e}")))?;
        let clip = decode_wav(&bytes).map_err(|e| sound_error(format!("{path}: {e}")))?;
        log::debug!("Decoded '{}' ({} samples)", id, clip.len());
        bank.clips.insert(id.clone(), clip);
    }
    Ok(bank)
}

/// Decode a 16-bit PCM RIFF/WAVE file, downmixed to mono and resampled to
/// `OUTPUT_SAMPLE_RATE`.
pub fn decode_wav(bytes: &[u8]) -> Result<SoundClip, String> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err("not a RIFF/WAVE file".to_string());
    }

    let mut format = None;
    let mut data = None;
    let mut pos = 12;
    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size = read_u32(bytes, pos + 4) as usize;
        let body = bytes
            .get(pos + 8..pos + 8 + size)
            .ok_or_else(|| "chunk runs past the end of the file".to_string())?;
        match id {
            b"fmt " => format = Some(WavFormat::parse(body)?),
            b"data" => data = Some(body),
            _ => {}
        }
        // Chunks are word aligned.
        pos += 8 + size + (size & 1);
    }

    let format = format.ok_or_else(|| "missing fmt chunk".to_string())?;
    let data = data.ok_or_else(|| "missing data chunk".to_string())?;
    if format.encoding != 1 || format.bits_per_sample != 16 {
        return Err(format!(
            "unsupported encoding {} with {} bits per sample; expected 16-bit PCM",
            format.encoding, format.bits_per_sample
        ));
    }
    if format.channels == 0 || format.sample_rate == 0 {
        return Err("channel count and sample rate must be > 0".to_string());
    }

    let channels = usize::from(format.channels);
    let mono: Vec<f32> = data
        .chunks_exact(2 * channels)
        .map(|frame| {
            let sum: f32 = frame
                .chunks_exact(2)
                .map(|s| f32::from(i16::from_le_bytes([s[0], s[1]])) / 32_768.0)
                .sum();
            sum / channels as f32
        })
        .collect();

    Ok(SoundClip {
        samples: resample(&mono, format.sample_rate, OUTPUT_SAMPLE_RATE).into(),
    })
}

struct WavFormat {
    encoding: u16,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

impl WavFormat {
    fn parse(body: &[u8]) -> Result<Self, String> {
        if body.len() < 16 {
            return Err("fmt chunk is too short".to_string());
        }
        Ok(Self {
            encoding: read_u16(body, 0),
            channels: read_u16(body, 2),
            sample_rate: read_u32(body, 4),
            bits_per_sample: read_u16(body, 14),
        })
    }
}

// Callers bounds-check before reading.
fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Linear interpolation between neighbouring source samples.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }
    let ratio = f64::from(from_rate) / f64::from(to_rate);
    let out_len = (samples.len() as f64 / ratio).floor() as usize;
    (0..out_len)
        .map(|i| {
            let src = i as f64 * ratio;
            let index = src as usize;
            let frac = (src - index as f64) as f32;
            let a = samples[index];
            let b = samples.get(index + 1).copied().unwrap_or(a);
            a + (b - a) * frac
        })
        .collect()
}

struct Voice {
    samples: Arc<[f32]>,
    position: usize,
}

/// Sums the playing clips into interleaved output frames.
#[derive(Default)]
pub struct Mixer {
    voices: Vec<Voice>,
}

impl Mixer {
    /// Start a clip. The oldest voice is dropped once `MAX_VOICES` play.
    pub fn trigger(&mut self, clip: &SoundClip) {
        if self.voices.len() >= MAX_VOICES {
            self.voices.remove(0);
        }
        self.voices.push(Voice {
            samples: Arc::clone(&clip.samples),
            position: 0,
        });
    }

    #[allow(dead_code)]
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Fill `out` (interleaved, `channels` per frame) and retire finished
    /// voices.
    pub fn mix(&mut self, out: &mut [f32], channels: usize) {
        for frame in out.chunks_mut(channels.max(1)) {
            let mut value = 0.0;
            for voice in &mut self.voices {
                if let Some(sample) = voice.samples.get(voice.position) {
                    value += sample;
                    voice.position += 1;
                }
            }
            frame.fill((value * OUTPUT_GAIN).clamp(-1.0, 1.0));
        }
        self.voices.retain(|v| v.position < v.samples.len());
    }
}

/// Plays bank clips on the default output device.
pub struct CpalAudio {
    bank: SoundBank,
    mixer: Arc<Mutex<Mixer>>,
    _stream: Option<cpal::Stream>,
}

impl CpalAudio {
    pub fn new(bank: SoundBank) -> Self {
        let mixer = Arc::new(Mutex::new(Mixer::default()));
        let stream = match open_output_stream(Arc::clone(&mixer)) {
            Ok(stream) => {
                log::info!("Audio output open at {} Hz", OUTPUT_SAMPLE_RATE);
                Some(stream)
            }
            Err(err) => {
                log::warn!("Audio disabled: {err}");
                None
            }
        };
        Self {
            bank,
            mixer,
            _stream: stream,
        }
    }
}

impl SoundSink for CpalAudio {
    fn play(&mut self, sound: &str) {
        let Some(clip) = self.bank.get(sound) else {
            log::warn!("Sound '{sound}' is not in the sound bank");
            return;
        };
        log::debug!("Sound: {sound}");
        if let Ok(mut mixer) = self.mixer.lock() {
            mixer.trigger(clip);
        }
    }
}

fn open_output_stream(mixer: Arc<Mutex<Mixer>>) -> Result<cpal::Stream, String> {
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| "no default output device".to_string())?;
    let config = cpal::StreamConfig {
        channels: OUTPUT_CHANNELS,
        sample_rate: cpal::SampleRate(OUTPUT_SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    };
    let channels = usize::from(OUTPUT_CHANNELS);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| match mixer.lock() {
                Ok(mut mixer) => mixer.mix(data, channels),
                Err(_) => data.fill(0.0),
            },
            |err| log::error!("Audio stream error: {err}"),
            None,
        )
        .map_err(|e| format!("failed to build output stream: {e}"))?;
    stream
        .play()
        .map_err(|e| format!("failed to start output stream: {e}"))?;
    Ok(stream)
}
