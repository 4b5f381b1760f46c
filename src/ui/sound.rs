/// Sound engine: procedural sound effects via rodio.
///
/// One in-memory WAV buffer per engine sound cue, generated at init time.
/// Playback is fire-and-forget and panned by the cue's horizontal position.
///
/// Compile without the "sound" feature to disable audio entirely (the stub
/// SoundEngine does nothing).

#[cfg(not(feature = "sound"))]
use crate::sim::event::SoundCue;

/// Stereo position of a cue: 0.0 = far left, 1.0 = far right.
pub fn pan_for(px: i32, board_width: i32) -> f32 {
    if board_width <= 0 {
        return 0.5;
    }
    (px as f32 / board_width as f32).clamp(0.0, 1.0)
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::source::ChannelVolume;
    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use crate::sim::event::SoundCue;

    const SAMPLE_RATE: u32 = 22050;
    const CUES: usize = 9;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        cues: Vec<Arc<Vec<u8>>>,
        sfx_clear: Arc<Vec<u8>>,
        sfx_lose: Arc<Vec<u8>>,
    }

    fn slot(cue: SoundCue) -> usize {
        match cue {
            SoundCue::BrickBreak => 0,
            SoundCue::OneWaySlide => 1,
            SoundCue::Teleported => 2,
            SoundCue::BrickCopy => 3,
            SoundCue::BrickCopyDenied => 4,
            SoundCue::BrickSwap => 5,
            SoundCue::BrickSwapDenied => 6,
            SoundCue::SwitchOn => 7,
            SoundCue::SwitchOff => 8,
        }
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = OutputStream::try_default().ok()?;

            let mut cues = vec![Arc::new(Vec::new()); CUES];
            let generated = [
                (SoundCue::BrickBreak, gen_break()),
                (SoundCue::OneWaySlide, gen_sweep(300.0, 500.0, 0.08, 0.15)),
                (SoundCue::Teleported, gen_sweep(400.0, 1600.0, 0.2, 0.2)),
                (SoundCue::BrickCopy, gen_notes(&[659.0, 988.0], 0.06)),
                (SoundCue::BrickCopyDenied, gen_buzz(0.12)),
                (SoundCue::BrickSwap, gen_notes(&[988.0, 659.0], 0.06)),
                (SoundCue::BrickSwapDenied, gen_buzz(0.12)),
                (SoundCue::SwitchOn, gen_blip(880.0, 0.05, 0.25)),
                (SoundCue::SwitchOff, gen_blip(440.0, 0.05, 0.25)),
            ];
            for (cue, samples) in generated {
                cues[slot(cue)] = Arc::new(make_wav(&samples));
            }

            Some(SoundEngine {
                _stream: stream,
                handle,
                cues,
                sfx_clear: Arc::new(make_wav(&gen_notes(&[523.0, 659.0, 784.0, 1047.0], 0.1))),
                sfx_lose: Arc::new(make_wav(&gen_notes(&[440.0, 370.0, 311.0, 261.0], 0.12))),
            })
        }

        fn play_buf(&self, buf: &Arc<Vec<u8>>, pan: f32) {
            let Ok(sink) = Sink::try_new(&self.handle) else {
                return;
            };
            let cursor = Cursor::new(buf.as_ref().clone());
            if let Ok(src) = rodio::Decoder::new(cursor) {
                let pan = pan.clamp(0.0, 1.0);
                sink.append(ChannelVolume::new(src, vec![1.0 - pan * 0.8, 0.2 + pan * 0.8]));
                sink.detach();
            }
        }

        pub fn play(&self, cue: SoundCue, pan: f32) {
            self.play_buf(&self.cues[slot(cue)], pan);
        }

        pub fn play_clear(&self) { self.play_buf(&self.sfx_clear, 0.5); }
        pub fn play_lose(&self) { self.play_buf(&self.sfx_lose, 0.5); }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn tone(t: f32, freq: f32) -> f32 {
        (t * freq * 2.0 * std::f32::consts::PI).sin()
    }

    fn gen_blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32);
                tone(t, freq) * env * volume
            })
            .collect()
    }

    /// Frequency glide from `from` to `to`.
    fn gen_sweep(from: f32, to: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let r = i as f32 / n as f32;
                let freq = from + (to - from) * r;
                phase += freq / SAMPLE_RATE as f32;
                (phase * 2.0 * std::f32::consts::PI).sin() * (1.0 - r).powf(0.6) * volume
            })
            .collect()
    }

    /// Short arpeggio, square-ish for a retro feel.
    fn gen_notes(notes: &[f32], note_dur: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.4;
                let wave = tone(t, freq) * 0.7 + tone(t, freq * 3.0) * 0.3;
                samples.push(wave * env * 0.25);
            }
        }
        samples
    }

    /// Brick break: noise burst over a falling tone.
    fn gen_break() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.15) as usize;
        let mut rng: u32 = 12345;
        (0..n)
            .map(|i| {
                let r = i as f32 / n as f32;
                let t = i as f32 / SAMPLE_RATE as f32;
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let body = tone(t, 500.0 - r * 300.0);
                (body * 0.4 + noise * 0.6) * (1.0 - r).powf(0.8) * 0.3
            })
            .collect()
    }

    /// Denied trigger: low square buzz.
    fn gen_buzz(duration: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let sq = if tone(t, 110.0) >= 0.0 { 1.0 } else { -1.0 };
                sq * (1.0 - i as f32 / n as f32) * 0.15
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a 16-bit mono WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * bits_per_sample as u32 / 8;
        let block_align = bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;

        let mut buf = Vec::with_capacity(44 + data_size as usize);
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&1u16.to_le_bytes()); // mono
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }
        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _cue: SoundCue, _pan: f32) {}
    pub fn play_clear(&self) {}
    pub fn play_lose(&self) {}
}
