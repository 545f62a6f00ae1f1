/// Sound engine: procedural 8-bit style sound effects via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile with `--no-default-features` or without "sound" feature
/// to disable audio entirely (the stub SoundEngine does nothing).

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    const SAMPLE_RATE: u32 = 22050;

    /// Pre-generated WAV buffers for each sound effect.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_jump: Arc<Vec<u8>>,
        sfx_coin: Arc<Vec<u8>>,
        sfx_lever: Arc<Vec<u8>>,
        sfx_shatter: Arc<Vec<u8>>,
        sfx_level_complete: Arc<Vec<u8>>,
        sfx_game_complete: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "audio output unavailable, running silent");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_jump: Arc::new(make_wav(&gen_jump())),
                sfx_coin: Arc::new(make_wav(&gen_coin())),
                sfx_lever: Arc::new(make_wav(&gen_lever())),
                sfx_shatter: Arc::new(make_wav(&gen_shatter())),
                sfx_level_complete: Arc::new(make_wav(&gen_level_complete())),
                sfx_game_complete: Arc::new(make_wav(&gen_game_complete())),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn play_jump(&self) { self.play(&self.sfx_jump); }
        pub fn play_coin(&self) { self.play(&self.sfx_coin); }
        pub fn play_lever(&self) { self.play(&self.sfx_lever); }
        pub fn play_shatter(&self) { self.play(&self.sfx_shatter); }
        pub fn play_level_complete(&self) { self.play(&self.sfx_level_complete); }
        pub fn play_game_complete(&self) { self.play(&self.sfx_game_complete); }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators — all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn samples_for(seconds: f32) -> usize {
        (SAMPLE_RATE as f32 * seconds) as usize
    }

    /// Sine plus a little octave, `decay` shapes the fade (1.0 = linear).
    fn tone(freq: f32, seconds: f32, volume: f32, decay: f32) -> Vec<f32> {
        let n = samples_for(seconds);
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = (1.0 - i as f32 / n as f32).powf(decay);
                let wave = (t * freq * TAU).sin() * 0.75 + (t * freq * 2.0 * TAU).sin() * 0.25;
                wave * env * volume
            })
            .collect()
    }

    fn sequence(notes: &[(f32, f32)], volume: f32) -> Vec<f32> {
        notes.iter().flat_map(|&(freq, dur)| tone(freq, dur, volume, 0.4)).collect()
    }

    /// Jump: quick upward sweep
    fn gen_jump() -> Vec<f32> {
        let n = samples_for(0.14);
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 280.0 + t * 520.0;
                phase += freq / SAMPLE_RATE as f32;
                let square = if (phase * TAU).sin() >= 0.0 { 1.0 } else { -1.0 };
                square * (1.0 - t) * 0.12
            })
            .collect()
    }

    /// Coin: bright two-note ding E6→B6
    fn gen_coin() -> Vec<f32> {
        sequence(&[(1319.0, 0.05), (1976.0, 0.16)], 0.25)
    }

    /// Lever: mechanical click followed by a low thunk
    fn gen_lever() -> Vec<f32> {
        let mut rng: u32 = 0x5eed;
        let click = samples_for(0.02);
        let mut samples: Vec<f32> = (0..click)
            .map(|i| {
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
                noise * (1.0 - i as f32 / click as f32) * 0.35
            })
            .collect();
        samples.extend(tone(110.0, 0.18, 0.4, 1.5));
        samples
    }

    /// Shatter: noise burst with a falling ring
    fn gen_shatter() -> Vec<f32> {
        let n = samples_for(0.35);
        let mut rng: u32 = 0xbeef;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
                let ring = (ti * (2400.0 - t * 1600.0) * TAU).sin();
                (noise * 0.7 + ring * 0.3) * (1.0 - t).powf(2.0) * 0.3
            })
            .collect()
    }

    /// Level complete: ascending fanfare G4→C5→E5→G5
    fn gen_level_complete() -> Vec<f32> {
        let mut samples = sequence(&[(392.0, 0.09), (523.0, 0.09), (659.0, 0.09)], 0.3);
        samples.extend(tone(784.0, 0.35, 0.3, 1.0));
        samples
    }

    /// Game complete: longer fanfare ending on a held chord
    fn gen_game_complete() -> Vec<f32> {
        let mut samples = sequence(
            &[(523.0, 0.12), (659.0, 0.12), (784.0, 0.12), (659.0, 0.12), (784.0, 0.12)],
            0.3,
        );
        let chord: Vec<Vec<f32>> = [523.0, 659.0, 784.0, 1047.0]
            .iter()
            .map(|&f| tone(f, 0.8, 0.12, 1.0))
            .collect();
        let len = chord[0].len();
        samples.extend((0..len).map(|i| chord.iter().map(|c| c[i]).sum::<f32>()));
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder — wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
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
//  Public API — compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_jump(&self) {}
    pub fn play_coin(&self) {}
    pub fn play_lever(&self) {}
    pub fn play_shatter(&self) {}
    pub fn play_level_complete(&self) {}
    pub fn play_game_complete(&self) {}
}
