/// Sound engine: procedural 8-bit style effects via rodio.
///
/// All samples are generated as in-memory WAV buffers at init time and
/// played fire-and-forget through detached sinks. Build without the
/// "sound" feature and the stub engine compiles to no-ops.

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_pickup: Arc<Vec<u8>>,
        sfx_powerup: Arc<Vec<u8>>,
        sfx_eaten: Arc<Vec<u8>>,
        sfx_died: Arc<Vec<u8>>,
        sfx_cleared: Arc<Vec<u8>>,
        sfx_start: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = OutputStream::try_default().ok()?;

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_pickup: Arc::new(make_wav(&gen_tick())),
                sfx_powerup: Arc::new(make_wav(&gen_powerup())),
                sfx_eaten: Arc::new(make_wav(&gen_eaten())),
                sfx_died: Arc::new(make_wav(&gen_died())),
                sfx_cleared: Arc::new(make_wav(&gen_cleared())),
                sfx_start: Arc::new(make_wav(&gen_start())),
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

        pub fn play_pickup(&self) { self.play(&self.sfx_pickup); }
        pub fn play_powerup(&self) { self.play(&self.sfx_powerup); }
        pub fn play_eaten(&self) { self.play(&self.sfx_eaten); }
        pub fn play_died(&self) { self.play(&self.sfx_died); }
        pub fn play_cleared(&self) { self.play(&self.sfx_cleared); }
        pub fn play_start(&self) { self.play(&self.sfx_start); }
    }

    // ── Waveform generators, all mono f32 samples ──

    fn tone(samples: &mut Vec<f32>, freq: f32, duration: f32, volume: f32) {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32);
            let wave = (t * freq * 2.0 * std::f32::consts::PI).sin() * 0.75
                + (t * freq * 2.0 * 2.0 * std::f32::consts::PI).sin() * 0.25;
            samples.push(wave * env * volume);
        }
    }

    /// Pickup: one very short high blip.
    fn gen_tick() -> Vec<f32> {
        let mut s = Vec::new();
        tone(&mut s, 1568.0, 0.03, 0.2);
        s
    }

    /// Powerup: rising three-note arpeggio.
    fn gen_powerup() -> Vec<f32> {
        let mut s = Vec::new();
        for &f in &[659.0, 880.0, 1319.0] {
            tone(&mut s, f, 0.06, 0.3);
        }
        s
    }

    /// Prowler eaten: quick down-up chirp.
    fn gen_eaten() -> Vec<f32> {
        let mut s = Vec::new();
        for &f in &[988.0, 659.0, 1319.0] {
            tone(&mut s, f, 0.045, 0.3);
        }
        s
    }

    /// Death: slow descending minor run.
    fn gen_died() -> Vec<f32> {
        let mut s = Vec::new();
        for &f in &[523.0, 440.0, 349.0, 262.0] {
            tone(&mut s, f, 0.14, 0.3);
        }
        s
    }

    /// Level cleared: ascending fanfare with a sustained top note.
    fn gen_cleared() -> Vec<f32> {
        let mut s = Vec::new();
        for &f in &[523.0, 659.0, 784.0] {
            tone(&mut s, f, 0.09, 0.3);
        }
        tone(&mut s, 1047.0, 0.25, 0.3);
        s
    }

    /// Game start: two-note chirp.
    fn gen_start() -> Vec<f32> {
        let mut s = Vec::new();
        tone(&mut s, 784.0, 0.07, 0.25);
        tone(&mut s, 1175.0, 0.12, 0.25);
        s
    }

    // ── WAV encoder ──

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let clamped = s.clamp(-1.0, 1.0);
            buf.extend_from_slice(&((clamped * 32767.0) as i16).to_le_bytes());
        }

        buf
    }
}

// ── Public API — compiles to no-ops when the sound feature is off ──

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> {
        Some(SoundEngine)
    }
    pub fn play_pickup(&self) {}
    pub fn play_powerup(&self) {}
    pub fn play_eaten(&self) {}
    pub fn play_died(&self) {}
    pub fn play_cleared(&self) {}
    pub fn play_start(&self) {}
}
