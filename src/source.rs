//! Synthetic full-duplex frame source for the demo session.
//!
//! Stands in for the capture layer: emits paired mic/reference frames where
//! the mic hears the reference through a simulated echo path (fixed delay
//! plus attenuation) together with a quiet voice tone. Fully deterministic,
//! so repeated runs produce identical engine output.

use std::f32::consts::TAU;

const VOICE_FREQ_HZ: f32 = 220.0;
const VOICE_LEVEL: f32 = 0.15;
const REFERENCE_LEVEL: f32 = 0.5;

pub struct SyntheticDuplexSource {
    frames_left: usize,
    echo_gain: f32,
    /// Simulated speaker-to-mic delay line, one slot per delay sample
    delay_line: Vec<f32>,
    write_pos: usize,
    rng_state: u32,
    voice_phase: f32,
    voice_step: f32,
}

impl SyntheticDuplexSource {
    pub fn new(sample_rate: u32, echo_delay: usize, echo_gain: f32, total_frames: usize) -> Self {
        Self {
            frames_left: total_frames,
            echo_gain,
            delay_line: vec![0.0; echo_delay],
            write_pos: 0,
            rng_state: 0x2545_F491,
            voice_phase: 0.0,
            voice_step: TAU * VOICE_FREQ_HZ / sample_rate as f32,
        }
    }

    /// Fill the next mic/reference frame pair. Returns false once the
    /// session is over.
    pub fn next_frame(&mut self, mic: &mut [f32], reference: &mut [f32]) -> bool {
        if self.frames_left == 0 {
            return false;
        }
        self.frames_left -= 1;

        for i in 0..reference.len() {
            let speaker = self.noise() * REFERENCE_LEVEL;
            reference[i] = speaker;

            let echoed = if self.delay_line.is_empty() {
                speaker
            } else {
                let delayed = self.delay_line[self.write_pos];
                self.delay_line[self.write_pos] = speaker;
                self.write_pos = (self.write_pos + 1) % self.delay_line.len();
                delayed
            };

            let voice = self.voice_phase.sin() * VOICE_LEVEL;
            self.voice_phase = (self.voice_phase + self.voice_step) % TAU;

            mic[i] = self.echo_gain * echoed + voice;
        }
        true
    }

    // Simple LCG, deterministic across runs
    fn noise(&mut self) -> f32 {
        self.rng_state = self.rng_state.wrapping_mul(1103515245).wrapping_add(12345);
        (((self.rng_state >> 16) & 0x7FFF) as f32 / 16383.5) - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_is_deterministic() {
        let mut a = SyntheticDuplexSource::new(48000, 96, 0.4, 3);
        let mut b = SyntheticDuplexSource::new(48000, 96, 0.4, 3);

        let mut mic_a = vec![0.0; 128];
        let mut ref_a = vec![0.0; 128];
        let mut mic_b = vec![0.0; 128];
        let mut ref_b = vec![0.0; 128];

        while a.next_frame(&mut mic_a, &mut ref_a) {
            assert!(b.next_frame(&mut mic_b, &mut ref_b));
            assert_eq!(mic_a, mic_b);
            assert_eq!(ref_a, ref_b);
        }
        assert!(!b.next_frame(&mut mic_b, &mut ref_b));
    }

    #[test]
    fn test_mic_contains_delayed_reference() {
        let delay = 10;
        let mut source = SyntheticDuplexSource::new(48000, delay, 1.0, 1);
        let mut mic = vec![0.0; 256];
        let mut reference = vec![0.0; 256];
        source.next_frame(&mut mic, &mut reference);

        // Subtract the voice tone; what remains is the delayed reference
        for i in delay..256 {
            let voice = ((i as f32) * TAU * VOICE_FREQ_HZ / 48000.0).sin() * VOICE_LEVEL;
            assert!((mic[i] - voice - reference[i - delay]).abs() < 1e-3);
        }
    }
}
