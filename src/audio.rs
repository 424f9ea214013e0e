//! Audio reactivity
//!
//! A byte spectrum (0-255 per bin, low frequencies first) nudges the noise
//! strength and speed. The host feeds spectra as they arrive and calls
//! `apply` once per frame; values are blended exponentially so a single loud
//! frame never snaps the pattern.

use crate::settings::Settings;

/// Largest noise strength or speed the spectrum maps to
pub const MAX_NOISE: f32 = 0.2;

const BASS_BINS: std::ops::Range<usize> = 0..10;
const BEAT_BINS: std::ops::Range<usize> = 5..15;

fn band_mean(spectrum: &[u8], bins: std::ops::Range<usize>) -> f32 {
    let band = &spectrum[bins.start.min(spectrum.len())..bins.end.min(spectrum.len())];
    if band.is_empty() {
        return 0.0;
    }
    band.iter().map(|&b| f32::from(b)).sum::<f32>() / band.len() as f32
}

/// Noise strength target from the bass bins
pub fn noise_strength(spectrum: &[u8]) -> f32 {
    (band_mean(spectrum, BASS_BINS) / 255.0 * MAX_NOISE).min(MAX_NOISE)
}

/// Noise speed target from the low-mid bins
pub fn noise_speed(spectrum: &[u8]) -> f32 {
    (band_mean(spectrum, BEAT_BINS) / 255.0 * MAX_NOISE).min(MAX_NOISE)
}

#[derive(Debug, Default)]
pub struct AudioReactor {
    spectrum: Option<Vec<u8>>,
}

impl AudioReactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest spectrum; replaces any that was not yet applied
    pub fn feed(&mut self, spectrum: Vec<u8>) {
        self.spectrum = Some(spectrum);
    }

    pub fn has_signal(&self) -> bool {
        self.spectrum.is_some()
    }

    /// Blend the latest spectrum into the noise settings. Does nothing when
    /// audio reactivity is off or no spectrum has arrived.
    pub fn apply(&self, settings: &mut Settings) -> bool {
        let Some(spectrum) = self.spectrum.as_deref() else {
            return false;
        };
        if !settings.audio.reactive {
            return false;
        }
        let audio = &settings.audio;
        let strength = noise_strength(spectrum) * audio.sensitivity;
        let speed = noise_speed(spectrum);

        let ws = audio.strength_influence.clamp(0.0, 1.0);
        let wv = audio.speed_influence.clamp(0.0, 1.0);
        settings.noise_strength = settings.noise_strength * (1.0 - ws) + strength * ws;
        settings.noise_speed = settings.noise_speed * (1.0 - wv) + speed * wv;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_mapping() {
        let mut spectrum = vec![0u8; 32];
        for b in &mut spectrum[0..5] {
            *b = 255;
        }
        // Bass: five of ten bins full
        assert!((noise_strength(&spectrum) - 0.1).abs() < 1e-6);
        // Beat range 5..15 is silent
        assert_eq!(noise_speed(&spectrum), 0.0);
        assert!((noise_strength(&[255; 64]) - MAX_NOISE).abs() < 1e-6);
    }

    #[test]
    fn test_short_spectrum() {
        assert_eq!(noise_speed(&[255; 4]), 0.0);
        assert!((noise_strength(&[255; 4]) - MAX_NOISE).abs() < 1e-6);
        assert_eq!(noise_strength(&[]), 0.0);
    }

    #[test]
    fn test_apply_blends_toward_target() {
        let mut reactor = AudioReactor::new();
        let mut settings = Settings::default();
        settings.audio.reactive = true;
        settings.audio.strength_influence = 0.5;
        settings.audio.speed_influence = 0.25;
        settings.audio.sensitivity = 0.5;

        assert!(!reactor.apply(&mut settings));
        reactor.feed(vec![255; 16]);
        assert!(reactor.apply(&mut settings));
        // strength target 0.2 * 0.5 = 0.1, half-way from 0
        assert!((settings.noise_strength - 0.05).abs() < 1e-6);
        // speed target 0.2, a quarter of the way from 0
        assert!((settings.noise_speed - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_disabled_reactivity_leaves_settings() {
        let mut reactor = AudioReactor::new();
        reactor.feed(vec![255; 16]);
        let mut settings = Settings::default();
        assert!(!reactor.apply(&mut settings));
        assert_eq!(settings, Settings::default());
    }
}
