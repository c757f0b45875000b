//! Playback clock for the synthetic 0-100 track view.

use crate::config::PlaybackSettings;
use crate::constants::{FRAME_MAX, FRAME_MIN};

/// Monotonic scalar advanced by a periodic tick. Wraps to the start past the
/// end of the track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackClock {
    position: f32,
    playing: bool,
    /// Timeline units per second
    speed: f32,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(PlaybackSettings::default())
    }
}

impl PlaybackClock {
    pub fn new(settings: PlaybackSettings) -> Self {
        Self {
            position: FRAME_MIN,
            playing: false,
            speed: settings.speed.max(0.0),
        }
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn toggle(&mut self) {
        self.playing = !self.playing;
    }

    /// Jump to `position`, clamped to the track.
    pub fn seek(&mut self, position: f32) {
        self.position = if position.is_nan() {
            FRAME_MIN
        } else {
            position.clamp(FRAME_MIN, FRAME_MAX)
        };
    }

    /// Advance by `dt_seconds` of wall time. Returns the new position.
    pub fn tick(&mut self, dt_seconds: f32) -> f32 {
        if self.playing && dt_seconds > 0.0 {
            let next = self.position + self.speed * dt_seconds;
            self.position = if next > FRAME_MAX { FRAME_MIN } else { next };
        }
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paused_clock_does_not_move() {
        let mut clock = PlaybackClock::default();
        assert_eq!(clock.tick(1.0), 0.0);
    }

    #[test]
    fn test_tick_advances_and_wraps() {
        let mut clock = PlaybackClock::new(PlaybackSettings { speed: 10.0 });
        clock.play();
        assert!((clock.tick(2.5) - 25.0).abs() < 1e-4);

        clock.seek(95.0);
        assert!((clock.tick(0.5) - 100.0).abs() < 1e-4);
        assert_eq!(clock.tick(0.5), 0.0);
    }

    #[test]
    fn test_seek_clamps() {
        let mut clock = PlaybackClock::default();
        clock.seek(150.0);
        assert_eq!(clock.position(), 100.0);
        clock.seek(-3.0);
        assert_eq!(clock.position(), 0.0);
    }
}
