use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AudioError;

/// Locator of the alarm sound, e.g. a URL or file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundSource(String);

impl SoundSource {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SoundSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a ringing session is using to wake the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertMode {
    /// Looping sound.
    Sound,
    /// Heavy haptic pulse once per tick; used when sound is unavailable.
    HapticPulse,
    /// Neither sound nor vibration is available.
    Silent,
}

/// Audio and haptic output of the host.
pub trait AlertDevice {
    /// Start playing `sound` on loop at full volume.
    fn play_looping(&mut self, sound: &SoundSource) -> Result<(), AudioError>;

    fn stop_sound(&mut self) -> Result<(), AudioError>;

    /// One heavy impact.
    fn pulse(&mut self);

    /// Short "error" pattern after a wrong phrase.
    fn error_feedback(&mut self);
}

impl<D: AlertDevice + ?Sized> AlertDevice for Box<D> {
    fn play_looping(&mut self, sound: &SoundSource) -> Result<(), AudioError> {
        (**self).play_looping(sound)
    }

    fn stop_sound(&mut self) -> Result<(), AudioError> {
        (**self).stop_sound()
    }

    fn pulse(&mut self) {
        (**self).pulse()
    }

    fn error_feedback(&mut self) {
        (**self).error_feedback()
    }
}
