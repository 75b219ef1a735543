//! Listener preferences that travel with every resolution and playback call

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Loop mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Stop when the queue ends
    #[default]
    Off,

    /// Repeat the current track
    One,

    /// Wrap around to the start of the queue
    All,
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::One => "one",
            Self::All => "all",
        })
    }
}

impl FromStr for LoopMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "one" => Ok(Self::One),
            "all" => Ok(Self::All),
            other => Err(format!("unknown loop mode: {other}")),
        }
    }
}

/// Stream quality preference passed to the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioQuality {
    /// Data-saver streams
    Low,

    /// Standard streams
    Medium,

    /// Highest lossy quality offered
    #[default]
    High,
}

impl AudioQuality {
    /// Nominal bitrate in kbit/s for this quality tier
    pub fn nominal_bitrate(self) -> u32 {
        match self {
            Self::Low => 64,
            Self::Medium => 128,
            Self::High => 256,
        }
    }
}

impl fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

impl FromStr for AudioQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown audio quality: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_mode_parses_case_insensitively() {
        assert_eq!("ALL".parse::<LoopMode>().unwrap(), LoopMode::All);
        assert_eq!("one".parse::<LoopMode>().unwrap(), LoopMode::One);
        assert!("twice".parse::<LoopMode>().is_err());
    }

    #[test]
    fn preferences_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&LoopMode::All).unwrap(), "\"all\"");
        assert_eq!(serde_json::to_string(&AudioQuality::Medium).unwrap(), "\"medium\"");
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for quality in [AudioQuality::Low, AudioQuality::Medium, AudioQuality::High] {
            assert_eq!(quality.to_string().parse::<AudioQuality>().unwrap(), quality);
        }
    }
}
