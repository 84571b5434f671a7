use std::fmt;

/// Detector calling convention, fixed when the detector is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatingMode {
    /// One synchronous call per still image.
    SingleImage,
    /// One synchronous call per decoded frame, with non-decreasing timestamps.
    Video,
    /// Asynchronous submissions; results are delivered to a callback.
    LiveStream,
}

impl OperatingMode {
    /// Whether calls in this mode carry a timestamp that must not go backwards.
    pub fn requires_timestamps(self) -> bool {
        matches!(self, OperatingMode::Video | OperatingMode::LiveStream)
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatingMode::SingleImage => write!(f, "single-image"),
            OperatingMode::Video => write!(f, "video"),
            OperatingMode::LiveStream => write!(f, "live-stream"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_timestamps() {
        assert!(!OperatingMode::SingleImage.requires_timestamps());
        assert!(OperatingMode::Video.requires_timestamps());
        assert!(OperatingMode::LiveStream.requires_timestamps());
    }

    #[test]
    fn test_display() {
        assert_eq!(OperatingMode::LiveStream.to_string(), "live-stream");
    }
}
