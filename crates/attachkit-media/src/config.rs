use std::time::Duration;

pub const DEFAULT_FFMPEG: &str = "ffmpeg";
pub const DEFAULT_VIDEO_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PICK_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_PIXELS: u64 = 50_000_000;

/// Runtime settings for a [`crate::Toolkit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolkitConfig {
    /// Program used to decode video frames.
    pub ffmpeg_program: String,
    /// Upper bound on waiting for a video's first frame.
    pub video_timeout: Duration,
    /// Upper bound on waiting for the user to pick a file.
    pub pick_timeout: Duration,
    /// Whole-request timeout for HTTP fetches.
    pub fetch_timeout: Duration,
    /// Largest canvas area (width * height) that can be acquired.
    pub max_pixels: u64,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            ffmpeg_program: DEFAULT_FFMPEG.to_string(),
            video_timeout: Duration::from_secs(DEFAULT_VIDEO_TIMEOUT_SECS),
            pick_timeout: Duration::from_secs(DEFAULT_PICK_TIMEOUT_SECS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl ToolkitConfig {
    /// Build from environment variables, falling back to defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secs = |key: &str, default: u64| {
            Duration::from_secs(
                lookup(key)
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(default),
            )
        };
        Self {
            ffmpeg_program: lookup("ATTACHKIT_FFMPEG")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FFMPEG.to_string()),
            video_timeout: secs("ATTACHKIT_VIDEO_TIMEOUT_SECS", DEFAULT_VIDEO_TIMEOUT_SECS),
            pick_timeout: secs("ATTACHKIT_PICK_TIMEOUT_SECS", DEFAULT_PICK_TIMEOUT_SECS),
            fetch_timeout: secs("ATTACHKIT_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS),
            max_pixels: lookup("ATTACHKIT_MAX_PIXELS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_MAX_PIXELS),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = ToolkitConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, ToolkitConfig::default());
        assert_eq!(config.ffmpeg_program, "ffmpeg");
        assert_eq!(config.pick_timeout, Duration::from_secs(300));
    }

    #[test]
    fn reads_overrides() {
        let config = ToolkitConfig::from_lookup(lookup_from(&[
            ("ATTACHKIT_FFMPEG", "/opt/ffmpeg/bin/ffmpeg"),
            ("ATTACHKIT_VIDEO_TIMEOUT_SECS", "5"),
            ("ATTACHKIT_PICK_TIMEOUT_SECS", " 60 "),
            ("ATTACHKIT_FETCH_TIMEOUT_SECS", "10"),
            ("ATTACHKIT_MAX_PIXELS", "1000"),
        ]));
        assert_eq!(config.ffmpeg_program, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.video_timeout, Duration::from_secs(5));
        assert_eq!(config.pick_timeout, Duration::from_secs(60));
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.max_pixels, 1000);
    }

    #[test]
    fn garbage_values_fall_back() {
        let config = ToolkitConfig::from_lookup(lookup_from(&[
            ("ATTACHKIT_FFMPEG", "  "),
            ("ATTACHKIT_VIDEO_TIMEOUT_SECS", "soon"),
            ("ATTACHKIT_MAX_PIXELS", "-4"),
        ]));
        assert_eq!(config.ffmpeg_program, DEFAULT_FFMPEG);
        assert_eq!(config.video_timeout, Duration::from_secs(DEFAULT_VIDEO_TIMEOUT_SECS));
        assert_eq!(config.max_pixels, DEFAULT_MAX_PIXELS);
    }
}
