//! Clip model and the ordered clip registry.

mod loader;
mod registry;

pub use loader::{LoadOptions, LoadReport, load_clips};
pub use registry::ClipRegistry;

use std::path::{Path, PathBuf};

/// How a clip entered the registry.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ClipSource {
    /// Added by hand from disk.
    Manual,
    /// Captured from a replay-buffer write.
    ReplayBuffer,
    /// Produced by highlight detection, with the detector's metadata.
    AiDetected(AiClipInfo),
}

/// Metadata attached to a detected highlight clip.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AiClipInfo {
    /// Detector confidence for this clip.
    pub score: f64,
    /// Moment tags that contributed to the clip (e.g. "kill", "round_win").
    pub moments: Vec<String>,
}

/// One source media file registered for inclusion in an export.
///
/// The path is the identity: a clip is keyed and deduplicated by it.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Clip {
    /// Absolute path of the backing file.
    pub path: PathBuf,
    /// Whether the clip participates in exports.
    pub enabled: bool,
    /// Whether the clip has been probed and its sprite generated.
    pub loaded: bool,
    /// Whether the backing file disappeared after registration.
    pub deleted: bool,
    /// Seconds cut from the start before the clip contributes frames/audio.
    pub start_trim: f64,
    /// Seconds cut from the end.
    pub end_trim: f64,
    /// Probed duration in seconds, set on load.
    pub duration: Option<f64>,
    /// Scrub-thumbnail sprite written during load.
    pub scrub_sprite: Option<PathBuf>,
    /// Provenance of the clip.
    pub source: ClipSource,
    /// Id of the stream this clip was captured from, when known.
    pub stream_id: Option<String>,
}

impl Clip {
    /// Create an unloaded, enabled clip with zero trims.
    pub fn new(path: impl Into<PathBuf>, source: ClipSource) -> Self {
        Self {
            path: path.into(),
            enabled: true,
            loaded: false,
            deleted: false,
            start_trim: 0.0,
            end_trim: 0.0,
            duration: None,
            scrub_sprite: None,
            source,
            stream_id: None,
        }
    }

    /// Duration remaining after trims, zero until the clip is loaded.
    pub fn trimmed_duration(&self) -> f64 {
        match self.duration {
            Some(d) => (d - self.start_trim - self.end_trim).max(0.0),
            None => 0.0,
        }
    }

    /// Whether this clip participates in the next export run.
    pub fn is_exportable(&self) -> bool {
        self.enabled && !self.deleted
    }

    pub(crate) fn matches_path(&self, path: &Path) -> bool {
        self.path == path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trimmed_duration_requires_load() {
        let mut clip = Clip::new("a.mp4", ClipSource::Manual);
        assert_eq!(clip.trimmed_duration(), 0.0);

        clip.duration = Some(10.0);
        clip.start_trim = 1.0;
        clip.end_trim = 2.5;
        assert!((clip.trimmed_duration() - 6.5).abs() < 1e-12);
    }

    #[test]
    fn exportable_excludes_disabled_and_deleted() {
        let mut clip = Clip::new("a.mp4", ClipSource::Manual);
        assert!(clip.is_exportable());
        clip.enabled = false;
        assert!(!clip.is_exportable());
        clip.enabled = true;
        clip.deleted = true;
        assert!(!clip.is_exportable());
    }
}
