use std::path::{Path, PathBuf};

use crate::clip::{AiClipInfo, Clip, ClipSource};
use crate::foundation::error::{CutError, CutResult};

/// Ordered working list of clips.
///
/// Insertion order is meaningful: it is the timeline order and decides which
/// clips are adjacent at transition boundaries. The registry is owned by the
/// surrounding application; the export core reads it at run start and writes
/// back only through [`ClipRegistry::mark_loaded`] / [`ClipRegistry::mark_deleted`].
///
/// Every mutation bumps a revision counter. The exporter remembers the
/// revision of the last successful run, so any later edit invalidates the
/// `exported` flag without the registry knowing about export state at all.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ClipRegistry {
    clips: Vec<Clip>,
    revision: u64,
}

impl ClipRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clips in display/timeline order.
    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    /// Monotonic counter bumped on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Look up a clip by path.
    pub fn get(&self, path: &Path) -> Option<&Clip> {
        self.clips.iter().find(|c| c.matches_path(path))
    }

    /// Whether every enabled, non-deleted clip has finished loading.
    pub fn all_enabled_loaded(&self) -> bool {
        self.clips
            .iter()
            .filter(|c| c.is_exportable())
            .all(|c| c.loaded)
    }

    /// Clips that will participate in the next export, in timeline order.
    pub fn exportable(&self) -> impl Iterator<Item = &Clip> {
        self.clips.iter().filter(|c| c.is_exportable())
    }

    /// Register manual clips, skipping paths already present.
    pub fn add_clips(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        for path in paths {
            if self.get(&path).is_some() {
                continue;
            }
            self.clips.push(Clip::new(path, ClipSource::Manual));
            self.touch();
        }
    }

    /// Register a replay-buffer capture.
    pub fn add_replay_clip(&mut self, path: PathBuf, stream_id: Option<String>) {
        if self.get(&path).is_some() {
            return;
        }
        let mut clip = Clip::new(path, ClipSource::ReplayBuffer);
        clip.stream_id = stream_id;
        self.clips.push(clip);
        self.touch();
    }

    /// Register detected highlight clips, skipping paths already present.
    pub fn add_ai_clips(
        &mut self,
        clips: impl IntoIterator<Item = (PathBuf, AiClipInfo)>,
        stream_id: Option<String>,
    ) {
        for (path, info) in clips {
            if self.get(&path).is_some() {
                continue;
            }
            let mut clip = Clip::new(path, ClipSource::AiDetected(info));
            clip.stream_id = stream_id.clone();
            self.clips.push(clip);
            self.touch();
        }
    }

    /// Remove a clip.
    pub fn remove(&mut self, path: &Path) {
        let before = self.clips.len();
        self.clips.retain(|c| !c.matches_path(path));
        if self.clips.len() != before {
            self.touch();
        }
    }

    /// Remove a stream and every clip captured from it.
    pub fn remove_stream(&mut self, stream_id: &str) {
        let before = self.clips.len();
        self.clips
            .retain(|c| c.stream_id.as_deref() != Some(stream_id));
        if self.clips.len() != before {
            self.touch();
        }
    }

    /// Replace the timeline order. The new order must be a permutation of the
    /// current clip paths.
    pub fn set_order(&mut self, order: &[PathBuf]) -> CutResult<()> {
        if order.len() != self.clips.len() {
            return Err(CutError::validation(
                "clip order must contain every registered clip exactly once",
            ));
        }
        let mut reordered = Vec::with_capacity(self.clips.len());
        for path in order {
            let idx = self
                .clips
                .iter()
                .position(|c| c.matches_path(path))
                .ok_or_else(|| {
                    CutError::validation(format!("unknown clip in order: '{}'", path.display()))
                })?;
            reordered.push(self.clips.remove(idx));
        }
        self.clips = reordered;
        self.touch();
        Ok(())
    }

    /// Enable or disable a clip.
    pub fn set_enabled(&mut self, path: &Path, enabled: bool) -> CutResult<()> {
        let clip = self.get_mut(path)?;
        clip.enabled = enabled;
        self.touch();
        Ok(())
    }

    /// Set the start trim, holding `0 <= start_trim + end_trim < duration`.
    pub fn set_start_trim(&mut self, path: &Path, trim: f64) -> CutResult<()> {
        let clip = self.get_mut(path)?;
        validate_trims(trim, clip.end_trim, clip.duration)?;
        clip.start_trim = trim;
        self.touch();
        Ok(())
    }

    /// Set the end trim, holding `0 <= start_trim + end_trim < duration`.
    pub fn set_end_trim(&mut self, path: &Path, trim: f64) -> CutResult<()> {
        let clip = self.get_mut(path)?;
        validate_trims(clip.start_trim, trim, clip.duration)?;
        clip.end_trim = trim;
        self.touch();
        Ok(())
    }

    /// Record a successful load: duration and scrub sprite become known.
    pub fn mark_loaded(&mut self, path: &Path, duration: f64, scrub_sprite: Option<PathBuf>) {
        if let Ok(clip) = self.get_mut(path) {
            clip.loaded = true;
            clip.duration = Some(duration);
            clip.scrub_sprite = scrub_sprite;
            self.touch();
        }
    }

    /// Record that the backing file disappeared. The clip stays registered
    /// but is excluded from exports.
    pub fn mark_deleted(&mut self, path: &Path) {
        if let Ok(clip) = self.get_mut(path) {
            clip.deleted = true;
            // Deleted clips count as load-finished: there is nothing left to probe.
            clip.loaded = true;
            self.touch();
        }
    }

    fn get_mut(&mut self, path: &Path) -> CutResult<&mut Clip> {
        self.clips
            .iter_mut()
            .find(|c| c.matches_path(path))
            .ok_or_else(|| {
                CutError::validation(format!("no clip registered at '{}'", path.display()))
            })
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

fn validate_trims(start: f64, end: f64, duration: Option<f64>) -> CutResult<()> {
    if !start.is_finite() || !end.is_finite() || start < 0.0 || end < 0.0 {
        return Err(CutError::validation("trims must be finite and >= 0"));
    }
    if let Some(d) = duration
        && start + end >= d
    {
        return Err(CutError::validation(format!(
            "trims ({start}s + {end}s) must leave part of the {d}s clip"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(paths: &[&str]) -> ClipRegistry {
        let mut reg = ClipRegistry::new();
        reg.add_clips(paths.iter().map(PathBuf::from));
        reg
    }

    #[test]
    fn add_clips_dedups_by_path() {
        let mut reg = registry_with(&["a.mp4", "b.mp4"]);
        reg.add_clips([PathBuf::from("a.mp4")]);
        assert_eq!(reg.clips().len(), 2);
    }

    #[test]
    fn every_mutation_bumps_revision() {
        let mut reg = registry_with(&["a.mp4"]);
        let r0 = reg.revision();
        reg.mark_loaded(Path::new("a.mp4"), 10.0, None);
        let r1 = reg.revision();
        assert!(r1 > r0);
        reg.set_start_trim(Path::new("a.mp4"), 1.0).unwrap();
        assert!(reg.revision() > r1);
    }

    #[test]
    fn trims_may_not_consume_the_whole_clip() {
        let mut reg = registry_with(&["a.mp4"]);
        reg.mark_loaded(Path::new("a.mp4"), 10.0, None);
        reg.set_start_trim(Path::new("a.mp4"), 4.0).unwrap();
        assert!(reg.set_end_trim(Path::new("a.mp4"), 6.0).is_err());
        assert!(reg.set_end_trim(Path::new("a.mp4"), 5.9).is_ok());
        assert!(reg.set_start_trim(Path::new("a.mp4"), -1.0).is_err());
    }

    #[test]
    fn set_order_requires_a_permutation() {
        let mut reg = registry_with(&["a.mp4", "b.mp4", "c.mp4"]);
        assert!(reg.set_order(&[PathBuf::from("a.mp4")]).is_err());
        assert!(
            reg.set_order(&[
                PathBuf::from("c.mp4"),
                PathBuf::from("a.mp4"),
                PathBuf::from("x.mp4"),
            ])
            .is_err()
        );

        reg.set_order(&[
            PathBuf::from("c.mp4"),
            PathBuf::from("a.mp4"),
            PathBuf::from("b.mp4"),
        ])
        .unwrap();
        let order: Vec<_> = reg.clips().iter().map(|c| c.path.clone()).collect();
        assert_eq!(
            order,
            vec![
                PathBuf::from("c.mp4"),
                PathBuf::from("a.mp4"),
                PathBuf::from("b.mp4")
            ]
        );
    }

    #[test]
    fn remove_stream_drops_its_clips_only() {
        let mut reg = ClipRegistry::new();
        reg.add_replay_clip(PathBuf::from("s1-a.mp4"), Some("s1".into()));
        reg.add_replay_clip(PathBuf::from("s1-b.mp4"), Some("s1".into()));
        reg.add_clips([PathBuf::from("manual.mp4")]);

        reg.remove_stream("s1");
        assert_eq!(reg.clips().len(), 1);
        assert_eq!(reg.clips()[0].path, PathBuf::from("manual.mp4"));
    }

    #[test]
    fn deleted_clips_are_excluded_but_count_as_loaded() {
        let mut reg = registry_with(&["a.mp4", "b.mp4"]);
        reg.mark_loaded(Path::new("a.mp4"), 5.0, None);
        assert!(!reg.all_enabled_loaded());

        reg.mark_deleted(Path::new("b.mp4"));
        assert!(reg.all_enabled_loaded());
        assert_eq!(reg.exportable().count(), 1);
    }
}
