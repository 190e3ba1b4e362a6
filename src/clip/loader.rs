use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::clip::ClipRegistry;
use crate::foundation::error::{CutError, CutResult};
use crate::media::{SourceInfo, probe_source};

/// Container extensions the loader accepts.
pub const SUPPORTED_FILE_TYPES: &[&str] = &["mp4", "mov", "mkv", "webm"];

const SPRITE_THUMB_WIDTH: u32 = 160;
const SPRITE_THUMB_HEIGHT: u32 = 90;
const SPRITE_THUMB_COUNT: u32 = 10;

/// Where and how scrub sprites are generated during load.
#[derive(Clone, Debug)]
pub struct LoadOptions {
    /// Directory scrub sprites are written into (created if missing).
    pub sprite_dir: PathBuf,
    /// Skip sprite generation entirely (headless/preview tooling).
    pub skip_sprites: bool,
}

impl LoadOptions {
    /// Generate sprites into `sprite_dir`.
    pub fn new(sprite_dir: impl Into<PathBuf>) -> Self {
        Self {
            sprite_dir: sprite_dir.into(),
            skip_sprites: false,
        }
    }

    /// Probe only, without sprite generation.
    pub fn without_sprites(mut self) -> Self {
        self.skip_sprites = true;
        self
    }
}

/// What happened during one [`load_clips`] pass.
#[derive(Clone, Debug, Default)]
pub struct LoadReport {
    /// Clips probed and marked loaded in this pass.
    pub loaded: Vec<PathBuf>,
    /// Clips whose backing file was gone; marked deleted, not removed.
    pub deleted: Vec<PathBuf>,
    /// Clips removed because their container format is unsupported.
    pub unsupported: Vec<PathBuf>,
}

struct LoadedClip {
    duration: f64,
    sprite: Option<PathBuf>,
}

/// Probe all not-yet-loaded clips and generate their scrub sprites.
///
/// Probing fans out across the rayon pool since each clip is independent.
/// Pass `stream_id` to restrict the pass to one stream's clips.
pub fn load_clips(
    registry: &mut ClipRegistry,
    opts: &LoadOptions,
    stream_id: Option<&str>,
) -> CutResult<LoadReport> {
    let mut report = LoadReport::default();

    let mut pending = Vec::new();
    for clip in registry.clips() {
        if clip.loaded {
            continue;
        }
        if let Some(id) = stream_id
            && clip.stream_id.as_deref() != Some(id)
        {
            continue;
        }
        if !has_supported_extension(&clip.path) {
            report.unsupported.push(clip.path.clone());
            continue;
        }
        pending.push(clip.path.clone());
    }

    for path in &report.unsupported {
        registry.remove(path);
    }

    if pending.is_empty() {
        return Ok(report);
    }

    if !opts.skip_sprites {
        std::fs::create_dir_all(&opts.sprite_dir).map_err(|e| {
            CutError::media(format!(
                "failed to create sprite directory '{}': {e}",
                opts.sprite_dir.display()
            ))
        })?;
    }

    let outcomes: Vec<(PathBuf, CutResult<LoadedClip>)> = pending
        .into_par_iter()
        .map(|path| {
            let outcome = load_one(&path, opts);
            (path, outcome)
        })
        .collect();

    for (path, outcome) in outcomes {
        match outcome {
            Ok(loaded) => {
                registry.mark_loaded(&path, loaded.duration, loaded.sprite);
                report.loaded.push(path);
            }
            Err(err) if err.is_clip_recoverable() => {
                tracing::warn!(path = %path.display(), "clip vanished during load");
                registry.mark_deleted(&path);
                report.deleted.push(path);
            }
            Err(err) => return Err(err),
        }
    }

    Ok(report)
}

fn load_one(path: &Path, opts: &LoadOptions) -> CutResult<LoadedClip> {
    let info = probe_source(path)?;

    let sprite = if opts.skip_sprites {
        None
    } else {
        match generate_scrub_sprite(&info, &opts.sprite_dir) {
            Ok(sprite) => Some(sprite),
            Err(err) => {
                // A clip without a scrub sprite is still exportable.
                tracing::warn!(path = %path.display(), error = %err, "scrub sprite generation failed");
                None
            }
        }
    };

    Ok(LoadedClip {
        duration: info.duration_sec,
        sprite,
    })
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            SUPPORTED_FILE_TYPES.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Decode evenly spaced thumbnails and tile them into one horizontal JPEG
/// strip used by scrub previews.
fn generate_scrub_sprite(info: &SourceInfo, sprite_dir: &Path) -> CutResult<PathBuf> {
    let thumb_len = (SPRITE_THUMB_WIDTH * SPRITE_THUMB_HEIGHT * 4) as usize;
    let mut strip =
        vec![0u8; thumb_len * SPRITE_THUMB_COUNT as usize];

    for i in 0..SPRITE_THUMB_COUNT {
        let t = info.duration_sec * (f64::from(i) + 0.5) / f64::from(SPRITE_THUMB_COUNT);
        let frame = decode_thumb_rgba(&info.path, t)?;
        blit_thumb(&mut strip, &frame, i);
    }

    // JPEG output: drop the (always opaque) alpha channel.
    let mut rgb = Vec::with_capacity(strip.len() / 4 * 3);
    for px in strip.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
    }

    let out_path = sprite_dir.join(sprite_file_name(&info.path));
    image::save_buffer_with_format(
        &out_path,
        &rgb,
        SPRITE_THUMB_WIDTH * SPRITE_THUMB_COUNT,
        SPRITE_THUMB_HEIGHT,
        image::ColorType::Rgb8,
        image::ImageFormat::Jpeg,
    )
    .map_err(|e| CutError::media(format!("failed to write scrub sprite: {e}")))?;

    Ok(out_path)
}

fn decode_thumb_rgba(path: &Path, at_sec: f64) -> CutResult<Vec<u8>> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &format!("{at_sec:.6}")])
        .arg("-i")
        .arg(path)
        .args([
            "-frames:v",
            "1",
            "-vf",
            &format!("scale={SPRITE_THUMB_WIDTH}:{SPRITE_THUMB_HEIGHT}"),
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "pipe:1",
        ])
        .output()
        .map_err(|e| CutError::media(format!("failed to run ffmpeg for thumbnail: {e}")))?;

    if !out.status.success() {
        return Err(CutError::media(format!(
            "thumbnail decode failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let expected = (SPRITE_THUMB_WIDTH * SPRITE_THUMB_HEIGHT * 4) as usize;
    if out.stdout.len() < expected {
        return Err(CutError::media(format!(
            "thumbnail decode returned {} bytes, expected {expected}",
            out.stdout.len()
        )));
    }
    Ok(out.stdout[..expected].to_vec())
}

fn blit_thumb(strip: &mut [u8], thumb: &[u8], index: u32) {
    let strip_stride = (SPRITE_THUMB_WIDTH * SPRITE_THUMB_COUNT * 4) as usize;
    let thumb_stride = (SPRITE_THUMB_WIDTH * 4) as usize;
    let x_off = (index * SPRITE_THUMB_WIDTH * 4) as usize;

    for row in 0..SPRITE_THUMB_HEIGHT as usize {
        let src = &thumb[row * thumb_stride..(row + 1) * thumb_stride];
        let dst_start = row * strip_stride + x_off;
        strip[dst_start..dst_start + thumb_stride].copy_from_slice(src);
    }
}

fn sprite_file_name(clip_path: &Path) -> String {
    let stem = clip_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("clip");
    let hash = xxhash_rust::xxh3::xxh3_64(clip_path.to_string_lossy().as_bytes());
    format!("{stem}-{hash:016x}.jpg")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_filter_is_case_insensitive() {
        assert!(has_supported_extension(Path::new("a.MP4")));
        assert!(has_supported_extension(Path::new("b.mkv")));
        assert!(!has_supported_extension(Path::new("c.avi")));
        assert!(!has_supported_extension(Path::new("noext")));
    }

    #[test]
    fn sprite_names_are_distinct_for_same_stem() {
        let a = sprite_file_name(Path::new("/streams/s1/Replay.mp4"));
        let b = sprite_file_name(Path::new("/streams/s2/Replay.mp4"));
        assert_ne!(a, b);
        assert!(a.starts_with("Replay-"));
        assert!(a.ends_with(".jpg"));
    }

    #[test]
    fn blit_places_thumb_at_column_offset() {
        let thumb_len = (SPRITE_THUMB_WIDTH * SPRITE_THUMB_HEIGHT * 4) as usize;
        let mut strip = vec![0u8; thumb_len * SPRITE_THUMB_COUNT as usize];
        let thumb = vec![7u8; thumb_len];
        blit_thumb(&mut strip, &thumb, 1);

        let strip_stride = (SPRITE_THUMB_WIDTH * SPRITE_THUMB_COUNT * 4) as usize;
        let x_off = (SPRITE_THUMB_WIDTH * 4) as usize;
        // First row: column 0 untouched, column 1 filled.
        assert_eq!(strip[0], 0);
        assert_eq!(strip[x_off], 7);
        // Second row too.
        assert_eq!(strip[strip_stride], 0);
        assert_eq!(strip[strip_stride + x_off], 7);
    }

    #[test]
    fn unsupported_clips_are_removed_with_report() {
        let mut reg = ClipRegistry::new();
        reg.add_clips([PathBuf::from("a.avi"), PathBuf::from("b.txt")]);
        let opts = LoadOptions::new(std::env::temp_dir()).without_sprites();
        let report = load_clips(&mut reg, &opts, None).unwrap();
        assert_eq!(report.unsupported.len(), 2);
        assert!(reg.clips().is_empty());
    }
}
