use std::path::PathBuf;

use reelcut::{
    ClipRegistry, ExportConfig, ExportState, Exporter, LoadOptions, TransitionSettings,
    TransitionType, load_clips,
};

fn temp_dir(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("reelcut-{tag}-{}", std::process::id()))
}

#[test]
fn vanished_clips_flow_through_load_and_export_as_failures_not_crashes() {
    let mut registry = ClipRegistry::new();
    registry.add_clips([
        PathBuf::from("/definitely/not/here/a.mp4"),
        PathBuf::from("/definitely/not/here/b.mp4"),
    ]);

    // Load marks both deleted (the files do not exist) without failing.
    let opts = LoadOptions::new(temp_dir("sprites")).without_sprites();
    let report = load_clips(&mut registry, &opts, None).unwrap();
    assert_eq!(report.deleted.len(), 2);
    assert!(report.loaded.is_empty());
    assert!(registry.all_enabled_loaded());

    // Export then fails the run cleanly: nothing is left to stitch.
    let mut exporter = Exporter::new(ExportConfig::new(temp_dir("out").join("Output.mp4")));
    let summary = exporter
        .export(&mut registry, false, &mut reelcut::export::NullProgress)
        .unwrap();
    assert_eq!(summary.state, ExportState::Failed);
    assert!(summary.error.is_some());
    assert_eq!(exporter.state(), ExportState::Idle);
}

#[test]
fn disabling_a_clip_shrinks_the_expected_timeline() {
    use reelcut::export::{ClipPlan, expected_frames};

    let transition = TransitionSettings::new(TransitionType::Fade, 2.0).unwrap();
    let plan = |name: &str, trimmed: f64| ClipPlan {
        path: PathBuf::from(name),
        start_trim: 0.0,
        trimmed_duration: trimmed,
    };

    let all = [plan("a", 10.0), plan("b", 8.0), plan("c", 12.0)];
    assert_eq!(expected_frames(&all, &transition, 30), 780);

    // Dropping the middle clip removes its frames and one boundary.
    let without_b = [plan("a", 10.0), plan("c", 12.0)];
    assert_eq!(expected_frames(&without_b, &transition, 30), 600);

    // A single clip has no boundaries at all.
    assert_eq!(expected_frames(&all[..1], &transition, 30), 300);
}

#[test]
fn trim_edits_invalidate_a_previous_export() {
    let mut registry = ClipRegistry::new();
    registry.add_clips([PathBuf::from("a.mp4")]);
    registry.mark_loaded(std::path::Path::new("a.mp4"), 30.0, None);

    let exporter = Exporter::new(ExportConfig::new("/tmp/Output.mp4"));
    // Fresh exporter has no successful run recorded.
    assert!(!exporter.is_exported(&registry));

    let before = registry.revision();
    registry.set_start_trim(std::path::Path::new("a.mp4"), 2.0).unwrap();
    assert_ne!(before, registry.revision());
}
