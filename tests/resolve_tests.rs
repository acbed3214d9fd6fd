//! End-to-end resolution: detection output driven through a session.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use image::{Rgb, RgbImage};
use tempfile::TempDir;

use mediadupe::cluster::{cluster_all, Cluster, ClusterConfig};
use mediadupe::media::{MediaFile, MediaKind};
use mediadupe::resolve::{
    AutoKeepBest, Decision, DuplicatesArea, ResolveConfig, ResolveSession, ScriptedDecisions,
};

fn write_bytes(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn area(dir: &TempDir) -> Arc<DuplicatesArea> {
    Arc::new(DuplicatesArea::new(dir.path().join("duplicates")))
}

fn image_cluster(files: Vec<PathBuf>) -> Cluster {
    Cluster {
        kind: MediaKind::Image,
        files,
    }
}

#[test]
fn test_detection_feeds_resolution() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let img = RgbImage::from_fn(64, 64, |x, y| {
        let v = ((x * 3 + y) % 256) as u8;
        Rgb([v, v / 2, v])
    });
    let original = dir.path().join("keep.png");
    img.save(&original)?;
    let copy = dir.path().join("dupe.png");
    fs::copy(&original, &copy)?;

    let files = vec![
        MediaFile::from_path(original.clone()).unwrap(),
        MediaFile::from_path(copy.clone()).unwrap(),
    ];
    let (clusters, _) = cluster_all(files, &ClusterConfig::new())?;
    assert_eq!(clusters.len(), 1);

    let mut session = ResolveSession::new(clusters, ResolveConfig::new(), area(&dir))?;
    let stats = session.run(&mut AutoKeepBest)?;

    assert_eq!(stats.clusters_processed, 1);
    assert_eq!(stats.auto_moves, 1);
    // Exactly one of the two survives in place.
    assert_ne!(original.is_file(), copy.is_file());
    // The other landed under the duplicates area.
    let moved: Vec<_> = walk(&dir.path().join("duplicates"));
    assert_eq!(moved.len(), 1);
    Ok(())
}

#[test]
fn test_skip_leaves_both_files_but_is_undoable() {
    let dir = TempDir::new().unwrap();
    let a = write_bytes(&dir, "a.jpg", &[1u8; 100]);
    let b = write_bytes(&dir, "b.jpg", &[2u8; 50]);

    let config = ResolveConfig::new().with_threshold(0.0);
    let mut session =
        ResolveSession::new(vec![image_cluster(vec![a.clone(), b.clone()])], config, area(&dir))
            .unwrap();

    let mut source = ScriptedDecisions::new(vec![Decision::Skip]);
    let stats = session.run(&mut source).unwrap();

    assert_eq!(stats.skipped_pairs, 1);
    assert!(a.is_file());
    assert!(b.is_file());
    assert_eq!(session.history_len(), 1);

    let report = session.undo().unwrap();
    assert_eq!(report.decision, Decision::Skip);
    assert!(report.restored);
    assert_eq!(session.clusters()[0].files.len(), 2);
}

#[test]
fn test_keep_both_is_not_recorded() {
    let dir = TempDir::new().unwrap();
    let a = write_bytes(&dir, "a.jpg", &[1u8; 100]);
    let b = write_bytes(&dir, "b.jpg", &[2u8; 50]);

    let config = ResolveConfig::new().with_threshold(0.0);
    let mut session =
        ResolveSession::new(vec![image_cluster(vec![a, b])], config, area(&dir)).unwrap();

    let mut source = ScriptedDecisions::new(vec![Decision::KeepBoth]);
    let stats = session.run(&mut source).unwrap();

    assert_eq!(stats.kept_both, 1);
    assert_eq!(session.history_len(), 0);
    assert!(session.undo().is_none());
}

#[test]
fn test_quit_halts_later_clusters_and_keeps_earlier_moves() {
    let dir = TempDir::new().unwrap();
    let a = write_bytes(&dir, "a.jpg", &[1u8; 100]);
    let b = write_bytes(&dir, "b.jpg", &[2u8; 50]);
    let c = write_bytes(&dir, "c.jpg", &[3u8; 100]);
    let d = write_bytes(&dir, "d.jpg", &[4u8; 50]);

    let clusters = vec![
        image_cluster(vec![a.clone(), b.clone()]),
        image_cluster(vec![c.clone(), d.clone()]),
    ];
    let config = ResolveConfig::new().with_threshold(0.0);
    let mut session = ResolveSession::new(clusters, config, area(&dir)).unwrap();

    let mut source = ScriptedDecisions::new(vec![Decision::KeepLeft, Decision::Quit]);
    let stats = session.run(&mut source).unwrap();

    assert!(stats.halted);
    assert_eq!(stats.clusters_processed, 1);
    assert_eq!(stats.decided_moves, 1);
    // First cluster's loser moved; second cluster untouched.
    assert!(a.is_file());
    assert!(!b.is_file());
    assert!(c.is_file());
    assert!(d.is_file());
    // A later run resumes at the interrupted cluster.
    assert_eq!(session.cursor(), 1);

    let mut resume = ScriptedDecisions::new(vec![Decision::KeepLeft]);
    let resumed = session.run(&mut resume).unwrap();
    assert_eq!(resumed.clusters_processed, 1);
    assert!(!d.is_file());
}

#[test]
fn test_undo_rewinds_cursor_across_clusters() {
    let dir = TempDir::new().unwrap();
    let a = write_bytes(&dir, "a.jpg", &[1u8; 64]);
    let a_copy = write_bytes(&dir, "a_copy.jpg", &[1u8; 64]);
    let b = write_bytes(&dir, "b.jpg", &[2u8; 64]);
    let b_copy = write_bytes(&dir, "b_copy.jpg", &[2u8; 64]);

    let clusters = vec![
        image_cluster(vec![a, a_copy.clone()]),
        image_cluster(vec![b, b_copy.clone()]),
    ];
    let mut session =
        ResolveSession::new(clusters, ResolveConfig::new(), area(&dir)).unwrap();
    let stats = session.run(&mut AutoKeepBest).unwrap();

    assert_eq!(stats.auto_moves, 2);
    assert_eq!(session.cursor(), 2);

    // Latest action first: the second cluster's move comes back.
    let report = session.undo().unwrap();
    assert!(report.restored);
    assert!(b_copy.is_file());
    assert!(!a_copy.is_file());
    assert_eq!(session.cursor(), 1);

    let report = session.undo().unwrap();
    assert!(report.restored);
    assert!(a_copy.is_file());
    assert_eq!(session.cursor(), 0);
}

#[test]
fn test_resolution_report_serializes() {
    let dir = TempDir::new().unwrap();
    let a = write_bytes(&dir, "a.jpg", &[9u8; 32]);
    let a_copy = write_bytes(&dir, "a_copy.jpg", &[9u8; 32]);

    let mut session = ResolveSession::new(
        vec![image_cluster(vec![a, a_copy])],
        ResolveConfig::new(),
        area(&dir),
    )
    .unwrap();
    let stats = session.run(&mut AutoKeepBest).unwrap();

    let json = serde_json::to_value(stats).unwrap();
    assert_eq!(json["auto_moves"], 1);
    assert_eq!(json["halted"], false);
}

fn walk(root: &std::path::Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    out
}
