use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use chrono::{Duration, Utc};
use tempfile::TempDir;

use snapkeep::config::Config;
use snapkeep::naming::{self, SnapshotKind};
use snapkeep::{BackupError, BackupService, CatalogIndex, SnapshotRecord};

fn open(root: &Path) -> (BackupService, Config) {
    let config = Config::rooted(root);
    let service = BackupService::open(&config).unwrap();
    (service, config)
}

/// Place a snapshot file and its catalog record `age_days` in the past.
fn seed_aged(config: &Config, age_days: i64) -> SnapshotRecord {
    let at = Utc::now() - Duration::days(age_days);
    let filename = naming::snapshot_filename(SnapshotKind::Regular, at);
    fs::write(config.snapshot_dir.join(&filename), vec![7u8; 512]).unwrap();

    let record = SnapshotRecord::new(filename, 512, at, SnapshotKind::Regular);
    CatalogIndex::open(&config.catalog_path)
        .unwrap()
        .insert(&record)
        .unwrap();
    record
}

#[test]
fn create_copies_live_store_byte_for_byte() {
    let tmp = TempDir::new().unwrap();
    let (service, config) = open(tmp.path());

    let live_bytes: Vec<u8> = (0..204_800u32).map(|i| (i % 251) as u8).collect();
    fs::write(&config.live_path, &live_bytes).unwrap();

    let record = service.create().unwrap();
    assert_eq!(record.size_bytes, 204_800);
    assert_eq!(record.status, "completed");

    let on_disk = config.snapshot_dir.join(&record.filename);
    assert_eq!(fs::metadata(&on_disk).unwrap().len(), 204_800);
    assert_eq!(fs::read(&on_disk).unwrap(), live_bytes);
}

#[test]
fn quick_successive_creates_get_distinct_files() {
    let tmp = TempDir::new().unwrap();
    let (service, config) = open(tmp.path());
    fs::write(&config.live_path, b"data").unwrap();

    let mut names: Vec<String> = (0..5).map(|_| service.create().unwrap().filename).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 5);
    assert_eq!(service.list().unwrap().len(), 5);
}

#[test]
fn restore_reproduces_snapshot_and_appends_one_safety_record() {
    let tmp = TempDir::new().unwrap();
    let (service, config) = open(tmp.path());

    fs::write(&config.live_path, b"state at noon").unwrap();
    let noon = service.create().unwrap();
    fs::write(&config.live_path, b"state at five, after a bad import").unwrap();

    let before = service.list().unwrap().len();
    let generation = service.live().generation();

    let outcome = service.restore(&noon.id).unwrap();
    assert!(outcome.requires_reload);
    assert!(service.live().is_stale(generation));
    assert_eq!(fs::read(&config.live_path).unwrap(), b"state at noon");

    let records = service.list().unwrap();
    assert_eq!(records.len(), before + 1);
    let safety: Vec<_> = records
        .iter()
        .filter(|r| r.kind == SnapshotKind::PreRestoreSafety)
        .collect();
    assert_eq!(safety.len(), 1);
    assert_eq!(
        fs::read(config.snapshot_dir.join(&safety[0].filename)).unwrap(),
        b"state at five, after a bad import"
    );
}

#[test]
fn restore_unknown_id_leaves_live_store_untouched() {
    let tmp = TempDir::new().unwrap();
    let (service, config) = open(tmp.path());
    fs::write(&config.live_path, b"precious").unwrap();

    let err = service.restore("does-not-exist").unwrap_err();
    assert!(matches!(err, BackupError::NotFound(_)));
    assert_eq!(fs::read(&config.live_path).unwrap(), b"precious");
    assert!(service.list().unwrap().is_empty());
}

#[test]
fn cleanup_keeps_only_records_inside_retention() {
    let tmp = TempDir::new().unwrap();
    let (_, config) = open(tmp.path());

    let old = seed_aged(&config, 20);
    let young = seed_aged(&config, 10);
    let older = seed_aged(&config, 16);

    let (service, _) = open(tmp.path());
    let report = service.cleanup(15).unwrap();
    assert_eq!(report.deleted_count, 2);
    assert_eq!(report.bytes_freed, 1024);
    assert!(report.errors.is_empty());

    let remaining = service.list().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, young.id);
    assert!(!config.snapshot_dir.join(&old.filename).exists());
    assert!(!config.snapshot_dir.join(&older.filename).exists());
    assert!(config.snapshot_dir.join(&young.filename).exists());
}

#[test]
fn verify_reports_orphans_on_both_sides() {
    let tmp = TempDir::new().unwrap();
    let (service, config) = open(tmp.path());
    fs::write(&config.live_path, b"live").unwrap();

    let a = service.create().unwrap();
    let b = service.create().unwrap();
    let dangling = service.create().unwrap();
    fs::remove_file(config.snapshot_dir.join(&dangling.filename)).unwrap();

    for name in [
        "backup-2025-01-01T00-00-00-000000Z.snapshot",
        "backup-2025-01-02T00-00-00-000000Z.snapshot",
        "backup-before-restore-2025-01-03T00-00-00-000000Z.snapshot",
    ] {
        fs::write(config.snapshot_dir.join(name), b"stray").unwrap();
    }

    let report = service.verify().unwrap();
    assert_eq!(report.file_count, 5);
    assert_eq!(report.record_count, 3);
    assert_eq!(report.orphan_files.len(), 3);
    assert!(!report.orphan_files.contains(&a.filename));
    assert!(!report.orphan_files.contains(&b.filename));
    assert_eq!(report.orphan_records.len(), 1);
    assert_eq!(report.orphan_records[0].id, dangling.id);

    let again = service.verify().unwrap();
    assert_eq!(report.orphan_files, again.orphan_files);
    assert_eq!(report.orphan_records, again.orphan_records);
}

#[test]
fn sync_then_verify_leaves_no_orphan_files() {
    let tmp = TempDir::new().unwrap();
    let (service, config) = open(tmp.path());

    fs::write(
        config.snapshot_dir.join("backup-2025-03-01T08-00-00-250Z.snapshot"),
        b"restored from another host",
    )
    .unwrap();
    fs::write(config.snapshot_dir.join("backup-hand-made.snapshot"), b"x").unwrap();
    fs::write(config.snapshot_dir.join("README.txt"), b"not a snapshot").unwrap();

    let first = service.sync().unwrap();
    assert_eq!(first.registered.len(), 2);

    let second = service.sync().unwrap();
    assert!(second.registered.is_empty());

    let report = service.verify().unwrap();
    assert!(report.orphan_files.is_empty());
    assert!(report.is_consistent());
    assert_eq!(service.list().unwrap().len(), 2);
}

#[test]
fn catalog_survives_restore_of_live_store() {
    let tmp = TempDir::new().unwrap();
    let (service, config) = open(tmp.path());
    fs::write(&config.live_path, b"v1").unwrap();

    let first = service.create().unwrap();
    fs::write(&config.live_path, b"v2").unwrap();
    service.create().unwrap();
    service.restore(&first.id).unwrap();
    drop(service);

    let (reopened, _) = open(tmp.path());
    assert_eq!(reopened.list().unwrap().len(), 3);
    assert!(reopened.verify().unwrap().is_consistent());
}

#[test]
fn concurrent_creates_and_cleanup_stay_consistent() {
    let tmp = TempDir::new().unwrap();
    let (service, config) = open(tmp.path());
    fs::write(&config.live_path, vec![1u8; 64 * 1024]).unwrap();
    let service = Arc::new(service);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for _ in 0..5 {
                    if i == 0 {
                        service.cleanup(15).unwrap();
                    } else {
                        service.create().unwrap();
                    }
                    service.verify().unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let report = service.verify().unwrap();
    assert!(report.is_consistent());
    assert_eq!(report.record_count, 15);
}

#[test]
fn restores_interleaved_with_creates_never_capture_a_torn_live_store() {
    let tmp = TempDir::new().unwrap();
    let (service, config) = open(tmp.path());

    let state_a = vec![b'a'; 256 * 1024];
    let state_b = vec![b'b'; 384 * 1024];

    fs::write(&config.live_path, &state_a).unwrap();
    let snap_a = service.create().unwrap();
    fs::write(&config.live_path, &state_b).unwrap();
    let snap_b = service.create().unwrap();

    let service = Arc::new(service);
    let restorer = {
        let service = Arc::clone(&service);
        let ids = [snap_a.id.clone(), snap_b.id.clone()];
        thread::spawn(move || {
            for round in 0..6 {
                let outcome = service.restore(&ids[round % 2]).unwrap();
                assert!(outcome.safety_snapshot.is_some());
            }
        })
    };
    let creators: Vec<_> = (0..3)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for _ in 0..4 {
                    service.create().unwrap();
                }
            })
        })
        .collect();

    restorer.join().unwrap();
    for handle in creators {
        handle.join().unwrap();
    }

    // 2 seeds, 12 creates, 6 safety copies
    let records = service.list().unwrap();
    assert_eq!(records.len(), 20);
    for record in &records {
        let bytes = fs::read(config.snapshot_dir.join(&record.filename)).unwrap();
        assert!(
            bytes == state_a || bytes == state_b,
            "{} holds a partial live store ({} bytes)",
            record.filename,
            bytes.len()
        );
        assert_eq!(record.size_bytes, bytes.len() as u64);
    }

    let live = fs::read(&config.live_path).unwrap();
    assert_eq!(live, state_b);
    assert!(service.verify().unwrap().is_consistent());
}
