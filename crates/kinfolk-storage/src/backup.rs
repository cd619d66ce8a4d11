//! Throttled database backups
//!
//! A backup is a copy of the database file named
//! `kinfolk_backup_<YYYYmmdd_HHMMSS>.<ext>`. A JSON log next to the copies
//! records when and why each one was taken, which also lets the automatic
//! throttle survive process restarts.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};

pub const BACKUP_PREFIX: &str = "kinfolk_backup_";
pub const DEFAULT_MAX_BACKUPS: usize = 100;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

const LOG_FILE: &str = "backup_log.json";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Why a backup was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupTrigger {
    Manual,
    Auto,
    /// Safety copy taken just before a restore overwrites the database
    PreRestore,
}

impl std::fmt::Display for BackupTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
            Self::PreRestore => "pre_restore",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LogEntry {
    name: String,
    created_at: DateTime<Utc>,
    trigger: BackupTrigger,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

/// A backup file on disk
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    /// `None` for copies that are missing from the log
    pub trigger: Option<BackupTrigger>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BackupStats {
    pub count: usize,
    pub total_size: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub last_auto: Option<DateTime<Utc>>,
    pub max_backups: usize,
    pub interval_secs: u64,
}

/// Creates, lists, restores and prunes backups of one database file
pub struct BackupManager {
    dir: PathBuf,
    source: PathBuf,
    interval: Duration,
    max_backups: usize,
    last_auto: Option<DateTime<Utc>>,
}

impl BackupManager {
    /// Manage backups of `source` stored in `dir`, creating `dir` if needed
    pub fn new(dir: impl Into<PathBuf>, source: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut manager = Self {
            dir,
            source: source.into(),
            interval: DEFAULT_INTERVAL,
            max_backups: DEFAULT_MAX_BACKUPS,
            last_auto: None,
        };
        manager.last_auto = manager
            .read_log()?
            .iter()
            .filter(|entry| entry.trigger == BackupTrigger::Auto)
            .map(|entry| entry.created_at)
            .max();
        Ok(manager)
    }

    /// Minimum time between two automatic backups
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Number of backups kept; the oldest are pruned beyond it
    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn last_auto(&self) -> Option<DateTime<Utc>> {
        self.last_auto
    }

    pub fn create_backup(
        &mut self,
        trigger: BackupTrigger,
        description: Option<&str>,
    ) -> StorageResult<BackupInfo> {
        self.create_backup_at(Utc::now(), trigger, description)
    }

    pub fn create_backup_at(
        &mut self,
        now: DateTime<Utc>,
        trigger: BackupTrigger,
        description: Option<&str>,
    ) -> StorageResult<BackupInfo> {
        let info = self.write_backup(now, trigger, description)?;
        self.prune()?;
        Ok(info)
    }

    /// Take an automatic backup unless the previous one is younger than
    /// the interval
    pub fn auto_backup(&mut self, description: Option<&str>) -> StorageResult<Option<BackupInfo>> {
        self.auto_backup_at(Utc::now(), description)
    }

    pub fn auto_backup_at(
        &mut self,
        now: DateTime<Utc>,
        description: Option<&str>,
    ) -> StorageResult<Option<BackupInfo>> {
        if let Some(last) = self.last_auto {
            // A clock that went backwards counts as too soon
            let due = (now - last)
                .to_std()
                .map_or(false, |elapsed| elapsed >= self.interval);
            if !due {
                debug!("Skipping automatic backup, last one at {}", last);
                return Ok(None);
            }
        }
        self.create_backup_at(now, BackupTrigger::Auto, description)
            .map(Some)
    }

    /// Backups on disk, newest first
    pub fn list_backups(&self) -> StorageResult<Vec<BackupInfo>> {
        let log = self.read_log()?;
        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(BACKUP_PREFIX) {
                continue;
            }
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            let logged = log.iter().find(|l| l.name == name);
            let created_at = match logged {
                Some(l) => l.created_at,
                None => match timestamp_from_name(&name) {
                    Some(ts) => ts,
                    None => DateTime::<Utc>::from(metadata.modified()?),
                },
            };
            backups.push(BackupInfo {
                path: entry.path(),
                size: metadata.len(),
                created_at,
                trigger: logged.map(|l| l.trigger),
                description: logged.and_then(|l| l.description.clone()),
                name,
            });
        }

        backups.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(backups)
    }

    /// Replace the database with a backup, saving a safety copy first.
    ///
    /// Returns the safety copy, or `None` when there was no database to
    /// save.
    pub fn restore_backup(&mut self, name: &str) -> StorageResult<Option<BackupInfo>> {
        let path = self.backup_path(name)?;

        let safety = if self.source.exists() {
            let description = format!("Before restoring {}", name);
            Some(self.write_backup(Utc::now(), BackupTrigger::PreRestore, Some(&description))?)
        } else {
            None
        };

        fs::copy(&path, &self.source)?;
        info!("Restored database from backup {}", name);

        self.prune()?;
        Ok(safety)
    }

    pub fn delete_backup(&mut self, name: &str) -> StorageResult<()> {
        let path = self.backup_path(name)?;
        fs::remove_file(&path)?;

        let mut log = self.read_log()?;
        log.retain(|entry| entry.name != name);
        self.write_log(&log)?;

        debug!("Deleted backup {}", name);
        Ok(())
    }

    /// Delete the oldest backups beyond the configured maximum
    pub fn prune(&mut self) -> StorageResult<usize> {
        let backups = self.list_backups()?;
        if backups.len() <= self.max_backups {
            return Ok(0);
        }

        let stale: Vec<&BackupInfo> = backups.iter().skip(self.max_backups).collect();
        for backup in &stale {
            fs::remove_file(&backup.path)?;
        }
        let mut log = self.read_log()?;
        log.retain(|entry| !stale.iter().any(|b| b.name == entry.name));
        self.write_log(&log)?;

        info!("Pruned {} old backups", stale.len());
        Ok(stale.len())
    }

    pub fn stats(&self) -> StorageResult<BackupStats> {
        let backups = self.list_backups()?;
        Ok(BackupStats {
            count: backups.len(),
            total_size: backups.iter().map(|b| b.size).sum(),
            oldest: backups.last().map(|b| b.created_at),
            newest: backups.first().map(|b| b.created_at),
            last_auto: self.last_auto,
            max_backups: self.max_backups,
            interval_secs: self.interval.as_secs(),
        })
    }

    fn write_backup(
        &mut self,
        now: DateTime<Utc>,
        trigger: BackupTrigger,
        description: Option<&str>,
    ) -> StorageResult<BackupInfo> {
        if !self.source.exists() {
            return Err(StorageError::Backup(format!(
                "Database file {} does not exist",
                self.source.display()
            )));
        }

        let name = self.unused_name(now);
        let path = self.dir.join(&name);
        let size = fs::copy(&self.source, &path)?;

        let mut log = self.read_log()?;
        log.push(LogEntry {
            name: name.clone(),
            created_at: now,
            trigger,
            description: description.map(str::to_string),
        });
        self.write_log(&log)?;

        if trigger == BackupTrigger::Auto {
            self.last_auto = Some(now);
        }
        info!("Created {} backup {}", trigger, name);

        Ok(BackupInfo {
            name,
            path,
            size,
            created_at: now,
            trigger: Some(trigger),
            description: description.map(str::to_string),
        })
    }

    fn unused_name(&self, now: DateTime<Utc>) -> String {
        let stem = format!("{}{}", BACKUP_PREFIX, now.format(TIMESTAMP_FORMAT));
        let ext = self
            .source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("db");

        let mut name = format!("{}.{}", stem, ext);
        let mut n = 1;
        while self.dir.join(&name).exists() {
            name = format!("{}_{}.{}", stem, n, ext);
            n += 1;
        }
        name
    }

    fn backup_path(&self, name: &str) -> StorageResult<PathBuf> {
        if !name.starts_with(BACKUP_PREFIX) || name.contains(['/', '\\']) || name.contains("..") {
            return Err(StorageError::Backup(format!("Invalid backup name '{}'", name)));
        }
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(StorageError::Backup(format!("Backup '{}' not found", name)));
        }
        Ok(path)
    }

    fn read_log(&self) -> StorageResult<Vec<LogEntry>> {
        let path = self.dir.join(LOG_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        match serde_json::from_str(&content) {
            Ok(log) => Ok(log),
            Err(e) => {
                warn!("Ignoring unreadable backup log {}: {}", path.display(), e);
                Ok(Vec::new())
            }
        }
    }

    fn write_log(&self, log: &[LogEntry]) -> StorageResult<()> {
        let content = serde_json::to_string_pretty(log)?;
        fs::write(self.dir.join(LOG_FILE), content)?;
        Ok(())
    }
}

fn timestamp_from_name(name: &str) -> Option<DateTime<Utc>> {
    let stamp = name.strip_prefix(BACKUP_PREFIX)?.get(..15)?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
        .ok()
        .map(|ts| ts.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, BackupManager) {
        let dir = tempdir().unwrap();
        let source = dir.path().join("tree.redb");
        fs::write(&source, b"v1").unwrap();
        let manager = BackupManager::new(dir.path().join("backups"), &source).unwrap();
        (dir, manager)
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_create_and_list() {
        let (_dir, mut manager) = setup();
        let info = manager
            .create_backup_at(at(10, 0, 0), BackupTrigger::Manual, Some("before import"))
            .unwrap();
        assert_eq!(info.name, "kinfolk_backup_20240301_100000.redb");
        assert_eq!(info.size, 2);

        // Same second gets a suffix
        let second = manager
            .create_backup_at(at(10, 0, 0), BackupTrigger::Manual, None)
            .unwrap();
        assert_eq!(second.name, "kinfolk_backup_20240301_100000_1.redb");

        let backups = manager.list_backups().unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(backups[1].description.as_deref(), Some("before import"));
        assert_eq!(backups[1].trigger, Some(BackupTrigger::Manual));
    }

    #[test]
    fn test_auto_backup_is_throttled() {
        let (dir, mut manager) = setup();
        assert!(manager.auto_backup_at(at(10, 0, 0), None).unwrap().is_some());
        assert!(manager.auto_backup_at(at(10, 1, 0), None).unwrap().is_none());
        assert!(manager.auto_backup_at(at(10, 5, 0), None).unwrap().is_some());
        assert_eq!(manager.last_auto(), Some(at(10, 5, 0)));

        // Manual backups do not reset the throttle
        manager
            .create_backup_at(at(10, 6, 0), BackupTrigger::Manual, None)
            .unwrap();
        assert!(manager.auto_backup_at(at(10, 7, 0), None).unwrap().is_none());

        // A fresh manager picks the throttle state up from the log
        let reopened =
            BackupManager::new(dir.path().join("backups"), dir.path().join("tree.redb")).unwrap();
        assert_eq!(reopened.last_auto(), Some(at(10, 5, 0)));
    }

    #[test]
    fn test_prune_keeps_newest() {
        let (_dir, manager) = setup();
        let mut manager = manager.with_max_backups(2);
        for minute in 0..4 {
            manager
                .create_backup_at(at(9, minute, 0), BackupTrigger::Manual, None)
                .unwrap();
        }
        let names: Vec<String> = manager
            .list_backups()
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "kinfolk_backup_20240301_090300.redb",
                "kinfolk_backup_20240301_090200.redb"
            ]
        );
        assert_eq!(manager.stats().unwrap().count, 2);
    }

    #[test]
    fn test_restore_takes_safety_copy() {
        let (dir, mut manager) = setup();
        let source = dir.path().join("tree.redb");
        let backup = manager
            .create_backup_at(at(8, 0, 0), BackupTrigger::Manual, None)
            .unwrap();

        fs::write(&source, b"v2").unwrap();
        let safety = manager.restore_backup(&backup.name).unwrap().unwrap();

        assert_eq!(fs::read(&source).unwrap(), b"v1");
        assert_eq!(fs::read(&safety.path).unwrap(), b"v2");
        assert_eq!(safety.trigger, Some(BackupTrigger::PreRestore));
    }

    #[test]
    fn test_rejects_bad_names() {
        let (_dir, mut manager) = setup();
        assert!(matches!(
            manager.restore_backup("../tree.redb"),
            Err(StorageError::Backup(_))
        ));
        assert!(matches!(
            manager.delete_backup("kinfolk_backup_19990101_000000.redb"),
            Err(StorageError::Backup(_))
        ));
    }

    #[test]
    fn test_delete_and_stats() {
        let (_dir, mut manager) = setup();
        let first = manager
            .create_backup_at(at(7, 0, 0), BackupTrigger::Manual, None)
            .unwrap();
        manager
            .create_backup_at(at(7, 30, 0), BackupTrigger::Auto, None)
            .unwrap();

        let stats = manager.stats().unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_size, 4);
        assert_eq!(stats.oldest, Some(at(7, 0, 0)));
        assert_eq!(stats.newest, Some(at(7, 30, 0)));

        manager.delete_backup(&first.name).unwrap();
        assert_eq!(manager.list_backups().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_source() {
        let dir = tempdir().unwrap();
        let mut manager =
            BackupManager::new(dir.path().join("backups"), dir.path().join("absent.db")).unwrap();
        assert!(matches!(
            manager.create_backup(BackupTrigger::Manual, None),
            Err(StorageError::Backup(_))
        ));
    }
}
