use crate::data::PartitionRange;
use crate::error::{MigrationError, MigrationResult};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only `min,max` file of ranges that failed on every attempt.
#[derive(Debug)]
pub struct FailedPartitionLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FailedPartitionLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, range: &PartitionRange) -> MigrationResult<()> {
        let path = &self.path;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer
            .write_record([range.min.to_string(), range.max.to_string()])
            .map_err(|e| MigrationError::FailureLog(format!("Failed to encode range {}: {}", range, e)))?;
        let line = writer
            .into_inner()
            .map_err(|e| MigrationError::FailureLog(format!("Failed to encode range {}: {}", range, e)))?;

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| {
                MigrationError::FailureLog(format!("Failed to open {}: {}", path.display(), e))
            })?;
        file.write_all(&line).await.map_err(|e| {
            MigrationError::FailureLog(format!("Failed to write {}: {}", path.display(), e))
        })?;
        file.flush().await.map_err(|e| {
            MigrationError::FailureLog(format!("Failed to flush {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    /// Ranges recorded in a failed partition file, in file order.
    pub fn read_ranges(path: &Path) -> MigrationResult<Vec<PartitionRange>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| {
                MigrationError::FailureLog(format!("Failed to open {}: {}", path.display(), e))
            })?;

        let mut ranges = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                MigrationError::FailureLog(format!("{} line {}: {}", path.display(), line + 1, e))
            })?;
            let bound = |index: usize| -> MigrationResult<i128> {
                record
                    .get(index)
                    .unwrap_or_default()
                    .parse::<i128>()
                    .map_err(|e| {
                        MigrationError::FailureLog(format!(
                            "{} line {}: invalid bound: {}",
                            path.display(),
                            line + 1,
                            e
                        ))
                    })
            };
            let range = PartitionRange::new(bound(0)?, bound(1)?).map_err(|e| {
                MigrationError::FailureLog(format!("{} line {}: {}", path.display(), line + 1, e))
            })?;
            ranges.push(range);
        }
        Ok(ranges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{}-{}.csv", name, uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_append_then_read_back() {
        let path = temp_file("failed-partitions");
        let log = FailedPartitionLog::new(path.clone());
        let first = PartitionRange::new(-9_223_372_036_854_775_808, -100).unwrap();
        let second = PartitionRange::new(5, 10).unwrap();

        log.append(&first).await.unwrap();
        log.append(&second).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "-9223372036854775808,-100\n5,10\n");
        assert_eq!(FailedPartitionLog::read_ranges(&path).unwrap(), vec![first, second]);
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_append_creates_missing_file() {
        let path = temp_file("failed-partitions-new");
        assert!(!path.exists());
        let log = FailedPartitionLog::new(path.clone());

        log.append(&PartitionRange::new(0, 1).unwrap()).await.unwrap();

        assert_eq!(log.path(), path.as_path());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0,1\n");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_rejects_bad_lines() {
        let path = temp_file("failed-partitions-bad");
        std::fs::write(&path, "1,2\nabc,5\n").unwrap();
        let err = FailedPartitionLog::read_ranges(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"));
        std::fs::remove_file(&path).unwrap();
    }
}
