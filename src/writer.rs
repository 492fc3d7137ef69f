// 💾 Content-Addressed Writer
// Hash the record set, compare with what is on disk, replace atomically on change

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{EtlError, Result};
use crate::record::SurveillanceRecord;

// ============================================================================
// SERIALIZATION
// ============================================================================

/// Compact JSON with `", "` and `": "` separators.
///
/// Same separators as Python's `json.dumps` defaults. Output is byte-identical
/// to Python's only while no float needs exponent notation (ryu writes `1e16`
/// where Python writes `1e+16`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(b": ")
    }
}

fn to_writer_spaced<W: Write, T: Serialize + ?Sized>(writer: W, value: &T) -> serde_json::Result<()> {
    let mut serializer = serde_json::Serializer::with_formatter(writer, SpacedFormatter);
    value.serialize(&mut serializer)
}

/// Write records as JSON lines, keys in canonical field order.
pub fn write_records<W: Write + ?Sized>(writer: &mut W, records: &[SurveillanceRecord]) -> io::Result<()> {
    for record in records {
        to_writer_spaced(&mut *writer, record)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

// ============================================================================
// DATASET IDENTITY
// ============================================================================

/// SHA-256 over the whole list, every object serialised with sorted keys.
///
/// Order-sensitive: the same records in a different order are a different dataset.
pub fn digest_values(values: &[Value]) -> Result<String> {
    // serde_json::Map is a BTreeMap here, so object keys come out sorted
    let mut buffer = Vec::new();
    to_writer_spaced(&mut buffer, values)?;

    let mut hasher = Sha256::new();
    hasher.update(&buffer);
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn dataset_digest(records: &[SurveillanceRecord]) -> Result<String> {
    let values = records
        .iter()
        .map(serde_json::to_value)
        .collect::<serde_json::Result<Vec<Value>>>()?;
    digest_values(&values)
}

/// Parse every non-blank line of an existing JSONL dataset.
///
/// `Ok(None)` when there is no file yet.
pub fn load_jsonl_values(path: &Path) -> Result<Option<Vec<Value>>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(EtlError::persistence(path, err)),
    };

    let values = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(serde_json::from_str)
        .collect::<serde_json::Result<Vec<Value>>>()?;

    Ok(Some(values))
}

/// Digest of the dataset currently on disk, if there is a readable one.
///
/// A file that no longer parses is treated as absent so the next write replaces it.
pub fn existing_digest(path: &Path) -> Result<Option<String>> {
    match load_jsonl_values(path) {
        Ok(Some(values)) => digest_values(&values).map(Some),
        Ok(None) => Ok(None),
        Err(EtlError::Serialization(err)) => {
            warn!(path = %path.display(), error = %err, "existing dataset is not valid JSONL, rewriting");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

// ============================================================================
// ATOMIC PERSISTENCE
// ============================================================================

/// Fill a temp file next to `path`, then rename it over `path`.
///
/// The temp file lives in the target directory so the rename stays on one
/// filesystem. If `fill` or any later step fails the temp file is removed and
/// whatever was at `path` before is left untouched.
pub fn persist_atomically<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| EtlError::persistence(&parent, e))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("dataset");

    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{file_name}."))
        .suffix(".tmp")
        .tempfile_in(&parent)
        .map_err(|e| EtlError::persistence(&parent, e))?;
    let tmp_path = tmp.path().to_path_buf();

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        fill(&mut writer).map_err(|e| EtlError::persistence(&tmp_path, e))?;
        writer
            .flush()
            .map_err(|e| EtlError::persistence(&tmp_path, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| EtlError::persistence(&tmp_path, e))?;

    tmp.persist(path)
        .map_err(|e| EtlError::persistence(path, e.error))?;

    debug!(path = %path.display(), "renamed temp file into place");
    Ok(())
}

// ============================================================================
// CHANGE-AWARE WRITE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// New or changed content was persisted
    Written { records: usize, digest: String },
    /// Content on disk already matches; the file was not touched
    Unchanged { digest: String },
}

impl WriteOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, WriteOutcome::Written { .. })
    }

    pub fn digest(&self) -> &str {
        match self {
            WriteOutcome::Written { digest, .. } | WriteOutcome::Unchanged { digest } => digest,
        }
    }
}

/// Persist `records` at `path` unless the stored dataset has the same digest.
pub fn write_jsonl(path: &Path, records: &[SurveillanceRecord]) -> Result<WriteOutcome> {
    let new_digest = dataset_digest(records)?;

    if let Some(old_digest) = existing_digest(path)? {
        if old_digest == new_digest {
            info!(path = %path.display(), "dataset unchanged, skipping write");
            return Ok(WriteOutcome::Unchanged { digest: new_digest });
        }
        debug!(old = %old_digest, new = %new_digest, "dataset digest changed");
    }

    persist_atomically(path, |writer| write_records(writer, records))?;
    info!(path = %path.display(), records = records.len(), "wrote dataset");

    Ok(WriteOutcome::Written {
        records: records.len(),
        digest: new_digest,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Metric, Pathogen};
    use tempfile::TempDir;

    fn sample_records() -> Vec<SurveillanceRecord> {
        vec![
            SurveillanceRecord::new("2024-W10", Pathogen::Influenza, Metric::PositivityRate, 12.5),
            SurveillanceRecord::new("2024-W10", Pathogen::Rsv, Metric::Cases, 50.0),
        ]
    }

    fn tmp_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn test_digest_known_values() {
        let digest = dataset_digest(&sample_records()).unwrap();
        assert_eq!(
            digest,
            "bec63854d74bf8c3fadc6f183b256d2b00e89b287361ba70b6e19ed41ae90f90"
        );

        let empty = dataset_digest(&[]).unwrap();
        assert_eq!(
            empty,
            "4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945"
        );
    }

    #[test]
    fn test_digest_is_order_sensitive() {
        let mut reversed = sample_records();
        reversed.reverse();

        assert_ne!(
            dataset_digest(&sample_records()).unwrap(),
            dataset_digest(&reversed).unwrap()
        );
    }

    #[test]
    fn test_line_format() {
        let mut buffer = Vec::new();
        write_records(&mut buffer, &sample_records()[..1]).unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "{\"source\": \"ECDC\", \"iso_week\": \"2024-W10\", \"country\": \"IT\", \
             \"pathogen\": \"influenza\", \"metric\": \"positivity_rate\", \"value\": 12.5}\n"
        );
    }

    #[test]
    fn test_write_then_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("ecdc_weekly.jsonl");

        let first = write_jsonl(&path, &sample_records()).unwrap();
        assert!(first.changed());
        let bytes = fs::read(&path).unwrap();

        let second = write_jsonl(&path, &sample_records()).unwrap();
        assert!(!second.changed());
        assert_eq!(first.digest(), second.digest());
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn test_full_precision_values_stay_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ecdc_weekly.jsonl");
        let records: Vec<SurveillanceRecord> = [
            93.55968323342239,
            22.779256433976602,
            94.86901200920829,
            52.534746984386956,
        ]
        .into_iter()
        .map(|v| SurveillanceRecord::new("2024-W10", Pathogen::Influenza, Metric::PositivityRate, v))
        .collect();

        let first = write_jsonl(&path, &records).unwrap();
        assert!(first.changed());
        let bytes = fs::read(&path).unwrap();

        // Reloaded floats must hash exactly like the in-memory ones
        assert_eq!(existing_digest(&path).unwrap().as_deref(), Some(first.digest()));

        let second = write_jsonl(&path, &records).unwrap();
        assert!(!second.changed());
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn test_formatting_differences_do_not_trigger_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ecdc_weekly.jsonl");

        // Same records, different key order and spacing, plus a blank line
        fs::write(
            &path,
            "{\"value\":12.5,\"metric\":\"positivity_rate\",\"pathogen\":\"influenza\",\"country\":\"IT\",\"iso_week\":\"2024-W10\",\"source\":\"ECDC\"}\n\n\
             {\"country\": \"IT\", \"source\": \"ECDC\", \"iso_week\": \"2024-W10\", \"pathogen\": \"RSV\", \"metric\": \"cases\", \"value\": 50.0}\n",
        )
        .unwrap();

        let outcome = write_jsonl(&path, &sample_records()).unwrap();
        assert!(!outcome.changed());
    }

    #[test]
    fn test_changed_content_is_rewritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ecdc_weekly.jsonl");

        write_jsonl(&path, &sample_records()).unwrap();

        let mut updated = sample_records();
        updated.push(SurveillanceRecord::new("2024-W11", Pathogen::SarsCov2, Metric::Tests, 410.0));
        let outcome = write_jsonl(&path, &updated).unwrap();

        assert_eq!(
            outcome,
            WriteOutcome::Written {
                records: 3,
                digest: dataset_digest(&updated).unwrap()
            }
        );
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 3);
        assert!(tmp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_corrupt_existing_file_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ecdc_weekly.jsonl");
        fs::write(&path, "{not json\n").unwrap();

        let outcome = write_jsonl(&path, &sample_records()).unwrap();
        assert!(outcome.changed());
        assert_eq!(load_jsonl_values(&path).unwrap().unwrap().len(), 2);
    }

    #[test]
    fn test_failed_fill_leaves_previous_dataset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ecdc_weekly.jsonl");
        write_jsonl(&path, &sample_records()).unwrap();
        let before = fs::read(&path).unwrap();

        let err = persist_atomically(&path, |writer| {
            writer.write_all(b"{\"source\": \"EC")?;
            Err(io::Error::other("disk full"))
        })
        .unwrap_err();

        assert!(matches!(err, EtlError::Persistence { .. }));
        assert_eq!(fs::read(&path).unwrap(), before);
        assert!(tmp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_missing_file_loads_as_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.jsonl");

        assert!(load_jsonl_values(&path).unwrap().is_none());
        assert!(existing_digest(&path).unwrap().is_none());
    }
}
