//! The file-backed repository.
//!
//! Layout:
//!
//! ```text
//! basedir/
//!     <setSpec>/
//!         <id>.xml
//! ```
//!
//! The set is the directory name, the identifier is the filename stem,
//! and the record datestamp is the file's modification time. Content is
//! loaded lazily; XML processing instructions are stripped on load so
//! re-wrapping the metadata server-side cannot produce a duplicate
//! `<?xml?>` prolog.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;

use oaipmh_core::wire::{MetadataFormat, Set};
use oaipmh_core::{RecordCursor, Repository, Result, StoredRecord};

/// Pattern selecting XML processing instructions.
fn pi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<\?[^?]*\?>").expect("invalid PI pattern"))
}

/// The default metadata format for hosted repositories.
pub fn default_format() -> MetadataFormat {
    MetadataFormat {
        prefix: "iso19139".to_string(),
        schema: "http://www.isotc211.org/2005/gmi/gmi.xsd".to_string(),
        namespace: "http://www.isotc211.org/2005/gmi".to_string(),
    }
}

/// A repository serving records from a directory tree.
#[derive(Debug, Clone)]
pub struct FileRepository {
    base_dir: PathBuf,
    format: MetadataFormat,
}

impl FileRepository {
    /// Create a repository over `base_dir` with the default format.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self::with_format(base_dir, default_format())
    }

    /// Create a repository over `base_dir` serving `format`.
    pub fn with_format(base_dir: impl AsRef<Path>, format: MetadataFormat) -> Self {
        FileRepository {
            base_dir: base_dir.as_ref().to_path_buf(),
            format,
        }
    }

    /// Scan one set directory for records, sorted by identifier.
    fn scan_set(&self, set: &str) -> Result<Vec<StoredRecord>> {
        let dir = self.base_dir.join(set);
        let mut records = Vec::new();

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if let Some(record) = self.build_record(set, &entry.path())? {
                records.push(record);
            }
        }

        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    /// Build a record from a file path, or `None` when the file is not a
    /// record.
    fn build_record(&self, set: &str, path: &Path) -> Result<Option<StoredRecord>> {
        if path.extension().and_then(|e| e.to_str()) != Some("xml") {
            return Ok(None);
        }
        let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
            return Ok(None);
        };

        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Ok(None);
        }
        let date: DateTime<Utc> = metadata.modified()?.into();

        let content_path = path.to_path_buf();
        Ok(Some(StoredRecord {
            id: id.to_string(),
            date,
            set: set.to_string(),
            content: Arc::new(move || {
                let raw = fs::read_to_string(&content_path)?;
                Ok(pi_pattern().replace_all(&raw, "").trim().to_string())
            }),
        }))
    }

    fn set_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl Repository for FileRepository {
    async fn sets(&self) -> Result<Vec<Set>> {
        Ok(self
            .set_names()?
            .into_iter()
            .map(|name| Set {
                spec: name.clone(),
                name,
                description: String::new(),
            })
            .collect())
    }

    fn formats(&self) -> Vec<MetadataFormat> {
        vec![self.format.clone()]
    }

    async fn list_records(
        &self,
        set: Option<&str>,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Box<dyn RecordCursor>> {
        let mut records = match set {
            Some(set) => self.scan_set(set)?,
            None => {
                let mut all = Vec::new();
                for set in self.set_names()? {
                    all.extend(self.scan_set(&set)?);
                }
                all
            }
        };

        records.retain(|record| record.date >= from && record.date <= until);

        debug!(count = records.len(), "scanned repository listing");
        Ok(Box::new(VecRecordCursor::new(records)))
    }

    async fn record(&self, id: &str) -> Result<Option<StoredRecord>> {
        // First set with a matching file wins.
        for set in self.set_names()? {
            let path = self.base_dir.join(&set).join(format!("{}.xml", id));
            if path.is_file() {
                return self.build_record(&set, &path);
            }
        }
        Ok(None)
    }
}

/// A cursor over an in-memory slice of records.
#[derive(Debug)]
pub struct VecRecordCursor {
    records: Vec<StoredRecord>,
    pos: usize,
}

impl VecRecordCursor {
    pub fn new(records: Vec<StoredRecord>) -> Self {
        VecRecordCursor { records, pos: 0 }
    }
}

impl RecordCursor for VecRecordCursor {
    fn has_record(&self) -> bool {
        self.pos < self.records.len()
    }

    fn next(&mut self) -> bool {
        self.pos += 1;
        self.has_record()
    }

    fn set_pos(&mut self, pos: usize) -> bool {
        if pos < self.records.len() {
            self.pos = pos;
            true
        } else {
            false
        }
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn record(&self) -> Option<&StoredRecord> {
        self.records.get(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for set in ["alpha", "beta"] {
            fs::create_dir(dir.path().join(set)).unwrap();
        }
        fs::write(
            dir.path().join("alpha/rec1.xml"),
            "<?xml version=\"1.0\"?>\n<doc><title>one</title></doc>",
        )
        .unwrap();
        fs::write(dir.path().join("alpha/rec2.xml"), "<doc>two</doc>").unwrap();
        fs::write(dir.path().join("beta/rec3.xml"), "<doc>three</doc>").unwrap();
        fs::write(dir.path().join("beta/notes.txt"), "not a record").unwrap();
        dir
    }

    #[tokio::test]
    async fn sets_are_the_subdirectories() {
        let dir = fixture();
        let repo = FileRepository::new(dir.path());

        let sets = repo.sets().await.unwrap();
        let specs: Vec<&str> = sets.iter().map(|s| s.spec.as_str()).collect();
        assert_eq!(specs, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn listing_contains_only_xml_files() {
        let dir = fixture();
        let repo = FileRepository::new(dir.path());

        let mut cursor = repo
            .list_records(None, oaipmh_core::min_datestamp(), Utc::now())
            .await
            .unwrap();

        let mut ids = Vec::new();
        while let Some(record) = cursor.record() {
            ids.push(record.id.clone());
            cursor.next();
        }
        assert_eq!(ids, vec!["rec1", "rec2", "rec3"]);
    }

    #[tokio::test]
    async fn listing_a_single_set() {
        let dir = fixture();
        let repo = FileRepository::new(dir.path());

        let cursor = repo
            .list_records(Some("beta"), oaipmh_core::min_datestamp(), Utc::now())
            .await
            .unwrap();
        assert_eq!(cursor.record().unwrap().id, "rec3");
    }

    #[tokio::test]
    async fn record_lookup_fails_over_sets() {
        let dir = fixture();
        let repo = FileRepository::new(dir.path());

        let record = repo.record("rec3").await.unwrap().unwrap();
        assert_eq!(record.set, "beta");

        assert!(repo.record("no-such").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn content_strips_processing_instructions() {
        let dir = fixture();
        let repo = FileRepository::new(dir.path());

        let record = repo.record("rec1").await.unwrap().unwrap();
        let content = record.content().unwrap();
        assert!(!content.contains("<?xml"));
        assert_eq!(content, "<doc><title>one</title></doc>");
    }

    #[tokio::test]
    async fn datestamp_is_the_file_modification_time() {
        let dir = fixture();
        let repo = FileRepository::new(dir.path());

        let record = repo.record("rec2").await.unwrap().unwrap();
        let age = Utc::now().signed_duration_since(record.date);
        assert!(age.num_seconds() < 60, "mtime should be recent");
    }

    #[test]
    fn cursor_positions_are_rewindable() {
        let records = (0..5)
            .map(|i| StoredRecord {
                id: format!("rec{}", i),
                date: oaipmh_core::min_datestamp(),
                set: "alpha".to_string(),
                content: Arc::new(|| Ok(String::new())),
            })
            .collect();
        let mut cursor = VecRecordCursor::new(records);

        assert!(cursor.has_record());
        assert_eq!(cursor.record().unwrap().id, "rec0");

        cursor.next();
        cursor.next();
        assert_eq!(cursor.pos(), 2);

        assert!(cursor.set_pos(4));
        assert_eq!(cursor.record().unwrap().id, "rec4");
        assert!(!cursor.next());
        assert!(!cursor.has_record());

        assert!(!cursor.set_pos(5));
        assert!(cursor.set_pos(0));
        assert_eq!(cursor.record().unwrap().id, "rec0");
    }
}
