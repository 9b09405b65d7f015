use crate::error::{RegistryError, Result};
use crate::failpoint::{self, FailPoint};
use crate::student::Student;
use crate::validation;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Backing file used when no path is configured.
pub const DEFAULT_PATH: &str = "database.txt";

/// Maximum number of students a registry accepts unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 50;

/// Where the registry lives and how many records it accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub path: PathBuf,
    pub capacity: usize,
}

impl RegistryConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RegistryConfig {
            path: path.into(),
            capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig::new(DEFAULT_PATH)
    }
}

/// A recoverable anomaly found while loading the backing file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// The first line was missing, not valid UTF-8 or not a number. The
    /// counter starts from 0.
    CounterUnreadable { found: String },
    /// The first line holds 0. Fresh registries start there too, but a
    /// counter that was reset by hand looks exactly the same.
    CounterZero,
    /// A record line could not be parsed and was left out of the registry.
    SkippedRecord { line: usize, reason: String },
    /// A stored ID is higher than the counter, typically because the process
    /// stopped between writing a record and rewriting the counter.
    CounterBehind { counter: u32, highest_id: u32 },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::CounterUnreadable { found } => write!(
                f,
                "Retrieving the student count failed (found {found:?}); student count set to 0"
            ),
            LoadWarning::CounterZero => write!(f, "Stored student count is 0"),
            LoadWarning::SkippedRecord { line, reason } => {
                write!(f, "Skipped corrupt record on line {line}: {reason}")
            }
            LoadWarning::CounterBehind {
                counter,
                highest_id,
            } => write!(
                f,
                "Student count {counter} is behind stored ID {highest_id}; continuing from {highest_id}"
            ),
        }
    }
}

/// A student registry backed by a plain text file.
///
/// The file holds the running counter on its first line followed by one
/// record per line:
///
/// ```text
/// 2
/// 1 Ada Lovelace 28
/// 2 Alan Turing 41
/// ```
///
/// The counter only ever grows, so IDs are never handed out twice, even
/// across restarts. Every rewrite goes through a temporary file in the same
/// directory that is synced and then renamed over the original.
pub struct Registry {
    config: RegistryConfig,
    count: u32,
    records: Vec<Student>,
    warnings: Vec<LoadWarning>,
    failpoint: Option<FailPoint>,
}

impl Registry {
    /// Open the registry at `config.path`, creating an empty one if the file
    /// does not exist yet.
    pub fn initialize(config: RegistryConfig) -> Result<Self> {
        if config.path.exists() {
            return Self::load(config);
        }

        log::info!("Creating new registry at {}", config.path.display());
        write_atomic(&config.path, 0, b"", None)?;
        Ok(Registry {
            config,
            count: 0,
            records: Vec::new(),
            warnings: Vec::new(),
            failpoint: None,
        })
    }

    /// Open an existing registry. Unlike [`Registry::initialize`] this never
    /// creates the backing file.
    pub fn open(config: RegistryConfig) -> Result<Self> {
        if !config.path.exists() {
            return Err(RegistryError::NotInitialized { path: config.path });
        }
        Self::load(config)
    }

    /// Read the backing file, reconciling the counter with the stored IDs.
    fn load(config: RegistryConfig) -> Result<Self> {
        // Decoded line by line so one bad byte only costs its own record
        let contents = fs::read(&config.path)?;
        let mut lines = contents.split(|&b| b == b'\n');
        let mut warnings = Vec::new();

        let counter_line = lines.next().unwrap_or_default();
        let counter = match std::str::from_utf8(counter_line).map(|l| l.trim().parse::<u32>()) {
            Ok(Ok(0)) => {
                warnings.push(LoadWarning::CounterZero);
                0
            }
            Ok(Ok(n)) => n,
            _ => {
                warnings.push(LoadWarning::CounterUnreadable {
                    found: String::from_utf8_lossy(counter_line).trim().to_string(),
                });
                0
            }
        };

        let mut records = Vec::new();
        for (idx, raw) in lines.enumerate() {
            // Line 1 is the counter
            let line_no = idx + 2;
            let Ok(line) = std::str::from_utf8(raw) else {
                warnings.push(LoadWarning::SkippedRecord {
                    line: line_no,
                    reason: "not valid UTF-8".into(),
                });
                continue;
            };
            if line.trim().is_empty() {
                continue;
            }
            match Student::parse_line(line_no, line) {
                Ok(student) => records.push(student),
                Err(RegistryError::Corrupt { line, reason }) => {
                    warnings.push(LoadWarning::SkippedRecord { line, reason });
                }
                Err(e) => return Err(e),
            }
        }

        let highest_id = records.iter().map(|s| s.id).max().unwrap_or(0);
        let count = if highest_id > counter {
            warnings.push(LoadWarning::CounterBehind {
                counter,
                highest_id,
            });
            highest_id
        } else {
            counter
        };

        for warning in &warnings {
            log::warn!("{}: {warning}", config.path.display());
        }
        log::info!(
            "Loaded {} students from {} (count {count})",
            records.len(),
            config.path.display()
        );

        Ok(Registry {
            config,
            count,
            records,
            warnings,
            failpoint: None,
        })
    }

    // ── Operations ──────────────────────────────────────────────────

    /// Add a student and return the stored record.
    ///
    /// The record line is appended and synced first, then the whole file is
    /// rewritten with the incremented counter. If either step fails the
    /// appended line is truncated away again and the in-memory state is left
    /// untouched. When truncation is impossible the handle reloads from disk,
    /// so the orphaned line's ID is never handed out a second time.
    pub fn append(&mut self, first_name: &str, last_name: &str, age: u32) -> Result<Student> {
        self.ensure_ready()?;
        let first_name = validation::check_name("first name", first_name)?;
        let last_name = validation::check_name("last name", last_name)?;

        if self.count as usize >= self.config.capacity
            || self.records.len() >= self.config.capacity
        {
            return Err(RegistryError::CapacityExceeded {
                capacity: self.config.capacity,
            });
        }

        let student = Student {
            id: self.count + 1,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            age,
        };

        let (mut file, previous_len) = self.open_for_append()?;
        let written = self.write_line(&mut file, previous_len, &student);
        drop(file);
        if let Err(e) = written {
            self.rollback_append(previous_len);
            return Err(e);
        }

        if let Err(e) = failpoint::check(self.failpoint, FailPoint::AfterRecordAppend) {
            // Left on disk as a crash would leave it
            self.reload();
            return Err(e.into());
        }

        if let Err(e) = self.rewrite_counter(student.id) {
            self.rollback_append(previous_len);
            return Err(e);
        }

        self.count = student.id;
        self.records.push(student.clone());
        log::debug!("Added student {}", student.to_line());
        Ok(student)
    }

    /// Look up a student by ID. ID 0 never matches.
    pub fn find(&self, id: u32) -> Option<&Student> {
        if id == 0 {
            return None;
        }
        self.records.iter().find(|s| s.id == id)
    }

    /// Iterate over all students in insertion order.
    pub fn list_all(&self) -> impl ExactSizeIterator<Item = &Student> + '_ {
        self.records.iter()
    }

    /// Re-read the records from disk and rewrite the counter line.
    ///
    /// Picks up records written by something other than this handle. The
    /// counter is raised to the highest stored ID if needed but never lowered.
    /// Returns the counter as persisted.
    pub fn resync_counter(&mut self) -> Result<u32> {
        self.ensure_ready()?;
        let on_disk = Self::load(self.config.clone())?;
        let count = self.count.max(on_disk.count);

        self.rewrite_counter(count)?;

        self.count = count;
        self.records = on_disk.records;
        self.warnings = on_disk
            .warnings
            .into_iter()
            .filter(|w| matches!(w, LoadWarning::SkippedRecord { .. }))
            .collect();
        log::info!("Student count resynced to {count}");
        Ok(count)
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// Number of students ever created. The next ID is `count() + 1`.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Number of records currently loaded.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Anomalies recovered from while loading.
    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    /// Arm a failure injection point, or disarm with `None`.
    #[doc(hidden)]
    pub fn set_failpoint(&mut self, point: Option<FailPoint>) {
        self.failpoint = point;
    }

    // ── Persistence ─────────────────────────────────────────────────

    fn ensure_ready(&self) -> Result<()> {
        if !self.config.path.exists() {
            return Err(RegistryError::NotInitialized {
                path: self.config.path.clone(),
            });
        }
        Ok(())
    }

    /// Open the backing file for appending. Also returns its current length,
    /// which is what a rollback truncates back to.
    fn open_for_append(&self) -> Result<(File, u64)> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.config.path)?;
        let previous_len = file.metadata()?.len();
        Ok((file, previous_len))
    }

    /// Append one record line and sync it.
    fn write_line(&self, file: &mut File, previous_len: u64, student: &Student) -> Result<()> {
        let mut line = String::new();
        if previous_len == 0 {
            // Nothing on disk yet, not even the counter line
            line.push_str(&format!("{}\n", self.count));
        } else if !ends_with_newline(file)? {
            line.push('\n');
        }
        line.push_str(&student.to_line());
        line.push('\n');

        file.write_all(line.as_bytes())?;
        file.sync_data()?;
        Ok(())
    }

    /// Replace the counter line, keeping every record line as it is on disk.
    fn rewrite_counter(&self, count: u32) -> Result<()> {
        let contents = fs::read(&self.config.path)?;
        let body: &[u8] = match contents.iter().position(|&b| b == b'\n') {
            Some(end) => &contents[end + 1..],
            None => &[],
        };
        write_atomic(&self.config.path, count, body, self.failpoint)
    }

    fn rollback_append(&mut self, previous_len: u64) {
        let truncated = OpenOptions::new()
            .write(true)
            .open(&self.config.path)
            .and_then(|file| {
                file.set_len(previous_len)?;
                file.sync_data()
            });

        match truncated {
            Ok(()) => log::warn!("Append failed; removed the partial record"),
            Err(e) => {
                log::error!(
                    "Could not remove the appended record from {}: {e}; reloading",
                    self.config.path.display()
                );
                self.reload();
            }
        }
    }

    /// Mirror whatever is durable, so the next ID skips any orphaned line.
    /// The count never goes down.
    fn reload(&mut self) {
        match Self::load(self.config.clone()) {
            Ok(mut reloaded) => {
                reloaded.count = reloaded.count.max(self.count);
                reloaded.failpoint = self.failpoint;
                *self = reloaded;
            }
            Err(e) => log::error!("Reload of {} failed: {e}", self.config.path.display()),
        }
    }
}

fn ends_with_newline(file: &mut File) -> Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Write `count` followed by `body` to a temp file next to `path`, sync it and
/// rename it over `path`.
///
/// An existing file keeps its permissions; the temp file is created private.
fn write_atomic(path: &Path, count: u32, body: &[u8], armed: Option<FailPoint>) -> Result<()> {
    let dir = parent_dir(path);
    let mut tmp = NamedTempFile::new_in(dir)?;
    if let Ok(metadata) = fs::metadata(path) {
        tmp.as_file().set_permissions(metadata.permissions())?;
    }

    writeln!(tmp, "{count}")?;
    tmp.write_all(body)?;
    if !body.is_empty() && !body.ends_with(b"\n") {
        writeln!(tmp)?;
    }
    tmp.as_file().sync_all()?;

    failpoint::check(armed, FailPoint::BeforeCounterPersist)?;
    tmp.persist(path)?;
    sync_dir(dir);
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Make the rename itself durable. Failure here is logged, not returned: the
/// new file is already in place and rolling back would be wrong.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        log::warn!("Failed to sync directory {}: {e}", dir.display());
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
