use crate::ledger::LedgerEntry;
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

const SEGMENT_MAGIC: &[u8] = b"RLEDG1\0";

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("crc mismatch")]
    CrcMismatch,
    #[error("invalid segment magic")]
    InvalidMagic,
}

/// One durable ledger mutation. `seq` is assigned by the ledger and only
/// ever grows; `at_ms` is the wall-clock time the caller supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalRecord {
    pub seq: u64,
    pub at_ms: i64,
    pub entry: LedgerEntry,
}

#[derive(Debug)]
pub struct Journal {
    dir: PathBuf,
    max_segment_bytes: u64,
    current_segment: u64,
    current_size: u64,
    current_file: File,
}

impl Journal {
    pub fn open<P: AsRef<Path>>(dir: P, max_segment_bytes: u64) -> Result<Self, JournalError> {
        fs::create_dir_all(&dir)?;
        let dir = dir.as_ref().to_path_buf();
        let current_segment = Self::latest_segment(&dir)?;
        let segment_path = segment_path(&dir, current_segment);
        let current_file = ensure_segment_file(&segment_path)?;
        let current_size = current_file.metadata()?.len();

        Ok(Self {
            dir,
            max_segment_bytes,
            current_segment,
            current_size,
            current_file,
        })
    }

    /// Durable append: the frame is flushed before this returns.
    pub fn append(&mut self, record: &JournalRecord) -> Result<(), JournalError> {
        let payload = serde_json::to_vec(record)?;
        let mut hasher = Hasher::new();
        hasher.update(&payload);
        let crc = hasher.finalize();

        let mut frame = Vec::with_capacity(8 + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&payload);
        frame.extend_from_slice(&crc.to_le_bytes());

        if self.current_size + frame.len() as u64 > self.max_segment_bytes {
            self.rotate()?;
        }

        self.current_file.write_all(&frame)?;
        self.current_file.sync_data()?;
        self.current_size += frame.len() as u64;
        Ok(())
    }

    pub fn replay_all(&self) -> Result<Vec<JournalRecord>, JournalError> {
        let mut files = segment_files(&self.dir)?;
        files.sort();

        let mut out = Vec::new();
        for file in files {
            let mut reader = BufReader::new(File::open(&file)?);
            let mut magic = vec![0_u8; SEGMENT_MAGIC.len()];
            reader.read_exact(&mut magic)?;
            if magic != SEGMENT_MAGIC {
                return Err(JournalError::InvalidMagic);
            }

            loop {
                let mut len_buf = [0_u8; 4];
                match reader.read_exact(&mut len_buf) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                    Err(e) => return Err(JournalError::Io(e)),
                }
                let len = u32::from_le_bytes(len_buf) as usize;
                let mut payload = vec![0_u8; len];
                reader.read_exact(&mut payload)?;
                let mut crc_buf = [0_u8; 4];
                reader.read_exact(&mut crc_buf)?;
                let expected_crc = u32::from_le_bytes(crc_buf);

                let mut hasher = Hasher::new();
                hasher.update(&payload);
                if hasher.finalize() != expected_crc {
                    return Err(JournalError::CrcMismatch);
                }

                let record: JournalRecord = serde_json::from_slice(&payload)?;
                out.push(record);
            }
        }

        Ok(out)
    }

    pub fn segment_dir(&self) -> &Path {
        &self.dir
    }

    fn rotate(&mut self) -> Result<(), JournalError> {
        self.current_segment += 1;
        let path = segment_path(&self.dir, self.current_segment);
        self.current_file = ensure_segment_file(&path)?;
        self.current_size = self.current_file.metadata()?.len();
        Ok(())
    }

    fn latest_segment(dir: &Path) -> Result<u64, JournalError> {
        let files = segment_files(dir)?;
        let mut latest = 1;
        for file in files {
            if let Some(name) = file.file_name().and_then(|n| n.to_str()) {
                if let Some(idx) = name
                    .strip_prefix("segment-")
                    .and_then(|v| v.strip_suffix(".jrnl"))
                    .and_then(|v| v.parse::<u64>().ok())
                {
                    latest = latest.max(idx);
                }
            }
        }
        Ok(latest)
    }
}

fn ensure_segment_file(path: &Path) -> Result<File, JournalError> {
    let exists = path.exists();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .read(true)
        .open(path)?;
    if !exists {
        file.write_all(SEGMENT_MAGIC)?;
        file.sync_data()?;
    }
    Ok(file)
}

fn segment_files(dir: &Path) -> Result<Vec<PathBuf>, JournalError> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path
            .file_name()
            .and_then(|v| v.to_str())
            .map(|name| name.starts_with("segment-") && name.ends_with(".jrnl"))
            .unwrap_or(false)
        {
            out.push(path);
        }
    }
    Ok(out)
}

fn segment_path(dir: &Path, idx: u64) -> PathBuf {
    dir.join(format!("segment-{idx:06}.jrnl"))
}
