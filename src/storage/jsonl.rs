//! JSONL (JSON Lines) storage.
//!
//! One record per line. Used for the outcome cache, which is appended to
//! game file by game file so an interrupted run keeps what it extracted.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::StorageError;

/// A JSONL file of `T` records.
pub struct JsonlStore<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T> JsonlStore<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Remove the file if present.
    pub fn clear(&self) -> Result<(), StorageError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            debug!("Removed {:?}", self.path);
        }
        Ok(())
    }

    fn ensure_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl<T: Serialize> JsonlStore<T> {
    /// Append records, creating the file if needed.
    pub fn append(&self, records: &[T]) -> Result<usize, StorageError> {
        if records.is_empty() {
            return Ok(0);
        }
        self.ensure_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let count = write_lines(file, records)?;

        debug!("Appended {} records to {:?}", count, self.path);
        Ok(count)
    }

    /// Write records, replacing the file.
    pub fn replace(&self, records: &[T]) -> Result<usize, StorageError> {
        self.ensure_dir()?;

        let count = write_lines(File::create(&self.path)?, records)?;

        info!("Wrote {} records to {:?}", count, self.path);
        Ok(count)
    }
}

impl<T: DeserializeOwned> JsonlStore<T> {
    /// Read every record. Lines that fail to parse are logged and skipped;
    /// a missing file reads as empty.
    pub fn load(&self) -> Result<Vec<T>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Bad record on line {} of {:?}: {}", index + 1, self.path, e),
            }
        }

        debug!("Read {} records from {:?}", records.len(), self.path);
        Ok(records)
    }

    /// Stream records one at a time.
    pub fn stream(&self) -> Result<JsonlIterator<T>, StorageError> {
        if !self.path.exists() {
            return Err(StorageError::PathNotFound(self.path.clone()));
        }

        Ok(JsonlIterator {
            reader: BufReader::new(File::open(&self.path)?),
            _marker: PhantomData,
        })
    }
}

fn write_lines<T: Serialize>(file: File, records: &[T]) -> Result<usize, StorageError> {
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(records.len())
}

/// Iterator over the records of a JSONL file.
pub struct JsonlIterator<T> {
    reader: BufReader<File>,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> Iterator for JsonlIterator<T> {
    type Item = Result<T, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) if line.trim().is_empty() => continue,
                Ok(_) => return Some(serde_json::from_str(&line).map_err(StorageError::Json)),
                Err(e) => return Some(Err(StorageError::Io(e))),
            }
        }
    }
}
