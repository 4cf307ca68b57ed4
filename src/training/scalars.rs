use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TrainingError;

const SCALARS_FILE: &str = "scalars.jsonl";

/// One logged value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarRecord {
    pub tag: String,
    pub step: usize,
    pub value: f32,
}

/// Appends scalar records as JSON lines to `<dir>/scalars.jsonl`.
pub struct ScalarLogger {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl ScalarLogger {
    pub fn create(dir: &Path) -> Result<Self, TrainingError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(SCALARS_FILE);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(ScalarLogger {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log(&mut self, tag: &str, step: usize, value: f32) -> Result<(), TrainingError> {
        let record = ScalarRecord {
            tag: tag.to_string(),
            step,
            value,
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        // Flushed per record so the file is readable while training runs.
        self.writer.flush()?;
        Ok(())
    }

    /// Read every record from a scalars file.
    pub fn read(path: &Path) -> Result<Vec<ScalarRecord>, TrainingError> {
        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}
