//! Versioned on-disk archive for [`TrainedModel`].
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! +-------+---------+-------------+-------+------------------+
//! | SNTM  | version | payload len | crc32 | bincode payload  |
//! | 4 B   | u32     | u64         | u32   | payload len B    |
//! +-------+---------+-------------+-------+------------------+
//! ```
//!
//! Saving writes a sibling temporary file and renames it over the target, so
//! a reader never observes a partially written model.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, info};

use crate::error::{PolarityError, Result};
use crate::ml::models::TrainedModel;

/// File signature.
pub const MODEL_MAGIC: [u8; 4] = *b"SNTM";

/// Current archive format version.
pub const FORMAT_VERSION: u32 = 1;

/// Magic, version, payload length and checksum.
pub const HEADER_LEN: u64 = 4 + 4 + 8 + 4;

/// Reads and writes model archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelStore;

impl ModelStore {
    /// Whether a model file is present at `path`.
    pub fn exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    /// Write `model` to `path`, replacing any existing file.
    pub fn save<P: AsRef<Path>>(model: &TrainedModel, path: P) -> Result<()> {
        let path = path.as_ref();
        let payload =
            bincode::serialize(model).map_err(|e| PolarityError::serialization(e.to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp = temp_path(path);
        let written = write_archive(&temp, &payload)
            .and_then(|()| fs::rename(&temp, path).map_err(PolarityError::from));
        if written.is_err() {
            // Best effort; the original error is what matters.
            let _ = fs::remove_file(&temp);
        }
        written?;

        info!(
            "Saved model {} to {} ({} bytes)",
            model.metadata().model_id,
            path.display(),
            HEADER_LEN + payload.len() as u64
        );
        Ok(())
    }

    /// Read a model from `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<TrainedModel> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PolarityError::model_not_found(path));
            }
            Err(e) => return Err(e.into()),
        };
        let file_len = file.metadata()?.len();
        if file_len < HEADER_LEN {
            return Err(PolarityError::corrupt_model(
                path,
                format!("file is {file_len} bytes, shorter than the {HEADER_LEN} byte header"),
            ));
        }

        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != MODEL_MAGIC {
            return Err(PolarityError::corrupt_model(path, "bad magic"));
        }

        let version = reader.read_u32::<LittleEndian>()?;
        if version != FORMAT_VERSION {
            return Err(PolarityError::corrupt_model(
                path,
                format!("unsupported format version {version}"),
            ));
        }

        let payload_len = reader.read_u64::<LittleEndian>()?;
        let checksum = reader.read_u32::<LittleEndian>()?;
        if payload_len != file_len - HEADER_LEN {
            return Err(PolarityError::corrupt_model(
                path,
                format!(
                    "header declares {payload_len} payload bytes, file holds {}",
                    file_len - HEADER_LEN
                ),
            ));
        }

        let mut payload = vec![0u8; payload_len as usize];
        reader.read_exact(&mut payload)?;
        if crc32fast::hash(&payload) != checksum {
            return Err(PolarityError::corrupt_model(path, "checksum mismatch"));
        }

        let model: TrainedModel = bincode::deserialize(&payload).map_err(|e| {
            PolarityError::corrupt_model(path, format!("undecodable payload: {e}"))
        })?;
        model
            .validate()
            .map_err(|e| PolarityError::corrupt_model(path, e.to_string()))?;

        debug!("Model metadata: {:?}", model.metadata());
        info!(
            "Loaded model {} from {}",
            model.metadata().model_id,
            path.display()
        );
        Ok(model)
    }
}

fn write_archive(path: &Path, payload: &[u8]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&MODEL_MAGIC)?;
    writer.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    writer.write_u64::<LittleEndian>(payload.len() as u64)?;
    writer.write_u32::<LittleEndian>(crc32fast::hash(payload))?;
    writer.write_all(payload)?;

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
