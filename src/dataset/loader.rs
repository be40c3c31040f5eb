//! Delimited text loader.
//!
//! Reads `SentimentText;Label` style files (quoted fields allowed) into
//! [`LabeledExample`]s. A missing file is an I/O error; a row with the wrong
//! number of columns or a label that is not `0`/`1`/`true`/`false` is a parse
//! error naming the offending line.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use log::{debug, info};

use crate::config::DatasetConfig;
use crate::dataset::record::{LabeledExample, parse_label};
use crate::error::{PolarityError, Result};

/// Loads labeled examples according to a [`DatasetConfig`].
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    config: DatasetConfig,
}

impl DatasetLoader {
    pub fn new(config: DatasetConfig) -> Self {
        Self { config }
    }

    /// Read every example from the configured file.
    pub fn load(&self) -> Result<Vec<LabeledExample>> {
        let path = &self.config.path;
        let file = File::open(path)?;
        let examples = self.load_from_reader(BufReader::new(file))?;
        info!(
            "Loaded {} examples from {} ({} positive)",
            examples.len(),
            path.display(),
            examples.iter().filter(|e| e.label).count()
        );
        Ok(examples)
    }

    /// Read every example from an arbitrary reader.
    pub fn load_from_reader<R: Read>(&self, reader: R) -> Result<Vec<LabeledExample>> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.config.delimiter_byte()?)
            .has_headers(self.config.has_header)
            .flexible(false)
            .from_reader(reader);

        if self.config.has_header {
            let headers = reader.headers().map_err(csv_error)?;
            debug!("Dataset header: {:?}", headers);
        }

        let mut examples = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            examples.push(self.parse_record(&record)?);
        }

        Ok(examples)
    }

    fn parse_record(&self, record: &StringRecord) -> Result<LabeledExample> {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let text = record.get(self.config.text_column).ok_or_else(|| {
            PolarityError::parse(format!(
                "line {line}: expected a text column at index {}, found {} columns",
                self.config.text_column,
                record.len()
            ))
        })?;
        let raw_label = record.get(self.config.label_column).ok_or_else(|| {
            PolarityError::parse(format!(
                "line {line}: expected a label column at index {}, found {} columns",
                self.config.label_column,
                record.len()
            ))
        })?;
        let label = parse_label(raw_label).ok_or_else(|| {
            PolarityError::parse(format!("line {line}: unparseable label {raw_label:?}"))
        })?;

        Ok(LabeledExample::new(text, label))
    }
}

/// Load labeled examples from `path`, with text in column 0 and label in column 1.
pub fn load_examples<P: AsRef<Path>>(
    path: P,
    delimiter: char,
    has_header: bool,
) -> Result<Vec<LabeledExample>> {
    let config = DatasetConfig {
        path: path.as_ref().to_path_buf(),
        delimiter,
        has_header,
        ..DatasetConfig::default()
    };
    DatasetLoader::new(config).load()
}

fn csv_error(err: csv::Error) -> PolarityError {
    if err.is_io_error() {
        PolarityError::Csv(err)
    } else {
        PolarityError::parse(err.to_string())
    }
}
