#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use csv::{ErrorKind, ReaderBuilder};
use fd_runtime::{ConfigError, StatsConfig};
use fd_stream::{ResultObject, StatsReport, StreamEngine, StreamError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("csv input has no headers")]
    MissingHeaders,
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Stream any CSV byte source through a [`StreamEngine`].
///
/// Rows that are not valid UTF-8 are skipped and recorded; every other
/// reader error aborts the pass.
pub fn analyze_reader<R: Read>(input: R, config: &StatsConfig) -> Result<StatsReport, IoError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(IoError::MissingHeaders);
    }
    let header: Vec<&str> = headers.iter().collect();
    let mut engine = StreamEngine::new(&header, config)?;

    for row in reader.records() {
        match row {
            Ok(record) => {
                let line = record.position().map(csv::Position::line);
                let fields: Vec<&str> = record.iter().collect();
                engine.push_record(line, &fields);
            }
            Err(err) if matches!(err.kind(), ErrorKind::Utf8 { .. }) => {
                let line = err.position().map(csv::Position::line);
                engine.push_unreadable_row(line, err.to_string());
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(engine.finish()?)
}

pub fn analyze_csv_str(input: &str, config: &StatsConfig) -> Result<StatsReport, IoError> {
    analyze_reader(input.as_bytes(), config)
}

/// Analyze `config.source_path`. Configuration is validated before the file
/// is opened.
pub fn analyze_csv_path(config: &StatsConfig) -> Result<StatsReport, IoError> {
    config.validate()?;
    let path = &config.source_path;
    let file = File::open(path).map_err(|source| IoError::Open {
        path: path.clone(),
        source,
    })?;
    tracing::info!(source = %path.display(), "reading csv source");
    analyze_reader(BufReader::new(file), config)
}

/// JSON text of a report: the bare Result Object, or the metadata envelope.
pub fn report_to_json_string(report: &StatsReport, with_metadata: bool) -> Result<String, IoError> {
    let text = if with_metadata {
        serde_json::to_string_pretty(&report.envelope())?
    } else {
        serde_json::to_string_pretty(&report.result)?
    };
    Ok(text)
}

pub fn write_report_json(
    report: &StatsReport,
    path: &Path,
    with_metadata: bool,
) -> Result<(), IoError> {
    if with_metadata {
        write_json(&report.envelope(), path)
    } else {
        write_json(&report.result, path)
    }
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), IoError> {
    let file = File::create(path).map_err(|source| IoError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Load a Result Object from JSON text, accepting either the bare object or
/// the metadata envelope. Inside an envelope the `*_analysis` key decides
/// the variant.
pub fn result_from_json_str(input: &str) -> Result<ResultObject, IoError> {
    let value: serde_json::Value = serde_json::from_str(input)?;
    match value {
        serde_json::Value::Object(mut object) if object.contains_key("analysis_metadata") => {
            if let Some(columns) = object.remove("overall_analysis") {
                return Ok(ResultObject::Overall(serde_json::from_value(columns)?));
            }
            let groups = object.remove("grouped_analysis").unwrap_or_default();
            Ok(ResultObject::Grouped(serde_json::from_value(groups)?))
        }
        other => Ok(serde_json::from_value(other)?),
    }
}

pub fn read_result_json(path: &Path) -> Result<ResultObject, IoError> {
    let mut text = String::new();
    File::open(path)
        .map_err(|source| IoError::Open {
            path: path.to_path_buf(),
            source,
        })?
        .read_to_string(&mut text)?;
    result_from_json_str(&text)
}

/// Full run: analyze the source, then write the output. Nothing is written
/// when the analysis fails.
pub fn run(config: &StatsConfig) -> Result<StatsReport, IoError> {
    let report = analyze_csv_path(config)?;
    write_report_json(&report, &config.output_path, config.with_metadata)?;
    tracing::info!(output = %config.output_path.display(), "wrote result");
    Ok(report)
}
