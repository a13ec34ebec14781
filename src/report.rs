//! Presentación del resultado de un lote: líneas de consola y exportación a archivo.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use console::{StyledObject, style};
use serde::Serialize;

use crate::error::ReportError;
use crate::handlers::extension_of;
use crate::orchestrator::BatchOutcome;
use crate::result::{BatchSummary, ResultKind, ScrubRecord};

/// Línea de reporte coloreada según el desenlace.
pub fn styled_line(record: &ScrubRecord) -> StyledObject<String> {
    let line = style(record.format_line());
    match record.kind() {
        ResultKind::Success => line.green(),
        ResultKind::Skip => line.yellow(),
        ResultKind::Error => line.red(),
        ResultKind::Cancelled => line.dim(),
    }
}

pub fn styled_summary(summary: &BatchSummary) -> StyledObject<String> {
    let block = style(summary.to_string());
    if summary.has_errors() {
        block.red().bold()
    } else if summary.cancelled {
        block.yellow().bold()
    } else {
        block.green().bold()
    }
}

/// Fila plana para la exportación CSV.
#[derive(Serialize)]
struct ReportRow<'a> {
    kind: &'static str,
    input_path: String,
    output_path: Option<String>,
    category: Option<&'static str>,
    message: &'a str,
    fix_hint: Option<&'a str>,
    bytes_written: Option<u64>,
    dry_run: bool,
}

impl<'a> From<&'a ScrubRecord> for ReportRow<'a> {
    fn from(record: &'a ScrubRecord) -> Self {
        Self {
            kind: record.kind().label(),
            input_path: record.input_path().display().to_string(),
            output_path: record.output_path().map(|path| path.display().to_string()),
            category: record.category().map(|category| category.as_str()),
            message: record.message(),
            fix_hint: record.fix_hint(),
            bytes_written: record.bytes_written(),
            dry_run: record.is_preview(),
        }
    }
}

/// Escribe el lote en `path`; el formato (JSON o CSV) se elige por la extensión.
pub fn export_report(outcome: &BatchOutcome, path: &Path) -> Result<(), ReportError> {
    let extension = extension_of(path).unwrap_or_default();
    if extension != "json" && extension != "csv" {
        return Err(ReportError::UnsupportedFormat(path.display().to_string()));
    }

    let file = File::create(path).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    if extension == "json" {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, outcome)?;
        writer.flush().map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    } else {
        let mut writer = csv::Writer::from_writer(file);
        for record in &outcome.records {
            writer.serialize(ReportRow::from(record))?;
        }
        writer.flush().map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    Ok(())
}
