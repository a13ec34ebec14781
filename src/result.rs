//! Modelos compartidos para describir el resultado de cada archivo procesado.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Desenlace de un archivo dentro de un lote.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ResultKind {
    Success,
    Skip,
    Error,
    Cancelled,
}

impl ResultKind {
    pub fn label(self) -> &'static str {
        match self {
            ResultKind::Success => "SUCCESS",
            ResultKind::Skip => "SKIP",
            ResultKind::Error => "ERROR",
            ResultKind::Cancelled => "CANCELLED",
        }
    }
}

/// Categoría de fallo; solo existe cuando el desenlace es [`ResultKind::Error`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    InputError,
    PermissionError,
    DependencyError,
    ProcessingError,
    OutputError,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::InputError => "input_error",
            ErrorCategory::PermissionError => "permission_error",
            ErrorCategory::DependencyError => "dependency_error",
            ErrorCategory::ProcessingError => "processing_error",
            ErrorCategory::OutputError => "output_error",
        }
    }

    /// Sugerencia genérica cuando el manejador no aporta una propia.
    pub fn default_fix_hint(self) -> &'static str {
        match self {
            ErrorCategory::InputError => "Verify the file exists and is a valid, uncorrupted file",
            ErrorCategory::PermissionError => {
                "Check file permissions or run with appropriate privileges"
            }
            ErrorCategory::DependencyError => {
                "Install the missing tool or point --ffmpeg-path at it"
            }
            ErrorCategory::ProcessingError => "Report this error if it persists",
            ErrorCategory::OutputError => "Check free space and write access on the output drive",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registro inmutable del procesamiento de una ruta.
///
/// Solo se construye mediante los constructores por tipo, de modo que
/// `category` y `fix_hint` existen únicamente en los registros de error.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScrubRecord {
    input_path: PathBuf,
    output_path: Option<PathBuf>,
    kind: ResultKind,
    category: Option<ErrorCategory>,
    message: String,
    fix_hint: Option<String>,
    bytes_written: Option<u64>,
    preview: bool,
}

impl ScrubRecord {
    pub fn success(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        removed: impl Into<String>,
        bytes_written: u64,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: Some(output_path.into()),
            kind: ResultKind::Success,
            category: None,
            message: removed.into(),
            fix_hint: None,
            bytes_written: Some(bytes_written),
            preview: false,
        }
    }

    /// Registro de simulación: describe la salida que se produciría sin escribirla.
    pub fn preview(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        removed: impl Into<String>,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: Some(output_path.into()),
            kind: ResultKind::Success,
            category: None,
            message: removed.into(),
            fix_hint: None,
            bytes_written: None,
            preview: true,
        }
    }

    pub fn skip(input_path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: None,
            kind: ResultKind::Skip,
            category: None,
            message: reason.into(),
            fix_hint: None,
            bytes_written: None,
            preview: false,
        }
    }

    /// Registro de error; una sugerencia vacía se reemplaza por la de la categoría.
    pub fn error(
        input_path: impl Into<PathBuf>,
        category: ErrorCategory,
        message: impl Into<String>,
        fix_hint: Option<String>,
    ) -> Self {
        let fix_hint = fix_hint
            .filter(|hint| !hint.trim().is_empty())
            .unwrap_or_else(|| category.default_fix_hint().to_string());

        Self {
            input_path: input_path.into(),
            output_path: None,
            kind: ResultKind::Error,
            category: Some(category),
            message: message.into(),
            fix_hint: Some(fix_hint),
            bytes_written: None,
            preview: false,
        }
    }

    pub fn cancelled(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: None,
            kind: ResultKind::Cancelled,
            category: None,
            message: "cancelled before processing".to_string(),
            fix_hint: None,
            bytes_written: None,
            preview: false,
        }
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    pub fn category(&self) -> Option<ErrorCategory> {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fix_hint(&self) -> Option<&str> {
        self.fix_hint.as_deref()
    }

    pub fn bytes_written(&self) -> Option<u64> {
        self.bytes_written
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    /// Línea de reporte textual consumida por las capas de presentación.
    pub fn format_line(&self) -> String {
        let input = self.input_path.display();
        match self.kind {
            ResultKind::Success => {
                let output = self
                    .output_path
                    .as_deref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_default();
                if self.preview {
                    format!(
                        "SUCCESS | {input} -> {output} | dry-run: would remove {}",
                        self.message
                    )
                } else {
                    format!("SUCCESS | {input} -> {output} | removed: {}", self.message)
                }
            }
            ResultKind::Skip => format!("SKIP    | {input} | {}", self.message),
            ResultKind::Error => {
                let mut line = format!("ERROR   | {input} | {}", self.message);
                if let Some(hint) = &self.fix_hint {
                    line.push_str(&format!("\n  Fix: {hint}"));
                }
                line
            }
            ResultKind::Cancelled => format!("CANCELLED | {input} | {}", self.message),
        }
    }
}

/// Totales de un lote, siempre recalculados a partir de los registros.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub scanned: usize,
    pub succeeded: usize,
    pub previewed: usize,
    pub skipped: usize,
    pub errored: usize,
    pub cancelled_count: usize,
    pub errors_by_category: BTreeMap<ErrorCategory, usize>,
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn from_records(records: &[ScrubRecord]) -> Self {
        let mut summary = BatchSummary {
            scanned: records.len(),
            ..Self::default()
        };

        for record in records {
            match record.kind() {
                ResultKind::Success => {
                    summary.succeeded += 1;
                    if record.is_preview() {
                        summary.previewed += 1;
                    }
                }
                ResultKind::Skip => summary.skipped += 1,
                ResultKind::Error => {
                    summary.errored += 1;
                    let category = record
                        .category()
                        .unwrap_or(ErrorCategory::ProcessingError);
                    *summary.errors_by_category.entry(category).or_insert(0) += 1;
                }
                ResultKind::Cancelled => summary.cancelled_count += 1,
            }
        }

        summary.cancelled = summary.cancelled_count > 0;
        summary
    }

    pub fn has_errors(&self) -> bool {
        self.errored > 0
    }

    /// Categorías ordenadas de mayor a menor número de fallos.
    pub fn category_breakdown(&self) -> Vec<(ErrorCategory, usize)> {
        let mut items: Vec<_> = self
            .errors_by_category
            .iter()
            .map(|(category, count)| (*category, *count))
            .collect();
        items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        items
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "SUMMARY")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Total scanned:  {}", self.scanned)?;
        if self.previewed > 0 {
            writeln!(
                f,
                "Succeeded:      {} ({} dry-run previews)",
                self.succeeded, self.previewed
            )?;
        } else {
            writeln!(f, "Succeeded:      {}", self.succeeded)?;
        }
        writeln!(f, "Skipped:        {}", self.skipped)?;
        writeln!(f, "Errors:         {}", self.errored)?;

        if self.errored > 0 {
            writeln!(f)?;
            writeln!(f, "Error breakdown by category:")?;
            for (category, count) in self.category_breakdown() {
                writeln!(f, "  {category}: {count}")?;
            }
        }

        if self.cancelled {
            writeln!(f, "Cancelled:      {} (batch stopped early)", self.cancelled_count)?;
        }

        write!(f, "{rule}")
    }
}
