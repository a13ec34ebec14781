//! Orquestación de un lote: validar, planificar, despachar, recopilar y resumir.
//!
//! Ningún fallo escapa de [`BatchOrchestrator::run`]: cada problema se convierte
//! en un [`ScrubRecord`] en el punto donde se detecta.

#[cfg(test)]
mod tests;

use std::any::Any;
use std::fs::{self, File};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::atomic::AtomicWriter;
use crate::config::ScrubOptions;
use crate::error::input_io_category;
use crate::handlers::{FormatHandler, ScrubHandler};
use crate::planner::{PathPlanner, PlanEntry, PlannedPair};
use crate::registry::HandlerRegistry;
use crate::result::{BatchSummary, ErrorCategory, ScrubRecord};

/// Señal de cancelación compartida; una vez activada no se reinicia.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Resultado completo de un lote.
#[derive(Clone, Debug, Serialize)]
pub struct BatchOutcome {
    pub records: Vec<ScrubRecord>,
    pub summary: BatchSummary,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

/// Ejecuta lotes de limpieza de forma secuencial, en el orden del plan.
///
/// `run` puede ejecutarse en un hilo de trabajo mientras otro llama a `cancel`.
#[derive(Debug, Default)]
pub struct BatchOrchestrator {
    cancel: CancelToken,
}

impl BatchOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Solicita la cancelación; se observa antes de despachar cada archivo.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Procesa `root` hacia `out_dir` y notifica cada registro en orden.
    pub fn run<F>(
        &self,
        root: &Path,
        out_dir: &Path,
        options: &ScrubOptions,
        mut on_progress: F,
    ) -> BatchOutcome
    where
        F: FnMut(&ScrubRecord),
    {
        let started_at = Local::now();
        let root = absolute(root);
        let out_dir = absolute(out_dir);
        info!(
            root = %root.display(),
            out_dir = %out_dir.display(),
            dry_run = options.dry_run,
            recursive = options.recursive,
            "batch started"
        );

        let mut records = Vec::new();
        let mut emit = |record: ScrubRecord| {
            if let Some(category) = record.category() {
                warn!(input = %record.input_path().display(), %category, message = record.message(), "file failed");
            }
            on_progress(&record);
            records.push(record);
        };

        match prepare(&root, &out_dir, options) {
            Err(record) => emit(record),
            Ok(registry) => {
                let writer = AtomicWriter::new(options.overwrite);
                let planner = PathPlanner::new(&root, &out_dir, options);
                let mut cancelled = false;

                for entry in planner.plan() {
                    if !cancelled && self.cancel.is_cancelled() {
                        warn!("cancellation requested; remaining files will not be processed");
                        cancelled = true;
                    }

                    let record = if cancelled {
                        ScrubRecord::cancelled(entry.input_path())
                    } else {
                        dispatch(entry, &registry, &writer, options.dry_run)
                    };
                    emit(record);
                }
            }
        }

        let summary = BatchSummary::from_records(&records);
        info!(
            scanned = summary.scanned,
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            errored = summary.errored,
            cancelled = summary.cancelled,
            "batch finished"
        );

        BatchOutcome {
            records,
            summary,
            started_at,
            finished_at: Local::now(),
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Valida las rutas raíz y construye el registro de manejadores.
fn prepare(
    root: &Path,
    out_dir: &Path,
    options: &ScrubOptions,
) -> Result<HandlerRegistry, ScrubRecord> {
    validate_root(root)?;
    validate_out_dir(root, out_dir, options.dry_run)?;

    HandlerRegistry::for_options(options).map_err(|error| {
        ScrubRecord::error(
            root,
            ErrorCategory::ProcessingError,
            format!("Handler configuration is invalid: {error}"),
            None,
        )
    })
}

fn validate_root(root: &Path) -> Result<(), ScrubRecord> {
    let metadata = fs::metadata(root).map_err(|error| match error.kind() {
        io::ErrorKind::NotFound => ScrubRecord::error(
            root,
            ErrorCategory::InputError,
            "Input path does not exist",
            Some("Verify the path is correct".to_string()),
        ),
        _ => unreadable_root(root, &error),
    })?;

    // Abrir un FIFO o un dispositivo puede bloquear; esos se omiten al despachar.
    let readable = if metadata.is_dir() {
        fs::read_dir(root).map(drop)
    } else if metadata.is_file() {
        File::open(root).map(drop)
    } else {
        Ok(())
    };
    readable.map_err(|error| unreadable_root(root, &error))
}

fn unreadable_root(root: &Path, error: &io::Error) -> ScrubRecord {
    match input_io_category(error) {
        ErrorCategory::PermissionError => ScrubRecord::error(
            root,
            ErrorCategory::PermissionError,
            "Cannot read input path (permission denied)",
            Some("Check permissions or run with appropriate privileges".to_string()),
        ),
        category => ScrubRecord::error(
            root,
            category,
            format!("Cannot read input path: {error}"),
            Some("Verify the path is valid and accessible".to_string()),
        ),
    }
}

/// El directorio de salida debe existir o poder crearse; en simulación no se crea.
fn validate_out_dir(root: &Path, out_dir: &Path, dry_run: bool) -> Result<(), ScrubRecord> {
    let not_a_directory = |path: &Path| {
        ScrubRecord::error(
            root,
            ErrorCategory::InputError,
            format!("Output path is not a directory: {}", path.display()),
            Some("Choose a directory for the cleaned files".to_string()),
        )
    };

    if out_dir.exists() {
        return if out_dir.is_dir() {
            Ok(())
        } else {
            Err(not_a_directory(out_dir))
        };
    }

    if dry_run {
        let ancestor = out_dir.ancestors().skip(1).find(|ancestor| ancestor.exists());
        return match ancestor {
            Some(ancestor) if !ancestor.is_dir() => Err(not_a_directory(ancestor)),
            _ => Ok(()),
        };
    }

    fs::create_dir_all(out_dir).map_err(|error| {
        let category = input_io_category(&error);
        let hint = match category {
            ErrorCategory::PermissionError => {
                format!("Check write permissions for: {}", out_dir.display())
            }
            _ => "Choose a valid output directory".to_string(),
        };
        ScrubRecord::error(
            root,
            category,
            format!("Cannot create output directory {}: {error}", out_dir.display()),
            Some(hint),
        )
    })
}

fn dispatch(
    entry: PlanEntry,
    registry: &HandlerRegistry,
    writer: &AtomicWriter,
    dry_run: bool,
) -> ScrubRecord {
    let pair = match entry {
        PlanEntry::Pair(pair) => pair,
        PlanEntry::Unreadable { path, error } => {
            return ScrubRecord::error(
                &path,
                input_io_category(&error),
                format!("Cannot read entry: {error}"),
                None,
            );
        }
    };

    match fs::metadata(&pair.input) {
        Ok(metadata) if !metadata.is_file() => {
            return ScrubRecord::skip(&pair.input, "not a regular file");
        }
        Ok(_) => {}
        Err(error) => {
            return ScrubRecord::error(
                &pair.input,
                input_io_category(&error),
                format!("Cannot read file: {error}"),
                None,
            );
        }
    }

    let Some(handler) = registry.select(&pair.input) else {
        return ScrubRecord::skip(&pair.input, HandlerRegistry::unsupported_reason(&pair.input));
    };

    debug!(
        input = %pair.input.display(),
        output = %pair.output.display(),
        handler = handler.kind().label(),
        "dispatching file"
    );

    if dry_run {
        return ScrubRecord::preview(&pair.input, &pair.output, handler.removed_summary());
    }

    scrub_pair(&pair, handler, writer)
}

fn scrub_pair(pair: &PlannedPair, handler: &FormatHandler, writer: &AtomicWriter) -> ScrubRecord {
    if resolves_to_input(&pair.input, &pair.output) {
        return ScrubRecord::error(
            &pair.input,
            ErrorCategory::OutputError,
            "Output path resolves to the input file; refusing to replace the original",
            Some("Choose an output directory different from the input location".to_string()),
        );
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        writer.with_staging(&pair.output, |staging| handler.scrub(&pair.input, staging))
    }));

    match outcome {
        Ok(Ok(staged)) => ScrubRecord::success(
            &pair.input,
            &pair.output,
            staged.value.removed,
            staged.bytes_written,
        ),
        Ok(Err(error)) => {
            ScrubRecord::error(&pair.input, error.category(), error.message(), error.fix_hint())
        }
        Err(payload) => ScrubRecord::error(
            &pair.input,
            ErrorCategory::ProcessingError,
            format!("Unexpected error: {}", panic_message(payload.as_ref())),
            None,
        ),
    }
}

fn resolves_to_input(input: &Path, output: &Path) -> bool {
    match (fs::canonicalize(input), fs::canonicalize(output)) {
        (Ok(input), Ok(output)) => input == output,
        _ => input == output,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
