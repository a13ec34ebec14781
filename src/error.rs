//! Tipos de error del motor de limpieza y su traducción a categorías.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::result::ErrorCategory;

/// Fallo de un archivo individual, producido por un manejador o por la escritura atómica.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// El analizador del formato rechazó el contenido de entrada.
    #[error("{message}")]
    InvalidInput {
        message: String,
        fix_hint: Option<String>,
    },

    /// Falta una herramienta o biblioteca externa.
    #[error("{tool} not available: {detail}")]
    MissingDependency { tool: String, detail: String },

    /// La herramienta externa superó el tiempo máximo de espera.
    #[error("{tool} operation timed out (exceeded {} seconds)", .after.as_secs())]
    Timeout { tool: String, after: Duration },

    /// No se pudo preparar o publicar el archivo de salida.
    #[error("{message}")]
    Output {
        message: String,
        #[source]
        source: Option<io::Error>,
    },

    /// Fallo ya clasificado por el manejador.
    #[error("{message}")]
    Categorized {
        category: ErrorCategory,
        message: String,
        fix_hint: Option<String>,
    },

    /// Error de entrada/salida sin clasificar; se inspecciona su tipo.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Processing failed: {0}")]
    Processing(String),
}

impl HandlerError {
    pub fn invalid_input(message: impl Into<String>, fix_hint: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            fix_hint: Some(fix_hint.into()),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn output(message: impl Into<String>, source: Option<io::Error>) -> Self {
        Self::Output {
            message: message.into(),
            source,
        }
    }

    pub fn categorized(
        category: ErrorCategory,
        message: impl Into<String>,
        fix_hint: impl Into<String>,
    ) -> Self {
        Self::Categorized {
            category,
            message: message.into(),
            fix_hint: Some(fix_hint.into()),
        }
    }

    /// Deriva la categoría a partir de la causa reconocible del fallo.
    pub fn category(&self) -> ErrorCategory {
        match self {
            HandlerError::InvalidInput { .. } => ErrorCategory::InputError,
            HandlerError::MissingDependency { .. } => ErrorCategory::DependencyError,
            HandlerError::Timeout { .. } => ErrorCategory::ProcessingError,
            HandlerError::Output { source, .. } => match source {
                Some(error) if error.kind() == io::ErrorKind::PermissionDenied => {
                    ErrorCategory::PermissionError
                }
                _ => ErrorCategory::OutputError,
            },
            HandlerError::Categorized { category, .. } => *category,
            HandlerError::Io { source, .. } => io_category(source),
            HandlerError::Processing(_) => ErrorCategory::ProcessingError,
        }
    }

    /// Mensaje legible para el registro; los errores de E/S conocidos se simplifican.
    pub fn message(&self) -> String {
        match self {
            HandlerError::Io { source, .. } => match source.kind() {
                io::ErrorKind::StorageFull => "No space left on device".to_string(),
                io::ErrorKind::ReadOnlyFilesystem => "Output filesystem is read-only".to_string(),
                _ => self.to_string(),
            },
            _ => self.to_string(),
        }
    }

    /// Sugerencia específica, si la causa permite una mejor que la genérica.
    pub fn fix_hint(&self) -> Option<String> {
        match self {
            HandlerError::InvalidInput { fix_hint, .. }
            | HandlerError::Categorized { fix_hint, .. } => fix_hint.clone(),
            HandlerError::MissingDependency { tool, .. } => Some(format!(
                "Install {tool} or pass its location with --ffmpeg-path"
            )),
            HandlerError::Timeout { .. } => {
                Some("File may be too large or corrupted. Try smaller or valid files.".to_string())
            }
            HandlerError::Output { .. } => None,
            HandlerError::Io { source, .. } => match source.kind() {
                io::ErrorKind::StorageFull => {
                    Some("Free up disk space on the output drive".to_string())
                }
                io::ErrorKind::ReadOnlyFilesystem => {
                    Some("Choose a writable output location".to_string())
                }
                _ => None,
            },
            HandlerError::Processing(_) => None,
        }
    }
}

fn io_category(error: &io::Error) -> ErrorCategory {
    match error.kind() {
        io::ErrorKind::StorageFull | io::ErrorKind::ReadOnlyFilesystem => ErrorCategory::OutputError,
        io::ErrorKind::PermissionDenied => ErrorCategory::PermissionError,
        io::ErrorKind::NotFound | io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
            ErrorCategory::InputError
        }
        _ => ErrorCategory::ProcessingError,
    }
}

/// Categoría para errores de E/S observados al validar o recorrer la entrada.
pub fn input_io_category(error: &io::Error) -> ErrorCategory {
    match error.kind() {
        io::ErrorKind::PermissionDenied => ErrorCategory::PermissionError,
        _ => ErrorCategory::InputError,
    }
}

/// Errores de configuración del registro de manejadores.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("extension .{extension} is claimed by both {first} and {second} handlers")]
    DuplicateExtension {
        extension: String,
        first: &'static str,
        second: &'static str,
    },
}

/// Errores al cargar opciones desde un archivo.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Errores al exportar el reporte de un lote.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Unsupported report format: {0} (use .json or .csv)")]
    UnsupportedFormat(String),

    #[error("Failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write CSV report: {0}")]
    Csv(#[from] csv::Error),
}
