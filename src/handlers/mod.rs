//! Manejadores por formato detrás de una misma interfaz de capacidad.

mod image;
mod media;
mod office;
mod pdf;


use std::path::Path;

use serde::Serialize;

use crate::error::HandlerError;

pub use self::image::ImageHandler;
pub use self::media::MediaHandler;
pub use self::office::OfficeHandler;
pub use self::pdf::PdfHandler;

/// Familias de formato soportadas; el conjunto es cerrado.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum HandlerKind {
    Image,
    Pdf,
    OfficeDocument,
    AudioVideo,
}

impl HandlerKind {
    pub fn label(self) -> &'static str {
        match self {
            HandlerKind::Image => "image",
            HandlerKind::Pdf => "pdf",
            HandlerKind::OfficeDocument => "office",
            HandlerKind::AudioVideo => "audio/video",
        }
    }
}

/// Resultado de una limpieza correcta.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scrubbed {
    /// Descripción breve de lo eliminado, usada en la línea `removed:`.
    pub removed: String,
}

impl Scrubbed {
    pub fn new(removed: impl Into<String>) -> Self {
        Self {
            removed: removed.into(),
        }
    }
}

/// Capacidad de limpieza de un formato.
///
/// `scrub` lee `input` sin modificarlo y escribe el resultado únicamente en `staging`.
pub trait ScrubHandler {
    fn kind(&self) -> HandlerKind;

    /// Extensiones en minúsculas, sin punto.
    fn extensions(&self) -> &[&'static str];

    /// Descripción de lo que se elimina, también usada en simulaciones.
    fn removed_summary(&self) -> &'static str;

    fn can_handle(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|extension| self.extensions().contains(&extension.as_str()))
    }

    fn scrub(&self, input: &Path, staging: &Path) -> Result<Scrubbed, HandlerError>;
}

/// Variantes concretas registradas al arrancar.
#[derive(Clone, Debug)]
pub enum FormatHandler {
    Image(ImageHandler),
    Pdf(PdfHandler),
    Office(OfficeHandler),
    Media(MediaHandler),
}

impl FormatHandler {
    fn inner(&self) -> &dyn ScrubHandler {
        match self {
            FormatHandler::Image(handler) => handler,
            FormatHandler::Pdf(handler) => handler,
            FormatHandler::Office(handler) => handler,
            FormatHandler::Media(handler) => handler,
        }
    }
}

impl ScrubHandler for FormatHandler {
    fn kind(&self) -> HandlerKind {
        self.inner().kind()
    }

    fn extensions(&self) -> &[&'static str] {
        self.inner().extensions()
    }

    fn removed_summary(&self) -> &'static str {
        self.inner().removed_summary()
    }

    fn can_handle(&self, path: &Path) -> bool {
        self.inner().can_handle(path)
    }

    fn scrub(&self, input: &Path, staging: &Path) -> Result<Scrubbed, HandlerError> {
        self.inner().scrub(input, staging)
    }
}

/// Extensión en minúsculas, si existe y es UTF-8.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_lowercase())
}

/// Tipo MIME inferido del contenido, para detectar archivos con extensión engañosa.
pub(crate) fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    infer::get(bytes).map(|kind| kind.mime_type())
}
