//! Registro de manejadores indexado por extensión.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::config::ScrubOptions;
use crate::error::RegistryError;
use crate::handlers::{
    FormatHandler, ImageHandler, MediaHandler, OfficeHandler, PdfHandler, ScrubHandler,
    extension_of,
};

/// Conjunto fijo de manejadores; cada extensión pertenece como máximo a uno.
#[derive(Debug)]
pub struct HandlerRegistry {
    handlers: Vec<FormatHandler>,
    by_extension: HashMap<&'static str, usize>,
}

impl HandlerRegistry {
    pub fn new(handlers: Vec<FormatHandler>) -> Result<Self, RegistryError> {
        let mut by_extension = HashMap::new();

        for (index, handler) in handlers.iter().enumerate() {
            for &extension in handler.extensions() {
                if let Some(&previous) = by_extension.get(extension) {
                    let first: &FormatHandler = &handlers[previous];
                    return Err(RegistryError::DuplicateExtension {
                        extension: extension.to_string(),
                        first: first.kind().label(),
                        second: handler.kind().label(),
                    });
                }
                by_extension.insert(extension, index);
            }
        }

        Ok(Self {
            handlers,
            by_extension,
        })
    }

    /// Registro estándar con las cuatro familias de formato.
    pub fn for_options(options: &ScrubOptions) -> Result<Self, RegistryError> {
        Self::new(vec![
            FormatHandler::Image(ImageHandler),
            FormatHandler::Pdf(PdfHandler),
            FormatHandler::Office(OfficeHandler),
            FormatHandler::Media(MediaHandler::new(
                options.external_tool_path.clone(),
                options.tool_timeout(),
            )),
        ])
    }

    /// Manejador para la extensión de `path`, sin distinguir mayúsculas.
    pub fn select(&self, path: &Path) -> Option<&FormatHandler> {
        let extension = extension_of(path)?;
        let handler = self
            .by_extension
            .get(extension.as_str())
            .map(|&index| &self.handlers[index]);

        if let Some(handler) = handler {
            debug!(path = %path.display(), handler = handler.kind().label(), "handler selected");
        }
        handler
    }

    /// Motivo de omisión para archivos sin manejador.
    pub fn unsupported_reason(path: &Path) -> String {
        match extension_of(path) {
            Some(extension) => format!("unsupported file type: .{extension}"),
            None => "unsupported file type: (no extension)".to_string(),
        }
    }

    pub fn handlers(&self) -> &[FormatHandler] {
        &self.handlers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::HandlerKind;

    fn registry() -> HandlerRegistry {
        HandlerRegistry::for_options(&ScrubOptions::default())
            .expect("the standard handlers do not overlap")
    }

    #[test]
    fn selects_by_extension_ignoring_case() {
        let registry = registry();

        let kind = |path: &str| registry.select(Path::new(path)).map(|h| h.kind());
        assert_eq!(kind("/in/photo.JPG"), Some(HandlerKind::Image));
        assert_eq!(kind("/in/scan.Pdf"), Some(HandlerKind::Pdf));
        assert_eq!(kind("/in/deck.pptx"), Some(HandlerKind::OfficeDocument));
        assert_eq!(kind("/in/song.flac"), Some(HandlerKind::AudioVideo));
    }

    #[test]
    fn unknown_or_missing_extension_has_no_handler() {
        let registry = registry();

        assert!(registry.select(Path::new("/in/notes.txt")).is_none());
        assert!(registry.select(Path::new("/in/Makefile")).is_none());
        assert_eq!(
            HandlerRegistry::unsupported_reason(Path::new("/in/notes.TXT")),
            "unsupported file type: .txt"
        );
        assert_eq!(
            HandlerRegistry::unsupported_reason(Path::new("/in/Makefile")),
            "unsupported file type: (no extension)"
        );
    }

    #[test]
    fn rejects_overlapping_handlers() {
        let result = HandlerRegistry::new(vec![
            FormatHandler::Pdf(PdfHandler),
            FormatHandler::Image(ImageHandler),
            FormatHandler::Pdf(PdfHandler),
        ]);

        assert_eq!(
            result.err(),
            Some(RegistryError::DuplicateExtension {
                extension: "pdf".to_string(),
                first: "pdf",
                second: "pdf",
            })
        );
    }

    #[test]
    fn every_handler_is_registered() {
        assert_eq!(registry().handlers().len(), 4);
    }
}
