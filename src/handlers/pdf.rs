//! Limpieza del diccionario Info y del flujo XMP de documentos PDF.

use std::fs;
use std::path::Path;

use lopdf::{Document, Object};
use tracing::debug;

use super::{HandlerKind, ScrubHandler, Scrubbed, sniff_mime};
use crate::error::HandlerError;

const PDF_MIME: &str = "application/pdf";

#[derive(Clone, Debug, Default)]
pub struct PdfHandler;

impl ScrubHandler for PdfHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Pdf
    }

    fn extensions(&self) -> &[&'static str] {
        &["pdf"]
    }

    fn removed_summary(&self) -> &'static str {
        "PDF document info and XMP metadata"
    }

    fn scrub(&self, input: &Path, staging: &Path) -> Result<Scrubbed, HandlerError> {
        // Leer antes de analizar distingue permisos de contenido corrupto.
        let bytes = fs::read(input).map_err(|error| HandlerError::io(input, error))?;

        if sniff_mime(&bytes).is_some_and(|mime| mime != PDF_MIME) {
            return Err(invalid_pdf("file content is not PDF"));
        }

        let mut doc = Document::load_mem(&bytes).map_err(invalid_pdf)?;

        if doc.is_encrypted() {
            return Err(HandlerError::invalid_input(
                "PDF is password-protected",
                "Decrypt the PDF first before scrubbing metadata",
            ));
        }

        let removed_info = remove_document_info(&mut doc);
        let removed_xmp = remove_catalog_metadata(&mut doc);
        debug!(
            input = %input.display(),
            removed_info,
            removed_xmp,
            "pdf metadata dictionaries removed"
        );

        let mut cleaned = Vec::new();
        doc.save_to(&mut cleaned)
            .map_err(|error| HandlerError::Processing(format!("failed to serialize PDF: {error}")))?;

        fs::write(staging, &cleaned).map_err(|error| HandlerError::io(staging, error))?;

        Ok(Scrubbed::new(self.removed_summary()))
    }
}

/// Elimina la entrada `Info` del trailer y el objeto al que apunta.
fn remove_document_info(doc: &mut Document) -> bool {
    match doc.trailer.remove(b"Info") {
        Some(info) => {
            drop_referenced_object(doc, &info);
            true
        }
        None => false,
    }
}

/// Elimina el flujo XMP (`/Metadata`) del catálogo del documento.
fn remove_catalog_metadata(doc: &mut Document) -> bool {
    let Some(root_id) = doc
        .trailer
        .get(b"Root")
        .ok()
        .and_then(|root| root.as_reference().ok())
    else {
        return false;
    };

    let removed = doc
        .get_object_mut(root_id)
        .ok()
        .and_then(|catalog| catalog.as_dict_mut().ok())
        .and_then(|catalog| catalog.remove(b"Metadata"));

    match removed {
        Some(metadata) => {
            drop_referenced_object(doc, &metadata);
            true
        }
        None => false,
    }
}

fn drop_referenced_object(doc: &mut Document, object: &Object) {
    if let Ok(id) = object.as_reference() {
        doc.objects.remove(&id);
    }
}

fn invalid_pdf(reason: impl std::fmt::Display) -> HandlerError {
    HandlerError::invalid_input(
        format!("Invalid or corrupted PDF: {reason}"),
        "Verify file is a valid PDF or try repairing it first",
    )
}
