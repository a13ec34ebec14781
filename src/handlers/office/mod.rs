//! Limpieza de propiedades de documentos Office basados en ZIP (DOCX, XLSX, PPTX).
//!
//! Solo se reescriben las partes `docProps/*`; el resto del paquete se copia
//! entrada por entrada con sus opciones originales.

mod archive;
mod constants;
mod sanitize;
mod verify;
mod xml;

use std::path::Path;

use tracing::debug;

use super::{HandlerKind, ScrubHandler, Scrubbed};
use crate::error::HandlerError;
use crate::result::ErrorCategory;

use self::archive::rewrite_package;
use self::constants::{APP_PART, CORE_PART, CUSTOM_PART};
use self::sanitize::{sanitize_app_properties, sanitize_core_properties, sanitize_custom_properties};
use self::verify::verify_office_metadata_clean;

#[cfg(test)]
pub(crate) use self::verify::verify_office_metadata_clean as verify_package_clean;

#[derive(Clone, Debug, Default)]
pub struct OfficeHandler;

impl ScrubHandler for OfficeHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::OfficeDocument
    }

    fn extensions(&self) -> &[&'static str] {
        &["docx", "xlsx", "pptx"]
    }

    fn removed_summary(&self) -> &'static str {
        "Office document properties"
    }

    fn scrub(&self, input: &Path, staging: &Path) -> Result<Scrubbed, HandlerError> {
        let changed = rewrite_package(input, staging, |name, contents| match name {
            CORE_PART => sanitize_core_properties(contents),
            APP_PART => sanitize_app_properties(contents),
            CUSTOM_PART => sanitize_custom_properties(contents),
            _ => Ok((contents, false)),
        })?;

        if !verify_office_metadata_clean(staging)? {
            return Err(HandlerError::categorized(
                ErrorCategory::ProcessingError,
                "Metadata verification failed: document properties remain after cleaning",
                "Re-save the document in Office and try again",
            ));
        }

        debug!(input = %input.display(), parts = ?changed, "office properties neutralized");

        if changed.is_empty() {
            Ok(Scrubbed::new("no document properties found"))
        } else {
            Ok(Scrubbed::new(format!(
                "{} ({})",
                self.removed_summary(),
                changed.join(", ")
            )))
        }
    }
}
