//! Limpieza de metadata EXIF/IPTC/XMP en imágenes mediante recodificación de píxeles.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use ::image::codecs::jpeg::JpegEncoder;
use ::image::{DynamicImage, ImageError, ImageFormat, ImageReader};
use tracing::debug;

use super::{HandlerKind, ScrubHandler, Scrubbed};
use crate::error::HandlerError;
use crate::result::ErrorCategory;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tif", "tiff"];
const JPEG_QUALITY: u8 = 95;

#[derive(Clone, Debug, Default)]
pub struct ImageHandler;

impl ScrubHandler for ImageHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Image
    }

    fn extensions(&self) -> &[&'static str] {
        IMAGE_EXTENSIONS
    }

    fn removed_summary(&self) -> &'static str {
        "EXIF/IPTC/XMP metadata"
    }

    fn scrub(&self, input: &Path, staging: &Path) -> Result<Scrubbed, HandlerError> {
        let reader = ImageReader::open(input)
            .map_err(|error| HandlerError::io(input, error))?
            .with_guessed_format()
            .map_err(|error| HandlerError::io(input, error))?;

        let format = reader.format().ok_or_else(not_an_image)?;
        let decoded = reader.decode().map_err(|error| decode_error(input, error))?;

        let encoded = encode_pixels(decoded, format)?;

        if !verify_image_metadata_clean(&encoded)? {
            return Err(HandlerError::categorized(
                ErrorCategory::ProcessingError,
                "Metadata verification failed: EXIF fields remain after re-encoding",
                "File may use an unusual image variant; convert it to PNG or JPEG first",
            ));
        }

        fs::write(staging, &encoded).map_err(|error| HandlerError::io(staging, error))?;
        debug!(input = %input.display(), ?format, "image re-encoded without metadata");

        Ok(Scrubbed::new(self.removed_summary()))
    }
}

/// Recodifica solo los píxeles en el mismo formato de origen.
fn encode_pixels(image: DynamicImage, format: ImageFormat) -> Result<Vec<u8>, HandlerError> {
    let mut buffer = Cursor::new(Vec::new());

    let written = if format == ImageFormat::Jpeg {
        // JPEG no admite canal alfa.
        let image = if image.color().has_alpha() {
            DynamicImage::ImageRgb8(image.to_rgb8())
        } else {
            image
        };
        image.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY))
    } else {
        image.write_to(&mut buffer, format)
    };

    written.map_err(|error| {
        HandlerError::Processing(format!("failed to encode clean {format:?} image: {error}"))
    })?;

    Ok(buffer.into_inner())
}

/// Comprueba que la imagen codificada carece de campos EXIF identificativos.
///
/// Un TIFF siempre expone su estructura como IFD0; solo cuentan las etiquetas
/// de autoría y las de los IFD Exif/GPS/Interop.
pub(crate) fn verify_image_metadata_clean(encoded: &[u8]) -> Result<bool, HandlerError> {
    let mut reader = Cursor::new(encoded);

    match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => Ok(!exif.fields().any(is_identifying_field)),
        Err(exif::Error::NotFound(_)) | Err(exif::Error::BlankValue(_)) => Ok(true),
        Err(exif::Error::InvalidFormat(_)) => Ok(true),
        Err(exif::Error::Io(error)) => Err(HandlerError::Processing(format!(
            "could not read EXIF data during verification: {error}"
        ))),
        Err(other) => Err(HandlerError::Processing(format!(
            "EXIF verification error: {other}"
        ))),
    }
}

fn is_identifying_field(field: &exif::Field) -> bool {
    const IDENTIFYING_TIFF_TAGS: [exif::Tag; 7] = [
        exif::Tag::Make,
        exif::Tag::Model,
        exif::Tag::Artist,
        exif::Tag::Copyright,
        exif::Tag::DateTime,
        exif::Tag::Software,
        exif::Tag::ImageDescription,
    ];

    match field.tag.context() {
        exif::Context::Tiff => IDENTIFYING_TIFF_TAGS.contains(&field.tag),
        _ => true,
    }
}

fn not_an_image() -> HandlerError {
    HandlerError::invalid_input(
        "Not a valid image file or unsupported format",
        "Verify file is a valid JPG, PNG, WebP or TIFF image",
    )
}

fn decode_error(input: &Path, error: ImageError) -> HandlerError {
    match error {
        ImageError::IoError(error) => HandlerError::io(input, error),
        ImageError::Decoding(_) | ImageError::Unsupported(_) => not_an_image(),
        ImageError::Limits(error) => HandlerError::categorized(
            ErrorCategory::ProcessingError,
            format!("Image exceeds decoder limits: {error}"),
            "Reduce the image dimensions before scrubbing",
        ),
        other => HandlerError::Processing(other.to_string()),
    }
}
