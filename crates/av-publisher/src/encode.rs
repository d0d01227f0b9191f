//! Type-directed encoding of record fields.
//!
//! Scalars go into the record unchanged. Camera frames are JPEG-encoded
//! in memory: the field itself gets a generated filename and the JPEG
//! bytes go base64-encoded under `image`.

use av_protocol::{FieldType, FieldValue, ImageArray, KEY_IMAGE, TelemetryRecord};
use base64::Engine;
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;

use crate::error::{PublisherError, PublisherResult};

/// Extension used for encoded camera frames.
pub const IMAGE_EXT: &str = ".jpg";

/// JPEG quality for camera frames.
pub const JPEG_QUALITY: u8 = 75;

/// Tag reported when a field is not declared in the session.
const UNDECLARED: &str = "undeclared";

/// Encode one field into `record` according to its declared type.
///
/// `current_ix` is the sequence number the record will be stamped with.
pub fn encode_field(
    record: &mut TelemetryRecord,
    current_ix: i64,
    key: &str,
    ty: Option<FieldType>,
    value: FieldValue,
) -> PublisherResult<()> {
    match ty {
        Some(FieldType::Str | FieldType::Float | FieldType::Int | FieldType::Boolean) => {
            record.insert(key, value);
            Ok(())
        }
        Some(FieldType::ImageArray) => {
            let frame = match value {
                FieldValue::Image(frame) => frame,
                other => {
                    return Err(PublisherError::Encode {
                        field: key.to_string(),
                        reason: format!("expected an image array, got {other:?}"),
                    });
                }
            };
            let jpeg = encode_jpeg(&frame).map_err(|reason| PublisherError::Encode {
                field: key.to_string(),
                reason,
            })?;
            record.insert(key, make_file_name(current_ix, key, IMAGE_EXT));
            record.insert(
                KEY_IMAGE,
                base64::engine::general_purpose::STANDARD.encode(jpeg),
            );
            Ok(())
        }
        Some(FieldType::Unsupported(tag)) => Err(PublisherError::UnsupportedType {
            field: key.to_string(),
            tag,
        }),
        None => Err(PublisherError::UnsupportedType {
            field: key.to_string(),
            tag: UNDECLARED.to_string(),
        }),
    }
}

/// Filename for an encoded field: `{ix}_{key}_{ext}` with `/` replaced,
/// so the name is always a single path segment.
pub fn make_file_name(current_ix: i64, key: &str, ext: &str) -> String {
    [current_ix.to_string().as_str(), key, ext]
        .join("_")
        .replace('/', "-")
}

/// JPEG-encode a frame at 8-bit depth.
///
/// One channel encodes as grayscale, three as RGB; a fourth (alpha)
/// channel is dropped.
pub fn encode_jpeg(frame: &ImageArray) -> Result<Vec<u8>, String> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(format!("empty frame of shape {:?}", frame.shape()));
    }
    let width = u32::try_from(frame.width()).map_err(|e| e.to_string())?;
    let height = u32::try_from(frame.height()).map_err(|e| e.to_string())?;

    let samples = frame.to_u8();
    let (pixels, color) = match frame.channels() {
        1 => (samples, ExtendedColorType::L8),
        3 => (samples, ExtendedColorType::Rgb8),
        4 => (
            samples
                .chunks_exact(4)
                .flat_map(|px| px[..3].iter().copied())
                .collect(),
            ExtendedColorType::Rgb8,
        ),
        n => return Err(format!("cannot encode {n}-channel frame as JPEG")),
    };

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode(&pixels, width, height, color)
        .map_err(|e| e.to_string())?;
    Ok(jpeg)
}
