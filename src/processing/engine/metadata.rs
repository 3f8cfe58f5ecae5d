//! Source identification from embedded EXIF.

use std::io::Cursor;
use exif::{In, Tag, Value};
use tracing::trace;

/// Camera make and model from the EXIF block of `data`, if any.
///
/// The make is omitted when the model already starts with it
/// ("Canon" + "Canon EOS R5" gives "Canon EOS R5"). A missing half is
/// reported as "unknown".
pub fn camera_tag(data: &[u8]) -> Option<String> {
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif) => exif,
        Err(e) => {
            trace!("No usable EXIF: {}", e);
            return None;
        }
    };

    let read = |tag: Tag| {
        exif.get_field(tag, In::PRIMARY).and_then(|field| match &field.value {
            Value::Ascii(parts) => parts
                .first()
                .map(|bytes| String::from_utf8_lossy(bytes).trim_matches(char::from(0)).trim().to_string())
                .filter(|s| !s.is_empty()),
            _ => None,
        })
    };

    match (read(Tag::Make), read(Tag::Model)) {
        (None, None) => None,
        (Some(make), Some(model)) if model.to_lowercase().starts_with(&make.to_lowercase()) => Some(model),
        (make, model) => Some(format!(
            "{} {}",
            make.as_deref().unwrap_or("unknown"),
            model.as_deref().unwrap_or("unknown")
        )),
    }
}
