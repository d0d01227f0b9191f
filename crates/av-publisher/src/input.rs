//! Parsing of line-delimited JSON input for the publisher binary.
//!
//! Each line is a JSON array holding one value per session input, in
//! input order. Camera frames are nested numeric arrays.

use av_protocol::{FieldValue, SessionMeta};
use serde_json::Value;

use crate::error::{PublisherError, PublisherResult};

/// Convert one input line into values for `RecordPublisher::run`.
pub fn parse_line(meta: &SessionMeta, line: &str) -> PublisherResult<Vec<FieldValue>> {
    let value: Value =
        serde_json::from_str(line).map_err(|e| PublisherError::Input(e.to_string()))?;
    let Value::Array(items) = value else {
        return Err(PublisherError::Input("expected a JSON array".into()));
    };
    if items.len() != meta.len() {
        return Err(PublisherError::Arity {
            expected: meta.len(),
            actual: items.len(),
        });
    }

    meta.inputs()
        .iter()
        .zip(meta.types())
        .zip(&items)
        .map(|((name, ty), item)| {
            FieldValue::from_json(name, ty, item).map_err(PublisherError::from)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> SessionMeta {
        SessionMeta::new(
            ["speed", "mode", "recording", "cam/image_array"],
            ["float", "str", "boolean", "image_array"],
        )
        .unwrap()
    }

    #[test]
    fn parses_values_by_declared_type() {
        let values = parse_line(&meta(), r#"[1.5, "user", true, [[0, 128], [255, 64]]]"#).unwrap();
        assert_eq!(values[0], FieldValue::Float(1.5));
        assert_eq!(values[1], FieldValue::Str("user".into()));
        assert_eq!(values[2], FieldValue::Bool(true));
        assert!(matches!(values[3], FieldValue::Image(ref f) if f.shape() == vec![2, 2]));
    }

    #[test]
    fn wrong_length_is_arity_error() {
        let err = parse_line(&meta(), r#"[1.5, "user"]"#).unwrap_err();
        assert!(matches!(err, PublisherError::Arity { expected: 4, actual: 2 }));
    }

    #[test]
    fn non_array_is_rejected() {
        let err = parse_line(&meta(), r#"{"speed": 1.5}"#).unwrap_err();
        assert!(matches!(err, PublisherError::Input(_)));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = parse_line(&meta(), "[1.5,").unwrap_err();
        assert!(matches!(err, PublisherError::Input(_)));
    }

    #[test]
    fn ragged_frame_line_is_rejected() {
        let mut rows = vec![format!("[{}]", vec!["0"; 50_000].join(","))];
        rows.extend(std::iter::repeat_n("[]".to_string(), 49_999));
        let line = format!(r#"[1.5, "user", true, [{}]]"#, rows.join(","));
        let err = parse_line(&meta(), &line).unwrap_err();
        assert!(err.to_string().contains("ragged"), "{err}");
    }

    #[test]
    fn type_mismatch_names_the_field() {
        let err = parse_line(&meta(), r#"["fast", "user", true, [[0]]]"#).unwrap_err();
        assert!(err.to_string().contains("'speed'"), "{err}");
    }
}
