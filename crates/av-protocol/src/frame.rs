//! Camera frames as raw pixel arrays.
//!
//! An `ImageArray` is a row-major `height × width × channels` grid.
//! 2-D arrays (grayscale) are stored with one channel but remember
//! that they were 2-D so `shape()` reports what the caller passed in.

use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};

/// Sample storage for a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    F32(Vec<f32>),
}

impl Samples {
    fn len(&self) -> usize {
        match self {
            Samples::U8(v) => v.len(),
            Samples::F32(v) => v.len(),
        }
    }
}

/// A 2-D or 3-D numeric pixel array.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageArray {
    height: usize,
    width: usize,
    channels: usize,
    ndim: usize,
    samples: Samples,
}

impl ImageArray {
    /// Build a frame from 8-bit samples.
    pub fn from_u8(shape: &[usize], data: Vec<u8>) -> ProtocolResult<Self> {
        Self::new(shape, Samples::U8(data))
    }

    /// Build a frame from floating point samples (e.g. a normalized
    /// camera tensor). Samples are cast to 8 bits when encoded.
    pub fn from_f32(shape: &[usize], data: Vec<f32>) -> ProtocolResult<Self> {
        Self::new(shape, Samples::F32(data))
    }

    fn new(shape: &[usize], samples: Samples) -> ProtocolResult<Self> {
        let (height, width, channels) = match *shape {
            [h, w] => (h, w, 1),
            [h, w, c] => (h, w, c),
            _ => return Err(ProtocolError::Dimensions(shape.len())),
        };
        let expected = sample_count(shape)?;
        if samples.len() != expected {
            return Err(ProtocolError::ShapeMismatch {
                shape: shape.to_vec(),
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            height,
            width,
            channels,
            ndim: shape.len(),
            samples,
        })
    }

    /// Parse a nested JSON array (`[[..]]` or `[[[..]]]`) of numbers.
    pub fn from_json(field: &str, value: &Value) -> ProtocolResult<Self> {
        let mut shape = Vec::new();
        let mut cursor = value;
        while let Value::Array(items) = cursor {
            shape.push(items.len());
            match items.first() {
                Some(first) => cursor = first,
                None => break,
            }
        }
        if !(2..=3).contains(&shape.len()) {
            return Err(ProtocolError::Dimensions(shape.len()));
        }

        // Only the first element at each depth was inspected, so the shape
        // is unchecked until `flatten` has walked every row.
        let mut data = Vec::new();
        flatten(field, value, &shape, &mut data)?;
        Self::from_f32(&shape, data)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// The shape as originally given (2 or 3 entries).
    pub fn shape(&self) -> Vec<usize> {
        if self.ndim == 2 {
            vec![self.height, self.width]
        } else {
            vec![self.height, self.width, self.channels]
        }
    }

    /// Samples at 8-bit depth. Float samples are truncated and saturate
    /// at 0 and 255; NaN becomes 0.
    pub fn to_u8(&self) -> Vec<u8> {
        match &self.samples {
            Samples::U8(v) => v.clone(),
            Samples::F32(v) => v.iter().map(|&s| s as u8).collect(),
        }
    }
}

fn sample_count(shape: &[usize]) -> ProtocolResult<usize> {
    shape
        .iter()
        .try_fold(1usize, |n, &d| n.checked_mul(d))
        .ok_or_else(|| ProtocolError::ShapeOverflow(shape.to_vec()))
}

fn flatten(field: &str, value: &Value, shape: &[usize], out: &mut Vec<f32>) -> ProtocolResult<()> {
    let Some((&len, rest)) = shape.split_first() else {
        let sample = value.as_f64().ok_or_else(|| ProtocolError::InvalidValue {
            field: field.to_string(),
            expected: "image_array".into(),
            reason: format!("non-numeric sample {value}"),
        })?;
        out.push(sample as f32);
        return Ok(());
    };

    match value.as_array() {
        Some(items) if items.len() == len => {
            for item in items {
                flatten(field, item, rest, out)?;
            }
            Ok(())
        }
        _ => Err(ProtocolError::InvalidValue {
            field: field.to_string(),
            expected: "image_array".into(),
            reason: "ragged array".into(),
        }),
    }
}
