//! Per-session input metadata.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{ProtocolError, ProtocolResult};
use crate::field::FieldType;

/// Names and declared types of the inputs published in a session.
///
/// `inputs[i]` is declared with `types[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionMeta {
    inputs: Vec<String>,
    types: Vec<FieldType>,
}

impl SessionMeta {
    pub fn new<I, T>(inputs: I, types: T) -> ProtocolResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<FieldType>,
    {
        let inputs: Vec<String> = inputs.into_iter().map(Into::into).collect();
        let types: Vec<FieldType> = types.into_iter().map(Into::into).collect();
        if inputs.len() != types.len() {
            return Err(ProtocolError::MetaLengthMismatch {
                inputs: inputs.len(),
                types: types.len(),
            });
        }
        Ok(Self { inputs, types })
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn types(&self) -> &[FieldType] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Declared type of `name`, or `None` if it is not a session input.
    ///
    /// When a name is listed twice the last declaration wins.
    pub fn input_type(&self, name: &str) -> Option<FieldType> {
        let lookup: HashMap<&str, &FieldType> = self
            .inputs
            .iter()
            .map(String::as_str)
            .zip(self.types.iter())
            .collect();
        lookup.get(name).map(|ty| (*ty).clone())
    }
}
