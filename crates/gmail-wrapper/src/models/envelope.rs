//! Uniform result shape returned by every mailbox operation

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::error::{Error, Result};

/// Outcome of a facade call: a payload or a failure, never both
///
/// Serializes to `{"status": true, "data": ...}` on success and
/// `{"status": false, "message": "..."}` on failure.
#[derive(Debug)]
pub enum Envelope<T> {
    Success(T),
    Failure(Error),
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success(_))
    }

    /// The payload, present only on success
    pub fn data(&self) -> Option<&T> {
        match self {
            Envelope::Success(data) => Some(data),
            Envelope::Failure(_) => None,
        }
    }

    /// The human-readable failure message, present only on failure
    pub fn message(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Envelope::Success(_) => None,
            Envelope::Failure(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<T> {
        match self {
            Envelope::Success(data) => Ok(data),
            Envelope::Failure(err) => Err(err),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        match self {
            Envelope::Success(data) => Envelope::Success(f(data)),
            Envelope::Failure(err) => Envelope::Failure(err),
        }
    }
}

impl<T> From<Result<T>> for Envelope<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Envelope::Success(data),
            Err(err) => Envelope::Failure(err),
        }
    }
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Envelope", 2)?;
        match self {
            Envelope::Success(data) => {
                state.serialize_field("status", &true)?;
                state.serialize_field("data", data)?;
            }
            Envelope::Failure(err) => {
                state.serialize_field("status", &false)?;
                state.serialize_field("message", &err.to_string())?;
            }
        }
        state.end()
    }
}
