use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{TypeError, TypeResult};

/// An opaque JSON value kept as the exact text it arrived as.
///
/// The payload is parsed once, when it is built, so holding a `Payload`
/// proves the text is valid JSON. It is never re-encoded: serializing writes
/// the received bytes back out, whitespace and key order included.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Box<RawValue>);

impl Payload {
    /// Validate `json` and wrap it.
    pub fn from_json(json: impl Into<String>) -> TypeResult<Self> {
        RawValue::from_string(json.into())
            .map(Self)
            .map_err(|e| TypeError::InvalidJson(e.to_string()))
    }

    /// The raw JSON text.
    pub fn as_str(&self) -> &str {
        self.0.get()
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Payload {}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({})", self.as_str())
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
