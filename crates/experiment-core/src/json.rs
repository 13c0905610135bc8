//! Flag file persistence
//!
//! Flag files are pretty-printed JSON with 4-space indentation. Keys come out
//! sorted because [`FlagSet`](crate::FlagSet) is a `BTreeMap`.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, instrument};

use crate::error::Result;

/// Serialize `data` to `path`, overwriting any existing file
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn json_store<T: Serialize + ?Sized>(path: impl AsRef<Path>, data: &T) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    data.serialize(&mut serializer)?;

    fs::write(path.as_ref(), &buf)?;
    debug!(size = buf.len(), "Stored JSON");
    Ok(())
}

/// Deserialize the JSON document at `path`
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn json_load<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let text = fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&text)?)
}
