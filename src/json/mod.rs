//! JSON reading and writing helpers

mod diagnostics;

pub use diagnostics::JsonSyntaxError;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

/// Serialize a value the way the ledger files are stored on disk:
/// four-space indentation, non-ASCII text kept as-is, trailing newline.
pub fn to_pretty_string<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    // serde_json only ever emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
