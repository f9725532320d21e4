//! Strict text decoding of the raw source file.
//!
//! The upstream price file is published in the Korean legacy code page, so
//! the bytes are transcoded to UTF-8 before DuckDB ever sees them. Decoding
//! never substitutes replacement characters: a single malformed sequence
//! fails the whole load.

use encoding_rs::Encoding;

use crate::error::{PriceError, Result};

/// Labels commonly used for the Korean Windows code page that are not part
/// of the WHATWG label set `encoding_rs` understands.
const KOREAN_ALIASES: [&str; 4] = ["cp949", "ms949", "uhc", "x-windows-949"];

/// Resolve an encoding label (`"cp949"`, `"utf-8"`, `"euc-kr"`, ...).
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    let trimmed = label.trim();
    let lookup = if KOREAN_ALIASES
        .iter()
        .any(|alias| alias.eq_ignore_ascii_case(trimmed))
    {
        "windows-949"
    } else {
        trimmed
    };
    Encoding::for_label(lookup.as_bytes())
        .ok_or_else(|| PriceError::InvalidArgument(format!("unknown text encoding: {}", label)))
}

/// Decode `bytes` as `encoding`, honouring a leading byte-order mark.
///
/// A BOM overrides the configured encoding and is stripped from the output.
pub fn decode_text(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((bom_encoding, bom_len)) => (bom_encoding, &bytes[bom_len..]),
        None => (encoding, bytes),
    };

    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
        .ok_or_else(|| {
            PriceError::Parse(format!(
                "source text is not valid {} (undecodable byte sequence)",
                encoding.name()
            ))
        })
}
