//! Minimal OSC 1.0 message decoder.
//!
//! Decodes a single datagram into an address plus typed arguments.
//! Only the argument types the command set uses are handled: `s`
//! (string), `i` (int32) and `f` (float32). Bundles and the remaining
//! tag types are rejected; the command set never uses them.
//!
//! Wire layout per the OSC 1.0 spec: a null-terminated address padded
//! to a 4-byte boundary, a `,`-prefixed type tag string (also padded),
//! then big-endian argument data. A message with no type tag string is
//! treated as having no arguments, which some older senders produce.

use super::error::OscError;

/// A decoded OSC argument.
#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    /// `s` type tag.
    Str(String),
    /// `i` type tag.
    Int(i32),
    /// `f` type tag.
    Float(f32),
}

impl OscArg {
    /// Render the argument as text, coercing numbers to their decimal
    /// form. Prompt commands accept any argument type this way.
    pub fn to_text(&self) -> String {
        match self {
            OscArg::Str(s) => s.clone(),
            OscArg::Int(i) => i.to_string(),
            OscArg::Float(f) => f.to_string(),
        }
    }

    /// Interpret the argument as an integer.
    ///
    /// Ints pass through, floats truncate, and numeric strings parse;
    /// anything else is `None`. This mirrors how loosely typed OSC
    /// clients send the verbosity level.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            OscArg::Int(i) => Some(*i),
            OscArg::Float(f) => Some(*f as i32),
            OscArg::Str(s) => s.trim().parse().ok(),
        }
    }
}

/// A decoded OSC message.
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    /// Address pattern, e.g. `/prompt`.
    pub address: String,
    /// Arguments in wire order.
    pub args: Vec<OscArg>,
}

/// Decode a single OSC datagram.
pub fn decode_message(datagram: &[u8]) -> Result<OscMessage, OscError> {
    if datagram.starts_with(b"#bundle") {
        return Err(OscError::BundleUnsupported);
    }

    let mut pos = 0;
    let address = read_padded_str(datagram, &mut pos)?;
    if !address.starts_with('/') {
        return Err(OscError::Malformed(format!(
            "address does not start with '/': {address:?}"
        )));
    }
    let address = address.to_string();

    // No type tag string: message with no arguments.
    if pos >= datagram.len() {
        return Ok(OscMessage {
            address,
            args: Vec::new(),
        });
    }

    let tags = read_padded_str(datagram, &mut pos)?;
    let tags = tags
        .strip_prefix(',')
        .ok_or_else(|| OscError::Malformed("type tag string missing ',' prefix".into()))?
        .to_string();

    let mut args = Vec::with_capacity(tags.len());
    for tag in tags.chars() {
        match tag {
            's' => {
                let s = read_padded_str(datagram, &mut pos)?;
                args.push(OscArg::Str(s.to_string()));
            }
            'i' => args.push(OscArg::Int(i32::from_be_bytes(read_word(
                datagram, &mut pos,
            )?))),
            'f' => args.push(OscArg::Float(f32::from_be_bytes(read_word(
                datagram, &mut pos,
            )?))),
            other => return Err(OscError::UnsupportedType(other)),
        }
    }

    Ok(OscMessage { address, args })
}

/// Read a null-terminated string padded to a 4-byte boundary.
fn read_padded_str<'a>(data: &'a [u8], pos: &mut usize) -> Result<&'a str, OscError> {
    let rest = &data[*pos..];
    let nul = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| OscError::Malformed("unterminated string".into()))?;
    let s = std::str::from_utf8(&rest[..nul])
        .map_err(|e| OscError::Malformed(format!("invalid UTF-8 in string: {e}")))?;

    // Consume the string, its terminator, and padding to the next
    // 4-byte boundary.
    let consumed = (nul + 4) & !3;
    *pos += consumed.min(rest.len());
    Ok(s)
}

/// Read a big-endian 4-byte word.
fn read_word(data: &[u8], pos: &mut usize) -> Result<[u8; 4], OscError> {
    let end = *pos + 4;
    if end > data.len() {
        return Err(OscError::Malformed("truncated argument data".into()));
    }
    let word: [u8; 4] = data[*pos..end].try_into().expect("slice length checked");
    *pos = end;
    Ok(word)
}
