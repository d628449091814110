use postcard::{take_from_bytes, to_allocvec};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Errors raised while encoding or decoding wire messages.
///
/// Every variant except `Encode` means the input was malformed. Decoders
/// never substitute defaults for missing or ill-typed fields.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// The field envelope itself could not be parsed (truncated or garbled).
    Envelope { message: &'static str, reason: String },
    TrailingBytes { message: &'static str, remaining: usize },
    MissingField { message: &'static str, field: &'static str },
    InvalidField {
        message: &'static str,
        field: &'static str,
        reason: String,
    },
    UnknownModule(u32),
    /// An instruction carried no command field.
    NoCommand,
    /// An instruction carried more than one command field.
    ConflictingCommands { first: u32, second: u32 },
    Encode(String),
}

impl CodecError {
    /// True when the error describes bad input rather than an encoder fault.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, CodecError::Encode(_))
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Envelope { message, reason } => {
                write!(f, "malformed {} envelope: {}", message, reason)
            }
            CodecError::TrailingBytes { message, remaining } => {
                write!(f, "malformed {}: {} trailing bytes", message, remaining)
            }
            CodecError::MissingField { message, field } => {
                write!(f, "malformed {}: missing required field '{}'", message, field)
            }
            CodecError::InvalidField {
                message,
                field,
                reason,
            } => write!(f, "malformed {}: field '{}' {}", message, field, reason),
            CodecError::UnknownModule(code) => {
                write!(f, "malformed status report: unknown module code {}", code)
            }
            CodecError::NoCommand => write!(f, "malformed instruction: no command present"),
            CodecError::ConflictingCommands { first, second } => write!(
                f,
                "malformed instruction: commands with tags {} and {} both present",
                first, second
            ),
            CodecError::Encode(reason) => write!(f, "failed to encode message: {}", reason),
        }
    }
}

impl std::error::Error for CodecError {}

/// One tagged field as it travels on the wire.
#[derive(Serialize, Deserialize)]
struct RawField {
    tag: u32,
    value: Vec<u8>,
}

/// Builds a tagged message.
///
/// The envelope is a postcard-encoded list of `(tag, bytes)` pairs; scalar
/// values are postcard-encoded into their field bytes. Unset optional fields
/// are simply not written.
#[derive(Default)]
pub struct WireWriter {
    fields: Vec<RawField>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a postcard-encoded value under `tag`.
    pub fn put<T: Serialize + ?Sized>(&mut self, tag: u32, value: &T) -> Result<&mut Self, CodecError> {
        let value = to_allocvec(value).map_err(|e| CodecError::Encode(e.to_string()))?;
        self.fields.push(RawField { tag, value });
        Ok(self)
    }

    /// Write `value` only when it is present.
    pub fn put_opt<T: Serialize>(&mut self, tag: u32, value: Option<&T>) -> Result<&mut Self, CodecError> {
        match value {
            Some(value) => self.put(tag, value),
            None => Ok(self),
        }
    }

    /// Write raw bytes under `tag` without any inner encoding.
    pub fn put_bytes(&mut self, tag: u32, bytes: &[u8]) -> &mut Self {
        self.fields.push(RawField {
            tag,
            value: bytes.to_vec(),
        });
        self
    }

    /// Nest a finished message under `tag`.
    pub fn put_message(&mut self, tag: u32, nested: WireWriter) -> Result<&mut Self, CodecError> {
        let bytes = nested.finish()?;
        Ok(self.put_bytes(tag, &bytes))
    }

    pub fn finish(self) -> Result<Vec<u8>, CodecError> {
        to_allocvec(&self.fields).map_err(|e| CodecError::Encode(e.to_string()))
    }
}

/// Parsed view over a tagged message.
///
/// A repeated tag keeps its last occurrence. Tags the caller never asks for
/// are ignored, which keeps older decoders working against newer senders.
pub struct WireReader {
    message: &'static str,
    fields: BTreeMap<u32, Vec<u8>>,
}

impl WireReader {
    pub fn parse(message: &'static str, bytes: &[u8]) -> Result<Self, CodecError> {
        let (raw, rest): (Vec<RawField>, &[u8]) =
            take_from_bytes(bytes).map_err(|e| CodecError::Envelope {
                message,
                reason: e.to_string(),
            })?;

        if !rest.is_empty() {
            return Err(CodecError::TrailingBytes {
                message,
                remaining: rest.len(),
            });
        }

        let fields = raw.into_iter().map(|f| (f.tag, f.value)).collect();
        Ok(Self { message, fields })
    }

    pub fn has(&self, tag: u32) -> bool {
        self.fields.contains_key(&tag)
    }

    pub fn bytes(&self, tag: u32) -> Option<&[u8]> {
        self.fields.get(&tag).map(Vec::as_slice)
    }

    pub fn required<T: DeserializeOwned>(&self, tag: u32, field: &'static str) -> Result<T, CodecError> {
        match self.optional(tag, field)? {
            Some(value) => Ok(value),
            None => Err(CodecError::MissingField {
                message: self.message,
                field,
            }),
        }
    }

    pub fn optional<T: DeserializeOwned>(&self, tag: u32, field: &'static str) -> Result<Option<T>, CodecError> {
        let Some(bytes) = self.fields.get(&tag) else {
            return Ok(None);
        };

        let (value, rest) = take_from_bytes::<T>(bytes).map_err(|e| CodecError::InvalidField {
            message: self.message,
            field,
            reason: e.to_string(),
        })?;

        if !rest.is_empty() {
            return Err(CodecError::InvalidField {
                message: self.message,
                field,
                reason: format!("has {} trailing bytes", rest.len()),
            });
        }

        Ok(Some(value))
    }

    /// Tags present in the message that are not listed in `known`.
    pub fn unknown_tags(&self, known: &[u32]) -> Vec<u32> {
        self.fields
            .keys()
            .copied()
            .filter(|tag| !known.contains(tag))
            .collect()
    }
}
