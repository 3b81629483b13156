//! Content identifiers.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

/// Content up to this many bytes is embedded directly in its CID.
pub const EMBED_LIMIT: usize = 64;

const LENGTH_PREFIX_BYTES: usize = 6;
const LENGTH_PREFIX_CHARS: usize = 8;
const DIGEST_BYTES: usize = 64;

/// Errors produced when a string is not a well-formed CID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CidError {
    /// Shorter than the length prefix.
    TooShort { len: usize },
    /// A character outside the URL-safe base64 alphabet.
    InvalidCharacter { character: char, position: usize },
    /// The base64 payload did not decode.
    Malformed { message: String },
    /// The payload size disagrees with the declared content length.
    LengthMismatch { declared: u64, actual: usize },
}

impl fmt::Display for CidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CidError::TooShort { len } => {
                write!(
                    f,
                    "cid too short: {} characters, need at least {}",
                    len, LENGTH_PREFIX_CHARS
                )
            }
            CidError::InvalidCharacter {
                character,
                position,
            } => {
                write!(
                    f,
                    "invalid cid character '{}' at position {}",
                    character, position
                )
            }
            CidError::Malformed { message } => write!(f, "malformed cid: {}", message),
            CidError::LengthMismatch { declared, actual } => {
                write!(
                    f,
                    "cid payload is {} bytes but declared length is {}",
                    actual, declared
                )
            }
        }
    }
}

impl std::error::Error for CidError {}

/// A validated content identifier.
///
/// The textual form is the URL-safe base64 (unpadded) encoding of a 6-byte
/// big-endian content length, followed by the URL-safe base64 encoding of
/// either the content itself (when it fits in [`EMBED_LIMIT`] bytes) or its
/// SHA-512 digest.
///
/// Because the length is part of the identifier, a CID tells you on its own
/// whether it can be decoded without a store lookup.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cid {
    text: String,
    declared_len: u64,
}

impl Cid {
    /// Compute the CID for some content.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cidchain_store::Cid;
    ///
    /// assert_eq!(Cid::for_content(b"").as_str(), "AAAAAAAA");
    /// assert_eq!(Cid::for_content(b"hi"), Cid::for_content(b"hi"));
    /// ```
    pub fn for_content(content: &[u8]) -> Self {
        let declared_len = content.len() as u64;
        let prefix = declared_len.to_be_bytes();
        let mut text = URL_SAFE_NO_PAD.encode(&prefix[prefix.len() - LENGTH_PREFIX_BYTES..]);

        if content.len() <= EMBED_LIMIT {
            URL_SAFE_NO_PAD.encode_string(content, &mut text);
        } else {
            URL_SAFE_NO_PAD.encode_string(Sha512::digest(content), &mut text);
        }

        Cid { text, declared_len }
    }

    /// Parse and validate a CID string.
    ///
    /// Validation is purely structural: the prefix must decode to a length,
    /// and the payload must be exactly that many bytes (embedded) or exactly
    /// a SHA-512 digest (hashed). Non-canonical base64 is rejected.
    pub fn parse(s: &str) -> Result<Self, CidError> {
        if s.len() < LENGTH_PREFIX_CHARS {
            return Err(CidError::TooShort { len: s.len() });
        }

        if let Some((position, character)) = s.char_indices().find(|(_, c)| !is_cid_char(*c)) {
            return Err(CidError::InvalidCharacter {
                character,
                position,
            });
        }

        let declared_len = decode_length(&s[..LENGTH_PREFIX_CHARS])?;
        let payload = URL_SAFE_NO_PAD
            .decode(&s[LENGTH_PREFIX_CHARS..])
            .map_err(|e| CidError::Malformed {
                message: e.to_string(),
            })?;

        let expected = if declared_len <= EMBED_LIMIT as u64 {
            declared_len as usize
        } else {
            DIGEST_BYTES
        };

        if payload.len() != expected {
            return Err(CidError::LengthMismatch {
                declared: declared_len,
                actual: payload.len(),
            });
        }

        Ok(Cid {
            text: s.to_string(),
            declared_len,
        })
    }

    /// Parse a token of the form `{cid}` or `{cid}.{ext}`.
    ///
    /// The extension is returned lowercased. It never contributes to the
    /// identity of the CID.
    pub fn parse_with_extension(token: &str) -> Result<(Self, Option<String>), CidError> {
        match token.split_once('.') {
            None => Ok((Self::parse(token)?, None)),
            Some((cid, extension)) => {
                if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric())
                {
                    return Err(CidError::Malformed {
                        message: format!("invalid extension '{}'", extension),
                    });
                }
                Ok((Self::parse(cid)?, Some(extension.to_ascii_lowercase())))
            }
        }
    }

    /// The textual form.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in bytes of the content this CID names.
    pub fn declared_len(&self) -> u64 {
        self.declared_len
    }

    /// Whether the content is embedded in the identifier.
    pub fn is_embedded(&self) -> bool {
        self.declared_len <= EMBED_LIMIT as u64
    }

    /// Decode embedded content. `None` for hash-mode CIDs.
    pub fn embedded_content(&self) -> Option<Vec<u8>> {
        if !self.is_embedded() {
            return None;
        }
        // Validated at construction, so the payload always decodes.
        URL_SAFE_NO_PAD.decode(&self.text[LENGTH_PREFIX_CHARS..]).ok()
    }
}

fn is_cid_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn decode_length(prefix: &str) -> Result<u64, CidError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(prefix)
        .map_err(|e| CidError::Malformed {
            message: format!("length prefix: {}", e),
        })?;

    let mut buf = [0u8; 8];
    buf[8 - LENGTH_PREFIX_BYTES..].copy_from_slice(&bytes);
    Ok(u64::from_be_bytes(buf))
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Cid {
    type Err = CidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cid::parse(s)
    }
}

impl TryFrom<String> for Cid {
    type Error = CidError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Cid::parse(&s)
    }
}

impl From<Cid> for String {
    fn from(cid: Cid) -> Self {
        cid.text
    }
}

impl AsRef<str> for Cid {
    fn as_ref(&self) -> &str {
        &self.text
    }
}
