//! URL-safe base64 without padding, the WebAuthn JSON wire convention.
//!
//! Every binary field that crosses the auth service or ceremony boundary
//! goes through this codec. Encoding never emits `+`, `/` or `=`; decoding
//! tolerates trailing padding so values produced by lenient peers still
//! round-trip to the same bytes.

use std::fmt;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{PasskeyError, Result};

const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes as URL-safe base64 without padding.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    BASE64URL.encode(bytes)
}

/// Decode URL-safe base64, with or without padding.
pub fn decode(encoded: &str) -> Result<Vec<u8>> {
    BASE64URL
        .decode(encoded)
        .map_err(|e| PasskeyError::Encoding(format!("Invalid base64url: {e}")))
}

/// Owned binary value serialized as a base64url string.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Base64UrlBytes(Vec<u8>);

impl Base64UrlBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parse from the wire form.
    pub fn from_encoded(encoded: &str) -> Result<Self> {
        decode(encoded).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The wire form.
    pub fn encoded(&self) -> String {
        encode(&self.0)
    }
}

impl From<Vec<u8>> for Base64UrlBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Base64UrlBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl AsRef<[u8]> for Base64UrlBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Base64UrlBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Base64UrlBytes({})", self.encoded())
    }
}

impl fmt::Display for Base64UrlBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded())
    }
}

impl Serialize for Base64UrlBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encoded())
    }
}

impl<'de> Deserialize<'de> for Base64UrlBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct Base64UrlVisitor;

        impl Visitor<'_> for Base64UrlVisitor {
            type Value = Base64UrlBytes;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a base64url encoded string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Self::Value, E> {
                Base64UrlBytes::from_encoded(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(Base64UrlVisitor)
    }
}
