//! Content descriptors and their shareable Base62 ids.
//!
//! An id is a one-character type prefix (`0` text, `1` image) followed by the
//! content's UTF-8 bytes, read as a big-endian integer and written in Base62.

use crate::FieldError;

pub const MAX_TEXT_LEN: usize = 200;
pub const MAX_IMAGE_REF_LEN: usize = 2000;

const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const TEXT_PREFIX: char = '0';
const IMAGE_PREFIX: char = '1';

/// What a field is built from: a short message or an image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentDescriptor {
    Text(String),
    /// File path, `file://` path, `data:` URL or remote URL.
    Image(String),
}

impl ContentDescriptor {
    pub fn text(text: impl Into<String>) -> Result<Self, FieldError> {
        let descriptor = ContentDescriptor::Text(text.into());
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn image(reference: impl Into<String>) -> Result<Self, FieldError> {
        let descriptor = ContentDescriptor::Image(reference.into());
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Rejects oversized content before anything is built.
    pub fn validate(&self) -> Result<(), FieldError> {
        match self {
            ContentDescriptor::Text(text) => {
                let len = text.chars().count();
                if len > MAX_TEXT_LEN {
                    return Err(FieldError::TextTooLong { len, max: MAX_TEXT_LEN });
                }
            }
            ContentDescriptor::Image(reference) => {
                let len = reference.chars().count();
                if len > MAX_IMAGE_REF_LEN {
                    return Err(FieldError::ImageRefTooLong { len, max: MAX_IMAGE_REF_LEN });
                }
            }
        }
        Ok(())
    }

    pub fn content(&self) -> &str {
        match self {
            ContentDescriptor::Text(text) => text,
            ContentDescriptor::Image(reference) => reference,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ContentDescriptor::Text(_) => "text",
            ContentDescriptor::Image(_) => "image",
        }
    }

    /// Shareable id for this descriptor.
    pub fn encode_id(&self) -> String {
        let prefix = match self {
            ContentDescriptor::Text(_) => TEXT_PREFIX,
            ContentDescriptor::Image(_) => IMAGE_PREFIX,
        };
        let mut id = String::with_capacity(self.content().len() * 4 / 3 + 2);
        id.push(prefix);
        id.push_str(&bytes_to_base62(self.content().as_bytes()));
        id
    }

    /// Parses an id produced by [`ContentDescriptor::encode_id`].
    pub fn decode_id(id: &str) -> Result<Self, FieldError> {
        let mut chars = id.chars();
        let prefix = chars
            .next()
            .ok_or_else(|| FieldError::InvalidId("empty id".to_string()))?;
        let bytes = base62_to_bytes(chars.as_str())?;
        let content = String::from_utf8(bytes)
            .map_err(|e| FieldError::InvalidId(format!("content is not UTF-8: {}", e)))?;

        let descriptor = match prefix {
            TEXT_PREFIX => ContentDescriptor::Text(content),
            IMAGE_PREFIX => ContentDescriptor::Image(content),
            other => {
                return Err(FieldError::InvalidId(format!("unknown type prefix '{}'", other)))
            }
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}

/// Base62 digits of `bytes` taken as a big-endian unsigned integer.
fn bytes_to_base62(bytes: &[u8]) -> String {
    let mut number: Vec<u8> = bytes.iter().copied().skip_while(|&b| b == 0).collect();
    let mut digits = Vec::new(); // least significant first

    while !number.is_empty() {
        let mut remainder = 0u32;
        let mut quotient = Vec::with_capacity(number.len());
        for &byte in &number {
            let acc = (remainder << 8) | byte as u32;
            let q = acc / 62;
            remainder = acc % 62;
            if !quotient.is_empty() || q != 0 {
                quotient.push(q as u8);
            }
        }
        digits.push(BASE62_ALPHABET[remainder as usize]);
        number = quotient;
    }

    if digits.is_empty() {
        return "0".to_string();
    }
    digits.iter().rev().map(|&d| d as char).collect()
}

fn base62_to_bytes(encoded: &str) -> Result<Vec<u8>, FieldError> {
    let mut bytes: Vec<u8> = Vec::new(); // big-endian

    for ch in encoded.chars() {
        let digit = BASE62_ALPHABET
            .iter()
            .position(|&c| c as char == ch)
            .ok_or_else(|| FieldError::InvalidId(format!("invalid Base62 digit '{}'", ch)))?;

        let mut carry = digit as u32;
        for byte in bytes.iter_mut().rev() {
            let acc = *byte as u32 * 62 + carry;
            *byte = (acc & 0xff) as u8;
            carry = acc >> 8;
        }
        while carry > 0 {
            bytes.insert(0, (carry & 0xff) as u8);
            carry >>= 8;
        }
    }
    Ok(bytes)
}
