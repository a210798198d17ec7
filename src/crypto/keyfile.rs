// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

//! Parser for the git-crypt key-escrow blob carried in `GIT_CRYPT_KEY`.
//!
//! Layout: a 12-byte preamble (`\0GITCRYPTKEY`), a 4-byte format version,
//! a TLV header section, then one or more TLV key entries. Each field is a
//! big-endian u32 id followed (except for the terminator) by a big-endian u32
//! length and that many bytes. The first complete entry supplies the AES and
//! HMAC key halves.

use super::cipher::{CryptoError, KeyMaterial, AES_KEY_LEN, HMAC_KEY_LEN};

const PREAMBLE: &[u8; 12] = b"\x00GITCRYPTKEY";
const FORMAT_VERSION: u32 = 2;

const HEADER_FIELD_END: u32 = 0;
const HEADER_FIELD_KEY_NAME: u32 = 1;

const KEY_FIELD_END: u32 = 0;
const KEY_FIELD_VERSION: u32 = 1;
const KEY_FIELD_AES_KEY: u32 = 3;
const KEY_FIELD_HMAC_KEY: u32 = 5;

const KEY_NAME_MAX_LEN: u32 = 128;
const MAX_FIELD_LEN: u32 = 1 << 20;

/// Parse a decoded key-escrow blob into usable key material.
pub fn parse_key_blob(blob: &[u8]) -> Result<KeyMaterial, CryptoError> {
    let mut cursor = Cursor::new(blob);

    let preamble = cursor.read_bytes(PREAMBLE.len())?;
    if preamble != PREAMBLE {
        return Err(CryptoError::InvalidKey("invalid preamble".to_string()));
    }
    let version = cursor.read_u32()?;
    if version != FORMAT_VERSION {
        return Err(CryptoError::InvalidKey(format!(
            "unsupported format version {version}"
        )));
    }

    skip_header(&mut cursor)?;

    // Only the first entry is used; later entries belong to rotated keys the
    // deployment no longer reads.
    read_entry(&mut cursor)
}

fn skip_header(cursor: &mut Cursor<'_>) -> Result<(), CryptoError> {
    loop {
        let field_id = cursor.read_u32()?;
        if field_id == HEADER_FIELD_END {
            return Ok(());
        }
        let field_len = cursor.read_u32()?;
        match field_id {
            HEADER_FIELD_KEY_NAME => {
                if field_len > KEY_NAME_MAX_LEN {
                    return Err(CryptoError::InvalidKey(format!(
                        "key name too long ({field_len} bytes)"
                    )));
                }
                cursor.read_bytes(field_len as usize)?;
            }
            id if id % 2 == 1 => {
                return Err(CryptoError::InvalidKey(format!(
                    "unknown critical header field {id}"
                )));
            }
            _ => {
                cursor.read_bytes(field_len as usize)?;
            }
        }
    }
}

fn read_entry(cursor: &mut Cursor<'_>) -> Result<KeyMaterial, CryptoError> {
    let mut aes: Option<[u8; AES_KEY_LEN]> = None;
    let mut hmac: Option<[u8; HMAC_KEY_LEN]> = None;

    loop {
        let field_id = cursor.read_u32()?;
        if field_id == KEY_FIELD_END {
            break;
        }
        let field_len = cursor.read_u32()?;
        match field_id {
            KEY_FIELD_VERSION => {
                if field_len != 4 {
                    return Err(CryptoError::InvalidKey(format!(
                        "invalid version field length {field_len}"
                    )));
                }
                cursor.read_u32()?;
            }
            KEY_FIELD_AES_KEY => {
                if field_len as usize != AES_KEY_LEN {
                    return Err(CryptoError::InvalidKey(format!(
                        "invalid AES key length {field_len}"
                    )));
                }
                let bytes = cursor.read_bytes(AES_KEY_LEN)?;
                let mut key = [0u8; AES_KEY_LEN];
                key.copy_from_slice(bytes);
                aes = Some(key);
            }
            KEY_FIELD_HMAC_KEY => {
                if field_len as usize != HMAC_KEY_LEN {
                    return Err(CryptoError::InvalidKey(format!(
                        "invalid HMAC key length {field_len}"
                    )));
                }
                let bytes = cursor.read_bytes(HMAC_KEY_LEN)?;
                let mut key = [0u8; HMAC_KEY_LEN];
                key.copy_from_slice(bytes);
                hmac = Some(key);
            }
            id if id % 2 == 1 => {
                return Err(CryptoError::InvalidKey(format!(
                    "unknown critical key field {id}"
                )));
            }
            _ => {
                if field_len > MAX_FIELD_LEN {
                    return Err(CryptoError::InvalidKey(format!(
                        "key field too long ({field_len} bytes)"
                    )));
                }
                cursor.read_bytes(field_len as usize)?;
            }
        }
    }

    match (aes, hmac) {
        (Some(aes), Some(hmac)) => Ok(KeyMaterial { aes, hmac }),
        _ => Err(CryptoError::InvalidKey(
            "key entry is missing the AES or HMAC half".to_string(),
        )),
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn read_u32(&mut self) -> Result<u32, CryptoError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CryptoError> {
        let end = self.pos.checked_add(len).ok_or_else(|| {
            CryptoError::InvalidKey("field length overflows the blob".to_string())
        })?;
        if end > self.buf.len() {
            return Err(CryptoError::InvalidKey(format!(
                "truncated blob: wanted {len} bytes at offset {}",
                self.pos
            )));
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_u32(out: &mut Vec<u8>, value: u32) {
        out.extend_from_slice(&value.to_be_bytes());
    }

    /// Assemble a well-formed escrow blob around the given key halves.
    fn build_blob(aes: &[u8], hmac: &[u8], key_name: Option<&[u8]>) -> Vec<u8> {
        let mut blob = Vec::new();
        blob.extend_from_slice(PREAMBLE);
        put_u32(&mut blob, FORMAT_VERSION);

        if let Some(name) = key_name {
            put_u32(&mut blob, HEADER_FIELD_KEY_NAME);
            put_u32(&mut blob, name.len() as u32);
            blob.extend_from_slice(name);
        }
        put_u32(&mut blob, HEADER_FIELD_END);

        put_u32(&mut blob, KEY_FIELD_VERSION);
        put_u32(&mut blob, 4);
        put_u32(&mut blob, 0);
        put_u32(&mut blob, KEY_FIELD_AES_KEY);
        put_u32(&mut blob, aes.len() as u32);
        blob.extend_from_slice(aes);
        put_u32(&mut blob, KEY_FIELD_HMAC_KEY);
        put_u32(&mut blob, hmac.len() as u32);
        blob.extend_from_slice(hmac);
        put_u32(&mut blob, KEY_FIELD_END);

        blob
    }

    #[test]
    fn parses_a_complete_key_blob() {
        let aes = [1u8; AES_KEY_LEN];
        let hmac = [2u8; HMAC_KEY_LEN];
        let blob = build_blob(&aes, &hmac, None);

        let key = parse_key_blob(&blob).unwrap();
        assert_eq!(key.aes, aes);
        assert_eq!(key.hmac, hmac);
    }

    #[test]
    fn parses_a_blob_with_a_key_name_header() {
        let blob = build_blob(&[3u8; AES_KEY_LEN], &[4u8; HMAC_KEY_LEN], Some(b"deploy"));
        assert!(parse_key_blob(&blob).is_ok());
    }

    #[test]
    fn rejects_wrong_preamble() {
        let mut blob = build_blob(&[0u8; AES_KEY_LEN], &[0u8; HMAC_KEY_LEN], None);
        blob[1] = b'X';
        assert!(matches!(
            parse_key_blob(&blob),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut blob = build_blob(&[0u8; AES_KEY_LEN], &[0u8; HMAC_KEY_LEN], None);
        blob[15] = 9;
        assert!(matches!(
            parse_key_blob(&blob),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn rejects_wrong_aes_key_length() {
        let blob = build_blob(&[0u8; 16], &[0u8; HMAC_KEY_LEN], None);
        assert!(matches!(
            parse_key_blob(&blob),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn rejects_truncated_blob() {
        let blob = build_blob(&[0u8; AES_KEY_LEN], &[0u8; HMAC_KEY_LEN], None);
        assert!(matches!(
            parse_key_blob(&blob[..blob.len() - 10]),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn rejects_entry_missing_hmac_half() {
        let mut blob = Vec::new();
        blob.extend_from_slice(PREAMBLE);
        put_u32(&mut blob, FORMAT_VERSION);
        put_u32(&mut blob, HEADER_FIELD_END);
        put_u32(&mut blob, KEY_FIELD_AES_KEY);
        put_u32(&mut blob, AES_KEY_LEN as u32);
        blob.extend_from_slice(&[0u8; AES_KEY_LEN]);
        put_u32(&mut blob, KEY_FIELD_END);

        assert!(matches!(
            parse_key_blob(&blob),
            Err(CryptoError::InvalidKey(_))
        ));
    }
}
