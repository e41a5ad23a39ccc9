//! Purpose: Encode/decode checksummed, versioned, base32 identifier strings.
//! Exports: `encode`, `decode`, `VERSION_ACCOUNT_ID`, `VERSION_MUXED_ACCOUNT`.
//! Role: Shared text codec for plain account keys and muxed accounts.
//! Invariants: Wire form is `base32(version || payload || crc16_le)`, uppercase, unpadded.
//! Invariants: Decode verifies length, then version byte, then checksum; payload
//! length must equal exactly what the caller expects.

use crate::core::error::{Error, ErrorKind};

/// Version byte for a plain ed25519 account key. Strings start with 'G'.
pub const VERSION_ACCOUNT_ID: u8 = 6 << 3;
/// Version byte for a muxed account (key plus 64-bit sub-id). Strings start with 'M'.
pub const VERSION_MUXED_ACCOUNT: u8 = 12 << 3;

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

pub fn encode(version: u8, payload: &[u8]) -> String {
    let mut raw = Vec::with_capacity(payload.len() + 3);
    raw.push(version);
    raw.extend_from_slice(payload);
    let checksum = crc16_xmodem(&raw);
    raw.extend_from_slice(&checksum.to_le_bytes());
    base32_encode(&raw)
}

pub fn decode(input: &str, expected_version: u8, expected_len: usize) -> Result<Vec<u8>, Error> {
    let raw = base32_decode(input)?;
    // version byte + payload + 2 checksum bytes
    if raw.len() < 3 {
        return Err(Error::new(ErrorKind::Malformed)
            .with_message(format!("decoded id is {} bytes, too short", raw.len())));
    }
    // the version byte is checked before the payload length so that callers
    // probing for one form of a differently-sized sibling form get a clean
    // VersionMismatch to retry on
    let version = raw[0];
    if version != expected_version {
        return Err(Error::new(ErrorKind::VersionMismatch).with_message(format!(
            "version byte {version:#04x}, expected {expected_version:#04x}"
        )));
    }
    if raw.len() != expected_len + 3 {
        return Err(Error::new(ErrorKind::Malformed).with_message(format!(
            "decoded id is {} bytes, expected {}",
            raw.len(),
            expected_len + 3
        )));
    }
    let (body, checksum) = raw.split_at(raw.len() - 2);
    let expected = crc16_xmodem(body).to_le_bytes();
    if checksum != expected {
        return Err(Error::new(ErrorKind::ChecksumMismatch)
            .with_message("checksum does not match encoded bytes"));
    }
    Ok(body[1..].to_vec())
}

/// CRC16 with polynomial 0x1021 (XMODEM): init 0, no reflection, no final xor.
fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;
    for &byte in data {
        buffer = (buffer << 8) | byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

fn base32_decode(input: &str) -> Result<Vec<u8>, Error> {
    let mut out = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;
    for ch in input.bytes() {
        let value = decode_char(ch).ok_or_else(|| {
            Error::new(ErrorKind::Malformed)
                .with_message(format!("invalid base32 character {:?}", ch as char))
        })?;
        buffer = (buffer << 5) | value as u32;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
        }
    }
    // an unpadded encoding never leaves a full byte of residue, and the residue
    // bits of a canonical encoding are zero
    if bits >= 5 || (buffer & ((1 << bits) - 1)) != 0 {
        return Err(Error::new(ErrorKind::Malformed).with_message("non-canonical base32 length"));
    }
    Ok(out)
}

fn decode_char(ch: u8) -> Option<u8> {
    match ch {
        b'A'..=b'Z' => Some(ch - b'A'),
        b'2'..=b'7' => Some(ch - b'2' + 26),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        base32_decode, base32_encode, crc16_xmodem, decode, encode, VERSION_ACCOUNT_ID,
        VERSION_MUXED_ACCOUNT,
    };
    use crate::core::error::ErrorKind;

    #[test]
    fn crc16_known_vector() {
        // classic XMODEM check value
        assert_eq!(crc16_xmodem(b"123456789"), 0x31c3);
        assert_eq!(crc16_xmodem(b""), 0x0000);
    }

    #[test]
    fn base32_round_trip() {
        let data: Vec<u8> = (0u8..=70).collect();
        for len in 0..data.len() {
            let encoded = base32_encode(&data[..len]);
            assert_eq!(base32_decode(&encoded).expect("decode"), &data[..len]);
        }
    }

    #[test]
    fn base32_rejects_padding_and_lowercase() {
        assert_eq!(
            base32_decode("MFRA====").expect_err("padding").kind(),
            ErrorKind::Malformed
        );
        assert_eq!(
            base32_decode("mfra").expect_err("lowercase").kind(),
            ErrorKind::Malformed
        );
    }

    #[test]
    fn base32_rejects_nonzero_residue_bits() {
        // "MFRB" carries the same bytes as "MFRA" plus a nonzero trailing bit
        assert!(base32_decode("MFRA").is_ok());
        assert_eq!(
            base32_decode("MFRB").expect_err("residue").kind(),
            ErrorKind::Malformed
        );
    }

    #[test]
    fn encode_decode_round_trip() {
        let payload = [7u8; 32];
        let encoded = encode(VERSION_ACCOUNT_ID, &payload);
        assert!(encoded.starts_with('G'));
        let decoded = decode(&encoded, VERSION_ACCOUNT_ID, 32).expect("decode");
        assert_eq!(decoded, payload);
    }

    #[test]
    fn version_mismatch_is_detected_before_payload_use() {
        let payload = [9u8; 32];
        let encoded = encode(VERSION_ACCOUNT_ID, &payload);
        let err = decode(&encoded, VERSION_MUXED_ACCOUNT, 32).expect_err("wrong version");
        assert_eq!(err.kind(), ErrorKind::VersionMismatch);
    }

    #[test]
    fn wrong_payload_length_is_an_error() {
        let payload = [1u8; 40];
        let encoded = encode(VERSION_MUXED_ACCOUNT, &payload);
        let err = decode(&encoded, VERSION_MUXED_ACCOUNT, 32).expect_err("wrong length");
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn corrupted_character_fails_checksum() {
        let payload = [42u8; 32];
        let mut encoded = encode(VERSION_ACCOUNT_ID, &payload).into_bytes();
        let last = encoded.len() - 1;
        encoded[last] = if encoded[last] == b'A' { b'B' } else { b'A' };
        let corrupted = String::from_utf8(encoded).expect("ascii");
        let err = decode(&corrupted, VERSION_ACCOUNT_ID, 32).expect_err("corrupted");
        assert_eq!(err.kind(), ErrorKind::ChecksumMismatch);
    }
}
