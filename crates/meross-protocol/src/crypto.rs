//! Request signing, device-key derivation, and AES-256-CBC payload crypto (C1).
//!
//! Mirrors the signing scheme every Meross firmware and app build shares:
//! MD5-based HMAC-less signatures and a zero-IV, zero-padded AES-CBC cipher
//! for devices that advertise `Appliance.Encrypt.ECDHE`.

use aes::Aes256;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::NoPadding};
use rand::Rng;

use crate::error::{ErrorKind, MerossError, MerossResult};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const AES_BLOCK_SIZE: usize = 16;
const ZERO_IV: [u8; 16] = [0u8; 16];

/// Compute the request envelope signature: `MD5(secret || timestamp || nonce || params_b64)`.
///
/// `timestamp` and `params_b64` are included as their literal string forms,
/// matching the vendor's signing scheme (scenario §8.5).
pub fn sign_request(secret: &str, timestamp_ms: i64, nonce: &str, params_b64: &str) -> String {
    let mut input = String::with_capacity(
        secret.len() + 20 + nonce.len() + params_b64.len(),
    );
    input.push_str(secret);
    input.push_str(&timestamp_ms.to_string());
    input.push_str(nonce);
    input.push_str(params_b64);
    hex::encode(md5::compute(input.as_bytes()).0)
}

/// Compute a device message signature: `MD5(messageId || deviceKey || timestampSecs)`.
pub fn sign_device_message(message_id: &str, device_key: &str, timestamp_secs: i64) -> String {
    let input = format!("{message_id}{device_key}{timestamp_secs}");
    hex::encode(md5::compute(input.as_bytes()).0)
}

/// Derive the per-device AES-256 key used when a device advertises
/// `Appliance.Encrypt.ECDHE`.
///
/// `key = MD5_hex(uuid[3:22] || account_key[1:9] || mac || account_key[10:28])`,
/// then the 32 hex characters are used as raw UTF-8 key bytes (32 bytes for
/// AES-256).
pub fn derive_device_key(uuid: &str, account_key: &str, mac: &str) -> MerossResult<[u8; 32]> {
    let uuid_slice = byte_slice(uuid, 3, 22).ok_or_else(|| {
        MerossError::new(ErrorKind::CryptoError, "uuid too short for key derivation")
    })?;
    let key_slice_a = byte_slice(account_key, 1, 9).ok_or_else(|| {
        MerossError::new(ErrorKind::CryptoError, "account key too short for key derivation")
    })?;
    let key_slice_b = byte_slice(account_key, 10, 28).ok_or_else(|| {
        MerossError::new(ErrorKind::CryptoError, "account key too short for key derivation")
    })?;

    let mut input = String::with_capacity(uuid_slice.len() + key_slice_a.len() + mac.len() + key_slice_b.len());
    input.push_str(uuid_slice);
    input.push_str(key_slice_a);
    input.push_str(mac);
    input.push_str(key_slice_b);

    let hex_digest = hex::encode(md5::compute(input.as_bytes()).0);
    let mut key = [0u8; 32];
    key.copy_from_slice(hex_digest.as_bytes());
    Ok(key)
}

/// Slice `s[start..end]` on byte boundaries, returning `None` if out of range
/// (mirrors JS substring semantics for the ASCII-only Meross identifiers this
/// is applied to).
fn byte_slice(s: &str, start: usize, end: usize) -> Option<&str> {
    s.get(start..end.min(s.len()))
}

/// Encrypt `plaintext` with AES-256-CBC, zero IV, zero padding to a 16-byte
/// boundary (no PKCS7). Returns base64-encoded ciphertext.
pub fn encrypt(plaintext: &[u8], key: &[u8; 32]) -> String {
    let padded_len = plaintext.len().div_ceil(AES_BLOCK_SIZE) * AES_BLOCK_SIZE;
    let padded_len = padded_len.max(AES_BLOCK_SIZE);
    let mut buf = vec![0u8; padded_len];
    buf[..plaintext.len()].copy_from_slice(plaintext);

    let cipher = Aes256CbcEnc::new(key.into(), &ZERO_IV.into());
    let ct = cipher
        .encrypt_padded_mut::<NoPadding>(&mut buf, padded_len)
        .expect("buffer sized to block boundary");
    BASE64.encode(ct)
}

/// Decrypt base64 or raw AES-256-CBC ciphertext, trimming trailing zero
/// padding bytes.
pub fn decrypt(ciphertext: &[u8], key: &[u8; 32]) -> MerossResult<Vec<u8>> {
    let raw = match BASE64.decode(ciphertext) {
        Ok(bytes) => bytes,
        Err(_) => ciphertext.to_vec(),
    };
    if raw.is_empty() || raw.len() % AES_BLOCK_SIZE != 0 {
        return Err(MerossError::new(
            ErrorKind::CryptoError,
            "ciphertext is not a multiple of the AES block size",
        ));
    }

    let mut buf = raw;
    let cipher = Aes256CbcDec::new(key.into(), &ZERO_IV.into());
    let pt = cipher
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|e| MerossError::new(ErrorKind::CryptoError, format!("AES decrypt failed: {e}")))?;

    let trimmed_len = pt.iter().rposition(|&b| b != 0).map(|i| i + 1).unwrap_or(0);
    Ok(pt[..trimmed_len].to_vec())
}

/// Base64-decode an SSID; returns the original string unchanged on empty
/// result or decode failure.
pub fn decode_ssid(s: &str) -> String {
    match BASE64.decode(s) {
        Ok(bytes) if !bytes.is_empty() => match String::from_utf8(bytes) {
            Ok(decoded) if !decoded.is_empty() => decoded,
            _ => s.to_string(),
        },
        _ => s.to_string(),
    }
}

/// Generate a random alphanumeric nonce of the given length.
pub fn random_nonce(len: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Generate a 32-hex-character random message ID.
pub fn random_message_id() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.r#gen();
    hex::encode(bytes)
}
