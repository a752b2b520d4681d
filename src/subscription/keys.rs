use base64::{URL_SAFE_NO_PAD, decode_config, encode_config};
use jwt_simple::prelude::ES256KeyPair;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use thiserror::Error;

/// Length of an uncompressed P-256 point (`0x04 || X || Y`).
const UNCOMPRESSED_POINT_LEN: usize = 65;
const AUTH_SECRET_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("no server public key configured")]
    Missing,
    #[error("key is not valid base64: {0}")]
    Malformed(String),
    #[error("expected a {UNCOMPRESSED_POINT_LEN}-byte uncompressed P-256 point, got {len} bytes")]
    WrongShape { len: usize },
}

/// Application server key in both forms the subscribe strategies need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    pub raw: Vec<u8>,
    pub encoded: String,
}

/// Decodes a server public key given in URL-safe base64, tolerating padding
/// and the standard alphabet.
pub fn decode_server_key(encoded: Option<&str>) -> Result<KeyMaterial, KeyError> {
    let trimmed = encoded
        .map(|key| key.trim().trim_end_matches('='))
        .filter(|key| !key.is_empty())
        .ok_or(KeyError::Missing)?;
    let normalized = trimmed.replace('+', "-").replace('/', "_");
    let raw = decode_config(&normalized, URL_SAFE_NO_PAD)
        .map_err(|err| KeyError::Malformed(err.to_string()))?;
    if raw.len() != UNCOMPRESSED_POINT_LEN || raw[0] != 0x04 {
        return Err(KeyError::WrongShape { len: raw.len() });
    }

    Ok(KeyMaterial {
        encoded: encode_config(&raw, URL_SAFE_NO_PAD),
        raw,
    })
}

/// Receiver-side key material of a push subscription.
#[derive(Debug, Clone)]
pub struct ClientKeys {
    pub private_key: String,
    pub p256dh: String,
    pub auth: String,
}

pub fn generate_client_keys() -> Result<ClientKeys, web_push::WebPushError> {
    let mut rng = OsRng;
    generate_client_keys_with_rng(&mut rng)
}

pub fn generate_client_keys_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<ClientKeys, web_push::WebPushError> {
    let key_pair = generate_es256_keypair_with_rng(rng);
    let private_key = encode_config(key_pair.to_bytes(), URL_SAFE_NO_PAD);
    let public_key =
        web_push::VapidSignatureBuilder::from_base64_no_sub(&private_key, URL_SAFE_NO_PAD)?
            .get_public_key();

    let mut auth = [0u8; AUTH_SECRET_LEN];
    rng.fill_bytes(&mut auth);

    Ok(ClientKeys {
        private_key,
        p256dh: encode_config(public_key, URL_SAFE_NO_PAD),
        auth: encode_config(auth, URL_SAFE_NO_PAD),
    })
}

fn generate_es256_keypair_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> ES256KeyPair {
    let mut key_bytes = [0u8; 32];
    loop {
        rng.fill_bytes(&mut key_bytes);
        if let Ok(key_pair) = ES256KeyPair::from_bytes(&key_bytes) {
            return key_pair;
        }
    }
}
