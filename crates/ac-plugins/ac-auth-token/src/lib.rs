//! # ac-auth-token
//!
//! HMAC-signed form tokens implementing the `TokenVerifier` port. Tokens
//! are stateless: a random nonce plus an HMAC-SHA256 tag over it, so
//! verification needs no session storage. Tokens outlive a restart only if
//! the secret is stable across boots.

use ac_core::traits::TokenVerifier;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 16;
const TAG_LEN: usize = 32;

pub struct HmacTokenProvider {
    secret: Vec<u8>,
}

impl HmacTokenProvider {
    pub fn new(secret: &[u8]) -> Self {
        Self { secret: secret.to_vec() }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length")
    }
}

impl TokenVerifier for HmacTokenProvider {
    fn issue(&self) -> String {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let mut mac = self.mac();
        mac.update(&nonce);
        let tag = mac.finalize().into_bytes();

        let mut raw = Vec::with_capacity(NONCE_LEN + TAG_LEN);
        raw.extend_from_slice(&nonce);
        raw.extend_from_slice(&tag);
        URL_SAFE_NO_PAD.encode(raw)
    }

    fn verify(&self, token: &str) -> bool {
        let raw = match URL_SAFE_NO_PAD.decode(token) {
            Ok(raw) => raw,
            Err(_) => return false,
        };
        if raw.len() != NONCE_LEN + TAG_LEN {
            return false;
        }
        let (nonce, tag) = raw.split_at(NONCE_LEN);
        let mut mac = self.mac();
        mac.update(nonce);
        mac.verify_slice(tag).is_ok()
    }
}
