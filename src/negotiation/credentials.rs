use rand::{Rng, RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
// ICE requires ufrag >= 4 chars and pwd >= 22 chars.
const UFRAG_LEN: usize = 8;
const PWD_LEN: usize = 24;
const CERT_SEED_LEN: usize = 64;

/// Local ICE username fragment and password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceCredentials {
    ufrag: String,
    pwd: String,
}

impl IceCredentials {
    #[must_use]
    pub fn generate() -> Self {
        Self {
            ufrag: gen_token(UFRAG_LEN),
            pwd: gen_token(PWD_LEN),
        }
    }

    pub fn ufrag(&self) -> &str {
        &self.ufrag
    }

    pub fn pwd(&self) -> &str {
        &self.pwd
    }
}

fn gen_token(len: usize) -> String {
    (0..len)
        .map(|_| char::from(TOKEN_ALPHABET[OsRng.gen_range(0..TOKEN_ALPHABET.len())]))
        .collect()
}

/// Produces a `sha-256` fingerprint value (`AB:CD:...`) identifying this
/// endpoint for the lifetime of a connection.
///
/// No certificate exists here, so the digest is taken over random seed bytes.
#[must_use]
pub fn generate_fingerprint() -> String {
    let mut seed = [0u8; CERT_SEED_LEN];
    OsRng.fill_bytes(&mut seed);
    let digest = Sha256::digest(seed);
    digest
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}
