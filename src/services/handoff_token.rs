//! Signed handoff tokens for stateless upload sessions.
//!
//! The server hands the client an opaque credential binding it to one
//! storage-side multipart upload, so every later round trip can be
//! re-validated without a session lookup.
//!
//! Wire format: `base64(AES-256-CBC(SHA-256(payload))) || hex(iv)`. The IV
//! is always exactly 32 hex characters, which makes the split on decode
//! unambiguous. The cipher input is the payload digest, already two AES
//! blocks, so no padding is involved on either side.

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const IV_LEN: usize = 16;
const IV_HEX_LEN: usize = 2 * IV_LEN;
const DIGEST_LEN: usize = 32;

/// Signs and verifies upload handoff tokens with a key derived from the
/// server secret.
#[derive(Clone)]
pub struct TokenSigner {
    key: [u8; 32],
}

impl TokenSigner {
    /// Derive the symmetric key: SHA-256 over the UTF-8 secret.
    pub fn new(secret: &str) -> Self {
        let key = Sha256::digest(secret.as_bytes()).into();
        Self { key }
    }

    /// Produce a token over `payload` with a fresh random IV.
    pub fn sign(&self, payload: &str) -> String {
        let digest: [u8; DIGEST_LEN] = Sha256::digest(payload.as_bytes()).into();
        let iv: [u8; IV_LEN] = rand::random();

        let mut block = digest;
        let ciphertext = Aes256CbcEnc::new_from_slices(&self.key, &iv)
            .expect("key and IV lengths are fixed")
            .encrypt_padded_mut::<NoPadding>(&mut block, DIGEST_LEN)
            .expect("digest is block-aligned");

        format!("{}{}", STANDARD.encode(ciphertext), hex::encode(iv))
    }

    /// Check that `token` was signed over exactly `payload`.
    ///
    /// Returns `false` on any parse or decryption failure; callers treat
    /// that the same as "not authorized" and must not learn why.
    pub fn verify(&self, payload: &str, token: &str) -> bool {
        if !token.is_ascii() || token.len() <= IV_HEX_LEN {
            return false;
        }
        let (cipher_b64, iv_hex) = token.split_at(token.len() - IV_HEX_LEN);

        let Ok(iv) = hex::decode(iv_hex) else {
            return false;
        };
        let Ok(mut ciphertext) = STANDARD.decode(cipher_b64) else {
            return false;
        };
        if ciphertext.len() != DIGEST_LEN {
            return false;
        }

        let Ok(decryptor) = Aes256CbcDec::new_from_slices(&self.key, &iv) else {
            return false;
        };
        let Ok(plaintext) = decryptor.decrypt_padded_mut::<NoPadding>(&mut ciphertext) else {
            return false;
        };

        let expected = Sha256::digest(payload.as_bytes());
        plaintext.ct_eq(expected.as_slice()).into()
    }
}

/// Payload convention binding a token to its multipart session. The token
/// is scoped to the (upload id, storage key) pair, not to a part number,
/// so one token authorizes every part URL request and the completion call.
pub fn session_payload(upload_id: &str, storage_key: &str) -> String {
    format!("{}&{}", upload_id, storage_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-upload-secret")
    }

    #[test]
    fn test_roundtrip() {
        let signer = signer();
        for payload in ["abc&k-42", "", "only-one-side&", "unicode-负载&key"] {
            let token = signer.sign(payload);
            assert!(signer.verify(payload, &token), "payload: {payload:?}");
        }
    }

    #[test]
    fn test_token_layout() {
        let token = signer().sign("abc&def");
        // 32 bytes of ciphertext in base64, then exactly 32 hex chars of IV
        assert_eq!(token.len(), 44 + 32);
        let iv_hex = &token[token.len() - 32..];
        assert!(iv_hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(hex::decode(iv_hex).is_ok());
    }

    #[test]
    fn test_scope_binding() {
        let signer = signer();
        let token = signer.sign("upload-1&key-1");
        assert!(!signer.verify("upload-2&key-1", &token));
        assert!(!signer.verify("upload-1&key-2", &token));
        assert!(!signer.verify("upload-1&key-1&extra", &token));
    }

    #[test]
    fn test_single_character_mutations_rejected() {
        let signer = signer();
        let payload = "upload-abc&3f8a2c1d";
        let token = signer.sign(payload);

        for i in 0..token.len() {
            let mut mutated: Vec<char> = token.chars().collect();
            // Hex decoding is case-insensitive, so the IV suffix must be
            // mutated within the lowercase hex alphabet to actually change
            // the decoded bytes.
            mutated[i] = if i >= token.len() - IV_HEX_LEN {
                if mutated[i] == '0' {
                    '1'
                } else {
                    '0'
                }
            } else if mutated[i] == 'A' {
                'B'
            } else {
                'A'
            };
            let mutated: String = mutated.into_iter().collect();
            assert_ne!(mutated, token);
            assert!(
                !signer.verify(payload, &mutated),
                "mutation at index {i} verified"
            );
        }
    }

    #[test]
    fn test_garbage_tokens_rejected() {
        let signer = signer();
        assert!(!signer.verify("p", ""));
        assert!(!signer.verify("p", "short"));
        assert!(!signer.verify("p", &"zz".repeat(40)));
        assert!(!signer.verify("p", &format!("!!!not-base64!!!{}", "00".repeat(16))));
        // Valid shape, random content
        assert!(!signer.verify(
            "p",
            &format!("{}{}", STANDARD.encode([7u8; 32]), "ab".repeat(16))
        ));
        // Non-ASCII must not panic
        assert!(!signer.verify("p", &"é".repeat(40)));
    }

    #[test]
    fn test_different_secrets_do_not_cross_verify() {
        let a = TokenSigner::new("secret-a");
        let b = TokenSigner::new("secret-b");
        let token = a.sign("payload");
        assert!(!b.verify("payload", &token));
    }

    #[test]
    fn test_fresh_iv_per_token() {
        let signer = signer();
        let t1 = signer.sign("payload");
        let t2 = signer.sign("payload");
        assert_ne!(t1, t2);
        assert!(signer.verify("payload", &t1));
        assert!(signer.verify("payload", &t2));
    }

    #[test]
    fn test_session_payload_convention() {
        assert_eq!(session_payload("abc", "k-42"), "abc&k-42");
    }
}
