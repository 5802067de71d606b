//! Authentication primitives
//!
//! - Base58 Solana wallet address validation
//! - Ed25519 signature verification of the challenge message
//! - Nonce generation
//! - Session token (HS256 JWT) issuance and verification

use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, VerifyingKey};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Decode a base58 wallet address into an ed25519 public key
fn parse_wallet_key(address: &str) -> Option<VerifyingKey> {
    let bytes = match bs58::decode(address).into_vec() {
        Ok(b) => b,
        Err(e) => {
            debug!("Failed to decode base58 wallet address: {}", e);
            return None;
        }
    };

    let key: [u8; 32] = match bytes.try_into() {
        Ok(k) => k,
        Err(b) => {
            debug!("Invalid public key length: {} (expected 32)", b.len());
            return None;
        }
    };

    VerifyingKey::from_bytes(&key).ok()
}

/// Check if a string is a valid base58-encoded ed25519 public key
pub fn is_valid_wallet_address(address: &str) -> bool {
    if address.len() < 32 || address.len() > 44 {
        return false;
    }
    parse_wallet_key(address).is_some()
}

/// Signatures arrive base58 encoded (Phantom) or as 0x-prefixed hex
fn decode_signature(signature: &str) -> Option<Vec<u8>> {
    if let Some(hex_sig) = signature.strip_prefix("0x") {
        return match hex::decode(hex_sig.to_lowercase()) {
            Ok(b) => Some(b),
            Err(e) => {
                debug!("Failed to decode signature hex: {}", e);
                None
            }
        };
    }

    match bs58::decode(signature).into_vec() {
        Ok(b) => Some(b),
        Err(e) => {
            debug!("Failed to decode signature base58: {}", e);
            None
        }
    }
}

/// Verify an ed25519 signature over `message` made by `wallet_address`
pub fn verify_signature(wallet_address: &str, message: &str, signature: &str) -> bool {
    let public_key = match parse_wallet_key(wallet_address) {
        Some(pk) => pk,
        None => return false,
    };

    let sig_bytes = match decode_signature(signature) {
        Some(b) => b,
        None => return false,
    };

    let sig_array: [u8; 64] = match sig_bytes.try_into() {
        Ok(a) => a,
        Err(b) => {
            debug!("Invalid signature length: {} (expected 64)", b.len());
            return false;
        }
    };

    let signature = Signature::from_bytes(&sig_array);
    public_key
        .verify_strict(message.as_bytes(), &signature)
        .is_ok()
}

/// Challenge message the wallet signs for the given nonce
pub fn create_sign_message(app_name: &str, nonce: &str) -> String {
    format!("Sign this message to authenticate with {}: {}", app_name, nonce)
}

/// Fresh single-use nonce (128 random bits, hex)
pub fn generate_nonce() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// Random secret for deployments without a configured one
pub fn generate_secret() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

// ============================================================================
// SESSION TOKENS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "walletAddress")]
    pub wallet_address: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies stateless bearer tokens with a server-held secret
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Issue a token for `wallet_address` valid from `now` for the TTL
    pub fn issue(&self, wallet_address: &str, now: DateTime<Utc>) -> anyhow::Result<String> {
        let claims = Claims {
            wallet_address: wallet_address.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Wallet address embedded in a valid token; None for malformed, expired
    /// or badly signed tokens alike
    pub fn verify(&self, token: &str) -> Option<String> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims.wallet_address),
            Err(e) => {
                debug!("Rejected session token: {}", e);
                None
            }
        }
    }
}
