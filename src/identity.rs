//! Identity gateway
//!
//! Nonce issuance, wallet signature login and bearer session resolution.
//! The gateway owns all verification; everything downstream receives an
//! already-resolved [`Session`].

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::auth::{create_sign_message, generate_nonce, verify_signature, TokenIssuer};
use crate::error::{ServiceError, ServiceResult};
use crate::storage::Store;

/// Authenticated caller, resolved from a bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub wallet_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub wallet_address: String,
}

pub struct IdentityGateway {
    store: Arc<dyn Store>,
    tokens: TokenIssuer,
    app_name: String,
}

impl IdentityGateway {
    pub fn new(store: Arc<dyn Store>, tokens: TokenIssuer, app_name: impl Into<String>) -> Self {
        Self {
            store,
            tokens,
            app_name: app_name.into(),
        }
    }

    /// Name clients must embed in the message they sign
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Issue a fresh nonce, creating the identity on first contact.
    /// Any previously issued nonce for the address stops being valid.
    pub async fn request_nonce(&self, wallet_address: &str) -> ServiceResult<String> {
        let wallet_address = wallet_address.trim();
        if wallet_address.is_empty() {
            return Err(ServiceError::validation("Wallet address is required"));
        }

        let nonce = generate_nonce();
        self.store
            .rotate_nonce(wallet_address, &nonce, Utc::now())
            .await?;

        debug!("Issued nonce for {}", wallet_address);
        Ok(nonce)
    }

    /// Verify the signature over the stored nonce's challenge message and
    /// exchange it for a session token. The nonce is single use.
    pub async fn authenticate(
        &self,
        wallet_address: &str,
        signature: &str,
    ) -> ServiceResult<LoginResponse> {
        let wallet_address = wallet_address.trim();
        let signature = signature.trim();
        if wallet_address.is_empty() || signature.is_empty() {
            return Err(ServiceError::validation(
                "Wallet address and signature are required",
            ));
        }

        let wallet = self
            .store
            .get_wallet(wallet_address)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found. Request a nonce first"))?;

        let message = create_sign_message(&self.app_name, &wallet.nonce);
        if !verify_signature(wallet_address, &message, signature) {
            debug!("Signature rejected for {}", wallet_address);
            return Err(ServiceError::InvalidSignature);
        }

        // Only the request that still sees the signed nonce may log in
        let now = Utc::now();
        let consumed = self
            .store
            .consume_nonce(wallet_address, &wallet.nonce, &generate_nonce(), now)
            .await?;
        if !consumed {
            debug!("Nonce for {} already consumed", wallet_address);
            return Err(ServiceError::InvalidSignature);
        }

        let token = self.tokens.issue(wallet_address, now)?;
        info!("Wallet {} logged in", wallet_address);

        Ok(LoginResponse {
            token,
            wallet_address: wallet_address.to_string(),
        })
    }

    /// Resolve a bearer token into a session
    pub fn verify_token(&self, token: &str) -> ServiceResult<Session> {
        self.tokens
            .verify(token)
            .map(|wallet_address| Session { wallet_address })
            .ok_or_else(|| ServiceError::unauthorized("Invalid or expired token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use chrono::Duration;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    fn gateway() -> (IdentityGateway, Arc<dyn Store>) {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let tokens = TokenIssuer::new("test-secret", Duration::days(7));
        (IdentityGateway::new(store.clone(), tokens, "TrapCard"), store)
    }

    fn keypair() -> (SigningKey, String) {
        let key = SigningKey::generate(&mut OsRng);
        let address = bs58::encode(key.verifying_key().to_bytes()).into_string();
        (key, address)
    }

    fn sign(key: &SigningKey, nonce: &str) -> String {
        let message = create_sign_message("TrapCard", nonce);
        bs58::encode(key.sign(message.as_bytes()).to_bytes()).into_string()
    }

    #[tokio::test]
    async fn test_login_flow() {
        let (gateway, _) = gateway();
        let (key, address) = keypair();

        let nonce = gateway.request_nonce(&address).await.unwrap();
        let login = gateway
            .authenticate(&address, &sign(&key, &nonce))
            .await
            .unwrap();

        assert_eq!(login.wallet_address, address);
        let session = gateway.verify_token(&login.token).unwrap();
        assert_eq!(session.wallet_address, address);
    }

    #[tokio::test]
    async fn test_new_nonce_invalidates_previous() {
        let (gateway, _) = gateway();
        let (key, address) = keypair();

        let n1 = gateway.request_nonce(&address).await.unwrap();
        let n2 = gateway.request_nonce(&address).await.unwrap();
        assert_ne!(n1, n2);

        let err = gateway
            .authenticate(&address, &sign(&key, &n1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidSignature));
        assert!(gateway.authenticate(&address, &sign(&key, &n2)).await.is_ok());
    }

    #[tokio::test]
    async fn test_signature_is_single_use() {
        let (gateway, _) = gateway();
        let (key, address) = keypair();

        let nonce = gateway.request_nonce(&address).await.unwrap();
        let signature = sign(&key, &nonce);
        gateway.authenticate(&address, &signature).await.unwrap();

        let replay = gateway.authenticate(&address, &signature).await.unwrap_err();
        assert!(matches!(replay, ServiceError::InvalidSignature));
    }

    #[tokio::test]
    async fn test_forged_signature_keeps_nonce() {
        let (gateway, store) = gateway();
        let (_, address) = keypair();
        let (intruder, _) = keypair();

        let nonce = gateway.request_nonce(&address).await.unwrap();
        let err = gateway
            .authenticate(&address, &sign(&intruder, &nonce))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidSignature));

        let wallet = store.get_wallet(&address).await.unwrap().unwrap();
        assert_eq!(wallet.nonce, nonce);
    }

    #[tokio::test]
    async fn test_malformed_inputs() {
        let (gateway, _) = gateway();
        let (_, address) = keypair();

        assert!(matches!(
            gateway.request_nonce("   ").await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            gateway.authenticate(&address, "").await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            gateway.authenticate(&address, "sig").await,
            Err(ServiceError::NotFound(_))
        ));

        gateway.request_nonce("not-a-wallet").await.unwrap();
        assert!(matches!(
            gateway.authenticate("not-a-wallet", "0OIl").await,
            Err(ServiceError::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn test_bad_token_unauthorized() {
        let (gateway, _) = gateway();
        assert!(matches!(
            gateway.verify_token("not.a.token"),
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
