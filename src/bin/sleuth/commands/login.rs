//! Login command - sign the server's challenge with a Solana keypair

use crate::client::SleuthClient;
use crate::session::{self, SavedSession};
use crate::style::*;
use anyhow::{anyhow, Context, Result};
use ed25519_dalek::{Signer, SigningKey};
use pump_sleuth::create_sign_message;
use std::path::Path;

/// Read a Solana CLI keypair file (JSON array of 64 bytes)
pub fn read_keypair(path: &Path) -> Result<SigningKey> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read keypair {}", path.display()))?;
    parse_keypair(&content)
}

fn parse_keypair(content: &str) -> Result<SigningKey> {
    let bytes: Vec<u8> =
        serde_json::from_str(content).context("Keypair must be a JSON array of bytes")?;
    let bytes: [u8; 64] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow!("Keypair must be 64 bytes, got {}", b.len()))?;
    SigningKey::from_keypair_bytes(&bytes).map_err(|_| anyhow!("Keypair public half does not match"))
}

pub async fn run(server: &str, keypair: &Path, app_name: Option<String>) -> Result<()> {
    print_header("Wallet Login");

    let key = read_keypair(keypair)?;
    let wallet_address = bs58::encode(key.verifying_key().to_bytes()).into_string();
    println!("Wallet: {}", style_cyan(&wallet_address));
    println!();

    let client = SleuthClient::new(server);
    let pb = spinner("Requesting challenge...");

    let app_name = match app_name {
        Some(name) => name,
        None => match client.health().await {
            Ok(health) => health.app_name,
            Err(e) => {
                pb.finish_and_clear();
                return Err(e);
            }
        },
    };

    let nonce = match client.request_nonce(&wallet_address).await {
        Ok(n) => n,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.set_message("Signing challenge...");
    let message = create_sign_message(&app_name, &nonce);
    let signature = bs58::encode(key.sign(message.as_bytes()).to_bytes()).into_string();

    let login = client.login(&wallet_address, &signature).await;
    pb.finish_and_clear();
    let login = login?;

    let path = session::save(&SavedSession {
        server: server.to_string(),
        wallet_address: login.wallet_address,
        token: login.token,
    })?;

    print_success("Logged in");
    println!("  {}", style_dim(&format!("Session saved to {}", path.display())));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_parse_solana_keypair() {
        let key = SigningKey::generate(&mut OsRng);
        let json = serde_json::to_string(&key.to_keypair_bytes().to_vec()).unwrap();
        let parsed = parse_keypair(&json).unwrap();
        assert_eq!(parsed.verifying_key(), key.verifying_key());
    }

    #[test]
    fn test_parse_keypair_rejects_bad_input() {
        assert!(parse_keypair("[1, 2, 3]").is_err());
        assert!(parse_keypair("not json").is_err());

        let key = SigningKey::generate(&mut OsRng);
        let mut bytes = key.to_keypair_bytes();
        bytes[40] ^= 0xff;
        let json = serde_json::to_string(&bytes.to_vec()).unwrap();
        assert!(parse_keypair(&json).is_err());
    }
}
