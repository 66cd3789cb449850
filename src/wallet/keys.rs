//! Keypair generation, one per supported chain family.
//!
//! Account-model chains get a secp256k1 keypair with an EIP-55
//! checksummed address; the Ed25519 family gets base58-encoded keys in
//! the Solana address convention.

use ethers::signers::{LocalWallet, Signer};
use ethers::utils::to_checksum;
use serde::{Deserialize, Serialize};

/// A wallet's public address and private key material
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletKeyPair {
    pub public_address: String,
    pub private_key: String,
}

/// Both chain-family keypairs for one identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletKeys {
    pub eth: WalletKeyPair,
    pub solana: WalletKeyPair,
}

/// Generate a fresh secp256k1 keypair for the account-model family
pub fn generate_eth_wallet() -> Result<WalletKeyPair, String> {
    let wallet = LocalWallet::new(&mut rand::thread_rng());
    let public_address = to_checksum(&wallet.address(), None);
    let private_key = hex::encode(wallet.signer().to_bytes());
    Ok(WalletKeyPair {
        public_address,
        private_key,
    })
}

/// Generate a fresh Ed25519 keypair, base58-encoded per the Solana
/// convention (the private key carries the full 64-byte keypair).
pub fn generate_solana_wallet() -> Result<WalletKeyPair, String> {
    let signing_key = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
    let public_address = bs58::encode(signing_key.verifying_key().to_bytes()).into_string();
    let private_key = bs58::encode(signing_key.to_keypair_bytes()).into_string();
    Ok(WalletKeyPair {
        public_address,
        private_key,
    })
}

/// Generate one keypair per supported chain family
pub fn generate_both_wallets() -> Result<WalletKeys, String> {
    Ok(WalletKeys {
        eth: generate_eth_wallet()?,
        solana: generate_solana_wallet()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eth_wallet_has_checksummed_address_and_hex_key() {
        let pair = generate_eth_wallet().unwrap();
        assert!(pair.public_address.starts_with("0x"));
        assert_eq!(pair.public_address.len(), 42);
        // Round-trips back into a signer
        let wallet: LocalWallet = pair.private_key.parse().unwrap();
        assert_eq!(to_checksum(&wallet.address(), None), pair.public_address);
    }

    #[test]
    fn solana_wallet_address_decodes_to_32_bytes() {
        let pair = generate_solana_wallet().unwrap();
        let public = bs58::decode(&pair.public_address).into_vec().unwrap();
        assert_eq!(public.len(), 32);
        let private = bs58::decode(&pair.private_key).into_vec().unwrap();
        assert_eq!(private.len(), 64);
    }

    #[test]
    fn generated_wallets_are_distinct() {
        let a = generate_both_wallets().unwrap();
        let b = generate_both_wallets().unwrap();
        assert_ne!(a.eth.public_address, b.eth.public_address);
        assert_ne!(a.solana.public_address, b.solana.public_address);
    }
}
