//! Wallet lifecycle: one record per external identity, created exactly
//! once, never rotated.

use crate::wallet::keys::generate_both_wallets;
use crate::wallet::store::{WalletRecord, WalletStore};
use std::sync::Arc;

pub struct WalletService {
    store: Arc<WalletStore>,
}

impl WalletService {
    pub fn new(store: Arc<WalletStore>) -> Self {
        Self { store }
    }

    /// Return the existing record unchanged, or generate-and-persist a
    /// new one. A generated record only counts as created once the
    /// store accepted it; losing the insert race falls back to the
    /// winner's record.
    pub fn create_or_get(&self, external_id: &str) -> Result<WalletRecord, String> {
        if let Some(existing) = self.store.get(external_id)? {
            return Ok(existing);
        }

        let keys = generate_both_wallets()?;
        if self.store.try_insert(external_id, &keys)? {
            log::info!(
                "[WALLET] created wallet for {} (eth {})",
                external_id,
                keys.eth.public_address
            );
            return Ok(WalletRecord {
                external_id: external_id.to_string(),
                keys,
            });
        }

        // Lost the race between lookup and insert; the stored keys win.
        log::info!("[WALLET] concurrent create for {}, reusing stored record", external_id);
        self.store
            .get(external_id)?
            .ok_or_else(|| format!("wallet for {} missing after insert conflict", external_id))
    }

    pub fn get(&self, external_id: &str) -> Result<Option<WalletRecord>, String> {
        self.store.get(external_id)
    }
}
