//! Transaction construction, signing and submission.
//!
//! A transaction is either fully built, signed and submitted, or not
//! submitted at all; every step failure aborts the operation. Signing
//! for one sending address is serialized in-process so two concurrent
//! sends cannot race at the nonce layer.

use crate::wallet::service::WalletService;
use dashmap::DashMap;
use ethers::prelude::*;
use ethers::types::transaction::eip1559::Eip1559TransactionRequest;
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub struct TxSigner {
    wallets: Arc<WalletService>,
    address_locks: DashMap<Address, Arc<tokio::sync::Mutex<()>>>,
}

impl TxSigner {
    pub fn new(wallets: Arc<WalletService>) -> Self {
        Self {
            wallets,
            address_locks: DashMap::new(),
        }
    }

    /// Build, fee-estimate, sign and broadcast one transaction for the
    /// identity's account-model wallet. Returns the transaction hash.
    pub async fn sign_and_submit(
        &self,
        chain_id: &str,
        external_id: &str,
        to: &str,
        data: Vec<u8>,
        value: U256,
    ) -> Result<String, String> {
        let record = self
            .wallets
            .get(external_id)?
            .ok_or_else(|| format!("no wallet for identity {}", external_id))?;

        let chain_id_num: u64 = chain_id
            .parse()
            .map_err(|_| format!("invalid chain id: {}", chain_id))?;

        let wallet: LocalWallet = record
            .keys
            .eth
            .private_key
            .parse::<LocalWallet>()
            .map_err(|e| format!("invalid private key: {}", e))?
            .with_chain_id(chain_id_num);
        let from = wallet.address();

        let to_address: Address = to
            .parse()
            .map_err(|_| format!("invalid 'to' address: {}", to))?;

        let provider = provider_for_chain(chain_id)?;

        // Serialize nonce-fetch through submission per sending address
        let lock = self
            .address_locks
            .entry(from)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let nonce = provider
            .get_transaction_count(from, Some(BlockId::Number(BlockNumber::Pending)))
            .await
            .map_err(|e| format!("failed to get nonce: {}", e))?;

        let gas_tip_cap: U256 = provider
            .request("eth_maxPriorityFeePerGas", ())
            .await
            .map_err(|e| format!("failed to get gas tip cap: {}", e))?;
        // Fee cap falls back to the legacy gas-price suggestion
        let gas_fee_cap = provider
            .get_gas_price()
            .await
            .map_err(|e| format!("failed to get gas fee cap: {}", e))?;

        let tx = Eip1559TransactionRequest::new()
            .from(from)
            .to(to_address)
            .value(value)
            .data(data)
            .chain_id(chain_id_num)
            .max_fee_per_gas(gas_fee_cap)
            .max_priority_fee_per_gas(gas_tip_cap);
        let mut typed: TypedTransaction = tx.into();

        let gas_limit = provider
            .estimate_gas(&typed, None)
            .await
            .map_err(|e| format!("failed to estimate gas: {}", e))?;
        typed.set_gas(gas_limit);
        typed.set_nonce(nonce);

        let signature = wallet
            .sign_transaction(&typed)
            .await
            .map_err(|e| format!("failed to sign tx: {}", e))?;
        let raw = typed.rlp_signed(&signature);

        let pending = provider
            .send_raw_transaction(raw)
            .await
            .map_err(|e| format!("failed to send tx: {}", e))?;
        let tx_hash: TxHash = *pending;

        log::info!(
            "[SIGNER] submitted tx {:?} from {:?} on chain {} (nonce {})",
            tx_hash,
            from,
            chain_id,
            nonce
        );
        Ok(format!("{:?}", tx_hash))
    }

    /// Native asset transfer: a transaction with empty call data
    pub async fn transfer(
        &self,
        chain_id: &str,
        external_id: &str,
        to: &str,
        amount: U256,
    ) -> Result<String, String> {
        self.sign_and_submit(chain_id, external_id, to, Vec::new(), amount)
            .await
    }

    /// Latest native balance of the identity's account-model wallet
    pub async fn balance(&self, chain_id: &str, external_id: &str) -> Result<U256, String> {
        let record = self
            .wallets
            .get(external_id)?
            .ok_or_else(|| format!("user does not exist: {}", external_id))?;
        let address: Address = record
            .keys
            .eth
            .public_address
            .parse()
            .map_err(|e| format!("stored address is invalid: {}", e))?;

        let provider = provider_for_chain(chain_id)?;
        provider
            .get_balance(address, None)
            .await
            .map_err(|e| format!("failed to get balance: {}", e))
    }
}

fn provider_for_chain(chain_id: &str) -> Result<Provider<Http>, String> {
    let rpc_url = crate::config::rpc_endpoint_for_chain(chain_id)
        .ok_or_else(|| format!("no RPC endpoint configured for chain {}", chain_id))?;
    let url: Url = rpc_url
        .parse()
        .map_err(|e| format!("invalid RPC url '{}': {}", rpc_url, e))?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(
            crate::config::defaults::SIGNER_TIMEOUT_SECS,
        ))
        .build()
        .map_err(|e| format!("failed to create RPC client: {}", e))?;
    Ok(Provider::new(Http::new_with_client(url, client)))
}

/// Parse decimal or 0x-hex strings to U256. Plain `str::parse` treats
/// input as hex, so decimal strings must go through `from_dec_str`.
pub fn parse_u256(s: &str) -> Result<U256, String> {
    let s = s.trim();
    if let Some(hex_digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        U256::from_str_radix(hex_digits, 16).map_err(|e| format!("invalid hex: {} - {}", s, e))
    } else {
        U256::from_dec_str(s).map_err(|e| format!("invalid decimal: {} - {}", s, e))
    }
}

/// Decode hex calldata, tolerating a missing 0x prefix and odd-length
/// strings (padded with a leading zero).
pub fn parse_calldata(data: &str) -> Result<Vec<u8>, String> {
    let hex_str = data.trim().trim_start_matches("0x");
    if hex_str.is_empty() {
        return Ok(Vec::new());
    }
    let padded = if hex_str.len() % 2 != 0 {
        format!("0{}", hex_str)
    } else {
        hex_str.to_string()
    };
    hex::decode(&padded).map_err(|e| format!("invalid hex data: {}", e))
}
