pub mod keys;
pub mod service;
pub mod signer;
pub mod store;
pub mod tools;

pub use keys::{WalletKeyPair, WalletKeys, generate_both_wallets};
pub use service::WalletService;
pub use signer::TxSigner;
pub use store::{WalletRecord, WalletStore};
pub use tools::build_wallet_server;
