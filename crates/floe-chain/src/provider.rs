//! rpc connection and signer setup

use crate::error::{ChainError, Result};
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use tracing::info;

/// A provider plus the address it signs for, if any
#[derive(Clone)]
pub struct Connection {
    pub provider: DynProvider,
    pub signer: Option<Address>,
}

impl Connection {
    /// Connect to `rpc_url`, signing with `private_key` when given.
    pub async fn open(rpc_url: &str, private_key: Option<&str>) -> Result<Self> {
        info!("connecting to {}", rpc_url);
        match private_key {
            Some(key) => {
                let signer = parse_signer(key)?;
                let address = signer.address();
                let provider = ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer))
                    .connect(rpc_url)
                    .await
                    .map_err(|e| ChainError::InvalidConfig(format!("rpc {}: {}", rpc_url, e)))?
                    .erased();
                Ok(Self { provider, signer: Some(address) })
            }
            None => {
                let provider = ProviderBuilder::new()
                    .connect(rpc_url)
                    .await
                    .map_err(|e| ChainError::InvalidConfig(format!("rpc {}: {}", rpc_url, e)))?
                    .erased();
                Ok(Self { provider, signer: None })
            }
        }
    }

    pub fn require_signer(&self) -> Result<Address> {
        self.signer
            .ok_or_else(|| ChainError::InvalidConfig("a private key is required for writes".into()))
    }

    pub async fn native_balance(&self, account: Address) -> Result<U256> {
        self.provider
            .get_balance(account)
            .await
            .map_err(|e| ChainError::ReadFailure(format!("balance of {}: {}", account, e)))
    }
}

pub fn parse_signer(key: &str) -> Result<PrivateKeySigner> {
    key.trim()
        .parse::<PrivateKeySigner>()
        .map_err(|e| ChainError::InvalidConfig(format!("private key: {}", e)))
}

pub fn parse_address(value: &str, what: &str) -> Result<Address> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|e| ChainError::InvalidConfig(format!("{} {:?}: {}", what, value, e)))
}

/// 32-byte feed identifier, 0x-prefixed hex
pub fn parse_feed_id(value: &str) -> Result<B256> {
    value
        .trim()
        .parse::<B256>()
        .map_err(|e| ChainError::InvalidConfig(format!("feed id {:?}: {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_parse_signer() {
        let signer =
            parse_signer("0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80").unwrap();
        assert_eq!(signer.address(), address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
        assert!(matches!(parse_signer("not a key"), Err(ChainError::InvalidConfig(_))));
    }

    #[test]
    fn test_parse_feed_id() {
        let id = parse_feed_id("0xd7f402a699378a97cf4b1f46fb772a465535d2fead1457bcb27b58312638e264")
            .unwrap();
        assert_eq!(id.0[0], 0xd7);
        assert_eq!(id.0[31], 0x64);
        assert!(parse_feed_id("0x1234").is_err());
    }

    #[test]
    fn test_parse_address() {
        let a = parse_address(" 0xbBD700ca8Fc326c90BA90A028fC1C7b36b0e9D7B ", "adapter").unwrap();
        assert_eq!(a, address!("bBD700ca8Fc326c90BA90A028fC1C7b36b0e9D7B"));
        assert!(parse_address("0xnope", "adapter").is_err());
    }
}
