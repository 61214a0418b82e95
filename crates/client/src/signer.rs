//! Transaction signing.
//!
//! Keys never live in this process. `RemoteSigner` hands the unsigned
//! transaction to an external signing service; `SimSigner` (in `sim`) signs
//! nothing and is only accepted by the simulated ledger.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tps_bench_types::{SuiAddress, TransactionData};

/// A transaction together with its wire encoding and signatures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransaction {
    pub data: TransactionData,
    /// Base64 wire encoding of `data`.
    pub tx_bytes: String,
    /// Base64 serialized signatures.
    pub signatures: Vec<String>,
}

/// Signer errors.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Signer refused transaction: {0}")]
    Refused(String),

    #[error("Sender {sender} does not match signer address {signer}")]
    WrongSender {
        sender: SuiAddress,
        signer: SuiAddress,
    },
}

/// Holds a key, exposes its address, and signs transactions.
#[async_trait]
pub trait Signer: Send + Sync {
    fn address(&self) -> SuiAddress;

    async fn sign(&self, data: TransactionData) -> Result<SignedTransaction, SignerError>;
}

#[derive(Debug, Serialize)]
struct SignRequest<'a> {
    transaction: &'a TransactionData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignResponse {
    tx_bytes: Option<String>,
    #[serde(default)]
    signatures: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Delegates signing to an HTTP signing service.
///
/// `POST {base_url}/sign` with `{"transaction": TransactionData}`; the service
/// answers `{"txBytes": ..., "signatures": [...]}` or `{"error": ...}`.
pub struct RemoteSigner {
    base_url: String,
    address: SuiAddress,
    client: Client,
}

impl RemoteSigner {
    pub fn new(base_url: impl Into<String>, address: SuiAddress) -> Result<Self, SignerError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            base_url: base_url.into(),
            address,
            client,
        })
    }
}

#[async_trait]
impl Signer for RemoteSigner {
    fn address(&self) -> SuiAddress {
        self.address
    }

    async fn sign(&self, data: TransactionData) -> Result<SignedTransaction, SignerError> {
        if data.sender != self.address {
            return Err(SignerError::WrongSender {
                sender: data.sender,
                signer: self.address,
            });
        }

        let response: SignResponse = self
            .client
            .post(format!("{}/sign", self.base_url.trim_end_matches('/')))
            .json(&SignRequest { transaction: &data })
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(SignerError::Refused(error));
        }
        let tx_bytes = response
            .tx_bytes
            .ok_or_else(|| SignerError::Refused("response without txBytes".to_string()))?;
        if response.signatures.is_empty() {
            return Err(SignerError::Refused("response without signatures".to_string()));
        }

        Ok(SignedTransaction {
            data,
            tx_bytes,
            signatures: response.signatures,
        })
    }
}
