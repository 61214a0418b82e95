//! Shared handles for one harness run.

use std::sync::Arc;
use tps_bench_client::{ExecuteOptions, LedgerClient, LedgerError, Signer};
use tps_bench_types::{SuiAddress, TransactionData, TransactionResponse};

/// Ledger client and signer shared by every task of a run.
///
/// Cloning is cheap; all channel tasks hold their own clone.
#[derive(Clone)]
pub struct RunContext {
    ledger: Arc<dyn LedgerClient>,
    signer: Arc<dyn Signer>,
}

impl RunContext {
    pub fn new(ledger: Arc<dyn LedgerClient>, signer: Arc<dyn Signer>) -> Self {
        Self { ledger, signer }
    }

    pub fn ledger(&self) -> &dyn LedgerClient {
        self.ledger.as_ref()
    }

    /// Address that signs and pays for every submission.
    pub fn address(&self) -> SuiAddress {
        self.signer.address()
    }

    /// Sign `data` and execute it, requesting effects and object changes.
    pub async fn submit(&self, data: TransactionData) -> Result<TransactionResponse, LedgerError> {
        let signed = self.signer.sign(data).await?;
        self.ledger
            .execute_transaction(signed, ExecuteOptions::default())
            .await
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
