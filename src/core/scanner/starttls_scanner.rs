// src/core/scanner/starttls_scanner.rs

use tracing::{info, warn};

use crate::core::error::GatewayError;
use crate::core::models::{FetchResult, ScanTask};
use crate::core::scanner::certificate::metadata_for;
use crate::core::scanner::openssl_gateway::{ChainGateway, ChainRequest};
use std::sync::Arc;

/// Fetcher for plaintext protocols upgraded in-band. There is no native
/// upgrade path, so the external client does all the work.
pub struct StartTlsFetcher {
    gateway: Arc<dyn ChainGateway>,
}

impl StartTlsFetcher {
    pub fn new(gateway: Arc<dyn ChainGateway>) -> Self {
        Self { gateway }
    }

    pub async fn fetch(&self, task: &ScanTask) -> FetchResult {
        if task.protocol.is_none() {
            return FetchResult::failure("STARTTLS task without a protocol");
        }

        match self.gateway.fetch_chain(&ChainRequest::from_task(task)).await {
            Ok(raw) => {
                let chain: Vec<_> = raw.iter().map(metadata_for).collect();
                match chain.first().cloned() {
                    Some(leaf) => {
                        info!(task = %task, certificates = chain.len(), "STARTTLS fetch succeeded.");
                        FetchResult::success(leaf, chain)
                    }
                    None => FetchResult::gateway_failure(&GatewayError::no_certificates("")),
                }
            }
            Err(e) => {
                warn!(task = %task, error = %e, "STARTTLS fetch failed.");
                FetchResult::gateway_failure(&e)
            }
        }
    }
}
