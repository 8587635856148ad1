//! Ledger access
//!
//! The pipeline never talks to the ledger itself. A [`LedgerSource`] hands it
//! the complete record list of a chain, oldest first, or fails the run.
//! Nothing here retries.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::FactomdConfig;
use crate::error::{RaffleError, RaffleResult};
use crate::record::entry_hash;
use crate::types::{ChainId, Hash, LedgerRecord, ZERO_HASH, parse_hash};

#[async_trait]
pub trait LedgerSource: Send + Sync {
    /// Every record of the chain in write order, sequence 0 = oldest
    async fn fetch_records(&self, chain_id: &ChainId) -> RaffleResult<Vec<LedgerRecord>>;
}

// ============================================================================
// IN-MEMORY SOURCE
// ============================================================================

/// Source over records that are already resolved (replays, tests)
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    chain_id: Option<ChainId>,
    records: Vec<LedgerRecord>,
}

impl MemoryLedger {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id: Some(chain_id),
            records: Vec::new(),
        }
    }

    /// Append a payload; identity is the Factom entry hash, sequence is the next slot
    pub fn push(&mut self, payload: &[u8]) -> RaffleResult<Hash> {
        let chain_id = self.chain_id.unwrap_or(ChainId(ZERO_HASH));
        let identity = entry_hash(&chain_id, &[], payload)?;
        self.records.push(LedgerRecord {
            identity,
            sequence: self.records.len() as u64,
            payload: payload.to_vec(),
        });
        Ok(identity)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl LedgerSource for MemoryLedger {
    async fn fetch_records(&self, chain_id: &ChainId) -> RaffleResult<Vec<LedgerRecord>> {
        match self.chain_id {
            Some(id) if id == *chain_id => Ok(self.records.clone()),
            _ => Err(RaffleError::Retrieval(format!("unknown chain {chain_id}"))),
        }
    }
}

// ============================================================================
// FACTOMD JSON-RPC
// ============================================================================

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ChainHead {
    chainhead: String,
    #[serde(default)]
    chaininprocesslist: bool,
}

#[derive(Debug, Deserialize)]
struct EntryBlockHeader {
    prevkeymr: String,
    #[serde(default)]
    blocksequencenumber: u64,
}

#[derive(Debug, Deserialize)]
struct EntryBlockItem {
    entryhash: String,
}

#[derive(Debug, Deserialize)]
struct EntryBlock {
    header: EntryBlockHeader,
    #[serde(default)]
    entrylist: Vec<EntryBlockItem>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    extids: Vec<String>,
    content: String,
}

/// factomd v2 API client
pub struct FactomdClient {
    client: Client,
    url: String,
    request_id: AtomicU64,
}

impl FactomdClient {
    pub fn new(config: &FactomdConfig) -> RaffleResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.api_url(),
            request_id: AtomicU64::new(0),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> RaffleResult<T> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        debug!("factomd call: {} id={}", method, id);

        let response = self.client.post(&self.url).json(&request).send().await?;

        let status = response.status();
        let body: RpcResponse<T> = match response.json().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(RaffleError::Retrieval(format!("{method}: HTTP {status}")));
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(error) = body.error {
            return Err(RaffleError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        body.result
            .ok_or_else(|| RaffleError::Retrieval(format!("{method}: empty result")))
    }

    async fn chain_head(&self, chain_id: &ChainId) -> RaffleResult<Hash> {
        let head: ChainHead = self
            .call("chain-head", serde_json::json!({ "chainid": chain_id.to_hex() }))
            .await?;
        if head.chainhead.is_empty() {
            let why = if head.chaininprocesslist {
                "chain is still in the process list"
            } else {
                "chain has no entry blocks"
            };
            return Err(RaffleError::Retrieval(format!("{chain_id}: {why}")));
        }
        parse_hash(&head.chainhead).map_err(|e| RaffleError::Retrieval(format!("chain head: {e}")))
    }

    async fn entry_block(&self, keymr: &Hash) -> RaffleResult<EntryBlock> {
        self.call("entry-block", serde_json::json!({ "keymr": hex::encode(keymr) }))
            .await
    }

    async fn entry(&self, hash: &Hash) -> RaffleResult<RawEntry> {
        self.call("entry", serde_json::json!({ "hash": hex::encode(hash) }))
            .await
    }

    /// Entry hashes of the whole chain, oldest first
    async fn entry_hashes(&self, chain_id: &ChainId) -> RaffleResult<Vec<Hash>> {
        let mut blocks: Vec<Vec<Hash>> = Vec::new();
        let mut keymr = self.chain_head(chain_id).await?;
        let mut visited: HashSet<Hash> = HashSet::new();

        while keymr != ZERO_HASH {
            // prevkeymr links must terminate at ZERO_HASH
            if !visited.insert(keymr) {
                return Err(RaffleError::Retrieval(format!(
                    "entry block chain cycles back to {}",
                    hex::encode(keymr)
                )));
            }
            let block = self.entry_block(&keymr).await?;
            debug!(
                "entry block #{} with {} entries",
                block.header.blocksequencenumber,
                block.entrylist.len()
            );
            let hashes = block
                .entrylist
                .iter()
                .map(|item| parse_hash(&item.entryhash))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| RaffleError::Retrieval(format!("entry block: {e}")))?;
            blocks.push(hashes);
            keymr = parse_hash(&block.header.prevkeymr)
                .map_err(|e| RaffleError::Retrieval(format!("prevkeymr: {e}")))?;
        }

        Ok(blocks.into_iter().rev().flatten().collect())
    }
}

#[async_trait]
impl LedgerSource for FactomdClient {
    async fn fetch_records(&self, chain_id: &ChainId) -> RaffleResult<Vec<LedgerRecord>> {
        let hashes = self.entry_hashes(chain_id).await?;
        info!("chain {} holds {} entries", chain_id, hashes.len());

        let mut records = Vec::with_capacity(hashes.len());
        for (sequence, listed) in hashes.iter().enumerate() {
            let raw = self.entry(listed).await?;
            let record = to_record(chain_id, sequence as u64, listed, raw)?;
            records.push(record);
        }
        Ok(records)
    }
}

/// Decode a fetched entry and check its hash against the one the block listed
fn to_record(
    chain_id: &ChainId,
    sequence: u64,
    listed: &Hash,
    raw: RawEntry,
) -> RaffleResult<LedgerRecord> {
    let bad_hex = |field: &str, e: hex::FromHexError| {
        RaffleError::Retrieval(format!("entry #{sequence}: {field} is not hex: {e}"))
    };

    let payload = hex::decode(&raw.content).map_err(|e| bad_hex("content", e))?;
    let ext_ids = raw
        .extids
        .iter()
        .map(hex::decode)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| bad_hex("extids", e))?;

    let computed = entry_hash(chain_id, &ext_ids, &payload)?;
    if computed != *listed {
        return Err(RaffleError::IdentityMismatch {
            sequence,
            listed: hex::encode(listed),
            computed: hex::encode(computed),
        });
    }

    Ok(LedgerRecord {
        identity: computed,
        sequence,
        payload,
    })
}
