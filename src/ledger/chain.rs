use crate::error::LedgerError;
use crate::transaction::TransactionRecord;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Sentinel `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// One immutable ledger entry: a payload plus linkage and integrity
/// metadata. Once appended, a block's fields are never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Unix milliseconds at construction time.
    pub timestamp: u64,
    pub transaction: TransactionRecord,
    pub previous_hash: String,
    /// Hex-encoded SHA-256 over the canonical form of the other four fields.
    pub hash: String,
}

#[derive(Serialize)]
struct HashPayload<'a> {
    index: u64,
    timestamp: u64,
    transaction: &'a TransactionRecord,
    previous_hash: &'a str,
}

impl Block {
    /// Construct a block and compute its content hash immediately.
    ///
    /// Fails only if the payload cannot be serialized; a failure here must
    /// reach the caller so the confirmation is rejected instead of a
    /// hashless block entering the chain.
    pub fn new(
        index: u64,
        timestamp: u64,
        transaction: TransactionRecord,
        previous_hash: String,
    ) -> Result<Self, LedgerError> {
        let mut block = Block {
            index,
            timestamp,
            transaction,
            previous_hash,
            hash: String::new(),
        };
        block.hash = block.calculate_hash()?;
        Ok(block)
    }

    /// Deterministic content hash over `{index, timestamp, transaction,
    /// previous_hash}`.
    ///
    /// The fields are run through `serde_json::Value`, whose object maps are
    /// BTreeMap-backed, so every level serializes with lexicographically
    /// sorted keys. Two payloads with the same fields hash identically no
    /// matter how their maps were built.
    pub fn calculate_hash(&self) -> Result<String, LedgerError> {
        let canonical = serde_json::to_value(HashPayload {
            index: self.index,
            timestamp: self.timestamp,
            transaction: &self.transaction,
            previous_hash: &self.previous_hash,
        })?;

        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string().as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Read-only projection of a non-genesis block, as served to the audit and
/// listing surface. `previous_hash` is linkage metadata consumers never need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub index: u64,
    pub timestamp: u64,
    pub transaction: TransactionRecord,
    pub hash: String,
}

/// The append-only chain of blocks. There is exactly one writer; callers
/// that share a `Ledger` across tasks must wrap it in a lock so the
/// read-tail/push section of [`Ledger::append`] stays atomic.
pub struct Ledger {
    pub blocks: Vec<Block>,
}

impl Ledger {
    /// Create a ledger with its genesis block already in place. No other
    /// operation is observable before the genesis exists.
    pub fn new() -> Result<Self, LedgerError> {
        let genesis = Block::new(
            0,
            now_millis(),
            TransactionRecord::genesis(),
            GENESIS_PREVIOUS_HASH.to_string(),
        )?;
        Ok(Ledger {
            blocks: vec![genesis],
        })
    }

    /// Restore a ledger from previously persisted blocks.
    ///
    /// Rejects an empty or non-contiguous sequence outright; whether the
    /// restored content has been tampered with is [`Ledger::verify`]'s call,
    /// not the loader's.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, LedgerError> {
        if blocks.is_empty() {
            return Err(LedgerError::InvalidBlock(
                "restored chain has no genesis block".to_string(),
            ));
        }
        for (i, block) in blocks.iter().enumerate() {
            if block.index != i as u64 {
                return Err(LedgerError::InvalidBlock(format!(
                    "restored chain is not contiguous: expected index {}, got {}",
                    i, block.index
                )));
            }
        }
        Ok(Ledger { blocks })
    }

    /// Append a transaction as a new block linked to the current tail and
    /// return the block.
    ///
    /// The transaction's business meaning is not validated here; payment
    /// verification happens before this call.
    pub fn append(&mut self, transaction: TransactionRecord) -> Result<Block, LedgerError> {
        let index = self.blocks.len() as u64;
        let previous_hash = match self.blocks.last() {
            Some(tail) => tail.hash.clone(),
            None => GENESIS_PREVIOUS_HASH.to_string(),
        };
        let block = Block::new(index, now_millis(), transaction, previous_hash)?;
        self.blocks.push(block.clone());
        Ok(block)
    }

    /// The most recently appended block.
    pub fn tail(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Walk the whole chain and check both integrity conditions: every
    /// block's stored hash matches a recomputation of its fields, and every
    /// non-genesis block links to its predecessor's stored hash.
    ///
    /// The neighbour comparison deliberately uses the hashes as stored;
    /// that is exactly the check that exposes removed, reordered or
    /// substituted blocks.
    pub fn verify(&self) -> bool {
        let genesis = match self.blocks.first() {
            Some(block) => block,
            None => return false,
        };
        if !block_hash_matches(genesis) {
            return false;
        }

        for i in 1..self.blocks.len() {
            let current = &self.blocks[i];
            let previous = &self.blocks[i - 1];

            if !block_hash_matches(current) {
                return false;
            }
            if current.previous_hash != previous.hash {
                return false;
            }
        }

        true
    }

    /// All blocks except the genesis, in chain order, projected for the
    /// audit/listing surface.
    pub fn export(&self) -> Vec<LedgerEntry> {
        self.blocks
            .iter()
            .skip(1)
            .map(|block| LedgerEntry {
                index: block.index,
                timestamp: block.timestamp,
                transaction: block.transaction.clone(),
                hash: block.hash.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

fn block_hash_matches(block: &Block) -> bool {
    match block.calculate_hash() {
        Ok(recomputed) => recomputed == block.hash,
        Err(_) => false,
    }
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}
