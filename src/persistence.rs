//! Database persistence layer for fundledger

use crate::campaign::{Campaign, Donation, NewCampaign, NewDonation};
use crate::error::LedgerError;
use crate::ledger::Block;
use crate::transaction::TransactionRecord;
use rusqlite::{params, Connection};
use std::sync::Mutex;

/// Abstraction for storage backends. The ledger block log is write-ahead:
/// every appended block lands here before `append` returns to the caller.
pub trait Persistence: Send + Sync {
    fn append_block(&self, block: &Block) -> Result<(), LedgerError>;
    fn load_chain(&self) -> Result<Vec<Block>, LedgerError>;
    fn create_campaign(&self, new: &NewCampaign) -> Result<Campaign, LedgerError>;
    fn list_campaigns(&self) -> Result<Vec<Campaign>, LedgerError>;
    fn get_campaign(&self, id: i64) -> Result<Option<Campaign>, LedgerError>;
    /// Records the donation and bumps the campaign's running total in one
    /// storage transaction.
    fn record_donation(&self, new: &NewDonation) -> Result<Donation, LedgerError>;
    fn donations_for_campaign(&self, campaign_id: i64) -> Result<Vec<Donation>, LedgerError>;
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self, LedgerError> {
        let conn = Connection::open(path)
            .map_err(|e| LedgerError::DatabaseError(format!("Failed to open database: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS ledger_blocks (
                block_index INTEGER PRIMARY KEY,
                timestamp INTEGER NOT NULL,
                payload TEXT NOT NULL,
                previous_hash TEXT NOT NULL,
                hash TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| {
            LedgerError::DatabaseError(format!("Failed to create ledger_blocks table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS campaigns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                amount_needed INTEGER NOT NULL,
                amount_raised INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| {
            LedgerError::DatabaseError(format!("Failed to create campaigns table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS donations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount INTEGER NOT NULL,
                donor_name TEXT NOT NULL,
                payment_id TEXT NOT NULL,
                campaign_id INTEGER NOT NULL REFERENCES campaigns(id),
                block_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| {
            LedgerError::DatabaseError(format!("Failed to create donations table: {}", e))
        })?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, LedgerError> {
        self.conn
            .lock()
            .map_err(|_| LedgerError::DatabaseError("Mutex poisoned".to_string()))
    }
}

impl Persistence for Database {
    fn append_block(&self, block: &Block) -> Result<(), LedgerError> {
        let payload = serde_json::to_string(&block.transaction).map_err(|e| {
            LedgerError::DatabaseError(format!("Failed to serialize block payload: {}", e))
        })?;

        let conn = self.lock()?;
        // Plain INSERT: the block log is append-only, so a primary-key
        // conflict is a bug worth surfacing, not something to overwrite.
        conn.execute(
            "INSERT INTO ledger_blocks (block_index, timestamp, payload, previous_hash, hash)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                block.index as i64,
                block.timestamp as i64,
                payload,
                block.previous_hash,
                block.hash,
            ],
        )
        .map_err(|e| LedgerError::DatabaseError(format!("Failed to append block: {}", e)))?;

        Ok(())
    }

    fn load_chain(&self) -> Result<Vec<Block>, LedgerError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT block_index, timestamp, payload, previous_hash, hash
                 FROM ledger_blocks ORDER BY block_index ASC",
            )
            .map_err(|e| LedgerError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let index: i64 = row.get(0)?;
                let timestamp: i64 = row.get(1)?;
                let payload: String = row.get(2)?;
                let previous_hash: String = row.get(3)?;
                let hash: String = row.get(4)?;
                Ok((index, timestamp, payload, previous_hash, hash))
            })
            .map_err(|e| LedgerError::DatabaseError(format!("Failed to query blocks: {}", e)))?;

        let mut blocks = Vec::new();
        for row_result in rows {
            let (index, timestamp, payload, previous_hash, hash) = row_result
                .map_err(|e| LedgerError::DatabaseError(format!("Failed to read row: {}", e)))?;

            let transaction: TransactionRecord = serde_json::from_str(&payload).map_err(|e| {
                LedgerError::DatabaseError(format!("Failed to deserialize block payload: {}", e))
            })?;

            // Reconstruct with the hash exactly as stored; recomputing here
            // would mask the very tampering verify() exists to expose.
            blocks.push(Block {
                index: index as u64,
                timestamp: timestamp as u64,
                transaction,
                previous_hash,
                hash,
            });
        }

        Ok(blocks)
    }

    fn create_campaign(&self, new: &NewCampaign) -> Result<Campaign, LedgerError> {
        new.validate()?;
        let created_at = chrono::Utc::now().to_rfc3339();

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO campaigns (title, description, amount_needed, amount_raised, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![new.title, new.description, new.amount_needed as i64, created_at],
        )
        .map_err(|e| LedgerError::DatabaseError(format!("Failed to create campaign: {}", e)))?;

        Ok(Campaign {
            id: conn.last_insert_rowid(),
            title: new.title.clone(),
            description: new.description.clone(),
            amount_needed: new.amount_needed,
            amount_raised: 0,
            created_at,
        })
    }

    fn list_campaigns(&self) -> Result<Vec<Campaign>, LedgerError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, title, description, amount_needed, amount_raised, created_at
                 FROM campaigns ORDER BY id ASC",
            )
            .map_err(|e| LedgerError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], row_to_campaign)
            .map_err(|e| LedgerError::DatabaseError(format!("Failed to query campaigns: {}", e)))?;

        let mut campaigns = Vec::new();
        for row_result in rows {
            campaigns.push(row_result.map_err(|e| {
                LedgerError::DatabaseError(format!("Failed to read campaign: {}", e))
            })?);
        }
        Ok(campaigns)
    }

    fn get_campaign(&self, id: i64) -> Result<Option<Campaign>, LedgerError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, title, description, amount_needed, amount_raised, created_at
                 FROM campaigns WHERE id = ?1",
            )
            .map_err(|e| LedgerError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let mut rows = stmt
            .query_map(params![id], row_to_campaign)
            .map_err(|e| LedgerError::DatabaseError(format!("Failed to query campaign: {}", e)))?;

        match rows.next() {
            Some(row) => Ok(Some(row.map_err(|e| {
                LedgerError::DatabaseError(format!("Failed to read campaign: {}", e))
            })?)),
            None => Ok(None),
        }
    }

    fn record_donation(&self, new: &NewDonation) -> Result<Donation, LedgerError> {
        let created_at = chrono::Utc::now().to_rfc3339();

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(|e| {
            LedgerError::DatabaseError(format!("Failed to start transaction: {}", e))
        })?;

        let updated = tx
            .execute(
                "UPDATE campaigns SET amount_raised = amount_raised + ?1 WHERE id = ?2",
                params![new.amount as i64, new.campaign_id],
            )
            .map_err(|e| {
                LedgerError::DatabaseError(format!("Failed to update campaign total: {}", e))
            })?;
        if updated == 0 {
            return Err(LedgerError::CampaignNotFound(new.campaign_id));
        }

        tx.execute(
            "INSERT INTO donations (amount, donor_name, payment_id, campaign_id, block_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new.amount as i64,
                new.donor_name,
                new.payment_id,
                new.campaign_id,
                new.block_hash,
                created_at,
            ],
        )
        .map_err(|e| LedgerError::DatabaseError(format!("Failed to record donation: {}", e)))?;

        let id = tx.last_insert_rowid();
        tx.commit().map_err(|e| {
            LedgerError::DatabaseError(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(Donation {
            id,
            amount: new.amount,
            donor_name: new.donor_name.clone(),
            payment_id: new.payment_id.clone(),
            campaign_id: new.campaign_id,
            block_hash: new.block_hash.clone(),
            created_at,
        })
    }

    fn donations_for_campaign(&self, campaign_id: i64) -> Result<Vec<Donation>, LedgerError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, amount, donor_name, payment_id, campaign_id, block_hash, created_at
                 FROM donations WHERE campaign_id = ?1 ORDER BY id ASC",
            )
            .map_err(|e| LedgerError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![campaign_id], row_to_donation)
            .map_err(|e| LedgerError::DatabaseError(format!("Failed to query donations: {}", e)))?;

        let mut donations = Vec::new();
        for row_result in rows {
            donations.push(row_result.map_err(|e| {
                LedgerError::DatabaseError(format!("Failed to read donation: {}", e))
            })?);
        }
        Ok(donations)
    }
}

fn row_to_campaign(row: &rusqlite::Row<'_>) -> rusqlite::Result<Campaign> {
    let amount_needed: i64 = row.get(3)?;
    let amount_raised: i64 = row.get(4)?;
    Ok(Campaign {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        amount_needed: amount_needed as u64,
        amount_raised: amount_raised as u64,
        created_at: row.get(5)?,
    })
}

fn row_to_donation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Donation> {
    let amount: i64 = row.get(1)?;
    Ok(Donation {
        id: row.get(0)?,
        amount: amount as u64,
        donor_name: row.get(2)?,
        payment_id: row.get(3)?,
        campaign_id: row.get(4)?,
        block_hash: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Simple in-memory backend useful for tests and ephemeral runs.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    blocks: std::sync::Arc<Mutex<Vec<Block>>>,
    campaigns: std::sync::Arc<Mutex<Vec<Campaign>>>,
    donations: std::sync::Arc<Mutex<Vec<Donation>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> LedgerError {
        LedgerError::DatabaseError("Mutex poisoned".to_string())
    }
}

impl Persistence for InMemoryStore {
    fn append_block(&self, block: &Block) -> Result<(), LedgerError> {
        let mut blocks = self.blocks.lock().map_err(|_| Self::poisoned())?;
        if blocks.iter().any(|b| b.index == block.index) {
            return Err(LedgerError::DatabaseError(format!(
                "Block {} already persisted",
                block.index
            )));
        }
        blocks.push(block.clone());
        Ok(())
    }

    fn load_chain(&self) -> Result<Vec<Block>, LedgerError> {
        let blocks = self.blocks.lock().map_err(|_| Self::poisoned())?;
        Ok(blocks.clone())
    }

    fn create_campaign(&self, new: &NewCampaign) -> Result<Campaign, LedgerError> {
        new.validate()?;
        let mut campaigns = self.campaigns.lock().map_err(|_| Self::poisoned())?;
        let campaign = Campaign {
            id: campaigns.len() as i64 + 1,
            title: new.title.clone(),
            description: new.description.clone(),
            amount_needed: new.amount_needed,
            amount_raised: 0,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        campaigns.push(campaign.clone());
        Ok(campaign)
    }

    fn list_campaigns(&self) -> Result<Vec<Campaign>, LedgerError> {
        let campaigns = self.campaigns.lock().map_err(|_| Self::poisoned())?;
        Ok(campaigns.clone())
    }

    fn get_campaign(&self, id: i64) -> Result<Option<Campaign>, LedgerError> {
        let campaigns = self.campaigns.lock().map_err(|_| Self::poisoned())?;
        Ok(campaigns.iter().find(|c| c.id == id).cloned())
    }

    fn record_donation(&self, new: &NewDonation) -> Result<Donation, LedgerError> {
        let mut campaigns = self.campaigns.lock().map_err(|_| Self::poisoned())?;
        let campaign = campaigns
            .iter_mut()
            .find(|c| c.id == new.campaign_id)
            .ok_or(LedgerError::CampaignNotFound(new.campaign_id))?;
        campaign.amount_raised += new.amount;

        let mut donations = self.donations.lock().map_err(|_| Self::poisoned())?;
        let donation = Donation {
            id: donations.len() as i64 + 1,
            amount: new.amount,
            donor_name: new.donor_name.clone(),
            payment_id: new.payment_id.clone(),
            campaign_id: new.campaign_id,
            block_hash: new.block_hash.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        donations.push(donation.clone());
        Ok(donation)
    }

    fn donations_for_campaign(&self, campaign_id: i64) -> Result<Vec<Donation>, LedgerError> {
        let donations = self.donations.lock().map_err(|_| Self::poisoned())?;
        Ok(donations
            .iter()
            .filter(|d| d.campaign_id == campaign_id)
            .cloned()
            .collect())
    }
}
