//! Persistent address history index.
//!
//! `PersistentHistoryIndex` implements `AddressHistoryIndex` on a SQLite
//! database with a connection pool (r2d2) for concurrent reads and a dedicated
//! writer connection. Each block is written in one SQLite transaction, so a
//! reader sees either all of a block's entries or none of them.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, B256, U256};
use parking_lot::Mutex;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{ChainIndexError, ChainIndexResult};
use crate::history::{check_cursor, check_sequence, AddressHistoryIndex, IndexSettings};
use crate::types::{
    AddressHistoryEntry, BlockEntries, HistoryPosition, Role, StoredBlock, StoredReceipt,
    StoredTransaction, TransactionRecord,
};

const NEXT_BLOCK_KEY: &str = "next_block";
const OLDEST_BLOCK_KEY: &str = "oldest_block";
const FIRST_BLOCK_KEY: &str = "first_block";

/// Persistent address history index backed by SQLite.
///
/// Uses a connection pool for concurrent reads and a dedicated writer
/// connection for serialized writes. SQLite WAL mode allows readers to proceed
/// without blocking the writer and vice versa.
pub struct PersistentHistoryIndex {
    /// Connection pool for read operations (concurrent).
    read_pool: Pool<SqliteConnectionManager>,
    /// Dedicated connection for write operations (serialized).
    writer: Mutex<Connection>,
    settings: IndexSettings,
    next_block: AtomicU64,
    oldest_block: AtomicU64,
}

/// Configure a connection with standard PRAGMAs for WAL mode.
fn configure_connection(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         PRAGMA foreign_keys=ON;",
    )
}

impl PersistentHistoryIndex {
    /// Open (or create) an index backed by an on-disk SQLite database.
    ///
    /// An existing database keeps its own `first_block`; `settings` only
    /// decides where a fresh database starts and how much history is kept.
    pub fn open(db_path: impl AsRef<Path>, settings: IndexSettings) -> ChainIndexResult<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ChainIndexError::Storage(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        // Writer connection -- dedicated for append
        let writer = Connection::open(db_path)?;
        configure_connection(&writer)?;
        init_schema(&writer)?;

        // Read pool -- concurrent read-only connections
        let manager = SqliteConnectionManager::file(db_path)
            .with_flags(
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .with_init(|conn| configure_connection(conn));
        let read_pool = Pool::builder().max_size(4).build(manager)?;

        Self::from_parts(read_pool, writer, settings)
    }

    /// Create an in-memory index for testing.
    ///
    /// In-memory SQLite DBs are per-connection, so the pool and the writer
    /// share one named database through a shared-cache URI.
    pub fn in_memory(settings: IndexSettings) -> ChainIndexResult<Self> {
        let uri = format!("file:history_{}?mode=memory&cache=shared", unique_id());
        let writer = Connection::open(&uri)?;
        configure_connection(&writer)?;
        init_schema(&writer)?;

        let manager =
            SqliteConnectionManager::file(&uri).with_init(|conn| configure_connection(conn));
        let read_pool = Pool::builder().max_size(2).build(manager)?;

        Self::from_parts(read_pool, writer, settings)
    }

    fn from_parts(
        read_pool: Pool<SqliteConnectionManager>,
        mut writer: Connection,
        settings: IndexSettings,
    ) -> ChainIndexResult<Self> {
        let watermarks = load_watermarks(&mut writer, settings)?;
        let settings = IndexSettings {
            first_block: watermarks.first,
            ..settings
        };

        Ok(Self {
            read_pool,
            writer: Mutex::new(writer),
            settings,
            next_block: AtomicU64::new(watermarks.next),
            oldest_block: AtomicU64::new(watermarks.oldest),
        })
    }

    /// Get a read connection from the pool.
    fn read_conn(&self) -> ChainIndexResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.read_pool.get()?)
    }

    fn entry_from_row(
        address: Address,
        row: &rusqlite::Row<'_>,
    ) -> rusqlite::Result<AddressHistoryEntry> {
        let block_number: i64 = row.get(0)?;
        let transaction_index: i64 = row.get(1)?;
        let role: i64 = row.get(2)?;
        let hash_bytes: Vec<u8> = row.get(3)?;

        let role = u8::try_from(role)
            .ok()
            .and_then(Role::from_u8)
            .ok_or_else(|| conversion_error(2, format!("unknown role code {role}")))?;

        Ok(AddressHistoryEntry {
            address,
            block_number: block_number as u64,
            transaction_index: transaction_index as u32,
            transaction_hash: b256_from_row(&hash_bytes, 3)?,
            role,
        })
    }

    fn row_to_stored_block(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredBlock> {
        let number: i64 = row.get(0)?;
        let hash_bytes: Vec<u8> = row.get(1)?;
        let parent_hash_bytes: Vec<u8> = row.get(2)?;
        let timestamp: i64 = row.get(3)?;
        let tx_hash_bytes: Vec<u8> = row.get(4)?;

        if tx_hash_bytes.len() % 32 != 0 {
            return Err(conversion_error(
                4,
                format!("transaction hash list has {} bytes", tx_hash_bytes.len()),
            ));
        }

        Ok(StoredBlock {
            number: number as u64,
            hash: b256_from_row(&hash_bytes, 1)?,
            parent_hash: b256_from_row(&parent_hash_bytes, 2)?,
            timestamp: timestamp as u64,
            transaction_hashes: tx_hash_bytes.chunks_exact(32).map(B256::from_slice).collect(),
        })
    }

    fn row_to_transaction_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<TransactionRecord> {
        let hash = b256_from_row(&row.get::<_, Vec<u8>>(0)?, 0)?;
        let block_number: i64 = row.get(1)?;
        let block_hash = b256_from_row(&row.get::<_, Vec<u8>>(2)?, 2)?;
        let transaction_index: i64 = row.get(3)?;
        let from = address_from_row(&row.get::<_, Vec<u8>>(4)?, 4)?;
        let to = row
            .get::<_, Option<Vec<u8>>>(5)?
            .map(|bytes| address_from_row(&bytes, 5))
            .transpose()?;
        let value_bytes: Vec<u8> = row.get(6)?;
        if value_bytes.len() != 32 {
            return Err(conversion_error(
                6,
                format!("expected 32 bytes for U256, got {}", value_bytes.len()),
            ));
        }
        let nonce: i64 = row.get(7)?;
        let payload_len: i64 = row.get(8)?;
        let success: bool = row.get(9)?;
        let gas_used: i64 = row.get(10)?;
        let cumulative_gas_used: i64 = row.get(11)?;
        let contract_address = row
            .get::<_, Option<Vec<u8>>>(12)?
            .map(|bytes| address_from_row(&bytes, 12))
            .transpose()?;
        let log_count: i64 = row.get(13)?;

        Ok(TransactionRecord {
            block_number: block_number as u64,
            block_hash,
            transaction_index: transaction_index as u32,
            transaction: StoredTransaction {
                hash,
                from,
                to,
                value: U256::from_be_slice(&value_bytes),
                nonce: nonce as u64,
                payload_len: payload_len as usize,
            },
            receipt: StoredReceipt {
                transaction_hash: hash,
                success,
                gas_used: gas_used as u64,
                contract_address,
                log_count: log_count as u64,
            },
            cumulative_gas_used: cumulative_gas_used as u64,
        })
    }
}

const TRANSACTION_COLUMNS: &str = "hash, block_number, block_hash, transaction_index, from_addr, \
     to_addr, value, nonce, payload_len, success, gas_used, cumulative_gas_used, \
     contract_address, log_count";

fn init_schema(conn: &Connection) -> ChainIndexResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS blocks (
             number INTEGER PRIMARY KEY,
             hash BLOB NOT NULL,
             parent_hash BLOB NOT NULL,
             timestamp INTEGER NOT NULL,
             transaction_hashes BLOB NOT NULL
         );

         CREATE TABLE IF NOT EXISTS address_history (
             address BLOB NOT NULL,
             block_number INTEGER NOT NULL,
             transaction_index INTEGER NOT NULL,
             role INTEGER NOT NULL,
             transaction_hash BLOB NOT NULL,
             PRIMARY KEY (address, block_number, transaction_index, role)
         ) WITHOUT ROWID;
         CREATE INDEX IF NOT EXISTS idx_history_block ON address_history(block_number);

         CREATE TABLE IF NOT EXISTS transactions (
             hash BLOB PRIMARY KEY,
             block_number INTEGER NOT NULL,
             block_hash BLOB NOT NULL,
             transaction_index INTEGER NOT NULL,
             from_addr BLOB NOT NULL,
             to_addr BLOB,
             value BLOB NOT NULL,
             nonce INTEGER NOT NULL,
             payload_len INTEGER NOT NULL,
             success INTEGER NOT NULL,
             gas_used INTEGER NOT NULL,
             cumulative_gas_used INTEGER NOT NULL,
             contract_address BLOB,
             log_count INTEGER NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_transactions_block
             ON transactions(block_number, transaction_index);

         CREATE TABLE IF NOT EXISTS metadata (
             key TEXT PRIMARY KEY,
             value INTEGER NOT NULL
         );",
    )?;
    Ok(())
}

struct Watermarks {
    first: u64,
    next: u64,
    oldest: u64,
}

/// Load the persisted watermarks, or stamp a fresh database with ours.
///
/// An existing database keeps its own first block. A retention window that
/// shrank since the last run takes effect immediately.
fn load_watermarks(conn: &mut Connection, settings: IndexSettings) -> ChainIndexResult<Watermarks> {
    let persisted = (
        read_meta(conn, FIRST_BLOCK_KEY)?,
        read_meta(conn, NEXT_BLOCK_KEY)?,
        read_meta(conn, OLDEST_BLOCK_KEY)?,
    );

    if let (Some(first), Some(next), Some(oldest)) = persisted {
        if first != settings.first_block {
            tracing::warn!(
                persisted = first,
                configured = settings.first_block,
                "ignoring configured first block for existing history index"
            );
        }
        let oldest = IndexSettings {
            first_block: first,
            ..settings
        }
        .oldest_retained(next)
        .max(oldest);
        tracing::info!(
            next_block = next,
            oldest_block = oldest,
            "History index initialized"
        );
        return Ok(Watermarks {
            first,
            next,
            oldest,
        });
    }

    let first = settings.first_block;
    let tx = conn.transaction()?;
    write_meta(&tx, FIRST_BLOCK_KEY, first)?;
    write_meta(&tx, NEXT_BLOCK_KEY, first)?;
    write_meta(&tx, OLDEST_BLOCK_KEY, first)?;
    tx.commit()?;
    tracing::info!("History index initialized (empty, first block {})", first);

    Ok(Watermarks {
        first,
        next: first,
        oldest: first,
    })
}

fn read_meta(conn: &Connection, key: &str) -> ChainIndexResult<Option<u64>> {
    let value: Option<i64> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.map(|v| v as u64))
}

fn write_meta(conn: &Connection, key: &str, value: u64) -> ChainIndexResult<()> {
    conn.execute(
        "INSERT INTO metadata (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value as i64],
    )?;
    Ok(())
}

impl AddressHistoryIndex for PersistentHistoryIndex {
    fn append(&self, data: BlockEntries) -> ChainIndexResult<()> {
        let mut conn = self.writer.lock();
        let number = data.number();
        check_sequence(self.next_block.load(Ordering::Acquire), number)?;

        let next = number + 1;
        let oldest = self
            .settings
            .oldest_retained(next)
            .max(self.oldest_block.load(Ordering::Acquire));

        let tx = conn.transaction()?;

        let tx_hashes: Vec<u8> = data
            .block
            .transaction_hashes
            .iter()
            .flat_map(|h| h.0)
            .collect();
        tx.execute(
            "INSERT INTO blocks (number, hash, parent_hash, timestamp, transaction_hashes)
             VALUES (?, ?, ?, ?, ?)",
            params![
                number as i64,
                data.block.hash.as_slice(),
                data.block.parent_hash.as_slice(),
                data.block.timestamp as i64,
                tx_hashes,
            ],
        )?;

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO address_history
                 (address, block_number, transaction_index, role, transaction_hash)
                 VALUES (?, ?, ?, ?, ?)",
            )?;
            for entry in &data.entries {
                stmt.execute(params![
                    entry.address.as_slice(),
                    entry.block_number as i64,
                    entry.transaction_index as i64,
                    entry.role.as_u8() as i64,
                    entry.transaction_hash.as_slice(),
                ])?;
            }
        }

        for record in &data.transactions {
            insert_transaction_record(&tx, record)?;
        }

        let pruned = if oldest > self.oldest_block.load(Ordering::Acquire) {
            let rows = tx.execute(
                "DELETE FROM address_history WHERE block_number < ?",
                params![oldest as i64],
            )?;
            tx.execute(
                "DELETE FROM transactions WHERE block_number < ?",
                params![oldest as i64],
            )?;
            tx.execute("DELETE FROM blocks WHERE number < ?", params![oldest as i64])?;
            rows
        } else {
            0
        };

        write_meta(&tx, NEXT_BLOCK_KEY, next)?;
        write_meta(&tx, OLDEST_BLOCK_KEY, oldest)?;
        tx.commit()?;

        self.oldest_block.store(oldest, Ordering::Release);
        self.next_block.store(next, Ordering::Release);

        tracing::debug!(
            block = number,
            entries = data.entries.len(),
            pruned,
            "appended block to history index"
        );
        Ok(())
    }

    fn query(
        &self,
        address: Address,
        cursor: Option<HistoryPosition>,
        limit: Option<usize>,
    ) -> ChainIndexResult<Vec<AddressHistoryEntry>> {
        let next = self.next_block.load(Ordering::Acquire);
        let oldest = self.oldest_block.load(Ordering::Acquire);
        check_cursor(cursor, oldest)?;

        let (cursor_block, cursor_index, cursor_role) = match cursor {
            Some(c) => (
                c.block_number as i64,
                c.transaction_index as i64,
                c.role.as_u8() as i64,
            ),
            None => (-1, -1, -1),
        };
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));

        let conn = self.read_conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT block_number, transaction_index, role, transaction_hash
             FROM address_history
             WHERE address = ?1
               AND block_number >= ?2 AND block_number < ?3
               AND (block_number, transaction_index, role) > (?4, ?5, ?6)
             ORDER BY block_number, transaction_index, role
             LIMIT ?7",
        )?;

        let entries: rusqlite::Result<Vec<AddressHistoryEntry>> = stmt
            .query_map(
                params![
                    address.as_slice(),
                    oldest as i64,
                    next as i64,
                    cursor_block,
                    cursor_index,
                    cursor_role,
                    limit,
                ],
                |row| Self::entry_from_row(address, row),
            )?
            .collect();

        Ok(entries?)
    }

    fn next_block(&self) -> u64 {
        self.next_block.load(Ordering::Acquire)
    }

    fn first_block(&self) -> u64 {
        self.settings.first_block
    }

    fn oldest_retained_block(&self) -> u64 {
        self.oldest_block.load(Ordering::Acquire)
    }

    fn get_block(&self, number: u64) -> ChainIndexResult<Option<StoredBlock>> {
        let next = self.next_block.load(Ordering::Acquire);
        let oldest = self.oldest_block.load(Ordering::Acquire);
        if number >= next || number < oldest {
            return Ok(None);
        }

        let conn = self.read_conn()?;
        let block = conn
            .query_row(
                "SELECT number, hash, parent_hash, timestamp, transaction_hashes
                 FROM blocks WHERE number = ?",
                params![number as i64],
                Self::row_to_stored_block,
            )
            .optional()?;
        Ok(block)
    }

    fn get_block_transactions(&self, number: u64) -> ChainIndexResult<Vec<TransactionRecord>> {
        let next = self.next_block.load(Ordering::Acquire);
        let oldest = self.oldest_block.load(Ordering::Acquire);
        if number >= next || number < oldest {
            return Ok(Vec::new());
        }

        let conn = self.read_conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions
             WHERE block_number = ? ORDER BY transaction_index"
        ))?;
        let records: rusqlite::Result<Vec<TransactionRecord>> = stmt
            .query_map(params![number as i64], Self::row_to_transaction_record)?
            .collect();
        Ok(records?)
    }

    fn get_transaction(&self, hash: B256) -> ChainIndexResult<Option<TransactionRecord>> {
        let next = self.next_block.load(Ordering::Acquire);
        let oldest = self.oldest_block.load(Ordering::Acquire);

        let conn = self.read_conn()?;
        let record = conn
            .query_row(
                &format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM transactions
                     WHERE hash = ?1 AND block_number >= ?2 AND block_number < ?3"
                ),
                params![hash.as_slice(), oldest as i64, next as i64],
                Self::row_to_transaction_record,
            )
            .optional()?;
        Ok(record)
    }

    fn find_deployment(&self, contract: Address) -> ChainIndexResult<Option<AddressHistoryEntry>> {
        let next = self.next_block.load(Ordering::Acquire);
        let oldest = self.oldest_block.load(Ordering::Acquire);

        let conn = self.read_conn()?;
        let entry = conn
            .query_row(
                "SELECT block_number, transaction_index, role, transaction_hash
                 FROM address_history
                 WHERE address = ?1 AND role = ?2
                   AND block_number >= ?3 AND block_number < ?4
                 ORDER BY block_number, transaction_index
                 LIMIT 1",
                params![
                    contract.as_slice(),
                    Role::Created.as_u8() as i64,
                    oldest as i64,
                    next as i64,
                ],
                |row| Self::entry_from_row(contract, row),
            )
            .optional()?;
        Ok(entry)
    }
}

fn insert_transaction_record(
    tx: &rusqlite::Transaction<'_>,
    record: &TransactionRecord,
) -> ChainIndexResult<()> {
    let transaction = &record.transaction;
    let receipt = &record.receipt;
    // A reused hash replaces the older record, matching the in-memory backend.
    tx.execute(
        &format!(
            "INSERT OR REPLACE INTO transactions ({TRANSACTION_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ),
        params![
            transaction.hash.as_slice(),
            record.block_number as i64,
            record.block_hash.as_slice(),
            record.transaction_index as i64,
            transaction.from.as_slice(),
            transaction.to.as_ref().map(|a| a.as_slice()),
            transaction.value.to_be_bytes::<32>().as_slice(),
            transaction.nonce as i64,
            transaction.payload_len as i64,
            receipt.success,
            receipt.gas_used as i64,
            record.cumulative_gas_used as i64,
            receipt.contract_address.as_ref().map(|a| a.as_slice()),
            receipt.log_count as i64,
        ],
    )?;
    Ok(())
}

fn unique_id() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

fn conversion_error(col: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Blob, message.into())
}

fn address_from_row(bytes: &[u8], col: usize) -> rusqlite::Result<Address> {
    if bytes.len() != 20 {
        return Err(conversion_error(
            col,
            format!("expected 20 bytes for Address, got {}", bytes.len()),
        ));
    }
    Ok(Address::from_slice(bytes))
}

fn b256_from_row(bytes: &[u8], col: usize) -> rusqlite::Result<B256> {
    if bytes.len() != 32 {
        return Err(conversion_error(
            col,
            format!("expected 32 bytes for B256, got {}", bytes.len()),
        ));
    }
    Ok(B256::from_slice(bytes))
}
