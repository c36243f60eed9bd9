use std::path::Path;

use log::debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, Transaction as SqlTransaction, params};
use serde_json::Number;

use super::BlockStore;
use crate::blockchain::Block;
use crate::error::StoreError;
use crate::transaction::Transaction;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS blocks (
    block_index   INTEGER PRIMARY KEY,
    timestamp     REAL    NOT NULL,
    proof         INTEGER NOT NULL,
    previous_hash TEXT    NOT NULL
);
CREATE TABLE IF NOT EXISTS transactions (
    block_index INTEGER NOT NULL REFERENCES blocks (block_index),
    position    INTEGER NOT NULL,
    sender      TEXT    NOT NULL,
    recipient   TEXT    NOT NULL,
    amount              NOT NULL,
    PRIMARY KEY (block_index, position)
);
";

/// SQLite-backed store: one row per block, one row per transaction.
///
/// `amount` has no declared type, so integers and reals keep their storage class
/// and reload as the same JSON number.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Block rows as `(index, timestamp, proof, previous_hash)`, by index.
    pub fn block_rows(&self) -> Result<Vec<(u64, f64, u64, String)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT block_index, timestamp, proof, previous_hash FROM blocks ORDER BY block_index",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Transaction rows as `(block_index, position, tx)`, in chain order.
    pub fn transaction_rows(&self) -> Result<Vec<(u64, u64, Transaction)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT block_index, position, sender, recipient, amount FROM transactions
             ORDER BY block_index, position",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, u64>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, SqlValue>(4)?,
            ))
        })?;
        let mut out = Vec::new();
        for r in rows {
            let (block_index, position, sender, recipient, amount) = r?;
            let amount = amount_from_sql(amount).ok_or_else(|| StoreError::Corrupt {
                index: block_index,
                reason: format!("transaction {position} has a non-numeric amount"),
            })?;
            out.push((
                block_index,
                position,
                Transaction {
                    sender,
                    recipient,
                    amount,
                },
            ));
        }
        Ok(out)
    }
}

fn amount_to_sql(amount: &Number) -> SqlValue {
    match amount.as_i64() {
        Some(i) => SqlValue::Integer(i),
        None => amount.as_f64().map_or(SqlValue::Null, SqlValue::Real),
    }
}

fn amount_from_sql(value: SqlValue) -> Option<Number> {
    match value {
        SqlValue::Integer(i) => Some(Number::from(i)),
        SqlValue::Real(f) => Number::from_f64(f),
        _ => None,
    }
}

fn insert_block(tx: &SqlTransaction<'_>, block: &Block) -> Result<(), StoreError> {
    tx.execute(
        "DELETE FROM transactions WHERE block_index = ?1",
        params![block.index],
    )?;
    tx.execute(
        "INSERT OR REPLACE INTO blocks (block_index, timestamp, proof, previous_hash)
         VALUES (?1, ?2, ?3, ?4)",
        params![block.index, block.timestamp, block.proof, block.previous_hash],
    )?;
    let mut stmt = tx.prepare(
        "INSERT INTO transactions (block_index, position, sender, recipient, amount)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (position, t) in block.transactions.iter().enumerate() {
        stmt.execute(params![
            block.index,
            position as u64,
            t.sender,
            t.recipient,
            amount_to_sql(&t.amount)
        ])?;
    }
    Ok(())
}

impl BlockStore for SqliteStore {
    fn save(&mut self, block: &Block) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        insert_block(&tx, block)?;
        tx.commit()?;
        debug!(
            "STORE - saved block #{} ({} txs)",
            block.index,
            block.transactions.len()
        );
        Ok(())
    }

    fn load_all(&mut self) -> Result<Vec<Block>, StoreError> {
        let mut blocks: Vec<Block> = self
            .block_rows()?
            .into_iter()
            .map(|(index, timestamp, proof, previous_hash)| Block {
                index,
                timestamp,
                transactions: Vec::new(),
                proof,
                previous_hash,
            })
            .collect();

        // Both row sets are sorted by block index, so a single forward walk suffices.
        let mut cursor = 0;
        for (block_index, _position, t) in self.transaction_rows()? {
            while cursor < blocks.len() && blocks[cursor].index < block_index {
                cursor += 1;
            }
            match blocks.get_mut(cursor) {
                Some(block) if block.index == block_index => block.transactions.push(t),
                _ => {
                    return Err(StoreError::Corrupt {
                        index: block_index,
                        reason: "transaction references a missing block".into(),
                    });
                }
            }
        }
        Ok(blocks)
    }

    fn replace_all(&mut self, chain: &[Block]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM transactions", [])?;
        tx.execute("DELETE FROM blocks", [])?;
        for block in chain {
            insert_block(&tx, block)?;
        }
        tx.commit()?;
        debug!("STORE - rewrote chain ({} blocks)", chain.len());
        Ok(())
    }
}
