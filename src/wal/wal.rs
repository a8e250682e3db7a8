use crate::models::payment::Payment;
use crate::models::session::Session;
use crate::models::user::User;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// WAL operation types
///
/// Operations carry full record snapshots, so replay is a plain upsert and
/// the last line for a given key wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WalOperation {
    UpsertUser { user: User },
    UpsertSession { session: Session },
    UpsertPayment { payment: Payment },
}

/// Append-only JSON-lines log backing the in-memory stores
pub struct Wal {
    file: Arc<Mutex<File>>,
    path: PathBuf,
}

impl Wal {
    pub fn new(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context("Failed to open WAL file")?;

        Ok(Wal {
            file: Arc::new(Mutex::new(file)),
            path,
        })
    }

    pub fn log_operation(&self, op: WalOperation) -> Result<()> {
        let line = serde_json::to_string(&op).context("Failed to serialize WAL operation")?;
        let mut file = self.file.lock().unwrap();
        writeln!(file, "{}", line).context("Failed to write to WAL")?;
        file.flush().context("Failed to flush WAL")?;
        Ok(())
    }

    pub fn replay(&self) -> Result<Vec<WalOperation>> {
        let file = File::open(&self.path).context("Failed to open WAL for replay")?;
        let reader = BufReader::new(file);
        let mut operations = Vec::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result.context("Failed to read line from WAL")?;
            let line = line.trim();

            // Skip empty lines
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<WalOperation>(line) {
                Ok(op) => operations.push(op),
                Err(e) => {
                    tracing::warn!(
                        line_num = line_num + 1,
                        error = %e,
                        "Failed to parse WAL line, skipping"
                    );
                }
            }
        }

        Ok(operations)
    }

    pub fn truncate(&self) -> Result<()> {
        let mut file = self.file.lock().unwrap();
        file.set_len(0).context("Failed to truncate WAL")?;
        file.flush().context("Failed to flush WAL after truncate")?;
        Ok(())
    }
}
