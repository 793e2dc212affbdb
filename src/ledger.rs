// src/ledger.rs
//! Delivery ledger: the persisted set of announcement keys that were already
//! pushed. Append-only file, one 64-char hex key per line, fully loaded into
//! memory at startup. Keys are never removed.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

#[derive(Debug)]
pub struct SentLedger {
    keys: HashSet<String>,
    // None = in-memory instance (tests); nothing is persisted.
    file: Option<File>,
    path: Option<PathBuf>,
}

fn is_valid_key(line: &str) -> bool {
    line.len() == 64 && line.chars().all(|c| c.is_ascii_hexdigit())
}

impl SentLedger {
    /// Open (creating if missing) the append-only history file and load every
    /// parseable key. Malformed lines are warned about and skipped; failing
    /// to open the file for append is fatal.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating ledger dir {}", parent.display()))?;
            }
        }

        let mut keys = HashSet::new();
        if path.exists() {
            let reader = BufReader::new(
                File::open(path)
                    .with_context(|| format!("reading ledger {}", path.display()))?,
            );
            let mut malformed = 0usize;
            for line in reader.lines() {
                // A torn trailing record after a crash is a warning, not fatal.
                let line = match line {
                    Ok(l) => l,
                    Err(e) => {
                        warn!(error = ?e, "unreadable ledger line, stopping load here");
                        break;
                    }
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if is_valid_key(trimmed) {
                    keys.insert(trimmed.to_string());
                } else {
                    malformed += 1;
                }
            }
            if malformed > 0 {
                warn!(malformed, path = %path.display(), "skipped malformed ledger lines");
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening ledger {} for append", path.display()))?;

        info!(loaded = keys.len(), path = %path.display(), "delivery ledger loaded");
        Ok(Self {
            keys,
            file: Some(file),
            path: Some(path.to_path_buf()),
        })
    }

    /// Fileless instance with an isolated lifecycle, for tests.
    pub fn in_memory() -> Self {
        Self {
            keys: HashSet::new(),
            file: None,
            path: None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Append one key and flush before returning, so a just-delivered item is
    /// never lost to a crash. Recording a key already present is a no-op.
    pub fn record(&mut self, key: &str) -> Result<()> {
        if self.keys.contains(key) {
            return Ok(());
        }
        self.append_line(key)?;
        self.keys.insert(key.to_string());
        Ok(())
    }

    /// First-run bulk insert: mark a batch of keys as delivered without
    /// notifying anyone. Returns how many keys were actually new.
    pub fn bootstrap<I, S>(&mut self, keys: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0usize;
        for key in keys {
            let key = key.as_ref();
            if !self.keys.contains(key) {
                self.append_line(key)?;
                self.keys.insert(key.to_string());
                added += 1;
            }
        }
        info!(added, total = self.keys.len(), "ledger bootstrapped");
        Ok(added)
    }

    fn append_line(&mut self, key: &str) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            let path = self.path.as_deref().unwrap_or_else(|| Path::new("?"));
            writeln!(file, "{key}")
                .with_context(|| format!("appending to ledger {}", path.display()))?;
            file.sync_data()
                .with_context(|| format!("flushing ledger {}", path.display()))?;
        }
        Ok(())
    }
}
