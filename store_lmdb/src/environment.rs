//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::{LmdbChainStore, LmdbError};

/// Default memory map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

const MAX_DBS: u32 = 8;

const BLOCKS_DB: &str = "blocks";
const ENTRIES_DB: &str = "entries";
const VALIDATED_DB: &str = "validated";
const CONFIRMED_DB: &str = "confirmed";

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    path: PathBuf,
    pub(crate) blocks_db: Database<Bytes, Bytes>,
    pub(crate) entries_db: Database<Bytes, Bytes>,
    pub(crate) validated_db: Database<Bytes, Bytes>,
    pub(crate) confirmed_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given directory.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per directory by this
        // process and never memory-mapped elsewhere.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let blocks_db = env.create_database(&mut wtxn, Some(BLOCKS_DB))?;
        let entries_db = env.create_database(&mut wtxn, Some(ENTRIES_DB))?;
        let validated_db = env.create_database(&mut wtxn, Some(VALIDATED_DB))?;
        let confirmed_db = env.create_database(&mut wtxn, Some(CONFIRMED_DB))?;
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env: Arc::new(env),
            path: path.to_path_buf(),
            blocks_db,
            entries_db,
            validated_db,
            confirmed_db,
        })
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A handle implementing every store trait over this environment.
    pub fn chain_store(&self) -> LmdbChainStore {
        LmdbChainStore {
            env: Arc::clone(&self.env),
            blocks_db: self.blocks_db,
            entries_db: self.entries_db,
            validated_db: self.validated_db,
            confirmed_db: self.confirmed_db,
        }
    }
}
