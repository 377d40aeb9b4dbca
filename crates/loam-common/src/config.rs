//! Configuration structures for LoamDB.

use crate::{LoamError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a LoamDB database instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the database file.
    pub path: PathBuf,
    /// Buffer pool capacity in pages.
    pub buffer_pool_capacity: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./loam.db"),
            buffer_pool_capacity: 64,
        }
    }
}

impl DatabaseConfig {
    /// Checks that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_pool_capacity == 0 {
            return Err(LoamError::InvalidParameter {
                name: "buffer_pool_capacity".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}
