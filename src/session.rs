use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::LoadError;
use crate::order_loader::load_orders_from_bytes;
use crate::order_record::OrderRecord;

/// Hex SHA-1 of the uploaded bytes; identical uploads share a fingerprint.
pub fn file_fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Per-session memo of parsed uploads for long-lived hosts that answer many
/// queries over the same files. The pipeline itself stays cache-free; this is
/// the only place loaded order sets are kept around.
#[derive(Debug, Default)]
pub struct DashboardSession {
    loaded: HashMap<String, Arc<[OrderRecord]>>,
}

impl DashboardSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failed loads are not remembered, so a corrected re-upload is parsed again.
    pub fn load(&mut self, bytes: &[u8]) -> Result<Arc<[OrderRecord]>, LoadError> {
        let key = file_fingerprint(bytes);
        if let Some(orders) = self.loaded.get(&key) {
            log::debug!("order file cache hit {key}");
            return Ok(Arc::clone(orders));
        }
        log::debug!("order file cache miss {key}");
        let orders: Arc<[OrderRecord]> = load_orders_from_bytes(bytes)?.into();
        self.loaded.insert(key, Arc::clone(&orders));
        Ok(orders)
    }

    pub fn cached_files(&self) -> usize {
        self.loaded.len()
    }

    pub fn clear(&mut self) {
        self.loaded.clear();
    }
}
