use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::quotation::Quotation;

/// Persistence boundary for finished quotations.
pub trait QuotationStore: Send + Sync {
    fn save(&self, quotation: Quotation) -> AppResult<Quotation>;
    fn get(&self, quotation_id: &Uuid) -> AppResult<Option<Quotation>>;
    /// Newest first.
    fn list(&self, limit: usize) -> AppResult<Vec<Quotation>>;
}

#[derive(Debug, Default)]
pub struct InMemoryQuotationStore {
    rows: RwLock<HashMap<Uuid, Quotation>>,
}

impl InMemoryQuotationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QuotationStore for InMemoryQuotationStore {
    fn save(&self, quotation: Quotation) -> AppResult<Quotation> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        rows.insert(quotation.id, quotation.clone());
        Ok(quotation)
    }

    fn get(&self, quotation_id: &Uuid) -> AppResult<Option<Quotation>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(quotation_id).cloned())
    }

    fn list(&self, limit: usize) -> AppResult<Vec<Quotation>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        let mut items = rows.values().cloned().collect::<Vec<_>>();
        items.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.cmp(&left.id))
        });
        items.truncate(limit);
        Ok(items)
    }
}

fn poisoned() -> AppError {
    AppError::Internal("Quotation store lock poisoned".to_string())
}
