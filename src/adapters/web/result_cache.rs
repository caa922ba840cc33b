//! Recent portfolio backtest reports, kept so their downloads keep working
//! after the result fragment is rendered.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use crate::domain::backtest::BacktestReport;

#[derive(Default)]
struct Inner {
    reports: HashMap<i64, Arc<BacktestReport>>,
    order: VecDeque<i64>,
}

/// Bounded map of backtest id to report. Inserting past capacity evicts the
/// oldest insertion.
pub struct ResultCache {
    capacity: usize,
    inner: RwLock<Inner>,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store a report under its backtest id; reports without one are not
    /// cached and `None` is returned.
    pub fn insert(&self, report: BacktestReport) -> Option<i64> {
        let id = report.backtest_id?;
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if inner.reports.insert(id, Arc::new(report)).is_some() {
            inner.order.retain(|k| *k != id);
        }
        inner.order.push_back(id);
        while inner.order.len() > self.capacity {
            if let Some(old) = inner.order.pop_front() {
                inner.reports.remove(&old);
            }
        }
        Some(id)
    }

    pub fn get(&self, id: i64) -> Option<Arc<BacktestReport>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.reports.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
