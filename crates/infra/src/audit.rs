//! Independent verification of a ledger.
//!
//! Rebuilds every product from its events alone and compares the result with
//! what the Product Store holds, on top of re-checking the log's hash chain.

use serde::Serialize;

use supplychain_core::{LedgerResult, ProductId};
use supplychain_products::{LifecycleEvent, ProductView, replay};

use crate::clock::Clock;
use crate::event_log::{EventLog, verify_chain};
use crate::ledger::Ledger;
use crate::product_store::ProductStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// The log's sequence numbers or hash links do not verify.
    Chain,
    /// A product's events do not form a legal lifecycle.
    Replay,
    /// Replayed record differs from the stored record.
    Mismatch,
    /// Events reference a product id the ledger never committed.
    Orphan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditFinding {
    pub kind: FindingKind,
    pub product_id: Option<ProductId>,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub products_checked: u64,
    pub events_checked: u64,
    pub findings: Vec<AuditFinding>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Verify `ledger` end to end.
///
/// Only a failure to *read* the ledger is an error; anything wrong with its
/// contents is reported as a finding.
pub fn verify_ledger<S, L, C>(ledger: &Ledger<S, L, C>) -> LedgerResult<AuditReport>
where
    S: ProductStore,
    L: EventLog,
    C: Clock,
{
    let mut findings = Vec::new();

    let count = ledger.count();
    let all = ledger.event_log().read_all()?;
    if let Err(err) = verify_chain(&all) {
        findings.push(AuditFinding {
            kind: FindingKind::Chain,
            product_id: None,
            detail: err.to_string(),
        });
    }

    for stored in all.iter().filter(|e| e.product_id().value() >= count) {
        findings.push(AuditFinding {
            kind: FindingKind::Orphan,
            product_id: Some(stored.product_id()),
            detail: format!("log entry {} has no committed product", stored.sequence_number),
        });
    }

    for i in 0..count {
        let id = ProductId::new(i);
        let (record, stored) = ledger.history(id)?;
        let events: Vec<LifecycleEvent> = stored.into_iter().map(|e| e.event).collect();

        match replay(id, &events) {
            Ok(replayed) if replayed == record => {}
            Ok(replayed) => findings.push(AuditFinding {
                kind: FindingKind::Mismatch,
                product_id: Some(id),
                detail: describe_mismatch(&ProductView::from(&record), &ProductView::from(&replayed)),
            }),
            Err(err) => findings.push(AuditFinding {
                kind: FindingKind::Replay,
                product_id: Some(id),
                detail: err.to_string(),
            }),
        }
    }

    Ok(AuditReport {
        products_checked: count,
        events_checked: all.len() as u64,
        findings,
    })
}

fn describe_mismatch(stored: &ProductView, replayed: &ProductView) -> String {
    format!(
        "store has {} owned by {}, events replay to {} owned by {}",
        stored.state_label, stored.owner, replayed.state_label, replayed.owner
    )
}
