//! # Fiscal Notification Hook
//!
//! Fire-and-forget notifications emitted after a sale commits or is
//! cancelled. The engine never waits on or fails because of a notifier;
//! fiscal integrations (printers, tax authority uploads) live behind this
//! trait in the calling application.

use tracing::debug;

use tally_core::Sale;

/// Receiver for committed/cancelled sale notifications.
///
/// Implementations must not block: the engine calls these synchronously on
/// its own task after the store writes are done, so long-running work should
/// be queued or spawned by the implementation.
pub trait FiscalNotifier: Send + Sync {
    /// A sale was fully committed.
    fn sale_committed(&self, sale: &Sale);

    /// A completed sale was cancelled and its ledger effects undone.
    fn sale_cancelled(&self, sale: &Sale);
}

/// Default notifier: logs and does nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFiscal;

impl FiscalNotifier for NoopFiscal {
    fn sale_committed(&self, sale: &Sale) {
        debug!(sale_id = %sale.id, number = %sale.number, "Fiscal notify: sale committed");
    }

    fn sale_cancelled(&self, sale: &Sale) {
        debug!(sale_id = %sale.id, number = %sale.number, "Fiscal notify: sale cancelled");
    }
}
