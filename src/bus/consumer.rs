//! Bus consumer translating finding events into table invalidations.

use super::event::{AlertEvent, AlertEventKind};
use super::registry::BusConsumer;
use crate::service::TableHandle;

/// Translates finding change events into row invalidation requests.
///
/// Lifecycle: created and subscribed once when a live table is built, and
/// unsubscribed exactly once when the table's reset drops the subscription
/// guard; after that no further events reach it.
///
/// Events arrive on the publishing thread. The handle's dispatch path
/// checks for the owning context itself: on-context deliveries run the
/// invalidation directly, off-context deliveries are re-submitted to the
/// owner thread and return immediately, a single non-recursive hop.
pub struct AlertEventConsumer {
    table: TableHandle,
}

impl AlertEventConsumer {
    pub fn new(table: TableHandle) -> Self {
        Self { table }
    }
}

impl BusConsumer for AlertEventConsumer {
    fn event_received(&self, event: &AlertEvent) {
        match event.kind {
            AlertEventKind::FindingAdded
            | AlertEventKind::FindingChanged
            | AlertEventKind::FindingRemoved => match event.record_id {
                Some(id) => self.table.invalidate(id),
                // The wire contract says single-finding events carry the id;
                // fall back to a bulk refresh when one does not.
                None => {
                    log::warn!("finding event without record id, refreshing all rows");
                    self.table.invalidate_all();
                }
            },
            AlertEventKind::AllFindingsRemoved | AlertEventKind::Unknown => {
                self.table.invalidate_all();
            }
        }
    }
}
