//! Invoice number generation.
//!
//! Invoice numbers are human-facing and bucketed by day: `YYYYMMDD-N` where
//! `N` comes from counting the orders created that day. The whole algorithm
//! can be replaced end-to-end by a subscriber stopping the
//! `Order.createInvoiceNumber` event with its own number.

use chrono::NaiveDate;

use crate::db::OrderStore;
use crate::error::OrderError;
use crate::events::{OrderEvent, OrderEventBus};
use crate::models::OrderRecord;

/// Produces day-bucketed invoice numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvoiceNumberGenerator;

impl InvoiceNumberGenerator {
    /// Generate the invoice number for a freshly persisted order.
    ///
    /// Publishes `Order.createInvoiceNumber` first; if a subscriber stops the
    /// event with a string result, that result is returned verbatim and the
    /// counting algorithm never runs.
    ///
    /// # Errors
    ///
    /// A failed counting query propagates as a hard failure: an order must
    /// never end up with a missing or duplicate invoice number.
    pub async fn next(
        &self,
        store: &dyn OrderStore,
        bus: &OrderEventBus,
        order: &OrderRecord,
        day: NaiveDate,
    ) -> Result<String, OrderError> {
        let mut payload = serde_json::to_value(order).map_err(|source| OrderError::Payload {
            event: OrderEvent::CreateInvoiceNumber,
            source,
        })?;
        let outcome = bus.publish(OrderEvent::CreateInvoiceNumber, &mut payload)?;
        if outcome.stopped
            && let Some(result) = outcome.result
            && let Some(number) = result.as_str()
        {
            return Ok(number.to_owned());
        }

        let count = store.count_orders_on(day).await?;
        // The count includes the row being numbered. A day's sequence
        // therefore runs 1, 3, 4, 5, ... - kept for continuity with numbers
        // already issued.
        let increment = if count == 1 { count } else { count + 1 };

        Ok(format!("{}-{increment}", day.format("%Y%m%d")))
    }

    /// Generate a number past every suffix already assigned for the day.
    ///
    /// The count-based algorithm in [`Self::next`] includes unnumbered rows,
    /// so after a lost race it would reproduce the exact number that just
    /// collided. This variant looks at what is actually assigned instead.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn next_free(
        &self,
        store: &dyn OrderStore,
        day: NaiveDate,
    ) -> Result<String, OrderError> {
        let taken = store.max_invoice_suffix_on(day).await?;
        let increment = taken.map_or(1, |suffix| suffix + 1);
        Ok(format!("{}-{increment}", day.format("%Y%m%d")))
    }
}
