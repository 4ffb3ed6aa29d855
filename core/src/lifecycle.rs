// mapofus/src/lifecycle.rs

//! The order-status state machine.
//!
//! Every mutation goes through [`set_status`], which writes the canonical
//! [`OrderStatus`] and its legacy [`PaymentStatus`] mirror together. Nothing
//! here touches storage; callers load an order, apply a transition and persist
//! the result.

use crate::error::{MapError, MapResult};
use crate::model::{Order, OrderStatus, PaymentStatus};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Statuses from which an owner may no longer submit an invoice.
pub const INVOICE_BLOCKED: [OrderStatus; 5] = [
  OrderStatus::InvoiceSubmitted,
  OrderStatus::PaymentVerifying,
  OrderStatus::PaymentConfirmed,
  OrderStatus::ReadyForDownload,
  OrderStatus::Completed,
];

/// The only legacy `status` value admins may still send.
const LEGACY_PAID: &str = "completed";

/// Download permission. Either signal is sufficient on its own.
pub fn is_download_eligible(order: &Order) -> bool {
  order.order_status.is_paid() || order.payment_status == PaymentStatus::Completed
}

/// Unpaid, non-cancelled orders count toward the free quota.
pub fn counts_against_quota(order: &Order) -> bool {
  !is_download_eligible(order) && order.order_status != OrderStatus::Cancelled
}

fn set_status(order: &mut Order, status: OrderStatus, now: DateTime<Utc>) {
  order.order_status = status;
  order.payment_status = PaymentStatus::mirror_of(status);
  order.updated_at = now;
}

/// `pending -> invoice_submitted`.
///
/// The invoice number is expected to be validated and checked for uniqueness
/// by the caller. Orders already paid through the legacy flag are refused so
/// the transition cannot clear their download right.
pub fn submit_invoice(order: &mut Order, invoice_number: &str, now: DateTime<Utc>) -> MapResult<()> {
  if is_download_eligible(order) {
    return Err(MapError::validation("Payment has already been processed for this order"));
  }
  if INVOICE_BLOCKED.contains(&order.order_status) {
    return Err(MapError::validation("An invoice has already been submitted for this order"));
  }
  if order.order_status != OrderStatus::Pending {
    return Err(MapError::validation(format!(
      "Cannot submit an invoice for an order in status '{}'",
      order.order_status
    )));
  }
  order.invoice_number = Some(invoice_number.to_string());
  order.invoice_submitted_at = Some(now);
  set_status(order, OrderStatus::InvoiceSubmitted, now);
  Ok(())
}

/// An admin's requested change to an order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminUpdate {
  pub order_status: Option<OrderStatus>,
  /// Pre-migration clients send a bare `status` string instead.
  pub legacy_status: Option<String>,
  pub admin_notes: Option<String>,
}

impl AdminUpdate {
  pub fn is_empty(&self) -> bool {
    self.order_status.is_none() && self.legacy_status.is_none() && self.admin_notes.is_none()
  }

  fn target(&self) -> MapResult<Option<OrderStatus>> {
    if let Some(status) = self.order_status {
      return Ok(Some(status));
    }
    match self.legacy_status.as_deref() {
      None => Ok(None),
      Some(LEGACY_PAID) => Ok(Some(OrderStatus::PaymentConfirmed)),
      Some(other) => Err(MapError::invalid_field("status", format!("Unsupported legacy status '{other}'"))),
    }
  }
}

/// Whether an admin may move an order from `from` to `to`.
pub fn admin_transition_allowed(from: OrderStatus, to: OrderStatus) -> bool {
  use OrderStatus::*;
  match to {
    PaymentVerifying => from == InvoiceSubmitted,
    PaymentConfirmed => matches!(from, Pending | InvoiceSubmitted | PaymentVerifying | PaymentRejected),
    PaymentRejected | Cancelled => true,
    Pending | InvoiceSubmitted | ReadyForDownload | Completed => false,
  }
}

/// Applies an admin update in place.
///
/// Reaching `payment_confirmed` never leaves the order there: it is rewritten
/// to `ready_for_download` with the verifier stamped.
pub fn apply_admin_update(order: &mut Order, update: &AdminUpdate, admin_id: Uuid, now: DateTime<Utc>) -> MapResult<()> {
  if update.is_empty() {
    return Err(MapError::validation("Nothing to update"));
  }

  if let Some(target) = update.target()? {
    if !admin_transition_allowed(order.order_status, target) {
      return Err(MapError::invalid_field(
        "order_status",
        format!("Cannot move order from '{}' to '{}'", order.order_status, target),
      ));
    }
    if target == OrderStatus::PaymentConfirmed {
      order.payment_verified_at = Some(now);
      order.payment_verified_by = Some(admin_id);
      set_status(order, OrderStatus::ReadyForDownload, now);
    } else {
      set_status(order, target, now);
    }
  }

  if let Some(notes) = &update.admin_notes {
    order.admin_notes = Some(notes.clone());
    order.updated_at = now;
  }
  Ok(())
}

/// Marks the first successful download. Returns whether anything changed.
pub fn record_download(order: &mut Order, now: DateTime<Utc>) -> bool {
  let mut changed = false;
  if order.order_status == OrderStatus::ReadyForDownload {
    set_status(order, OrderStatus::Completed, now);
    changed = true;
  }
  if order.downloaded_at.is_none() {
    order.downloaded_at = Some(now);
    order.updated_at = now;
    changed = true;
  }
  changed
}
