//! Client notifications.
//!
//! Messages are sent after the triggering write has committed. Delivery is best
//! effort: a failing sender is logged and otherwise ignored so that it can never
//! undo or fail the registration, booking or sale that caused it.

use crate::{
    entities::{client, examination, sales},
    errors::Result,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Outbound channel for client messages (SMS gateway, email bridge, ...).
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Delivers `message` to `phone_number`.
    async fn send(&self, phone_number: &str, message: &str) -> Result<()>;
}

/// Sender that only writes the message to the log.
///
/// Used when no delivery gateway is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSender;

#[async_trait]
impl MessageSender for LogSender {
    async fn send(&self, phone_number: &str, message: &str) -> Result<()> {
        info!(phone_number, message, "Sending client message");
        Ok(())
    }
}

/// Builds client messages and hands them to a [`MessageSender`].
#[derive(Clone)]
pub struct Notifier {
    sender: Arc<dyn MessageSender>,
    clinic_name: String,
}

impl Notifier {
    /// Creates a notifier that signs welcome messages with `clinic_name`.
    pub fn new(sender: Arc<dyn MessageSender>, clinic_name: impl Into<String>) -> Self {
        Self {
            sender,
            clinic_name: clinic_name.into(),
        }
    }

    /// Notifier backed by [`LogSender`].
    #[must_use]
    pub fn logging(clinic_name: &str) -> Self {
        Self::new(Arc::new(LogSender), clinic_name)
    }

    /// Welcome message for a newly registered client.
    pub async fn client_registered(&self, client: &client::Model) {
        let message = format!(
            "Hello {}, welcome to {}! We are glad to have you.",
            client.first_name, self.clinic_name
        );
        self.dispatch(&client.phone_number, &message).await;
    }

    /// Booking confirmation for a new examination.
    pub async fn examination_booked(&self, client: &client::Model, exam: &examination::Model) {
        let message = format!(
            "Hello {}, your examination is booked for {}.",
            client.first_name, exam.examination_date
        );
        self.dispatch(&client.phone_number, &message).await;
    }

    /// Order confirmation with the total and outstanding balance.
    pub async fn order_placed(&self, client: &client::Model, sale: &sales::Model) {
        let message = format!(
            "Hello {}, your order has been placed. Total: {:.2}, Balance: {:.2}. Payment method: {}.",
            client.first_name,
            sale.total_price,
            sale.balance_due,
            sale.payment_method.as_str()
        );
        self.dispatch(&client.phone_number, &message).await;
    }

    /// Payment status update after a sale changes.
    pub async fn payment_updated(&self, client: &client::Model, sale: &sales::Model) {
        let message = if sale.balance_due <= 0.0 {
            format!(
                "Thank you {} for your payment. Your order is now complete.",
                client.first_name
            )
        } else {
            format!(
                "Hello {}, your order payment status is now: {}. Balance Due: {:.2}.",
                client.first_name,
                sale.order_paid.label(),
                sale.balance_due
            )
        };
        self.dispatch(&client.phone_number, &message).await;
    }

    async fn dispatch(&self, phone_number: &str, message: &str) {
        if let Err(e) = self.sender.send(phone_number, message).await {
            warn!(phone_number, error = %e, "Client notification failed");
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("clinic_name", &self.clinic_name)
            .finish_non_exhaustive()
    }
}
