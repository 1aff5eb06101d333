//! Order notifications
//!
//! ```text
//! order handler ── Notifier::notify() ── mpsc ── NotificationWorker ── NotificationSink
//! ```
//!
//! Sending never blocks a request: a full queue drops the event with a warning.

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{Customer, Order, OrderStatus};
use std::sync::Arc;
use tokio::sync::mpsc;

const QUEUE_CAPACITY: usize = 256;

/// What happened to the order
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    Created,
    StatusChanged { from: OrderStatus, to: OrderStatus },
}

/// Event queued for delivery
#[derive(Debug, Clone)]
pub struct OrderNotification {
    pub event: OrderEvent,
    pub order_number: String,
    pub status: OrderStatus,
    pub total: Decimal,
    pub item_count: usize,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
}

impl OrderNotification {
    pub fn new(event: OrderEvent, order: &Order, customer: &Customer) -> Self {
        Self {
            event,
            order_number: order.order_number.clone(),
            status: order.status,
            total: order.total,
            item_count: order.items.len(),
            customer_name: customer.full_name(),
            customer_email: customer.email.clone(),
            customer_phone: customer.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmsMessage {
    pub to: String,
    pub text: String,
}

/// Render the customer email for an event
pub fn render_email(n: &OrderNotification) -> EmailMessage {
    let (subject, headline) = match &n.event {
        OrderEvent::Created => (
            format!("Order {} received", n.order_number),
            format!(
                "Thank you for your order. We received {} item line(s) totalling {}.",
                n.item_count, n.total
            ),
        ),
        OrderEvent::StatusChanged { to, .. } => (
            format!("Order {} is now {}", n.order_number, to),
            format!("The status of your order changed to {to}."),
        ),
    };

    EmailMessage {
        to: n.customer_email.clone(),
        subject,
        body: format!(
            "Hello {},\n\n{}\n\nOrder: {}\nStatus: {}\nTotal: {}\n\nAnthony Store",
            n.customer_name, headline, n.order_number, n.status, n.total
        ),
    }
}

/// Render the SMS text; `None` when the customer has no phone number
pub fn render_sms(n: &OrderNotification) -> Option<SmsMessage> {
    let to = n.customer_phone.clone().filter(|p| !p.trim().is_empty())?;
    let text = match &n.event {
        OrderEvent::Created => format!(
            "Anthony Store: order {} received, total {}.",
            n.order_number, n.total
        ),
        OrderEvent::StatusChanged { to: status, .. } => {
            format!("Anthony Store: order {} is now {}.", n.order_number, status)
        }
    };
    Some(SmsMessage { to, text })
}

/// Delivery channel for rendered notifications
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_email(&self, email: &EmailMessage) -> anyhow::Result<()>;
    async fn send_sms(&self, sms: &SmsMessage) -> anyhow::Result<()>;
}

/// Writes notifications to the log under `target: "notification"`
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send_email(&self, email: &EmailMessage) -> anyhow::Result<()> {
        tracing::info!(
            target: "notification",
            to = %email.to,
            subject = %email.subject,
            body = %email.body,
            "email"
        );
        Ok(())
    }

    async fn send_sms(&self, sms: &SmsMessage) -> anyhow::Result<()> {
        tracing::info!(target: "notification", to = %sms.to, text = %sms.text, "sms");
        Ok(())
    }
}

/// Producer handle, cheap to clone
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<OrderNotification>,
}

impl Notifier {
    /// Create the queue and spawn its worker on the current runtime
    pub fn spawn(sink: Arc<dyn NotificationSink>) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(NotificationWorker::new(sink).run(rx));
        Self { tx }
    }

    /// Queue an event without waiting
    pub fn notify(&self, notification: OrderNotification) {
        if let Err(e) = self.tx.try_send(notification) {
            let order_number = match &e {
                mpsc::error::TrySendError::Full(n) | mpsc::error::TrySendError::Closed(n) => {
                    n.order_number.clone()
                }
            };
            tracing::warn!(order = %order_number, error = %e, "Dropping order notification");
        }
    }
}

/// Background consumer (exits when every `Notifier` is dropped)
pub struct NotificationWorker {
    sink: Arc<dyn NotificationSink>,
}

impl NotificationWorker {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    pub async fn run(self, mut rx: mpsc::Receiver<OrderNotification>) {
        tracing::debug!("Notification worker started");

        while let Some(n) = rx.recv().await {
            let email = render_email(&n);
            if let Err(e) = self.sink.send_email(&email).await {
                tracing::error!(order = %n.order_number, error = %e, "Failed to send order email");
            }
            if let Some(sms) = render_sms(&n)
                && let Err(e) = self.sink.send_sms(&sms).await
            {
                tracing::error!(order = %n.order_number, error = %e, "Failed to send order SMS");
            }
        }

        tracing::debug!("Notification channel closed, worker stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        emails: Mutex<Vec<EmailMessage>>,
        sms: Mutex<Vec<SmsMessage>>,
    }

    #[async_trait]
    impl NotificationSink for CollectingSink {
        async fn send_email(&self, email: &EmailMessage) -> anyhow::Result<()> {
            self.emails.lock().await.push(email.clone());
            Ok(())
        }

        async fn send_sms(&self, sms: &SmsMessage) -> anyhow::Result<()> {
            self.sms.lock().await.push(sms.clone());
            Ok(())
        }
    }

    fn notification(event: OrderEvent, phone: Option<&str>) -> OrderNotification {
        OrderNotification {
            event,
            order_number: "ORD-ABCDEF0123".into(),
            status: OrderStatus::Pending,
            total: Decimal::new(4_998, 2),
            item_count: 2,
            customer_name: "Jane Doe".into(),
            customer_email: "jane@example.com".into(),
            customer_phone: phone.map(String::from),
        }
    }

    #[test]
    fn test_render_created_email() {
        let email = render_email(&notification(OrderEvent::Created, None));
        assert_eq!(email.to, "jane@example.com");
        assert_eq!(email.subject, "Order ORD-ABCDEF0123 received");
        assert!(email.body.contains("Hello Jane Doe"));
        assert!(email.body.contains("49.98"));
    }

    #[test]
    fn test_render_status_change() {
        let event = OrderEvent::StatusChanged {
            from: OrderStatus::Pending,
            to: OrderStatus::Shipped,
        };
        let email = render_email(&notification(event.clone(), Some("+34600000000")));
        assert_eq!(email.subject, "Order ORD-ABCDEF0123 is now shipped");

        let sms = render_sms(&notification(event, Some("+34600000000"))).unwrap();
        assert!(sms.text.contains("is now shipped"));
    }

    #[test]
    fn test_no_sms_without_phone() {
        assert!(render_sms(&notification(OrderEvent::Created, None)).is_none());
        assert!(render_sms(&notification(OrderEvent::Created, Some("  "))).is_none());
    }

    #[tokio::test]
    async fn test_worker_delivers_to_sink() {
        let sink = Arc::new(CollectingSink::default());
        let (tx, rx) = mpsc::channel(4);
        let worker = tokio::spawn(NotificationWorker::new(sink.clone()).run(rx));

        tx.send(notification(OrderEvent::Created, Some("+34600000000")))
            .await
            .unwrap();
        drop(tx);
        worker.await.unwrap();

        assert_eq!(sink.emails.lock().await.len(), 1);
        assert_eq!(sink.sms.lock().await.len(), 1);
    }
}
