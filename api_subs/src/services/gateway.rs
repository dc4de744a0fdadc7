use std::collections::HashMap;

use async_trait::async_trait;
use common::{
    error::{AppError, Res},
    stripe as stripe_util,
};
use serde::{Deserialize, Serialize};
use stripe::{
    CancelPaymentIntent, Client, CreatePaymentIntent, PaymentIntentCancellationReason,
    PaymentIntentId, PaymentIntentStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    MobileMoney,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Complete,
    Failed,
}

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub amount_minor_units: i64,
    pub currency: String,
    pub method: PaymentMethod,
    /// Card customer email or mobile money phone number.
    pub payer_reference: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentOutcome {
    pub status: PaymentStatus,
    pub transaction_id: String,
    /// Handed to the browser so it can finish a card payment.
    pub client_secret: Option<String>,
}

/// Whatever takes the money. Checkout and one-off purchases only see this trait.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, req: PaymentRequest) -> Res<PaymentOutcome>;

    /// Re-reads the state of a payment started by `charge`.
    async fn status(&self, transaction_id: &str) -> Res<PaymentOutcome>;

    /// Voids a payment that has not completed. Fails once the money is taken.
    async fn cancel(&self, transaction_id: &str) -> Res<()>;
}

pub struct StripeGateway {
    client: Client,
}

impl StripeGateway {
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: stripe_util::create_client(secret_key),
        }
    }

    fn outcome(intent: stripe::PaymentIntent) -> PaymentOutcome {
        let status = match intent.status {
            PaymentIntentStatus::Succeeded => PaymentStatus::Complete,
            PaymentIntentStatus::Canceled => PaymentStatus::Failed,
            _ => PaymentStatus::Pending,
        };
        PaymentOutcome {
            status,
            transaction_id: intent.id.to_string(),
            client_secret: intent.client_secret,
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn charge(&self, req: PaymentRequest) -> Res<PaymentOutcome> {
        if req.method != PaymentMethod::Card {
            return Err(AppError::BadRequest(
                "Only card payments are accepted at the moment".to_string(),
            ));
        }
        let currency = stripe_util::parse_currency(&req.currency)?;

        let mut params = CreatePaymentIntent::new(req.amount_minor_units, currency);
        params.description = Some(req.description.as_str());
        params.payment_method_types = Some(vec!["card".to_string()]);
        params.metadata = Some(HashMap::from([(
            "payer_reference".to_string(),
            req.payer_reference.clone(),
        )]));

        let intent = stripe::PaymentIntent::create(&self.client, params)
            .await
            .map_err(AppError::from)?;
        log::info!(
            "Created payment intent {} for {} {}",
            intent.id,
            req.amount_minor_units,
            req.currency
        );
        Ok(Self::outcome(intent))
    }

    async fn status(&self, transaction_id: &str) -> Res<PaymentOutcome> {
        let id = transaction_id.parse::<PaymentIntentId>().map_err(|e| {
            AppError::Internal(format!(
                "Failed to parse payment intent id: {}. {}",
                transaction_id, e
            ))
        })?;
        let intent = stripe::PaymentIntent::retrieve(&self.client, &id, &[])
            .await
            .map_err(AppError::from)?;
        Ok(Self::outcome(intent))
    }

    async fn cancel(&self, transaction_id: &str) -> Res<()> {
        let params = CancelPaymentIntent {
            cancellation_reason: Some(PaymentIntentCancellationReason::Duplicate),
        };
        let intent = stripe::PaymentIntent::cancel(&self.client, transaction_id, params)
            .await
            .map_err(AppError::from)?;
        log::info!("Cancelled payment intent {}", intent.id);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::Mutex;

    use super::*;

    /// Answers every charge with a fixed status and numbered transaction ids.
    /// Cancelled transactions read as failed afterwards.
    pub struct FakeGateway {
        status: Mutex<PaymentStatus>,
        issued: Mutex<u32>,
        cancelled: Mutex<Vec<String>>,
        fail_upstream: bool,
        refuse_cancel: bool,
    }

    impl FakeGateway {
        pub fn new(status: PaymentStatus) -> Self {
            Self {
                status: Mutex::new(status),
                issued: Mutex::new(0),
                cancelled: Mutex::new(Vec::new()),
                fail_upstream: false,
                refuse_cancel: false,
            }
        }

        pub fn unreachable() -> Self {
            Self {
                fail_upstream: true,
                ..Self::new(PaymentStatus::Pending)
            }
        }

        /// Cancellation fails as if the payment completed in the meantime.
        pub fn refusing_cancel(status: PaymentStatus) -> Self {
            Self {
                refuse_cancel: true,
                ..Self::new(status)
            }
        }

        pub fn settle(&self, status: PaymentStatus) {
            *self.status.lock().unwrap() = status;
        }

        pub fn issued(&self) -> u32 {
            *self.issued.lock().unwrap()
        }

        pub fn cancelled(&self) -> Vec<String> {
            self.cancelled.lock().unwrap().clone()
        }

        fn current(&self, transaction_id: String) -> PaymentOutcome {
            let status = if self.cancelled.lock().unwrap().contains(&transaction_id) {
                PaymentStatus::Failed
            } else {
                *self.status.lock().unwrap()
            };
            PaymentOutcome {
                status,
                transaction_id,
                client_secret: None,
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn charge(&self, _req: PaymentRequest) -> Res<PaymentOutcome> {
            if self.fail_upstream {
                return Err(AppError::Upstream("payment provider timed out".to_string()));
            }
            let issued = {
                let mut issued = self.issued.lock().unwrap();
                *issued += 1;
                *issued
            };
            Ok(self.current(format!("txn_{}", issued)))
        }

        async fn status(&self, transaction_id: &str) -> Res<PaymentOutcome> {
            Ok(self.current(transaction_id.to_string()))
        }

        async fn cancel(&self, transaction_id: &str) -> Res<()> {
            if self.refuse_cancel {
                return Err(AppError::Upstream(format!(
                    "payment {} can no longer be cancelled",
                    transaction_id
                )));
            }
            self.cancelled
                .lock()
                .unwrap()
                .push(transaction_id.to_string());
            Ok(())
        }
    }
}
