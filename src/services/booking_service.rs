use crate::models::booking::{
    Booking, BookingDraft, BookingStatus, PaymentDetails, PaymentStatus, RefundStatus,
    SourceOrigin, TrainDetails,
};
use crate::models::payment::{
    ConfirmationEvent, ConfirmationSource, GatewayEvent, WebhookEventKind,
};
use crate::services::fare_service::{FareService, DEFAULT_CLASS};
use crate::services::renderer_service::TicketRenderer;
use crate::store::{BookingStore, ConfirmUpdate, StoreError};
use crate::utils::config::AppConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::signature::verify_signature;
use chrono::{NaiveDate, Utc};
use log::{error, info, warn};
use rand::Rng;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// PNR generation retries before giving up. Each attempt is checked
/// against the store and the unique index backs it up.
const MAX_PNR_ATTEMPTS: usize = 5;

/// The reconciliation core. Accepts confirmation events from both
/// delivery paths (client verify-call and gateway webhook), which may
/// race, duplicate, or arrive in either order, and guarantees exactly
/// one booking per real-world payment. The store's unique constraint
/// on the transaction id is the only concurrency primitive; a lost
/// insert race is folded into success.
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    renderer: Arc<dyn TicketRenderer>,
    gateway_name: String,
    client_secret: Option<String>,
    webhook_secret: Option<String>,
    allow_unsigned: bool,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        renderer: Arc<dyn TicketRenderer>,
        config: &AppConfig,
    ) -> Self {
        let client_secret = if config.gateway.key_secret.trim().is_empty() {
            None
        } else {
            Some(config.gateway.key_secret.clone())
        };

        BookingService {
            store,
            renderer,
            gateway_name: config.gateway.name.clone(),
            client_secret,
            webhook_secret: config.webhook_secret.clone(),
            allow_unsigned: config.allow_unsigned,
        }
    }

    /// Single idempotent reconciliation attempt. Safe to call again on
    /// any transient failure; both paths funnel through here.
    pub async fn reconcile(
        &self,
        event: ConfirmationEvent,
        context: Option<BookingDraft>,
        user_id: Option<i32>,
    ) -> AppResult<Booking> {
        self.verify_event(&event)?;

        let transaction_id = event
            .transaction_id()
            .ok_or_else(|| {
                AppError::BadRequest("confirmation carries no transaction reference".into())
            })?
            .to_string();

        if let Some(existing) = self.store.find_by_transaction_id(&transaction_id).await? {
            return self.confirm_existing(existing, &transaction_id, &event).await;
        }

        // First-seen confirmation. The client path carries the full
        // booking context; a webhook that wins the race only has the
        // metadata echoed through the gateway, which is still enough
        // to not lose a real payment.
        let template = match &context {
            Some(draft) => self.booking_from_draft(draft, user_id, &transaction_id, &event)?,
            None => self.booking_from_metadata(&transaction_id, &event),
        };

        for _ in 0..MAX_PNR_ATTEMPTS {
            let mut booking = template.clone();
            booking.pnr_number = Some(self.fresh_pnr().await?);

            match self.store.insert(booking).await {
                Ok(stored) => {
                    info!(
                        "booking {} confirmed for transaction {} (pnr {})",
                        stored.id,
                        transaction_id,
                        stored.pnr_number.as_deref().unwrap_or("-")
                    );
                    self.spawn_render(stored.clone());
                    return Ok(stored);
                }
                Err(StoreError::DuplicateTransaction) => {
                    // Lost the race to the other confirmation path.
                    info!(
                        "lost insert race for transaction {}, folding into existing booking",
                        transaction_id
                    );
                    let existing = self
                        .store
                        .find_by_transaction_id(&transaction_id)
                        .await?
                        .ok_or_else(|| {
                            AppError::Conflict(format!(
                                "transaction {} raced but no booking found",
                                transaction_id
                            ))
                        })?;
                    return self.confirm_existing(existing, &transaction_id, &event).await;
                }
                Err(StoreError::DuplicatePnr) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Conflict(
            "could not allocate a unique PNR".into(),
        ))
    }

    /// Classify and dispatch one webhook delivery. Once the signature
    /// passes everything acks, including unrecognized event types and
    /// bodies that do not parse, so the gateway gets its 2xx and stops
    /// redelivering.
    pub async fn route_webhook(&self, raw_body: &[u8], signature: &str) -> AppResult<String> {
        match self.webhook_secret.as_deref() {
            Some(secret) => {
                if !verify_signature(raw_body, signature, secret) {
                    warn!("webhook rejected: signature mismatch");
                    return Err(AppError::SignatureInvalid);
                }
            }
            None if self.allow_unsigned => {
                warn!("webhook signature check skipped (unsigned mode)");
            }
            None => return Err(AppError::SignatureInvalid),
        }

        let parsed: GatewayEvent = match serde_json::from_slice(raw_body) {
            Ok(parsed) => parsed,
            Err(e) => {
                // Authenticated but unparseable. Still ack: a non-200
                // would make the gateway redeliver the same broken
                // payload forever.
                warn!("acknowledging malformed gateway event: {}", e);
                return Ok("unknown".to_string());
            }
        };
        let kind = WebhookEventKind::from_str(&parsed.event)
            .unwrap_or_else(|_| WebhookEventKind::Unknown(parsed.event.clone()));

        match kind {
            WebhookEventKind::PaymentCaptured | WebhookEventKind::OrderPaid => {
                let event = webhook_confirmation(&parsed, raw_body, signature);
                self.reconcile(event, None, None).await?;
            }
            WebhookEventKind::PaymentFailed => {
                if let Some(gateway_ref) = payment_ref(&parsed) {
                    let updated = self
                        .store
                        .set_payment_status(&gateway_ref, PaymentStatus::Failed)
                        .await?;
                    if !updated {
                        // No booking yet, nothing to fail. Never
                        // invent one for a failed payment.
                        info!("payment.failed for {} matched no booking", gateway_ref);
                    }
                }
            }
            WebhookEventKind::PaymentAuthorized => {
                // Intermediate state only; never confirms and never
                // creates.
                if let Some(gateway_ref) = payment_ref(&parsed) {
                    self.store
                        .set_payment_status(&gateway_ref, PaymentStatus::Pending)
                        .await?;
                }
            }
            WebhookEventKind::RefundCreated => {
                self.apply_refund(&parsed, RefundStatus::Initiated).await?;
            }
            WebhookEventKind::RefundProcessed => {
                self.apply_refund(&parsed, RefundStatus::Completed).await?;
            }
            WebhookEventKind::Unknown(name) => {
                info!("ignoring unrecognized gateway event type {}", name);
            }
        }

        Ok(parsed.event)
    }

    pub async fn history(&self, user_id: i32) -> AppResult<Vec<Booking>> {
        Ok(self.store.list_for_user(user_id).await?)
    }

    pub async fn booking_for_user(&self, id: Uuid, user_id: i32) -> AppResult<Booking> {
        let booking = self
            .store
            .find_by_id(id)
            .await?
            .filter(|b| b.user_id == Some(user_id))
            .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;
        Ok(booking)
    }

    /// Render the ticket document and attach its location. Best
    /// effort: a failure is logged and the booking stays confirmed
    /// with no document ref.
    pub async fn attach_ticket_document(&self, booking: &Booking) {
        render_and_attach(
            Arc::clone(&self.store),
            Arc::clone(&self.renderer),
            booking.clone(),
        )
        .await;
    }

    fn verify_event(&self, event: &ConfirmationEvent) -> AppResult<()> {
        let secret = match event.source {
            ConfirmationSource::Client => self.client_secret.as_deref(),
            ConfirmationSource::Webhook => self.webhook_secret.as_deref(),
        };

        match secret {
            Some(secret) => {
                if verify_signature(&event.signed_payload, &event.signature, secret) {
                    Ok(())
                } else {
                    warn!(
                        "confirmation rejected: signature mismatch for order {:?} / payment {:?}",
                        event.gateway_order_id, event.gateway_payment_id
                    );
                    Err(AppError::SignatureInvalid)
                }
            }
            None if self.allow_unsigned => {
                warn!("confirmation signature check skipped (unsigned mode)");
                Ok(())
            }
            None => Err(AppError::SignatureInvalid),
        }
    }

    async fn confirm_existing(
        &self,
        existing: Booking,
        transaction_id: &str,
        event: &ConfirmationEvent,
    ) -> AppResult<Booking> {
        if existing.is_confirmed() {
            // Duplicate delivery; the first writer won. No-op success.
            info!(
                "duplicate confirmation for transaction {}, returning booking {}",
                transaction_id, existing.id
            );
            return Ok(existing);
        }

        for _ in 0..MAX_PNR_ATTEMPTS {
            let pnr = match existing.pnr_number.clone() {
                Some(pnr) => pnr,
                None => self.fresh_pnr().await?,
            };

            let update = ConfirmUpdate {
                pnr_number: pnr,
                payment_status: PaymentStatus::Successful,
                payment_date: event.received_at,
            };

            match self.store.confirm(transaction_id, update).await {
                Ok(Some(updated)) => {
                    info!(
                        "booking {} upgraded to confirmed for transaction {}",
                        updated.id, transaction_id
                    );
                    self.spawn_render(updated.clone());
                    return Ok(updated);
                }
                Ok(None) => {
                    // The other path confirmed in between; read back
                    // the settled state.
                    return self
                        .store
                        .find_by_transaction_id(transaction_id)
                        .await?
                        .ok_or_else(|| {
                            AppError::Conflict(format!(
                                "booking for transaction {} vanished mid-confirmation",
                                transaction_id
                            ))
                        });
                }
                Err(StoreError::DuplicatePnr) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Conflict(
            "could not allocate a unique PNR".into(),
        ))
    }

    fn booking_from_draft(
        &self,
        draft: &BookingDraft,
        user_id: Option<i32>,
        transaction_id: &str,
        event: &ConfirmationEvent,
    ) -> AppResult<Booking> {
        draft.validate()?;

        let quote = FareService::quote_for_draft(draft)?;
        if let Some(declared) = draft.declared_total_fare {
            if declared != quote.final_amount {
                warn!(
                    "declared fare {} does not match computed fare {} for transaction {}",
                    declared, quote.final_amount, transaction_id
                );
                return Err(AppError::ValidationError(
                    "declared fare does not match the computed fare".into(),
                ));
            }
        }

        let now = Utc::now();
        Ok(Booking {
            id: Uuid::new_v4(),
            user_id,
            train: draft.train.clone(),
            passengers: draft.passengers.clone(),
            total_fare: quote.final_amount,
            payment: PaymentDetails {
                transaction_id: transaction_id.to_string(),
                gateway_order_id: event.gateway_order_id.clone(),
                gateway: self.gateway_name.clone(),
                amount: event.amount.unwrap_or(quote.final_amount),
                currency: event.currency.clone().unwrap_or_else(|| "INR".to_string()),
                status: PaymentStatus::Successful,
                payment_date: Some(event.received_at),
            },
            status: BookingStatus::Confirmed,
            pnr_number: None,
            refund_status: None,
            source_origin: SourceOrigin::Client,
            ticket_document_ref: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Minimal booking built from gateway metadata alone, for the
    /// webhook-first case where the richer client call never arrives
    /// (e.g. browser closed right after paying). The payment is real;
    /// losing it is not an option.
    fn booking_from_metadata(&self, transaction_id: &str, event: &ConfirmationEvent) -> Booking {
        let notes = &event.notes;
        let note = |key: &str| notes.get(key).cloned().unwrap_or_default();

        let journey_date = notes
            .get("journey_date")
            .and_then(|v| NaiveDate::from_str(v).ok())
            .unwrap_or_else(|| event.received_at.date_naive());

        let now = Utc::now();
        Booking {
            id: Uuid::new_v4(),
            // No authenticated session on this path. Attaching the
            // booking to an account later is a product decision; a
            // placeholder owner is worse than none.
            user_id: notes.get("user_id").and_then(|v| v.parse().ok()),
            train: TrainDetails {
                train_id: note("train_id"),
                train_name: note("train_name"),
                train_number: note("train_number"),
                from_station: note("from_station"),
                to_station: note("to_station"),
                journey_date,
                departure_time: None,
                arrival_time: None,
                selected_class: notes
                    .get("selected_class")
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_CLASS.to_string()),
            },
            passengers: Vec::new(),
            total_fare: event.amount.unwrap_or(0),
            payment: PaymentDetails {
                transaction_id: transaction_id.to_string(),
                gateway_order_id: event.gateway_order_id.clone(),
                gateway: self.gateway_name.clone(),
                amount: event.amount.unwrap_or(0),
                currency: event.currency.clone().unwrap_or_else(|| "INR".to_string()),
                status: PaymentStatus::Successful,
                payment_date: Some(event.received_at),
            },
            status: BookingStatus::Confirmed,
            pnr_number: None,
            refund_status: None,
            source_origin: SourceOrigin::WebhookOnly,
            ticket_document_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn apply_refund(&self, parsed: &GatewayEvent, status: RefundStatus) -> AppResult<()> {
        let gateway_ref = parsed
            .payload
            .refund
            .as_ref()
            .and_then(|r| r.entity.payment_id.clone());

        if let Some(gateway_ref) = gateway_ref {
            let updated = self.store.set_refund_status(&gateway_ref, status).await?;
            if !updated {
                info!("refund event for {} matched no booking", gateway_ref);
            }
        }
        Ok(())
    }

    async fn fresh_pnr(&self) -> AppResult<String> {
        for _ in 0..MAX_PNR_ATTEMPTS {
            let pnr = random_pnr();
            if !self.store.pnr_exists(&pnr).await? {
                return Ok(pnr);
            }
        }
        Err(AppError::Conflict(
            "could not allocate a unique PNR".into(),
        ))
    }

    /// Fire-and-forget: a slow or failing renderer must never delay
    /// or fail the confirmation response. Called only on a transition
    /// into CONFIRMED, never on duplicate deliveries.
    fn spawn_render(&self, booking: Booking) {
        let store = Arc::clone(&self.store);
        let renderer = Arc::clone(&self.renderer);
        tokio::spawn(async move {
            render_and_attach(store, renderer, booking).await;
        });
    }
}

async fn render_and_attach(
    store: Arc<dyn BookingStore>,
    renderer: Arc<dyn TicketRenderer>,
    booking: Booking,
) {
    match renderer.render(&booking).await {
        Ok(doc_ref) => {
            if let Err(e) = store.set_ticket_document(booking.id, &doc_ref).await {
                warn!(
                    "ticket for booking {} rendered but not attached: {}",
                    booking.id, e
                );
            }
        }
        Err(e) => {
            // The payer's money is captured and the booking is
            // confirmed; rendering can be retried out of band.
            error!("ticket rendering failed for booking {}: {}", booking.id, e);
        }
    }
}

/// Build the reconciler event for a captured/paid webhook. The exact
/// raw body bytes are what the signature covers; re-serializing could
/// change the byte layout and break it.
fn webhook_confirmation(parsed: &GatewayEvent, raw_body: &[u8], signature: &str) -> ConfirmationEvent {
    let (order_id, payment_id, amount, currency, notes) = match (
        parsed.payload.payment.as_ref(),
        parsed.payload.order.as_ref(),
    ) {
        (Some(payment), _) => (
            payment.entity.order_id.clone(),
            Some(payment.entity.id.clone()),
            payment.entity.amount,
            payment.entity.currency.clone(),
            payment.entity.notes.clone(),
        ),
        (None, Some(order)) => (
            Some(order.entity.id.clone()),
            None,
            order.entity.amount,
            order.entity.currency.clone(),
            order.entity.notes.clone(),
        ),
        (None, None) => (None, None, None, None, Default::default()),
    };

    ConfirmationEvent {
        source: ConfirmationSource::Webhook,
        gateway_order_id: order_id,
        gateway_payment_id: payment_id,
        signature: signature.to_string(),
        signed_payload: raw_body.to_vec(),
        amount,
        currency,
        notes,
        received_at: Utc::now(),
    }
}

/// Gateway reference for status-only updates: the order id when the
/// payment entity carries one, otherwise the payment id.
fn payment_ref(parsed: &GatewayEvent) -> Option<String> {
    parsed
        .payload
        .payment
        .as_ref()
        .map(|p| p.entity.order_id.clone().unwrap_or_else(|| p.entity.id.clone()))
}

fn random_pnr() -> String {
    let mut rng = rand::thread_rng();
    let mut pnr = String::with_capacity(10);
    pnr.push(char::from(b'1' + rng.gen_range(0..9u8)));
    for _ in 0..9 {
        pnr.push(char::from(b'0' + rng.gen_range(0..10u8)));
    }
    pnr
}
