//! Frames, signs, and sends actions to the venue; decodes framed receipts;
//! manages the session lifecycle and the local order tracker. The venue
//! exposes no order-query endpoint, so every place/cancel call is the only
//! chance to keep the tracker an accurate reflection of what is resting.

mod actions;
mod error;
mod frame;
mod receipt;
mod session;
mod tracker;

pub use error::{ExchangeError, Result};
pub use receipt::Receipt;
pub use session::{LiveSession, SessionState};
pub use tracker::{Order, OrderState, OrderTracker, Side};

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use log::{info, warn};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use signer::{EphemeralKey, IdentityKey};
use tokio::sync::Mutex;

use actions::Action;

const PRICE_SCALE: i64 = 100_000_000; // 10^-8 units

fn to_ticks(value: Decimal) -> i64 {
    (value * Decimal::from(PRICE_SCALE)).round().to_i64().unwrap_or(0)
}

fn from_ticks(ticks: i64) -> Decimal {
    Decimal::from(ticks) / Decimal::from(PRICE_SCALE)
}

pub struct ExchangeClient {
    http: reqwest::Client,
    base_url: String,
    identity: IdentityKey,
    session: Mutex<SessionState>,
    tracker: Mutex<OrderTracker>,
    renew_before: Duration,
}

impl ExchangeClient {
    pub fn new(base_url: String, identity: IdentityKey, timeout: StdDuration, renew_before: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url,
            identity,
            session: Mutex::new(SessionState::default()),
            tracker: Mutex::new(OrderTracker::new()),
            renew_before,
        }
    }

    pub fn tracker(&self) -> &Mutex<OrderTracker> {
        &self.tracker
    }

    /// Idempotent: no-op if a valid, non-near-expiry session exists.
    pub async fn ensure_session(&self) -> Result<()> {
        let should_create = {
            let state = self.session.lock().await;
            match &*state {
                SessionState::Live(live) => live.is_near_expiry(Utc::now(), self.renew_before),
                _ => true,
            }
        };
        if should_create {
            self.create_session().await?;
        }
        Ok(())
    }

    async fn create_session(&self) -> Result<()> {
        {
            let mut state = self.session.lock().await;
            *state = match std::mem::take(&mut *state) {
                SessionState::Live(live) => SessionState::Expiring(live),
                _ => SessionState::Creating,
            };
        }

        let ephemeral = EphemeralKey::generate();
        let payload = serde_json::to_vec(&Action::CreateSession {
            public_key: hex::encode(ephemeral.public_key_bytes()),
        })?;
        let frame = frame::build_user_signed_frame(&payload, &self.identity);
        let body = self.post_raw(&frame).await?;
        let receipt = frame::check_receipt(frame::parse_receipt(&body)?)?;

        match receipt {
            Receipt::SessionCreated {
                session_id,
                expires_in_seconds,
            } => {
                let expiry = Utc::now() + Duration::seconds(expires_in_seconds);
                info!("session {} created, expires at {}", session_id, expiry);
                let mut state = self.session.lock().await;
                *state = SessionState::Live(LiveSession {
                    session_id,
                    ephemeral,
                    expiry,
                });
                Ok(())
            }
            other => Err(ExchangeError::AuthFailure(format!(
                "unexpected receipt for create_session: {other:?}"
            ))),
        }
    }

    async fn invalidate_session(&self) {
        let mut state = self.session.lock().await;
        *state = SessionState::None;
    }

    async fn post_raw(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let resp = self
            .http
            .post(format!("{}/api/v1/action", self.base_url))
            .body(bytes.to_vec())
            .send()
            .await?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn send_session_signed(&self, payload: &[u8]) -> Result<Receipt> {
        let frame = {
            let state = self.session.lock().await;
            match state.live() {
                Some(live) => frame::build_session_signed_frame(payload, &live.ephemeral),
                None => return Err(ExchangeError::NoSession),
            }
        };
        let body = self.post_raw(&frame).await?;
        frame::check_receipt(frame::parse_receipt(&body)?)
    }

    /// Sends a session-signed action, retrying once on `SessionExpired` per
    /// the session state machine. A second expiry within the same tick is a
    /// hard failure for the tick.
    async fn send_session_signed_retrying(&self, build_payload: impl Fn() -> Vec<u8>) -> Result<Receipt> {
        self.ensure_session().await?;
        match self.send_session_signed(&build_payload()).await {
            Err(ExchangeError::SessionExpired) => {
                warn!("session expired mid-tick, invalidating and retrying once");
                self.invalidate_session().await;
                self.ensure_session().await?;
                match self.send_session_signed(&build_payload()).await {
                    Err(ExchangeError::SessionExpired) => Err(ExchangeError::RepeatedExpiry),
                    other => other,
                }
            }
            other => other,
        }
    }

    async fn allocate_client_order_id(&self) -> u32 {
        loop {
            let micros = Utc::now().timestamp_micros().max(0) as u64;
            let id = (micros % ((1u64 << 31) - 1)) as u32;
            let tracker = self.tracker.lock().await;
            if !tracker.contains(id) {
                return id;
            }
            drop(tracker);
            tokio::time::sleep(StdDuration::from_micros(1)).await;
        }
    }

    pub async fn place_order(&self, market_id: u32, side: Side, price: Decimal, size: Decimal) -> Result<u32> {
        self.ensure_session().await?;
        let client_order_id = self.allocate_client_order_id().await;
        let price_ticks = to_ticks(price);
        let signed_size = match side {
            Side::Buy => to_ticks(size),
            Side::Sell => -to_ticks(size),
        };

        let build = move || {
            serde_json::to_vec(&Action::PlaceOrder {
                market_id,
                client_order_id,
                price: price_ticks,
                size: signed_size,
                post_only: true,
            })
            .expect("place_order action always serializes")
        };

        let receipt = self.send_session_signed_retrying(build).await?;
        match receipt {
            Receipt::OrderPlaced { client_order_id } => {
                let mut tracker = self.tracker.lock().await;
                tracker.add(Order {
                    client_order_id,
                    market_id,
                    side,
                    price,
                    size,
                    submitted_at: Utc::now(),
                    state: OrderState::Open,
                });
                Ok(client_order_id)
            }
            other => Err(ExchangeError::AuthFailure(format!(
                "unexpected receipt for place_order: {other:?}"
            ))),
        }
    }

    /// On success or `OrderNotFound`, removes the id from the tracker;
    /// `OrderNotFound` is swallowed because the order may have just filled.
    pub async fn cancel_order(&self, order_id: u32) -> Result<()> {
        self.ensure_session().await?;

        let market_id = {
            let tracker = self.tracker.lock().await;
            tracker
                .list_open()
                .find(|o| o.client_order_id == order_id)
                .map(|o| o.market_id)
        };
        let Some(market_id) = market_id else {
            return Ok(());
        };

        let build = move || {
            serde_json::to_vec(&Action::CancelOrder {
                market_id,
                client_order_id: order_id,
            })
            .expect("cancel_order action always serializes")
        };

        match self.send_session_signed_retrying(build).await {
            Ok(Receipt::OrderCancelled { .. }) => {
                let mut tracker = self.tracker.lock().await;
                tracker.remove(order_id);
                Ok(())
            }
            Err(ExchangeError::OrderNotFound) => {
                let mut tracker = self.tracker.lock().await;
                tracker.remove(order_id);
                Ok(())
            }
            Ok(other) => Err(ExchangeError::AuthFailure(format!(
                "unexpected receipt for cancel_order: {other:?}"
            ))),
            Err(e) => Err(e),
        }
    }

    pub async fn cancel_all_orders(&self, market_id: u32) -> Result<()> {
        self.ensure_session().await?;
        let build = move || {
            serde_json::to_vec(&Action::CancelAllOrders { market_id }).expect("cancel_all_orders action always serializes")
        };
        self.send_session_signed_retrying(build).await?;

        let mut tracker = self.tracker.lock().await;
        let open_ids: Vec<u32> = tracker.list_open().map(|o| o.client_order_id).collect();
        for id in open_ids {
            tracker.remove(id);
        }
        Ok(())
    }

    pub async fn get_top_of_book(&self, market_id: u32) -> Result<(Decimal, Decimal)> {
        self.ensure_session().await?;
        let build = move || {
            serde_json::to_vec(&Action::GetOrderBookHead { market_id }).expect("get_order_book_head action always serializes")
        };
        match self.send_session_signed_retrying(build).await? {
            Receipt::TopOfBook { best_bid, best_ask } => Ok((from_ticks(best_bid), from_ticks(best_ask))),
            other => Err(ExchangeError::AuthFailure(format!(
                "unexpected receipt for get_top_of_book: {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_identity() -> IdentityKey {
        IdentityKey::from_bytes(&[3u8; 32]).unwrap()
    }

    fn receipt_body(json: serde_json::Value) -> Vec<u8> {
        let bytes = serde_json::to_vec(&json).unwrap();
        varint::encode_len_prefixed(&bytes)
    }

    fn session_created_body(expires_in_seconds: i64) -> Vec<u8> {
        receipt_body(serde_json::json!({
            "kind": "session_created",
            "session_id": "sess-1",
            "expires_in_seconds": expires_in_seconds,
        }))
    }

    #[tokio::test]
    async fn ensure_session_twice_performs_one_network_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/action")
            .with_status(200)
            .with_body(session_created_body(3600))
            .expect(1)
            .create_async()
            .await;

        let client = ExchangeClient::new(
            server.url(),
            test_identity(),
            StdDuration::from_secs(10),
            Duration::minutes(5),
        );

        client.ensure_session().await.unwrap();
        client.ensure_session().await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn place_order_records_order_in_tracker() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/action")
            .with_status(200)
            .with_body(session_created_body(3600))
            .create_async()
            .await;

        let client = ExchangeClient::new(
            server.url(),
            test_identity(),
            StdDuration::from_secs(10),
            Duration::minutes(5),
        );
        client.ensure_session().await.unwrap();

        server
            .mock("POST", "/api/v1/action")
            .with_status(200)
            .with_body(receipt_body(serde_json::json!({
                "kind": "order_placed",
                "client_order_id": 42,
            })))
            .create_async()
            .await;

        let id = client
            .place_order(1, Side::Buy, "70000".parse().unwrap(), "0.001".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(id, 42);

        let tracker = client.tracker().lock().await;
        assert!(tracker.contains(42));
    }

    #[tokio::test]
    async fn cancel_order_swallows_order_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/action")
            .with_status(200)
            .with_body(session_created_body(3600))
            .create_async()
            .await;

        let client = ExchangeClient::new(
            server.url(),
            test_identity(),
            StdDuration::from_secs(10),
            Duration::minutes(5),
        );
        client.ensure_session().await.unwrap();

        client
            .tracker()
            .lock()
            .await
            .add(Order {
                client_order_id: 7,
                market_id: 1,
                side: Side::Sell,
                price: "70010".parse().unwrap(),
                size: "0.001".parse().unwrap(),
                submitted_at: Utc::now(),
                state: OrderState::Open,
            });

        server
            .mock("POST", "/api/v1/action")
            .with_status(200)
            .with_body(receipt_body(serde_json::json!({ "kind": "order_not_found" })))
            .create_async()
            .await;

        client.cancel_order(7).await.unwrap();
        assert!(!client.tracker().lock().await.contains(7));
    }
}
