#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use hotel_ops_backend::config::{BookingPolicy, Config};
use hotel_ops_backend::entities::booking::PaymentMethod;
use hotel_ops_backend::entities::cab;
use hotel_ops_backend::entities::room;
use hotel_ops_backend::entities::user::UserRole;
use hotel_ops_backend::services::booking::{GuestDetails, NewBooking};
use hotel_ops_backend::services::fleet::{self, NewCab, NewUser};
use hotel_ops_backend::services::notify::Notifier;
use hotel_ops_backend::services::payment::{
    GatewayError, IntentStatus, PaymentGateway, PaymentIntent,
};
use hotel_ops_backend::services::rooms::{self, NewRoom};

/// Fresh in-memory database with every migration applied. The pool holds a
/// single connection, so every test sees one database.
pub async fn setup_db() -> DatabaseConnection {
    let db = hotel_ops_backend::db::connect(&test_config())
        .await
        .expect("connect to in-memory sqlite");
    migration::Migrator::up(&db, None)
        .await
        .expect("run migrations");
    db
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        jwt_secret: "test-secret".to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        hotel_utc_offset_minutes: 0,
        cancellation_refund_percent: 70,
        gateway_base_url: None,
        gateway_secret_key: None,
        gateway_timeout_secs: 1,
        sweep_interval_secs: 60,
    }
}

pub fn policy() -> BookingPolicy {
    BookingPolicy {
        gateway_timeout: Duration::from_millis(100),
        ..BookingPolicy::default()
    }
}

/// January 2025 at the given day and hour, UTC.
pub fn jan(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, day, hour, 0, 0).unwrap()
}

pub async fn room(db: &DatabaseConnection, number: &str) -> room::Model {
    rooms::create_room(
        db,
        NewRoom {
            room_number: number.to_string(),
            room_type: "Deluxe".to_string(),
            nightly_rate: 12_000,
        },
        jan(1, 0),
    )
    .await
    .expect("create room")
}

pub fn guest() -> GuestDetails {
    GuestDetails {
        full_name: "Ada Lovelace".to_string(),
        phone: "5550100".to_string(),
        country_code: "+44".to_string(),
        email: Some("ada@example.com".to_string()),
    }
}

/// Cash booking for `total` 100 between the two instants.
pub fn stay(room_id: Uuid, check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> NewBooking {
    NewBooking {
        room_id,
        guest: guest(),
        check_in,
        check_out,
        adults: 2,
        children: 0,
        total_amount: 100,
        payment_method: PaymentMethod::Cash,
        external_payment_ref: None,
        status: None,
    }
}

pub async fn cab(db: &DatabaseConnection, registration: &str) -> cab::Model {
    fleet::create_cab(
        db,
        NewCab {
            registration: registration.to_string(),
            model: "Toyota Prius".to_string(),
            capacity: 4,
        },
        jan(1, 0),
    )
    .await
    .expect("create cab")
}

/// Driver account whose record was last touched at `since`.
pub async fn driver(db: &DatabaseConnection, name: &str, since: DateTime<Utc>) -> Uuid {
    let user = fleet::create_user(
        db,
        NewUser {
            email: format!("{}@hotel.test", name.to_lowercase()),
            name: name.to_string(),
            role: UserRole::Driver,
        },
        since,
    )
    .await
    .expect("create driver");
    user.id
}

pub async fn staff(db: &DatabaseConnection, name: &str, role: UserRole) -> Uuid {
    fleet::create_user(
        db,
        NewUser {
            email: format!("{}@hotel.test", name.to_lowercase()),
            name: name.to_string(),
            role,
        },
        jan(1, 0),
    )
    .await
    .expect("create user")
    .id
}

#[derive(Debug, Clone, Copy)]
pub enum RefundOutcome {
    Succeed,
    Reject,
    Hang,
}

/// Gateway double answering every intent lookup with a fixed status.
pub struct FakeGateway {
    pub intent_status: IntentStatus,
    pub refund_outcome: RefundOutcome,
    pub refunds: Mutex<Vec<(String, i64)>>,
}

impl FakeGateway {
    pub fn new(intent_status: IntentStatus, refund_outcome: RefundOutcome) -> Self {
        Self {
            intent_status,
            refund_outcome,
            refunds: Mutex::new(Vec::new()),
        }
    }

    pub fn refunds(&self) -> Vec<(String, i64)> {
        self.refunds.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_intent(&self, _amount: i64, _currency: &str) -> Result<PaymentIntent, GatewayError> {
        Ok(PaymentIntent {
            id: "pi_new".to_string(),
            status: IntentStatus::RequiresPaymentMethod,
            client_secret: Some("pi_new_secret".to_string()),
        })
    }

    async fn retrieve_intent(&self, intent_ref: &str) -> Result<PaymentIntent, GatewayError> {
        Ok(PaymentIntent {
            id: intent_ref.to_string(),
            status: self.intent_status,
            client_secret: None,
        })
    }

    async fn refund(&self, intent_ref: &str, amount: i64) -> Result<String, GatewayError> {
        self.refunds
            .lock()
            .unwrap()
            .push((intent_ref.to_string(), amount));

        match self.refund_outcome {
            RefundOutcome::Succeed => Ok(format!("re_{}", intent_ref)),
            RefundOutcome::Reject => Err(GatewayError::Rejected("card expired".to_string())),
            RefundOutcome::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok("re_late".to_string())
            }
        }
    }
}

/// Notifier double keeping every (user, event) pair.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(Uuid, String)>>,
}

impl RecordingNotifier {
    pub fn events_for(&self, user_id: Uuid) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, event)| event.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_user(&self, user_id: Uuid, event: &str, _payload: serde_json::Value) {
        self.sent.lock().unwrap().push((user_id, event.to_string()));
    }
}
