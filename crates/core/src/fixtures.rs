//! Model builders and mock helpers shared by the service tests.

use std::sync::Arc;

use chrono::{Duration, Utc};
use resource_db::entities::{
    chat_message, conversation, listing,
    report::{self, ReportStatus},
    user,
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Value};
use std::collections::BTreeMap;

pub fn user(id: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        email: format!("{id}@campus.edu"),
        display_name: Some(format!("User {id}")),
        photo_url: None,
        password_hash: None,
        token: Some(format!("token-{id}")),
        is_admin: false,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

pub fn admin(id: &str) -> user::Model {
    user::Model {
        is_admin: true,
        ..user(id)
    }
}

pub fn listing(id: &str, owner: &str, title: &str) -> listing::Model {
    listing::Model {
        id: id.to_string(),
        user_id: owner.to_string(),
        title: title.to_string(),
        description: "Good condition".to_string(),
        category: listing::Category::Textbooks,
        department: "Computer Science".to_string(),
        semester: 3,
        price_cents: 25_000,
        image_urls: serde_json::json!(["https://cdn.example.com/cover.jpg"]),
        is_approved: true,
        seller_name: Some(format!("User {owner}")),
        seller_avatar_url: None,
        created_at: Utc::now().into(),
    }
}

pub fn conversation(a: &str, b: &str) -> conversation::Model {
    conversation::Model {
        id: format!("{a}_{b}"),
        participant_a: a.to_string(),
        participant_b: b.to_string(),
        related_listing_id: None,
        last_message: None,
        last_message_id: None,
        last_message_at: None,
        created_at: Utc::now().into(),
    }
}

pub fn message(id: &str, conversation_id: &str, sender: &str, offset_secs: i64) -> chat_message::Model {
    chat_message::Model {
        id: id.to_string(),
        conversation_id: conversation_id.to_string(),
        sender_id: sender.to_string(),
        sender_name: Some(format!("User {sender}")),
        sender_avatar: None,
        text: format!("text of {id}"),
        created_at: (Utc::now() + Duration::seconds(offset_secs)).into(),
    }
}

pub fn report(id: &str, status: ReportStatus) -> report::Model {
    report::Model {
        id: id.to_string(),
        reporter_id: "bob".to_string(),
        listing_id: "l1".to_string(),
        reported_user_id: "alice".to_string(),
        listing_title: "Calculus".to_string(),
        reason: "Misleading photos".to_string(),
        summary: "Listing photos may not match the item.".to_string(),
        status,
        resolved_by: None,
        resolved_at: None,
        created_at: Utc::now().into(),
    }
}

pub fn mock() -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
}

pub fn conn(mock: MockDatabase) -> Arc<DatabaseConnection> {
    Arc::new(mock.into_connection())
}

/// A connection that must never be queried.
pub fn unused() -> Arc<DatabaseConnection> {
    conn(mock())
}

pub const fn exec(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

pub fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
    maplit::btreemap! { "num_items" => Value::BigInt(Some(n)) }
}

/// Number of statements the connection has executed.
pub fn statement_count(db: Arc<DatabaseConnection>) -> usize {
    Arc::try_unwrap(db)
        .map(|conn| conn.into_transaction_log().len())
        .unwrap_or(usize::MAX)
}
