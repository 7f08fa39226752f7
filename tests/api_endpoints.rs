//! Integration tests for fundledger API endpoints
//!
//! These tests drive the real router end-to-end: campaign creation,
//! donation confirmation through the dev gateway, and the ledger audit
//! endpoints.

use axum_test::TestServer;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;

use fundledger::api::{build_api_router, ApiNode};
use fundledger::config::Config;
use fundledger::node::{Node, NodeState};
use fundledger::payment::{DevGateway, PaymentGateway, SharedSecretGateway};
use fundledger::persistence::InMemoryStore;

async fn test_server(gateway: Box<dyn PaymentGateway>) -> TestServer {
    let node = Node::from_parts(Config::default(), Box::new(InMemoryStore::new()), gateway)
        .expect("Failed to build node");
    *node.state.write().await = NodeState::Ready;

    let api_node = Arc::new(ApiNode::new(Arc::new(node)));
    TestServer::new(build_api_router(api_node)).expect("Failed to create test server")
}

#[tokio::test]
async fn test_dashboard_endpoints() {
    let server = test_server(Box::new(DevGateway)).await;

    // Test /api/health
    let response = server.get("/api/health").await;
    assert_eq!(response.status_code(), 200);
    let health: Value = response.json();
    assert_eq!(health["status"], "healthy");
    assert!(health["timestamp"].is_string());

    // Test /api/ledger/height - genesis only
    let response = server.get("/api/ledger/height").await;
    assert_eq!(response.status_code(), 200);
    let height: u64 = response.json();
    assert_eq!(height, 1);

    // Test /api/ledger/verify on a fresh chain
    let response = server.get("/api/ledger/verify").await;
    assert_eq!(response.status_code(), 200);
    let verdict: Value = response.json();
    assert_eq!(verdict["valid"], true);
    assert_eq!(verdict["height"], 1);

    // Test /api/ledger/transactions - genesis is never exported
    let response = server.get("/api/ledger/transactions").await;
    assert_eq!(response.status_code(), 200);
    let entries: Vec<Value> = response.json();
    assert!(entries.is_empty());

    // Test /api/campaigns - empty listing
    let response = server.get("/api/campaigns").await;
    assert_eq!(response.status_code(), 200);
    let listing: Value = response.json();
    assert_eq!(listing["count"], 0);

    // Test /api/stats
    let response = server.get("/api/stats").await;
    assert_eq!(response.status_code(), 200);
    let stats: Value = response.json();
    assert!(stats["total_requests"].is_number());
    assert!(stats["successful_requests"].is_number());
    assert!(stats["failed_requests"].is_number());
    assert!(stats["campaigns_created"].is_number());
    assert!(stats["donations_confirmed"].is_number());
    assert!(stats["uptime_seconds"].is_number());
}

#[tokio::test]
async fn test_campaign_lifecycle() {
    let server = test_server(Box::new(DevGateway)).await;

    // Create a campaign
    let response = server
        .post("/api/campaigns")
        .json(&json!({
            "title": "Cardiac surgery for Ravi",
            "description": "Condition: congenital heart defect",
            "amount_needed": 500_000u64
        }))
        .await;
    assert_eq!(response.status_code(), 200);
    let campaign: Value = response.json();
    assert_eq!(campaign["id"], 1);
    assert_eq!(campaign["amount_raised"], 0);

    // Fetch it back
    let response = server.get("/api/campaigns/1").await;
    assert_eq!(response.status_code(), 200);
    let fetched: Value = response.json();
    assert_eq!(fetched["title"], "Cardiac surgery for Ravi");

    // Unknown campaign is a 404
    let response = server.get("/api/campaigns/999").await;
    assert_eq!(response.status_code(), 404);
    let error: Value = response.json();
    assert!(error["error"].is_string());

    // Invalid creation input is a 400
    let response = server
        .post("/api/campaigns")
        .json(&json!({
            "title": "",
            "description": "x",
            "amount_needed": 100u64
        }))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_donation_confirmation_appends_to_ledger() {
    let server = test_server(Box::new(DevGateway)).await;

    server
        .post("/api/campaigns")
        .json(&json!({
            "title": "Dialysis support",
            "description": "Condition: chronic kidney disease",
            "amount_needed": 300_000u64
        }))
        .await;

    // Confirm two donations
    let response = server
        .post("/api/donations/confirm")
        .json(&json!({
            "payment_id": "pay_001",
            "campaign_id": 1,
            "amount": 10_000u64,
            "donor_name": "Asha Rao"
        }))
        .await;
    assert_eq!(response.status_code(), 200);
    let first: Value = response.json();
    let first_hash = first["block_hash"].as_str().unwrap().to_string();
    assert_eq!(first_hash.len(), 64);
    assert_eq!(first["donation"]["block_hash"], first_hash.as_str());

    let response = server
        .post("/api/donations/confirm")
        .json(&json!({
            "payment_id": "pay_002",
            "campaign_id": 1,
            "amount": 25_000u64
        }))
        .await;
    assert_eq!(response.status_code(), 200);
    let second: Value = response.json();
    // Missing donor name falls back to the anonymous label
    assert_eq!(second["donation"]["donor_name"], "Anonymous");

    // Ledger export shows exactly the two donations, in order
    let response = server.get("/api/ledger/transactions").await;
    let entries: Vec<Value> = response.json();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["transaction"]["payment_id"], "pay_001");
    assert_eq!(entries[1]["transaction"]["payment_id"], "pay_002");
    assert_eq!(entries[0]["hash"], first_hash.as_str());

    // Chain is genesis + 2 and verifies
    let height: u64 = server.get("/api/ledger/height").await.json();
    assert_eq!(height, 3);
    let verdict: Value = server.get("/api/ledger/verify").await.json();
    assert_eq!(verdict["valid"], true);

    // Campaign total was bumped atomically with the donation rows
    let campaign: Value = server.get("/api/campaigns/1").await.json();
    assert_eq!(campaign["amount_raised"], 35_000);
    let donations: Value = server.get("/api/campaigns/1/donations").await.json();
    assert_eq!(donations["count"], 2);

    // Stats saw the confirmations
    let stats: Value = server.get("/api/stats").await.json();
    assert_eq!(stats["donations_confirmed"], 2);

    // Donation to a missing campaign never reaches the ledger
    let response = server
        .post("/api/donations/confirm")
        .json(&json!({
            "payment_id": "pay_404",
            "campaign_id": 99,
            "amount": 100u64
        }))
        .await;
    assert_eq!(response.status_code(), 404);
    let height: u64 = server.get("/api/ledger/height").await.json();
    assert_eq!(height, 3);
}

#[tokio::test]
async fn test_signature_checked_confirmation() {
    let secret = "gateway_test_secret";
    let server = test_server(Box::new(SharedSecretGateway::new(secret.to_string()))).await;

    server
        .post("/api/campaigns")
        .json(&json!({
            "title": "Physiotherapy fund",
            "description": "Condition: spinal injury",
            "amount_needed": 120_000u64
        }))
        .await;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(b"order_7|pay_signed");
    let signature = hex::encode(mac.finalize().into_bytes());

    // A correctly signed receipt is accepted
    let response = server
        .post("/api/donations/confirm")
        .json(&json!({
            "payment_id": "pay_signed",
            "order_id": "order_7",
            "signature": signature,
            "campaign_id": 1,
            "amount": 5_000u64,
            "donor_name": "Vikram"
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    // A bad signature is rejected before the ledger is touched
    let response = server
        .post("/api/donations/confirm")
        .json(&json!({
            "payment_id": "pay_forged",
            "order_id": "order_7",
            "signature": "00".repeat(32),
            "campaign_id": 1,
            "amount": 5_000u64
        }))
        .await;
    assert_eq!(response.status_code(), 402);

    let height: u64 = server.get("/api/ledger/height").await.json();
    assert_eq!(height, 2);
}
