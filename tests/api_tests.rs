//! API integration tests
//!
//! These run against a live server with a freshly migrated database seeded
//! from tests/fixtures/seed.sql:
//!
//!   psql "$DATABASE_URL" -f tests/fixtures/seed.sql
//!   cargo run &
//!   cargo test -- --ignored --test-threads=1

use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use circ_server::models::actor::{ActorClaims, ActorRole};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "change-this-secret-in-production".to_string())
}

fn token(role: ActorRole, patron_id: Option<i32>) -> String {
    let now = Utc::now();
    let claims = ActorClaims {
        sub: "test".to_string(),
        patron_id,
        role,
        exp: (now + Duration::hours(1)).timestamp(),
        iat: now.timestamp(),
    };
    claims.create_token(&jwt_secret()).expect("Failed to mint token")
}

fn staff_token() -> String {
    token(ActorRole::Staff, Some(6))
}

fn patron_token(patron_id: i32) -> String {
    token(ActorRole::Patron, Some(patron_id))
}

async fn checkout(client: &Client, tok: &str, patron_id: i32, copy_id: i32) -> reqwest::Response {
    client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(tok)
        .json(&json!({ "patron_id": patron_id, "copy_id": copy_id }))
        .send()
        .await
        .expect("Failed to send checkout request")
}

async fn return_loan(client: &Client, tok: &str, loan_id: i64) -> Value {
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .bearer_auth(tok)
        .send()
        .await
        .expect("Failed to send return request");
    assert!(response.status().is_success(), "return of loan {} failed", loan_id);
    response.json().await.expect("Failed to parse return response")
}

/// Return every open loan of a patron, so tests leave the shelf as they found it
async fn return_all(client: &Client, patron_id: i32) {
    let staff = staff_token();
    let loans: Value = client
        .get(format!("{}/patrons/{}/loans", BASE_URL, patron_id))
        .bearer_auth(&staff)
        .send()
        .await
        .expect("Failed to list loans")
        .json()
        .await
        .expect("Failed to parse loans");

    for loan in loans.as_array().expect("loans is not an array") {
        let id = loan["id"].as_i64().expect("loan id");
        return_loan(client, &staff, id).await;
    }
}

async fn cancel_hold(client: &Client, tok: &str, hold_id: i64) {
    let response = client
        .post(format!("{}/holds/{}/cancel", BASE_URL, hold_id))
        .bearer_auth(tok)
        .send()
        .await
        .expect("Failed to send cancel request");
    assert!(response.status().is_success(), "cancel of hold {} failed", hold_id);
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored --test-threads=1
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "patron_id": 1, "copy_id": 1 }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_checkout_and_return_happy_path() {
    let client = Client::new();
    let staff = staff_token();

    let response = checkout(&client, &staff, 1, 1).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    let loan = &body["loan"];
    assert_eq!(loan["patron_id"], 1);
    assert_eq!(loan["copy_id"], 1);
    assert_eq!(loan["renewal_count"], 0);
    assert!(loan["returned_date"].is_null());

    let loan_id = loan["id"].as_i64().expect("loan id");
    let returned = return_loan(&client, &staff, loan_id).await;
    assert!(returned["loan"]["returned_date"].is_string());
    // Returned on time, no fine
    assert!(returned["fine_charged"].is_null());
}

#[tokio::test]
#[ignore]
async fn test_checkout_on_loan_copy_conflicts() {
    let client = Client::new();
    let staff = staff_token();

    let response = checkout(&client, &staff, 1, 3).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["loan"]["id"].as_i64().expect("loan id");

    // Retrying on an on-loan copy always conflicts, never double-loans
    for _ in 0..2 {
        let retry = checkout(&client, &staff, 2, 3).await;
        assert_eq!(retry.status(), StatusCode::CONFLICT);
    }

    return_loan(&client, &staff, loan_id).await;
}

#[tokio::test]
#[ignore]
async fn test_patron_cannot_checkout_for_someone_else() {
    let client = Client::new();

    let response = checkout(&client, &patron_token(1), 2, 1).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_suspended_patron_is_refused() {
    let client = Client::new();

    let response = checkout(&client, &staff_token(), 3, 1).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_expired_membership_is_refused() {
    let client = Client::new();

    let response = checkout(&client, &staff_token(), 4, 1).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_not_loanable_copy_is_refused() {
    let client = Client::new();

    let response = checkout(&client, &staff_token(), 1, 12).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_loan_limit_is_enforced() {
    let client = Client::new();
    let staff = staff_token();

    // Patron 5's category allows 2 concurrent loans
    assert_eq!(checkout(&client, &staff, 5, 4).await.status(), StatusCode::CREATED);
    assert_eq!(checkout(&client, &staff, 5, 5).await.status(), StatusCode::CREATED);
    assert_eq!(checkout(&client, &staff, 5, 6).await.status(), StatusCode::FORBIDDEN);

    return_all(&client, 5).await;
}

#[tokio::test]
#[ignore]
async fn test_concurrent_checkouts_respect_the_limit() {
    let client = Client::new();
    let staff = staff_token();

    // Patron 5 (limit 2) starts with one open loan, leaving one free slot
    assert_eq!(checkout(&client, &staff, 5, 7).await.status(), StatusCode::CREATED);

    let attempts = [8, 9, 10, 11].map(|copy_id| checkout(&client, &staff, 5, copy_id));
    let responses = futures::future::join_all(attempts).await;

    let successes = responses
        .iter()
        .filter(|r| r.status() == StatusCode::CREATED)
        .count();
    let forbidden = responses
        .iter()
        .filter(|r| r.status() == StatusCode::FORBIDDEN)
        .count();

    assert_eq!(successes, 1, "exactly one concurrent checkout may win the last slot");
    assert_eq!(forbidden, 3);

    return_all(&client, 5).await;
}

#[tokio::test]
#[ignore]
async fn test_hold_promotion_follows_queue_order() {
    let client = Client::new();
    let staff = staff_token();

    // Copy 3 of work 2 goes out before anyone queues
    let response = checkout(&client, &staff, 6, 3).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["loan"]["id"].as_i64().expect("loan id");

    let hold_a: Value = client
        .post(format!("{}/holds", BASE_URL))
        .bearer_auth(&patron_token(1))
        .json(&json!({ "patron_id": 1, "work_id": 2 }))
        .send()
        .await
        .expect("Failed to place hold")
        .json()
        .await
        .expect("Failed to parse hold");
    let hold_b: Value = client
        .post(format!("{}/holds", BASE_URL))
        .bearer_auth(&patron_token(2))
        .json(&json!({ "patron_id": 2, "work_id": 2 }))
        .send()
        .await
        .expect("Failed to place hold")
        .json()
        .await
        .expect("Failed to parse hold");

    assert!(hold_a["priority"].as_i64() < hold_b["priority"].as_i64());

    // The return promotes exactly the front of the queue and reports the
    // pickup window
    let returned = return_loan(&client, &staff, loan_id).await;
    assert_eq!(returned["promoted_hold_id"], hold_a["id"]);
    assert!(returned["pickup_deadline"].is_string());

    let queue: Value = client
        .get(format!("{}/works/2/holds", BASE_URL))
        .bearer_auth(&staff)
        .send()
        .await
        .expect("Failed to fetch queue")
        .json()
        .await
        .expect("Failed to parse queue");
    let queue = queue.as_array().expect("queue is not an array");
    assert_eq!(queue[0]["status"], "ready_for_pickup");
    assert_eq!(queue[1]["status"], "pending");

    cancel_hold(&client, &staff, hold_a["id"].as_i64().unwrap()).await;
    cancel_hold(&client, &staff, hold_b["id"].as_i64().unwrap()).await;
}

#[tokio::test]
#[ignore]
async fn test_held_copy_goes_only_to_the_holder() {
    let client = Client::new();
    let staff = staff_token();

    let hold: Value = client
        .post(format!("{}/holds", BASE_URL))
        .bearer_auth(&patron_token(1))
        .json(&json!({ "patron_id": 1, "work_id": 1 }))
        .send()
        .await
        .expect("Failed to place hold")
        .json()
        .await
        .expect("Failed to parse hold");
    let hold_id = hold["id"].as_i64().expect("hold id");

    // Another patron is turned away from the held work
    let response = checkout(&client, &staff, 2, 1).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The holder checks out and their hold is fulfilled as a side effect
    let response = checkout(&client, &staff, 1, 1).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["loan"]["id"].as_i64().expect("loan id");

    let queue: Value = client
        .get(format!("{}/works/1/holds", BASE_URL))
        .bearer_auth(&staff)
        .send()
        .await
        .expect("Failed to fetch queue")
        .json()
        .await
        .expect("Failed to parse queue");
    assert!(
        !queue
            .as_array()
            .unwrap()
            .iter()
            .any(|h| h["id"].as_i64() == Some(hold_id)),
        "fulfilled hold must leave the active queue"
    );

    return_loan(&client, &staff, loan_id).await;
}

#[tokio::test]
#[ignore]
async fn test_hold_after_cancellation_gets_a_fresh_priority() {
    let client = Client::new();
    let staff = staff_token();

    let mut holds = Vec::new();
    for patron_id in [1, 2, 5] {
        let response = client
            .post(format!("{}/holds", BASE_URL))
            .bearer_auth(&staff)
            .json(&json!({ "patron_id": patron_id, "work_id": 4 }))
            .send()
            .await
            .expect("Failed to place hold");
        assert_eq!(response.status(), StatusCode::CREATED);
        holds.push(response.json::<Value>().await.expect("Failed to parse hold"));
    }
    assert_eq!(holds[2]["priority"], 3);

    // Cancelling mid-queue leaves a gap; priorities are not renumbered
    cancel_hold(&client, &staff, holds[1]["id"].as_i64().unwrap()).await;

    // The next placement must not collide with the surviving priority 3
    let response = client
        .post(format!("{}/holds", BASE_URL))
        .bearer_auth(&staff)
        .json(&json!({ "patron_id": 6, "work_id": 4 }))
        .send()
        .await
        .expect("Failed to place hold");
    assert_eq!(response.status(), StatusCode::CREATED);
    let hold: Value = response.json().await.expect("Failed to parse hold");
    assert_eq!(hold["priority"], 4);

    cancel_hold(&client, &staff, holds[0]["id"].as_i64().unwrap()).await;
    cancel_hold(&client, &staff, holds[2]["id"].as_i64().unwrap()).await;
    cancel_hold(&client, &staff, hold["id"].as_i64().unwrap()).await;
}

#[tokio::test]
#[ignore]
async fn test_ready_holder_borrows_past_the_rest_of_the_queue() {
    let client = Client::new();
    let staff = staff_token();

    // Copy 3 of work 2 goes out, then two patrons queue behind it
    let response = checkout(&client, &staff, 6, 3).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["loan"]["id"].as_i64().expect("loan id");

    for patron_id in [1, 2] {
        let response = client
            .post(format!("{}/holds", BASE_URL))
            .bearer_auth(&staff)
            .json(&json!({ "patron_id": patron_id, "work_id": 2 }))
            .send()
            .await
            .expect("Failed to place hold");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    // The return promotes patron 1's hold to ready-for-pickup
    let returned = return_loan(&client, &staff, loan_id).await;
    assert!(returned["promoted_hold_id"].is_i64());

    // Patron 2 is still behind patron 1 in the queue
    let response = checkout(&client, &staff, 2, 3).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Patron 1's own pending neighbour must not block the pickup
    let response = checkout(&client, &staff, 1, 3).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["loan"]["id"].as_i64().expect("loan id");

    // Returning again hands the queue to patron 2
    let returned = return_loan(&client, &staff, loan_id).await;
    assert!(returned["promoted_hold_id"].is_i64());

    let queue: Value = client
        .get(format!("{}/works/2/holds", BASE_URL))
        .bearer_auth(&staff)
        .send()
        .await
        .expect("Failed to fetch queue")
        .json()
        .await
        .expect("Failed to parse queue");
    let queue = queue.as_array().expect("queue is not an array");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0]["patron_id"], 2);
    assert_eq!(queue[0]["status"], "ready_for_pickup");

    cancel_hold(&client, &staff, queue[0]["id"].as_i64().unwrap()).await;
}

#[tokio::test]
#[ignore]
async fn test_duplicate_hold_conflicts() {
    let client = Client::new();
    let tok = patron_token(1);

    let response = client
        .post(format!("{}/holds", BASE_URL))
        .bearer_auth(&tok)
        .json(&json!({ "patron_id": 1, "work_id": 3 }))
        .send()
        .await
        .expect("Failed to place hold");
    assert_eq!(response.status(), StatusCode::CREATED);
    let hold: Value = response.json().await.expect("Failed to parse hold");

    let duplicate = client
        .post(format!("{}/holds", BASE_URL))
        .bearer_auth(&tok)
        .json(&json!({ "patron_id": 1, "work_id": 3 }))
        .send()
        .await
        .expect("Failed to place hold");
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    cancel_hold(&client, &tok, hold["id"].as_i64().unwrap()).await;
}

#[tokio::test]
#[ignore]
async fn test_cancel_requires_the_holder_or_staff() {
    let client = Client::new();

    let hold: Value = client
        .post(format!("{}/holds", BASE_URL))
        .bearer_auth(&patron_token(1))
        .json(&json!({ "patron_id": 1, "work_id": 4 }))
        .send()
        .await
        .expect("Failed to place hold")
        .json()
        .await
        .expect("Failed to parse hold");
    let hold_id = hold["id"].as_i64().expect("hold id");

    let response = client
        .post(format!("{}/holds/{}/cancel", BASE_URL, hold_id))
        .bearer_auth(patron_token(2))
        .send()
        .await
        .expect("Failed to send cancel");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    cancel_hold(&client, &patron_token(1), hold_id).await;
}

#[tokio::test]
#[ignore]
async fn test_renewal_compounds_and_caps() {
    let client = Client::new();
    let staff = staff_token();

    let response = checkout(&client, &staff, 2, 2).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["loan"]["id"].as_i64().expect("loan id");
    let start: chrono::DateTime<Utc> = body["loan"]["start_date"]
        .as_str()
        .unwrap()
        .parse()
        .expect("start date");

    let mut due = None;
    for _ in 0..2 {
        let response = client
            .post(format!("{}/loans/{}/renew", BASE_URL, loan_id))
            .bearer_auth(&staff)
            .send()
            .await
            .expect("Failed to renew");
        assert!(response.status().is_success());
        let body: Value = response.json().await.expect("Failed to parse response");
        due = Some(body["loan"]["due_date"].as_str().unwrap().to_string());
    }

    // 21-day period renewed twice: due date is start + 63 days
    let due: chrono::DateTime<Utc> = due.unwrap().parse().expect("due date");
    assert_eq!((due - start).num_days(), 63);

    // Default cap is two renewals
    let response = client
        .post(format!("{}/loans/{}/renew", BASE_URL, loan_id))
        .bearer_auth(&staff)
        .send()
        .await
        .expect("Failed to renew");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    return_loan(&client, &staff, loan_id).await;
}

#[tokio::test]
#[ignore]
async fn test_renewal_yields_to_queued_demand() {
    let client = Client::new();
    let staff = staff_token();

    let response = checkout(&client, &staff, 2, 4).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["loan"]["id"].as_i64().expect("loan id");

    let hold: Value = client
        .post(format!("{}/holds", BASE_URL))
        .bearer_auth(&patron_token(1))
        .json(&json!({ "patron_id": 1, "work_id": 3 }))
        .send()
        .await
        .expect("Failed to place hold")
        .json()
        .await
        .expect("Failed to parse hold");

    let response = client
        .post(format!("{}/loans/{}/renew", BASE_URL, loan_id))
        .bearer_auth(&staff)
        .send()
        .await
        .expect("Failed to renew");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    cancel_hold(&client, &staff, hold["id"].as_i64().unwrap()).await;
    return_loan(&client, &staff, loan_id).await;
}

#[tokio::test]
#[ignore]
async fn test_renewing_a_closed_loan_is_invalid() {
    let client = Client::new();
    let staff = staff_token();

    let response = checkout(&client, &staff, 1, 5).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["loan"]["id"].as_i64().expect("loan id");

    return_loan(&client, &staff, loan_id).await;

    let response = client
        .post(format!("{}/loans/{}/renew", BASE_URL, loan_id))
        .bearer_auth(&staff)
        .send()
        .await
        .expect("Failed to renew");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore]
async fn test_payment_settles_one_entry_exactly() {
    let client = Client::new();
    let staff = staff_token();

    // Seeded 5.00 overdue fine for patron 2
    let entries: Value = client
        .get(format!("{}/patrons/2/ledger", BASE_URL))
        .bearer_auth(&staff)
        .send()
        .await
        .expect("Failed to list ledger")
        .json()
        .await
        .expect("Failed to parse ledger");
    let entry = entries
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["kind"] == "overdue_fine" && e["status"] != "paid")
        .expect("seeded fine not found");
    let entry_id = entry["id"].as_i64().expect("entry id");

    // Patrons cannot record payments
    let response = client
        .post(format!("{}/ledger/{}/payments", BASE_URL, entry_id))
        .bearer_auth(patron_token(2))
        .json(&json!({ "amount": "1.00" }))
        .send()
        .await
        .expect("Failed to send payment");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Non-positive and overpaying amounts are rejected
    for amount in ["0", "-1.00", "9.99"] {
        let response = client
            .post(format!("{}/ledger/{}/payments", BASE_URL, entry_id))
            .bearer_auth(&staff)
            .json(&json!({ "amount": amount }))
            .send()
            .await
            .expect("Failed to send payment");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "amount {}", amount);
    }

    // Partial payment
    let response = client
        .post(format!("{}/ledger/{}/payments", BASE_URL, entry_id))
        .bearer_auth(&staff)
        .json(&json!({ "amount": "2.00" }))
        .send()
        .await
        .expect("Failed to send payment");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "partial");
    assert_eq!(body["outstanding"], "3.00");

    // Exact remainder settles the entry
    let response = client
        .post(format!("{}/ledger/{}/payments", BASE_URL, entry_id))
        .bearer_auth(&staff)
        .json(&json!({ "amount": "3.00" }))
        .send()
        .await
        .expect("Failed to send payment");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "paid");
    assert_eq!(body["outstanding"], "0.00");

    // Each payment left its own ledger line
    let entries: Value = client
        .get(format!("{}/patrons/2/ledger", BASE_URL))
        .bearer_auth(&staff)
        .send()
        .await
        .expect("Failed to list ledger")
        .json()
        .await
        .expect("Failed to parse ledger");
    let payments = entries
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["kind"] == "payment")
        .count();
    assert!(payments >= 2);
}

#[tokio::test]
#[ignore]
async fn test_patron_sees_only_their_own_ledger() {
    let client = Client::new();

    let response = client
        .get(format!("{}/patrons/2/ledger", BASE_URL))
        .bearer_auth(patron_token(1))
        .send()
        .await
        .expect("Failed to list ledger");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .get(format!("{}/patrons/1/ledger", BASE_URL))
        .bearer_auth(patron_token(1))
        .send()
        .await
        .expect("Failed to list ledger");
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_policy_endpoint_is_staff_only() {
    let client = Client::new();

    let response = client
        .get(format!("{}/patrons/1/policy", BASE_URL))
        .bearer_auth(patron_token(1))
        .send()
        .await
        .expect("Failed to fetch policy");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .get(format!("{}/patrons/1/policy", BASE_URL))
        .bearer_auth(staff_token())
        .send()
        .await
        .expect("Failed to fetch policy");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["max_concurrent_loans"], 5);
    assert_eq!(body["loan_period_days"], 21);
    assert_eq!(body["is_suspended"], false);
    assert_eq!(body["is_membership_expired"], false);
}
