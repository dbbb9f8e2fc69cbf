//! API integration tests against a running server (open role mode)

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Unique suffix so reruns against the same database do not collide
fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, chrono::Utc::now().timestamp_micros())
}

async fn register(client: &Client, username: &str, role: &str) -> Value {
    let response = client
        .post(format!("{}/users", BASE_URL))
        .json(&json!({
            "username": username,
            "password": "s3cret",
            "full_name": format!("{} Example", username),
            "email": format!("{}@example.org", username),
            "role": role
        }))
        .send()
        .await
        .expect("Failed to send register request");

    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.expect("Failed to parse register response")
}

async fn login(client: &Client, username: &str) -> reqwest::Response {
    client
        .post(format!("{}/login", BASE_URL))
        .json(&json!({ "username": username, "password": "s3cret" }))
        .send()
        .await
        .expect("Failed to send login request")
}

async fn create_book(client: &Client, title: &str) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({ "title": title, "author": "Test Author", "genre": "Testing" }))
        .send()
        .await
        .expect("Failed to send create book request");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse book");
    assert_eq!(body["available"], true);
    body["id"].as_i64().expect("No book id")
}

async fn borrow(client: &Client, user_id: i64, book_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/loans/borrow_book", BASE_URL))
        .json(&json!({ "user_id": user_id, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send borrow request")
}

async fn get_book(client: &Client, book_id: i64) -> Value {
    client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse book")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
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
async fn test_register_and_login_user() {
    let client = Client::new();
    let username = unique("reader");

    let profile = register(&client, &username, "user").await;
    assert_eq!(profile["status"], "approved");
    assert_eq!(profile["role"], "user");

    let response = login(&client, &username).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["username"], username.as_str());
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();
    let username = unique("reader");
    register(&client, &username, "user").await;

    let response = client
        .post(format!("{}/login", BASE_URL))
        .json(&json!({ "username": username, "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_username_is_conflict() {
    let client = Client::new();
    let username = unique("twin");
    register(&client, &username, "user").await;

    let response = client
        .post(format!("{}/users", BASE_URL))
        .json(&json!({
            "username": username,
            "password": "other",
            "full_name": "Other Twin",
            "email": format!("other_{}@example.org", username)
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Username already exists");
}

#[tokio::test]
#[ignore]
async fn test_librarian_approval_flow() {
    let client = Client::new();
    let username = unique("librarian");

    let created = register(&client, &username, "librarian").await;
    assert_eq!(created["message"], "Librarian registration submitted for approval");
    assert_eq!(created["profile"]["status"], "pending");
    let id = created["profile"]["id"].as_i64().expect("No profile id");

    // Pending librarians cannot log in
    assert_eq!(login(&client, &username).await.status(), StatusCode::FORBIDDEN);

    let pending: Vec<Value> = client
        .get(format!("{}/users/applications", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert!(pending.iter().any(|p| p["id"].as_i64() == Some(id)));

    let response = client
        .post(format!("{}/users/applications/{}/approve", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    // A second decision finds nothing pending
    let response = client
        .post(format!("{}/users/applications/{}/decline", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(login(&client, &username).await.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_supplied_status_is_ignored_for_librarians() {
    let client = Client::new();
    let username = unique("eager");

    let response = client
        .post(format!("{}/users", BASE_URL))
        .json(&json!({
            "username": username,
            "password": "s3cret",
            "full_name": "Eager Applicant",
            "role": "librarian",
            "status": "approved"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["profile"]["status"], "pending");
    assert_eq!(login(&client, &username).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_declined_librarian_cannot_log_in() {
    let client = Client::new();
    let username = unique("applicant");

    let created = register(&client, &username, "librarian").await;
    let id = created["profile"]["id"].as_i64().expect("No profile id");

    let response = client
        .post(format!("{}/users/{}/decline", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let response = login(&client, &username).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(
        body["message"],
        "Your librarian registration was declined. You cannot log in."
    );
}

#[tokio::test]
#[ignore]
async fn test_promote_and_demote() {
    let client = Client::new();
    let profile = register(&client, &unique("member"), "user").await;
    let id = profile["id"].as_i64().expect("No profile id");

    let promote = |id: i64| client.patch(format!("{}/users/{}/promote", BASE_URL, id)).send();
    let demote = |id: i64| client.patch(format!("{}/users/{}/demote", BASE_URL, id)).send();

    let response = promote(id).await.expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body, json!({ "success": true, "role": "librarian" }));

    let response = promote(id).await.expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "User is already a librarian");

    let response = demote(id).await.expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let response = demote(id).await.expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_cycle() {
    let client = Client::new();
    let user = register(&client, &unique("borrower"), "user").await;
    let user_id = user["id"].as_i64().expect("No profile id");
    let book_id = create_book(&client, &unique("Cycle")).await;

    let response = borrow(&client, user_id, book_id).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Book borrowed successfully!");
    let loan_id = body["loan_id"].as_i64().expect("No loan id");

    let book = get_book(&client, book_id).await;
    assert_eq!(book["available"], false);
    assert_eq!(book["current_loan"]["id"].as_i64(), Some(loan_id));

    // The book is exclusive while the loan is active
    let response = borrow(&client, user_id, book_id).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let active: Vec<Value> = client
        .get(format!("{}/loans/borrowed_books", BASE_URL))
        .query(&[("user_id", user_id)])
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["book"]["id"].as_i64(), Some(book_id));

    let return_book = || {
        client
            .post(format!("{}/loans/return_book", BASE_URL))
            .json(&json!({ "loan_id": loan_id }))
            .send()
    };

    let response = return_book().await.expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let response = return_book().await.expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let book = get_book(&client, book_id).await;
    assert_eq!(book["available"], true);
    assert!(book["current_loan"].is_null());
    assert_eq!(book["loans"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
#[ignore]
async fn test_borrow_unknown_book_is_not_found() {
    let client = Client::new();
    let user = register(&client, &unique("seeker"), "user").await;
    let user_id = user["id"].as_i64().expect("No profile id");

    let response = borrow(&client, user_id, i32::MAX as i64).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_deleting_user_releases_books() {
    let client = Client::new();
    let user = register(&client, &unique("leaver"), "user").await;
    let user_id = user["id"].as_i64().expect("No profile id");
    let first = create_book(&client, &unique("Held")).await;
    let second = create_book(&client, &unique("Also held")).await;

    assert_eq!(borrow(&client, user_id, first).await.status(), StatusCode::CREATED);
    assert_eq!(borrow(&client, user_id, second).await.status(), StatusCode::CREATED);

    let response = client
        .delete(format!("{}/users/{}", BASE_URL, user_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["message"]
        .as_str()
        .is_some_and(|m| m.ends_with("deleted and their borrowed books returned.")));

    for book_id in [first, second] {
        let book = get_book(&client, book_id).await;
        assert_eq!(book["available"], true);
    }

    let response = client
        .get(format!("{}/users/{}", BASE_URL, user_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_book_update_and_delete() {
    let client = Client::new();
    let book_id = create_book(&client, &unique("Draft")).await;

    let response = client
        .put(format!("{}/books/{}", BASE_URL, book_id))
        .json(&json!({ "title": "Final Title" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["title"], "Final Title");
    assert_eq!(body["author"], "Test Author");

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

async fn register_with_email(client: &Client, username: &str, email: Option<&str>) -> reqwest::Response {
    let mut body = json!({
        "username": username,
        "password": "s3cret",
        "full_name": "No Mail"
    });
    if let Some(email) = email {
        body["email"] = json!(email);
    }
    client
        .post(format!("{}/users", BASE_URL))
        .json(&body)
        .send()
        .await
        .expect("Failed to send register request")
}

#[tokio::test]
#[ignore]
async fn test_profiles_without_email_do_not_collide() {
    let client = Client::new();

    for (prefix, email) in [("blank_a", Some("")), ("blank_b", Some("")), ("absent_a", None), ("absent_b", None)] {
        let response = register_with_email(&client, &unique(prefix), email).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.expect("Failed to parse response");
        assert_eq!(body["email"], "");
    }
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrows_of_one_book_yield_one_loan() {
    let client = Client::new();
    let book_id = create_book(&client, &unique("Contested")).await;

    let mut user_ids = Vec::new();
    for n in 0..20 {
        let user = register(&client, &unique(&format!("racer{}", n)), "user").await;
        user_ids.push(user["id"].as_i64().expect("No profile id"));
    }

    let handles: Vec<_> = user_ids
        .into_iter()
        .map(|user_id| {
            let client = client.clone();
            tokio::spawn(async move { borrow(&client, user_id, book_id).await.status() })
        })
        .collect();

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.expect("Borrow task panicked"));
    }

    let created = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    let conflicts = statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count();
    assert_eq!(created, 1);
    assert_eq!(conflicts, 19);

    let book = get_book(&client, book_id).await;
    assert_eq!(book["available"], false);
    assert_eq!(book["loans"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
#[ignore]
async fn test_reopening_loan_conflicts_when_book_is_held() {
    let client = Client::new();
    let first = register(&client, &unique("first"), "user").await["id"].as_i64().expect("No profile id");
    let second = register(&client, &unique("second"), "user").await["id"].as_i64().expect("No profile id");
    let book_id = create_book(&client, &unique("Shared")).await;

    let response = borrow(&client, first, book_id).await;
    let body: Value = response.json().await.expect("Failed to parse response");
    let first_loan = body["loan_id"].as_i64().expect("No loan id");

    let response = client
        .patch(format!("{}/loans/{}", BASE_URL, first_loan))
        .json(&json!({ "returned": true }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_book(&client, book_id).await["available"], true);

    assert_eq!(borrow(&client, second, book_id).await.status(), StatusCode::CREATED);

    let response = client
        .patch(format!("{}/loans/{}", BASE_URL, first_loan))
        .json(&json!({ "returned": false }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "BookNotAvailable");

    let loan: Value = client
        .get(format!("{}/loans/{}", BASE_URL, first_loan))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse loan");
    assert_eq!(loan["returned"], true);
}

#[tokio::test]
#[ignore]
async fn test_deleting_active_loan_releases_book() {
    let client = Client::new();
    let user_id = register(&client, &unique("dropper"), "user").await["id"].as_i64().expect("No profile id");
    let book_id = create_book(&client, &unique("Dropped")).await;

    let body: Value = borrow(&client, user_id, book_id)
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let loan_id = body["loan_id"].as_i64().expect("No loan id");
    assert_eq!(get_book(&client, book_id).await["available"], false);

    let response = client
        .delete(format!("{}/loans/{}", BASE_URL, loan_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let book = get_book(&client, book_id).await;
    assert_eq!(book["available"], true);
    assert!(book["current_loan"].is_null());
    assert_eq!(borrow(&client, user_id, book_id).await.status(), StatusCode::CREATED);
}
