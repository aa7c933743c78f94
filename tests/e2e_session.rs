//! E2E tests for the login / home / logout flow

mod common;

use common::{TestServer, location, session_token, set_cookies};
use sessiongate::auth::SessionKeys;

#[tokio::test]
async fn test_login_page_renders() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body = response.text().await.expect("response body");
    assert!(body.contains(r#"action="/login""#));
    assert!(body.contains(r#"name="password""#));
}

#[tokio::test]
async fn test_login_with_credentials_sets_session_and_redirects_home() {
    let server = TestServer::new().await;

    let response = server.login("alice", "x").await;

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/home");

    let cookies = set_cookies(&response);
    let session_cookie = cookies
        .iter()
        .find(|c| c.starts_with("session="))
        .expect("session cookie is set");
    assert!(session_cookie.contains("Path=/"));
    assert!(!session_cookie.contains("Max-Age"));
    assert!(session_token(&response).is_some_and(|token| !token.is_empty()));
}

#[tokio::test]
async fn test_login_with_empty_username_redirects_to_login_page() {
    let server = TestServer::new().await;

    let response = server.login("", "x").await;

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/");
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_login_with_empty_password_redirects_to_login_page() {
    let server = TestServer::new().await;

    let response = server.login("alice", "").await;

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/");
    assert!(session_token(&response).is_none());
}

#[tokio::test]
async fn test_login_with_missing_fields_redirects_to_login_page() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/login"))
        .form(&[("username", "alice")])
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_login_without_body_redirects_to_login_page() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/login"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/");
    assert!(session_token(&response).is_none());
}

#[tokio::test]
async fn test_login_with_credentials_only_in_query_redirects_to_login_page() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/login?username=alice&password=x"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/");
    assert!(session_token(&response).is_none());
}

#[tokio::test]
async fn test_login_with_unparseable_body_redirects_to_login_page() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/login"))
        .header("Content-Type", "application/json")
        .body(r#"{"username":"alice","password":"x"}"#)
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/");
    assert!(session_token(&response).is_none());
}

#[tokio::test]
async fn test_login_with_oversized_username_is_rejected_visibly() {
    let server = TestServer::new().await;

    let response = server.login(&"x".repeat(5000), "x").await;

    assert_eq!(response.status(), 400);
    assert!(session_token(&response).is_none());
}

#[tokio::test]
async fn test_home_shows_username_for_session() {
    let server = TestServer::new().await;
    let token = session_token(&server.login("alice", "x").await).expect("session token");

    let response = server.home(Some(&token)).await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.expect("response body");
    assert!(body.contains("alice"));
}

#[tokio::test]
async fn test_home_escapes_username() {
    let server = TestServer::new().await;
    let token = session_token(&server.login("<script>", "x").await).expect("session token");

    let body = server.home(Some(&token)).await.text().await.unwrap();

    assert!(body.contains("&lt;script&gt;"));
    assert!(!body.contains("<script>"));
}

#[tokio::test]
async fn test_home_without_session_redirects_to_login_page() {
    let server = TestServer::new().await;

    let response = server.home(None).await;

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_home_with_tampered_session_redirects_to_login_page() {
    let server = TestServer::new().await;
    let token = session_token(&server.login("alice", "x").await).expect("session token");

    let mut tampered = token.into_bytes();
    let middle = tampered.len() / 2;
    tampered[middle] = if tampered[middle] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    let response = server.home(Some(&tampered)).await;
    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/");

    let garbage = server.home(Some("garbage")).await;
    assert_eq!(garbage.status(), 302);
    assert_eq!(location(&garbage), "/");
}

#[tokio::test]
async fn test_session_from_other_process_keys_is_rejected() {
    let issuer = TestServer::with_keys(SessionKeys::generate(true)).await;
    let verifier = TestServer::new().await;
    let token = session_token(&issuer.login("alice", "x").await).expect("session token");

    let response = verifier.home(Some(&token)).await;

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_logout_clears_session_cookie() {
    let server = TestServer::new().await;
    let token = session_token(&server.login("alice", "x").await).expect("session token");

    let response = server
        .client
        .post(server.url("/logout"))
        .header("Cookie", format!("session={token}"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/");

    let cookies = set_cookies(&response);
    let removal = cookies
        .iter()
        .find(|c| c.starts_with("session="))
        .expect("removal cookie is set");
    assert!(removal.starts_with("session=;"), "got: {removal}");
    assert!(removal.contains("Max-Age=0"), "got: {removal}");
    assert!(removal.contains("Path=/"), "got: {removal}");
}

#[tokio::test]
async fn test_logout_ends_session_in_cookie_storing_client() {
    let server = TestServer::new().await;
    let client = server.cookie_client();

    let login = client
        .post(server.url("/login"))
        .form(&[("username", "alice"), ("password", "x")])
        .send()
        .await
        .expect("login request succeeds");
    assert_eq!(location(&login), "/home");

    let home = client.get(server.url("/home")).send().await.unwrap();
    assert_eq!(home.status(), 200);
    assert!(home.text().await.unwrap().contains("alice"));

    let logout = client.post(server.url("/logout")).send().await.unwrap();
    assert_eq!(logout.status(), 302);
    assert_eq!(location(&logout), "/");

    let home = client.get(server.url("/home")).send().await.unwrap();
    assert_eq!(home.status(), 302);
    assert_eq!(location(&home), "/");
}

#[tokio::test]
async fn test_logout_without_session_still_redirects() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/logout"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/");
    assert!(session_token(&response).is_some_and(|token| token.is_empty()));
}

#[tokio::test]
async fn test_concurrent_sessions_are_independent() {
    let server = TestServer::new().await;

    let (alice, bob) = tokio::join!(server.login("alice", "a"), server.login("bob", "b"));
    let alice = session_token(&alice).expect("alice token");
    let bob = session_token(&bob).expect("bob token");

    let (alice_home, bob_home) = tokio::join!(server.home(Some(&alice)), server.home(Some(&bob)));
    let alice_body = alice_home.text().await.unwrap();
    let bob_body = bob_home.text().await.unwrap();

    assert!(alice_body.contains("alice") && !alice_body.contains("bob"));
    assert!(bob_body.contains("bob") && !bob_body.contains("alice"));
}
