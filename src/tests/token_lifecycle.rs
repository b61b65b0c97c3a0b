#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::Method::POST;
    use httpmock::MockServer;
    use tempfile::tempdir;

    use crate::cache::token_manager::TokenManager;
    use crate::config::service::ApiConfig;
    use crate::error::AuthError;
    use crate::helpers::time::now_i64;
    use crate::sources::oauth2::{GrantType, OAuth2Source};
    use crate::tests::common::{
        account, build_reqwest_client_with_timeout, persist_token, storage_paths, token_body, token_manager,
        token_manager_with_client, token_store, TOKEN_PATH,
    };

    #[tokio::test]
    async fn valid_persisted_token_needs_no_network() {
        let server = MockServer::start_async().await;
        let any_grant = server
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH);
                then.status(200).json_body(token_body("fresh", "fresh-refresh", 3600));
            })
            .await;

        let dir = tempdir().unwrap();
        let store = token_store(&dir);
        persist_token(&store, "persisted", "persisted-refresh", 3600, 10).await;

        let manager = token_manager(&server, store);
        let token = manager.acquire_token().await.unwrap();

        assert_eq!(token.access_token, "persisted");
        assert_eq!(any_grant.hits_async().await, 0);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_persisted() {
        let server = MockServer::start_async().await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(TOKEN_PATH)
                    .form_urlencoded_tuple("grant_type", "refresh_token")
                    .form_urlencoded_tuple("refresh_token", "old-refresh")
                    .form_urlencoded_tuple("client_id", "client-id")
                    .form_urlencoded_tuple("client_secret", "client-secret");
                then.status(200).json_body(token_body("refreshed", "new-refresh", 3600));
            })
            .await;
        let password = server
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH).form_urlencoded_tuple("grant_type", "password");
                then.status(200).json_body(token_body("password", "password-refresh", 3600));
            })
            .await;

        let dir = tempdir().unwrap();
        let store = token_store(&dir);
        persist_token(&store, "old", "old-refresh", 3600, 4000).await;

        let manager = token_manager(&server, store.clone());
        let token = manager.acquire_token().await.unwrap();

        assert_eq!(token.access_token, "refreshed");
        assert_eq!(refresh.hits_async().await, 1);
        assert_eq!(password.hits_async().await, 0);

        let persisted = store.load().await.expect("refreshed token persisted");
        assert_eq!(persisted.token.access_token, "refreshed");
        assert_eq!(persisted.token.refresh_token, "new-refresh");
        assert!((now_i64() - persisted.issued_at_unix_ts).abs() <= 2);
    }

    #[tokio::test]
    async fn token_inside_safety_margin_is_not_reused() {
        let server = MockServer::start_async().await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH).form_urlencoded_tuple("grant_type", "refresh_token");
                then.status(200).json_body(token_body("refreshed", "new-refresh", 3600));
            })
            .await;

        let dir = tempdir().unwrap();
        let store = token_store(&dir);
        // 3600 - 3550 = 50s left, less than the 60s margin
        persist_token(&store, "almost-expired", "old-refresh", 3600, 3550).await;

        let manager = token_manager(&server, store);
        let token = manager.acquire_token().await.unwrap();

        assert_eq!(token.access_token, "refreshed");
        assert_eq!(refresh.hits_async().await, 1);
    }

    #[tokio::test]
    async fn refresh_failure_falls_back_to_password_grant() {
        let server = MockServer::start_async().await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH).form_urlencoded_tuple("grant_type", "refresh_token");
                then.status(400).json_body(serde_json::json!({"error": "invalid_grant"}));
            })
            .await;
        let password = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(TOKEN_PATH)
                    .form_urlencoded_tuple("grant_type", "password")
                    .form_urlencoded_tuple("username", "user@example.com")
                    .form_urlencoded_tuple("password", "hunter2");
                then.status(200).json_body(token_body("password", "password-refresh", 3600));
            })
            .await;

        let dir = tempdir().unwrap();
        let store = token_store(&dir);
        persist_token(&store, "old", "revoked-refresh", 3600, 7200).await;

        let manager = token_manager(&server, store);
        let token = manager.acquire_token().await.unwrap();

        assert_eq!(token.access_token, "password");
        assert_eq!(refresh.hits_async().await, 1);
        assert_eq!(password.hits_async().await, 1);
    }

    #[tokio::test]
    async fn both_grants_failing_is_an_auth_error() {
        let server = MockServer::start_async().await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH).form_urlencoded_tuple("grant_type", "refresh_token");
                then.status(401);
            })
            .await;
        let password = server
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH).form_urlencoded_tuple("grant_type", "password");
                then.status(401);
            })
            .await;

        let dir = tempdir().unwrap();
        let store = token_store(&dir);
        persist_token(&store, "old", "revoked-refresh", 3600, 7200).await;

        let manager = token_manager(&server, store.clone());
        let err = manager.acquire_token().await.unwrap_err();

        match err {
            AuthError::Rejected { grant, status } => {
                assert_eq!(grant, GrantType::Password);
                assert_eq!(status, 401);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(refresh.hits_async().await, 1);
        assert_eq!(password.hits_async().await, 1);

        // the stale token is left untouched
        let persisted = store.load().await.unwrap();
        assert_eq!(persisted.token.access_token, "old");
    }

    #[tokio::test]
    async fn missing_token_uses_password_grant_and_writes_both_files() {
        let server = MockServer::start_async().await;
        let password = server
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH).form_urlencoded_tuple("grant_type", "password");
                then.status(200).json_body(token_body("first", "first-refresh", 3600));
            })
            .await;

        let dir = tempdir().unwrap();
        let manager = token_manager(&server, token_store(&dir));
        let token = manager.acquire_token().await.unwrap();
        assert_eq!(token.access_token, "first");
        assert_eq!(password.hits_async().await, 1);

        let (token_path, birth_path) = storage_paths(&dir);
        let body: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&token_path).unwrap()).unwrap();
        assert_eq!(body["access_token"], "first");
        assert_eq!(body["token_type"], "bearer");

        let birth: i64 = std::fs::read_to_string(&birth_path).unwrap().trim().parse().unwrap();
        assert!((now_i64() - birth).abs() <= 2);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&token_path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        // second call is served from disk
        let again = manager.acquire_token().await.unwrap();
        assert_eq!(again.access_token, "first");
        assert_eq!(password.hits_async().await, 1);
    }

    #[tokio::test]
    async fn token_body_without_birth_is_ignored() {
        let server = MockServer::start_async().await;
        let password = server
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH).form_urlencoded_tuple("grant_type", "password");
                then.status(200).json_body(token_body("fresh", "fresh-refresh", 3600));
            })
            .await;

        let dir = tempdir().unwrap();
        let (token_path, _) = storage_paths(&dir);
        std::fs::write(&token_path, token_body("orphan", "orphan-refresh", 3600).to_string()).unwrap();

        let store = token_store(&dir);
        assert!(store.load().await.is_none());

        let manager = token_manager(&server, store);
        assert_eq!(manager.access_token().await.unwrap(), "fresh");
        assert_eq!(password.hits_async().await, 1);
    }

    #[tokio::test]
    async fn persist_then_load_keeps_values_and_window() {
        let dir = tempdir().unwrap();
        let store = token_store(&dir);
        persist_token(&store, "access", "refresh", 3600, 100).await;

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.token.access_token, "access");
        assert_eq!(loaded.token.refresh_token, "refresh");
        assert_eq!(loaded.token.expires_in, 3600);

        let now = now_i64();
        assert_eq!(loaded.valid_until(60), loaded.issued_at_unix_ts + 3540);
        assert!(loaded.is_valid_at(now, 60));
        assert!(!loaded.is_valid_at(loaded.issued_at_unix_ts + 3540, 60));
    }

    #[tokio::test]
    async fn malformed_grant_response_is_an_auth_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH);
                then.status(200).body("<html>login</html>");
            })
            .await;

        let dir = tempdir().unwrap();
        let manager = token_manager(&server, token_store(&dir));
        let err = manager.acquire_token().await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedResponse(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_acquisitions_exchange_once() {
        let server = MockServer::start_async().await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH).form_urlencoded_tuple("grant_type", "refresh_token");
                then.status(200)
                    .delay(Duration::from_millis(200))
                    .json_body(token_body("refreshed", "new-refresh", 3600));
            })
            .await;
        let password = server
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH).form_urlencoded_tuple("grant_type", "password");
                then.status(200).json_body(token_body("password", "password-refresh", 3600));
            })
            .await;

        let dir = tempdir().unwrap();
        let store = token_store(&dir);
        persist_token(&store, "old", "old-refresh", 3600, 4000).await;
        let manager = token_manager(&server, store);

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.access_token().await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "refreshed");
        }

        assert_eq!(refresh.hits_async().await, 1);
        assert_eq!(password.hits_async().await, 0);
    }

    #[tokio::test]
    async fn refresh_timeout_falls_back_to_password_grant() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH).form_urlencoded_tuple("grant_type", "refresh_token");
                then.status(200)
                    .delay(Duration::from_millis(1500))
                    .json_body(token_body("too-late", "too-late-refresh", 3600));
            })
            .await;
        let password = server
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH).form_urlencoded_tuple("grant_type", "password");
                then.status(200).json_body(token_body("password", "password-refresh", 3600));
            })
            .await;

        let dir = tempdir().unwrap();
        let store = token_store(&dir);
        persist_token(&store, "old", "old-refresh", 3600, 7200).await;

        let client = build_reqwest_client_with_timeout(Duration::from_millis(300));
        let manager = token_manager_with_client(&server, store.clone(), client);
        let token = manager.acquire_token().await.unwrap();

        assert_eq!(token.access_token, "password");
        assert_eq!(password.hits_async().await, 1);
        assert_eq!(store.load().await.unwrap().token.access_token, "password");
    }

    #[tokio::test]
    async fn unreachable_authorization_endpoint_is_a_network_error() {
        // a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let api = ApiConfig { base_url: format!("http://127.0.0.1:{}", port), token_path: TOKEN_PATH.to_string() };
        let oauth2 = OAuth2Source::new(build_reqwest_client_with_timeout(Duration::from_secs(2)), &api, account());
        let dir = tempdir().unwrap();
        let manager = TokenManager::new(token_store(&dir), oauth2, 60);

        let err = manager.acquire_token().await.unwrap_err();
        assert!(matches!(err, AuthError::Network(_)));
    }
}
