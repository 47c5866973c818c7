use std::sync::Arc;

use api_compiler::handlers::{FnHandler, HandlerError};
use api_compiler::middleware::rate_limit::{
    FixedWindow, KeyBy, MemoryStore, RateLimitConfig, RateLimitMiddleware, RateLimitStore,
    WindowDecision,
};
use api_compiler::middleware::MiddlewareChain;
use api_compiler::request::ApiRequest;
use api_compiler::response::success_response;
use hyper::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn test_concurrent_hits_never_exceed_limit() {
    let store = Arc::new(MemoryStore::new());
    let window = FixedWindow::new(60_000, 10);
    let now = 1_000_000;

    let mut tasks = Vec::new();
    for _ in 0..50 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store.hit("shared", &window, now).await
        }));
    }

    let mut allowed = 0;
    for task in tasks {
        if matches!(task.await.unwrap(), WindowDecision::Allowed { .. }) {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 10);
    assert_eq!(store.get("shared").await.unwrap().count, 10);
}

#[tokio::test]
async fn test_window_expiry_resets_counter() {
    let store = MemoryStore::new();
    let window = FixedWindow::new(1_000, 1);

    assert!(matches!(
        store.hit("k", &window, 0).await,
        WindowDecision::Allowed { remaining: 0, reset_at: 1_000 }
    ));
    assert_eq!(
        store.hit("k", &window, 500).await,
        WindowDecision::Limited { reset_at: 1_000 }
    );
    assert!(matches!(
        store.hit("k", &window, 1_000).await,
        WindowDecision::Allowed { reset_at: 2_000, .. }
    ));

    store.hit("other", &window, 1_500).await;
    assert_eq!(store.purge_expired(5_000).await, 2);
    assert_eq!(store.len().await, 0);
}

#[tokio::test]
async fn test_header_key() {
    let config = RateLimitConfig {
        window_ms: 60_000,
        max_requests: 1,
        key_by: KeyBy::Header("x-api-key".to_string()),
    };

    let mut chain = MiddlewareChain::new(Arc::new(FnHandler::new(|_req: ApiRequest| async {
        Ok::<_, HandlerError>(success_response(StatusCode::OK, json!({})))
    })));
    chain.add(RateLimitMiddleware::new(config));

    let request = |key: &str| ApiRequest::new(Method::GET, "/").with_header("x-api-key", key);

    assert_eq!(chain.handle(request("a")).await.status(), StatusCode::OK);
    assert_eq!(chain.handle(request("b")).await.status(), StatusCode::OK);

    let limited = chain.handle(request("a")).await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().contains_key("retry-after"));
}
