//! Exchange-counting tests for the login-required retry policy

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, ResponseBody};
use bytes::Bytes;
use core_auth::{AuthInterceptor, FnCredentialProvider, SharedToken};
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn reply(parts: &[&'static [u8]]) -> Vec<Bytes> {
    parts.iter().map(|p| Bytes::from_static(p)).collect()
}

/// Replays canned bodies, chunked, and records every request it sees
struct ScriptedTransport {
    replies: Mutex<VecDeque<Vec<Bytes>>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    fn new(replies: Vec<Vec<Bytes>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn exchanges(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn authorization(&self, index: usize) -> Option<String> {
        self.seen.lock().unwrap()[index]
            .authorization()
            .map(str::to_string)
    }
}

#[async_trait]
impl HttpClient for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.seen.lock().unwrap().push(request);
        let chunks = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected exchange");
        let body = stream::iter(
            chunks
                .into_iter()
                .map(Ok::<_, std::io::Error>),
        )
        .boxed();
        Ok(HttpResponse::new(200, ResponseBody::from_stream(body, None)))
    }
}

#[tokio::test]
async fn login_required_causes_exactly_two_exchanges() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        reply(&[b"{\"result\"", b": 1000, \"error\": \"Log in required.\"}"]),
        reply(&[b"{\"result\": 0, \"email\": \"a@b.c\"}"]),
    ]));
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let credentials = FnCredentialProvider::new(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move { Ok(Some(if n == 0 { "expired" } else { "refreshed" }.to_string())) }
    });
    let interceptor = AuthInterceptor::new(transport.clone(), Arc::new(credentials));

    let response = interceptor
        .execute(HttpRequest::get("https://api.pcloud.com/userinfo"))
        .await
        .unwrap();

    assert_eq!(transport.exchanges(), 2);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(transport.authorization(0).as_deref(), Some("Bearer expired"));
    assert_eq!(transport.authorization(1).as_deref(), Some("Bearer refreshed"));
    assert_eq!(
        response.text().await.unwrap(),
        "{\"result\": 0, \"email\": \"a@b.c\"}"
    );
}

#[tokio::test]
async fn successful_reply_causes_one_exchange_and_keeps_body_intact() {
    let transport = Arc::new(ScriptedTransport::new(vec![reply(&[
        b"{\"res",
        b"ult\": 0, ",
        b"\"metadata\": {\"name\": \"a.txt\"}}",
    ])]));
    let interceptor = AuthInterceptor::new(transport.clone(), Arc::new(SharedToken::new("t")));

    let response = interceptor
        .execute(HttpRequest::get("https://api.pcloud.com/stat?fileid=1"))
        .await
        .unwrap();

    assert_eq!(transport.exchanges(), 1);
    assert_eq!(transport.authorization(0).as_deref(), Some("Bearer t"));
    assert_eq!(
        response.text().await.unwrap(),
        "{\"result\": 0, \"metadata\": {\"name\": \"a.txt\"}}"
    );
}

#[tokio::test]
async fn binary_body_is_not_mistaken_for_login_required() {
    let transport = Arc::new(ScriptedTransport::new(vec![reply(&[b"\x89PNG\r\n\x1a\n", b"rest"])]));
    let interceptor = AuthInterceptor::new(transport.clone(), Arc::new(SharedToken::anonymous()));

    let response = interceptor
        .execute(HttpRequest::get("https://c1.pcloud.com/dl/file.png"))
        .await
        .unwrap();

    assert_eq!(transport.exchanges(), 1);
    assert_eq!(transport.authorization(0), None);
    assert_eq!(response.body.bytes().await.unwrap().len(), 12);
}

#[tokio::test]
async fn rejected_login_causes_one_exchange() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        reply(&[b"{\"result\": 2000, \"error\": \"Log in failed.\"}"]),
        reply(&[b"{\"result\": 0, \"email\": \"a@b.c\"}"]),
    ]));
    let interceptor = AuthInterceptor::new(transport.clone(), Arc::new(SharedToken::new("t")));

    let response = interceptor
        .execute(HttpRequest::get("https://api.pcloud.com/userinfo"))
        .await
        .unwrap();

    assert_eq!(transport.exchanges(), 1);
    assert_eq!(
        response.text().await.unwrap(),
        "{\"result\": 2000, \"error\": \"Log in failed.\"}"
    );
}
