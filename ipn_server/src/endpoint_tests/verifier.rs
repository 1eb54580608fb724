//! Runs the real verifier against a stand-in for the processor's verification endpoint.
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use actix_web::{dev::ServerHandle, http::StatusCode, web, App, HttpResponse, HttpServer};
use bytes::Bytes;
use ipn_engine::{PaypalVerifier, ReconciliationOptions};

use super::helpers::{finish, post_ipn, purchase_body, seed_purchase, setup};

struct FakeProcessor {
    url: String,
    handle: ServerHandle,
    seen: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl FakeProcessor {
    async fn start(answer: &'static str, status: u16, delay: Duration) -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let requests = seen.clone();
        let server = HttpServer::new(move || {
            let requests = requests.clone();
            App::new().route(
                "/cgi-bin/webscr",
                web::post().to(move |body: Bytes| {
                    let requests = requests.clone();
                    async move {
                        requests.lock().unwrap().push(body.to_vec());
                        tokio::time::sleep(delay).await;
                        HttpResponse::build(StatusCode::from_u16(status).unwrap()).body(answer)
                    }
                }),
            )
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("Could not bind fake processor");
        let port = server.addrs()[0].port();
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);
        Self { url: format!("http://127.0.0.1:{port}/cgi-bin/webscr"), handle, seen }
    }

    fn verifier(&self, timeout: Duration) -> PaypalVerifier {
        PaypalVerifier::new(self.url.clone(), timeout).unwrap()
    }

    async fn stop(self) {
        self.handle.stop(false).await;
    }
}

#[actix_web::test]
async fn verified_purchase_is_completed() {
    let processor = FakeProcessor::start("VERIFIED", 200, Duration::ZERO).await;
    let api = setup(processor.verifier(Duration::from_secs(5)), ReconciliationOptions::default()).await;
    seed_purchase(&api, "T1").await;
    let body = purchase_body("T1");
    let (status, response) = post_ipn(&api, &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, "Success!");
    let seen = processor.seen.lock().unwrap().clone();
    assert_eq!(seen, vec![format!("cmd=_notify-validate&{body}").into_bytes()]);
    finish(api).await;
    processor.stop().await;
}

#[actix_web::test]
async fn only_the_first_line_counts() {
    let processor = FakeProcessor::start("VERIFIED\r\nsomething else", 200, Duration::ZERO).await;
    let api = setup(processor.verifier(Duration::from_secs(5)), ReconciliationOptions::default()).await;
    let (status, response) = post_ipn(&api, "txn_type=subscr_cancel").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, "Success!");
    finish(api).await;
    processor.stop().await;
}

#[actix_web::test]
async fn invalid_answer_is_forbidden() {
    for answer in ["INVALID", "VERIFIED-ish", ""] {
        let processor = FakeProcessor::start(answer, 200, Duration::ZERO).await;
        let api = setup(processor.verifier(Duration::from_secs(5)), ReconciliationOptions::default()).await;
        let (status, response) = post_ipn(&api, "x=x&a=a&y=y").await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{answer}");
        assert_eq!(response, "Invalid confirmation");
        finish(api).await;
        processor.stop().await;
    }
}

#[actix_web::test]
async fn processor_error_is_an_unknown_error() {
    let processor = FakeProcessor::start("VERIFIED", 503, Duration::ZERO).await;
    let api = setup(processor.verifier(Duration::from_secs(5)), ReconciliationOptions::default()).await;
    let (status, response) = post_ipn(&api, "txn_type=subscr_cancel").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response, "Unknown error.");
    finish(api).await;
    processor.stop().await;
}

#[actix_web::test]
async fn slow_processor_times_out() {
    let processor = FakeProcessor::start("VERIFIED", 200, Duration::from_secs(3)).await;
    let api = setup(processor.verifier(Duration::from_millis(250)), ReconciliationOptions::default()).await;
    let (status, response) = post_ipn(&api, "txn_type=subscr_cancel").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response, "Unknown error.");
    finish(api).await;
    processor.stop().await;
}
