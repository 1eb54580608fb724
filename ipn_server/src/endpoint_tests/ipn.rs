use actix_web::http::{header::ContentType, StatusCode};
use ipn_engine::{
    db_types::ContributionKind,
    idempotency::miss_key,
    notification::RawNotification,
    LedgerManagement,
    MissCounter,
    ReconciliationOptions,
    VerificationError,
    VerificationStatus,
};

use super::{
    helpers::{finish, get_ipn, post_ipn, post_ipn_as, purchase_body, refund_body, seed_purchase, setup},
    mocks::{verifier_answering, MockVerifier},
};

fn verified() -> MockVerifier {
    verifier_answering(Ok(VerificationStatus::Verified))
}

#[actix_web::test]
async fn only_post_is_allowed() {
    let api = setup(verified(), ReconciliationOptions::default()).await;
    let (status, _) = get_ipn(&api).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    finish(api).await;
}

#[actix_web::test]
async fn unverified_notifications_are_rejected() {
    let api = setup(verifier_answering(Ok(VerificationStatus::Unverified("INVALID".into()))), Default::default()).await;
    seed_purchase(&api, "T1").await;
    let (status, body) = post_ipn(&api, &purchase_body("T1")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Invalid confirmation");
    let purchase = api.reconciler().db().purchase_by_tracking_ref("T1").await.unwrap().unwrap();
    assert!(!purchase.is_processed());
    finish(api).await;
}

#[actix_web::test]
async fn the_raw_body_is_sent_for_verification() {
    let mut verifier = MockVerifier::new();
    verifier
        .expect_verify()
        .withf(|raw: &RawNotification| raw.as_bytes() == b"x=x&a=a&y=y")
        .times(1)
        .returning(|_| Ok(VerificationStatus::Unverified("HEY MISTER".into())));
    let api = setup(verifier, Default::default()).await;
    let (status, body) = post_ipn(&api, "x=x&a=a&y=y").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Invalid confirmation");
    finish(api).await;
}

#[actix_web::test]
async fn verification_outage_is_an_unknown_error() {
    let api = setup(verifier_answering(Err(VerificationError::Timeout)), Default::default()).await;
    let (status, body) = post_ipn(&api, &purchase_body("T1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Unknown error.");
    let api2 = setup(verifier_answering(Err(VerificationError::UnexpectedStatus(502))), Default::default()).await;
    let (status, body) = post_ipn(&api2, &purchase_body("T1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Unknown error.");
    finish(api).await;
    finish(api2).await;
}

#[actix_web::test]
async fn notifications_without_actionable_status_are_ignored() {
    let api = setup(verified(), Default::default()).await;
    let (status, body) = post_ipn(&api, "tracking_id=5678").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Ignoring 5678");
    let (status, body) = post_ipn(&api, "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Ignoring ");
    let (status, body) = post_ipn(&api, "tracking_id=T9&transaction%5B0%5D.status=Pending").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Ignoring T9");
    finish(api).await;
}

#[actix_web::test]
async fn subscription_events_are_recorded() {
    let api = setup(verified(), Default::default()).await;
    let (status, body) = post_ipn(&api, "txn_type=subscr_signup&subscr_id=S-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Success!");
    let events = api.reconciler().db().contributions_by_kind(ContributionKind::SubscriptionEvent).await.unwrap();
    assert_eq!(events.len(), 1);
    finish(api).await;
}

#[actix_web::test]
async fn purchase_is_completed_once() {
    let api = setup(verified(), Default::default()).await;
    let (status, body) = post_ipn(&api, &purchase_body("T1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Contribution not found");

    let seeded = seed_purchase(&api, "T1").await;
    let (status, body) = post_ipn(&api, &purchase_body("T1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Success!");
    let purchase = api.reconciler().db().contribution_by_id(seeded.id).await.unwrap().unwrap();
    assert!(purchase.is_processed());
    assert_eq!(purchase.transaction_ref.as_deref(), Some("T1"));
    assert!(purchase.post_data.as_deref().unwrap_or_default().contains("Adaptive Payment PAY"));

    let (status, body) = post_ipn(&api, &purchase_body("T1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Transaction already processed");
    finish(api).await;
}

#[actix_web::test]
async fn payment_without_tracking_id_is_an_unknown_error() {
    let api = setup(verified(), Default::default()).await;
    let (status, body) = post_ipn(&api, "transaction%5B0%5D.status=Completed&transaction%5B0%5D.amount=USD+1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Unknown error.");
    finish(api).await;
}

#[actix_web::test]
async fn refund_is_recorded_once() {
    let api = setup(verified(), Default::default()).await;
    let purchase = seed_purchase(&api, "T1").await;
    let (_, body) = post_ipn(&api, &purchase_body("T1")).await;
    assert_eq!(body, "Success!");

    let (status, body) = post_ipn(&api, &refund_body("T1", "Refunded")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Success!");
    let (status, body) = post_ipn(&api, &refund_body("T1", "Refunded")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Transaction already processed");

    let reversals = api.reconciler().db().reversals_for(purchase.id).await.unwrap();
    assert_eq!(reversals.len(), 1);
    assert_eq!(reversals[0].kind, ContributionKind::Refund);
    assert_eq!(reversals[0].amount.to_string(), "-0.01 USD");
    assert_eq!(reversals[0].related_id, Some(purchase.id));
    finish(api).await;
}

#[actix_web::test]
async fn reversal_is_recorded_as_a_chargeback() {
    let api = setup(verified(), Default::default()).await;
    let purchase = seed_purchase(&api, "T1").await;
    post_ipn(&api, &purchase_body("T1")).await;
    let (status, body) = post_ipn(&api, &refund_body("T1", "Reversal")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Success!");
    let reversals = api.reconciler().db().reversals_for(purchase.id).await.unwrap();
    assert_eq!(reversals.len(), 1);
    assert_eq!(reversals[0].kind, ContributionKind::Chargeback);
    finish(api).await;
}

#[actix_web::test]
async fn orphaned_refund_waits_for_redelivery() {
    let api = setup(verified(), Default::default()).await;
    let (status, body) = post_ipn(&api, &refund_body("5678", "Refunded")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Contribution not found");
    assert_eq!(api.reconciler().miss_counter().peek(&miss_key("", "5678")).await.unwrap(), 1);
    finish(api).await;
}

#[actix_web::test]
async fn persistently_orphaned_refund_is_dropped() {
    let options = ReconciliationOptions { cache_prefix: "test:".into(), ..Default::default() };
    let api = setup(verified(), options).await;
    let key = miss_key("test:", "5678");
    for _ in 0..10 {
        api.reconciler().miss_counter().note_miss(&key).await.unwrap();
    }
    let (status, body) = post_ipn(&api, &refund_body("5678", "Refunded")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Transaction not found; skipping.");
    assert_eq!(api.reconciler().miss_counter().peek(&key).await.unwrap(), 0);
    assert!(api.reconciler().db().contributions_by_kind(ContributionKind::Refund).await.unwrap().is_empty());
    finish(api).await;
}

#[actix_web::test]
async fn database_failure_is_an_unknown_error() {
    let api = setup(verified(), Default::default()).await;
    let mut db = api.reconciler().db().clone();
    db.close().await.unwrap();
    let (status, body) = post_ipn(&api, &purchase_body("T1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Unknown error.");
    finish(api).await;
}

#[actix_web::test]
async fn notifications_without_a_form_content_type_are_still_handled() {
    let api = setup(verified(), ReconciliationOptions::default()).await;
    seed_purchase(&api, "T1").await;
    seed_purchase(&api, "T2").await;
    let (status, body) = post_ipn_as(&api, Some(ContentType::plaintext()), &purchase_body("T1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Success!");
    let (status, body) = post_ipn_as(&api, None, &purchase_body("T2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Success!");
    let db = api.reconciler().db();
    assert!(db.purchase_by_tracking_ref("T1").await.unwrap().unwrap().is_processed());
    assert!(db.purchase_by_tracking_ref("T2").await.unwrap().unwrap().is_processed());
    finish(api).await;
}
