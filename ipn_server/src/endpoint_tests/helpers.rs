use actix_web::{
    http::{header::ContentType, StatusCode},
    test,
    test::TestRequest,
    web,
    App,
};
use ipn_engine::{
    db_types::{Contribution, NewAddon, NewContribution},
    events::EventProducers,
    test_utils::prepare_env::{new_test_database, tear_down},
    LedgerDatabase,
    MemoryMissCounter,
    NotificationFlowApi,
    NotificationVerifier,
    ReconciliationApi,
    ReconciliationOptions,
    SqliteDatabase,
};

use crate::{config::ServerOptions, routes::PaypalIpnRoute};

pub type TestApi<V> = NotificationFlowApi<SqliteDatabase, MemoryMissCounter, V>;

pub async fn setup<V: NotificationVerifier>(verifier: V, options: ReconciliationOptions) -> web::Data<TestApi<V>> {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let reconciler = ReconciliationApi::new(db, MemoryMissCounter::default(), EventProducers::default(), options);
    web::Data::new(NotificationFlowApi::new(verifier, reconciler))
}

pub async fn finish<V>(api: web::Data<TestApi<V>>) {
    tear_down(api.reconciler().db().clone()).await;
}

/// Seeds a pending purchase of `USD 0.01`, the way the purchase-initiation flow would.
pub async fn seed_purchase<V>(api: &web::Data<TestApi<V>>, tracking_id: &str) -> Contribution {
    let db = api.reconciler().db();
    let addon = db.insert_addon(NewAddon::new("Sinuous")).await.expect("Failed to insert addon");
    let purchase = NewContribution::purchase(addon.id, "USD 0.01".parse().unwrap()).with_tracking_ref(tracking_id);
    db.insert_contribution(purchase).await.expect("Failed to insert purchase")
}

fn app<V: NotificationVerifier + 'static>(
    api: &web::Data<TestApi<V>>,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(api.clone())
        .app_data(web::Data::new(ServerOptions::default()))
        .service(PaypalIpnRoute::<SqliteDatabase, MemoryMissCounter, V>::new())
}

pub async fn post_ipn<V: NotificationVerifier + 'static>(api: &web::Data<TestApi<V>>, body: &str) -> (StatusCode, String) {
    post_ipn_as(api, Some(ContentType::form_url_encoded()), body).await
}

pub async fn post_ipn_as<V: NotificationVerifier + 'static>(
    api: &web::Data<TestApi<V>>,
    content_type: Option<ContentType>,
    body: &str,
) -> (StatusCode, String) {
    let service = test::init_service(app(api)).await;
    let mut req = TestRequest::post().uri("/paypal").set_payload(body.to_string());
    if let Some(content_type) = content_type {
        req = req.insert_header(content_type);
    }
    let req = req.to_request();
    let res = test::call_service(&service, req).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

pub async fn get_ipn<V: NotificationVerifier + 'static>(api: &web::Data<TestApi<V>>) -> (StatusCode, String) {
    let service = test::init_service(app(api)).await;
    let req = TestRequest::get().uri("/paypal").to_request();
    let res = test::call_service(&service, req).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

/// A purchase-completed notification in the shape PayPal sends, with the transaction keys percent-encoded.
pub fn purchase_body(tracking_id: &str) -> String {
    format!(
        "sender_email=some.other%40gmail.com&status=COMPLETED&tracking_id={tracking_id}&\
         transaction%5B0%5D.amount=USD+0.01&transaction%5B0%5D.id=ABC&transaction%5B0%5D.status=Completed&\
         transaction_type=Adaptive+Payment+PAY"
    )
}

pub fn refund_body(tracking_id: &str, status: &str) -> String {
    format!(
        "sender_email=some.other%40gmail.com&tracking_id={tracking_id}&transaction%5B0%5D.amount=USD+0.01&\
         transaction%5B0%5D.refund_amount=USD+0.01&transaction%5B0%5D.status={status}&transaction_type=Adjustment"
    )
}
