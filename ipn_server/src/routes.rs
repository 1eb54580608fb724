//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go into a separate module.
//!
//! Since each worker thread processes its requests sequentially, handlers must never block the current thread.
//! Verification and database work are expressed as futures, so a slow processor only holds up the notification that
//! is waiting on it.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use bytes::Bytes;
use ipn_engine::{LedgerDatabase, MissCounter, NotificationFlowApi, NotificationVerifier};
use log::*;

use crate::{
    config::ServerOptions,
    errors::ServerError,
    helpers::{get_remote_ip, unexpected_content_type},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro.
// Requests to the path with any other method are answered with 405 Method Not Allowed.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .route(
                        actix_web::web::route()
                            .guard(actix_web::guard::$method())
                            .to($name::< $( [< T $bounds:camel >], )+>),
                    )
                    .default_service(actix_web::web::to(|| async { actix_web::HttpResponse::MethodNotAllowed().finish() }));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

//----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   PayPal IPN  ----------------------------------------------------
route!(paypal_ipn => Post "/paypal" impl LedgerDatabase, MissCounter, NotificationVerifier);
/// Receives an Instant Payment Notification.
///
/// The body is read as raw bytes, whatever the content type, because it has to be replayed to the processor
/// byte for byte. The response body is one of a small set of literals; see [`ipn_engine::IpnOutcome`] and
/// [`ServerError`].
pub async fn paypal_ipn<B, C, V>(
    req: HttpRequest,
    body: Bytes,
    options: web::Data<ServerOptions>,
    api: web::Data<NotificationFlowApi<B, C, V>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerDatabase,
    C: MissCounter,
    V: NotificationVerifier,
{
    let peer = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "an unknown address".into());
    info!("💻️ Received IPN ({} bytes) from {peer}", body.len());
    if let Some(content_type) = unexpected_content_type(&req) {
        warn!("💻️ IPN from {peer} has content type '{content_type}' instead of a form. Processing it anyway.");
    }
    match api.process_notification(body.to_vec()).await {
        Ok(outcome) => {
            info!("💻️ IPN from {peer} handled: {outcome}");
            Ok(HttpResponse::Ok().body(outcome.response_body()))
        },
        Err(e) => {
            warn!("💻️ IPN from {peer} failed. {e}");
            Err(e.into())
        },
    }
}
