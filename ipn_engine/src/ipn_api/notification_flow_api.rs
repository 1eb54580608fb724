use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::LedgerDatabase,
    idempotency::MissCounter,
    ipn_api::{errors::IpnError, outcome::IpnOutcome, reconciliation_api::ReconciliationApi},
    notification::{ParsedNotification, RawNotification},
    verification::{NotificationVerifier, VerificationStatus},
};

/// `NotificationFlowApi` handles one inbound notification from start to finish.
///
/// 1. The raw body is decoded, keeping the original bytes.
/// 2. The processor is asked to confirm it. Unconfirmed notifications stop here, so they can never touch the ledger.
/// 3. The body is parsed and reconciled.
pub struct NotificationFlowApi<B, C, V> {
    verifier: V,
    reconciler: ReconciliationApi<B, C>,
}

impl<B, C, V> Debug for NotificationFlowApi<B, C, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationFlowApi")
    }
}

impl<B, C, V> NotificationFlowApi<B, C, V> {
    pub fn new(verifier: V, reconciler: ReconciliationApi<B, C>) -> Self {
        Self { verifier, reconciler }
    }

    pub fn reconciler(&self) -> &ReconciliationApi<B, C> {
        &self.reconciler
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }
}

impl<B, C, V> NotificationFlowApi<B, C, V>
where
    B: LedgerDatabase,
    C: MissCounter,
    V: NotificationVerifier,
{
    pub async fn process_notification<T: Into<Vec<u8>>>(&self, body: T) -> Result<IpnOutcome, IpnError> {
        let raw = RawNotification::from_bytes(body)?;
        if raw.is_empty() {
            warn!("🔐️ Received a notification with an empty body");
        }
        match self.verifier.verify(&raw).await? {
            VerificationStatus::Verified => trace!("🔐️ Notification verified"),
            VerificationStatus::Unverified(status) => {
                let tracking_id = raw.get("tracking_id").unwrap_or_default();
                warn!("🔐️ Notification [{tracking_id}] was not verified. The processor said '{status}'. Body: {raw}");
                return Err(IpnError::Unverified(status));
            },
        }
        let notification = ParsedNotification::from(&raw);
        let outcome = self.reconciler.reconcile(&notification).await?;
        debug!("🔄️ Notification [{}] handled: {outcome}", notification.tracking_id().unwrap_or_default());
        Ok(outcome)
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{
        db_types::ContributionKind,
        events::EventProducers,
        notification::NotificationError,
        test_utils::prepare_env::{new_test_database, tear_down},
        verification::VerificationError,
        LedgerManagement,
        MemoryMissCounter,
        ReconciliationError,
        ReconciliationOptions,
        SqliteDatabase,
    };

    /// Answers with a canned result and remembers what it was asked to verify.
    #[derive(Clone)]
    struct CannedVerifier {
        answer: Result<VerificationStatus, VerificationError>,
        seen: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl CannedVerifier {
        fn new(answer: Result<VerificationStatus, VerificationError>) -> Self {
            Self { answer, seen: Arc::new(Mutex::new(Vec::new())) }
        }
    }

    impl NotificationVerifier for CannedVerifier {
        async fn verify(&self, notification: &RawNotification) -> Result<VerificationStatus, VerificationError> {
            self.seen.lock().unwrap().push(notification.as_bytes().to_vec());
            self.answer.clone()
        }
    }

    async fn setup(verifier: CannedVerifier) -> NotificationFlowApi<SqliteDatabase, MemoryMissCounter, CannedVerifier> {
        let db = new_test_database().await;
        let reconciler = ReconciliationApi::new(
            db,
            MemoryMissCounter::default(),
            EventProducers::default(),
            ReconciliationOptions::default(),
        );
        NotificationFlowApi::new(verifier, reconciler)
    }

    #[tokio::test]
    async fn unverified_notifications_never_reach_the_ledger() {
        let api = setup(CannedVerifier::new(Ok(VerificationStatus::Unverified("INVALID".into())))).await;
        let err = api.process_notification("txn_type=subscr_signup").await.unwrap_err();
        assert_eq!(err, IpnError::Unverified("INVALID".into()));
        let events = api.reconciler().db().contributions_by_kind(ContributionKind::SubscriptionEvent).await.unwrap();
        assert!(events.is_empty());
        tear_down(api.reconciler().db().clone()).await;
    }

    #[tokio::test]
    async fn verifier_sees_the_original_bytes() {
        let verifier = CannedVerifier::new(Ok(VerificationStatus::Unverified("HEY MISTER".into())));
        let seen = verifier.seen.clone();
        let api = setup(verifier).await;
        let _ = api.process_notification("x=x&a=a&y=y").await;
        assert_eq!(seen.lock().unwrap().as_slice(), &[b"x=x&a=a&y=y".to_vec()]);
        tear_down(api.reconciler().db().clone()).await;
    }

    #[tokio::test]
    async fn transport_errors_are_not_rejections() {
        let api = setup(CannedVerifier::new(Err(VerificationError::Timeout))).await;
        let err = api.process_notification("a=b").await.unwrap_err();
        assert_eq!(err, IpnError::VerificationFailed(VerificationError::Timeout));
        tear_down(api.reconciler().db().clone()).await;
    }

    #[tokio::test]
    async fn binary_bodies_are_malformed() {
        let api = setup(CannedVerifier::new(Ok(VerificationStatus::Verified))).await;
        let err = api.process_notification(vec![0xff, 0xfe, 0x3d]).await.unwrap_err();
        assert!(matches!(err, IpnError::MalformedNotification(NotificationError::MalformedNotification(_))));
        tear_down(api.reconciler().db().clone()).await;
    }

    #[tokio::test]
    async fn verified_notifications_are_reconciled() {
        let api = setup(CannedVerifier::new(Ok(VerificationStatus::Verified))).await;
        let outcome = api.process_notification("").await.unwrap();
        assert_eq!(outcome.response_body(), "Ignoring ");
        let outcome = api.process_notification("txn_type=subscr_xxx").await.unwrap();
        assert!(matches!(outcome, IpnOutcome::SubscriptionRecorded(_)));
        let err = api
            .process_notification("tracking_id=T1&transaction%5B0%5D.status=Completed&transaction%5B0%5D.amount=USD+0.01")
            .await
            .unwrap_err();
        assert_eq!(err, IpnError::Reconciliation(ReconciliationError::ContributionNotFound("T1".into())));
        tear_down(api.reconciler().db().clone()).await;
    }
}
