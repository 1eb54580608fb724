use ipn_engine::{notification::RawNotification, NotificationVerifier, VerificationError, VerificationStatus};
use mockall::mock;

mock! {
    pub Verifier {}
    impl NotificationVerifier for Verifier {
        async fn verify(&self, notification: &RawNotification) -> Result<VerificationStatus, VerificationError>;
    }
}

/// A verifier that gives the same answer to every request, however often it is asked.
pub fn verifier_answering(answer: Result<VerificationStatus, VerificationError>) -> MockVerifier {
    let mut verifier = MockVerifier::new();
    verifier.expect_verify().returning(move |_| answer.clone());
    verifier
}
