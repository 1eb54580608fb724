use std::fmt::Display;

use super::NotificationError;

/// A notification body exactly as it was received.
///
/// The original bytes are kept untouched so that the verification request can replay them in the same order. The
/// decoded `(key, value)` pairs are kept in arrival order, repeated keys included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNotification {
    body: Vec<u8>,
    pairs: Vec<(String, String)>,
}

impl RawNotification {
    /// Decodes a form-urlencoded body.
    ///
    /// Fails only when the body is not text at all. Empty segments (`a=1&&b=2`) are skipped and a segment without
    /// `=` is read as a key with an empty value.
    pub fn from_bytes<B: Into<Vec<u8>>>(body: B) -> Result<Self, NotificationError> {
        let body = body.into();
        let text = std::str::from_utf8(&body).map_err(|e| NotificationError::MalformedNotification(e.to_string()))?;
        let pairs = text
            .split('&')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.split_once('=') {
                Some((k, v)) => (decode_component(k), decode_component(v)),
                None => (decode_component(segment), String::new()),
            })
            .collect();
        Ok(Self { body, pairs })
    }

    /// Builds a notification by form-encoding the given pairs in order. Mostly useful for tests and tooling.
    pub fn from_pairs<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> Self {
        let body = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k.as_ref()), urlencoding::encode(v.as_ref())))
            .collect::<Vec<String>>()
            .join("&");
        let pairs = pairs.iter().map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string())).collect();
        Self { body: body.into_bytes(), pairs }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The value of the last occurrence of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

impl Display for RawNotification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.body))
    }
}

fn decode_component(s: &str) -> String {
    let s = s.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(s.as_bytes())).into_owned()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keeps_body_and_order() {
        let raw = RawNotification::from_bytes("x=x&a=a&y=y").unwrap();
        assert_eq!(raw.as_bytes(), b"x=x&a=a&y=y");
        let keys = raw.pairs().iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["x", "a", "y"]);
    }

    #[test]
    fn decodes_components() {
        let raw =
            RawNotification::from_bytes("transaction%5B0%5D.amount=USD+0.01&sender_email=a%40b.com&flag&&empty=")
                .unwrap();
        assert_eq!(raw.get("transaction[0].amount"), Some("USD 0.01"));
        assert_eq!(raw.get("sender_email"), Some("a@b.com"));
        assert_eq!(raw.get("flag"), Some(""));
        assert_eq!(raw.get("empty"), Some(""));
        assert_eq!(raw.pairs().len(), 4);
    }

    #[test]
    fn repeated_keys_resolve_to_last_value() {
        let raw = RawNotification::from_bytes("a=1&b=2&a=3").unwrap();
        assert_eq!(raw.get("a"), Some("3"));
        assert_eq!(raw.pairs().len(), 3);
    }

    #[test]
    fn empty_body_is_fine() {
        let raw = RawNotification::from_bytes(Vec::new()).unwrap();
        assert!(raw.is_empty());
        assert_eq!(raw.as_bytes(), b"");
    }

    #[test]
    fn binary_body_is_malformed() {
        let err = RawNotification::from_bytes(vec![0x61, 0x3d, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, NotificationError::MalformedNotification(_)));
    }

    #[test]
    fn from_pairs_encodes_in_order() {
        let raw = RawNotification::from_pairs(&[("transaction[0].status", "Completed"), ("tracking_id", "T 1")]);
        assert_eq!(raw.to_string(), "transaction%5B0%5D.status=Completed&tracking_id=T%201");
        assert_eq!(RawNotification::from_bytes(raw.as_bytes().to_vec()).unwrap().pairs(), raw.pairs());
    }
}
