//! Subscription bookkeeping for venue sockets
//!
//! Subscriptions are keyed by the serialized payload the venue receives. Each payload
//! has a set of owners (the engine-side subscriptions that need it), so two owners that
//! map to the same venue channel share one message. A payload is sent at most once per
//! connection: after a reconnect every payload becomes unsent again and the first
//! owner to ask for it triggers the resend.

use rustc_hash::{FxHashMap, FxHashSet};

/// Owned, pending and confirmed subscription payloads
#[derive(Debug, Default)]
pub struct SubscriptionTracker {
    owners: FxHashMap<String, FxHashSet<String>>,
    pending: FxHashSet<String>,
    confirmed: FxHashSet<String>,
}

impl SubscriptionTracker {
    /// Creates an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `owner` for `payload`.
    ///
    /// Returns true when the payload has not been sent on the current connection and
    /// the caller must send it now. The payload is then pending until confirmed.
    pub fn add(&mut self, payload: &str, owner: &str) -> bool {
        self.owners
            .entry(payload.to_string())
            .or_default()
            .insert(owner.to_string());
        if self.pending.contains(payload) || self.confirmed.contains(payload) {
            return false;
        }
        self.pending.insert(payload.to_string());
        true
    }

    /// Releases `owner` from `payload`.
    ///
    /// Returns true when no owners remain and the payload was sent on this connection,
    /// so the caller must send the unsubscribe.
    pub fn remove(&mut self, payload: &str, owner: &str) -> bool {
        let Some(owners) = self.owners.get_mut(payload) else {
            return false;
        };
        if !owners.remove(owner) || !owners.is_empty() {
            return false;
        }
        self.owners.remove(payload);
        self.pending.remove(payload) | self.confirmed.remove(payload)
    }

    /// Records the venue's acknowledgement of `payload`
    pub fn confirm(&mut self, payload: &str) {
        if self.pending.remove(payload) && self.owners.contains_key(payload) {
            self.confirmed.insert(payload.to_string());
        }
    }

    /// Records the venue's rejection of `payload`; owners are kept for the next attempt
    pub fn reject(&mut self, payload: &str) {
        self.pending.remove(payload);
        self.confirmed.remove(payload);
    }

    /// Forgets what was sent on the previous connection
    pub fn on_reconnect(&mut self) {
        self.pending.clear();
        self.confirmed.clear();
    }

    /// Marks every owned, unsent payload as pending and returns each once, sorted
    pub fn replay(&mut self) -> Vec<String> {
        let mut unsent: Vec<String> = self
            .owners
            .keys()
            .filter(|p| !self.pending.contains(*p) && !self.confirmed.contains(*p))
            .cloned()
            .collect();
        unsent.sort();
        self.pending.extend(unsent.iter().cloned());
        unsent
    }

    /// Number of owners of `payload`
    #[must_use]
    pub fn ref_count(&self, payload: &str) -> usize {
        self.owners.get(payload).map_or(0, FxHashSet::len)
    }

    #[must_use]
    pub fn is_pending(&self, payload: &str) -> bool {
        self.pending.contains(payload)
    }

    #[must_use]
    pub fn is_confirmed(&self, payload: &str) -> bool {
        self.confirmed.contains(payload)
    }

    /// Every owned payload, sorted
    #[must_use]
    pub fn payloads(&self) -> Vec<String> {
        let mut payloads: Vec<String> = self.owners.keys().cloned().collect();
        payloads.sort();
        payloads
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    const BOOKS: &str = r#"{"channel":"books","instId":"BTC-USDT"}"#;
    const TRADES: &str = r#"{"channel":"trades","instId":"BTC-USDT"}"#;

    #[fixture]
    fn tracker() -> SubscriptionTracker {
        SubscriptionTracker::new()
    }

    #[rstest]
    fn test_shared_payload_sent_once(mut tracker: SubscriptionTracker) {
        assert!(tracker.add(BOOKS, "deltas"));
        assert!(!tracker.add(BOOKS, "snapshots"));
        assert!(!tracker.add(BOOKS, "deltas"));

        assert_eq!(tracker.ref_count(BOOKS), 2);
        assert!(tracker.is_pending(BOOKS));
    }

    #[rstest]
    fn test_last_owner_unsubscribes(mut tracker: SubscriptionTracker) {
        tracker.add(BOOKS, "deltas");
        tracker.add(BOOKS, "snapshots");
        tracker.confirm(BOOKS);

        assert!(!tracker.remove(BOOKS, "deltas"));
        assert!(tracker.remove(BOOKS, "snapshots"));
        assert!(!tracker.remove(BOOKS, "snapshots"));
        assert!(tracker.is_empty());
    }

    #[rstest]
    fn test_reconnect_resends_each_payload_once(mut tracker: SubscriptionTracker) {
        tracker.add(BOOKS, "deltas");
        tracker.add(BOOKS, "snapshots");
        tracker.add(TRADES, "trades");
        tracker.confirm(BOOKS);
        tracker.confirm(TRADES);

        tracker.on_reconnect();

        assert!(tracker.add(BOOKS, "deltas"));
        assert!(!tracker.add(BOOKS, "snapshots"));
        assert_eq!(tracker.replay(), vec![TRADES.to_string()]);
        assert!(tracker.replay().is_empty());
        assert_eq!(tracker.ref_count(BOOKS), 2);
    }

    #[rstest]
    fn test_confirm_after_unsubscribe_is_ignored(mut tracker: SubscriptionTracker) {
        tracker.add(TRADES, "trades");
        tracker.remove(TRADES, "trades");

        tracker.confirm(TRADES);

        assert!(!tracker.is_confirmed(TRADES));
    }

    #[rstest]
    fn test_rejected_payload_is_retried(mut tracker: SubscriptionTracker) {
        tracker.add(TRADES, "trades");
        tracker.reject(TRADES);

        assert_eq!(tracker.replay(), vec![TRADES.to_string()]);
        assert_eq!(tracker.payloads(), vec![TRADES.to_string()]);
    }
}
