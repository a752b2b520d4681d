use tracing::warn;

use crate::ports::{LocalStore, StoreError};
use crate::types::push::Subscription;

const SUBSCRIBED_KEY: &str = "push_subscribed";
const SUBSCRIPTION_KEY: &str = "subscription";

/// Local "subscribed" hint. Never authoritative: callers compare it with the
/// platform before trusting it.
#[derive(Debug, Clone)]
pub struct SubscriptionCache<S> {
    store: S,
}

impl<S: LocalStore> SubscriptionCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn is_subscribed(&self) -> bool {
        match self.store.get(SUBSCRIBED_KEY) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(err) => {
                warn!(error = %err, "failed to read subscribed flag");
                false
            }
        }
    }

    pub fn cached(&self) -> Option<Subscription> {
        let raw = match self.store.get(SUBSCRIPTION_KEY) {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(error = %err, "failed to read cached subscription");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(subscription) => Some(subscription),
            Err(err) => {
                warn!(error = %err, "ignoring unreadable cached subscription");
                None
            }
        }
    }

    pub fn remember(&self, subscription: &Subscription) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(subscription)?;
        self.store.set(SUBSCRIPTION_KEY, &serialized)?;
        self.store.set(SUBSCRIBED_KEY, "true")
    }

    pub fn forget(&self) -> Result<(), StoreError> {
        self.store.remove(SUBSCRIBED_KEY)?;
        self.store.remove(SUBSCRIPTION_KEY)
    }
}
