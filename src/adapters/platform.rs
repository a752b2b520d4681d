use base64::{URL_SAFE_NO_PAD, encode_config};
use rand::RngCore;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ports::{LocalStore, PlatformError, PushPlatform};
use crate::subscription::keys::generate_client_keys;
use crate::types::push::{
    Permission, PlatformSupport, SubscribeOptions, Subscription, SubscriptionKeys,
    WorkerRegistration, WorkerState,
};

const REGISTRATION_KEY: &str = "platform.registration";
const SUBSCRIPTION_KEY: &str = "platform.subscription";
const TOKEN_LEN: usize = 16;

/// Push platform for a headless client. Subscriptions point at a push relay
/// the user runs; the client generates its own receiver keys and keeps the
/// private half next to the subscription so the relay side can decrypt.
#[derive(Debug, Clone)]
pub struct RelayPushPlatform<S> {
    store: S,
    relay: Option<Url>,
    notifications_allowed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct RelayRecord {
    subscription: Subscription,
    private_key: String,
}

impl<S: LocalStore> RelayPushPlatform<S> {
    pub fn new(store: S, relay: Option<Url>, notifications_allowed: bool) -> Self {
        Self {
            store,
            relay,
            notifications_allowed,
        }
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PlatformError> {
        let Some(raw) = self.store.get(key).map_err(storage_error)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| PlatformError::InvalidState(format!("unreadable {key}: {err}")))
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), PlatformError> {
        let raw = serde_json::to_string(value)
            .map_err(|err| PlatformError::Other(err.to_string()))?;
        self.store.set(key, &raw).map_err(storage_error)
    }

    fn endpoint(&self, relay: &Url) -> String {
        let mut token = [0u8; TOKEN_LEN];
        rand::thread_rng().fill_bytes(&mut token);
        format!(
            "{}/{}",
            relay.as_str().trim_end_matches('/'),
            encode_config(token, URL_SAFE_NO_PAD)
        )
    }
}

fn storage_error(err: crate::ports::StoreError) -> PlatformError {
    PlatformError::Other(format!("local storage failed: {err}"))
}

impl<S: LocalStore> PushPlatform for RelayPushPlatform<S> {
    fn support(&self) -> PlatformSupport {
        PlatformSupport::full()
    }

    fn is_online(&self) -> bool {
        true
    }

    fn permission(&self) -> Permission {
        if self.notifications_allowed {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    async fn request_permission(&self) -> Permission {
        self.permission()
    }

    async fn registration(&self) -> Result<Option<WorkerRegistration>, PlatformError> {
        self.load(REGISTRATION_KEY)
    }

    async fn unregister_all(&self) -> Result<usize, PlatformError> {
        let existing: Option<WorkerRegistration> = self.load(REGISTRATION_KEY)?;
        if existing.is_none() {
            return Ok(0);
        }
        self.store.remove(REGISTRATION_KEY).map_err(storage_error)?;
        Ok(1)
    }

    async fn register(&self, script: &str, scope: &str) -> Result<WorkerRegistration, PlatformError> {
        let registration = WorkerRegistration {
            script: script.to_string(),
            scope: scope.to_string(),
        };
        self.save(REGISTRATION_KEY, &registration)?;
        debug!(script, scope, "worker registered");
        Ok(registration)
    }

    async fn worker_state(
        &self,
        registration: &WorkerRegistration,
    ) -> Result<WorkerState, PlatformError> {
        let current: Option<WorkerRegistration> = self.load(REGISTRATION_KEY)?;
        Ok(match current {
            Some(current) if &current == registration => WorkerState::Activated,
            _ => WorkerState::Redundant,
        })
    }

    async fn get_subscription(&self) -> Result<Option<Subscription>, PlatformError> {
        let record: Option<RelayRecord> = self.load(SUBSCRIPTION_KEY)?;
        Ok(record.map(|record| record.subscription))
    }

    async fn subscribe(&self, options: &SubscribeOptions) -> Result<Subscription, PlatformError> {
        let Some(relay) = self.relay.as_ref() else {
            return Err(PlatformError::NotSupported(
                "no push relay endpoint configured".to_string(),
            ));
        };
        if !options.user_visible_only {
            return Err(PlatformError::NotAllowed(
                "only user-visible push is supported".to_string(),
            ));
        }
        if self.load::<WorkerRegistration>(REGISTRATION_KEY)?.is_none() {
            return Err(PlatformError::InvalidState(
                "no active worker registration".to_string(),
            ));
        }
        if self.load::<RelayRecord>(SUBSCRIPTION_KEY)?.is_some() {
            return Err(PlatformError::InvalidState(
                "a subscription already exists".to_string(),
            ));
        }

        let keys = generate_client_keys().map_err(|err| PlatformError::Other(err.to_string()))?;
        let subscription = Subscription {
            endpoint: self.endpoint(relay),
            expiration_time: None,
            keys: SubscriptionKeys {
                p256dh: keys.p256dh,
                auth: keys.auth,
            },
        };
        self.save(
            SUBSCRIPTION_KEY,
            &RelayRecord {
                subscription: subscription.clone(),
                private_key: keys.private_key,
            },
        )?;
        info!(relay = %relay, keyed = options.application_server_key.is_some(), "relay subscription created");
        Ok(subscription)
    }

    async fn unsubscribe(&self, subscription: &Subscription) -> Result<bool, PlatformError> {
        let record: Option<RelayRecord> = self.load(SUBSCRIPTION_KEY)?;
        match record {
            Some(record) if record.subscription.endpoint == subscription.endpoint => {
                self.store.remove(SUBSCRIPTION_KEY).map_err(storage_error)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
