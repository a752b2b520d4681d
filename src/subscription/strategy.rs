use std::time::Duration;

use crate::subscription::keys::KeyMaterial;
use crate::types::push::{ApplicationServerKey, SubscribeOptions};

/// One way of asking the platform for a subscription. Strategies are tried in
/// order and the first one that yields a usable subscription wins.
#[derive(Debug, Clone, Copy)]
pub struct SubscribeStrategy {
    pub name: &'static str,
    /// Wait before the attempt; some extensions only interfere with the first call.
    pub delay: Duration,
    build: fn(&KeyMaterial) -> SubscribeOptions,
}

impl SubscribeStrategy {
    pub fn options(&self, key: &KeyMaterial) -> SubscribeOptions {
        (self.build)(key)
    }
}

pub const STRATEGIES: [SubscribeStrategy; 4] = [
    SubscribeStrategy {
        name: "raw key",
        delay: Duration::ZERO,
        build: raw_key,
    },
    SubscribeStrategy {
        name: "delayed raw key",
        delay: Duration::from_millis(100),
        build: raw_key,
    },
    SubscribeStrategy {
        name: "encoded key",
        delay: Duration::ZERO,
        build: encoded_key,
    },
    SubscribeStrategy {
        name: "no key",
        delay: Duration::ZERO,
        build: keyless,
    },
];

fn raw_key(key: &KeyMaterial) -> SubscribeOptions {
    SubscribeOptions {
        user_visible_only: true,
        application_server_key: Some(ApplicationServerKey::Raw(key.raw.clone())),
    }
}

fn encoded_key(key: &KeyMaterial) -> SubscribeOptions {
    SubscribeOptions {
        user_visible_only: true,
        application_server_key: Some(ApplicationServerKey::Encoded(key.encoded.clone())),
    }
}

fn keyless(_key: &KeyMaterial) -> SubscribeOptions {
    SubscribeOptions {
        user_visible_only: true,
        application_server_key: None,
    }
}
