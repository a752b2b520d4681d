pub mod api;
pub mod push;
pub mod store;
pub mod time;
pub mod view;

pub use api::{ApiError, TimerApi};
pub use push::{PlatformError, PushPlatform};
pub use store::{LocalStore, StoreError};
pub use time::TimeProvider;
pub use view::{Confirmer, TimerView};
