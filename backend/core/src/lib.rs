pub mod channel;
pub mod clock;
pub mod error;
pub mod event;
pub mod message;
pub mod traits;
pub mod types;

pub use channel::EventBus;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{IdleWatchError, LookupError, NotifyError};
pub use event::{ActivityEvent, JoinEvent, MemberStatus};
pub use message::Message;
pub use traits::{AdminResolver, Component, NotificationDispatcher};
pub use types::{
    validate_days, ChannelConfig, ChannelId, EffectiveConfig, MemberId, MembershipRecord, NotifyMode,
    DEFAULT_INACTIVITY_THRESHOLD_DAYS, DEFAULT_NEW_MEMBER_GRACE_DAYS,
};
