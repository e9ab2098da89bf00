use serde::{Deserialize, Serialize};

use crate::event::{ActivityEvent, JoinEvent};

/// Messages delivered to the scheduler over the `EventBus`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Transport -> Scheduler: a member was active
    Activity(ActivityEvent),
    /// Transport -> Scheduler: a membership status changed
    Join(JoinEvent),
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Activity(_) => "activity",
            Message::Join(_) => "join",
        }
    }
}
