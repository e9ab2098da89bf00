//! Telegram group mapping
//!
//! Turns raw Telegram chats, senders and member updates into idlewatch events.
//! Only group and supergroup chats are monitored.

use chrono::{DateTime, Utc};
use teloxide::types::{Chat, ChatMemberKind, ChatMemberUpdated, User};

use idlewatch_core::{ActivityEvent, ChannelId, JoinEvent, MemberId, MemberStatus};

pub fn is_monitored(chat: &Chat) -> bool {
    chat.is_group() || chat.is_supergroup()
}

pub fn member_id(user: &User) -> MemberId {
    MemberId(user.id.0 as i64)
}

/// Activity for a message sent by `sender` in a monitored chat.
pub fn activity_event(
    chat_id: i64,
    monitored: bool,
    sender: Option<&User>,
    at: DateTime<Utc>,
) -> Option<ActivityEvent> {
    if !monitored {
        return None;
    }
    let sender = sender?;
    Some(ActivityEvent {
        channel_id: ChannelId(chat_id),
        member_id: member_id(sender),
        timestamp: at,
        is_bot: sender.is_bot,
    })
}

pub fn member_status(kind: &ChatMemberKind) -> MemberStatus {
    match kind {
        ChatMemberKind::Owner { .. } => MemberStatus::Owner,
        ChatMemberKind::Administrator { .. } => MemberStatus::Administrator,
        ChatMemberKind::Member { .. } => MemberStatus::Member,
        ChatMemberKind::Restricted { .. } => MemberStatus::Restricted,
        ChatMemberKind::Left { .. } => MemberStatus::Left,
        ChatMemberKind::Banned { .. } => MemberStatus::Kicked,
    }
}

/// Membership transition for a `chat_member` update in a monitored chat.
pub fn join_event(update: &ChatMemberUpdated) -> Option<JoinEvent> {
    if !is_monitored(&update.chat) {
        return None;
    }
    Some(JoinEvent {
        channel_id: ChannelId(update.chat.id.0),
        member_id: member_id(&update.new_chat_member.user),
        timestamp: update.date,
        previous_status: member_status(&update.old_chat_member.kind),
        new_status: member_status(&update.new_chat_member.kind),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use teloxide::types::UserId;

    fn user(id: u64, is_bot: bool) -> User {
        User {
            id: UserId(id),
            is_bot,
            first_name: "Ana".into(),
            last_name: None,
            username: None,
            language_code: None,
            is_premium: false,
            added_to_attachment_menu: false,
        }
    }

    #[test]
    fn test_activity_only_in_monitored_chats() {
        let at = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
        let u = user(77, false);

        let event = activity_event(-100123, true, Some(&u), at).unwrap();
        assert_eq!(event.channel_id, ChannelId(-100123));
        assert_eq!(event.member_id, MemberId(77));
        assert!(event.should_record());

        assert!(activity_event(77, false, Some(&u), at).is_none());
        assert!(activity_event(-100123, true, None, at).is_none());
    }

    #[test]
    fn test_bot_senders_are_flagged() {
        let at = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
        let bot = user(5, true);
        let event = activity_event(-1, true, Some(&bot), at).unwrap();
        assert!(!event.should_record());
    }
}
