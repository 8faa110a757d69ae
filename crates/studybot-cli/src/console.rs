//! A [`Platform`] that writes every outbound message to stderr.
//!
//! The CLI has no chat connection, so it assumes every user is a human
//! member and every message it posted still exists. Ids for new channels
//! and messages are random.

use studybot_core::{ChannelId, Member, MessageId, Notice, Platform, PlatformError, UserId};
use uuid::Uuid;

pub struct ConsolePlatform;

fn fresh_id() -> u64 {
    // Positive i64 range, so ids survive the SQLite round trip.
    Uuid::new_v4().as_u64_pair().0 >> 1
}

fn show(target: &str, notice: &Notice) {
    eprintln!("[{target}] {}", notice.render_plain().replace('\n', "\n    "));
}

impl Platform for ConsolePlatform {
    fn member(&self, user: UserId) -> Result<Option<Member>, PlatformError> {
        Ok(Some(Member {
            id: user,
            display_name: format!("user-{user}"),
            is_bot: false,
        }))
    }

    fn send_to_user(&self, user: UserId, notice: &Notice) -> Result<(), PlatformError> {
        tracing::debug!(user = %user, "direct message");
        show(&format!("dm {}", user.mention()), notice);
        Ok(())
    }

    fn send_to_channel(
        &self,
        channel: ChannelId,
        notice: &Notice,
    ) -> Result<MessageId, PlatformError> {
        let id = MessageId(fresh_id());
        tracing::debug!(channel = %channel, message = %id, "channel post");
        show(&channel.mention(), notice);
        Ok(id)
    }

    fn create_private_channel(
        &self,
        name: &str,
        members: &[UserId],
    ) -> Result<ChannelId, PlatformError> {
        let id = ChannelId(fresh_id());
        tracing::info!(channel = %id, name, members = members.len(), "created private channel");
        Ok(id)
    }

    fn create_invite(&self, channel: ChannelId) -> Result<String, PlatformError> {
        Ok(format!("studybot://channel/{channel}"))
    }

    fn message_exists(
        &self,
        _channel: ChannelId,
        _message: MessageId,
    ) -> Result<bool, PlatformError> {
        Ok(true)
    }

    fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        notice: &Notice,
    ) -> Result<(), PlatformError> {
        show(&format!("edit {} {message}", channel.mention()), notice);
        Ok(())
    }

    fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError> {
        tracing::info!(channel = %channel, "deleted channel");
        Ok(())
    }

    fn add_reactions(
        &self,
        _channel: ChannelId,
        message: MessageId,
        reactions: &[&str],
    ) -> Result<(), PlatformError> {
        tracing::debug!(message = %message, count = reactions.len(), "added reactions");
        Ok(())
    }
}
