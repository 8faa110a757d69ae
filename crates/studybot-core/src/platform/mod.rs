//! The chat platform the engines talk to.
//!
//! Everything that leaves the process (direct messages, channel posts,
//! channel creation and deletion, reactions) goes through [`Platform`].
//! Implementations are stateless from the engines' point of view; all
//! durable state lives in the [`Database`](crate::storage::Database).

mod memory;
mod notice;

pub use memory::MemoryPlatform;
pub use notice::{Notice, NoticeField};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::CoreError;
use crate::events::Event;
use crate::ids::{ChannelId, MessageId, UserId};

/// A guild member as seen by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: UserId,
    pub display_name: String,
    /// Automated accounts get no invites and no automatic check-ins.
    pub is_bot: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// Channel, message or user no longer exists.
    #[error("{0} not found")]
    NotFound(String),

    /// The platform refused or could not complete the request.
    #[error("{0}")]
    Unreachable(String),
}

impl PlatformError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound(_))
    }
}

impl From<PlatformError> for CoreError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::NotFound(what) => CoreError::EntityNotFound {
                kind: "platform object",
                id: what,
            },
            PlatformError::Unreachable(reason) => CoreError::DeliveryFailed {
                target: "platform".into(),
                reason,
            },
        }
    }
}

/// Outbound side of the chat platform.
pub trait Platform: Send + Sync {
    /// Look up a guild member. `Ok(None)` if the user is not (or no longer) a member.
    fn member(&self, user: UserId) -> Result<Option<Member>, PlatformError>;

    /// Send a private message.
    fn send_to_user(&self, user: UserId, notice: &Notice) -> Result<(), PlatformError>;

    /// Post to a channel, returning the new message's id.
    fn send_to_channel(&self, channel: ChannelId, notice: &Notice)
        -> Result<MessageId, PlatformError>;

    /// Create a text channel readable only by `members` and the bot itself.
    fn create_private_channel(
        &self,
        name: &str,
        members: &[UserId],
    ) -> Result<ChannelId, PlatformError>;

    /// Create an invite link for a channel.
    fn create_invite(&self, channel: ChannelId) -> Result<String, PlatformError>;

    /// Whether a message can still be located.
    fn message_exists(&self, channel: ChannelId, message: MessageId) -> Result<bool, PlatformError>;

    fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        notice: &Notice,
    ) -> Result<(), PlatformError>;

    /// Delete a channel. `NotFound` if it is already gone.
    fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError>;

    fn add_reactions(
        &self,
        channel: ChannelId,
        message: MessageId,
        reactions: &[&str],
    ) -> Result<(), PlatformError>;
}

/// Send a private message; a failure is logged and reported as an event
/// instead of aborting the caller.
pub(crate) fn notify_user(
    platform: &dyn Platform,
    user: UserId,
    notice: &Notice,
    at: DateTime<Utc>,
) -> Option<Event> {
    match platform.send_to_user(user, notice) {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!(user = %user, "direct message failed: {e}");
            Some(Event::NotificationFailed {
                target: format!("user:{user}"),
                reason: e.to_string(),
                at,
            })
        }
    }
}

/// Channel counterpart of [`notify_user`].
pub(crate) fn notify_channel(
    platform: &dyn Platform,
    channel: ChannelId,
    notice: &Notice,
    at: DateTime<Utc>,
) -> Option<Event> {
    match platform.send_to_channel(channel, notice) {
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(channel = %channel, "channel post failed: {e}");
            Some(Event::NotificationFailed {
                target: format!("channel:{channel}"),
                reason: e.to_string(),
                at,
            })
        }
    }
}

/// Wrap a platform failure as `DeliveryFailed` for a named target.
pub(crate) fn delivery_failed(target: impl std::fmt::Display, err: PlatformError) -> CoreError {
    CoreError::DeliveryFailed {
        target: target.to_string(),
        reason: err.to_string(),
    }
}
