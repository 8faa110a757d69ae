//! In-memory [`Platform`] that records every interaction.
//!
//! Used by the test suites and for dry runs. Failures can be injected per
//! user or per channel to exercise the sweep error paths.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::{Member, Notice, Platform, PlatformError};
use crate::ids::{ChannelId, MessageId, UserId};

#[derive(Debug, Default)]
struct Channel {
    name: String,
    members: Vec<UserId>,
    messages: BTreeMap<MessageId, Notice>,
    reactions: HashMap<MessageId, Vec<String>>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    members: HashMap<UserId, Member>,
    channels: BTreeMap<ChannelId, Channel>,
    direct: Vec<(UserId, Notice)>,
    unreachable: HashSet<UserId>,
    created_channels: Vec<ChannelId>,
    deleted_channels: Vec<ChannelId>,
    failing_deletes: HashSet<ChannelId>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Records channels, messages and direct messages in memory.
#[derive(Debug)]
pub struct MemoryPlatform {
    state: Mutex<State>,
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1_000,
                ..State::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Fixture setup ───────────────────────────────────────────────

    pub fn add_member(&self, id: UserId, name: &str, is_bot: bool) {
        self.lock().members.insert(
            id,
            Member {
                id,
                display_name: name.to_string(),
                is_bot,
            },
        );
    }

    pub fn remove_member(&self, id: UserId) {
        self.lock().members.remove(&id);
    }

    pub fn add_channel(&self, id: ChannelId, name: &str) {
        self.lock().channels.insert(
            id,
            Channel {
                name: name.to_string(),
                ..Channel::default()
            },
        );
    }

    /// Direct messages to this user fail from now on.
    pub fn make_unreachable(&self, user: UserId) {
        self.lock().unreachable.insert(user);
    }

    /// Deleting this channel fails with `Unreachable` from now on.
    pub fn fail_deletes_of(&self, channel: ChannelId) {
        self.lock().failing_deletes.insert(channel);
    }

    pub fn allow_deletes_of(&self, channel: ChannelId) {
        self.lock().failing_deletes.remove(&channel);
    }

    /// Drop a message as if a moderator purged it.
    pub fn purge_message(&self, channel: ChannelId, message: MessageId) {
        if let Some(ch) = self.lock().channels.get_mut(&channel) {
            ch.messages.remove(&message);
        }
    }

    // ── Inspection ──────────────────────────────────────────────────

    pub fn direct_messages(&self, user: UserId) -> Vec<Notice> {
        self.lock()
            .direct
            .iter()
            .filter(|(to, _)| *to == user)
            .map(|(_, n)| n.clone())
            .collect()
    }

    pub fn direct_message_count(&self) -> usize {
        self.lock().direct.len()
    }

    pub fn channel_messages(&self, channel: ChannelId) -> Vec<Notice> {
        self.lock()
            .channels
            .get(&channel)
            .map(|ch| ch.messages.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn message(&self, channel: ChannelId, message: MessageId) -> Option<Notice> {
        self.lock()
            .channels
            .get(&channel)
            .and_then(|ch| ch.messages.get(&message).cloned())
    }

    pub fn reactions(&self, channel: ChannelId, message: MessageId) -> Vec<String> {
        self.lock()
            .channels
            .get(&channel)
            .and_then(|ch| ch.reactions.get(&message).cloned())
            .unwrap_or_default()
    }

    pub fn has_channel(&self, channel: ChannelId) -> bool {
        self.lock().channels.contains_key(&channel)
    }

    pub fn channel_members(&self, channel: ChannelId) -> Vec<UserId> {
        self.lock()
            .channels
            .get(&channel)
            .map(|ch| ch.members.clone())
            .unwrap_or_default()
    }

    pub fn channel_name(&self, channel: ChannelId) -> Option<String> {
        self.lock().channels.get(&channel).map(|ch| ch.name.clone())
    }

    pub fn created_channels(&self) -> Vec<ChannelId> {
        self.lock().created_channels.clone()
    }

    pub fn deleted_channels(&self) -> Vec<ChannelId> {
        self.lock().deleted_channels.clone()
    }
}

impl Platform for MemoryPlatform {
    fn member(&self, user: UserId) -> Result<Option<Member>, PlatformError> {
        Ok(self.lock().members.get(&user).cloned())
    }

    fn send_to_user(&self, user: UserId, notice: &Notice) -> Result<(), PlatformError> {
        let mut state = self.lock();
        if state.unreachable.contains(&user) {
            return Err(PlatformError::Unreachable(format!(
                "cannot send messages to user {user}"
            )));
        }
        state.direct.push((user, notice.clone()));
        Ok(())
    }

    fn send_to_channel(
        &self,
        channel: ChannelId,
        notice: &Notice,
    ) -> Result<MessageId, PlatformError> {
        let mut state = self.lock();
        let id = MessageId(state.next_id());
        let ch = state
            .channels
            .get_mut(&channel)
            .ok_or_else(|| PlatformError::NotFound(format!("channel {channel}")))?;
        ch.messages.insert(id, notice.clone());
        Ok(id)
    }

    fn create_private_channel(
        &self,
        name: &str,
        members: &[UserId],
    ) -> Result<ChannelId, PlatformError> {
        let mut state = self.lock();
        let id = ChannelId(state.next_id());
        state.channels.insert(
            id,
            Channel {
                name: name.to_string(),
                members: members.to_vec(),
                ..Channel::default()
            },
        );
        state.created_channels.push(id);
        Ok(id)
    }

    fn create_invite(&self, channel: ChannelId) -> Result<String, PlatformError> {
        if !self.has_channel(channel) {
            return Err(PlatformError::NotFound(format!("channel {channel}")));
        }
        Ok(format!("https://chat.invalid/invite/{channel}"))
    }

    fn message_exists(&self, channel: ChannelId, message: MessageId) -> Result<bool, PlatformError> {
        let state = self.lock();
        let ch = state
            .channels
            .get(&channel)
            .ok_or_else(|| PlatformError::NotFound(format!("channel {channel}")))?;
        Ok(ch.messages.contains_key(&message))
    }

    fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        notice: &Notice,
    ) -> Result<(), PlatformError> {
        let mut state = self.lock();
        let slot = state
            .channels
            .get_mut(&channel)
            .and_then(|ch| ch.messages.get_mut(&message))
            .ok_or_else(|| PlatformError::NotFound(format!("message {message}")))?;
        *slot = notice.clone();
        Ok(())
    }

    fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError> {
        let mut state = self.lock();
        if state.failing_deletes.contains(&channel) {
            return Err(PlatformError::Unreachable(format!(
                "missing permission to delete channel {channel}"
            )));
        }
        match state.channels.remove(&channel) {
            Some(_) => {
                state.deleted_channels.push(channel);
                Ok(())
            }
            None => Err(PlatformError::NotFound(format!("channel {channel}"))),
        }
    }

    fn add_reactions(
        &self,
        channel: ChannelId,
        message: MessageId,
        reactions: &[&str],
    ) -> Result<(), PlatformError> {
        let mut state = self.lock();
        let ch = state
            .channels
            .get_mut(&channel)
            .ok_or_else(|| PlatformError::NotFound(format!("channel {channel}")))?;
        if !ch.messages.contains_key(&message) {
            return Err(PlatformError::NotFound(format!("message {message}")));
        }
        ch.reactions
            .entry(message)
            .or_default()
            .extend(reactions.iter().map(|r| r.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_lifecycle() {
        let p = MemoryPlatform::new();
        let ch = p.create_private_channel("room", &[UserId(1)]).unwrap();
        let msg = p.send_to_channel(ch, &Notice::text("hi")).unwrap();
        assert!(p.message_exists(ch, msg).unwrap());
        p.edit_message(ch, msg, &Notice::text("bye")).unwrap();
        assert_eq!(p.message(ch, msg).unwrap().description, "bye");
        p.delete_channel(ch).unwrap();
        assert!(p.delete_channel(ch).unwrap_err().is_not_found());
        assert_eq!(p.deleted_channels(), vec![ch]);
    }

    #[test]
    fn unreachable_users_fail_delivery() {
        let p = MemoryPlatform::new();
        p.make_unreachable(UserId(3));
        assert!(p.send_to_user(UserId(3), &Notice::text("x")).is_err());
        assert!(p.send_to_user(UserId(4), &Notice::text("x")).is_ok());
        assert_eq!(p.direct_message_count(), 1);
    }
}
