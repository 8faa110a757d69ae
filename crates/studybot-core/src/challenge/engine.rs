use chrono::{DateTime, Duration, FixedOffset, Utc};
use uuid::Uuid;

use super::{
    channel_name, completed_notice, invite_text, started_notice, welcome_notice, Challenge,
};
use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;
use crate::ids::{ChannelId, UserId};
use crate::platform::{delivery_failed, notify_channel, notify_user, Member, Notice, Platform};
use crate::session::SessionLedger;
use crate::storage::Database;

/// What one sweep pass did with an expired challenge.
enum Teardown {
    Ended(Vec<UserId>),
    Purged,
    Deferred,
}

pub struct ChallengeEngine<'a> {
    db: &'a Database,
    platform: &'a dyn Platform,
    offset: FixedOffset,
}

impl<'a> ChallengeEngine<'a> {
    pub fn new(db: &'a Database, platform: &'a dyn Platform, offset: FixedOffset) -> Self {
        Self {
            db,
            platform,
            offset,
        }
    }

    fn ledger(&self) -> SessionLedger<'a> {
        SessionLedger::new(self.db, self.offset)
    }

    pub fn challenges(&self) -> Result<Vec<Challenge>> {
        self.db.challenges()
    }

    /// Start a challenge from `origin` for `minutes` minutes.
    ///
    /// Every participant is resolved and checked against the running
    /// challenges before anything is created.
    ///
    /// # Errors
    /// - `Validation` for a non-positive duration or no participants
    /// - `EntityNotFound` if a participant is not a member
    /// - `AlreadyInChallenge` if a participant is in another challenge
    /// - `DeliveryFailed` if the channel or the announcement cannot be created
    pub fn start_challenge(
        &self,
        origin: ChannelId,
        minutes: i64,
        participants: &[UserId],
        now: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        if minutes <= 0 {
            return Err(ValidationError::InvalidValue {
                field: "duration".into(),
                message: "must be at least one minute".into(),
            }
            .into());
        }
        let end_time = Duration::try_minutes(minutes)
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "duration".into(),
                message: format!("{minutes} minutes is out of range"),
            })?;

        let mut ids: Vec<UserId> = Vec::with_capacity(participants.len());
        for user in participants {
            if !ids.contains(user) {
                ids.push(*user);
            }
        }
        if ids.is_empty() {
            return Err(ValidationError::EmptyCollection("participants".into()).into());
        }

        let mut members: Vec<Member> = Vec::with_capacity(ids.len());
        for &user in &ids {
            let member = self
                .platform
                .member(user)?
                .ok_or_else(|| CoreError::not_found("member", user))?;
            if self.db.challenge_with_participant(user)?.is_some() {
                return Err(CoreError::AlreadyInChallenge { user });
            }
            members.push(member);
        }

        let id = Uuid::new_v4().to_string();
        let channel = self
            .platform
            .create_private_channel(&channel_name(&id), &ids)
            .map_err(|e| delivery_failed("channel creation", e))?;
        tracing::info!(challenge = %id, channel = %channel, participants = ids.len(), "challenge channel created");

        let invite = match self.platform.create_invite(channel) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(channel = %channel, "invite creation failed: {e}");
                None
            }
        };

        let mut events = Vec::new();
        let mut checked_in = Vec::new();
        let ledger = self.ledger();
        for member in members.iter().filter(|m| !m.is_bot) {
            if let Some(url) = &invite {
                events.extend(notify_user(
                    self.platform,
                    member.id,
                    &Notice::text(invite_text(url)),
                    now,
                ));
            }
            match ledger.check_in(member.id, channel, now) {
                Ok(event) => {
                    checked_in.push(member.id);
                    events.push(event);
                }
                Err(e) => tracing::warn!(user = %member.id, "auto check-in failed: {e}"),
            }
        }

        let message = match self
            .platform
            .send_to_channel(origin, &started_notice(channel, minutes, &ids))
        {
            Ok(message) => message,
            Err(e) => {
                self.roll_back(channel, &checked_in, now);
                return Err(delivery_failed(format!("channel:{origin}"), e));
            }
        };
        events.extend(notify_channel(
            self.platform,
            channel,
            &welcome_notice(channel, minutes, &ids),
            now,
        ));

        let challenge = Challenge {
            id: id.clone(),
            channel_id: channel,
            original_channel_id: Some(origin),
            message_id: message,
            end_time,
            participants: ids.clone(),
        };
        self.db.insert_challenge(&challenge)?;
        tracing::info!(challenge = %id, end_time = %challenge.end_time, "challenge started");

        events.insert(
            0,
            Event::ChallengeStarted {
                id,
                channel,
                participants: ids,
                end_time: challenge.end_time,
                at: now,
            },
        );
        Ok(events)
    }

    /// Undo a half-started challenge. Failures are only logged.
    fn roll_back(&self, channel: ChannelId, checked_in: &[UserId], now: DateTime<Utc>) {
        let ledger = self.ledger();
        for &user in checked_in {
            if let Err(e) = ledger.check_out(user, channel, now) {
                tracing::warn!(user = %user, "rollback check-out failed: {e}");
            }
        }
        if let Err(e) = self.platform.delete_channel(channel) {
            tracing::warn!(channel = %channel, "rollback channel delete failed: {e}");
        }
    }

    /// Tear down every challenge whose end time has passed.
    ///
    /// Each step tolerates the effects of an earlier, interrupted pass, so a
    /// challenge that fails here is simply retried on the next sweep.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        for challenge in self.db.expired_challenges(now)? {
            let id = challenge.id.clone();
            let channel = challenge.channel_id;
            match self.teardown(&challenge, now) {
                Ok(Teardown::Ended(checked_out)) => events.push(Event::ChallengeEnded {
                    id,
                    channel,
                    checked_out,
                    at: now,
                }),
                Ok(Teardown::Purged) => events.push(Event::ChallengePurged {
                    id,
                    channel,
                    at: now,
                }),
                Ok(Teardown::Deferred) => events.push(Event::ChallengeDeferred { id, at: now }),
                Err(e) => tracing::warn!(challenge = %id, "challenge teardown failed: {e}"),
            }
        }
        Ok(events)
    }

    fn teardown(&self, challenge: &Challenge, now: DateTime<Utc>) -> Result<Teardown> {
        let Some(origin) = challenge.original_channel_id else {
            self.delete_channel(challenge.channel_id)?;
            self.db.delete_challenge(&challenge.id)?;
            tracing::info!(challenge = %challenge.id, "purged challenge without origin channel");
            return Ok(Teardown::Purged);
        };

        match self.platform.message_exists(origin, challenge.message_id) {
            Ok(true) => {}
            Ok(false) => return Ok(self.defer(challenge)),
            Err(e) if e.is_not_found() => return Ok(self.defer(challenge)),
            Err(e) => return Err(e.into()),
        }
        match self.platform.edit_message(
            origin,
            challenge.message_id,
            &completed_notice(&challenge.participants),
        ) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(self.defer(challenge)),
            Err(e) => return Err(e.into()),
        }

        let checked_out = self.check_out_participants(challenge, now);
        self.delete_channel(challenge.channel_id)?;
        self.db.delete_challenge(&challenge.id)?;
        tracing::info!(challenge = %challenge.id, checked_out = checked_out.len(), "challenge ended");
        Ok(Teardown::Ended(checked_out))
    }

    fn defer(&self, challenge: &Challenge) -> Teardown {
        tracing::info!(challenge = %challenge.id, "announcement missing, deferring teardown");
        Teardown::Deferred
    }

    /// Check out every non-bot participant still in the guild, keyed on the
    /// challenge channel. Participants already checked out are skipped.
    fn check_out_participants(&self, challenge: &Challenge, now: DateTime<Utc>) -> Vec<UserId> {
        let ledger = self.ledger();
        let mut checked_out = Vec::new();
        for &user in &challenge.participants {
            match self.platform.member(user) {
                Ok(Some(member)) if !member.is_bot => {}
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(user = %user, "member lookup failed: {e}");
                    continue;
                }
            }
            match ledger.check_out(user, challenge.channel_id, now) {
                Ok(_) => checked_out.push(user),
                Err(CoreError::NotCheckedIn) => {}
                Err(e) => tracing::warn!(user = %user, "auto check-out failed: {e}"),
            }
        }
        checked_out
    }

    /// Delete a channel; one that is already gone counts as deleted.
    fn delete_channel(&self, channel: ChannelId) -> Result<()> {
        match self.platform.delete_channel(channel) {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::debug!(channel = %channel, "challenge channel already gone");
                Ok(())
            }
            Err(e) => Err(delivery_failed(format!("channel:{channel}"), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::MessageId;
    use crate::platform::MemoryPlatform;
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, 14, 0, 0).unwrap()
    }

    fn setup() -> (Database, MemoryPlatform) {
        let db = Database::open_memory().unwrap();
        let platform = MemoryPlatform::new();
        platform.add_channel(ChannelId(1), "general");
        platform.add_member(UserId(1), "ana", false);
        platform.add_member(UserId(2), "ben", false);
        (db, platform)
    }

    #[test]
    fn rejects_non_positive_duration() {
        let (db, platform) = setup();
        let engine = ChallengeEngine::new(&db, &platform, utc());
        let err = engine
            .start_challenge(ChannelId(1), 0, &[UserId(1)], t0())
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(platform.created_channels().is_empty());
    }

    #[test]
    fn rejects_out_of_range_duration_before_side_effects() {
        let (db, platform) = setup();
        let engine = ChallengeEngine::new(&db, &platform, utc());
        let err = engine
            .start_challenge(ChannelId(1), 10_000_000_000_000, &[UserId(1)], t0())
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(platform.created_channels().is_empty());
        assert!(engine.challenges().unwrap().is_empty());
        assert!(db.sessions_for_user(UserId(1)).unwrap().is_empty());
    }

    #[test]
    fn unknown_member_is_not_found() {
        let (db, platform) = setup();
        let engine = ChallengeEngine::new(&db, &platform, utc());
        let err = engine
            .start_challenge(ChannelId(1), 30, &[UserId(1), UserId(99)], t0())
            .unwrap_err();
        assert!(matches!(err, CoreError::EntityNotFound { kind: "member", .. }));
        assert!(platform.created_channels().is_empty());
    }

    #[test]
    fn failed_announcement_rolls_back() {
        let (db, platform) = setup();
        let engine = ChallengeEngine::new(&db, &platform, utc());
        let err = engine
            .start_challenge(ChannelId(404), 30, &[UserId(1)], t0())
            .unwrap_err();
        assert!(matches!(err, CoreError::DeliveryFailed { .. }));

        let created = platform.created_channels();
        assert_eq!(created.len(), 1);
        assert_eq!(platform.deleted_channels(), created);
        assert!(db.challenges().unwrap().is_empty());
        let session = db.session(UserId(1), created[0]).unwrap().unwrap();
        assert!(!session.is_checked_in());
    }

    #[test]
    fn legacy_record_is_purged_without_notice() {
        let (db, platform) = setup();
        let channel = platform.create_private_channel("old", &[UserId(1)]).unwrap();
        db.insert_challenge(&Challenge {
            id: "legacy".into(),
            channel_id: channel,
            original_channel_id: None,
            message_id: MessageId(1),
            end_time: t0(),
            participants: vec![UserId(1)],
        })
        .unwrap();

        let engine = ChallengeEngine::new(&db, &platform, utc());
        let events = engine.sweep(t0() + Duration::minutes(1)).unwrap();
        assert!(matches!(events[..], [Event::ChallengePurged { .. }]));
        assert!(db.challenges().unwrap().is_empty());
        assert!(!platform.has_channel(channel));
        assert!(platform.channel_messages(ChannelId(1)).is_empty());
    }
}
