//! Time-boxed group study challenges in a private channel.

mod engine;

pub use engine::ChallengeEngine;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, MessageId, UserId};
use crate::platform::Notice;

const STARTED_COLOR: u32 = 0x3498db;
const COMPLETED_COLOR: u32 = 0x2ecc71;

/// A running challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    /// The private channel created for the challenge.
    pub channel_id: ChannelId,
    /// Where the challenge was started. Absent on legacy records.
    pub original_channel_id: Option<ChannelId>,
    /// Announcement in the original channel, edited on completion.
    pub message_id: MessageId,
    pub end_time: DateTime<Utc>,
    pub participants: Vec<UserId>,
}

impl Challenge {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_time < now
    }
}

pub fn channel_name(id: &str) -> String {
    format!("study-challenge-{id}")
}

fn mentions(users: &[UserId], sep: &str) -> String {
    users
        .iter()
        .map(|u| u.mention())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Announcement posted in the initiating channel.
pub(crate) fn started_notice(channel: ChannelId, minutes: i64, participants: &[UserId]) -> Notice {
    Notice::card(
        "📚🚀 Study Challenge Started! 🚀📚",
        format!("🎯 The study challenge will end in {minutes} minutes. Good luck! 🍀"),
        STARTED_COLOR,
    )
    .field("📖 Channel 📖", channel.mention())
    .field("⏱️ Duration ⏱️", format!("{minutes} minutes"))
    .field("👥 Participants 👥", mentions(participants, ", "))
    .footer("🔥 Let's get this study party started! 🔥")
}

/// The same announcement with study tips, posted inside the challenge channel.
pub(crate) fn welcome_notice(channel: ChannelId, minutes: i64, participants: &[UserId]) -> Notice {
    let mut notice = started_notice(channel, minutes, participants);
    let footer = notice.footer.take();
    notice = notice.block_field(
        "📝 Study Tips 📝",
        "1️⃣ Set clear goals for this study session.\n\
         2️⃣ Avoid distractions - put your phone away!\n\
         3️⃣ Take short breaks if needed.\n\
         4️⃣ Stay hydrated and have a healthy snack if you're hungry.\n\
         5️⃣ Remember, quality over quantity. Focus is key! 🗝️",
    );
    notice.footer = footer;
    notice
}

pub(crate) fn completed_notice(participants: &[UserId]) -> Notice {
    let names = if participants.is_empty() {
        "No participants".to_string()
    } else {
        mentions(participants, " ")
    };
    Notice::card(
        "🎉🎉🎉 Study Challenge Completed! 🎉🎉🎉",
        "👏 Congratulations on completing the study challenge! You should be proud of your hard \
         work. Remember, every minute you spend studying brings you one step closer to your goals. \
         Keep up the great work! 🌟",
        COMPLETED_COLOR,
    )
    .field("🏆 Participants 🏆", names)
    .footer("🔥 Keep the fire of learning burning! 🔥")
}

pub(crate) fn invite_text(url: &str) -> String {
    format!("You've been invited to a study challenge! Join here: {url}")
}
