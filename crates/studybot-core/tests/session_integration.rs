//! Integration tests for the session ledger and the daily/weekly aggregator.
//!
//! Covers the check-in/check-out cycle, goal handling, the daily reset and
//! level computation against an in-memory database.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use studybot_core::{
    Aggregator, ChannelId, CoreError, Database, Event, LeaderboardScope, MemoryPlatform,
    SessionLedger, UserId,
};

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

fn monday_9am() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap()
}

#[test]
fn test_check_in_check_out_books_elapsed_time() {
    let db = Database::open_memory().unwrap();
    let ledger = SessionLedger::new(&db, utc());
    let (user, channel) = (UserId(1), ChannelId(10));

    ledger.check_in(user, channel, monday_9am()).unwrap();
    let summary = ledger
        .check_out(user, channel, monday_9am() + Duration::seconds(1800))
        .unwrap();
    assert_eq!(summary.elapsed_secs, 1800.0);

    let session = db.session(user, channel).unwrap().unwrap();
    assert_eq!(session.total_study_time, 1800.0);
    assert_eq!(session.daily_study_time, 1800.0);
    assert!(session.check_in_time.is_none());

    let day = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
    let record = db.daily_record(user, channel, day).unwrap().unwrap();
    assert_eq!(record.study_time_this_day, 1800.0);

    // Second check-out without a check-in.
    let err = ledger
        .check_out(user, channel, monday_9am() + Duration::hours(1))
        .unwrap_err();
    assert!(matches!(err, CoreError::NotCheckedIn));
}

#[test]
fn test_double_check_in_is_rejected() {
    let db = Database::open_memory().unwrap();
    let ledger = SessionLedger::new(&db, utc());

    ledger.check_in(UserId(1), ChannelId(10), monday_9am()).unwrap();
    let err = ledger
        .check_in(UserId(1), ChannelId(10), monday_9am() + Duration::minutes(1))
        .unwrap_err();
    assert!(matches!(err, CoreError::AlreadyCheckedIn));

    // The original check-in time is kept.
    let session = db.session(UserId(1), ChannelId(10)).unwrap().unwrap();
    assert_eq!(session.check_in_time, Some(monday_9am()));

    // Other channels are independent.
    ledger.check_in(UserId(1), ChannelId(11), monday_9am()).unwrap();
}

#[test]
fn test_goal_minimum_is_ten_minutes() {
    let db = Database::open_memory().unwrap();
    let ledger = SessionLedger::new(&db, utc());

    let err = ledger
        .set_goal(UserId(1), ChannelId(10), 9, monday_9am())
        .unwrap_err();
    assert!(matches!(err, CoreError::GoalTooSmall { minutes: 9, min: 10 }));

    ledger.set_goal(UserId(1), ChannelId(10), 10, monday_9am()).unwrap();
    let session = db.session(UserId(1), ChannelId(10)).unwrap().unwrap();
    assert_eq!(session.goal, Some(600));

    // Overwrites the previous goal.
    ledger.set_goal(UserId(1), ChannelId(10), 45, monday_9am()).unwrap();
    let session = db.session(UserId(1), ChannelId(10)).unwrap().unwrap();
    assert_eq!(session.goal, Some(2700));
}

#[test]
fn test_daily_reset_keeps_totals_and_open_check_ins() {
    let db = Database::open_memory().unwrap();
    let ledger = SessionLedger::new(&db, utc());
    let aggregator = Aggregator::new(&db, utc());

    ledger.check_in(UserId(1), ChannelId(10), monday_9am()).unwrap();
    ledger
        .check_out(UserId(1), ChannelId(10), monday_9am() + Duration::hours(1))
        .unwrap();
    ledger
        .check_in(UserId(1), ChannelId(10), monday_9am() + Duration::hours(2))
        .unwrap();

    let tuesday = Utc.with_ymd_and_hms(2024, 5, 7, 0, 0, 0).unwrap();
    let event = aggregator.daily_reset(tuesday).unwrap();
    assert!(matches!(event, Event::DailyReset { sessions: 1, records: 1, .. }));

    let session = db.session(UserId(1), ChannelId(10)).unwrap().unwrap();
    assert_eq!(session.daily_study_time, 0.0);
    assert_eq!(session.total_study_time, 3600.0);
    assert_eq!(session.check_in_time, Some(monday_9am() + Duration::hours(2)));

    let tuesday_date = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();
    let record = db
        .daily_record(UserId(1), ChannelId(10), tuesday_date)
        .unwrap()
        .unwrap();
    assert_eq!(record.study_time_this_day, 0.0);
}

#[test]
fn test_late_daily_reset_keeps_time_booked_that_day() {
    let db = Database::open_memory().unwrap();
    let ledger = SessionLedger::new(&db, utc());
    let aggregator = Aggregator::new(&db, utc());
    let one_am = Utc.with_ymd_and_hms(2024, 5, 6, 1, 0, 0).unwrap();

    ledger.check_in(UserId(1), ChannelId(10), one_am).unwrap();
    ledger
        .check_out(UserId(1), ChannelId(10), one_am + Duration::hours(1))
        .unwrap();

    let (start, end) = studybot_core::session::week_bounds(one_am, utc());
    assert_eq!(aggregator.weekly_total(UserId(1), start, end).unwrap(), 3600.0);

    let event = aggregator.daily_reset(one_am + Duration::hours(2)).unwrap();
    assert!(matches!(event, Event::DailyReset { sessions: 1, records: 0, .. }));

    let day = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
    let record = db.daily_record(UserId(1), ChannelId(10), day).unwrap().unwrap();
    assert_eq!(record.study_time_this_day, 3600.0);
    assert_eq!(aggregator.weekly_total(UserId(1), start, end).unwrap(), 3600.0);
}

#[test]
fn test_weekly_total_spans_monday_to_sunday() {
    let db = Database::open_memory().unwrap();
    let ledger = SessionLedger::new(&db, utc());
    let aggregator = Aggregator::new(&db, utc());

    // Sunday before, Monday, Sunday after.
    for day in [5, 6, 12] {
        let start = Utc.with_ymd_and_hms(2024, 5, day, 10, 0, 0).unwrap();
        ledger.check_in(UserId(1), ChannelId(10), start).unwrap();
        ledger
            .check_out(UserId(1), ChannelId(10), start + Duration::minutes(30))
            .unwrap();
    }

    let monday = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
    let sunday = NaiveDate::from_ymd_opt(2024, 5, 12).unwrap();
    assert_eq!(
        aggregator.weekly_total(UserId(1), monday, sunday).unwrap(),
        3600.0
    );

    let report = aggregator
        .report(UserId(1), Utc.with_ymd_and_hms(2024, 5, 9, 12, 0, 0).unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(report.weekly_study_time, 3600.0);
    assert_eq!(report.total_study_time, 5400.0);
}

#[test]
fn test_compute_level_is_idempotent() {
    let db = Database::open_memory().unwrap();
    let ledger = SessionLedger::new(&db, utc());
    let aggregator = Aggregator::new(&db, utc());

    ledger.check_in(UserId(1), ChannelId(10), monday_9am()).unwrap();
    ledger
        .check_out(UserId(1), ChannelId(10), monday_9am() + Duration::minutes(400))
        .unwrap();

    let first = aggregator.compute_level(UserId(1), monday_9am()).unwrap();
    let second = aggregator.compute_level(UserId(1), monday_9am()).unwrap();
    assert_eq!(first, second);
    // 400 minutes -> 200 xp -> level 2.
    assert_eq!(first.xp, 200.0);
    assert_eq!(first.level, 2);
    assert_eq!(db.user_level(UserId(1)).unwrap(), Some(first));
}

#[test]
fn test_report_for_unknown_user_is_none() {
    let db = Database::open_memory().unwrap();
    let aggregator = Aggregator::new(&db, utc());
    assert!(aggregator.report(UserId(99), monday_9am()).unwrap().is_none());
}

#[test]
fn test_leaderboards_channel_and_server() {
    let db = Database::open_memory().unwrap();
    let ledger = SessionLedger::new(&db, utc());
    let aggregator = Aggregator::new(&db, utc());

    let study = |user: u64, channel: u64, minutes: i64| {
        ledger
            .check_in(UserId(user), ChannelId(channel), monday_9am())
            .unwrap();
        ledger
            .check_out(
                UserId(user),
                ChannelId(channel),
                monday_9am() + Duration::minutes(minutes),
            )
            .unwrap();
    };
    study(1, 10, 30);
    study(2, 10, 60);
    study(1, 11, 45);

    let channel = aggregator
        .leaderboard(LeaderboardScope::Channel(ChannelId(10)), 100)
        .unwrap();
    assert_eq!(channel[0].user, UserId(2));
    assert_eq!(channel[1].user, UserId(1));

    let server = aggregator.leaderboard(LeaderboardScope::Server, 100).unwrap();
    assert_eq!(server[0].user, UserId(1));
    assert_eq!(server[0].total_study_time, 4500.0);

    let top1 = aggregator.leaderboard(LeaderboardScope::Server, 1).unwrap();
    assert_eq!(top1.len(), 1);
}

#[test]
fn test_progress_reports_skip_departed_members() {
    let db = Database::open_memory().unwrap();
    let platform = MemoryPlatform::new();
    platform.add_member(UserId(1), "ana", false);
    platform.add_member(UserId(3), "cy", false);
    platform.make_unreachable(UserId(3));

    let ledger = SessionLedger::new(&db, utc());
    for user in [1, 2, 3] {
        ledger.check_in(UserId(user), ChannelId(10), monday_9am()).unwrap();
        ledger
            .check_out(UserId(user), ChannelId(10), monday_9am() + Duration::minutes(61))
            .unwrap();
    }

    let events = Aggregator::new(&db, utc())
        .send_progress_reports(&platform, monday_9am())
        .unwrap();
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::ProgressReported { user: UserId(1), .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::NotificationFailed { .. })));
    assert_eq!(
        platform.direct_messages(UserId(1))[0].description,
        "Your total study time is: 1 H, 1 m"
    );
    assert!(platform.direct_messages(UserId(2)).is_empty());
}
