use std::path::PathBuf;

use chrono::Utc;
use clap::Subcommand;
use studybot_core::quiz::option_for_reaction;
use studybot_core::{AnswerOutcome, ChannelId, MessageId, Quiz, QuizEngine, UserId};

use super::{open, print_json, CliResult};
use crate::console::ConsolePlatform;

#[derive(Subcommand)]
pub enum QuizAction {
    /// Post a random question to a channel
    Start {
        #[arg(long)]
        channel: ChannelId,
    },
    /// Record a user's answer to a posted quiz
    Answer {
        #[arg(long)]
        message: MessageId,
        #[arg(long)]
        user: UserId,
        /// Chosen option, 1-based
        #[arg(long, conflicts_with = "reaction", required_unless_present = "reaction")]
        option: Option<usize>,
        /// Reaction emoji instead of an option number
        #[arg(long)]
        reaction: Option<String>,
    },
    /// List quizzes still open for answers
    List,
    /// Remove expired quizzes now
    Sweep,
    /// A user's correct-answer rate
    Report {
        #[arg(long)]
        user: UserId,
    },
    /// Add one question to the bank
    Add {
        #[arg(long)]
        question: String,
        /// Answer options, in order (at most 4)
        #[arg(long = "option", required = true)]
        options: Vec<String>,
        /// Correct option, 1-based
        #[arg(long)]
        answer: usize,
    },
    /// Seed an empty bank from a JSON file
    Import { path: PathBuf },
    /// Post quizzes to the configured broadcast channels now
    Broadcast,
}

pub fn run(action: QuizAction) -> CliResult {
    let (config, db) = open()?;
    let platform = ConsolePlatform;
    let engine = QuizEngine::new(&db, &platform).with_validity_hours(config.quiz.validity_hours);
    let now = Utc::now();

    match action {
        QuizAction::Start { channel } => {
            print_json(&engine.start_quiz(channel, now)?)?;
        }
        QuizAction::Answer {
            message,
            user,
            option,
            reaction,
        } => {
            let index = match (option, reaction) {
                (Some(n), _) => n.checked_sub(1),
                (None, Some(emoji)) => option_for_reaction(&emoji),
                (None, None) => None,
            };
            let outcome = match index {
                Some(index) => engine.record_answer(message, user, index, now)?,
                None => AnswerOutcome::Ignored,
            };
            match outcome {
                AnswerOutcome::Ignored => println!("{{\"type\": \"answer_ignored\"}}"),
                AnswerOutcome::Recorded { events, .. } => print_json(&events)?,
            }
        }
        QuizAction::List => {
            print_json(&engine.active_quizzes()?)?;
        }
        QuizAction::Sweep => {
            print_json(&engine.sweep(now)?)?;
        }
        QuizAction::Report { user } => match engine.accuracy_report(user)? {
            Some(report) => {
                eprintln!("{}", report.describe(user));
                print_json(&report)?;
            }
            None => {
                eprintln!("You haven't answered any quizzes yet.");
                println!("null");
            }
        },
        QuizAction::Add {
            question,
            options,
            answer,
        } => {
            let quiz = Quiz {
                id: 0,
                question,
                options,
                answer: answer.checked_sub(1).ok_or("answer is 1-based")?,
            };
            let id = engine.add_quiz(&quiz)?;
            print_json(&serde_json::json!({ "id": id }))?;
        }
        QuizAction::Import { path } => {
            let count = engine.import_bank(&path)?;
            print_json(&serde_json::json!({ "imported": count }))?;
        }
        QuizAction::Broadcast => {
            print_json(&engine.broadcast(&config.quiz.broadcast_channels, now))?;
        }
    }
    Ok(())
}
