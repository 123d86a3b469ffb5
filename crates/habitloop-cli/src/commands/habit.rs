//! Habit management commands for CLI.

use clap::{Args, Subcommand};
use habitloop_core::recurrence::{parse_period, parse_time, parse_weekly_slots, parse_window};
use habitloop_core::{
    ActiveWindow, Database, Habit, HabitDraft, HabitId, HabitPatch, Recurrence, RecurringInterval,
    ValidationError,
};
use serde::Serialize;

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a habit
    Add {
        /// The action, e.g. "practice kata"
        operation: String,
        #[command(flatten)]
        fields: HabitFields,
        #[command(flatten)]
        recurrence: RecurrenceArgs,
        /// Mark as an enjoyable habit (usable as another habit's reward)
        #[arg(long)]
        enjoyable: bool,
        /// Visible to other users
        #[arg(long)]
        public: bool,
        /// Chat ID that receives reminders
        #[arg(long, allow_negative_numbers = true)]
        recipient: Option<String>,
    },
    /// List habits
    List {
        /// Only habits marked as public
        #[arg(long)]
        public: bool,
    },
    /// Show one habit
    Show {
        id: HabitId,
    },
    /// Update a habit; only the given fields change
    Update {
        id: HabitId,
        /// New action text
        #[arg(long)]
        operation: Option<String>,
        #[command(flatten)]
        fields: HabitFields,
        #[command(flatten)]
        recurrence: RecurrenceArgs,
        #[arg(long)]
        enjoyable: Option<bool>,
        #[arg(long)]
        public: Option<bool>,
        /// Clear the named fields (place, lead-time, reward, related, recurrence, window)
        #[arg(long, value_delimiter = ',')]
        clear: Vec<String>,
    },
    /// Delete a habit
    Delete {
        id: HabitId,
    },
    /// Bind the chat that receives reminders for a habit
    Recipient {
        id: HabitId,
        /// Chat ID (group chats are negative); omit with --clear to unbind
        #[arg(allow_negative_numbers = true)]
        chat_id: Option<String>,
        #[arg(long, conflicts_with = "chat_id")]
        clear: bool,
    },
}

#[derive(Args)]
pub struct HabitFields {
    /// Where the action happens
    #[arg(long)]
    place: Option<String>,
    /// Seconds the action should take (1-120)
    #[arg(long)]
    lead_time: Option<i64>,
    /// Reward after completing the habit
    #[arg(long)]
    reward: Option<String>,
    /// ID of an enjoyable habit used as the reward
    #[arg(long)]
    related: Option<HabitId>,
}

#[derive(Args)]
pub struct RecurrenceArgs {
    /// Weekly slots, e.g. "mon=14:00,fri=17:30"
    #[arg(long, conflicts_with = "every")]
    weekly: Option<String>,
    /// Interval, e.g. "3h", "90m", "1h30m"
    #[arg(long)]
    every: Option<String>,
    /// Daily active window for the interval, e.g. "21:00-06:00"
    #[arg(long, conflicts_with_all = ["from", "until"])]
    window: Option<String>,
    /// Window start (HH:MM)
    #[arg(long)]
    from: Option<String>,
    /// Window end (HH:MM)
    #[arg(long)]
    until: Option<String>,
}

impl RecurrenceArgs {
    fn window(&self) -> Result<Option<ActiveWindow>, ValidationError> {
        if let Some(text) = &self.window {
            return parse_window(text).map(Some);
        }
        let from = self.from.as_deref().map(parse_time).transpose()?;
        let until = self.until.as_deref().map(parse_time).transpose()?;
        ActiveWindow::from_bounds(from, until)
    }

    fn has_window(&self) -> bool {
        self.window.is_some() || self.from.is_some() || self.until.is_some()
    }

    /// The recurrence these flags describe, if any recurrence flag was given.
    /// A window alone is applied to `current` when that is an interval.
    fn build(&self, current: Option<&Recurrence>) -> Result<Option<Recurrence>, ValidationError> {
        if let Some(slots) = &self.weekly {
            if self.has_window() {
                return Err(ValidationError::invalid(
                    "window",
                    "an active window only applies to --every",
                ));
            }
            return Ok(Some(Recurrence::Weekly(parse_weekly_slots(slots)?)));
        }
        if let Some(period) = &self.every {
            let mut interval = RecurringInterval {
                interval_secs: parse_period(period)?,
                window: None,
                last_fired_at: None,
            };
            interval.window = match current {
                Some(Recurrence::Interval(old)) if !self.has_window() => old.window,
                _ => self.window()?,
            };
            return Ok(Some(Recurrence::Interval(interval)));
        }
        if self.has_window() {
            return match current {
                Some(Recurrence::Interval(old)) => {
                    let mut interval = old.clone();
                    interval.window = self.window()?;
                    Ok(Some(Recurrence::Interval(interval)))
                }
                _ => Err(ValidationError::invalid(
                    "window",
                    "an active window needs an interval (--every)",
                )),
            };
        }
        Ok(None)
    }
}

/// Habit as printed: the record plus its one-line description.
#[derive(Serialize)]
struct HabitView<'a> {
    description: String,
    #[serde(flatten)]
    habit: &'a Habit,
}

fn print_habit(habit: &Habit) -> Result<(), Box<dyn std::error::Error>> {
    let view = HabitView {
        description: habit.description(),
        habit,
    };
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

pub fn run(action: HabitAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        HabitAction::Add {
            operation,
            fields,
            recurrence,
            enjoyable,
            public,
            recipient,
        } => {
            let draft = HabitDraft {
                operation,
                place: fields.place,
                lead_time_secs: fields.lead_time,
                reward: fields.reward,
                related_habit: fields.related,
                is_enjoyable: enjoyable,
                is_public: public,
                recurrence: recurrence.build(None)?,
                recipient,
            };
            let habit = db.insert_habit(draft)?;
            println!("Habit created: {}", habit.id);
            print_habit(&habit)?;
        }
        HabitAction::List { public } => {
            let habits = if public {
                db.list_public_habits()?
            } else {
                db.list_habits()?
            };
            let views: Vec<_> = habits
                .iter()
                .map(|habit| HabitView {
                    description: habit.description(),
                    habit,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&views)?);
        }
        HabitAction::Show { id } => {
            let habit = db.get_habit(id)?;
            print_habit(&habit)?;
        }
        HabitAction::Update {
            id,
            operation,
            fields,
            recurrence,
            enjoyable,
            public,
            clear,
        } => {
            let current = db.get_habit(id)?;
            let mut patch = HabitPatch {
                operation,
                place: fields.place.map(Some),
                lead_time_secs: fields.lead_time.map(Some),
                reward: fields.reward.map(Some),
                related_habit: fields.related.map(Some),
                is_enjoyable: enjoyable,
                is_public: public,
                recurrence: recurrence.build(current.recurrence.as_ref())?.map(Some),
                recipient: None,
            };
            for field in &clear {
                match field.as_str() {
                    "place" => patch.place = Some(None),
                    "lead-time" | "lead_time" => patch.lead_time_secs = Some(None),
                    "reward" => patch.reward = Some(None),
                    "related" => patch.related_habit = Some(None),
                    "recurrence" => patch.recurrence = Some(None),
                    "window" => match &current.recurrence {
                        Some(Recurrence::Interval(old)) => {
                            let mut interval = old.clone();
                            interval.window = None;
                            patch.recurrence = Some(Some(Recurrence::Interval(interval)));
                        }
                        _ => {
                            return Err(ValidationError::invalid(
                                "window",
                                "habit has no interval to clear a window from",
                            )
                            .into())
                        }
                    },
                    other => return Err(format!("cannot clear unknown field '{other}'").into()),
                }
            }
            let habit = db.update_habit(id, patch)?;
            println!("Habit updated:");
            print_habit(&habit)?;
        }
        HabitAction::Delete { id } => {
            db.delete_habit(id)?;
            println!("Habit deleted: {id}");
        }
        HabitAction::Recipient { id, chat_id, clear } => {
            if chat_id.is_none() && !clear {
                return Err("give a chat ID or --clear".into());
            }
            let habit = db.set_recipient(id, if clear { None } else { chat_id })?;
            match &habit.recipient {
                Some(chat) => println!("Habit {id} reminds chat {chat}"),
                None => println!("Habit {id} has no recipient"),
            }
        }
    }
    Ok(())
}
