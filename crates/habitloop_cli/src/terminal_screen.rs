//! Terminal rendition of the list screen.
//!
//! # Responsibility
//! - Print coordinator notifications to stdout.
//! - Answer the number picker and the sync confirmation from CLI flags.

use habitloop_core::{
    ConfirmCallback, Entry, Habit, Message, NumberPickerCallback, Screen, Timestamp,
};

/// Non-interactive screen: dialogs are answered up front by the caller.
#[derive(Debug, Default)]
pub struct TerminalScreen {
    picker_answer: Option<f64>,
    confirm: bool,
}

impl TerminalScreen {
    pub fn new(picker_answer: Option<f64>, confirm: bool) -> Self {
        Self {
            picker_answer,
            confirm,
        }
    }
}

impl Screen for TerminalScreen {
    fn show_habit_screen(&self, habit: &Habit) {
        let kind = if habit.is_numerical {
            "numerical"
        } else {
            "yes/no"
        };
        println!("habit #{} {} ({kind})", habit.position, habit.name);
        println!("id: {}", habit.id);
        if !habit.unit.is_empty() {
            println!("unit: {}", habit.unit);
        }
        let entries = habit.computed_entries();
        if entries.is_empty() {
            println!("no entries");
            return;
        }
        for entry in entries.iter().rev().take(14) {
            println!("  {}  {}", entry.timestamp, describe_value(habit, entry.value));
        }
    }

    fn show_intro_screen(&self) {
        println!("Welcome to HabitLoop.");
        println!("Add a habit with `habitloop add <name>` and check it off with `habitloop toggle <name>`.");
    }

    fn show_message(&self, message: Message) {
        if message.is_failure() {
            eprintln!("{}", message.text());
        } else {
            println!("{}", message.text());
        }
    }

    fn show_number_picker(&self, value: f64, unit: &str, callback: Box<dyn NumberPickerCallback>) {
        match self.picker_answer {
            Some(answer) => {
                println!("{value:.3} {unit} -> {answer:.3} {unit}");
                callback.on_number_picked(answer);
            }
            None => {
                println!("current value: {value:.3} {unit} (pass --value to change it)");
                callback.on_number_picker_dismissed();
            }
        }
    }

    fn show_send_bug_report_to_developer_screen(&self, log: &str) {
        println!("{log}");
    }

    fn show_send_file_screen(&self, filename: &str) {
        println!("exported {filename}");
    }

    fn show_confirm_install_sync_key(&self, on_confirmed: ConfirmCallback) {
        if self.confirm {
            on_confirmed();
        } else {
            println!("A sync key was offered. Run again with --yes to install it.");
        }
    }
}

/// Short label for one stored value.
pub fn describe_value(habit: &Habit, value: i32) -> String {
    if habit.is_numerical {
        if value < 0 {
            return "-".to_string();
        }
        return format!("{:.3} {}", f64::from(value) / 1000.0, habit.unit);
    }
    match value {
        Entry::YES_MANUAL => "yes".to_string(),
        Entry::YES_AUTO => "yes (auto)".to_string(),
        Entry::NO => "no".to_string(),
        Entry::SKIP => "skip".to_string(),
        _ => "-".to_string(),
    }
}

/// Value label for `habit` on `day`.
pub fn value_on(habit: &Habit, day: Timestamp) -> String {
    describe_value(habit, habit.computed_entries().get(day).value)
}
