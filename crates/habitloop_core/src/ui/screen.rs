//! Notification surface supplied by the UI layer.

use crate::model::habit::Habit;
use crate::ui::message::Message;

/// Answer channel for `Screen::show_number_picker`.
///
/// Both methods consume the callback; a picker resolves exactly once.
pub trait NumberPickerCallback: Send {
    fn on_number_picked(self: Box<Self>, new_value: f64);

    fn on_number_picker_dismissed(self: Box<Self>) {}
}

/// Invoked only when the user confirms; dropping it means "no".
pub type ConfirmCallback = Box<dyn FnOnce() + Send>;

/// UI capabilities the list coordinator drives.
///
/// Calls may come from task completions, so implementations must be
/// shareable across threads.
pub trait Screen: Send + Sync {
    fn show_habit_screen(&self, habit: &Habit);

    fn show_intro_screen(&self);

    fn show_message(&self, message: Message);

    /// Asks for a number, prefilled with `value` and labelled with `unit`.
    fn show_number_picker(&self, value: f64, unit: &str, callback: Box<dyn NumberPickerCallback>);

    fn show_send_bug_report_to_developer_screen(&self, log: &str);

    fn show_send_file_screen(&self, filename: &str);

    /// Asks before installing a sync key offered from outside the app.
    fn show_confirm_install_sync_key(&self, on_confirmed: ConfirmCallback);
}
