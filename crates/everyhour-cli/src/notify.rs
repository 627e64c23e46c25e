use everyhour_core::{NotificationService, Prompt};

/// Shows prompts on the terminal.
///
/// Writes to stderr so stdout stays a clean response channel for the daemon.
pub struct ConsoleNotifier;

impl NotificationService for ConsoleNotifier {
    fn show(&self, prompt: &Prompt) {
        // BEL first so terminals that support it flash or beep.
        eprintln!("\x07[{}] {}", prompt.title, prompt.message);
    }
}
