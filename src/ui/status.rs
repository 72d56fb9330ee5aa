use dialoguer::console::style;

pub enum CommandStatus {
    Success,
    Warning,
    Error,
}

/// Print a one-line status message to stderr, keeping stdout for command output.
pub fn print_command_status(status: CommandStatus, message: &str) {
    let indicator = match status {
        CommandStatus::Success => style("✓").green(),
        CommandStatus::Warning => style("!").yellow(),
        CommandStatus::Error => style("✗").red(),
    };
    eprintln!("{indicator} {message}");
}
