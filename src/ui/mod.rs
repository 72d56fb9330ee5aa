mod spinner;
mod status;

pub use spinner::with_spinner;
pub use status::{print_command_status, CommandStatus};
