pub mod decimal;
mod format;

pub use format::{format_amount, format_hours, pad_comment, resource_id};
