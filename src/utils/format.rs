const COMMENT_WIDTH: usize = 50;
const COMMENT_COLUMN: usize = 54;

/// Two decimals with `,` thousands separators: `1234.5` -> `1,234.50`.
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}

/// Decimal hours as ` H:MM`, hours right-aligned to two columns.
pub fn format_hours(hours: f64) -> String {
    let minutes = (hours.max(0.0) * 60.0).round() as i64;
    format!("{:>2}:{:02}", minutes / 60, minutes % 60)
}

/// Cut a comment to 50 characters (marking the cut with `...`) and pad it so
/// the duration column lines up.
pub fn pad_comment(comment: &str) -> String {
    let mut text: String = comment.chars().take(COMMENT_WIDTH).collect();
    if comment.chars().count() > COMMENT_WIDTH {
        text.push_str("...");
    }
    format!("{text:<COMMENT_COLUMN$}")
}

/// Resource ids are the last segment of the resource URL.
pub fn resource_id(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or(url)
}
