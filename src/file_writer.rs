//! HTML report rendering.
//!
//! The report is a single self-contained page: inline CSS, no scripts, no
//! external fonts or images. Output depends only on the report contents, the
//! zone and the time format, so rendering the same day twice gives identical
//! bytes.

use std::fmt::Write as _;
use std::fs::{create_dir_all, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::SecondsFormat;

use crate::error::Result;
use crate::models::{DayReport, DayZone, Message};

/// Shown when no message matched the day
pub const NO_MESSAGES_TEXT: &str = "No messages found for this date.";

/// Placeholder shown instead of attachment content
pub const MEDIA_PLACEHOLDER: &str = "[media attached]";

const FALLBACK_TIME_FORMAT: &str = "%H:%M";

const STYLESHEET: &str = r"
    html, body {
        font-family: -apple-system, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif;
        margin: 0;
        padding: 0;
        background-color: #f0f0f0;
    }
    h1, h2 {
        color: #333;
        text-align: center;
        margin: 20px 0;
    }
    .summary, .empty {
        text-align: center;
        color: #555;
    }
    .conversation {
        background: #efe7dd;
        padding: 10px 20px 20px 20px;
        margin: 20px auto;
        max-width: 800px;
        border: 1px solid #ccc;
        box-shadow: 0 2px 5px rgba(0, 0, 0, 0.1);
        border-radius: 8px;
    }
    .conversation h2 {
        color: #075e54;
        border-bottom: 2px solid #128c7e;
        padding-bottom: 10px;
    }
    .conversation-container {
        overflow-x: hidden;
        padding: 0 16px;
    }
    .conversation-container::after {
        content: '';
        display: table;
        clear: both;
    }
    .message {
        color: #000;
        clear: both;
        line-height: 18px;
        font-size: 15px;
        padding: 8px;
        margin: 8px 0;
        max-width: 85%;
        word-wrap: break-word;
        box-shadow: 0 1px 1px rgba(0, 0, 0, 0.1);
    }
    .message .sender {
        display: block;
        font-size: 12px;
        font-weight: 600;
        color: #128c7e;
    }
    .message .media {
        display: block;
        font-style: italic;
        color: rgba(0, 0, 0, 0.55);
    }
    .metadata {
        display: inline-block;
        float: right;
        padding: 0 0 0 7px;
        color: rgba(0, 0, 0, 0.45);
        font-size: 11px;
    }
    .message.received {
        background: #fff;
        border-radius: 0 5px 5px 5px;
        float: left;
    }
    .message.sent {
        background: #e1ffc7;
        border-radius: 5px 0 5px 5px;
        float: right;
    }
";

/// Write the report page to `path`, creating parent directories as needed
pub fn write_report_file(report: &DayReport, zone: DayZone, time_format: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    render_day_report(report, zone, time_format, &mut writer)?;
    writer.flush()?;

    Ok(())
}

/// Render the report page into a string
#[must_use]
pub fn render_to_string(report: &DayReport, zone: DayZone, time_format: &str) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail
    let _ = render_day_report(report, zone, time_format, &mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Render the report page
pub fn render_day_report<W: Write>(report: &DayReport, zone: DayZone, time_format: &str, writer: &mut W) -> io::Result<()> {
    let title = format!("Chat Logs for {}", report.date.format("%B %d, %Y"));

    writeln!(writer, "<!DOCTYPE html>")?;
    writeln!(writer, "<html lang=\"en\">")?;
    writeln!(writer, "<head>")?;
    writeln!(writer, "  <meta charset=\"UTF-8\">")?;
    writeln!(writer, "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">")?;
    writeln!(writer, "  <title>{title}</title>")?;
    writeln!(writer, "  <style>{STYLESHEET}  </style>")?;
    writeln!(writer, "</head>")?;
    writeln!(writer, "<body>")?;
    writeln!(writer, "<h1>{title}</h1>")?;

    if report.is_empty() {
        writeln!(writer, "<p class=\"empty\">{NO_MESSAGES_TEXT}</p>")?;
    } else {
        writeln!(
            writer,
            "<p class=\"summary\">{} in {}</p>",
            plural(report.message_count(), "message"),
            plural(report.conversations.len(), "conversation")
        )?;
    }

    for conversation in &report.conversations {
        writeln!(writer, "<section class=\"conversation\">")?;
        writeln!(writer, "  <h2>{}</h2>", escape_html(&conversation.chat_name))?;
        writeln!(writer, "  <div class=\"conversation-container\">")?;
        for message in &conversation.messages {
            render_message(message, zone, time_format, writer)?;
        }
        writeln!(writer, "  </div>")?;
        writeln!(writer, "</section>")?;
    }

    writeln!(writer, "</body>")?;
    writeln!(writer, "</html>")?;
    Ok(())
}

fn render_message<W: Write>(message: &Message, zone: DayZone, time_format: &str, writer: &mut W) -> io::Result<()> {
    let class = if message.from_me { "sent" } else { "received" };

    writeln!(writer, "    <div class=\"message {class}\">")?;
    writeln!(writer, "      <span class=\"sender\">{}</span>", escape_html(&message.sender))?;
    if let Some(kind) = &message.media_reference {
        writeln!(writer, "      <span class=\"media\">{}</span>", escape_html(&media_label(kind)))?;
    }
    if !message.body.is_empty() {
        writeln!(writer, "      {}", escape_html(&message.body).replace('\n', "<br>"))?;
    }
    writeln!(
        writer,
        "      <span class=\"metadata\"><time datetime=\"{}\">{}</time></span>",
        message.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        display_time(message, zone, time_format)
    )?;
    writeln!(writer, "    </div>")?;
    Ok(())
}

fn media_label(kind: &str) -> String {
    match kind.trim() {
        "" | "attachment" => MEDIA_PLACEHOLDER.to_string(),
        kind => format!("[media attached: {kind}]"),
    }
}

/// Wall-clock time of a message; falls back to 24-hour time if the
/// configured format cannot be rendered
fn display_time(message: &Message, zone: DayZone, time_format: &str) -> String {
    let local = zone.localize(message.timestamp);
    let mut out = String::new();
    if write!(out, "{}", local.format(time_format)).is_err() {
        out.clear();
        let _ = write!(out, "{}", local.format(FALLBACK_TIME_FORMAT));
    }
    escape_html(&out)
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Escape text for inclusion in HTML element content or attribute values
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Conversation;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn message(id: i64, sender: &str, hour: u32, body: &str) -> Message {
        Message {
            id,
            chat_name: "Ana".to_string(),
            sender: sender.to_string(),
            from_me: sender == "Me",
            timestamp: Utc.with_ymd_and_hms(2024, 2, 2, hour, 30, 0).unwrap(),
            body: body.to_string(),
            media_reference: None,
        }
    }

    fn report(messages: Vec<Message>) -> DayReport {
        DayReport {
            date: NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(),
            conversations: vec![Conversation {
                chat_name: "Ana <3".to_string(),
                messages,
            }],
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<b>"Tom" & 'Jerry'</b>"#), "&lt;b&gt;&quot;Tom&quot; &amp; &#x27;Jerry&#x27;&lt;/b&gt;");
    }

    #[test]
    fn test_render_message_fields() {
        let zone = DayZone::Named(chrono_tz::UTC);
        let html = render_to_string(&report(vec![message(1, "Ana", 21, "line one\n<line two>")]), zone, "%-I:%M %p");

        assert!(html.contains("<title>Chat Logs for February 02, 2024</title>"));
        assert!(html.contains("<h2>Ana &lt;3</h2>"));
        assert!(html.contains("<span class=\"sender\">Ana</span>"));
        assert!(html.contains("line one<br>&lt;line two&gt;"));
        assert!(html.contains(">9:30 PM</time>"));
        assert!(html.contains("class=\"message received\""));
        assert!(html.contains("1 message in 1 conversation"));
    }

    #[test]
    fn test_render_sent_and_media() {
        let zone = DayZone::Named(chrono_tz::UTC);
        let mut photo = message(2, "Me", 9, "");
        photo.media_reference = Some("image".to_string());
        let html = render_to_string(&report(vec![photo]), zone, "%H:%M");

        assert!(html.contains("class=\"message sent\""));
        assert!(html.contains("[media attached: image]"));
        assert!(html.contains(">09:30</time>"));
    }

    #[test]
    fn test_render_empty_report() {
        let empty = DayReport {
            date: NaiveDate::from_ymd_opt(2024, 2, 5).unwrap(),
            conversations: Vec::new(),
        };
        let html = render_to_string(&empty, DayZone::Local, "%H:%M");

        assert!(html.contains(NO_MESSAGES_TEXT));
        assert!(html.ends_with("</html>\n"));
    }

    #[test]
    fn test_render_is_self_contained() {
        let html = render_to_string(&report(vec![message(1, "Ana", 10, "hi")]), DayZone::Local, "%H:%M");
        assert!(!html.contains("http://"));
        assert!(!html.contains("https://"));
        assert!(!html.contains("<script"));
    }
}
