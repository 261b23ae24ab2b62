use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use folio::api::{CmdMessage, MessageLevel};
use folio::config::{BrowserStyle, FolioConfig, CONFIG_KEYS};
use folio::model::{DeviceOrientation, ReadingStateRecord, ScrollAxis};
use folio::reconcile::LibraryEntry;
use std::path::Path;
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 100;
const TIME_WIDTH: usize = 14;
const PAGE_WIDTH: usize = 10;

pub fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}

fn styled_index(style: BrowserStyle, text: String) -> ColoredString {
    match style {
        BrowserStyle::White => text.normal(),
        BrowserStyle::Light => text.blue(),
        BrowserStyle::Dark => text.bright_cyan(),
    }
}

pub fn print_documents(documents: &[LibraryEntry], root: &Path, style: BrowserStyle) {
    if documents.is_empty() {
        return;
    }

    for (i, entry) in documents.iter().enumerate() {
        let idx_str = format!("{:>3}. ", i + 1);
        let shown = entry
            .location
            .strip_prefix(root)
            .unwrap_or(&entry.location)
            .display()
            .to_string();
        let page = format!("p. {}", entry.record.page_index + 1);
        let time_ago = format_time_ago(entry.record.modification_date);

        let fixed_width = idx_str.width() + PAGE_WIDTH + TIME_WIDTH;
        let available = LINE_WIDTH.saturating_sub(fixed_width);
        let name = truncate_to_width(&shown, available);
        let padding = available.saturating_sub(name.width());

        println!(
            "{}{}{}{:>page_width$}{}",
            styled_index(style, idx_str),
            name,
            " ".repeat(padding),
            page,
            time_ago.dimmed(),
            page_width = PAGE_WIDTH
        );
    }
}

pub fn print_record(record: &ReadingStateRecord, location: &Path) {
    let prefs = &record.preferences;
    let on_off = |b: bool| if b { "on" } else { "off" };

    println!("{}", location.display().to_string().bold());
    println!("  page        {}", record.page_index + 1);
    println!("  direction   {}", prefs.scroll_direction());
    println!("  two-up      {}", on_off(prefs.prefers_two_up));
    println!("  find        {}", on_off(prefs.is_find_on_page_enabled));
    for orientation in [DeviceOrientation::Portrait, DeviceOrientation::Landscape] {
        let offset = record.offsets.get(orientation);
        let scale = record
            .scale_factors
            .get(prefs.scroll_axis(), orientation);
        let label = match orientation {
            DeviceOrientation::Portrait => "portrait ",
            DeviceOrientation::Landscape => "landscape",
        };
        println!(
            "  {}   offset ({}, {}), zoom {}",
            label,
            offset.x,
            offset.y,
            if scale > 0.0 {
                format!("{}", scale)
            } else {
                "fit".to_string()
            }
        );
    }
    let other_axis = match prefs.scroll_axis() {
        ScrollAxis::Vertical => ScrollAxis::Horizontal,
        ScrollAxis::Horizontal => ScrollAxis::Vertical,
    };
    let unused = record.scale_factors.for_axis(other_axis);
    if unused.portrait > 0.0 || unused.landscape > 0.0 {
        println!(
            "  {}",
            format!(
                "({:?} zoom kept: {} / {})",
                other_axis, unused.portrait, unused.landscape
            )
            .dimmed()
        );
    }
    println!(
        "  {}",
        format!(
            "record {} · modified {}",
            record.record_id,
            format_time_ago(record.modification_date).trim()
        )
        .dimmed()
    );
}

pub fn print_config(config: &FolioConfig) {
    for key in CONFIG_KEYS {
        println!("{} = {}", key, config.get(key).unwrap_or_default());
    }
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let time_str = Formatter::new().convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_wide_names() {
        assert_eq!(truncate_to_width("short.pdf", 20), "short.pdf");
        let cut = truncate_to_width("a-very-long-document-name.pdf", 10);
        assert!(cut.ends_with('…'));
        assert!(cut.width() <= 10);
    }

    #[test]
    fn time_column_is_fixed_width() {
        let shown = format_time_ago(Utc::now() - chrono::Duration::hours(3));
        assert_eq!(shown.width(), TIME_WIDTH);
        assert!(shown.contains("3 hours ago"));
    }
}
