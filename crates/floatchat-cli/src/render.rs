// ABOUTME: Text rendering of transcript entries and selection lists
// ABOUTME: Also resolves /pick choices against the session's pending lists

use chrono::Local;
use floatchat_core::{format_file_size, Attachment, Command, Message, Product, Session};

pub fn format_message(message: &Message) -> String {
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");
    let who = if message.is_user() {
        "You"
    } else if message.flags.is_error {
        "Assistant (error)"
    } else {
        "Assistant"
    };

    let mut out = if message.content.is_empty() {
        format!("[{}] {}:", time, who)
    } else {
        format!("[{}] {}: {}", time, who, message.content)
    };
    for file in &message.files {
        out.push_str(&format!("\n    + {} ({})", file.name, format_file_size(file.size)));
    }
    out
}

pub fn format_segments(segments: &[String]) -> String {
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| format!("  {}. {}", i + 1, segment))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_products(products: &[Product]) -> String {
    products
        .iter()
        .enumerate()
        .map(|(i, p)| format!("  {}. {} [{}]", i + 1, p.product_name, p.product_code))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_staged(files: &[Attachment]) -> String {
    if files.is_empty() {
        return "No files staged.".to_string();
    }
    files
        .iter()
        .enumerate()
        .map(|(i, f)| format!("  {}. {} ({}, {})", i + 1, f.name, format_file_size(f.size), f.mime_type))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Map a `/pick` argument to a selection command. Accepts a 1-based
/// number, a segment label, a product code, or a product name.
pub fn resolve_pick(session: &Session, choice: &str) -> Option<Command> {
    let index = choice.parse::<usize>().ok().and_then(|n| n.checked_sub(1));

    if let Some(segments) = session.pending_segments() {
        let picked = match index {
            Some(i) => segments.get(i),
            None => segments.iter().find(|s| s.eq_ignore_ascii_case(choice)),
        };
        return picked.map(|s| Command::SelectSegment(s.clone()));
    }

    if let Some(products) = session.pending_products() {
        let picked = match index {
            Some(i) => products.get(i),
            None => products.iter().find(|p| {
                p.product_code.eq_ignore_ascii_case(choice)
                    || p.product_name.eq_ignore_ascii_case(choice)
            }),
        };
        return picked.map(|p| Command::SelectProduct(p.product_code.clone()));
    }

    None
}
