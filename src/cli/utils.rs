use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::feed::{ChangeEvent, ChangeMessage};
use crate::models::Bookmark;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

pub fn output_bookmarks(output_format: &OutputFormat, bookmarks: &[Bookmark]) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "bookmarks": bookmarks }))?);
        }
        OutputFormat::Text if bookmarks.is_empty() => {
            println!("No bookmarks yet.");
        }
        OutputFormat::Text => {
            for bookmark in bookmarks {
                println!("{}  {}  ({})", bookmark.id, bookmark.title, bookmark.display_host());
                println!("    {}", bookmark.url);
            }
        }
    }
    Ok(())
}

/// One line per change; JSON output uses the wire message shape.
pub fn output_change(output_format: &OutputFormat, event: &ChangeEvent) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&ChangeMessage::from(event))?);
        }
        OutputFormat::Text => match event {
            ChangeEvent::Insert(b) | ChangeEvent::Update(b) => {
                println!("{:<6} {}  {}  ({})", event.event_type().as_str(), b.id, b.title, b.display_host());
            }
            ChangeEvent::Delete { id } => {
                println!("{:<6} {}", event.event_type().as_str(), id);
            }
        },
    }
    Ok(())
}
