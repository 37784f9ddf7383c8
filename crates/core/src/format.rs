use crate::types::{SourceMetadata, SummaryRecord};

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

fn title(metadata: &SourceMetadata) -> String {
    match metadata {
        SourceMetadata::Caption { video_id, .. } => format!("Video {video_id}"),
        SourceMetadata::Article { title, .. } => title.clone(),
        SourceMetadata::Document { filename, .. } => filename.clone(),
        SourceMetadata::FreeText { .. } => "Text".to_string(),
    }
}

fn details(metadata: &SourceMetadata) -> String {
    match metadata {
        SourceMetadata::Caption {
            language_code,
            translated,
            track,
            ..
        } => {
            let captions = if *translated {
                format!("{language_code} (translated)")
            } else {
                language_code.clone()
            };
            format!(
                "**Duration:** {} | **Captions:** {}",
                format_timestamp(track.total_duration_seconds),
                captions
            )
        }
        SourceMetadata::Article { url, author, .. } => {
            format!("**Author:** {} | **Source:** {}", author, url)
        }
        SourceMetadata::Document { pages, .. } => format!("**Pages:** {}", pages),
        SourceMetadata::FreeText {
            word_count,
            char_count,
        } => format!("**Words:** {} | **Characters:** {}", word_count, char_count),
    }
}

fn push_list(output: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    output.push_str(&format!("## {}\n\n", heading));
    for item in items {
        output.push_str(&format!("• {}\n", item));
    }
    output.push('\n');
}

pub fn format_summary_readable(record: &SummaryRecord) -> String {
    let metadata = record.content.metadata();
    let summary = &record.summary;

    let mut output = String::new();
    output.push_str(&format!("# {}\n\n", title(metadata)));
    output.push_str(&format!(
        "{} | **Language:** {}\n\n",
        details(metadata),
        summary.language
    ));

    if !summary.executive_summary.is_empty() {
        output.push_str("## Executive Summary\n\n");
        output.push_str(&summary.executive_summary);
        output.push_str("\n\n");
    }

    push_list(&mut output, "Key Topics", &summary.key_topics);
    push_list(&mut output, "Main Takeaways", &summary.main_takeaways);
    push_list(&mut output, "Action Items", &summary.action_items);

    output
}
