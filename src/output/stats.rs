//! Queue statistics for the `--stats` command
//!
//! This module formats the queue lengths and seen counts of every spider.

use crate::crawler::QueueStats;

/// Formats statistics for a set of spiders
///
/// # Arguments
///
/// * `stats` - One entry per spider
pub fn format_statistics(stats: &[QueueStats]) -> String {
    let mut out = String::from("=== Queue Statistics ===\n");

    for spider in stats {
        out.push('\n');
        out.push_str(&format!("{}:\n", spider.spider));
        out.push_str(&format!("  Priority queue: {}\n", spider.priority));
        out.push_str(&format!("  Normal queue:   {}\n", spider.normal));
        out.push_str(&format!("  Refetch queue:  {}\n", spider.refetch));
        out.push_str(&format!("  Seen URLs:      {}\n", spider.seen));
    }

    // the realtime queue is shared, so report it once
    if let Some(realtime) = stats.iter().find_map(|s| s.realtime) {
        out.push_str(&format!("\nRealtime queue: {}\n", realtime));
    }

    let pending: usize = stats.iter().map(|s| s.priority + s.normal + s.refetch).sum();
    out.push_str(&format!(
        "\nTotal: {} queued across {} spiders\n",
        pending,
        stats.len()
    ));
    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &[QueueStats]) {
    print!("{}", format_statistics(stats));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_statistics() {
        let stats = vec![
            QueueStats {
                spider: "mediagol".to_string(),
                priority: 1,
                normal: 20,
                refetch: 300,
                realtime: Some(4),
                seen: 321,
            },
            QueueStats {
                spider: "news".to_string(),
                priority: 2,
                normal: 0,
                refetch: 10,
                realtime: Some(4),
                seen: 12,
            },
        ];

        let text = format_statistics(&stats);
        assert!(text.contains("mediagol:"));
        assert!(text.contains("Refetch queue:  300"));
        assert!(text.contains("Realtime queue: 4"));
        assert_eq!(text.matches("Realtime queue").count(), 1);
        assert!(text.contains("Total: 333 queued across 2 spiders"));
    }

    #[test]
    fn test_format_without_realtime() {
        let stats = vec![QueueStats {
            spider: "site".to_string(),
            ..QueueStats::default()
        }];
        assert!(!format_statistics(&stats).contains("Realtime"));
    }
}
