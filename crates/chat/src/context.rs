//! Context assembly: past exchanges rendered as a plain transcript.
//!
//! ```text
//! User: <input>
//! Assistant: <response>
//! User: <input>
//! Assistant: <response>
//! ```
//!
//! Exchanges must already be oldest-first; this module never reorders.

use chatrelay_core::exchange::Exchange;

/// Render exchanges as `User:`/`Assistant:` line pairs joined by `\n`.
///
/// `output_limit` keeps only the last N characters of each response.
/// `None` keeps the full text and `Some(0)` renders an empty response.
pub fn format_context(exchanges: &[Exchange], output_limit: Option<usize>) -> String {
    exchanges
        .iter()
        .map(|e| {
            let response = match output_limit {
                Some(limit) => tail_chars(&e.chatbot_response, limit),
                None => e.chatbot_response.as_str(),
            };
            format!("User: {}\nAssistant: {}", e.user_input, response)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The last `n` characters of `s`, cut on a char boundary.
pub fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatrelay_core::exchange::SessionId;
    use chrono::Utc;

    fn ex(u: &str, r: &str) -> Exchange {
        Exchange {
            session_id: SessionId::from("s"),
            user_input: u.into(),
            chatbot_response: r.into(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn empty_history_is_empty_context() {
        assert_eq!(format_context(&[], None), "");
        assert_eq!(format_context(&[], Some(3)), "");
    }

    #[test]
    fn two_exchanges_in_order() {
        let ctx = format_context(&[ex("u1", "r1"), ex("u2", "r2")], None);
        assert_eq!(ctx, "User: u1\nAssistant: r1\nUser: u2\nAssistant: r2");
    }

    #[test]
    fn output_limit_keeps_tail() {
        let ctx = format_context(&[ex("u1", "hello")], Some(3));
        assert_eq!(ctx, "User: u1\nAssistant: llo");
    }

    #[test]
    fn output_limit_does_not_touch_user_input() {
        let ctx = format_context(&[ex("a long question", "answer")], Some(2));
        assert_eq!(ctx, "User: a long question\nAssistant: er");
    }

    #[test]
    fn zero_limit_renders_empty_response() {
        let ctx = format_context(&[ex("u1", "hello")], Some(0));
        assert_eq!(ctx, "User: u1\nAssistant: ");
    }

    #[test]
    fn limit_longer_than_response_keeps_all() {
        assert_eq!(tail_chars("hi", 10), "hi");
        assert_eq!(tail_chars("", 3), "");
    }

    #[test]
    fn tail_counts_characters_not_bytes() {
        assert_eq!(tail_chars("naïve café", 4), "café");
        assert_eq!(tail_chars("🦀🦀🦀", 2), "🦀🦀");
        assert_eq!(tail_chars("日本語", 1), "語");
    }
}
