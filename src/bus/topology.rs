//! Fixed exchange topology and AMQP topic matching.

/// The single durable topic exchange every emitter and consumer declares.
pub const EXCHANGE: &str = "logs_topic";

pub const LOG_INFO: &str = "log.INFO";
pub const LOG_WARNING: &str = "log.WARNING";
pub const LOG_ERROR: &str = "log.ERROR";

/// Routing keys the listener binds by default.
pub const DEFAULT_TOPICS: [&str; 3] = [LOG_INFO, LOG_ERROR, LOG_WARNING];

/// AMQP topic-exchange match of a binding `pattern` against a `routing_key`.
///
/// Both are dot-delimited words. In the pattern, `*` matches exactly one word
/// and `#` matches zero or more words.
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    match_words(&pattern, &key)
}

fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| match_words(rest, &key[skip..])),
        Some((&word, rest)) => match key.split_first() {
            Some((&head, tail)) => (word == "*" || word == head) && match_words(rest, tail),
            None => false,
        },
    }
}
