pub mod rate_tracker;
pub mod regex;

/// Formats a user id as a mention, in the `<@id>` form the mention prefix also accepts.
pub fn user_mention(id: u64) -> String {
    format!("<@{id}>")
}

/// Extracts the id from a `<@id>`/`<@!id>` mention or a bare id.
pub fn user_mention_to_id(s: &str) -> Option<u64> {
    regex::USER_MENTION.captures(s)?.get(1)?.as_str().parse().ok()
}

/// Extracts the id from a `<#id>` mention or a bare id.
pub fn channel_mention_to_id(s: &str) -> Option<u64> {
    regex::CHANNEL_MENTION.captures(s)?.get(1)?.as_str().parse().ok()
}

/// Extracts the id from a `<@&id>` mention or a bare id.
pub fn role_mention_to_id(s: &str) -> Option<u64> {
    regex::ROLE_MENTION.captures(s)?.get(1)?.as_str().parse().ok()
}
