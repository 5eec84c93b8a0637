use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub static ref USER_MENTION: Regex = Regex::new(r"^(?:<@!?)?(\d+)>?$").unwrap();
    pub static ref CHANNEL_MENTION: Regex = Regex::new(r"^(?:<#)?(\d+)>?$").unwrap();
    pub static ref ROLE_MENTION: Regex = Regex::new(r"^(?:<@&)?(\d+)>?$").unwrap();
    /// First whitespace-delimited token, used for prefixless commands in direct messages.
    pub static ref BARE_COMMAND: Regex = Regex::new(r"(?i)^([^\s]+)").unwrap();
    /// One argument: a double-quoted run, a single-quoted run, or a bare word.
    pub static ref ARGUMENT: Regex = Regex::new(r#"\s*(?:"([\s\S]*?)"|'([\s\S]*?)'|(\S+))\s*"#).unwrap();
    /// Same as [`ARGUMENT`], with single quotes treated as ordinary characters.
    pub static ref ARGUMENT_DOUBLE_QUOTED: Regex = Regex::new(r#"\s*(?:"([\s\S]*?)"|(\S+))\s*"#).unwrap();
}
