use std::fmt::Display;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

/// Longest text echoed back to a user before it is replaced with a placeholder.
pub const MAX_ECHO_LENGTH: usize = 1850;

lazy_static! {
    static ref MARKDOWN: Regex = Regex::new(r"[\\*_`~|>]").unwrap();
}

pub trait Markdown {
    fn escape_markdown(&self) -> String;
    fn escape_mentions(&self) -> String;
    fn escape_codestring(&self) -> String;
    fn escape_codeblock(&self, language: impl Display) -> String;

    fn codestring(&self) -> String;
    fn codeblock(&self, language: impl Display) -> String;
    /// Replaces ordinary spaces with non-breaking ones so the text is never wrapped.
    fn nbsp(&self) -> String;
    /// Escapes user-provided text for echoing back inside a notice.
    fn echo(&self) -> String;
}

fn cut(t: impl Display, to: usize) -> String {
    t.to_string().chars().take(to).collect::<String>()
}

impl<T> Markdown for T
where
    T: Display,
{
    fn escape_markdown(&self) -> String {
        MARKDOWN
            .replace_all(&self.to_string(), |x: &Captures| format!("\\{}", &x[0]))
            .into_owned()
    }

    fn escape_mentions(&self) -> String {
        self.to_string().replace('@', "@\u{200b}")
    }

    fn escape_codestring(&self) -> String {
        cut(self, 1998).replace('`', "'")
    }

    fn escape_codeblock(&self, language: impl Display) -> String {
        cut(self, 1988usize.saturating_sub(language.to_string().len())).replace("```", "`\u{200b}`\u{200b}`")
    }

    fn codestring(&self) -> String {
        format!("`{}`", self.escape_codestring())
    }

    fn codeblock(&self, language: impl Display) -> String {
        let t = self.escape_codeblock(&language);
        format!("```{language}\n{t}\n```")
    }

    fn nbsp(&self) -> String {
        self.to_string().replace(' ', "\u{a0}")
    }

    fn echo(&self) -> String {
        let escaped = self.escape_markdown().escape_mentions();
        if escaped.chars().count() < MAX_ECHO_LENGTH {
            escaped
        } else {
            "[too long to show]".to_owned()
        }
    }
}

/// Renders the notice shown when a search matched more than one item.
pub fn disambiguation<I, S>(items: I, label: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: Display,
{
    let list = items
        .into_iter()
        .map(|item| format!("\"{}\"", item.nbsp()))
        .collect::<Vec<_>>()
        .join(",   ");

    format!("Multiple {label} found, please be more specific: {list}")
}
