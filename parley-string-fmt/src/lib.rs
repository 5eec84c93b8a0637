pub mod markdown;

pub use markdown::{disambiguation, Markdown};
