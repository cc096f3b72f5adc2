//! Keyword-based anxiety detection for chat text.

/// Words that suggest the writer is frightened, in Chinese and English.
pub const ANXIETY_KEYWORDS: &[&str] = &[
    "害怕", "恐惧", "噩梦", "恐怖", "焦虑", "发抖", "吓", "救命", "不安", "紧张", "压抑", "窒息",
    "scared", "fear", "nightmare", "terrified", "anxious", "panic", "help", "horror", "stress",
];

/// True if any keyword occurs anywhere in `text`, ignoring case.
///
/// Plain substring matching: "fearless" and "helpful" count too.
pub fn is_anxious(text: &str) -> bool {
    let lower = text.to_lowercase();
    ANXIETY_KEYWORDS.iter().any(|k| lower.contains(k))
}
