//! Text fed to the embedding provider, and interest keyword extraction.

/// Embedding source text for a user: bio and interests on separate lines.
///
/// Returns `None` when both are empty, in which case the stored embedding is absent.
pub fn user_profile_text(bio: Option<&str>, interests: Option<&str>) -> Option<String> {
    let text = format!("{}\n{}", bio.unwrap_or(""), interests.unwrap_or(""));
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Embedding source text for an event: `"{title}. {description}. {location}"`,
/// skipping empty parts.
pub fn event_profile_text(title: &str, description: &str, location: &str) -> Option<String> {
    let parts: Vec<&str> = [title, description, location]
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(". "))
}

/// Split free-text interests into lowercase keywords.
///
/// Separators are commas, semicolons, whitespace, `&` and `-`, so every
/// keyword is a single word comparable against category words. Duplicates are
/// dropped, keeping first-seen order.
pub fn interest_keywords(interests: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for word in interests
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '&' | '-'))
        .filter(|w| !w.is_empty())
    {
        let word = word.to_lowercase();
        if !keywords.contains(&word) {
            keywords.push(word);
        }
    }
    keywords
}
