//! Per-compile configuration and page identity.

/// Default limit for recursive compilation of bodies and emitted text.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 10;

/// An emoji known to the wiki.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Emoji {
    /// Lookup key, e.g. `smile` (surrounding `%` are ignored).
    pub shortcut: String,
    /// Display name used as `alt` text.
    pub name: Option<String>,
}

impl Emoji {
    /// Create an emoji with a display name.
    #[must_use]
    pub fn new(shortcut: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            shortcut: shortcut.into(),
            name: Some(name.into()),
        }
    }
}

/// Normalize an emoji key for comparison: trimmed, without surrounding `%`,
/// lowercased.
pub(crate) fn normalize_shortcut(key: &str) -> String {
    key.trim().trim_matches('%').trim().to_lowercase()
}

/// Immutable configuration snapshot shared by all handlers of one compile.
///
/// # Example
///
/// ```
/// use wiki_engine::{Emoji, EngineConfiguration};
///
/// let config = EngineConfiguration::new()
///     .with_base_path("/wiki/")
///     .with_site_name("Docs")
///     .with_emoji(Emoji::new("smile", "Smile"));
///
/// assert_eq!(config.base_path, "/wiki");
/// assert!(config.find_emoji("%SMILE%").is_some());
/// ```
#[derive(Clone, Debug)]
pub struct EngineConfiguration {
    /// URL prefix for generated links, without trailing `/`.
    pub base_path: String,
    /// Site name rendered by `##SiteName`.
    pub site_name: String,
    /// Whether the completion handler reports statistics.
    pub record_compilation_metrics: bool,
    /// Whether `##Profile` renders links to public profiles.
    pub enable_public_profiles: bool,
    /// Known emojis, first match wins.
    pub emojis: Vec<Emoji>,
    /// Maximum depth of recursive compilation.
    pub max_nesting_depth: usize,
}

impl Default for EngineConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfiguration {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_path: String::new(),
            site_name: String::new(),
            record_compilation_metrics: false,
            enable_public_profiles: false,
            emojis: Vec::new(),
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }

    /// Set the base path; a trailing `/` is removed.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        let base_path: String = base_path.into();
        self.base_path = base_path.trim_end_matches('/').to_owned();
        self
    }

    /// Set the site name.
    #[must_use]
    pub fn with_site_name(mut self, site_name: impl Into<String>) -> Self {
        self.site_name = site_name.into();
        self
    }

    /// Enable or disable statistics recording.
    #[must_use]
    pub fn with_compilation_metrics(mut self, enabled: bool) -> Self {
        self.record_compilation_metrics = enabled;
        self
    }

    /// Enable or disable public profile links.
    #[must_use]
    pub fn with_public_profiles(mut self, enabled: bool) -> Self {
        self.enable_public_profiles = enabled;
        self
    }

    /// Add a known emoji.
    #[must_use]
    pub fn with_emoji(mut self, emoji: Emoji) -> Self {
        self.emojis.push(emoji);
        self
    }

    /// Set the maximum nesting depth.
    #[must_use]
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Look up an emoji by shortcut.
    #[must_use]
    pub fn find_emoji(&self, key: &str) -> Option<&Emoji> {
        let key = normalize_shortcut(key);
        self.emojis
            .iter()
            .find(|emoji| normalize_shortcut(&emoji.shortcut) == key)
    }
}

/// Identity and content of the page being compiled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageRef {
    /// Page id used when reporting statistics.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Navigation path, e.g. `help/getting_started`.
    pub navigation: String,
    /// Wiki markup to compile.
    pub body: String,
    /// Current revision number.
    pub revision: i32,
}

impl PageRef {
    /// Create a page with just a body.
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfiguration::default();
        assert_eq!(config.base_path, "");
        assert!(!config.record_compilation_metrics);
        assert!(!config.enable_public_profiles);
        assert_eq!(config.max_nesting_depth, DEFAULT_MAX_NESTING_DEPTH);
    }

    #[test]
    fn test_base_path_trailing_slash_removed() {
        let config = EngineConfiguration::new().with_base_path("https://wiki.example.com/");
        assert_eq!(config.base_path, "https://wiki.example.com");
    }

    #[test]
    fn test_find_emoji_normalizes_both_sides() {
        let config = EngineConfiguration::new().with_emoji(Emoji::new("%%Wink%%", "Wink"));
        assert_eq!(
            config.find_emoji(" wink ").and_then(|e| e.name.as_deref()),
            Some("Wink")
        );
    }

    #[test]
    fn test_find_emoji_first_match_wins() {
        let config = EngineConfiguration::new()
            .with_emoji(Emoji::new("smile", "First"))
            .with_emoji(Emoji::new("SMILE", "Second"));
        assert_eq!(
            config.find_emoji("smile").and_then(|e| e.name.as_deref()),
            Some("First")
        );
    }

    #[test]
    fn test_find_emoji_missing() {
        let config = EngineConfiguration::new();
        assert!(config.find_emoji("smile").is_none());
    }
}
