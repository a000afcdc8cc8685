//! Comment text posted on closed pull requests.
//!
//! Either a fixed, operator-configured string or a message drawn at random
//! from a [`CommentPool`]: one template, with one theme word substituted for
//! its [`THEME_PLACEHOLDER`].

use rand::Rng;

use crate::NomasterError;

/// Placeholder replaced by the theme word in every template.
pub const THEME_PLACEHOLDER: &str = "{theme}";

/// Built-in comment templates.
pub const DEFAULT_TEMPLATES: &[&str] = &[
    "A bottle of {theme} would be appropriate here because we don't make pull requests against the protected branch!",
    "This pull request targets the protected branch, so it has been closed. The usual penalty is one {theme}, payable at the next release.",
    "Pull requests against the protected branch are closed on sight. Retarget this one and pour yourself a {theme} while you're at it.",
    "Closed: nothing merges straight into the protected branch. Open it again from a feature branch and we'll call it even for a {theme}.",
];

/// Built-in theme words.
pub const DEFAULT_THEMES: &[&str] = &[
    "Lagavulin 16",
    "Talisker 10",
    "Laphroaig Quarter Cask",
    "Ardbeg Uigeadail",
    "Oban 14",
    "Highland Park 18",
    "Macallan 12",
    "Springbank 10",
    "Caol Ila 12",
    "Dalwhinnie 15",
    "Balvenie DoubleWood",
    "Glenfarclas 105",
];

// ---------------------------------------------------------------------------
// Comment pool
// ---------------------------------------------------------------------------

/// Immutable set of comment templates and theme words.
///
/// Built once at startup. Construction guarantees both lists are non-empty,
/// that every template holds the placeholder exactly once, and that no
/// template already contains a theme word, so every rendered message holds
/// its theme word exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentPool {
    templates: Vec<String>,
    themes: Vec<String>,
}

impl CommentPool {
    /// Validates and builds a pool.
    ///
    /// # Errors
    ///
    /// - [`NomasterError::EmptyCommentPool`] when `templates` is empty.
    /// - [`NomasterError::EmptyThemePool`] when `themes` is empty.
    /// - [`NomasterError::InvalidCommentTemplate`] when a template does not
    ///   contain [`THEME_PLACEHOLDER`] exactly once, or contains a theme word.
    pub fn new(templates: Vec<String>, themes: Vec<String>) -> Result<Self, NomasterError> {
        if templates.is_empty() {
            return Err(NomasterError::EmptyCommentPool);
        }
        let themes: Vec<String> = themes
            .into_iter()
            .map(|theme| theme.trim().to_string())
            .filter(|theme| !theme.is_empty())
            .collect();
        if themes.is_empty() {
            return Err(NomasterError::EmptyThemePool);
        }

        for template in &templates {
            let placeholders = template.matches(THEME_PLACEHOLDER).count();
            if placeholders != 1 {
                return Err(NomasterError::InvalidCommentTemplate {
                    template: template.clone(),
                    reason: format!(
                        "expected exactly one {THEME_PLACEHOLDER} placeholder, found {placeholders}"
                    ),
                });
            }
            if let Some(theme) = themes.iter().find(|theme| template.contains(theme.as_str())) {
                return Err(NomasterError::InvalidCommentTemplate {
                    template: template.clone(),
                    reason: format!("already contains theme word '{theme}'"),
                });
            }
        }

        Ok(Self { templates, themes })
    }

    /// Returns the templates in their configured order.
    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    /// Returns the theme words in their configured order.
    pub fn themes(&self) -> &[String] {
        &self.themes
    }

    /// Picks a template and a theme word uniformly at random and renders them.
    pub fn render_random<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        // Both indices are in range: construction rejects empty lists.
        let template = &self.templates[rng.gen_range(0..self.templates.len())];
        let theme = &self.themes[rng.gen_range(0..self.themes.len())];
        template.replacen(THEME_PLACEHOLDER, theme, 1)
    }
}

impl Default for CommentPool {
    fn default() -> Self {
        Self {
            templates: DEFAULT_TEMPLATES.iter().map(|t| t.to_string()).collect(),
            themes: DEFAULT_THEMES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Comment selector
// ---------------------------------------------------------------------------

/// Produces the comment posted on each closed pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentSelector {
    fixed: Option<String>,
    pool: CommentPool,
}

impl CommentSelector {
    /// Creates a selector.
    ///
    /// When `fixed` is `Some`, every selection returns it verbatim and the
    /// pool is never consulted.
    pub fn new(fixed: Option<String>, pool: CommentPool) -> Self {
        Self { fixed, pool }
    }

    /// Returns the configured fixed comment, if any.
    pub fn fixed(&self) -> Option<&str> {
        self.fixed.as_deref()
    }

    /// Selects a comment using the thread-local, OS-seeded generator.
    pub fn select(&self) -> String {
        self.select_with(&mut rand::thread_rng())
    }

    /// Selects a comment using the supplied generator.
    pub fn select_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        match &self.fixed {
            Some(fixed) => fixed.clone(),
            None => self.pool.render_random(rng),
        }
    }
}
