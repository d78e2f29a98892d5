use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// The fixed set of user avatars offered by the profile editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Avatar {
    #[default]
    Smile,
    Cool,
    Robot,
    Cat,
    Fox,
    Panda,
}

impl Avatar {
    pub const ALL: [Avatar; 6] = [
        Avatar::Smile,
        Avatar::Cool,
        Avatar::Robot,
        Avatar::Cat,
        Avatar::Fox,
        Avatar::Panda,
    ];

    pub fn glyph(self) -> &'static str {
        match self {
            Avatar::Smile => "🙂",
            Avatar::Cool => "😎",
            Avatar::Robot => "🤖",
            Avatar::Cat => "🐱",
            Avatar::Fox => "🦊",
            Avatar::Panda => "🐼",
        }
    }

    pub fn from_glyph(glyph: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.glyph() == glyph.trim())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationProfile {
    /// Empty until the first message is sent (or the name is edited).
    pub user_name: String,
    pub user_avatar: Avatar,
    pub theme: Theme,
}

impl ConversationProfile {
    pub fn has_name(&self) -> bool {
        !self.user_name.is_empty()
    }

    /// Take `text` as the user's name if none is known yet.
    ///
    /// Returns `true` when the name was captured.
    pub fn capture_name(&mut self, text: &str) -> bool {
        let name = text.trim();
        if self.has_name() || name.is_empty() {
            return false;
        }
        self.user_name = name.to_string();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_name_only_once() {
        let mut profile = ConversationProfile::default();
        assert!(profile.capture_name("  Alice \n"));
        assert_eq!(profile.user_name, "Alice");
        assert!(!profile.capture_name("Bob"));
        assert_eq!(profile.user_name, "Alice");
    }

    #[test]
    fn test_blank_text_is_not_a_name() {
        let mut profile = ConversationProfile::default();
        assert!(!profile.capture_name("   "));
        assert!(!profile.has_name());
    }

    #[test]
    fn test_avatar_glyph_round_trip() {
        for avatar in Avatar::ALL {
            assert_eq!(Avatar::from_glyph(avatar.glyph()), Some(avatar));
        }
        assert_eq!(Avatar::from_glyph("x"), None);
    }

    #[test]
    fn test_theme_toggle() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
    }
}
