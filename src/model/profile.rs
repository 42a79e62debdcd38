use serde::{Deserialize, Serialize};

use super::ids::UserId;

/// Public profile of an author. Read-only for the stores.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Profile {
    /// Name to render next to content: display name, then username, then id.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or(self.username.as_deref())
            .unwrap_or_else(|| self.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_falls_back_to_username_then_id() {
        let mut profile = Profile {
            id: UserId::new("u1"),
            display_name: Some("  ".into()),
            username: Some("heron_fan".into()),
            avatar_url: None,
        };
        assert_eq!(profile.label(), "heron_fan");
        profile.username = None;
        assert_eq!(profile.label(), "u1");
    }
}
