use core_library::models::Profile;
use serde::{Deserialize, Serialize};

/// The user an operation acts for.
///
/// Passed explicitly to every service call; nothing about the current user
/// is held globally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub username: String,
}

impl From<&Profile> for Session {
    fn from(profile: &Profile) -> Self {
        Self {
            user_id: profile.id.clone(),
            username: profile.username.clone(),
        }
    }
}
