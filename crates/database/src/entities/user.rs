//! User profile and achievement entity definitions

use serde::{Deserialize, Serialize};

/// A gamer profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub background: Option<String>,
    pub bio: Option<String>,
    pub gamer_type: Option<String>,
    pub gaming_level: Option<String>,
    pub is_content_creator: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub display_name: Option<String>,
}

/// Profile fields a user may change on their own profile. Absent fields are
/// left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub background: Option<String>,
    pub bio: Option<String>,
    pub gamer_type: Option<String>,
    pub gaming_level: Option<String>,
    pub is_content_creator: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub game: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAchievementRequest {
    pub title: String,
    pub description: Option<String>,
    pub game: String,
}
