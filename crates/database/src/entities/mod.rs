//! Domain entities for the database layer

pub mod group;
pub mod matching;
pub mod message;
pub mod user;

pub use group::{CreateGroupRequest, Group, GroupMember, GroupWithMembers, MemberRole};
pub use matching::{Match, MatchStatus};
pub use message::{
    ChatMessage, ConversationSummary, CreateGroupMessageRequest, CreateMessageRequest,
    GroupChatMessage,
};
pub use user::{
    Achievement, CreateAchievementRequest, CreateUserRequest, UpdateProfileRequest, User,
};
