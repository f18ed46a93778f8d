//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Login identifier, stored with a lowercased domain part
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    #[sea_orm(column_type = "Text")]
    pub bio: String,

    /// Storage key of the profile picture
    #[sea_orm(nullable)]
    pub profile_picture: Option<String>,

    /// Storage key of the cover photo
    #[sea_orm(nullable)]
    pub cover_photo: Option<String>,

    pub location: String,

    pub website: String,

    #[sea_orm(default_value = false)]
    pub is_online: bool,

    #[sea_orm(nullable)]
    pub last_seen: Option<DateTimeWithTimeZone>,

    /// Inactive accounts cannot log in
    #[sea_orm(default_value = true)]
    pub is_active: bool,

    pub date_joined: DateTimeWithTimeZone,
}

impl Model {
    /// "First Last", trimmed when either part is empty.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Posts,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
