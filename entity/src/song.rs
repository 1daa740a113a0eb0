use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "song")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub spotify_id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub image_url: String,
    pub preview_url: String,
    pub rating: i32,
    #[sea_orm(column_type = "Text")]
    pub summary: String,
    pub release_date: String,
    /// Milliseconds.
    pub duration: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
