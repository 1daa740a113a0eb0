use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Song::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Song::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Song::SpotifyId).string().not_null().unique_key())
                    .col(ColumnDef::new(Song::Title).string().not_null())
                    .col(ColumnDef::new(Song::Artist).string().not_null())
                    .col(ColumnDef::new(Song::Album).string().not_null())
                    .col(ColumnDef::new(Song::Genre).string().not_null())
                    .col(ColumnDef::new(Song::ImageUrl).string().not_null())
                    .col(ColumnDef::new(Song::PreviewUrl).string().not_null())
                    .col(ColumnDef::new(Song::Rating).integer().not_null())
                    .col(ColumnDef::new(Song::Summary).text().not_null())
                    .col(ColumnDef::new(Song::ReleaseDate).string().not_null())
                    .col(ColumnDef::new(Song::Duration).integer().not_null())
                    .col(ColumnDef::new(Song::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Song::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        // Genre listing and filtering both hit this column
        manager
            .create_index(
                Index::create()
                    .name("idx_song_genre")
                    .table(Song::Table)
                    .col(Song::Genre)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Song::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Song {
    Table,
    Id,
    SpotifyId,
    Title,
    Artist,
    Album,
    Genre,
    ImageUrl,
    PreviewUrl,
    Rating,
    Summary,
    ReleaseDate,
    Duration,
    CreatedAt,
    UpdatedAt,
}
