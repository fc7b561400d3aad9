pub mod error;
pub mod queries;

pub use migrations::Migrator;

/// Database migrations module
pub mod migrations {
    use sea_orm_migration::prelude::*;

    /// Main migrator struct for database migrations
    pub struct Migrator;

    #[async_trait::async_trait]
    impl MigratorTrait for Migrator {
        fn migrations() -> Vec<Box<dyn MigrationTrait>> {
            vec![Box::new(tables::Migration)]
        }
    }

    /// Database tables module containing table creation migrations
    pub mod tables {
        use super::*;

        #[derive(DeriveMigrationName)]
        pub struct Migration;

        #[async_trait::async_trait]
        impl MigrationTrait for Migration {
            async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
                manager
                    .create_table(
                        Table::create()
                            .table(Users::Table)
                            .if_not_exists()
                            .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                            .col(
                                ColumnDef::new(Users::Login)
                                    .string()
                                    .not_null()
                                    .unique_key(),
                            )
                            .col(ColumnDef::new(Users::Name).string())
                            .col(ColumnDef::new(Users::Role).string().not_null())
                            .col(ColumnDef::new(Users::Password).string().not_null())
                            .col(
                                ColumnDef::new(Users::CreatedAt)
                                    .timestamp_with_time_zone()
                                    .not_null(),
                            )
                            .to_owned(),
                    )
                    .await?;

                manager
                    .create_table(
                        Table::create()
                            .table(RefreshTokens::Table)
                            .if_not_exists()
                            .col(
                                ColumnDef::new(RefreshTokens::Id)
                                    .uuid()
                                    .not_null()
                                    .primary_key(),
                            )
                            .col(ColumnDef::new(RefreshTokens::UserId).uuid().not_null())
                            .col(
                                ColumnDef::new(RefreshTokens::Token)
                                    .string()
                                    .not_null()
                                    .unique_key(),
                            )
                            .col(
                                ColumnDef::new(RefreshTokens::ExpiresAt)
                                    .timestamp_with_time_zone()
                                    .not_null(),
                            )
                            .col(
                                ColumnDef::new(RefreshTokens::CreatedAt)
                                    .timestamp_with_time_zone()
                                    .not_null(),
                            )
                            .to_owned(),
                    )
                    .await?;

                manager
                    .create_index(
                        Index::create()
                            .name("idx_refresh_tokens_user_id")
                            .table(RefreshTokens::Table)
                            .col(RefreshTokens::UserId)
                            .if_not_exists()
                            .to_owned(),
                    )
                    .await?;

                manager
                    .create_table(
                        Table::create()
                            .table(ShortLinks::Table)
                            .if_not_exists()
                            .col(
                                ColumnDef::new(ShortLinks::Id)
                                    .integer()
                                    .not_null()
                                    .auto_increment()
                                    .primary_key(),
                            )
                            .col(ColumnDef::new(ShortLinks::Url).text().not_null())
                            .col(
                                ColumnDef::new(ShortLinks::Code)
                                    .string()
                                    .not_null()
                                    .unique_key(),
                            )
                            .col(
                                ColumnDef::new(ShortLinks::ClickCount)
                                    .integer()
                                    .not_null()
                                    .default(0),
                            )
                            .col(
                                ColumnDef::new(ShortLinks::CreatedAt)
                                    .timestamp_with_time_zone()
                                    .not_null(),
                            )
                            .to_owned(),
                    )
                    .await?;

                manager
                    .create_table(
                        Table::create()
                            .table(Meetings::Table)
                            .if_not_exists()
                            .col(
                                ColumnDef::new(Meetings::Id)
                                    .integer()
                                    .not_null()
                                    .auto_increment()
                                    .primary_key(),
                            )
                            .col(ColumnDef::new(Meetings::EventName).text())
                            .col(ColumnDef::new(Meetings::CustomerName).text())
                            .col(ColumnDef::new(Meetings::Email).text())
                            .col(ColumnDef::new(Meetings::Phone).text())
                            .col(ColumnDef::new(Meetings::Location).text())
                            .col(ColumnDef::new(Meetings::Platform).text())
                            .col(ColumnDef::new(Meetings::Devices).text())
                            .col(ColumnDef::new(Meetings::Url).text())
                            .col(ColumnDef::new(Meetings::ShortUrl).text())
                            .col(
                                ColumnDef::new(Meetings::Status)
                                    .text()
                                    .not_null()
                                    .default("new"),
                            )
                            .col(ColumnDef::new(Meetings::Description).text())
                            .col(ColumnDef::new(Meetings::Start).timestamp_with_time_zone())
                            .col(ColumnDef::new(Meetings::End).timestamp_with_time_zone())
                            .col(
                                ColumnDef::new(Meetings::CreatedAt)
                                    .timestamp_with_time_zone()
                                    .not_null(),
                            )
                            .col(ColumnDef::new(Meetings::UpdatedAt).timestamp_with_time_zone())
                            .to_owned(),
                    )
                    .await?;

                manager
                    .create_table(
                        Table::create()
                            .table(Lectures::Table)
                            .if_not_exists()
                            .col(
                                ColumnDef::new(Lectures::Id)
                                    .integer()
                                    .not_null()
                                    .auto_increment()
                                    .primary_key(),
                            )
                            .col(ColumnDef::new(Lectures::GroupName).text())
                            .col(ColumnDef::new(Lectures::Lector).text())
                            .col(ColumnDef::new(Lectures::Platform).text())
                            .col(ColumnDef::new(Lectures::Location).text())
                            .col(ColumnDef::new(Lectures::Url).text())
                            .col(ColumnDef::new(Lectures::ShortUrl).text())
                            .col(ColumnDef::new(Lectures::StreamKey).text())
                            .col(ColumnDef::new(Lectures::Description).text())
                            .col(
                                ColumnDef::new(Lectures::Date)
                                    .timestamp_with_time_zone()
                                    .not_null(),
                            )
                            .col(ColumnDef::new(Lectures::Start).timestamp_with_time_zone())
                            .col(ColumnDef::new(Lectures::End).timestamp_with_time_zone())
                            .col(
                                ColumnDef::new(Lectures::CreatedAt)
                                    .timestamp_with_time_zone()
                                    .not_null(),
                            )
                            .col(ColumnDef::new(Lectures::UpdatedAt).timestamp_with_time_zone())
                            .to_owned(),
                    )
                    .await?;

                Ok(())
            }

            async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
                manager
                    .drop_table(Table::drop().table(Lectures::Table).to_owned())
                    .await?;
                manager
                    .drop_table(Table::drop().table(Meetings::Table).to_owned())
                    .await?;
                manager
                    .drop_table(Table::drop().table(ShortLinks::Table).to_owned())
                    .await?;
                manager
                    .drop_table(Table::drop().table(RefreshTokens::Table).to_owned())
                    .await?;
                manager
                    .drop_table(Table::drop().table(Users::Table).to_owned())
                    .await?;
                Ok(())
            }
        }

        #[derive(Iden)]
        enum Users {
            Table,
            Id,
            Login,
            Name,
            Role,
            Password,
            CreatedAt,
        }

        #[derive(Iden)]
        enum RefreshTokens {
            Table,
            Id,
            UserId,
            Token,
            ExpiresAt,
            CreatedAt,
        }

        #[derive(Iden)]
        enum ShortLinks {
            Table,
            Id,
            Url,
            Code,
            ClickCount,
            CreatedAt,
        }

        #[derive(Iden)]
        enum Meetings {
            Table,
            Id,
            EventName,
            CustomerName,
            Email,
            Phone,
            Location,
            Platform,
            Devices,
            Url,
            ShortUrl,
            Status,
            Description,
            Start,
            End,
            CreatedAt,
            UpdatedAt,
        }

        #[derive(Iden)]
        enum Lectures {
            Table,
            Id,
            GroupName,
            Lector,
            Platform,
            Location,
            Url,
            ShortUrl,
            StreamKey,
            Description,
            Date,
            Start,
            End,
            CreatedAt,
            UpdatedAt,
        }
    }
}
