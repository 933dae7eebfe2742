use sea_orm_migration::{
    prelude::{extension::postgres::Type, *},
    schema::*,
    sea_orm::{EnumIter, Iterable as _},
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(WalkStatus::Enum)
                    .values(WalkStatus::iter().skip(1))
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(WalkType::Enum)
                    .values(WalkType::iter().skip(1))
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(WalkSource::Enum)
                    .values(WalkSource::iter().skip(1))
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(MediaFileType::Enum)
                    .values(MediaFileType::iter().skip(1))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WalkerProfiles::Table)
                    .if_not_exists()
                    .col(pk_uuid(WalkerProfiles::Id))
                    .col(uuid_uniq(WalkerProfiles::UserId))
                    .col(text_null(WalkerProfiles::Bio))
                    .col(text_null(WalkerProfiles::Experience))
                    .col(string(WalkerProfiles::ServiceZoneLabel))
                    .col(double(WalkerProfiles::RatingAverage))
                    .col(integer(WalkerProfiles::TotalReviews))
                    .col(integer(WalkerProfiles::MaxDogs))
                    .col(double(WalkerProfiles::ServiceCenterLat))
                    .col(double(WalkerProfiles::ServiceCenterLng))
                    .col(double(WalkerProfiles::ZoneRadiusKm))
                    .col(timestamp_with_time_zone(WalkerProfiles::CreatedAt))
                    .col(timestamp_with_time_zone(WalkerProfiles::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Walks::Table)
                    .if_not_exists()
                    .col(pk_uuid(Walks::Id))
                    .col(uuid(Walks::ClientId))
                    .col(uuid_null(Walks::WalkerId))
                    .col(uuid_null(Walks::PredefinedRouteId))
                    .col(enumeration(
                        Walks::Type,
                        Alias::new("walk_type"),
                        WalkType::iter().skip(1),
                    ))
                    .col(enumeration(
                        Walks::Source,
                        Alias::new("walk_source"),
                        WalkSource::iter().skip(1),
                    ))
                    .col(enumeration(
                        Walks::Status,
                        Alias::new("walk_status"),
                        WalkStatus::iter().skip(1),
                    ))
                    .col(double_null(Walks::OriginLat))
                    .col(double_null(Walks::OriginLng))
                    .col(double_null(Walks::DestinationLat))
                    .col(double_null(Walks::DestinationLng))
                    .col(double_null(Walks::PickupLat))
                    .col(double_null(Walks::PickupLng))
                    .col(double_null(Walks::DropoffLat))
                    .col(double_null(Walks::DropoffLng))
                    .col(text_null(Walks::SelectedRoutePolyline))
                    .col(integer_null(Walks::EstimatedDistanceMeters))
                    .col(integer_null(Walks::EstimatedDurationSeconds))
                    .col(timestamp_with_time_zone(Walks::RequestedStartTime))
                    .col(timestamp_with_time_zone_null(Walks::ActualStartTime))
                    .col(timestamp_with_time_zone_null(Walks::ActualEndTime))
                    .col(double(Walks::PriceAmount))
                    .col(string(Walks::PriceCurrency))
                    .col(uuid_null(Walks::AgreedPaymentMethodId))
                    .col(timestamp_with_time_zone(Walks::CreatedAt))
                    .col(timestamp_with_time_zone(Walks::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WalkPets::Table)
                    .if_not_exists()
                    .col(pk_uuid(WalkPets::Id))
                    .col(uuid(WalkPets::WalkId))
                    .col(uuid(WalkPets::PetId))
                    .foreign_key(
                        ForeignKey::create()
                            .from(WalkPets::Table, WalkPets::WalkId)
                            .to(Walks::Table, Walks::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WalkPaymentMethods::Table)
                    .if_not_exists()
                    .col(pk_uuid(WalkPaymentMethods::Id))
                    .col(uuid(WalkPaymentMethods::WalkId))
                    .col(uuid(WalkPaymentMethods::PaymentMethodId))
                    .foreign_key(
                        ForeignKey::create()
                            .from(WalkPaymentMethods::Table, WalkPaymentMethods::WalkId)
                            .to(Walks::Table, Walks::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WalkTrackPoints::Table)
                    .if_not_exists()
                    .col(pk_uuid(WalkTrackPoints::Id))
                    .col(uuid(WalkTrackPoints::WalkId))
                    .col(double(WalkTrackPoints::Lat))
                    .col(double(WalkTrackPoints::Lng))
                    .col(big_integer_null(WalkTrackPoints::TimestampMillis))
                    .col(double_null(WalkTrackPoints::AccuracyMeters))
                    .col(double_null(WalkTrackPoints::SpeedMps))
                    .col(integer_null(WalkTrackPoints::BatteryLevel))
                    .col(boolean(WalkTrackPoints::IsManual))
                    .col(timestamp_with_time_zone(WalkTrackPoints::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(WalkTrackPoints::Table, WalkTrackPoints::WalkId)
                            .to(Walks::Table, Walks::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WalkTrackSummaries::Table)
                    .if_not_exists()
                    .col(pk_uuid(WalkTrackSummaries::Id))
                    .col(uuid(WalkTrackSummaries::WalkId))
                    .col(integer_null(WalkTrackSummaries::TotalDistanceMeters))
                    .col(integer_null(WalkTrackSummaries::TotalDurationSeconds))
                    .col(double_null(WalkTrackSummaries::StartLat))
                    .col(double_null(WalkTrackSummaries::StartLng))
                    .col(double_null(WalkTrackSummaries::EndLat))
                    .col(double_null(WalkTrackSummaries::EndLng))
                    .col(timestamp_with_time_zone(WalkTrackSummaries::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(WalkTrackSummaries::Table, WalkTrackSummaries::WalkId)
                            .to(Walks::Table, Walks::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WalkTrackingMeta::Table)
                    .if_not_exists()
                    .col(pk_uuid(WalkTrackingMeta::WalkId))
                    .col(uuid(WalkTrackingMeta::ClientId))
                    .col(uuid_null(WalkTrackingMeta::WalkerId))
                    .col(text(WalkTrackingMeta::RoutePolyline))
                    .col(integer(WalkTrackingMeta::DeviationThresholdMeters))
                    .col(integer(WalkTrackingMeta::EvaluationIntervalSeconds))
                    .col(boolean(WalkTrackingMeta::Active))
                    .col(timestamp_with_time_zone(WalkTrackingMeta::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(WalkTrackingMeta::Table, WalkTrackingMeta::WalkId)
                            .to(Walks::Table, Walks::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MediaFiles::Table)
                    .if_not_exists()
                    .col(pk_uuid(MediaFiles::Id))
                    .col(uuid(MediaFiles::WalkId))
                    .col(enumeration(
                        MediaFiles::Type,
                        Alias::new("media_file_type"),
                        MediaFileType::iter().skip(1),
                    ))
                    .col(text(MediaFiles::StoragePath))
                    .col(big_integer(MediaFiles::SizeBytes))
                    .col(string(MediaFiles::MimeType))
                    .col(timestamp_with_time_zone(MediaFiles::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(MediaFiles::Table, MediaFiles::WalkId)
                            .to(Walks::Table, Walks::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserFcmTokens::Table)
                    .if_not_exists()
                    .col(pk_uuid(UserFcmTokens::UserId))
                    .col(text(UserFcmTokens::FcmToken))
                    .col(timestamp_with_time_zone(UserFcmTokens::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserFcmTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MediaFiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WalkTrackingMeta::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WalkTrackSummaries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WalkTrackPoints::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WalkPaymentMethods::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WalkPets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Walks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WalkerProfiles::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().if_exists().name(MediaFileType::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().if_exists().name(WalkSource::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().if_exists().name(WalkType::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().if_exists().name(WalkStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden, EnumIter)]
#[sea_orm(enum_name = "walk_status")]
pub enum WalkStatus {
    #[sea_orm(iden = "walk_status")]
    Enum,
    #[sea_orm(iden = "PENDING")]
    Pending,
    #[sea_orm(iden = "ACCEPTED")]
    Accepted,
    #[sea_orm(iden = "STARTED")]
    Started,
    #[sea_orm(iden = "WALKER_FINISHED")]
    WalkerFinished,
    #[sea_orm(iden = "REVIEW_PENDING")]
    ReviewPending,
    #[sea_orm(iden = "COMPLETED")]
    Completed,
    #[sea_orm(iden = "CANCELLED")]
    Cancelled,
    #[sea_orm(iden = "INACTIVE")]
    Inactive,
}

#[derive(DeriveIden, EnumIter)]
#[sea_orm(enum_name = "walk_type")]
pub enum WalkType {
    #[sea_orm(iden = "walk_type")]
    Enum,
    #[sea_orm(iden = "A_TO_B")]
    AToB,
    #[sea_orm(iden = "TIME")]
    Time,
    #[sea_orm(iden = "DISTANCE")]
    Distance,
    #[sea_orm(iden = "PREDEFINED")]
    Predefined,
}

#[derive(DeriveIden, EnumIter)]
#[sea_orm(enum_name = "walk_source")]
pub enum WalkSource {
    #[sea_orm(iden = "walk_source")]
    Enum,
    #[sea_orm(iden = "CUSTOM")]
    Custom,
    #[sea_orm(iden = "PREDEFINED")]
    Predefined,
}

#[derive(DeriveIden, EnumIter)]
#[sea_orm(enum_name = "media_file_type")]
pub enum MediaFileType {
    #[sea_orm(iden = "media_file_type")]
    Enum,
    #[sea_orm(iden = "WALK_START_PHOTO")]
    WalkStartPhoto,
    #[sea_orm(iden = "WALK_END_PHOTO")]
    WalkEndPhoto,
}

#[derive(DeriveIden)]
enum Walks {
    Table,
    Id,
    ClientId,
    WalkerId,
    PredefinedRouteId,
    Type,
    Source,
    Status,
    OriginLat,
    OriginLng,
    DestinationLat,
    DestinationLng,
    PickupLat,
    PickupLng,
    DropoffLat,
    DropoffLng,
    SelectedRoutePolyline,
    EstimatedDistanceMeters,
    EstimatedDurationSeconds,
    RequestedStartTime,
    ActualStartTime,
    ActualEndTime,
    PriceAmount,
    PriceCurrency,
    AgreedPaymentMethodId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum WalkerProfiles {
    Table,
    Id,
    UserId,
    Bio,
    Experience,
    ServiceZoneLabel,
    RatingAverage,
    TotalReviews,
    MaxDogs,
    ServiceCenterLat,
    ServiceCenterLng,
    ZoneRadiusKm,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum WalkPets {
    Table,
    Id,
    WalkId,
    PetId,
}

#[derive(DeriveIden)]
enum WalkPaymentMethods {
    Table,
    Id,
    WalkId,
    PaymentMethodId,
}

#[derive(DeriveIden)]
enum WalkTrackPoints {
    Table,
    Id,
    WalkId,
    Lat,
    Lng,
    TimestampMillis,
    AccuracyMeters,
    SpeedMps,
    BatteryLevel,
    IsManual,
    CreatedAt,
}

#[derive(DeriveIden)]
enum WalkTrackSummaries {
    Table,
    Id,
    WalkId,
    TotalDistanceMeters,
    TotalDurationSeconds,
    StartLat,
    StartLng,
    EndLat,
    EndLng,
    CreatedAt,
}

#[derive(DeriveIden)]
enum WalkTrackingMeta {
    Table,
    WalkId,
    ClientId,
    WalkerId,
    RoutePolyline,
    DeviationThresholdMeters,
    EvaluationIntervalSeconds,
    Active,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum MediaFiles {
    Table,
    Id,
    WalkId,
    Type,
    StoragePath,
    SizeBytes,
    MimeType,
    CreatedAt,
}

#[derive(DeriveIden)]
enum UserFcmTokens {
    Table,
    UserId,
    FcmToken,
    UpdatedAt,
}
