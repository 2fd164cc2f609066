//! Initial schema: rooms, users, residents, sensor readings and alerts.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Room::Table)
                    .if_not_exists()
                    .col(pk_auto(Room::Id))
                    .col(string(Room::RoomNumber).unique_key().to_owned())
                    .col(string_null(Room::RoomName))
                    .col(string(Room::Floor).default("Ground").to_owned())
                    .col(integer(Room::Capacity).default(1).to_owned())
                    .col(boolean(Room::IsOccupied).default(false).to_owned())
                    .col(string_null(Room::Notes))
                    .col(
                        timestamp_with_time_zone(Room::CreatedAt)
                            .default(Expr::current_timestamp())
                            .to_owned(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(pk_auto(User::Id))
                    .col(string(User::Username).unique_key().to_owned())
                    .col(string(User::PasswordHash))
                    .col(string(User::FullName))
                    .col(string(User::Email).unique_key().to_owned())
                    .col(string(User::Role).default("Caretaker").to_owned())
                    .col(
                        timestamp_with_time_zone(User::CreatedAt)
                            .default(Expr::current_timestamp())
                            .to_owned(),
                    )
                    .col(boolean(User::IsActive).default(true).to_owned())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Resident::Table)
                    .if_not_exists()
                    .col(pk_auto(Resident::Id))
                    .col(string(Resident::FirstName))
                    .col(string(Resident::LastName))
                    .col(date(Resident::DateOfBirth))
                    .col(string_null(Resident::MedicalConditions))
                    .col(string_null(Resident::EmergencyContact))
                    .col(string_null(Resident::EmergencyPhone))
                    .col(
                        timestamp_with_time_zone(Resident::AdmissionDate)
                            .default(Expr::current_timestamp())
                            .to_owned(),
                    )
                    .col(boolean(Resident::IsActive).default(true).to_owned())
                    .col(integer_null(Resident::RoomId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_resident_room")
                            .from(Resident::Table, Resident::RoomId)
                            .to(Room::Table, Room::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SensorReading::Table)
                    .if_not_exists()
                    .col(pk_auto(SensorReading::Id))
                    .col(integer(SensorReading::RoomId))
                    .col(double(SensorReading::Temperature))
                    .col(double(SensorReading::Humidity))
                    .col(
                        timestamp_with_time_zone(SensorReading::RecordedAt)
                            .default(Expr::current_timestamp())
                            .to_owned(),
                    )
                    .col(string(SensorReading::SensorType).default("DHT22").to_owned())
                    .col(string_null(SensorReading::Notes))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sensor_reading_room")
                            .from(SensorReading::Table, SensorReading::RoomId)
                            .to(Room::Table, Room::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sensor_reading_room_recorded_at")
                    .table(SensorReading::Table)
                    .col(SensorReading::RoomId)
                    .col(SensorReading::RecordedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Alert::Table)
                    .if_not_exists()
                    .col(pk_auto(Alert::Id))
                    .col(integer(Alert::RoomId))
                    .col(string(Alert::AlertType))
                    .col(string(Alert::Severity).default("Medium").to_owned())
                    .col(string(Alert::Message))
                    .col(
                        timestamp_with_time_zone(Alert::CreatedAt)
                            .default(Expr::current_timestamp())
                            .to_owned(),
                    )
                    .col(boolean(Alert::IsResolved).default(false).to_owned())
                    .col(timestamp_with_time_zone_null(Alert::ResolvedAt))
                    .col(integer_null(Alert::ResolvedByUserId))
                    .col(string_null(Alert::ResolutionNotes))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_alert_room")
                            .from(Alert::Table, Alert::RoomId)
                            .to(Room::Table, Room::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_alert_resolved_by_user")
                            .from(Alert::Table, Alert::ResolvedByUserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_alert_room_is_resolved")
                    .table(Alert::Table)
                    .col(Alert::RoomId)
                    .col(Alert::IsResolved)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alert::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SensorReading::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Resident::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Room::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Room {
    Table,
    Id,
    RoomNumber,
    RoomName,
    Floor,
    Capacity,
    IsOccupied,
    Notes,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
    Username,
    PasswordHash,
    FullName,
    Email,
    Role,
    CreatedAt,
    IsActive,
}

#[derive(Iden)]
enum Resident {
    Table,
    Id,
    FirstName,
    LastName,
    DateOfBirth,
    MedicalConditions,
    EmergencyContact,
    EmergencyPhone,
    AdmissionDate,
    IsActive,
    RoomId,
}

#[derive(Iden)]
enum SensorReading {
    Table,
    Id,
    RoomId,
    Temperature,
    Humidity,
    RecordedAt,
    SensorType,
    Notes,
}

#[derive(Iden)]
enum Alert {
    Table,
    Id,
    RoomId,
    AlertType,
    Severity,
    Message,
    CreatedAt,
    IsResolved,
    ResolvedAt,
    ResolvedByUserId,
    ResolutionNotes,
}
