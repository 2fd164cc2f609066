use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "room")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub room_number: String,
    pub room_name: Option<String>,
    pub floor: String,
    pub capacity: i32,
    pub is_occupied: bool,
    pub notes: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::resident::Entity")]
    Residents,
    #[sea_orm(has_many = "super::sensor_reading::Entity")]
    SensorReadings,
    #[sea_orm(has_many = "super::alert::Entity")]
    Alerts,
}

impl Related<super::resident::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Residents.def()
    }
}

impl Related<super::sensor_reading::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SensorReadings.def()
    }
}

impl Related<super::alert::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Alerts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
