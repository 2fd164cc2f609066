use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

/// What dimension of the environment an alert flags.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(50))")]
pub enum AlertType {
    #[sea_orm(string_value = "Temperature")]
    Temperature,
    #[sea_orm(string_value = "Humidity")]
    Humidity,
    #[sea_orm(string_value = "Environmental")]
    Environmental,
}

/// Ordinal urgency of an alert.
///
/// Closed enumeration: the surrounding legacy system also used "High" in a
/// few payloads without ever validating it; that level does not exist here
/// and is rejected at deserialization. Variant order defines the escalation
/// order used by the threshold evaluator.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum Severity {
    #[sea_orm(string_value = "Low")]
    Low,
    #[sea_orm(string_value = "Medium")]
    Medium,
    #[sea_orm(string_value = "Critical")]
    Critical,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alert")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub room_id: i32,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
    pub created_at: OffsetDateTime,
    pub is_resolved: bool,
    pub resolved_at: Option<OffsetDateTime>,
    pub resolved_by_user_id: Option<i32>,
    pub resolution_notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::room::Entity",
        from = "Column::RoomId",
        to = "super::room::Column::Id"
    )]
    Room,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ResolvedByUserId",
        to = "super::user::Column::Id"
    )]
    ResolvedBy,
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ResolvedBy.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_escalation_order() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::Critical);
        assert_eq!(Severity::Medium.max(Severity::Critical), Severity::Critical);
    }

    #[test]
    fn severity_rejects_unknown_levels() {
        assert!(serde_json::from_str::<Severity>("\"High\"").is_err());
        assert!(serde_json::from_str::<Severity>("\"Critical\"").is_ok());
    }
}
