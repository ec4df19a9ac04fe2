use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Named measurable entity (spreadsheet column) belonging to one model.
///
/// Node names are unique per model; the migration enforces this with a
/// unique index on (mlmodel_id, name) in addition to the validation pass.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "nodes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub mlmodel_id: i32,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ml_models::Entity",
        from = "Column::MlmodelId",
        to = "super::ml_models::Column::Id"
    )]
    MlModels,
    #[sea_orm(has_many = "super::activities::Entity")]
    Activities,
}

impl Related<super::ml_models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MlModels.def()
    }
}

impl Related<super::activities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activities.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
