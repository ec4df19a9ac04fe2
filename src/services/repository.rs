use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};

use crate::database::entities::{activities, ml_models, nodes, samples};

/// One activity measurement ready to persist
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub sample_id: i32,
    pub node_id: i32,
    pub value: f64,
}

/// Storage operations the import pipeline depends on.
///
/// The pipeline never touches the database directly; everything goes through
/// this trait so the validators and importers can be exercised against an
/// in-memory fake.
#[async_trait]
pub trait ActivityRepository {
    /// Look up a node by name under the model with the given title
    async fn find_node(
        &self,
        name: &str,
        ml_model_title: &str,
    ) -> Result<Option<nodes::Model>, DbErr>;

    /// Fetch the model with the given title, creating it if absent
    async fn get_or_create_ml_model(&self, title: &str) -> Result<ml_models::Model, DbErr>;

    /// Create a node under the given model
    async fn create_node(&self, name: &str, ml_model_id: i32) -> Result<nodes::Model, DbErr>;

    /// Look up a sample by its external data-source key
    async fn find_sample(&self, data_source: &str) -> Result<Option<samples::Model>, DbErr>;

    /// Persist a batch of activity values in a single insert
    async fn create_activities(&self, batch: Vec<NewActivity>) -> Result<(), DbErr>;
}

/// sea-orm backed repository used by the CLI
pub struct SeaOrmActivityRepository {
    db: DatabaseConnection,
}

impl SeaOrmActivityRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ActivityRepository for SeaOrmActivityRepository {
    async fn find_node(
        &self,
        name: &str,
        ml_model_title: &str,
    ) -> Result<Option<nodes::Model>, DbErr> {
        let ml_model = ml_models::Entity::find()
            .filter(ml_models::Column::Title.eq(ml_model_title))
            .one(&self.db)
            .await?;

        let ml_model = match ml_model {
            Some(ml_model) => ml_model,
            None => return Ok(None),
        };

        nodes::Entity::find()
            .filter(nodes::Column::Name.eq(name))
            .filter(nodes::Column::MlmodelId.eq(ml_model.id))
            .one(&self.db)
            .await
    }

    async fn get_or_create_ml_model(&self, title: &str) -> Result<ml_models::Model, DbErr> {
        if let Some(existing) = ml_models::Entity::find()
            .filter(ml_models::Column::Title.eq(title))
            .one(&self.db)
            .await?
        {
            return Ok(existing);
        }

        let ml_model = ml_models::ActiveModel {
            title: Set(title.to_string()),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };
        ml_model.insert(&self.db).await
    }

    async fn create_node(&self, name: &str, ml_model_id: i32) -> Result<nodes::Model, DbErr> {
        let node = nodes::ActiveModel {
            mlmodel_id: Set(ml_model_id),
            name: Set(name.to_string()),
            ..Default::default()
        };
        node.insert(&self.db).await
    }

    async fn find_sample(&self, data_source: &str) -> Result<Option<samples::Model>, DbErr> {
        samples::Entity::find()
            .filter(samples::Column::MlDataSource.eq(data_source))
            .one(&self.db)
            .await
    }

    async fn create_activities(&self, batch: Vec<NewActivity>) -> Result<(), DbErr> {
        if batch.is_empty() {
            return Ok(());
        }

        let rows = batch.into_iter().map(|activity| activities::ActiveModel {
            sample_id: Set(activity.sample_id),
            node_id: Set(activity.node_id),
            value: Set(activity.value),
            ..Default::default()
        });
        activities::Entity::insert_many(rows).exec(&self.db).await?;

        Ok(())
    }
}
