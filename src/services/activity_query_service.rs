use anyhow::{anyhow, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

use crate::database::entities::{activities, ml_models, nodes, samples};

/// Read-side queries over imported activity data
pub struct ActivityQueryService {
    db: DatabaseConnection,
}

impl ActivityQueryService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Activity values for one sample under one model, as (node name, value)
    /// pairs ordered by node name.
    pub async fn activity_for_sample(
        &self,
        ml_model_name: &str,
        data_source: &str,
    ) -> Result<Vec<(String, f64)>> {
        let ml_model = ml_models::Entity::find()
            .filter(ml_models::Column::Title.eq(ml_model_name))
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow!("ML model not found: {}", ml_model_name))?;

        let sample = samples::Entity::find()
            .filter(samples::Column::MlDataSource.eq(data_source))
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow!("Sample not found: {}", data_source))?;

        let rows = activities::Entity::find()
            .find_also_related(nodes::Entity)
            .filter(activities::Column::SampleId.eq(sample.id))
            .filter(nodes::Column::MlmodelId.eq(ml_model.id))
            .order_by_asc(nodes::Column::Name)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(activity, node)| node.map(|node| (node.name, activity.value)))
            .collect())
    }

    /// Data sources from `data_sources` that have no activity rows under the
    /// given model, unknown data sources included. An unknown model or a
    /// failing query is an error, not a missing sample.
    pub async fn samples_missing_activity(
        &self,
        ml_model_name: &str,
        data_sources: &[String],
    ) -> Result<Vec<String>> {
        let ml_model = ml_models::Entity::find()
            .filter(ml_models::Column::Title.eq(ml_model_name))
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow!("ML model not found: {}", ml_model_name))?;

        let mut missing = Vec::new();
        for data_source in data_sources {
            let sample = samples::Entity::find()
                .filter(samples::Column::MlDataSource.eq(data_source.as_str()))
                .one(&self.db)
                .await?;
            let sample = match sample {
                Some(sample) => sample,
                None => {
                    missing.push(data_source.clone());
                    continue;
                }
            };

            let rows = activities::Entity::find()
                .find_also_related(nodes::Entity)
                .filter(activities::Column::SampleId.eq(sample.id))
                .filter(nodes::Column::MlmodelId.eq(ml_model.id))
                .all(&self.db)
                .await?;
            if rows.is_empty() {
                missing.push(data_source.clone());
            }
        }
        Ok(missing)
    }
}
