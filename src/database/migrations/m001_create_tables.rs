use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create ml_models table
        manager
            .create_table(
                Table::create()
                    .table(MlModels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MlModels::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MlModels::Title)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(MlModels::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Create nodes table
        manager
            .create_table(
                Table::create()
                    .table(Nodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Nodes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Nodes::MlmodelId).integer().not_null())
                    .col(ColumnDef::new(Nodes::Name).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_nodes_mlmodel_id")
                            .from(Nodes::Table, Nodes::MlmodelId)
                            .to(MlModels::Table, MlModels::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .index(
                        Index::create()
                            .name("idx_nodes_mlmodel_name")
                            .table(Nodes::Table)
                            .col(Nodes::MlmodelId)
                            .col(Nodes::Name)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create samples table
        manager
            .create_table(
                Table::create()
                    .table(Samples::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Samples::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Samples::Name).string().not_null())
                    .col(
                        ColumnDef::new(Samples::MlDataSource)
                            .string()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Samples::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Create activities table
        manager
            .create_table(
                Table::create()
                    .table(Activities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Activities::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Activities::SampleId).integer().not_null())
                    .col(ColumnDef::new(Activities::NodeId).integer().not_null())
                    .col(ColumnDef::new(Activities::Value).double().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activities_sample_id")
                            .from(Activities::Table, Activities::SampleId)
                            .to(Samples::Table, Samples::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activities_node_id")
                            .from(Activities::Table, Activities::NodeId)
                            .to(Nodes::Table, Nodes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .index(
                        Index::create()
                            .name("idx_activities_sample_node")
                            .table(Activities::Table)
                            .col(Activities::SampleId)
                            .col(Activities::NodeId)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Activities::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Samples::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Nodes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MlModels::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum MlModels {
    Table,
    Id,
    Title,
    CreatedAt,
}

#[derive(Iden)]
enum Nodes {
    Table,
    Id,
    MlmodelId,
    Name,
}

#[derive(Iden)]
enum Samples {
    Table,
    Id,
    Name,
    MlDataSource,
    CreatedAt,
}

#[derive(Iden)]
enum Activities {
    Table,
    Id,
    SampleId,
    NodeId,
    Value,
}
