use std::collections::HashSet;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};

use tracing::{info, warn};

use crate::errors::ImportError;
use crate::services::repository::{ActivityRepository, NewActivity};

/// Two-pass validate-then-load pipeline for tab-delimited activity sheets.
///
/// The first pass checks the whole file and rejects it before anything is
/// written; the second pass rewinds the stream and loads nodes, then one
/// batch of activity values per data line. Rewinding instead of buffering
/// keeps memory flat for large sheets.
pub struct ActivityImportService<R: ActivityRepository> {
    repository: R,
}

/// Raw tab splitting; `BufRead::lines` has already stripped the newline.
///
/// Every physical line yields at least one field, so a blank line becomes a
/// single empty field and fails the field-count check instead of vanishing.
fn split_line(line: &str) -> Vec<String> {
    line.split('\t').map(str::to_string).collect()
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

impl<R: ActivityRepository> ActivityImportService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Check node names on the header line.
    ///
    /// Fails at the first name that is blank, repeats an earlier header
    /// column, or already exists for the target model. `names` excludes the
    /// first column (the row-label placeholder); reported columns count it,
    /// so column numbers start at 2.
    pub async fn validate_node_names(
        &self,
        names: &[String],
        ml_model_name: &str,
    ) -> Result<(), ImportError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for (index, name) in names.iter().enumerate() {
            let column = index + 2;
            if is_blank(name) {
                return Err(ImportError::BlankNodeName { column });
            }
            if seen.contains(name.as_str()) {
                return Err(ImportError::DuplicateNodeName {
                    column,
                    name: name.clone(),
                });
            }
            if self
                .repository
                .find_node(name, ml_model_name)
                .await?
                .is_some()
            {
                return Err(ImportError::NodeNameTaken {
                    column,
                    name: name.clone(),
                });
            }
            seen.insert(name.as_str());
        }
        Ok(())
    }

    /// Check one data line.
    ///
    /// A blank data-source key is an error. A data source with no matching
    /// sample only warns; the line stays structurally valid but will be
    /// skipped at load time. Every field after the first must parse as a
    /// float.
    pub async fn validate_data_line(
        &self,
        line_num: usize,
        fields: &[String],
    ) -> Result<(), ImportError> {
        let data_source = fields.first().map(String::as_str).unwrap_or("");
        if is_blank(data_source) {
            return Err(ImportError::BlankDataSource { line: line_num });
        }

        if self.repository.find_sample(data_source).await?.is_none() {
            warn!(
                "Input file line #{}: data_source value not found in database: {}",
                line_num, data_source
            );
        }

        for (index, value) in fields.iter().skip(1).enumerate() {
            if value.parse::<f64>().is_err() {
                return Err(ImportError::NotNumeric {
                    line: line_num,
                    column: index + 2,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    /// Validation pass over the whole file.
    ///
    /// Line 1 is the header; its field count becomes the expected count for
    /// every later line. Stops at the first failing line.
    pub async fn validate_activity<S: Read>(
        &self,
        stream: S,
        ml_model_name: &str,
    ) -> Result<(), ImportError> {
        let reader = BufReader::new(stream);
        let mut expected_fields = 0;

        for (line_index, line) in reader.lines().enumerate() {
            let fields = split_line(&line?);
            if line_index == 0 {
                self.validate_node_names(&fields[1..], ml_model_name).await?;
                expected_fields = fields.len();
            } else if fields.len() != expected_fields {
                return Err(ImportError::FieldCountMismatch {
                    line: line_index + 1,
                    expected: expected_fields,
                });
            } else {
                self.validate_data_line(line_index + 1, &fields).await?;
            }
        }
        Ok(())
    }

    /// Ensure the model exists and create one node per header column, in
    /// header order.
    ///
    /// Duplicate checking belongs to the validation pass; calling this with
    /// an unvalidated header can violate node-name uniqueness.
    async fn import_nodes(
        &self,
        node_names: &[String],
        ml_model_name: &str,
    ) -> Result<(), ImportError> {
        let ml_model = self.repository.get_or_create_ml_model(ml_model_name).await?;
        for name in node_names {
            self.repository.create_node(name, ml_model.id).await?;
        }
        Ok(())
    }

    /// Load one data line, pairing header node names with value fields by
    /// position and persisting the whole line as one batch.
    ///
    /// A line whose data source has no matching sample is skipped silently;
    /// the validation pass already warned about it.
    async fn import_activity_line(
        &self,
        node_names: &[String],
        ml_model_name: &str,
        line_num: usize,
        fields: &[String],
    ) -> Result<(), ImportError> {
        let data_source = fields.first().map(String::as_str).unwrap_or("");
        let sample = match self.repository.find_sample(data_source).await? {
            Some(sample) => sample,
            None => return Ok(()),
        };

        let mut batch = Vec::with_capacity(node_names.len());
        for (index, (name, value)) in node_names.iter().zip(fields.iter().skip(1)).enumerate() {
            let node = self
                .repository
                .find_node(name, ml_model_name)
                .await?
                .ok_or_else(|| ImportError::NodeVanished {
                    name: name.clone(),
                    model: ml_model_name.to_string(),
                })?;
            let value = value.parse::<f64>().map_err(|_| ImportError::NotNumeric {
                line: line_num,
                column: index + 2,
                value: value.clone(),
            })?;
            batch.push(NewActivity {
                sample_id: sample.id,
                node_id: node.id,
                value,
            });
        }
        self.repository.create_activities(batch).await?;
        Ok(())
    }

    /// Validate the whole sheet, rewind the stream, then load it.
    ///
    /// Nothing is written unless the validation pass accepts every line.
    /// Load-pass storage failures propagate as-is; lines already written in
    /// this run are not rolled back.
    pub async fn import_activity<S: Read + Seek>(
        &self,
        stream: &mut S,
        ml_model_name: &str,
    ) -> Result<(), ImportError> {
        if is_blank(ml_model_name) {
            return Err(ImportError::BlankModelName);
        }

        self.validate_activity(&mut *stream, ml_model_name).await?;

        // Second pass re-reads the same handle rather than buffering the
        // parsed lines.
        stream.seek(SeekFrom::Start(0))?;
        let reader = BufReader::new(stream);
        let mut node_names: Vec<String> = Vec::new();

        for (line_index, line) in reader.lines().enumerate() {
            let fields = split_line(&line?);
            if line_index == 0 {
                node_names = fields[1..].to_vec();
                self.import_nodes(&node_names, ml_model_name).await?;
            } else {
                self.import_activity_line(&node_names, ml_model_name, line_index + 1, &fields)
                    .await?;
            }
        }

        info!("Imported activity data for model: {}", ml_model_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use sea_orm::DbErr;

    use crate::database::entities::{ml_models, nodes, samples};

    /// In-memory stand-in for the database, enough to drive the pipeline.
    #[derive(Default)]
    struct MemoryRepository {
        state: Mutex<MemoryState>,
    }

    #[derive(Default)]
    struct MemoryState {
        ml_models: Vec<ml_models::Model>,
        nodes: Vec<nodes::Model>,
        samples: Vec<samples::Model>,
        activities: Vec<NewActivity>,
    }

    impl MemoryRepository {
        fn with_samples(data_sources: &[&str]) -> Self {
            let repository = MemoryRepository::default();
            {
                let mut state = repository.state.lock().unwrap();
                for (index, data_source) in data_sources.iter().enumerate() {
                    state.samples.push(samples::Model {
                        id: index as i32 + 1,
                        name: format!("sample-{}", data_source),
                        ml_data_source: Some(data_source.to_string()),
                        created_at: Utc::now(),
                    });
                }
            }
            repository
        }

        fn with_existing_node(data_sources: &[&str], node_name: &str, ml_model_title: &str) -> Self {
            let repository = MemoryRepository::with_samples(data_sources);
            {
                let mut state = repository.state.lock().unwrap();
                state.ml_models.push(ml_models::Model {
                    id: 1,
                    title: ml_model_title.to_string(),
                    created_at: Utc::now(),
                });
                state.nodes.push(nodes::Model {
                    id: 1,
                    mlmodel_id: 1,
                    name: node_name.to_string(),
                });
            }
            repository
        }

        fn activities(&self) -> Vec<NewActivity> {
            self.state.lock().unwrap().activities.clone()
        }

        fn node_names(&self) -> Vec<String> {
            self.state
                .lock()
                .unwrap()
                .nodes
                .iter()
                .map(|node| node.name.clone())
                .collect()
        }

        fn ml_model_titles(&self) -> Vec<String> {
            self.state
                .lock()
                .unwrap()
                .ml_models
                .iter()
                .map(|ml_model| ml_model.title.clone())
                .collect()
        }
    }

    #[async_trait]
    impl<'a> ActivityRepository for &'a MemoryRepository {
        async fn find_node(
            &self,
            name: &str,
            ml_model_title: &str,
        ) -> Result<Option<nodes::Model>, DbErr> {
            let state = self.state.lock().unwrap();
            let ml_model = state
                .ml_models
                .iter()
                .find(|ml_model| ml_model.title == ml_model_title);
            let ml_model = match ml_model {
                Some(ml_model) => ml_model,
                None => return Ok(None),
            };
            Ok(state
                .nodes
                .iter()
                .find(|node| node.name == name && node.mlmodel_id == ml_model.id)
                .cloned())
        }

        async fn get_or_create_ml_model(&self, title: &str) -> Result<ml_models::Model, DbErr> {
            let mut state = self.state.lock().unwrap();
            if let Some(existing) = state.ml_models.iter().find(|m| m.title == title) {
                return Ok(existing.clone());
            }
            let ml_model = ml_models::Model {
                id: state.ml_models.len() as i32 + 1,
                title: title.to_string(),
                created_at: Utc::now(),
            };
            state.ml_models.push(ml_model.clone());
            Ok(ml_model)
        }

        async fn create_node(&self, name: &str, ml_model_id: i32) -> Result<nodes::Model, DbErr> {
            let mut state = self.state.lock().unwrap();
            let node = nodes::Model {
                id: state.nodes.len() as i32 + 1,
                mlmodel_id: ml_model_id,
                name: name.to_string(),
            };
            state.nodes.push(node.clone());
            Ok(node)
        }

        async fn find_sample(&self, data_source: &str) -> Result<Option<samples::Model>, DbErr> {
            let state = self.state.lock().unwrap();
            Ok(state
                .samples
                .iter()
                .find(|sample| sample.ml_data_source.as_deref() == Some(data_source))
                .cloned())
        }

        async fn create_activities(&self, batch: Vec<NewActivity>) -> Result<(), DbErr> {
            self.state.lock().unwrap().activities.extend(batch);
            Ok(())
        }
    }

    fn strings(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_blank_node_name_fails_at_offending_column() {
        let repository = MemoryRepository::default();
        let service = ActivityImportService::new(&repository);

        let err = service
            .validate_node_names(&strings(&["N1", "  ", "N3"]), "model-x")
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::BlankNodeName { column: 3 }));
    }

    #[tokio::test]
    async fn test_duplicate_node_name_fails_at_second_occurrence() {
        let repository = MemoryRepository::default();
        let service = ActivityImportService::new(&repository);

        let err = service
            .validate_node_names(&strings(&["N1", "N1"]), "model-x")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::DuplicateNodeName { column: 3, ref name } if name == "N1"
        ));
    }

    #[tokio::test]
    async fn test_stored_node_name_collision_is_rejected() {
        let repository = MemoryRepository::with_existing_node(&[], "N1", "model-x");
        let service = ActivityImportService::new(&repository);

        let err = service
            .validate_node_names(&strings(&["N0", "N1"]), "model-x")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::NodeNameTaken { column: 3, ref name } if name == "N1"
        ));

        // The same names under a different model are fine.
        service
            .validate_node_names(&strings(&["N0", "N1"]), "model-y")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unique_fresh_node_names_pass() {
        let repository = MemoryRepository::default();
        let service = ActivityImportService::new(&repository);

        service
            .validate_node_names(&strings(&["N1", "N2", "N3"]), "model-x")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_blank_data_source_is_an_error() {
        let repository = MemoryRepository::default();
        let service = ActivityImportService::new(&repository);

        let err = service
            .validate_data_line(2, &strings(&["", "1.0", "2.0"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::BlankDataSource { line: 2 }));
    }

    #[tokio::test]
    async fn test_unknown_data_source_only_warns() {
        let repository = MemoryRepository::default();
        let service = ActivityImportService::new(&repository);

        // No sample named S9 anywhere, but the line is structurally fine.
        service
            .validate_data_line(2, &strings(&["S9", "1.0", "2.0"]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_non_numeric_value_fails_at_offending_column() {
        let repository = MemoryRepository::with_samples(&["S2"]);
        let service = ActivityImportService::new(&repository);

        let err = service
            .validate_data_line(2, &strings(&["S2", "abc", "3.0"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::NotNumeric { line: 2, column: 2, ref value } if value == "abc"
        ));
    }

    #[tokio::test]
    async fn test_exponential_notation_is_accepted() {
        let repository = MemoryRepository::with_samples(&["S1"]);
        let service = ActivityImportService::new(&repository);

        service
            .validate_data_line(2, &strings(&["S1", "1.5e-3", "-2E4", "0"]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_field_count_mismatch_names_the_line() {
        let repository = MemoryRepository::with_samples(&["S1"]);
        let service = ActivityImportService::new(&repository);

        let content = "\tN1\tN2\nS1\t1.0\t2.0\nS1\t1.0\n";
        let err = service
            .validate_activity(Cursor::new(content), "model-x")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::FieldCountMismatch { line: 3, expected: 3 }
        ));
    }

    #[tokio::test]
    async fn test_blank_interior_line_fails_field_count_at_its_physical_line() {
        let repository = MemoryRepository::with_samples(&["S1"]);
        let service = ActivityImportService::new(&repository);

        // A blank line is one empty field, not a line to skip over.
        let content = "\tN1\tN2\n\nS1\t1.0\t2.5\n";
        let err = service
            .validate_activity(Cursor::new(content), "model-x")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::FieldCountMismatch { line: 2, expected: 3 }
        ));

        let mut stream = Cursor::new(content);
        service
            .import_activity(&mut stream, "model-x")
            .await
            .unwrap_err();
        assert!(repository.activities().is_empty());
        assert!(repository.node_names().is_empty());
    }

    #[tokio::test]
    async fn test_line_numbers_track_physical_lines() {
        let repository = MemoryRepository::with_samples(&["S1", "S2"]);
        let service = ActivityImportService::new(&repository);

        let content = "\tN1\tN2\nS1\t1.0\t2.5\nS2\t1.5\tabc\n";
        let err = service
            .validate_activity(Cursor::new(content), "model-x")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::NotNumeric { line: 3, column: 3, ref value } if value == "abc"
        ));
    }

    #[tokio::test]
    async fn test_blank_model_name_fails_before_reading() {
        struct Unreadable;
        impl Read for Unreadable {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                panic!("stream must not be read when the model name is blank");
            }
        }
        impl Seek for Unreadable {
            fn seek(&mut self, _pos: SeekFrom) -> std::io::Result<u64> {
                panic!("stream must not be rewound when the model name is blank");
            }
        }

        let repository = MemoryRepository::default();
        let service = ActivityImportService::new(&repository);

        let err = service
            .import_activity(&mut Unreadable, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::BlankModelName));
    }

    #[tokio::test]
    async fn test_import_round_trip() {
        let repository = MemoryRepository::with_samples(&["S1"]);
        let service = ActivityImportService::new(&repository);

        let mut stream = Cursor::new("\tN1\tN2\nS1\t1.0\t2.5\n");
        service.import_activity(&mut stream, "model-x").await.unwrap();

        assert_eq!(repository.ml_model_titles(), vec!["model-x"]);
        assert_eq!(repository.node_names(), vec!["N1", "N2"]);
        let activities = repository.activities();
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0].value, 1.0);
        assert_eq!(activities[1].value, 2.5);
        assert_ne!(activities[0].node_id, activities[1].node_id);
    }

    #[tokio::test]
    async fn test_unresolvable_data_source_row_is_skipped_silently() {
        let repository = MemoryRepository::with_samples(&["S1"]);
        let service = ActivityImportService::new(&repository);

        let mut stream = Cursor::new("\tN1\tN2\nS1\t1.0\t2.5\nS9\t3.0\t4.0\n");
        service.import_activity(&mut stream, "model-x").await.unwrap();

        // Only the S1 line lands; the S9 line leaves no trace.
        assert_eq!(repository.activities().len(), 2);
    }

    #[tokio::test]
    async fn test_validation_failure_leaves_no_writes() {
        let repository = MemoryRepository::with_samples(&["S1", "S2"]);
        let service = ActivityImportService::new(&repository);

        let mut stream = Cursor::new("\tN1\tN2\nS1\t1.0\t2.5\nS2\tabc\t3.0\n");
        let err = service
            .import_activity(&mut stream, "model-x")
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::NotNumeric { line: 3, .. }));

        assert!(repository.ml_model_titles().is_empty());
        assert!(repository.node_names().is_empty());
        assert!(repository.activities().is_empty());
    }

    #[tokio::test]
    async fn test_header_only_file_imports_nodes_and_nothing_else() {
        let repository = MemoryRepository::default();
        let service = ActivityImportService::new(&repository);

        let mut stream = Cursor::new("\tN1\tN2\n");
        service.import_activity(&mut stream, "model-x").await.unwrap();

        assert_eq!(repository.node_names(), vec!["N1", "N2"]);
        assert!(repository.activities().is_empty());
    }
}
