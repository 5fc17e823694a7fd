use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::app::ports::{FailureSinkPort, FailureStage, ImageSourcePort, ImageStorePort, RecordFailure};
use crate::common::error::Result;
use crate::domain::{JoinedRecord, MergedRecord, MetadataCollection};
use crate::observability::metrics;
use crate::pipeline::merge::{self, OutputCoverage};

/// Joins metadata with dataset images and produces the merged metadata file
/// content, optionally writing the images along the way.
pub struct MergeUseCase {
    source: Box<dyn ImageSourcePort>,
    store: Box<dyn ImageStorePort>,
    failures: Arc<dyn FailureSinkPort>,
    coverage: OutputCoverage,
}

impl MergeUseCase {
    pub fn new(
        source: Box<dyn ImageSourcePort>,
        store: Box<dyn ImageStorePort>,
        failures: Arc<dyn FailureSinkPort>,
    ) -> Self {
        Self {
            source,
            store,
            failures,
            coverage: OutputCoverage::default(),
        }
    }

    pub fn with_coverage(mut self, coverage: OutputCoverage) -> Self {
        self.coverage = coverage;
        self
    }

    fn report(&self, id: &str, stage: FailureStage, reason: impl std::fmt::Display) {
        metrics::record_failure(stage.as_str());
        self.failures.report(RecordFailure::new(id, stage, reason));
    }

    /// Load the dataset side and inner-join it with `metadata`.
    pub fn merge(&self, metadata: &MetadataCollection) -> Result<Vec<JoinedRecord>> {
        info!("Loading images from {}...", self.source.describe());
        let images = self.source.load_images()?;
        metrics::merge::images_loaded(images.len());

        info!("Merging metadata with images...");
        let joined = merge::merge(metadata, images)?;
        metrics::merge::records_joined(joined.len());
        info!("{} of {} metadata entries matched an image", joined.len(), metadata.len());
        Ok(joined)
    }

    /// Write (or just check) every joined image, then emit one output record
    /// per metadata entry covered by the configured `OutputCoverage`.
    ///
    /// A failed image is reported and skipped for the write step only; its
    /// output record still carries the computed path.
    pub fn download_and_save(
        &self,
        joined: &[JoinedRecord],
        metadata: &MetadataCollection,
        output_dir: &Path,
        persist_images: bool,
    ) -> Result<Vec<MergedRecord>> {
        if persist_images {
            info!("Downloading and saving images to {}...", output_dir.display());
            self.store.ensure_dir(output_dir)?;
        }

        for record in joined {
            let outcome = if persist_images {
                let path = merge::image_path_for(output_dir, record.id());
                self.store
                    .write_image(record.id(), &record.image, &path)
                    .map(|_| metrics::merge::image_written())
                    .map_err(|e| (FailureStage::ImageWrite, e))
            } else {
                self.store
                    .check(record.id(), &record.image)
                    .map_err(|e| (FailureStage::ImageCheck, e))
            };
            if let Err((stage, err)) = outcome {
                self.report(record.id(), stage, err);
            }
        }

        let matched: HashSet<&str> = joined.iter().map(JoinedRecord::id).collect();
        let mut output = Vec::with_capacity(metadata.len());
        for record in metadata.iter() {
            if self.coverage == OutputCoverage::MatchedOnly && !matched.contains(record.id.as_str()) {
                continue;
            }
            match merge::to_merged_record(record, output_dir) {
                Ok(merged) => output.push(merged),
                Err(err) => self.report(&record.id, FailureStage::MetadataOutput, err),
            }
        }
        metrics::merge::records_emitted(output.len());
        Ok(output)
    }

    pub fn run(
        &self,
        metadata: &MetadataCollection,
        output_dir: &Path,
        persist_images: bool,
    ) -> Result<Vec<MergedRecord>> {
        let joined = self.merge(metadata)?;
        self.download_and_save(&joined, metadata, output_dir, persist_images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::PrepError;
    use crate::domain::{ImagePayload, ImageRecord, MetadataRecord};
    use crate::infra::failure_sink::CollectingFailureSink;
    use crate::infra::image_store::InMemoryImageStore;
    use serde_json::json;
    use std::path::PathBuf;

    struct StaticImages(Vec<ImageRecord>);

    impl ImageSourcePort for StaticImages {
        fn load_images(&self) -> Result<Vec<ImageRecord>> {
            Ok(self.0.clone())
        }

        fn describe(&self) -> String {
            "static test images".to_string()
        }
    }

    /// Shares one in-memory store between the use case and the test.
    struct SharedStore(Arc<InMemoryImageStore>);

    impl ImageStorePort for SharedStore {
        fn ensure_dir(&self, dir: &Path) -> Result<()> {
            self.0.ensure_dir(dir)
        }

        fn check(&self, id: &str, payload: &ImagePayload) -> Result<()> {
            self.0.check(id, payload)
        }

        fn write_image(&self, id: &str, payload: &ImagePayload, path: &Path) -> Result<()> {
            self.0.write_image(id, payload, path)
        }
    }

    fn meta(id: &str) -> MetadataRecord {
        MetadataRecord {
            id: id.to_string(),
            image_description: Some(format!("desc {}", id)),
            attributes: Some(json!({"k": id})),
            attribute: None,
        }
    }

    fn image(id: &str, payload: ImagePayload) -> ImageRecord {
        ImageRecord {
            id: id.to_string(),
            payload,
        }
    }

    fn setup(
        images: Vec<ImageRecord>,
    ) -> (MergeUseCase, Arc<InMemoryImageStore>, Arc<CollectingFailureSink>) {
        let store = Arc::new(InMemoryImageStore::new());
        let sink = Arc::new(CollectingFailureSink::new());
        let use_case = MergeUseCase::new(
            Box::new(StaticImages(images)),
            Box::new(SharedStore(store.clone())),
            sink.clone(),
        );
        (use_case, store, sink)
    }

    #[test]
    fn failed_image_write_keeps_output_record() {
        let metadata: MetadataCollection = [meta("a"), meta("b"), meta("c")].into_iter().collect();
        let (use_case, store, sink) = setup(vec![
            image("a", ImagePayload::Encoded(vec![1])),
            image("b", ImagePayload::Missing),
        ]);

        let output = use_case.run(&metadata, Path::new("out"), true).unwrap();

        let ids: Vec<_> = output.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(store.written_paths(), vec![PathBuf::from("out").join("a.jpg")]);
        assert_eq!(store.created_dirs(), vec![PathBuf::from("out")]);

        let failures = sink.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].id, "b");
        assert_eq!(failures[0].stage, FailureStage::ImageWrite);
        assert_eq!(
            PathBuf::from(&output[1].image_path),
            PathBuf::from("out").join("b.jpg")
        );
    }

    #[test]
    fn without_persisting_nothing_is_written_but_payloads_are_checked() {
        let metadata: MetadataCollection = [meta("a"), meta("b")].into_iter().collect();
        let (use_case, store, sink) = setup(vec![
            image("a", ImagePayload::Encoded(vec![1])),
            image("b", ImagePayload::Missing),
        ]);

        let output = use_case.run(&metadata, Path::new("out"), false).unwrap();

        assert_eq!(output.len(), 2);
        assert!(store.written_paths().is_empty());
        assert!(store.created_dirs().is_empty());
        let failures = sink.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].stage, FailureStage::ImageCheck);
    }

    #[test]
    fn matched_only_coverage_drops_unjoined_metadata() {
        let metadata: MetadataCollection = [meta("a"), meta("b")].into_iter().collect();
        let (use_case, _, _) = setup(vec![image("b", ImagePayload::Encoded(vec![1]))]);
        let use_case = use_case.with_coverage(OutputCoverage::MatchedOnly);

        let output = use_case.run(&metadata, Path::new("out"), false).unwrap();
        let ids: Vec<_> = output.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn metadata_without_attributes_is_omitted_and_reported() {
        let mut broken = meta("b");
        broken.attributes = None;
        let metadata: MetadataCollection = [meta("a"), broken].into_iter().collect();
        let (use_case, _, sink) = setup(vec![
            image("a", ImagePayload::Encoded(vec![1])),
            image("b", ImagePayload::Encoded(vec![1])),
        ]);

        let output = use_case.run(&metadata, Path::new("out"), false).unwrap();

        assert_eq!(output.len(), 1);
        let failures = sink.failures();
        assert_eq!(failures[0].id, "b");
        assert_eq!(failures[0].stage, FailureStage::MetadataOutput);
    }

    #[test]
    fn disjoint_sources_abort_before_any_output() {
        let metadata: MetadataCollection = [meta("a")].into_iter().collect();
        let (use_case, store, _) = setup(vec![image("zzz", ImagePayload::Encoded(vec![1]))]);

        let err = use_case.run(&metadata, Path::new("out"), true).unwrap_err();
        assert!(matches!(err, PrepError::DataIntegrity(_)));
        assert!(store.created_dirs().is_empty());
    }
}
