use tracing::{debug, info};

use concord_diff::{DiffResult, LayerAdapters};
use concord_merge::{MergeEngine, MergeReport, MergeStrategy};
use concord_schema::Schema;
use concord_store::Document;

use crate::config::CurationConfig;
use crate::error::{SdkError, SdkResult};
use crate::report::DiffReport;

/// High-level curation API over one document.
///
/// The session owns the document. Annotator collections are only read; the
/// curation target is the only thing a merge changes.
pub struct CurationSession {
    schema: Schema,
    adapters: LayerAdapters,
    engine: MergeEngine,
    document: Document,
    config: CurationConfig,
}

impl CurationSession {
    /// Open a session, preparing the schema's adapters and merge engine.
    pub fn new(schema: Schema, document: Document, config: CurationConfig) -> SdkResult<Self> {
        let adapters = LayerAdapters::from_schema(&schema)?;
        let engine = MergeEngine::new(&schema, config.link_compare_behavior)?
            .abort_on_configuration_error(config.abort_on_configuration_error);
        debug!(
            document = %document.id(),
            layers = adapters.len(),
            annotators = document.annotators().len(),
            "curation session opened"
        );
        Ok(Self {
            schema,
            adapters,
            engine,
            document,
            config,
        })
    }

    /// Open a session from TOML schema and configuration documents.
    pub fn from_toml(schema: &str, config: &str, document: Document) -> SdkResult<Self> {
        let schema = Schema::from_toml_str(schema)?;
        let config = CurationConfig::from_toml_str(config)?;
        Self::new(schema, document, config)
    }

    // ---- Accessors ----

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &CurationConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    // ---- Diff and merge ----

    /// Diff all annotator collections of the document.
    pub fn diff(&self) -> DiffResult {
        concord_diff::diff_document(&self.adapters, &self.document, self.config.link_compare_behavior)
    }

    /// Merge with the configured strategy.
    pub fn merge(&mut self, diff: &DiffResult) -> SdkResult<MergeReport> {
        let strategy = self.config.strategy.build();
        self.merge_with(diff, strategy.as_ref())
    }

    /// Merge with an explicit strategy.
    ///
    /// The diff must have been computed with the session's link comparison,
    /// since link positions depend on it.
    pub fn merge_with(&mut self, diff: &DiffResult, strategy: &dyn MergeStrategy) -> SdkResult<MergeReport> {
        if diff.link_compare() != self.config.link_compare_behavior {
            return Err(SdkError::InvalidOperation(format!(
                "diff used {:?} but the session merges with {:?}",
                diff.link_compare(),
                self.config.link_compare_behavior
            )));
        }
        if self.config.clear_target_before_merge {
            self.clear_target();
        }
        Ok(self.engine.merge(&mut self.document, diff, strategy)?)
    }

    /// Diff, then merge with the configured strategy.
    pub fn run(&mut self) -> SdkResult<(DiffResult, MergeReport)> {
        let diff = self.diff();
        let report = self.merge(&diff)?;
        Ok((diff, report))
    }

    /// Discard the curation target and merge from scratch.
    pub fn remerge(&mut self) -> SdkResult<MergeReport> {
        self.clear_target();
        let diff = self.diff();
        self.merge(&diff)
    }

    fn clear_target(&mut self) {
        let removed = self.document.target().len();
        self.document.target_mut().clear();
        info!(document = %self.document.id(), removed, "curation target cleared");
    }

    // ---- Reports ----

    /// Render a diff as pretty JSON for display.
    pub fn diff_report_json(&self, diff: &DiffResult) -> SdkResult<String> {
        Ok(serde_json::to_string_pretty(&DiffReport::from(diff))?)
    }

    /// Render a merge report as pretty JSON for display.
    pub fn merge_report_json(&self, report: &MergeReport) -> SdkResult<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }
}
