use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use super::{correlation_id, notify_completion, stage_model};
use crate::agents::{
    InspectionReportAgent, InspectionRepairScopeAgent, InspectionVisionAgent,
    MediaIngestionAgent,
};
use crate::clients::CompletionClient;
use crate::config::Config;
use crate::error::Result;
use crate::notify::{Notifier, NotifyTarget};
use crate::prompts::{self, PromptRegistry};
use crate::schemas::{
    InspectionInput, InspectionPayload, InspectionRejected, InspectionResult, NO_VALID_PHOTOS,
    Stage,
};

/// Photos in, cost-estimated inspection report out.
pub struct InspectionWorkflow {
    ingestion: MediaIngestionAgent,
    vision: InspectionVisionAgent,
    repair_scope: InspectionRepairScopeAgent,
    report: InspectionReportAgent,
    notifier: Arc<dyn Notifier>,
}

impl InspectionWorkflow {
    pub fn new(
        config: &Config,
        client: Arc<dyn CompletionClient>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let registry = PromptRegistry::new();
        let agents = &config.agents;
        let models = &config.completion;
        Ok(Self {
            ingestion: MediaIngestionAgent::new(),
            vision: InspectionVisionAgent::new(stage_model(
                &registry,
                prompts::INSPECTION_VISION,
                &client,
                &agents.vision,
                &models.vision_model,
            )?),
            repair_scope: InspectionRepairScopeAgent::new(stage_model(
                &registry,
                prompts::INSPECTION_REPAIR_SCOPE,
                &client,
                &agents.inspection_repair_scope,
                &models.text_model,
            )?),
            report: InspectionReportAgent::new(stage_model(
                &registry,
                prompts::INSPECTION_REPORT,
                &client,
                &agents.inspection_report,
                &models.text_model,
            )?),
            notifier,
        })
    }

    pub async fn run(&self, input: InspectionInput) -> Result<InspectionResult> {
        let inspection_id = correlation_id(input.inspection_id.as_deref());
        info!(
            inspection_id = %inspection_id,
            photos = input.photos.len(),
            "inspection workflow started"
        );

        let photos = self.ingestion.process(&inspection_id, &input.photos);
        if photos.is_empty() {
            info!(inspection_id = %inspection_id, "no valid photos, stopping after ingest");
            return Ok(InspectionResult::NoValidPhotos(InspectionRejected {
                inspection_id,
                error: NO_VALID_PHOTOS.to_string(),
            }));
        }

        let context = input.property_context.as_ref();
        let mut warnings = Vec::new();

        let (issues, warning) = self
            .vision
            .detect(&inspection_id, &photos, context)
            .await?
            .into_parts(Stage::Detect);
        warnings.extend(warning);

        let (scope, warning) = self
            .repair_scope
            .enrich(&inspection_id, &issues, context)
            .await?
            .into_parts(Stage::Enrich);
        warnings.extend(warning);

        let (report, warning) = self
            .report
            .write(&inspection_id, input.property.as_ref(), &scope)
            .await?
            .into_parts(Stage::Report);
        warnings.extend(warning);

        let payload = InspectionPayload {
            inspection_id,
            report_markdown: report.report_markdown,
            report_summary_json: report.report_summary_json,
            issues_enriched: scope.issues_enriched,
            summary: scope.summary,
            processed_photos: photos,
            warnings,
            completed_at: Utc::now(),
        };
        info!(
            inspection_id = %payload.inspection_id,
            issues = payload.issues_enriched.len(),
            severity = %payload.summary.summary_severity,
            warnings = payload.warnings.len(),
            "inspection workflow finished"
        );

        notify_completion(
            &self.notifier,
            NotifyTarget::Inspection,
            &payload.inspection_id,
            &payload,
        );
        Ok(InspectionResult::Completed(Box::new(payload)))
    }
}
