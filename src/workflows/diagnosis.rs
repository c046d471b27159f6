use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use super::{correlation_id, notify_completion, stage_model};
use crate::agents::{
    DiagnosisReportAgent, DiagnosisRepairScopeAgent, MaintenanceDiagnosisAgent,
    MediaIngestionAgent,
};
use crate::clients::CompletionClient;
use crate::config::Config;
use crate::error::Result;
use crate::notify::{Notifier, NotifyTarget};
use crate::prompts::{self, PromptRegistry};
use crate::schemas::{
    DiagnosisInput, DiagnosisPayload, DiagnosisRejected, DiagnosisResult, NO_VALID_PHOTOS, Stage,
};

/// Photos plus a description in, likely cause and next steps out.
pub struct DiagnosisWorkflow {
    ingestion: MediaIngestionAgent,
    diagnosis: MaintenanceDiagnosisAgent,
    repair_scope: DiagnosisRepairScopeAgent,
    report: DiagnosisReportAgent,
    notifier: Arc<dyn Notifier>,
}

impl DiagnosisWorkflow {
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
            diagnosis: MaintenanceDiagnosisAgent::new(stage_model(
                &registry,
                prompts::MAINTENANCE_DIAGNOSIS,
                &client,
                &agents.diagnosis,
                &models.vision_model,
            )?),
            repair_scope: DiagnosisRepairScopeAgent::new(stage_model(
                &registry,
                prompts::DIAGNOSIS_REPAIR_SCOPE,
                &client,
                &agents.diagnosis_repair_scope,
                &models.text_model,
            )?),
            report: DiagnosisReportAgent::new(stage_model(
                &registry,
                prompts::DIAGNOSIS_REPORT,
                &client,
                &agents.diagnosis_report,
                &models.text_model,
            )?),
            notifier,
        })
    }

    pub async fn run(&self, input: DiagnosisInput) -> Result<DiagnosisResult> {
        let diagnosis_id = correlation_id(input.diagnosis_id.as_deref());
        info!(
            diagnosis_id = %diagnosis_id,
            photos = input.photos.len(),
            "diagnosis workflow started"
        );

        let photos = self.ingestion.process(&diagnosis_id, &input.photos);
        if photos.is_empty() {
            info!(diagnosis_id = %diagnosis_id, "no valid photos, stopping after ingest");
            return Ok(DiagnosisResult::NoValidPhotos(DiagnosisRejected {
                diagnosis_id,
                error: NO_VALID_PHOTOS.to_string(),
            }));
        }

        let context = input.property_context.as_ref();
        let mut warnings = Vec::new();

        let (diagnosis, warning) = self
            .diagnosis
            .diagnose(
                &diagnosis_id,
                &photos,
                input.user_description.as_deref(),
                context,
            )
            .await?
            .into_parts(Stage::Detect);
        warnings.extend(warning);

        let (scope, warning) = self
            .repair_scope
            .enrich(&diagnosis_id, &diagnosis.issues, context)
            .await?
            .into_parts(Stage::Enrich);
        warnings.extend(warning);

        let (report, warning) = self
            .report
            .write(
                &diagnosis_id,
                input.property.as_ref(),
                &diagnosis.diagnosis_summary,
                &scope,
            )
            .await?
            .into_parts(Stage::Report);
        warnings.extend(warning);

        let payload = DiagnosisPayload {
            diagnosis_id,
            report_markdown: report.report_markdown,
            report_summary_json: report.report_summary_json,
            diagnosis_summary: diagnosis.diagnosis_summary,
            issues_enriched: scope.issues_enriched,
            summary: scope.summary,
            processed_photos: photos,
            warnings,
            completed_at: Utc::now(),
        };
        info!(
            diagnosis_id = %payload.diagnosis_id,
            issues = payload.issues_enriched.len(),
            urgency = %payload.summary.overall_urgency,
            warnings = payload.warnings.len(),
            "diagnosis workflow finished"
        );

        notify_completion(
            &self.notifier,
            NotifyTarget::Diagnosis,
            &payload.diagnosis_id,
            &payload,
        );
        Ok(DiagnosisResult::Completed(Box::new(payload)))
    }
}
