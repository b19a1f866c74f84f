//! Output formatting for CLI

use crate::pipeline::{CheckpointDocument, GlobalProfile, ProfileOutcome};

/// Format a checkpoint document as a status overview
pub fn format_document(doc: &CheckpointDocument) -> String {
    let info = &doc.session_info;
    let stats = &doc.statistics;
    let mut output = String::new();

    output.push_str(&format!("Session: {}\n", info.session_id));
    output.push_str(&format!("  Status: {}\n", info.status));
    output.push_str(&format!("  Source: {}\n", info.source_file));
    output.push_str(&format!("  Model: {}\n", info.model_id));
    output.push_str(&format!("  Batch size: {}\n", info.batch_size));
    output.push_str(&format!(
        "  Created: {}\n",
        info.created_at.format("%Y-%m-%d %H:%M:%S")
    ));
    output.push_str(&format!(
        "  Updated: {}\n",
        info.updated_at.format("%Y-%m-%d %H:%M:%S")
    ));

    output.push_str(&format!(
        "\nGames: {}/{} profiled, {} failed\n",
        stats.completed_entities, stats.total_entities, stats.failed_entities
    ));
    output.push_str(&format!(
        "Reviews: {}/{} analyzed\n",
        stats.analyzed_reviews, stats.total_reviews
    ));
    let successful = doc.batch_results.iter().filter(|b| b.is_success()).count();
    output.push_str(&format!(
        "Batches: {} recorded, {} successful\n",
        doc.batch_results.len(),
        successful
    ));
    output.push_str(&format!(
        "Processing time: {:.1}s\n",
        stats.total_processing_time
    ));

    if !doc.entity_profiles.is_empty() {
        output.push_str("\nProfiles:\n");
        for profile in doc.entity_profiles.values() {
            output.push_str(&format!(
                "  - {}: {}\n",
                profile.entity,
                describe(&profile.outcome)
            ));
        }
    }

    output.push_str(&format!("\nGlobal profile: {}\n", describe_global(doc.global_profile.as_ref())));
    output
}

fn describe(outcome: &ProfileOutcome) -> String {
    match outcome {
        ProfileOutcome::Success {
            total_reviews,
            degraded: true,
            ..
        } => format!("placeholder ({total_reviews} reviews)"),
        ProfileOutcome::Success { total_reviews, .. } => format!("ok ({total_reviews} reviews)"),
        ProfileOutcome::Failed { error } => format!("failed ({error})"),
    }
}

fn describe_global(global: Option<&GlobalProfile>) -> String {
    match global {
        Some(global) => format!(
            "{} from {} games",
            describe(&global.outcome),
            global.total_entities
        ),
        None => "not built yet".to_string(),
    }
}
