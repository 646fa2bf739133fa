//! Flattening projection: interactions -> page-view delivery payloads.
//!
//! Pure and stateless. One interaction with N page views becomes N payload
//! records carrying the interaction's facets alongside each event.

use pagestream_types::record::{InteractionRecord, PageViewRecord, SinkRecord};

/// Flatten interactions into one payload per page-view event, preserving
/// interaction order and event order within each interaction.
#[must_use]
pub fn project(interactions: &[InteractionRecord]) -> Vec<PageViewRecord> {
    interactions
        .iter()
        .flat_map(|interaction| {
            interaction.page_views.iter().map(|view| PageViewRecord {
                page_view_event_id: view.event_id.clone(),
                event_timestamp: view.timestamp.to_rfc3339(),
                interaction_id: interaction.interaction_id.clone(),
                contact_id: interaction.contact_id.clone(),
                url: view.url.clone(),
                duration_seconds: view.duration_seconds,
                site_name: interaction.site_name.clone(),
                email_address: interaction.email_address.clone(),
                user_agent: interaction.user_agent.clone(),
                ip_address: interaction.ip_address.clone(),
            })
        })
        .collect()
}

/// Serialize payloads to JSON-lines sink records.
///
/// # Errors
///
/// Returns the serde error if a payload cannot be serialized.
pub fn encode_records(payloads: &[PageViewRecord]) -> Result<Vec<SinkRecord>, serde_json::Error> {
    payloads.iter().map(SinkRecord::from_payload).collect()
}
