use std::io::{BufRead, Write};

use anyhow::{anyhow, Context};
use log::info;

use super::prompt::Prompter;
use crate::ocm::servicelog::{ServiceLogPoster, ServiceLogRequest};

/// Asks the operator whether to tell the customer about the resize and posts the service log.
///
/// Returns `false` when the operator declines.
pub async fn offer_service_log<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    poster: &dyn ServiceLogPoster,
    cluster_id: &str,
    template: &str,
    instance_type: &str,
) -> anyhow::Result<bool> {
    let follow_up = || {
        format!(
            "Send the '{template}' service log to cluster '{cluster_id}' by hand (INSTANCE_TYPE={instance_type})!"
        )
    };

    let send = prompter
        .confirm("Send a service log to the customer?")
        .map_err(|e| anyhow!("Couldn't read the answer ({e})! {}", follow_up()))?;

    if !send {
        info!("No service log sent.");

        return Ok(false);
    }

    let ticket = prompter
        .read_non_empty("Ticket ID (e.g. OHSS-1234): ")
        .map_err(|e| anyhow!("Couldn't read the ticket ID ({e})! {}", follow_up()))?;
    let justification = prompter
        .read_non_empty("Justification: ")
        .map_err(|e| anyhow!("Couldn't read the justification ({e})! {}", follow_up()))?;

    let request = ServiceLogRequest {
        template: template.to_owned(),
        template_params: vec![
            ("INSTANCE_TYPE".to_owned(), instance_type.to_owned()),
            ("JIRA_ID".to_owned(), ticket),
            ("JUSTIFICATION".to_owned(), justification),
        ],
        cluster_id: cluster_id.to_owned(),
    };

    poster.post(&request).await.with_context(follow_up)?;

    Ok(true)
}
