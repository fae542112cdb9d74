use anyhow::{anyhow, Context};
use async_trait::async_trait;
use log::{debug, info};
use regex::Regex;
use serde_json::Value;

use super::OcmConnection;

pub const CONTROL_PLANE_RESIZED_TEMPLATE: &str = "https://raw.githubusercontent.com/openshift/managed-notifications/master/osd/controlplane_resized.json";
pub const INFRA_RESIZED_TEMPLATE: &str = "https://raw.githubusercontent.com/openshift/managed-notifications/master/osd/infranode_resized_auto.json";

const CLUSTER_LOGS_ENDPOINT: &str = "/api/service_logs/v1/cluster_logs";

/// Customer-facing service log, rendered from a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLogRequest {
    pub template: String,
    pub template_params: Vec<(String, String)>,
    pub cluster_id: String,
}

#[async_trait]
pub trait ServiceLogPoster: Send + Sync {
    async fn post(&self, request: &ServiceLogRequest) -> anyhow::Result<()>;
}

pub fn render_template(
    template: &Value,
    params: &[(String, String)],
) -> anyhow::Result<Value> {
    let mut rendered = template.clone();

    substitute(&mut rendered, params);

    let leftover = Regex::new(r"\$\{[A-Z0-9_]+\}")?;
    if let Some(placeholder) = find_placeholder(&rendered, &leftover) {
        return Err(anyhow!(
            "Service log template parameter {placeholder} wasn't provided!"
        ));
    }

    Ok(rendered)
}

fn substitute(value: &mut Value, params: &[(String, String)]) {
    match value {
        Value::String(text) => {
            for (key, replacement) in params {
                *text = text.replace(&format!("${{{key}}}"), replacement);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| substitute(v, params)),
        Value::Object(map) => map.values_mut().for_each(|v| substitute(v, params)),
        _ => {}
    }
}

fn find_placeholder(value: &Value, pattern: &Regex) -> Option<String> {
    match value {
        Value::String(text) => pattern.find(text).map(|m| m.as_str().to_owned()),
        Value::Array(items) => items.iter().find_map(|v| find_placeholder(v, pattern)),
        Value::Object(map) => map.values().find_map(|v| find_placeholder(v, pattern)),
        _ => None,
    }
}

#[async_trait]
impl ServiceLogPoster for OcmConnection {
    async fn post(&self, request: &ServiceLogRequest) -> anyhow::Result<()> {
        let template = reqwest::get(&request.template)
            .await?
            .error_for_status()
            .context(format!(
                "Couldn't download '{}' service log template!",
                request.template
            ))?
            .json::<Value>()
            .await
            .context("Service log template isn't valid JSON!")?;

        let mut body = render_template(&template, &request.template_params)?;
        body["cluster_id"] = Value::String(request.cluster_id.clone());

        debug!("{body:#}");

        self.post_json(CLUSTER_LOGS_ENDPOINT, &body)
            .await
            .context("Couldn't post the service log!")?;

        info!("Service log posted to cluster '{}'!", request.cluster_id);

        Ok(())
    }
}
