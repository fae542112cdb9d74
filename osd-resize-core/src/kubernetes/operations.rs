use std::fmt::Debug;

use anyhow::{anyhow, Context};
use http::{header::HeaderName, HeaderValue};
use k8s_openapi::{
    serde::{de::DeserializeOwned, Serialize},
    NamespaceResourceScope,
};
use kube::{
    api::{DeleteParams, ListParams, Patch, PatchParams, PostParams},
    client::ClientBuilder,
    config::{KubeConfigOptions, Kubeconfig},
    Api, Client, Config, Resource,
};
use log::{debug, info};
use serde_json::Value;
use tower_http::set_header::SetRequestHeaderLayer;

use crate::helpers::pretty_type_name;

const IMPERSONATE_USER_HEADER: &str = "impersonate-user";
const IMPERSONATE_REASON_HEADER: &str = "impersonate-extra-reason";

/// Identity and audit justification used when acting with elevated privileges.
#[derive(Debug, Clone)]
pub struct Elevation {
    pub user: String,
    pub reason: String,
}

pub async fn create_client(kube_config: &Kubeconfig, context: &str) -> anyhow::Result<Client> {
    let config = create_config(kube_config, context).await?;
    let client = Client::try_from(config)?;

    Ok(client)
}

pub async fn create_elevated_client(
    kube_config: &Kubeconfig,
    context: &str,
    elevation: &Elevation,
) -> anyhow::Result<Client> {
    if elevation.reason.trim().is_empty() {
        return Err(anyhow!(
            "A reason is required to perform elevated actions on the cluster!"
        ));
    }

    let user = HeaderValue::from_str(&elevation.user)
        .context("Elevation user contains characters that can't be sent in a header!")?;
    let reason = HeaderValue::from_str(elevation.reason.trim())
        .context("Elevation reason contains characters that can't be sent in a header!")?;

    debug!(
        "Creating a client for '{context}' impersonating '{}'...",
        elevation.user
    );

    let config = create_config(kube_config, context).await?;
    let client = ClientBuilder::try_from(config)?
        .with_layer(&SetRequestHeaderLayer::overriding(
            HeaderName::from_static(IMPERSONATE_USER_HEADER),
            user,
        ))
        .with_layer(&SetRequestHeaderLayer::overriding(
            HeaderName::from_static(IMPERSONATE_REASON_HEADER),
            reason,
        ))
        .build();

    Ok(client)
}

async fn create_config(kube_config: &Kubeconfig, context: &str) -> anyhow::Result<Config> {
    let config_options = KubeConfigOptions {
        context: Some(context.to_owned()),
        ..Default::default()
    };

    Config::from_custom_kubeconfig(kube_config.clone(), &config_options)
        .await
        .context(format!("Couldn't load '{context}' kubeconfig context!"))
}

pub async fn try_get_resource<T>(
    client: &Client,
    name: &str,
    namespace: &str,
) -> anyhow::Result<Option<T>>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    let resource = api.get_opt(name).await.context(format!(
        "Couldn't retrieve '{name}' {} from the cluster!",
        pretty_type_name::<T>()
    ))?;

    Ok(resource)
}

pub async fn list_resources<T>(
    client: &Client,
    namespace: &str,
    list_params: &ListParams,
) -> anyhow::Result<Vec<T>>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    let resources = api.list(list_params).await.context(format!(
        "Couldn't list {} resources in '{namespace}' namespace!",
        pretty_type_name::<T>()
    ))?;

    Ok(resources.items)
}

pub async fn list_cluster_resources<T>(
    client: &Client,
    list_params: &ListParams,
) -> anyhow::Result<Vec<T>>
where
    T: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    let api: Api<T> = Api::all(client.clone());
    let resources = api.list(list_params).await.context(format!(
        "Couldn't list {} resources!",
        pretty_type_name::<T>()
    ))?;

    Ok(resources.items)
}

pub async fn create_resource<T>(
    client: &Client,
    resource: &T,
    post_params: &PostParams,
) -> anyhow::Result<()>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Serialize
        + Clone
        + DeserializeOwned
        + Debug,
{
    let resource_name = resource
        .meta()
        .name
        .as_deref()
        .ok_or_else(|| anyhow!("{} is missing a name!", pretty_type_name::<T>()))?;
    let namespace = resource
        .meta()
        .namespace
        .as_deref()
        .ok_or_else(|| anyhow!("{} is missing a namespace!", pretty_type_name::<T>()))?;

    info!(
        "Creating '{resource_name}' {} resource on the cluster...",
        pretty_type_name::<T>()
    );

    let resource_api: Api<T> = Api::namespaced(client.clone(), namespace);
    resource_api
        .create(post_params, resource)
        .await
        .context(format!(
            "Unable to create '{resource_name}' {} resource!",
            pretty_type_name::<T>()
        ))?;

    Ok(())
}

pub async fn try_remove_resource<T>(
    client: &Client,
    name: &str,
    namespace: &str,
    delete_params: &DeleteParams,
) -> anyhow::Result<bool>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);

    info!(
        "Removing '{name}' {} from the cluster...",
        pretty_type_name::<T>()
    );

    match api.delete(name, delete_params).await {
        Ok(_) => Ok(true),
        Err(kube::Error::Api(response)) if response.code == 404 => Ok(false),
        Err(error) => Err(error).context(format!(
            "Couldn't delete '{name}' {} from the cluster!",
            pretty_type_name::<T>()
        )),
    }
}

pub async fn merge_patch_resource<T>(
    client: &Client,
    name: &str,
    namespace: &str,
    patch: &Value,
    patch_params: &PatchParams,
) -> anyhow::Result<T>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);

    debug!("{patch:#}");

    let patched = api
        .patch(name, patch_params, &Patch::Merge(patch))
        .await
        .context(format!(
            "Unable to patch '{name}' {} resource!",
            pretty_type_name::<T>()
        ))?;

    Ok(patched)
}
