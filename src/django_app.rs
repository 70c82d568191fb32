use std::{collections::BTreeMap, sync::Arc, time::Duration};

use futures::StreamExt;
use k8s_openapi::{
    NamespaceResourceScope,
    api::{
        apps::v1::Deployment,
        autoscaling::v2::HorizontalPodAutoscaler,
        core::v1::{EnvVar, Service},
        networking::v1::Ingress,
    },
    apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition,
    apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::OwnerReference},
};
use kube::{
    Api, Client, CustomResource, CustomResourceExt, Resource,
    api::{Patch, PatchParams},
    runtime::{Controller, controller::Action, watcher::Config as WatcherConfig},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    Error, Result,
    builders::{DeploymentBuilder, HpaBuilder, IngressBuilder, ServiceBuilder},
    kubernetes::{
        APP_KUBERNETES_IO_MANAGED_BY_VALUE, KubeResourceExt, ObjectName, ObjectNamespace,
        deployment_name, generate_labels, generate_selector_labels, hpa_name, ingress_name,
        service_name,
    },
};

/*
 * ============================================================================
 * Custom Resource Definition
 * ============================================================================
 */
#[allow(clippy::module_name_repetitions)]
#[derive(CustomResource, JsonSchema, Deserialize, Serialize, Debug, Clone, PartialEq)]
#[kube(
    group = "faultycloud.io",
    kind = "DjangoApp",
    namespaced,
    status = "DjangoAppStatus",
    version = "v1alpha1"
)]
pub struct DjangoAppSpec {
    pub autoscale: DjangoAppSpecAutoscale,

    pub deployment: DjangoAppSpecDeployment,

    pub env: Option<Vec<DjangoAppSpecEnvVar>>,

    pub ingress: DjangoAppSpecIngress,
}

#[allow(clippy::module_name_repetitions)]
#[derive(JsonSchema, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DjangoAppSpecAutoscale {
    /// The maximum number of replicas. Defaults to 1.
    pub max: Option<i32>,

    /// The minimum number of replicas, also used as the Deployment's initial
    /// replica count. Defaults to 1.
    pub min: Option<i32>,

    /// The CPU utilization percentage the autoscaler targets.
    #[serde(rename = "targetCPUUtilizationPercentage")]
    pub target_cpu_utilization_percentage: i32,
}

#[allow(clippy::module_name_repetitions)]
#[derive(JsonSchema, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DjangoAppSpecDeployment {
    /// The container image running the Django application.
    pub image: String,

    /// The port the Django application listens on.
    pub port: i32,

    pub resources: DjangoAppSpecDeploymentResources,
}

#[allow(clippy::module_name_repetitions)]
#[derive(JsonSchema, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DjangoAppSpecDeploymentResources {
    pub limits: Option<BTreeMap<String, Quantity>>,

    /// Must contain `cpu` and `memory`.
    pub requests: BTreeMap<String, Quantity>,
}

#[allow(clippy::module_name_repetitions)]
#[derive(JsonSchema, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DjangoAppSpecEnvVar {
    pub name: String,

    pub value: String,
}

#[allow(clippy::module_name_repetitions)]
#[derive(JsonSchema, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DjangoAppSpecIngress {
    /// The hostname external traffic is served on.
    pub host: String,

    #[serde(rename = "ingressClassName")]
    pub ingress_class_name: String,
}

#[allow(clippy::module_name_repetitions)]
#[derive(JsonSchema, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DjangoAppStatus {
    pub deployment: Option<String>,

    pub hpa: Option<String>,

    pub ingress: Option<String>,

    pub message: Option<String>,

    pub service: Option<String>,
}

impl DjangoApp {
    #[must_use]
    pub fn min_replicas(&self) -> i32 {
        self.spec.autoscale.min.unwrap_or(1)
    }

    #[must_use]
    pub fn max_replicas(&self) -> i32 {
        self.spec.autoscale.max.unwrap_or(1)
    }

    #[must_use]
    pub fn env_vars(&self) -> Vec<EnvVar> {
        self.spec
            .env
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|env_var| EnvVar {
                name: env_var.name.clone(),
                value: Some(env_var.value.clone()),
                ..Default::default()
            })
            .collect()
    }
}

impl KubeResourceExt for DjangoApp {}

#[must_use]
pub fn generate_custom_resource_definition() -> CustomResourceDefinition {
    DjangoApp::crd()
}

/*
 * ============================================================================
 * Controller
 * ============================================================================
 */
#[allow(clippy::missing_panics_doc)]
pub async fn run_controller() {
    // resolves in-cluster credentials first, then the local kubeconfig
    let client = Client::try_default().await.unwrap();

    let django_apps = Api::<DjangoApp>::all(client.clone());
    let deployments = Api::<Deployment>::all(client.clone());
    let hpas = Api::<HorizontalPodAutoscaler>::all(client.clone());
    let services = Api::<Service>::all(client.clone());
    let ingresses = Api::<Ingress>::all(client.clone());

    let context = Arc::new(Context { client });

    Controller::new(django_apps, WatcherConfig::default())
        .owns(deployments, WatcherConfig::default())
        .owns(hpas, WatcherConfig::default())
        .owns(services, WatcherConfig::default())
        .owns(ingresses, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconciler, error_policy, context)
        .for_each(|_| async {})
        .await;
}

/*
 * ============================================================================
 * Context
 * ============================================================================
 */
struct Context {
    client: Client,
}

/*
 * ============================================================================
 * Children
 * ============================================================================
 */
pub enum Child {
    Deployment(Deployment),
    HorizontalPodAutoscaler(HorizontalPodAutoscaler),
    Service(Service),
    Ingress(Ingress),
}

impl Child {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Child::Deployment(_) => "Deployment",
            Child::HorizontalPodAutoscaler(_) => "HorizontalPodAutoscaler",
            Child::Service(_) => "Service",
            Child::Ingress(_) => "Ingress",
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Child::Deployment(deployment) => deployment.metadata.name.as_deref(),
            Child::HorizontalPodAutoscaler(hpa) => hpa.metadata.name.as_deref(),
            Child::Service(service) => service.metadata.name.as_deref(),
            Child::Ingress(ingress) => ingress.metadata.name.as_deref(),
        }
    }
}

/// Builds all four children from the spec, in apply order.
///
/// The order is load-bearing: the HPA's scale target and the Service's
/// selector point at the Deployment, and the Ingress backend points at the
/// Service. Applying an Ingress before its Service leaves a window where the
/// backend resolves to nothing.
///
/// # Errors
///
/// Returns `Error::InvalidSpec` before any child is built when a builder
/// rejects its inputs.
pub fn generate_children(
    object: &DjangoApp,
    app_name: &str,
    namespace: &str,
    owner_reference: &OwnerReference,
) -> Result<Vec<Child>> {
    let labels = generate_labels(app_name);
    let selector_labels = generate_selector_labels(app_name);

    let deployment_spec = &object.spec.deployment;
    let autoscale_spec = &object.spec.autoscale;
    let ingress_spec = &object.spec.ingress;

    let mut deployment = DeploymentBuilder::new(
        app_name,
        namespace,
        &deployment_spec.image,
        deployment_spec.port,
        deployment_spec.resources.requests.clone(),
        deployment_spec.resources.limits.clone(),
        &labels,
        &selector_labels,
        object.min_replicas(),
        object.env_vars(),
    )?
    .build();

    let mut hpa = HpaBuilder::new(
        app_name,
        namespace,
        object.min_replicas(),
        object.max_replicas(),
        autoscale_spec.target_cpu_utilization_percentage,
        &labels,
    )?
    .build();

    let mut service = ServiceBuilder::new(
        app_name,
        namespace,
        deployment_spec.port,
        &labels,
        &selector_labels,
    )?
    .build();

    let mut ingress = IngressBuilder::new(
        app_name,
        namespace,
        &ingress_spec.ingress_class_name,
        &ingress_spec.host,
        &labels,
    )?
    .build();

    // adoption: the owner reference lets Kubernetes cascade-delete the
    // children when the DjangoApp is deleted
    deployment.metadata.owner_references = Some(vec![owner_reference.clone()]);
    hpa.metadata.owner_references = Some(vec![owner_reference.clone()]);
    service.metadata.owner_references = Some(vec![owner_reference.clone()]);
    ingress.metadata.owner_references = Some(vec![owner_reference.clone()]);

    Ok(vec![
        Child::Deployment(deployment),
        Child::HorizontalPodAutoscaler(hpa),
        Child::Service(service),
        Child::Ingress(ingress),
    ])
}

/*
 * ============================================================================
 * Reconciler
 * ============================================================================
 */
#[tracing::instrument(skip(object, ctx))]
async fn reconciler(object: Arc<DjangoApp>, ctx: Arc<Context>) -> Result<Action> {
    tracing::info!("reconciling");

    let object_name = object.try_name()?;
    let object_namespace = object.try_namespace()?;

    let owner_reference = object
        .controller_owner_ref(&())
        .ok_or(Error::MissingObjectKey(".metadata.uid"))?;

    let children = generate_children(&object, &object_name, &object_namespace, &owner_reference)?;

    for child in &children {
        reconcile_child(&ctx, &object_namespace, child).await?;
        tracing::info!(kind = child.kind(), name = child.name(), "applied");
    }

    reconcile_status(&ctx, &object_name, &object_namespace).await?;

    tracing::info!("reconciled");

    Ok(Action::requeue(Duration::from_secs(3600)))
}

async fn reconcile_child(
    ctx: &Context,
    object_namespace: &ObjectNamespace<'_>,
    child: &Child,
) -> Result<()> {
    match child {
        Child::Deployment(deployment) => patch_resource(ctx, object_namespace, deployment).await,
        Child::HorizontalPodAutoscaler(hpa) => patch_resource(ctx, object_namespace, hpa).await,
        Child::Service(service) => patch_resource(ctx, object_namespace, service).await,
        Child::Ingress(ingress) => patch_resource(ctx, object_namespace, ingress).await,
    }
}

async fn patch_resource<K>(
    ctx: &Context,
    object_namespace: &ObjectNamespace<'_>,
    resource: &K,
) -> Result<()>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + std::fmt::Debug
        + Serialize
        + DeserializeOwned,
{
    let resources = Api::<K>::namespaced(ctx.client.clone(), object_namespace);

    resources
        .patch(
            resource
                .meta()
                .name
                .as_ref()
                .ok_or(Error::MissingObjectKey(".metadata.name"))?,
            &PatchParams::apply(APP_KUBERNETES_IO_MANAGED_BY_VALUE).force(),
            &Patch::Apply(resource),
        )
        .await
        .map_err(Error::Kube)?;

    Ok(())
}

async fn reconcile_status(
    ctx: &Context,
    object_name: &ObjectName<'_>,
    object_namespace: &ObjectNamespace<'_>,
) -> Result<()> {
    let django_apps = Api::<DjangoApp>::namespaced(ctx.client.clone(), object_namespace);

    let status = DjangoAppStatus {
        deployment: Some(deployment_name(object_name)),
        hpa: Some(hpa_name(object_name)),
        ingress: Some(ingress_name(object_name)),
        message: Some("All resources reconciled successfully".into()),
        service: Some(service_name(object_name)),
    };

    django_apps
        .patch_status(
            object_name,
            &PatchParams::apply(APP_KUBERNETES_IO_MANAGED_BY_VALUE),
            &Patch::Merge(serde_json::json!({ "status": status })),
        )
        .await
        .map_err(Error::Kube)?;

    Ok(())
}

/*
 * ============================================================================
 * Error Policy
 * ============================================================================
 */
#[allow(clippy::needless_pass_by_value, unused_variables)]
#[tracing::instrument(skip(object, ctx))]
fn error_policy(object: Arc<DjangoApp>, error: &Error, ctx: Arc<Context>) -> Action {
    tracing::error!("failed to reconcile");
    Action::requeue(Duration::from_secs(5))
}
