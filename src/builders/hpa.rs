use k8s_openapi::api::autoscaling::v2::{
    CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec, MetricSpec,
    MetricTarget, ResourceMetricSource,
};
use kube::core::ObjectMeta;

use crate::{
    Error, Result,
    kubernetes::{Labels, deployment_name, hpa_name},
};

/*
 * ============================================================================
 * Horizontal Pod Autoscaler Builder
 * ============================================================================
 */
/// Builds the `autoscaling/v2` Horizontal Pod Autoscaler scaling the
/// Deployment on CPU utilization.
pub struct HpaBuilder {
    name: String,
    namespace: String,
    min_replicas: i32,
    max_replicas: i32,
    target_cpu_utilization_percentage: i32,
    labels: Labels,
}

impl HpaBuilder {
    /// # Errors
    ///
    /// Returns `Error::InvalidSpec` naming the first field that fails
    /// validation.
    pub fn new(
        name: &str,
        namespace: &str,
        min_replicas: i32,
        max_replicas: i32,
        target_cpu_utilization_percentage: i32,
        labels: &Labels,
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidSpec("name must be a non-empty string".into()));
        }
        if namespace.is_empty() {
            return Err(Error::InvalidSpec(
                "namespace must be a non-empty string".into(),
            ));
        }
        if min_replicas < 1 {
            return Err(Error::InvalidSpec(format!(
                "min_replicas must be >= 1, got {min_replicas}"
            )));
        }
        if max_replicas < 1 {
            return Err(Error::InvalidSpec(format!(
                "max_replicas must be >= 1, got {max_replicas}"
            )));
        }
        if min_replicas > max_replicas {
            return Err(Error::InvalidSpec(format!(
                "min_replicas ({min_replicas}) cannot be greater than max_replicas ({max_replicas})"
            )));
        }
        if !(1..=100).contains(&target_cpu_utilization_percentage) {
            return Err(Error::InvalidSpec(format!(
                "target_cpu_utilization_percentage must be between 1 and 100, got {target_cpu_utilization_percentage}"
            )));
        }

        Ok(Self {
            name: name.into(),
            namespace: namespace.into(),
            min_replicas,
            max_replicas,
            target_cpu_utilization_percentage,
            labels: labels.clone(),
        })
    }

    #[must_use]
    pub fn build(&self) -> HorizontalPodAutoscaler {
        HorizontalPodAutoscaler {
            metadata: ObjectMeta {
                name: Some(hpa_name(&self.name)),
                namespace: Some(self.namespace.clone()),
                labels: Some((&self.labels).into()),
                ..Default::default()
            },
            spec: Some(HorizontalPodAutoscalerSpec {
                scale_target_ref: CrossVersionObjectReference {
                    api_version: Some("apps/v1".into()),
                    kind: "Deployment".into(),
                    name: deployment_name(&self.name),
                },
                min_replicas: Some(self.min_replicas),
                max_replicas: self.max_replicas,
                metrics: Some(vec![MetricSpec {
                    type_: "Resource".into(),
                    resource: Some(ResourceMetricSource {
                        name: "cpu".into(),
                        target: MetricTarget {
                            type_: "Utilization".into(),
                            average_utilization: Some(self.target_cpu_utilization_percentage),
                            ..Default::default()
                        },
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
