use std::collections::BTreeMap;

use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentSpec},
        core::v1::{
            Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec, ResourceRequirements,
        },
    },
    apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::LabelSelector},
};
use kube::core::ObjectMeta;

use crate::{
    Error, Result,
    kubernetes::{Labels, SelectorLabels, deployment_name},
};

/*
 * ============================================================================
 * Deployment Builder
 * ============================================================================
 */
/// Builds the `apps/v1` Deployment running the Django container.
///
/// Construction validates every field; a constructed builder's `build` is a
/// pure function of those fields.
pub struct DeploymentBuilder {
    name: String,
    namespace: String,
    image: String,
    port: i32,
    requests: BTreeMap<String, Quantity>,
    limits: Option<BTreeMap<String, Quantity>>,
    labels: Labels,
    pod_labels: SelectorLabels,
    min_replicas: i32,
    env: Vec<EnvVar>,
}

impl DeploymentBuilder {
    /// # Errors
    ///
    /// Returns `Error::InvalidSpec` naming the first field that fails
    /// validation.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        namespace: &str,
        image: &str,
        port: i32,
        requests: BTreeMap<String, Quantity>,
        limits: Option<BTreeMap<String, Quantity>>,
        labels: &Labels,
        pod_labels: &SelectorLabels,
        min_replicas: i32,
        env: Vec<EnvVar>,
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidSpec("name must be a non-empty string".into()));
        }
        if namespace.is_empty() {
            return Err(Error::InvalidSpec(
                "namespace must be a non-empty string".into(),
            ));
        }
        if image.is_empty() {
            return Err(Error::InvalidSpec(
                "image must be a non-empty string".into(),
            ));
        }
        if !(1..=65535).contains(&port) {
            return Err(Error::InvalidSpec(format!(
                "port must be between 1 and 65535, got {port}"
            )));
        }
        if !requests.contains_key("cpu") {
            return Err(Error::InvalidSpec(
                "resources.requests must contain 'cpu'".into(),
            ));
        }
        if !requests.contains_key("memory") {
            return Err(Error::InvalidSpec(
                "resources.requests must contain 'memory'".into(),
            ));
        }
        if min_replicas < 1 {
            return Err(Error::InvalidSpec(format!(
                "min_replicas must be >= 1, got {min_replicas}"
            )));
        }

        Ok(Self {
            name: name.into(),
            namespace: namespace.into(),
            image: image.into(),
            port,
            requests,
            limits,
            labels: labels.clone(),
            pod_labels: pod_labels.clone(),
            min_replicas,
            env,
        })
    }

    #[must_use]
    pub fn build(&self) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some(deployment_name(&self.name)),
                namespace: Some(self.namespace.clone()),
                labels: Some((&self.labels).into()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(self.min_replicas),
                selector: LabelSelector {
                    match_labels: Some((&self.pod_labels).into()),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some((&self.pod_labels).into()),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: "django".into(),
                            image: Some(self.image.clone()),
                            ports: Some(vec![ContainerPort {
                                container_port: self.port,
                                name: Some("http".into()),
                                protocol: Some("TCP".into()),
                                ..Default::default()
                            }]),
                            // An absent env list is still emitted as an
                            // explicit empty list.
                            env: Some(self.env.clone()),
                            resources: Some(ResourceRequirements {
                                requests: Some(self.requests.clone()),
                                limits: self.limits.clone(),
                                ..Default::default()
                            }),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::kubernetes::{generate_labels, generate_selector_labels};

    use super::*;

    fn requests() -> BTreeMap<String, Quantity> {
        BTreeMap::from([
            ("cpu".into(), Quantity("100m".into())),
            ("memory".into(), Quantity("128Mi".into())),
        ])
    }

    fn builder() -> DeploymentBuilder {
        DeploymentBuilder::new(
            "test-app",
            "default",
            "registry/app:v1",
            8000,
            requests(),
            None,
            &generate_labels("test-app"),
            &generate_selector_labels("test-app"),
            2,
            Vec::new(),
        )
        .expect("builder to be valid")
    }

    #[test]
    fn build_generates_deployment() {
        // act
        let deployment = builder().build();

        // assert
        assert_eq!(
            deployment.metadata.name.as_deref(),
            Some("test-app-deployment")
        );
        assert_eq!(deployment.metadata.namespace.as_deref(), Some("default"));

        let spec = deployment.spec.expect("spec to be present");
        assert_eq!(spec.replicas, Some(2));

        let pod_spec = spec.template.spec.expect("pod spec to be present");
        assert_eq!(pod_spec.containers.len(), 1);

        let container = &pod_spec.containers[0];
        assert_eq!(container.name, "django");
        assert_eq!(container.image.as_deref(), Some("registry/app:v1"));

        let ports = container.ports.as_ref().expect("ports to be present");
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].container_port, 8000);
        assert_eq!(ports[0].name.as_deref(), Some("http"));
        assert_eq!(ports[0].protocol.as_deref(), Some("TCP"));
    }

    #[test]
    fn build_is_pure() {
        // arrange
        let builder = builder();

        // assert
        assert_eq!(builder.build(), builder.build());
    }

    #[test]
    fn build_selector_matches_pod_template_labels() {
        // act
        let deployment = builder().build();

        // assert
        let spec = deployment.spec.expect("spec to be present");
        let match_labels = spec.selector.match_labels.expect("selector to be present");
        let template_labels = spec
            .template
            .metadata
            .and_then(|metadata| metadata.labels)
            .expect("template labels to be present");

        let pod_labels: BTreeMap<String, String> = (&generate_selector_labels("test-app")).into();
        assert_eq!(match_labels, template_labels);
        assert_eq!(match_labels, pod_labels);
    }

    #[test]
    fn build_emits_explicit_empty_env_list() {
        // act
        let deployment = builder().build();

        // assert
        let container = &deployment
            .spec
            .expect("spec to be present")
            .template
            .spec
            .expect("pod spec to be present")
            .containers[0];
        assert_eq!(container.env, Some(Vec::new()));
    }

    #[test]
    fn build_passes_absent_limits_through_unset() {
        // act
        let deployment = builder().build();

        // assert
        let container = &deployment
            .spec
            .expect("spec to be present")
            .template
            .spec
            .expect("pod spec to be present")
            .containers[0];
        let resources = container
            .resources
            .as_ref()
            .expect("resources to be present");
        assert_eq!(resources.requests.as_ref(), Some(&requests()));
        assert_eq!(resources.limits, None);
    }

    #[test]
    fn new_rejects_port_out_of_range() {
        for port in [0, -1, 65536, 99999] {
            // act
            let result = DeploymentBuilder::new(
                "test-app",
                "default",
                "registry/app:v1",
                port,
                requests(),
                None,
                &generate_labels("test-app"),
                &generate_selector_labels("test-app"),
                1,
                Vec::new(),
            );

            // assert
            match result {
                Err(Error::InvalidSpec(reason)) => assert!(reason.contains("port")),
                _ => panic!("port {port} to be rejected"),
            }
        }
    }

    #[test]
    fn new_rejects_missing_requests_cpu() {
        // act
        let result = DeploymentBuilder::new(
            "test-app",
            "default",
            "registry/app:v1",
            8000,
            BTreeMap::from([("memory".into(), Quantity("128Mi".into()))]),
            None,
            &generate_labels("test-app"),
            &generate_selector_labels("test-app"),
            1,
            Vec::new(),
        );

        // assert
        match result {
            Err(Error::InvalidSpec(reason)) => assert!(reason.contains("cpu")),
            _ => panic!("missing cpu request to be rejected"),
        }
    }

    #[test]
    fn new_rejects_missing_requests_memory() {
        // act
        let result = DeploymentBuilder::new(
            "test-app",
            "default",
            "registry/app:v1",
            8000,
            BTreeMap::from([("cpu".into(), Quantity("100m".into()))]),
            None,
            &generate_labels("test-app"),
            &generate_selector_labels("test-app"),
            1,
            Vec::new(),
        );

        // assert
        match result {
            Err(Error::InvalidSpec(reason)) => assert!(reason.contains("memory")),
            _ => panic!("missing memory request to be rejected"),
        }
    }

    #[test]
    fn new_rejects_empty_image() {
        // act
        let result = DeploymentBuilder::new(
            "test-app",
            "default",
            "",
            8000,
            requests(),
            None,
            &generate_labels("test-app"),
            &generate_selector_labels("test-app"),
            1,
            Vec::new(),
        );

        // assert
        match result {
            Err(Error::InvalidSpec(reason)) => assert!(reason.contains("image")),
            _ => panic!("empty image to be rejected"),
        }
    }

    #[test]
    fn new_rejects_min_replicas_below_one() {
        // act
        let result = DeploymentBuilder::new(
            "test-app",
            "default",
            "registry/app:v1",
            8000,
            requests(),
            None,
            &generate_labels("test-app"),
            &generate_selector_labels("test-app"),
            0,
            Vec::new(),
        );

        // assert
        match result {
            Err(Error::InvalidSpec(reason)) => assert!(reason.contains("min_replicas")),
            _ => panic!("min_replicas 0 to be rejected"),
        }
    }
}
