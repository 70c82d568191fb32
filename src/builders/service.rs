use k8s_openapi::{
    api::core::v1::{Service, ServicePort, ServiceSpec},
    apimachinery::pkg::util::intstr::IntOrString,
};
use kube::core::ObjectMeta;

use crate::{
    Error, Result,
    kubernetes::{Labels, SelectorLabels, service_name},
};

/*
 * ============================================================================
 * Service Builder
 * ============================================================================
 */
/// Builds the `v1` `ClusterIP` Service fronting the Deployment's pods.
///
/// The selector must stay byte-identical to the Deployment's pod template
/// labels, else the Service routes to nothing.
pub struct ServiceBuilder {
    name: String,
    namespace: String,
    port: i32,
    labels: Labels,
    pod_labels: SelectorLabels,
}

impl ServiceBuilder {
    /// # Errors
    ///
    /// Returns `Error::InvalidSpec` naming the first field that fails
    /// validation.
    pub fn new(
        name: &str,
        namespace: &str,
        port: i32,
        labels: &Labels,
        pod_labels: &SelectorLabels,
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidSpec("name must be a non-empty string".into()));
        }
        if namespace.is_empty() {
            return Err(Error::InvalidSpec(
                "namespace must be a non-empty string".into(),
            ));
        }
        if !(1..=65535).contains(&port) {
            return Err(Error::InvalidSpec(format!(
                "port must be between 1 and 65535, got {port}"
            )));
        }

        Ok(Self {
            name: name.into(),
            namespace: namespace.into(),
            port,
            labels: labels.clone(),
            pod_labels: pod_labels.clone(),
        })
    }

    #[must_use]
    pub fn build(&self) -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some(service_name(&self.name)),
                namespace: Some(self.namespace.clone()),
                labels: Some((&self.labels).into()),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                type_: Some("ClusterIP".into()),
                selector: Some((&self.pod_labels).into()),
                ports: Some(vec![ServicePort {
                    name: Some("http".into()),
                    protocol: Some("TCP".into()),
                    port: 80,
                    target_port: Some(IntOrString::Int(self.port)),
                    ..Default::default()
                }]),
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

    fn builder() -> ServiceBuilder {
        ServiceBuilder::new(
            "test-app",
            "default",
            8000,
            &generate_labels("test-app"),
            &generate_selector_labels("test-app"),
        )
        .expect("builder to be valid")
    }

    #[test]
    fn build_generates_service() {
        // act
        let service = builder().build();

        // assert
        assert_eq!(service.metadata.name.as_deref(), Some("test-app-service"));
        assert_eq!(service.metadata.namespace.as_deref(), Some("default"));

        let spec = service.spec.expect("spec to be present");
        assert_eq!(spec.type_.as_deref(), Some("ClusterIP"));

        let ports = spec.ports.expect("ports to be present");
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].port, 80);
        assert_eq!(ports[0].target_port, Some(IntOrString::Int(8000)));
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
    fn build_selector_matches_pod_selector_labels() {
        // act
        let service = builder().build();

        // assert
        let pod_labels: std::collections::BTreeMap<String, String> =
            (&generate_selector_labels("test-app")).into();
        assert_eq!(
            service.spec.expect("spec to be present").selector,
            Some(pod_labels)
        );
    }

    #[test]
    fn new_rejects_port_out_of_range() {
        for port in [0, -8000, 65536] {
            // act
            let result = ServiceBuilder::new(
                "test-app",
                "default",
                port,
                &generate_labels("test-app"),
                &generate_selector_labels("test-app"),
            );

            // assert
            match result {
                Err(Error::InvalidSpec(reason)) => assert!(reason.contains("port")),
                _ => panic!("port {port} to be rejected"),
            }
        }
    }

    #[test]
    fn new_rejects_empty_name() {
        // act
        let result = ServiceBuilder::new(
            "",
            "default",
            8000,
            &generate_labels("test-app"),
            &generate_selector_labels("test-app"),
        );

        // assert
        assert!(matches!(result, Err(Error::InvalidSpec(reason)) if reason.contains("name")));
    }
}
