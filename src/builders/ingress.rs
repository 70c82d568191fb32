use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use kube::core::ObjectMeta;

use crate::{
    Error, Result,
    kubernetes::{Labels, ingress_name, service_name},
};

/*
 * ============================================================================
 * Ingress Builder
 * ============================================================================
 */
/// Builds the `networking.k8s.io/v1` Ingress routing external HTTP traffic
/// for one host to the Service.
pub struct IngressBuilder {
    name: String,
    namespace: String,
    ingress_class_name: String,
    host: String,
    labels: Labels,
}

impl IngressBuilder {
    /// # Errors
    ///
    /// Returns `Error::InvalidSpec` naming the first field that fails
    /// validation.
    pub fn new(
        name: &str,
        namespace: &str,
        ingress_class_name: &str,
        host: &str,
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
        if ingress_class_name.is_empty() {
            return Err(Error::InvalidSpec(
                "ingress_class_name must be a non-empty string".into(),
            ));
        }
        if host.is_empty() {
            return Err(Error::InvalidSpec("host must be a non-empty string".into()));
        }

        Ok(Self {
            name: name.into(),
            namespace: namespace.into(),
            ingress_class_name: ingress_class_name.into(),
            host: host.into(),
            labels: labels.clone(),
        })
    }

    #[must_use]
    pub fn build(&self) -> Ingress {
        Ingress {
            metadata: ObjectMeta {
                name: Some(ingress_name(&self.name)),
                namespace: Some(self.namespace.clone()),
                labels: Some((&self.labels).into()),
                ..Default::default()
            },
            spec: Some(IngressSpec {
                ingress_class_name: Some(self.ingress_class_name.clone()),
                rules: Some(vec![IngressRule {
                    host: Some(self.host.clone()),
                    http: Some(HTTPIngressRuleValue {
                        paths: vec![HTTPIngressPath {
                            path: Some("/".into()),
                            path_type: "Prefix".into(),
                            backend: IngressBackend {
                                service: Some(IngressServiceBackend {
                                    name: service_name(&self.name),
                                    port: Some(ServiceBackendPort {
                                        number: Some(80),
                                        ..Default::default()
                                    }),
                                }),
                                ..Default::default()
                            },
                        }],
                    }),
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
