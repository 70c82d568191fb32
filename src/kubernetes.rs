use std::{collections::BTreeMap, ops::Deref};

use kube::ResourceExt;

use crate::{Error, Result};

/*
 * ============================================================================
 * Constants
 * ============================================================================
 */
pub const APP_KUBERNETES_IO_INSTANCE_KEY: &str = "app.kubernetes.io/instance";

pub const APP_KUBERNETES_IO_MANAGED_BY_KEY: &str = "app.kubernetes.io/managed-by";
pub const APP_KUBERNETES_IO_MANAGED_BY_VALUE: &str = "djangoapp-operator";

pub const APP_KUBERNETES_IO_NAME_KEY: &str = "app.kubernetes.io/name";
pub const APP_KUBERNETES_IO_NAME_VALUE: &str = "djangoapp";

/*
 * ============================================================================
 * Names
 * ============================================================================
 */
#[must_use]
pub fn deployment_name(app_name: &str) -> String {
    format!("{app_name}-deployment")
}

#[must_use]
pub fn hpa_name(app_name: &str) -> String {
    format!("{app_name}-hpa")
}

#[must_use]
pub fn service_name(app_name: &str) -> String {
    format!("{app_name}-service")
}

#[must_use]
pub fn ingress_name(app_name: &str) -> String {
    format!("{app_name}-ingress")
}

/*
 * ============================================================================
 * Types
 * ============================================================================
 */
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Labels(BTreeMap<String, String>);

impl Deref for Labels {
    type Target = BTreeMap<String, String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Labels> for BTreeMap<String, String> {
    fn from(value: Labels) -> Self {
        value.0
    }
}

impl From<&Labels> for BTreeMap<String, String> {
    fn from(value: &Labels) -> Self {
        value.0.clone()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorLabels(BTreeMap<String, String>);

impl Deref for SelectorLabels {
    type Target = BTreeMap<String, String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<SelectorLabels> for BTreeMap<String, String> {
    fn from(value: SelectorLabels) -> Self {
        value.0
    }
}

impl From<&SelectorLabels> for BTreeMap<String, String> {
    fn from(value: &SelectorLabels) -> Self {
        value.0.clone()
    }
}

pub struct ObjectName<'a>(&'a str);

impl ObjectName<'_> {
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0
    }
}

impl Deref for ObjectName<'_> {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0
    }
}

impl std::fmt::Display for ObjectName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct ObjectNamespace<'a>(&'a str);

impl Deref for ObjectNamespace<'_> {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0
    }
}

impl std::fmt::Display for ObjectNamespace<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/*
 * ============================================================================
 * Labels
 * ============================================================================
 */
#[must_use]
pub fn generate_labels(app_name: &str) -> Labels {
    Labels(BTreeMap::from([
        (
            APP_KUBERNETES_IO_NAME_KEY.into(),
            APP_KUBERNETES_IO_NAME_VALUE.into(),
        ),
        (APP_KUBERNETES_IO_INSTANCE_KEY.into(), app_name.into()),
        (
            APP_KUBERNETES_IO_MANAGED_BY_KEY.into(),
            APP_KUBERNETES_IO_MANAGED_BY_VALUE.into(),
        ),
    ]))
}

// Selector labels never carry managed-by: selectors are immutable once
// applied, so they must stay a strict subset of the resource labels.
#[must_use]
pub fn generate_selector_labels(app_name: &str) -> SelectorLabels {
    SelectorLabels(BTreeMap::from([
        (
            APP_KUBERNETES_IO_NAME_KEY.into(),
            APP_KUBERNETES_IO_NAME_VALUE.into(),
        ),
        (APP_KUBERNETES_IO_INSTANCE_KEY.into(), app_name.into()),
    ]))
}

/*
 * ============================================================================
 * Traits
 * ============================================================================
 */
pub trait KubeResourceExt: ResourceExt {
    fn try_name(&self) -> Result<ObjectName> {
        self.meta()
            .name
            .as_ref()
            .ok_or(Error::MissingObjectKey(".metadata.name"))
            .map(String::as_str)
            .map(ObjectName)
    }

    fn try_namespace(&self) -> Result<ObjectNamespace> {
        self.meta()
            .namespace
            .as_ref()
            .ok_or(Error::MissingObjectKey(".metadata.namespace"))
            .map(String::as_str)
            .map(ObjectNamespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_labels_follows_recommended_label_scheme() {
        // act
        let labels = generate_labels("test-app");

        // assert
        assert_eq!(labels.len(), 3);
        assert_eq!(
            labels.get("app.kubernetes.io/name").map(String::as_str),
            Some("djangoapp")
        );
        assert_eq!(
            labels.get("app.kubernetes.io/instance").map(String::as_str),
            Some("test-app")
        );
        assert_eq!(
            labels
                .get("app.kubernetes.io/managed-by")
                .map(String::as_str),
            Some("djangoapp-operator")
        );
    }

    #[test]
    fn generate_selector_labels_is_strict_subset_of_labels() {
        // act
        let labels = generate_labels("test-app");
        let selector_labels = generate_selector_labels("test-app");

        // assert
        assert_eq!(selector_labels.len(), 2);
        for (key, value) in selector_labels.iter() {
            assert_eq!(labels.get(key), Some(value));
        }
        assert!(!selector_labels.contains_key("app.kubernetes.io/managed-by"));
    }

    #[test]
    fn child_names_are_derived_from_the_app_name() {
        // assert
        assert_eq!(deployment_name("test-app"), "test-app-deployment");
        assert_eq!(hpa_name("test-app"), "test-app-hpa");
        assert_eq!(service_name("test-app"), "test-app-service");
        assert_eq!(ingress_name("test-app"), "test-app-ingress");
    }
}
