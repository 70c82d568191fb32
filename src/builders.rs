mod deployment;
mod hpa;
mod ingress;
mod service;

pub use deployment::DeploymentBuilder;
pub use hpa::HpaBuilder;
pub use ingress::IngressBuilder;
pub use service::ServiceBuilder;
