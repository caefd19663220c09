//! Custom resources the BFF reads or authorizes against.

use kube::core::{ApiResource, GroupVersionKind};

/// Group/version/kind/plural of a custom resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomResourceKind {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
    pub plural: &'static str,
}

impl CustomResourceKind {
    pub const fn new(
        group: &'static str,
        version: &'static str,
        kind: &'static str,
        plural: &'static str,
    ) -> Self {
        Self {
            group,
            version,
            kind,
            plural,
        }
    }

    pub fn api_resource(&self) -> ApiResource {
        ApiResource::from_gvk_with_plural(
            &GroupVersionKind::gvk(self.group, self.version, self.kind),
            self.plural,
        )
    }
}

pub const EVAL_HUB: CustomResourceKind =
    CustomResourceKind::new("trustyai.opendatahub.io", "v1alpha1", "EvalHub", "evalhubs");

pub const LLAMA_STACK_DISTRIBUTION: CustomResourceKind = CustomResourceKind::new(
    "llamastack.io",
    "v1alpha1",
    "LlamaStackDistribution",
    "llamastackdistributions",
);

pub const MLFLOW: CustomResourceKind =
    CustomResourceKind::new("mlflow.opendatahub.io", "v1", "MLflow", "mlflows");

pub(crate) const OPENSHIFT_PROJECT: CustomResourceKind =
    CustomResourceKind::new("project.openshift.io", "v1", "Project", "projects");

pub(crate) const OPENSHIFT_INGRESS_CONFIG: CustomResourceKind =
    CustomResourceKind::new("config.openshift.io", "v1", "Ingress", "ingresses");
