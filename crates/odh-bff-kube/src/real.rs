//! [`KubernetesClient`] backed by a live API server.

use async_trait::async_trait;
use k8s_openapi::api::authentication::v1::SelfSubjectReview;
use k8s_openapi::api::authorization::v1::{
    ResourceAttributes, SelfSubjectAccessReview, SelfSubjectAccessReviewSpec, SubjectAccessReview,
    SubjectAccessReviewSpec,
};
use k8s_openapi::api::core::v1::{ConfigMap, Namespace};
use k8s_openapi::api::rbac::v1::ClusterRoleBinding;
use kube::api::{Api, DynamicObject, ListParams, PostParams};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use odh_bff_core::constants::{
    CONFIGMAP_TIMEOUT, DASHBOARD_LABEL_SELECTOR, NAMESPACE_LIST_TIMEOUT, SAR_TIMEOUT,
};
use odh_bff_core::RequestIdentity;

use crate::client::{AccessCheck, KubernetesClient};
use crate::error::{with_deadline, KubeError};
use crate::resources::{CustomResourceKind, OPENSHIFT_INGRESS_CONFIG, OPENSHIFT_PROJECT};

const CLUSTER_ADMIN_ROLE: &str = "cluster-admin";
const SERVICE_ACCOUNT_USER_PREFIX: &str = "system:serviceaccount:";

/// How access reviews are phrased.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewMode {
    /// Shared service account asks on behalf of `identity.user_id`/`groups`.
    Subject,
    /// The client is the caller; ask about itself.
    SelfReview,
}

#[derive(Clone)]
pub struct KubeApiClient {
    client: kube::Client,
    mode: ReviewMode,
}

impl KubeApiClient {
    /// Shared client for the internal auth variant.
    pub fn service_account(client: kube::Client) -> Self {
        Self {
            client,
            mode: ReviewMode::Subject,
        }
    }

    /// Client bound to a single caller token.
    pub fn for_caller(client: kube::Client) -> Self {
        Self {
            client,
            mode: ReviewMode::SelfReview,
        }
    }

    async fn list_projects(&self) -> Result<Vec<String>, KubeError> {
        let api: Api<DynamicObject> =
            Api::all_with(self.client.clone(), &OPENSHIFT_PROJECT.api_resource());
        let projects = api
            .list(&ListParams::default())
            .await
            .map_err(|e| KubeError::from_kube(e, None))?;
        Ok(projects
            .items
            .into_iter()
            .filter_map(|p| p.metadata.name)
            .collect())
    }

    async fn bound_to_cluster_admin(&self, identity: &RequestIdentity) -> Result<bool, KubeError> {
        let Some(user) = identity.user_id.as_deref() else {
            return Ok(false);
        };
        let api: Api<ClusterRoleBinding> = Api::all(self.client.clone());
        let bindings = api
            .list(&ListParams::default())
            .await
            .map_err(|e| KubeError::from_kube(e, None))?;

        let service_account = user
            .strip_prefix(SERVICE_ACCOUNT_USER_PREFIX)
            .and_then(|rest| rest.split_once(':'));

        Ok(bindings
            .items
            .iter()
            .filter(|b| b.role_ref.name == CLUSTER_ADMIN_ROLE)
            .flat_map(|b| b.subjects.iter().flatten())
            .any(|subject| match subject.kind.as_str() {
                "User" => subject.name == user,
                "Group" => identity.groups.iter().any(|g| *g == subject.name),
                "ServiceAccount" => service_account.is_some_and(|(ns, name)| {
                    subject.name == name && subject.namespace.as_deref() == Some(ns)
                }),
                _ => false,
            }))
    }
}

fn resource_attributes(check: &AccessCheck) -> ResourceAttributes {
    ResourceAttributes {
        verb: Some(check.verb.clone()),
        group: Some(check.group.clone()),
        resource: Some(check.resource.clone()),
        namespace: check.namespace.clone(),
        ..Default::default()
    }
}

#[async_trait]
impl KubernetesClient for KubeApiClient {
    async fn review_access(
        &self,
        identity: &RequestIdentity,
        check: &AccessCheck,
    ) -> Result<bool, KubeError> {
        let namespace = check.namespace.as_deref();
        let attributes = resource_attributes(check);
        let pp = PostParams::default();

        let review = async {
            let allowed = match self.mode {
                ReviewMode::SelfReview => {
                    let review = SelfSubjectAccessReview {
                        spec: SelfSubjectAccessReviewSpec {
                            resource_attributes: Some(attributes),
                            ..Default::default()
                        },
                        ..Default::default()
                    };
                    let api: Api<SelfSubjectAccessReview> = Api::all(self.client.clone());
                    api.create(&pp, &review)
                        .await
                        .map_err(|e| KubeError::from_kube(e, namespace))?
                        .status
                        .map(|s| s.allowed)
                }
                ReviewMode::Subject => {
                    let review = SubjectAccessReview {
                        spec: SubjectAccessReviewSpec {
                            user: identity.user_id.clone(),
                            groups: Some(identity.groups.clone()).filter(|g| !g.is_empty()),
                            resource_attributes: Some(attributes),
                            ..Default::default()
                        },
                        ..Default::default()
                    };
                    let api: Api<SubjectAccessReview> = Api::all(self.client.clone());
                    api.create(&pp, &review)
                        .await
                        .map_err(|e| KubeError::from_kube(e, namespace))?
                        .status
                        .map(|s| s.allowed)
                }
            };
            Ok(allowed.unwrap_or(false))
        };

        let allowed = with_deadline("access review", SAR_TIMEOUT, review).await?;
        debug!(
            verb = %check.verb,
            resource = %check.resource,
            namespace = namespace.unwrap_or("-"),
            allowed,
            "access review"
        );
        Ok(allowed)
    }

    async fn is_cluster_admin(&self, identity: &RequestIdentity) -> Result<bool, KubeError> {
        match self.mode {
            // A caller token usually cannot read RBAC objects, so ask "can I do everything?"
            ReviewMode::SelfReview => {
                self.review_access(identity, &AccessCheck::new("*", "", "*", None))
                    .await
            }
            ReviewMode::Subject => {
                with_deadline(
                    "cluster-admin check",
                    SAR_TIMEOUT,
                    self.bound_to_cluster_admin(identity),
                )
                .await
            }
        }
    }

    async fn list_namespace_names(
        &self,
        _identity: &RequestIdentity,
    ) -> Result<Vec<String>, KubeError> {
        let list = async {
            let api: Api<Namespace> = Api::all(self.client.clone());
            match api.list(&ListParams::default()).await {
                Ok(list) => Ok(list
                    .items
                    .into_iter()
                    .filter_map(|ns| ns.metadata.name)
                    .collect()),
                Err(e) => {
                    let err = KubeError::from_kube(e, None);
                    if self.mode == ReviewMode::SelfReview && err.is_forbidden() {
                        debug!("cluster-wide namespace list forbidden, falling back to projects");
                        self.list_projects().await
                    } else {
                        Err(err)
                    }
                }
            }
        };
        with_deadline("namespace listing", NAMESPACE_LIST_TIMEOUT, list).await
    }

    async fn list_dashboard_resources(
        &self,
        kind: &CustomResourceKind,
        namespace: &str,
    ) -> Result<Vec<serde_json::Value>, KubeError> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &kind.api_resource());
        let list = api
            .list(&ListParams::default().labels(DASHBOARD_LABEL_SELECTOR))
            .await
            .map_err(|e| KubeError::from_kube(e, Some(namespace)))?;

        list.items
            .into_iter()
            .map(|item| {
                serde_json::to_value(item)
                    .map_err(|e| KubeError::Internal(format!("failed to encode {}: {e}", kind.kind)))
            })
            .collect()
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>, KubeError> {
        let get = async {
            let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
            let config_map = api.get(name).await.map_err(|e| {
                warn!(namespace, name, error = %e, "failed to get ConfigMap");
                KubeError::from_kube(e, Some(namespace))
            })?;
            Ok(config_map.data.unwrap_or_default())
        };
        with_deadline("ConfigMap read", CONFIGMAP_TIMEOUT, get).await
    }

    async fn get_user(&self, identity: &RequestIdentity) -> Result<String, KubeError> {
        match self.mode {
            ReviewMode::SelfReview => {
                let api: Api<SelfSubjectReview> = Api::all(self.client.clone());
                let review = api
                    .create(&PostParams::default(), &SelfSubjectReview::default())
                    .await
                    .map_err(|e| KubeError::from_kube(e, None))?;
                let username = review
                    .status
                    .and_then(|s| s.user_info)
                    .and_then(|u| u.username)
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| {
                        KubeError::InvalidResource("SelfSubjectReview returned no username".into())
                    })?;
                Ok(username
                    .strip_prefix(SERVICE_ACCOUNT_USER_PREFIX)
                    .map(str::to_string)
                    .unwrap_or(username))
            }
            ReviewMode::Subject => identity
                .user_id
                .clone()
                .filter(|u| !u.is_empty())
                .ok_or(KubeError::MissingIdentity),
        }
    }

    async fn cluster_domain(&self) -> Result<String, KubeError> {
        let api: Api<DynamicObject> =
            Api::all_with(self.client.clone(), &OPENSHIFT_INGRESS_CONFIG.api_resource());
        let ingress = api
            .get("cluster")
            .await
            .map_err(|e| KubeError::from_kube(e, None))?;
        ingress
            .data
            .pointer("/spec/domain")
            .and_then(|d| d.as_str())
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .ok_or_else(|| KubeError::InvalidResource("cluster ingress has no spec.domain".into()))
    }
}
