//! Routes backed by an attached upstream client.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query},
    response::Json,
    Extension,
};
use serde::Deserialize;

use odh_bff_core::Envelope;

use crate::error::HttpError;
use crate::upstream::evalhub::{Collection, EvaluationJob, HealthResponse, ProvidersResponse};
use crate::upstream::llamastack::{ListVectorStoresParams, Model, VectorStore};
use crate::upstream::maas::{MaasModel, Tier};
use crate::upstream::mlflow::{PromptsPage, SearchPromptsParams};
use crate::upstream::{
    AttachedUpstream, EvalHubClient, LlamaStackClient, MaasClient, MlflowClient,
};

type ApiResult<T> = Result<Json<Envelope<T>>, HttpError>;

const DEFAULT_PROVIDER_PAGE: usize = 50;

fn mismatched(expected: &str) -> HttpError {
    HttpError::internal(format!("route expected an attached {expected} client"))
}

fn eval_hub(upstream: AttachedUpstream) -> Result<Arc<dyn EvalHubClient>, HttpError> {
    match upstream {
        AttachedUpstream::EvalHub(client) => Ok(client),
        _ => Err(mismatched("EvalHub")),
    }
}

fn llama_stack(upstream: AttachedUpstream) -> Result<Arc<dyn LlamaStackClient>, HttpError> {
    match upstream {
        AttachedUpstream::LlamaStack(client) => Ok(client),
        _ => Err(mismatched("Llama Stack")),
    }
}

fn mlflow(upstream: AttachedUpstream) -> Result<Arc<dyn MlflowClient>, HttpError> {
    match upstream {
        AttachedUpstream::Mlflow(client) => Ok(client),
        _ => Err(mismatched("MLflow")),
    }
}

fn maas(upstream: AttachedUpstream) -> Result<Arc<dyn MaasClient>, HttpError> {
    match upstream {
        AttachedUpstream::Maas(client) => Ok(client),
        _ => Err(mismatched("MaaS")),
    }
}

fn query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, HttpError> {
    query
        .map(|Query(q)| q)
        .map_err(|e| HttpError::bad_request(e.body_text()))
}

pub async fn evaluation_health(
    Extension(upstream): Extension<AttachedUpstream>,
) -> ApiResult<HealthResponse> {
    let health = eval_hub(upstream)?.health_check().await?;
    Ok(Json(Envelope::new(health)))
}

pub async fn list_evaluation_jobs(
    Extension(upstream): Extension<AttachedUpstream>,
) -> ApiResult<Vec<EvaluationJob>> {
    let jobs = eval_hub(upstream)?.list_evaluation_jobs().await?;
    Ok(Json(Envelope::new(jobs)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ProvidersQuery {
    limit: Option<usize>,
    offset: Option<usize>,
}

pub async fn list_evaluation_providers(
    Extension(upstream): Extension<AttachedUpstream>,
    params: Result<Query<ProvidersQuery>, QueryRejection>,
) -> ApiResult<ProvidersResponse> {
    let params = query(params)?;
    let providers = eval_hub(upstream)?
        .list_providers(
            params.limit.unwrap_or(DEFAULT_PROVIDER_PAGE),
            params.offset.unwrap_or(0),
        )
        .await?;
    Ok(Json(Envelope::new(providers)))
}

pub async fn list_evaluation_collections(
    Extension(upstream): Extension<AttachedUpstream>,
) -> ApiResult<Vec<Collection>> {
    let collections = eval_hub(upstream)?.list_collections().await?;
    Ok(Json(Envelope::new(collections.items)))
}

pub async fn list_lsd_models(
    Extension(upstream): Extension<AttachedUpstream>,
) -> ApiResult<Vec<Model>> {
    let models = llama_stack(upstream)?.list_models().await?;
    Ok(Json(Envelope::new(models)))
}

#[derive(Debug, Default, Deserialize)]
pub struct VectorStoresQuery {
    limit: Option<u32>,
    order: Option<String>,
}

pub async fn list_lsd_vector_stores(
    Extension(upstream): Extension<AttachedUpstream>,
    params: Result<Query<VectorStoresQuery>, QueryRejection>,
) -> ApiResult<Vec<VectorStore>> {
    let params = query(params)?;
    let stores = llama_stack(upstream)?
        .list_vector_stores(&ListVectorStoresParams {
            limit: params.limit,
            order: params.order,
        })
        .await?;
    Ok(Json(Envelope::new(stores)))
}

#[derive(Debug, Default, Deserialize)]
pub struct PromptsQuery {
    name: Option<String>,
    max_results: Option<u32>,
    page_token: Option<String>,
}

pub async fn list_mlflow_prompts(
    Extension(upstream): Extension<AttachedUpstream>,
    params: Result<Query<PromptsQuery>, QueryRejection>,
) -> ApiResult<PromptsPage> {
    let params = query(params)?;
    let page = mlflow(upstream)?
        .search_prompts(&SearchPromptsParams {
            name_contains: params.name,
            max_results: params.max_results,
            page_token: params.page_token,
        })
        .await?;
    Ok(Json(Envelope::new(page)))
}

pub async fn list_maas_models(
    Extension(upstream): Extension<AttachedUpstream>,
) -> ApiResult<Vec<MaasModel>> {
    let models = maas(upstream)?.list_models().await?;
    Ok(Json(Envelope::new(models)))
}

pub async fn list_maas_tiers(
    Extension(upstream): Extension<AttachedUpstream>,
) -> ApiResult<Vec<Tier>> {
    let tiers = maas(upstream)?.list_tiers().await?;
    Ok(Json(Envelope::new(tiers)))
}
