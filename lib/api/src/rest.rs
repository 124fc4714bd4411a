use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use fitscore_core::normalize::{candidate_from_json, outcome_from_json, vacancy_from_json};
use fitscore_core::Error;
use fitscore_model::{DatasetBuilder, DatasetConfig, GbdtParams};
use fitscore_registry::{ModelRegistry, PredictionEngine, TrainingJobManager};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub jobs: TrainingJobManager,
    pub engine: PredictionEngine,
}

impl AppState {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            jobs: TrainingJobManager::new(Arc::clone(&registry)),
            engine: PredictionEngine::new(Arc::clone(&registry)),
            registry,
        }
    }
}

#[derive(Deserialize)]
struct BuildDatasetRequest {
    candidates: Vec<serde_json::Value>,
    vacancies: Vec<serde_json::Value>,
    outcomes: Vec<serde_json::Value>,
    #[serde(default)]
    config: DatasetConfig,
}

#[derive(Deserialize)]
struct TrainRequest {
    dataset_version: u64,
    #[serde(default)]
    params: GbdtParams,
}

#[derive(Deserialize)]
struct PredictRequest {
    candidate: serde_json::Value,
    vacancy: serde_json::Value,
    model_version: Option<u64>,
}

#[derive(Deserialize)]
struct PredictBatchRequest {
    pairs: Vec<PairRequest>,
    model_version: Option<u64>,
}

#[derive(Deserialize)]
struct PairRequest {
    candidate: serde_json::Value,
    vacancy: serde_json::Value,
}

pub struct RestApi;

impl RestApi {
    pub async fn start(state: Arc<AppState>, port: u16) -> std::io::Result<()> {
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(state.clone()))
                .app_data(web::JsonConfig::default().limit(64 * 1024 * 1024))
                .route("/healthz", web::get().to(healthz))
                .route("/datasets", web::post().to(build_dataset))
                .route("/datasets", web::get().to(list_datasets))
                .route("/datasets/{version}", web::get().to(get_dataset))
                .route("/models/train", web::post().to(train_model))
                .route("/models", web::get().to(list_models))
                .route("/models/{version}", web::get().to(get_model))
                .route("/jobs/{id}", web::get().to(get_job))
                .route("/jobs/{id}", web::delete().to(cancel_job))
                .route("/predict", web::post().to(predict))
                .route("/predict/batch", web::post().to(predict_batch))
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }
}

/// Map a pipeline error onto the HTTP surface. Invalid input is 422,
/// missing artifacts 404, contended or incompatible versions 409, and
/// anything from the storage layer 500.
fn error_response(error: &Error) -> HttpResponse {
    let body = serde_json::json!({ "error": error.to_string() });
    match error {
        Error::Schema { .. } | Error::FeatureAssembly(_) | Error::Training(_) => {
            HttpResponse::UnprocessableEntity().json(body)
        }
        Error::DatasetNotFound(_) | Error::ModelNotFound(_) => HttpResponse::NotFound().json(body),
        Error::RegistryConflict(_) | Error::SchemaMismatch(_) => {
            HttpResponse::Conflict().json(body)
        }
        Error::Storage(_) | Error::Io(_) | Error::Serialization(_) => {
            HttpResponse::InternalServerError().json(body)
        }
    }
}

async fn healthz() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

async fn build_dataset(
    state: web::Data<Arc<AppState>>,
    req: web::Json<BuildDatasetRequest>,
) -> ActixResult<HttpResponse> {
    let candidates: Result<Vec<_>, _> = req.candidates.iter().map(candidate_from_json).collect();
    let candidates = match candidates {
        Ok(rows) => rows,
        Err(e) => return Ok(error_response(&e)),
    };
    let vacancies: Result<Vec<_>, _> = req.vacancies.iter().map(vacancy_from_json).collect();
    let vacancies = match vacancies {
        Ok(rows) => rows,
        Err(e) => return Ok(error_response(&e)),
    };
    let outcomes: Result<Vec<_>, _> = req.outcomes.iter().map(outcome_from_json).collect();
    let outcomes = match outcomes {
        Ok(rows) => rows,
        Err(e) => return Ok(error_response(&e)),
    };

    let dataset = match DatasetBuilder::new(req.config).build(&candidates, &vacancies, &outcomes) {
        Ok(dataset) => dataset,
        Err(e) => return Ok(error_response(&e)),
    };
    let stats = dataset.stats.clone();

    match state.registry.publish_dataset(dataset) {
        Ok(version) => Ok(HttpResponse::Created().json(serde_json::json!({
            "version": version,
            "stats": stats,
        }))),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn list_datasets(state: web::Data<Arc<AppState>>) -> ActixResult<HttpResponse> {
    match state.registry.list_datasets() {
        Ok(datasets) => Ok(HttpResponse::Ok().json(datasets)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn get_dataset(
    state: web::Data<Arc<AppState>>,
    path: web::Path<u64>,
) -> ActixResult<HttpResponse> {
    let version = path.into_inner();
    match state.registry.dataset(version) {
        Ok(dataset) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "version": version,
            "stats": dataset.stats,
            "config": dataset.config,
            "created_at": dataset.created_at,
            "feature_width": dataset.schema.dim(),
        }))),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn train_model(
    state: web::Data<Arc<AppState>>,
    req: web::Json<TrainRequest>,
) -> ActixResult<HttpResponse> {
    match state.jobs.submit(req.dataset_version, req.params) {
        Ok(job_id) => Ok(HttpResponse::Accepted().json(serde_json::json!({
            "job_id": job_id,
        }))),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn list_models(state: web::Data<Arc<AppState>>) -> ActixResult<HttpResponse> {
    match state.registry.list_models() {
        Ok(models) => Ok(HttpResponse::Ok().json(models)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn get_model(
    state: web::Data<Arc<AppState>>,
    path: web::Path<u64>,
) -> ActixResult<HttpResponse> {
    match state.registry.model(Some(path.into_inner())) {
        Ok(artifact) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "version": artifact.version,
            "dataset_version": artifact.dataset_version,
            "params": artifact.params(),
            "metrics": artifact.metrics(),
            "trained_at": artifact.trained_at(),
            "feature_width": artifact.trained.schema.dim(),
        }))),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn get_job(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
) -> ActixResult<HttpResponse> {
    match state.jobs.status(path.into_inner()) {
        Some(status) => Ok(HttpResponse::Ok().json(status)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": "Job not found"
        }))),
    }
}

async fn cancel_job(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
) -> ActixResult<HttpResponse> {
    if state.jobs.cancel(path.into_inner()) {
        Ok(HttpResponse::Accepted().json(serde_json::json!({
            "result": true
        })))
    } else {
        Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": "Job not found or already finished"
        })))
    }
}

async fn predict(
    state: web::Data<Arc<AppState>>,
    req: web::Json<PredictRequest>,
) -> ActixResult<HttpResponse> {
    match state
        .engine
        .score_pair(&req.candidate, &req.vacancy, req.model_version)
    {
        Ok(prediction) => Ok(HttpResponse::Ok().json(prediction)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn predict_batch(
    state: web::Data<Arc<AppState>>,
    req: web::Json<PredictBatchRequest>,
) -> ActixResult<HttpResponse> {
    let pairs: Vec<(serde_json::Value, serde_json::Value)> = req
        .pairs
        .iter()
        .map(|pair| (pair.candidate.clone(), pair.vacancy.clone()))
        .collect();

    match state.engine.score_batch(&pairs, req.model_version) {
        Ok(predictions) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "predictions": predictions
        }))),
        Err(e) => Ok(error_response(&e)),
    }
}
