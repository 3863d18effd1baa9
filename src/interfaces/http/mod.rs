use crate::application::use_cases::upload::CachedDataset;
use crate::application::TrafficAnalysis;
use crate::domain::analysis::AnalysisFilter;
use crate::domain::error::AppError;
use crate::domain::traffic::TrafficRecord;
use crate::interfaces::state::AppState;
use actix_cors::Cors;
use actix_web::{
    delete, dev::Server, get, http::StatusCode, post, web, App, HttpResponse, HttpServer,
    Responder,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Largest accepted upload body
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub app_state: Arc<AppState>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

#[derive(Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

#[derive(Deserialize)]
pub struct OptionsQuery {
    #[serde(default)]
    pub failure_label: Option<String>,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub dataset_id: String,
    pub fingerprint: String,
    pub filename: String,
    pub row_count: usize,
    pub cached: bool,
    pub enrichment: crate::application::use_cases::enrichment::EnrichmentSummary,
    pub message: String,
}

/// Dataset row as shown in the table view, numbered from 1
#[derive(Serialize)]
pub struct IndexedRecord<'a> {
    #[serde(rename = "S/No.")]
    pub serial: usize,
    #[serde(flatten)]
    pub record: &'a TrafficRecord,
}

#[derive(Serialize)]
pub struct DatasetResponse<'a> {
    #[serde(flatten)]
    pub meta: &'a CachedDataset,
    pub columns: &'a [String],
    pub rows: Vec<IndexedRecord<'a>>,
}

/// Record the failure in the log ring and map it to a status code
fn error_response(logs: &Mutex<Vec<LogEntry>>, source: &str, err: &AppError) -> HttpResponse {
    add_log(logs, "ERROR", source, &err.to_string());
    let status = match err {
        AppError::ValidationError(_) | AppError::ParseError(_) => StatusCode::BAD_REQUEST,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    HttpResponse::build(status).body(err.to_string())
}

#[post("/upload")]
async fn upload(
    data: web::Data<HttpState>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> impl Responder {
    add_log(
        &data.logs,
        "INFO",
        "Upload",
        &format!("Reading file {} ({} bytes)", query.filename, body.len()),
    );

    match data
        .app_state
        .upload_use_case
        .upload(&query.filename, &body)
        .await
    {
        Ok(outcome) => {
            let entry = outcome.entry;
            let message = if outcome.cached {
                "File unchanged, using processed data".to_string()
            } else {
                "File uploaded and processed successfully!".to_string()
            };
            add_log(&data.logs, "INFO", "Upload", &message);
            HttpResponse::Ok().json(UploadResponse {
                dataset_id: entry.id.clone(),
                fingerprint: entry.fingerprint.clone(),
                filename: entry.filename.clone(),
                row_count: entry.dataset.len(),
                cached: outcome.cached,
                enrichment: entry.enrichment.clone(),
                message,
            })
        }
        Err(e) => error_response(&data.logs, "Upload", &e),
    }
}

#[get("/options")]
async fn get_options(
    data: web::Data<HttpState>,
    query: web::Query<OptionsQuery>,
) -> impl Responder {
    match data.app_state.upload_use_case.require_current().await {
        Ok(entry) => HttpResponse::Ok().json(TrafficAnalysis::options(
            &entry.dataset,
            query.failure_label.as_deref(),
        )),
        Err(e) => error_response(&data.logs, "Options", &e),
    }
}

#[post("/analyze")]
async fn analyze(data: web::Data<HttpState>, filter: web::Json<AnalysisFilter>) -> impl Responder {
    let entry = match data.app_state.upload_use_case.require_current().await {
        Ok(entry) => entry,
        Err(e) => return error_response(&data.logs, "Analyze", &e),
    };

    add_log(
        &data.logs,
        "INFO",
        "Analyze",
        &format!(
            "Filtering {} -> {} (application={} categories={})",
            filter.start_date,
            filter.end_date,
            filter.application,
            if filter.select_all {
                "all".to_string()
            } else {
                filter.categories.len().to_string()
            }
        ),
    );

    match TrafficAnalysis::analyze(&entry.dataset, &filter) {
        Ok(report) => {
            if report.empty {
                add_log(
                    &data.logs,
                    "WARN",
                    "Analyze",
                    "No data available for the selected criteria.",
                );
            }
            HttpResponse::Ok().json(report)
        }
        Err(e) => error_response(&data.logs, "Analyze", &e),
    }
}

#[get("/dataset")]
async fn get_dataset(data: web::Data<HttpState>) -> impl Responder {
    match data.app_state.upload_use_case.require_current().await {
        Ok(entry) => {
            let rows = entry
                .dataset
                .records
                .iter()
                .enumerate()
                .map(|(idx, record)| IndexedRecord {
                    serial: idx + 1,
                    record,
                })
                .collect();
            HttpResponse::Ok().json(DatasetResponse {
                meta: &entry,
                columns: &entry.dataset.columns,
                rows,
            })
        }
        Err(e) => error_response(&data.logs, "Dataset", &e),
    }
}

#[delete("/dataset")]
async fn clear_dataset(data: web::Data<HttpState>) -> impl Responder {
    data.app_state.upload_use_case.clear().await;
    add_log(&data.logs, "INFO", "Upload", "Dataset cleared");
    HttpResponse::NoContent().finish()
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = data
        .logs
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    HttpResponse::Ok().json(logs)
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = logs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    logs.push(entry.clone());
    if logs.len() > MAX_LOG_ENTRIES {
        logs.remove(0);
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

/// Routes shared by the server and the handler tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(upload)
            .service(get_options)
            .service(analyze)
            .service(get_dataset)
            .service(clear_dataset)
            .service(get_logs)
            .service(health),
    );
}

pub fn start_server(
    app_state: Arc<AppState>,
    logs: Arc<Mutex<Vec<LogEntry>>>,
) -> std::io::Result<Server> {
    let host = app_state.config.server.host.clone();
    let port = app_state.config.server.port;
    let state = web::Data::new(HttpState { app_state, logs });

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Allow all origins for local tool

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
            .configure(configure)
    })
    .bind((host.as_str(), port))?
    .run();

    Ok(server)
}
