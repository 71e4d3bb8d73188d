//! Upload, process, and download handlers.
//!
//! These orchestrate the core pipeline per request: job creation and
//! input binding, template validation and binding, then gated external
//! execution. Execution failure is serialized as a structured payload
//! (with stderr and duration) rather than an [`AppError`], so the
//! client can diagnose a bad command without server log access.

use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

use nvenc_core::job::Job;
use nvenc_core::template::{self, ValidatedTemplate};
use nvenc_core::executor;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Output filename used when the client does not request one.
const DEFAULT_OUTPUT_NAME: &str = "output.mp4";

/// Header accepted as a fallback source for the command template when
/// the multipart form carries no `command` field.
const COMMAND_HEADER: &str = "x-command";

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

/// Success payload for the one-step `/upload` and two-step `/process`
/// operations. Both paths build exactly this struct, which is what
/// keeps their response shapes structurally identical.
#[derive(Debug, Serialize)]
pub struct ProcessedResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub job_id: String,
    pub input: String,
    pub output: String,
    pub download_path: String,
    pub duration_ms: u64,
}

/// Success payload for the upload-only operation.
#[derive(Debug, Serialize)]
pub struct UploadedResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub job_id: String,
    pub input: String,
}

/// Failure payload for an execution that started but did not succeed
/// (non-zero exit, launch failure, or timeout).
#[derive(Debug, Serialize)]
pub struct ExecutionFailedResponse {
    pub status: &'static str,
    pub message: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

/// JSON body for the repeatable `/process` operation.
#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    pub job_id: String,
    pub command: String,
    pub output_filename: Option<String>,
}

// ---------------------------------------------------------------------------
// Multipart parsing
// ---------------------------------------------------------------------------

#[derive(Default)]
struct UploadFields {
    file: Option<(String, Vec<u8>)>,
    command: Option<String>,
    output_filename: Option<String>,
}

async fn read_upload_fields(mut multipart: Multipart) -> AppResult<UploadFields> {
    let mut fields = UploadFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                fields.file = Some((filename, data.to_vec()));
            }
            "command" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                fields.command = Some(text);
            }
            "output_filename" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                fields.output_filename = Some(text);
            }
            _ => {} // ignore unknown fields
        }
    }

    Ok(fields)
}

// ---------------------------------------------------------------------------
// POST /upload -- one-step upload + process
// ---------------------------------------------------------------------------

pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> AppResult<Response> {
    let fields = read_upload_fields(multipart).await?;

    let (filename, bytes) = fields
        .file
        .ok_or_else(|| AppError::BadRequest("missing file".into()))?;
    if filename.is_empty() {
        return Err(AppError::BadRequest("empty filename".into()));
    }

    let command = fields
        .command
        .or_else(|| {
            headers
                .get(COMMAND_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .ok_or_else(|| AppError::BadRequest("missing command".into()))?;

    // Validate before any filesystem work so malformed templates never
    // leave an orphaned job directory behind.
    let validated = template::validate(&command, &state.config.ffmpeg_program)?;
    let output_name = fields
        .output_filename
        .unwrap_or_else(|| DEFAULT_OUTPUT_NAME.to_string());

    let mut job = state.registry.create_job().await?;
    state.registry.bind_input(&mut job, &filename, &bytes).await?;

    execute_in_job(&state, job, validated, &output_name).await
}

// ---------------------------------------------------------------------------
// POST /upload_file -- upload only (two-step mode, first step)
// ---------------------------------------------------------------------------

pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<UploadedResponse>> {
    let fields = read_upload_fields(multipart).await?;

    let (filename, bytes) = fields
        .file
        .ok_or_else(|| AppError::BadRequest("missing file".into()))?;
    if filename.is_empty() {
        return Err(AppError::BadRequest("empty filename".into()));
    }

    let mut job = state.registry.create_job().await?;
    state.registry.bind_input(&mut job, &filename, &bytes).await?;

    Ok(Json(UploadedResponse {
        status: "success",
        message: "ok",
        job_id: job.id.clone(),
        input: job.input_name().unwrap_or_default(),
    }))
}

// ---------------------------------------------------------------------------
// POST /process -- repeatable processing against a bound job
// ---------------------------------------------------------------------------

pub async fn process(
    State(state): State<AppState>,
    Json(req): Json<ProcessRequest>,
) -> AppResult<Response> {
    let job = state.registry.resolve_job(&req.job_id).await?;
    if job.input_path.is_none() {
        return Err(AppError::BadRequest("missing input file in job".into()));
    }

    let validated = template::validate(&req.command, &state.config.ffmpeg_program)?;
    let output_name = req
        .output_filename
        .unwrap_or_else(|| DEFAULT_OUTPUT_NAME.to_string());

    execute_in_job(&state, job, validated, &output_name).await
}

// ---------------------------------------------------------------------------
// GET /download/{job_id}/{filename}
// ---------------------------------------------------------------------------

pub async fn download(
    State(state): State<AppState>,
    Path((job_id, filename)): Path<(String, String)>,
) -> AppResult<Response> {
    let job = state.registry.resolve_job(&job_id).await?;
    let file = state
        .registry
        .storage()
        .open_for_read(&job.dir, &filename)
        .await?;

    let body = axum::body::Body::from_stream(ReaderStream::new(file));
    let headers = [
        (
            header::CONTENT_TYPE,
            "application/octet-stream".to_string(),
        ),
        (
            header::CONTENT_DISPOSITION,
            // Quotes would terminate the quoted-string early, so they
            // are stripped from the advertised filename.
            format!(
                "attachment; filename=\"{}\"",
                filename.trim().replace('"', "")
            ),
        ),
    ];
    Ok((headers, body).into_response())
}

// ---------------------------------------------------------------------------
// Shared execution path
// ---------------------------------------------------------------------------

/// Bind the validated template to the job's paths, run it behind the
/// gate, and serialize the outcome.
///
/// Used verbatim by both the one-step and two-step routes so their
/// payloads cannot drift apart.
async fn execute_in_job(
    state: &AppState,
    job: Job,
    validated: ValidatedTemplate,
    output_filename: &str,
) -> AppResult<Response> {
    let input_path = job
        .input_path
        .clone()
        .ok_or_else(|| AppError::BadRequest("missing input file in job".into()))?;
    let output_path = state
        .registry
        .storage()
        .resolve_path(&job.dir, output_filename)?;

    let bound = validated.bind(&input_path, &output_path)?;
    tracing::info!(job_id = %job.id, command = %bound.display(), "executing");

    let result = {
        let _permit = state.gate.acquire().await;
        executor::run(&bound, &output_path, state.config.exec_timeout()).await
    };

    let output_name = output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if result.success() {
        tracing::info!(
            job_id = %job.id,
            output = %output_name,
            duration_ms = result.duration_ms,
            "execution finished"
        );
        let input = job.input_name().unwrap_or_default();
        Ok(Json(ProcessedResponse {
            status: "success",
            message: "ok",
            download_path: format!("/download/{}/{}", job.id, output_name),
            job_id: job.id,
            input,
            output: output_name,
            duration_ms: result.duration_ms,
        })
        .into_response())
    } else {
        let message = if result.timed_out {
            "execution timed out".to_string()
        } else if result.exit_code.is_none() {
            "failed to launch process".to_string()
        } else {
            format!("{} failed", state.config.ffmpeg_program)
        };
        tracing::warn!(
            job_id = %job.id,
            exit_code = ?result.exit_code,
            duration_ms = result.duration_ms,
            "execution failed"
        );
        Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ExecutionFailedResponse {
                status: "error",
                message,
                stdout: result.stdout,
                stderr: result.stderr,
                exit_code: result.exit_code,
                duration_ms: result.duration_ms,
            }),
        )
            .into_response())
    }
}
