use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::errors::{gateway_status, AppError};
use crate::form::{EntryId, FieldEdit, GroupKind, ResumeFormModel};
use crate::models::resume::{pdf_filename, ResumeSummary};
use crate::notify::Notification;
use crate::state::AppState;
use crate::wizard::controller::FETCH_FAILED;
use crate::wizard::session::{resume_key, session_key, SharedSession};
use crate::wizard::{
    NewEntry, NextOutcome, Step, StepErrors, SubmitOutcome, WizardController, WizardError,
    WizardSession,
};

const DELETE_FAILED: &str = "Failed to delete resume";
const DOWNLOAD_FAILED: &str = "Failed to download resume";
const DELETED: &str = "Resume deleted successfully";

#[derive(Debug, Default, Deserialize)]
pub struct StartSessionRequest {
    pub resume_id: Option<String>,
}

/// Everything a client needs to render the wizard after a request.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub active_step: usize,
    pub step: Step,
    pub label: &'static str,
    pub steps: Vec<&'static str>,
    pub mode: &'static str,
    pub resume_id: Option<String>,
    pub model: ResumeFormModel,
    pub errors: StepErrors,
    pub error: Option<String>,
    pub finished: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<EntryId>,
    pub notifications: Vec<Notification>,
}

impl SessionView {
    /// Snapshots the session and hands over its pending notifications.
    fn render(session_id: Uuid, session: &WizardSession, outcome: Option<&'static str>) -> Self {
        let wizard = &session.controller;
        let step = wizard.active_step();
        SessionView {
            session_id,
            active_step: step.index(),
            step,
            label: step.label(),
            steps: Step::ALL.iter().map(|s| s.label()).collect(),
            mode: wizard.mode().as_str(),
            resume_id: wizard.resume_id().map(str::to_string),
            model: wizard.model().clone(),
            errors: wizard.errors().clone(),
            error: wizard.last_error().map(str::to_string),
            finished: wizard.is_finished(),
            outcome,
            entry_id: None,
            notifications: session.notifications.drain(),
        }
    }
}

fn find_session(state: &AppState, id: Uuid) -> Result<SharedSession, AppError> {
    state
        .sessions
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("Wizard session {id} not found")))
}

fn busy(id: Uuid) -> AppError {
    AppError::Conflict(format!("Wizard session {id} is busy with another request"))
}

fn parse_group(raw: &str) -> Result<GroupKind, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("Unknown group '{raw}'")))
}

/// POST /api/v1/wizard/sessions
/// Starts a wizard. With a `resume_id` the résumé is loaded before the
/// session is returned; a failed load leaves a blank create flow.
pub async fn handle_start_session(
    State(state): State<AppState>,
    body: Option<Json<StartSessionRequest>>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let resume_id = req.resume_id.filter(|id| !id.trim().is_empty());

    let _claim = match &resume_id {
        Some(id) => Some(state.sessions.begin(resume_key(id))?),
        None => None,
    };
    let controller = match &resume_id {
        Some(id) => WizardController::edit(id.clone()),
        None => WizardController::create(),
    }
    .with_submit_validation(state.config.submit_validation);

    let (session_id, shared) = state.sessions.insert(WizardSession::new(controller));
    let mut session = shared.lock().await;
    if session.load(state.gateway.as_ref()).await.is_err() {
        info!("Wizard session {session_id} continues as a blank resume");
    }

    Ok((
        StatusCode::CREATED,
        Json(SessionView::render(session_id, &session, None)),
    ))
}

/// GET /api/v1/wizard/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let shared = find_session(&state, id)?;
    let session = shared.try_lock().map_err(|_| busy(id))?;
    Ok(Json(SessionView::render(id, &session, None)))
}

/// DELETE /api/v1/wizard/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Wizard session {id} not found")))
    }
}

/// PATCH /api/v1/wizard/sessions/:id/fields
pub async fn handle_edit_field(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(edit): Json<FieldEdit>,
) -> Result<Json<SessionView>, AppError> {
    let shared = find_session(&state, id)?;
    let mut session = shared.try_lock().map_err(|_| busy(id))?;
    session.controller.edit_field(edit)?;
    Ok(Json(SessionView::render(id, &session, Some("edited"))))
}

/// POST /api/v1/wizard/sessions/:id/groups/:group
pub async fn handle_append_entry(
    State(state): State<AppState>,
    Path((id, group)): Path<(Uuid, String)>,
    body: Option<Json<Value>>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let group = parse_group(&group)?;
    let value = body.map(|Json(value)| value).unwrap_or(Value::Null);
    let entry = NewEntry::from_json(group, value)
        .map_err(|e| AppError::UnprocessableEntity(format!("Invalid {group} entry: {e}")))?;

    let shared = find_session(&state, id)?;
    let mut session = shared.try_lock().map_err(|_| busy(id))?;
    let entry_id = session.controller.append_entry(entry)?;

    let mut view = SessionView::render(id, &session, Some("appended"));
    view.entry_id = Some(entry_id);
    Ok((StatusCode::CREATED, Json(view)))
}

/// DELETE /api/v1/wizard/sessions/:id/groups/:group/:entry_id
/// Answers with outcome `kept` when the entry is the last one of a group
/// that must keep one.
pub async fn handle_remove_entry(
    State(state): State<AppState>,
    Path((id, group, entry_id)): Path<(Uuid, String, u64)>,
) -> Result<Json<SessionView>, AppError> {
    let group = parse_group(&group)?;
    let shared = find_session(&state, id)?;
    let mut session = shared.try_lock().map_err(|_| busy(id))?;

    let removed = session.controller.remove_entry(group, EntryId(entry_id))?;
    let outcome = if removed { "removed" } else { "kept" };
    Ok(Json(SessionView::render(id, &session, Some(outcome))))
}

/// POST /api/v1/wizard/sessions/:id/next
pub async fn handle_next(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let shared = find_session(&state, id)?;
    let mut session = shared.try_lock().map_err(|_| busy(id))?;
    let outcome = match session.controller.next()? {
        NextOutcome::Advanced { .. } => "advanced",
        NextOutcome::Blocked => "blocked",
        NextOutcome::LastStep => "last_step",
    };
    Ok(Json(SessionView::render(id, &session, Some(outcome))))
}

/// POST /api/v1/wizard/sessions/:id/back
pub async fn handle_back(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let shared = find_session(&state, id)?;
    let mut session = shared.try_lock().map_err(|_| busy(id))?;
    session.controller.back();
    Ok(Json(SessionView::render(id, &session, Some("moved_back"))))
}

/// POST /api/v1/wizard/sessions/:id/submit
/// A failed save answers with the gateway's status and the unchanged session.
/// A successful save answers with the final view and closes the session.
pub async fn handle_submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let shared = find_session(&state, id)?;
    let mut session = shared.try_lock().map_err(|_| busy(id))?;

    let key = match session.controller.resume_id() {
        Some(resume_id) => resume_key(resume_id),
        None => session_key(&id),
    };
    let _claim = state.sessions.begin(key)?;

    let (status, outcome) = match session.submit(state.gateway.as_ref()).await {
        Ok(SubmitOutcome::Saved { .. }) => (StatusCode::OK, "saved"),
        Ok(SubmitOutcome::Blocked) => (StatusCode::OK, "blocked"),
        Err(WizardError::Submit { source, .. }) => (gateway_status(&source), "failed"),
        Err(e) => return Err(e.into()),
    };
    let view = SessionView::render(id, &session, Some(outcome));
    if outcome == "saved" {
        state.sessions.remove(&id);
    }
    Ok((status, Json(view)))
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResumeSummary>>, AppError> {
    let resumes = state
        .gateway
        .list()
        .await
        .map_err(|e| AppError::gateway(e, FETCH_FAILED))?;
    Ok(Json(resumes.iter().map(ResumeSummary::from).collect()))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, AppError> {
    let _claim = state.sessions.begin(resume_key(&id))?;
    state
        .gateway
        .delete(&id)
        .await
        .map_err(|e| AppError::gateway(e, DELETE_FAILED))?;
    info!("Deleted resume {id}");
    Ok(Json(Notification::success(DELETED)))
}

/// GET /api/v1/resumes/:id/pdf
pub async fn handle_download_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let doc = state
        .gateway
        .fetch_by_id(&id)
        .await
        .map_err(|e| AppError::gateway(e, DOWNLOAD_FAILED))?;
    let pdf = state
        .gateway
        .download_pdf(&id)
        .await
        .map_err(|e| AppError::gateway(e, DOWNLOAD_FAILED))?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        pdf_filename(&doc.personal_details.name)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request};
    use axum::Router;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::gateway::InMemoryGateway;
    use crate::models::resume::{sample_document, ResumeDocument};
    use crate::routes::build_router;

    fn app(gateway: Arc<InMemoryGateway>) -> (Router, AppState) {
        let state = AppState::new(gateway, Config::default());
        (build_router(state.clone()), state)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn named(name: &str) -> ResumeDocument {
        let mut doc = ResumeDocument::default();
        doc.personal_details.name = name.to_string();
        doc
    }

    #[tokio::test]
    async fn test_start_session_and_blocked_next() {
        let (app, _) = app(Arc::new(InMemoryGateway::new()));
        let (status, view) = send(&app, Method::POST, "/api/v1/wizard/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(view["mode"], "create");
        assert_eq!(view["active_step"], 0);
        assert_eq!(view["steps"].as_array().unwrap().len(), 5);

        let id = view["session_id"].as_str().unwrap().to_string();
        let (status, view) = send(
            &app,
            Method::POST,
            &format!("/api/v1/wizard/sessions/{id}/next"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["outcome"], "blocked");
        assert_eq!(view["active_step"], 0);
        assert_eq!(view["errors"]["personalDetails.email"], "Email is required");
    }

    #[tokio::test]
    async fn test_edit_and_group_routes() {
        let (app, _) = app(Arc::new(InMemoryGateway::new()));
        let (_, view) = send(&app, Method::POST, "/api/v1/wizard/sessions", None).await;
        let id = view["session_id"].as_str().unwrap().to_string();
        let base = format!("/api/v1/wizard/sessions/{id}");

        let (status, view) = send(
            &app,
            Method::PATCH,
            &format!("{base}/fields"),
            Some(json!({ "path": "personalDetails.name", "value": "Ada" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["model"]["personalDetails"]["name"], "Ada");

        let (status, view) = send(
            &app,
            Method::POST,
            &format!("{base}/groups/experience"),
            Some(json!({ "jobTitle": "Engineer" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(view["model"]["experience"].as_array().unwrap().len(), 2);
        let entry = view["entry_id"].as_u64().unwrap();

        let (_, view) = send(
            &app,
            Method::DELETE,
            &format!("{base}/groups/experience/{entry}"),
            None,
        )
        .await;
        assert_eq!(view["outcome"], "removed");

        let last = view["model"]["experience"][0]["id"].as_u64().unwrap();
        let (_, view) = send(
            &app,
            Method::DELETE,
            &format!("{base}/groups/experience/{last}"),
            None,
        )
        .await;
        assert_eq!(view["outcome"], "kept");

        let (status, _) = send(&app, Method::POST, &format!("{base}/groups/projects"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::PATCH,
            &format!("{base}/fields"),
            Some(json!({ "path": "experience", "value": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_edit_session_load_failure_falls_back() {
        let (app, _) = app(Arc::new(InMemoryGateway::new()));
        let (status, view) = send(
            &app,
            Method::POST,
            "/api/v1/wizard/sessions",
            Some(json!({ "resume_id": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(view["mode"], "create");
        assert_eq!(view["error"], "Resume nope not found");
        assert_eq!(view["notifications"][0]["level"], "error");
    }

    #[tokio::test]
    async fn test_submit_blocked_then_failed_then_saved() {
        let gateway = Arc::new(InMemoryGateway::new());
        let resume_id = gateway.seed(named("Ada"));
        let (app, state) = app(gateway.clone());
        let (_, view) = send(
            &app,
            Method::POST,
            "/api/v1/wizard/sessions",
            Some(json!({ "resume_id": resume_id })),
        )
        .await;
        assert_eq!(view["mode"], "edit");
        let id = view["session_id"].as_str().unwrap().to_string();
        let submit = format!("/api/v1/wizard/sessions/{id}/submit");

        let calls = gateway.call_count();
        let (status, view) = send(&app, Method::POST, &submit, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["outcome"], "blocked");
        assert_eq!(gateway.call_count(), calls);

        let valid = gateway.seed(sample_document());
        let (_, view) = send(
            &app,
            Method::POST,
            "/api/v1/wizard/sessions",
            Some(json!({ "resume_id": valid })),
        )
        .await;
        let id = view["session_id"].as_str().unwrap().to_string();
        let submit = format!("/api/v1/wizard/sessions/{id}/submit");

        gateway.set_offline(true);
        let (status, view) = send(&app, Method::POST, &submit, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(view["outcome"], "failed");
        assert_eq!(view["error"], "Failed to save resume");
        assert_eq!(view["model"]["personalDetails"]["name"], "Ada Lovelace");

        gateway.set_offline(false);
        let (status, view) = send(&app, Method::POST, &submit, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["outcome"], "saved");
        assert_eq!(view["finished"], true);
        assert_eq!(view["notifications"][0]["message"], "Resume updated successfully");

        let saved: Uuid = id.parse().unwrap();
        assert!(state.sessions.get(&saved).is_none());
        assert_eq!(state.sessions.len(), 1);
        let (status, _) = send(&app, Method::POST, &submit, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_session_id_is_rejected() {
        let (app, _) = app(Arc::new(InMemoryGateway::new()));
        let (status, _) = send(&app, Method::GET, "/api/v1/wizard/sessions/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_busy_session_is_conflict() {
        let (app, state) = app(Arc::new(InMemoryGateway::new()));
        let (_, view) = send(&app, Method::POST, "/api/v1/wizard/sessions", None).await;
        let id: Uuid = view["session_id"].as_str().unwrap().parse().unwrap();

        let shared = state.sessions.get(&id).unwrap();
        let _held = shared.lock().await;
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/wizard/sessions/{id}/back"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_delete_session() {
        let (app, state) = app(Arc::new(InMemoryGateway::new()));
        let (_, view) = send(&app, Method::POST, "/api/v1/wizard/sessions", None).await;
        let id = view["session_id"].as_str().unwrap().to_string();
        let uri = format!("/api/v1/wizard/sessions/{id}");

        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state.sessions.is_empty());
        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_resume_list_delete_and_pdf() {
        let gateway = Arc::new(InMemoryGateway::new());
        let id = gateway.seed(named("Ada  Lovelace"));
        let (app, _) = app(gateway.clone());

        let (status, list) = send(&app, Method::GET, "/api/v1/resumes", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list[0]["name"], "Ada  Lovelace");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/resumes/{id}/pdf"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Ada_Lovelace_resume.pdf\""
        );

        let (status, body) =
            send(&app, Method::DELETE, &format!("/api/v1/resumes/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], DELETED);

        let (status, body) =
            send(&app, Method::DELETE, &format!("/api/v1/resumes/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], format!("Resume {id} not found"));
    }

    #[tokio::test]
    async fn test_offline_gateway_uses_fallback_messages() {
        let gateway = Arc::new(InMemoryGateway::new());
        let id = gateway.seed(named("Ada"));
        gateway.set_offline(true);
        let (app, _) = app(gateway);

        let (status, body) =
            send(&app, Method::DELETE, &format!("/api/v1/resumes/{id}"), None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["message"], DELETE_FAILED);

        let (_, body) = send(&app, Method::GET, &format!("/api/v1/resumes/{id}/pdf"), None).await;
        assert_eq!(body["error"]["message"], DOWNLOAD_FAILED);
    }
}
