//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use super::AppState;
use super::error::ApiError;
use super::types::{
    ConsumptionEntry, CreateDeviceRequest, DeviceResponse, InterruptedResponse, ModelResponse,
    RecoveryResponse, TransitionResponse, UpdateModelRequest,
};
use crate::error::SimError;
use crate::sim::{Measurements, Transition};
use crate::store::{DeviceId, DeviceModelSpec};

type ApiResult<T> = Result<Json<T>, ApiError>;

fn transition(id: DeviceId, t: Transition) -> ApiResult<TransitionResponse> {
    Ok(Json(TransitionResponse::new(id, t)))
}

/// `POST /devices` → 201 + `DeviceResponse`; the new device is started and ON.
///
/// 422 for an unknown model or bad parameters, 503 when the id is taken.
pub async fn create_device(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDeviceRequest>,
) -> Result<(StatusCode, Json<DeviceResponse>), ApiError> {
    let record = state.lifecycle.create_device(req.into_record())?;
    let measurements = state.lifecycle.get_measurements(&record.device_id);
    Ok((
        StatusCode::CREATED,
        Json(DeviceResponse::new(record, measurements)),
    ))
}

/// `GET /devices/active` → live devices with a running simulation
pub async fn active_devices(State(state): State<Arc<AppState>>) -> ApiResult<Vec<DeviceResponse>> {
    let records = state.lifecycle.active_devices()?;
    Ok(Json(
        records
            .into_iter()
            .map(|r| {
                let measurements = state.lifecycle.get_measurements(&r.device_id);
                DeviceResponse::new(r, measurements)
            })
            .collect(),
    ))
}

/// `PUT /devices/{id}/model` renames the device and swaps its model.
pub async fn update_model(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateModelRequest>,
) -> ApiResult<TransitionResponse> {
    let id = DeviceId::from(id);
    let model = DeviceModelSpec::new(req.model, req.params);
    let t = state.lifecycle.update_model(&id, &req.device_name, model)?;
    transition(id, t)
}

/// `GET /devices/{id}` → 200 + `DeviceResponse`, 404 if unknown
pub async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<DeviceResponse> {
    let id = DeviceId::from(id);
    let record = state
        .lifecycle
        .store()
        .get(&id)?
        .ok_or_else(|| SimError::NotFound(id.clone()))?;
    let measurements = state.lifecycle.get_measurements(&id);
    Ok(Json(DeviceResponse::new(record, measurements)))
}

/// `GET /devices/{id}/measurements` → 200 + `Measurements`
///
/// 404 when unknown or not simulating, 409 when INACTIVE.
pub async fn get_measurements(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Measurements> {
    let id = DeviceId::from(id);
    state
        .lifecycle
        .checked_measurements(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("device \"{id}\" is not simulating")))
}

/// `GET /devices/{id}/consumption` → 200 + stored snapshots, oldest first
pub async fn get_consumption(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Vec<ConsumptionEntry>> {
    let id = DeviceId::from(id);
    let history = state.lifecycle.store().consumption_history(&id)?;
    Ok(Json(history.into_iter().map(ConsumptionEntry::from).collect()))
}

/// `POST /devices/{id}/start` starts the model attached to the record.
///
/// 422 when the record has no model or the model cannot be built.
pub async fn start(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TransitionResponse> {
    let id = DeviceId::from(id);
    let record = state
        .lifecycle
        .store()
        .get(&id)?
        .ok_or_else(|| SimError::NotFound(id.clone()))?;
    let model = record
        .model
        .ok_or_else(|| SimError::init("<none>", "device has no model attached"))?;
    let (_, t) = state
        .lifecycle
        .start_simulation(&id, &model.model_name, &model.params)?;
    transition(id, t)
}

/// `POST /devices/{id}/stop` → always 200, repeats report `already_stopped`
pub async fn stop(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TransitionResponse> {
    let id = DeviceId::from(id);
    let t = state.lifecycle.stop_simulation(&id);
    transition(id, t)
}

pub async fn activate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TransitionResponse> {
    let id = DeviceId::from(id);
    let t = state.lifecycle.activate(&id)?;
    transition(id, t)
}

pub async fn deactivate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TransitionResponse> {
    let id = DeviceId::from(id);
    let t = state.lifecycle.deactivate(&id)?;
    transition(id, t)
}

/// `POST /devices/{id}/on` → 409 when INACTIVE or not simulating
pub async fn turn_on(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TransitionResponse> {
    let id = DeviceId::from(id);
    let t = state.lifecycle.turn_on(&id)?;
    transition(id, t)
}

pub async fn turn_off(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TransitionResponse> {
    let id = DeviceId::from(id);
    let t = state.lifecycle.turn_off(&id)?;
    transition(id, t)
}

/// `DELETE /devices/{id}` → 204, 404 if unknown
pub async fn delete_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.lifecycle.delete_device(&DeviceId::from(id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn interrupted(State(state): State<Arc<AppState>>) -> ApiResult<InterruptedResponse> {
    let interrupted = state.lifecycle.interrupted_simulations()?;
    Ok(Json(InterruptedResponse { interrupted }))
}

/// `POST /simulations/recover` re-runs recovery; already running devices are untouched.
pub async fn recover(State(state): State<Arc<AppState>>) -> ApiResult<RecoveryResponse> {
    let report = crate::sim::recover(&state.lifecycle)?;
    Ok(Json(report.into()))
}

pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<Vec<ModelResponse>> {
    Json(
        state
            .catalog
            .available_models()
            .iter()
            .map(ModelResponse::from)
            .collect(),
    )
}
