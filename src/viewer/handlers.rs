use axum::{
    extract::{Path, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::api::{ApiResponse, FigureResponse};
use super::state::ViewerState;

pub async fn list_figures(
    State(state): State<Arc<ViewerState>>,
) -> Json<ApiResponse<Vec<FigureResponse>>> {
    let figures = state
        .figures
        .iter()
        .enumerate()
        .map(|(index, figure)| FigureResponse {
            index,
            name: figure.name.clone(),
            title: figure.title.clone(),
            width: figure.width,
            height: figure.height,
            url: format!("/api/figures/{}", index),
        })
        .collect();

    Json(ApiResponse::success(figures))
}

pub async fn get_figure(
    State(state): State<Arc<ViewerState>>,
    Path(index): Path<usize>,
) -> Result<impl IntoResponse, AppError> {
    let figure = state.figures.get(index).ok_or(AppError::NotFound)?;

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, "image/png"), (CACHE_CONTROL, "no-cache")],
        figure.png.clone(),
    ))
}

#[derive(Debug)]
pub enum AppError {
    NotFound,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Figure not found"),
        };

        (
            status,
            Json(ApiResponse::<()>::error(error_message.to_string())),
        )
            .into_response()
    }
}
