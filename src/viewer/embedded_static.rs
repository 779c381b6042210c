use axum::{
    body::Body,
    http::{header, Response, StatusCode, Uri},
    response::IntoResponse,
};
use include_dir::{include_dir, Dir};
use mime_guess::from_path;

// Embed the viewer page at compile time
static STATIC_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

fn respond(status: StatusCode, content_type: &str, body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    if let Ok(value) = header::HeaderValue::from_str(content_type) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, header::HeaderValue::from_static("no-cache"));
    response
}

pub async fn serve_embedded_file(uri: Uri) -> impl IntoResponse {
    let path = uri.path().trim_start_matches('/');

    // If path is empty, serve index.html
    let path = if path.is_empty() { "index.html" } else { path };

    if let Some(file) = STATIC_DIR.get_file(path) {
        let mime_type = from_path(path).first_or_octet_stream();
        return respond(StatusCode::OK, mime_type.as_ref(), Body::from(file.contents()));
    }

    if path.starts_with("api/") {
        return respond(
            StatusCode::NOT_FOUND,
            "text/plain; charset=utf-8",
            Body::from("Not found"),
        );
    }

    // Unknown pages fall back to the viewer
    match STATIC_DIR.get_file("index.html") {
        Some(index_file) => respond(
            StatusCode::OK,
            "text/html; charset=utf-8",
            Body::from(index_file.contents()),
        ),
        None => respond(
            StatusCode::NOT_FOUND,
            "text/plain; charset=utf-8",
            Body::from("File not found"),
        ),
    }
}
