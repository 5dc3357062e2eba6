use std::convert::Infallible;
use std::path::PathBuf;

use serde::Deserialize;
use warp::http::{StatusCode, Uri};
use warp::hyper::body::Bytes;
use warp::path::FullPath;
use warp::reply::Response;
use warp::{Filter, Reply};

use super::presence_websocket;
use crate::diagnostics::DiagnosticLog;
use crate::error::TicksError;
use crate::presence::{HubHandle, RoomCode};

/// Everything the server answers: API, WebSocket, diagnostics and the client
/// application.
pub fn routes(
    hub: HubHandle,
    diagnostics: DiagnosticLog,
    static_dir: PathBuf,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    presence_websocket_route(hub.clone(), diagnostics.clone())
        .or(health_check())
        .or(rooms_list(hub.clone()))
        .or(room_detail(hub.clone()))
        .or(room_create(hub))
        .or(diagnostic_log(diagnostics))
        .or(client_application(static_dir))
        .with(warp::trace::request())
}

pub fn presence_websocket_route(
    hub: HubHandle,
    diagnostics: DiagnosticLog,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_hub(hub))
        .and(with_diagnostics(diagnostics))
        .map(|ws: warp::ws::Ws, hub: HubHandle, diagnostics: DiagnosticLog| {
            ws.on_upgrade(move |websocket| {
                presence_websocket::handle_presence_websocket(websocket, hub, diagnostics)
            })
        })
}

pub fn health_check() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "health")
        .and(warp::get())
        .map(|| {
            warp::reply::json(&serde_json::json!({
                "status": "healthy",
                "service": "Ticks Server",
                "version": env!("CARGO_PKG_VERSION")
            }))
        })
}

pub fn rooms_list(hub: HubHandle) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "rooms")
        .and(warp::get())
        .and(with_hub(hub))
        .and_then(list_rooms)
}

pub fn room_detail(hub: HubHandle) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "rooms" / String)
        .and(warp::get())
        .and(with_hub(hub))
        .and_then(describe_room)
}

pub fn room_create(hub: HubHandle) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "rooms")
        .and(warp::post())
        .and(warp::body::bytes())
        .and(with_hub(hub))
        .and_then(create_room)
}

pub fn diagnostic_log(
    diagnostics: DiagnosticLog,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("server.log")
        .and(warp::get())
        .and(with_diagnostics(diagnostics))
        .and_then(serve_diagnostic_log)
}

/// Static files, with every unmatched route falling back to the entry page.
pub fn client_application(
    static_dir: PathBuf,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let index_redirect = warp::path!("index.html")
        .and(warp::get())
        .map(|| warp::redirect::found(Uri::from_static("/")));

    let dotfiles = warp::get().and(warp::path::full()).and_then(deny_dotfiles);

    let files = warp::get()
        .and(warp::fs::dir(static_dir.clone()))
        .map(|file: warp::fs::File| warp::reply::with_header(file, "cache-control", "no-cache"));

    let missing_file = warp::get().and(warp::path::full()).and_then(reject_missing_file);

    let entry_point = warp::get()
        .and(warp::fs::file(static_dir.join("index.html")))
        .map(|file: warp::fs::File| warp::reply::with_header(file, "cache-control", "no-cache"));

    index_redirect
        .or(dotfiles)
        .or(files)
        .or(missing_file)
        .or(entry_point)
}

#[derive(Debug, Default, Deserialize)]
struct NewRoomRequest {
    description: Option<String>,
}

async fn list_rooms(hub: HubHandle) -> Result<Response, Infallible> {
    Ok(match hub.list_rooms().await {
        Ok(rooms) => warp::reply::json(&rooms).into_response(),
        Err(e) => unavailable(e),
    })
}

async fn describe_room(raw_code: String, hub: HubHandle) -> Result<Response, Infallible> {
    let decoded = urlencoding::decode(&raw_code)
        .map(|code| code.into_owned())
        .unwrap_or(raw_code);
    let room_code = match RoomCode::parse(&decoded) {
        Ok(code) => code,
        Err(e) => return Ok(error_reply(StatusCode::BAD_REQUEST, &e)),
    };

    Ok(match hub.describe_room(room_code).await {
        Ok(Some(room)) => warp::reply::json(&room).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => unavailable(e),
    })
}

async fn create_room(body: Bytes, hub: HubHandle) -> Result<Response, Infallible> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        NewRoomRequest::default()
    } else {
        match serde_json::from_slice::<NewRoomRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                let err = TicksError::malformed(e.to_string());
                return Ok(error_reply(StatusCode::BAD_REQUEST, &err));
            }
        }
    };

    Ok(match hub.create_room(request.description).await {
        Ok(room) => warp::reply::with_status(warp::reply::json(&room), StatusCode::CREATED).into_response(),
        Err(e) => unavailable(e),
    })
}

async fn serve_diagnostic_log(diagnostics: DiagnosticLog) -> Result<Response, Infallible> {
    let Some(path) = diagnostics.path() else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    Ok(match tokio::fs::read_to_string(path).await {
        Ok(contents) => warp::reply::with_header(contents, "cache-control", "no-cache").into_response(),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to read diagnostic log");
            warp::reply::with_status("Error reading log file", StatusCode::INTERNAL_SERVER_ERROR)
                .into_response()
        }
    })
}

/// Segments are checked after percent-decoding, the same form the file
/// server opens. Undecodable segments are refused outright.
async fn deny_dotfiles(path: FullPath) -> Result<StatusCode, warp::Rejection> {
    let hidden = path.as_str().split('/').any(|segment| match urlencoding::decode(segment) {
        Ok(decoded) => decoded.starts_with('.'),
        Err(_) => true,
    });

    if hidden {
        Ok(StatusCode::FORBIDDEN)
    } else {
        Err(warp::reject::not_found())
    }
}

/// A path that names a file (its last segment has a dot) but matched none.
async fn reject_missing_file(path: FullPath) -> Result<StatusCode, warp::Rejection> {
    let last = path.as_str().rsplit('/').next().unwrap_or_default();
    if last.contains('.') {
        Ok(StatusCode::NOT_FOUND)
    } else {
        Err(warp::reject::not_found())
    }
}

fn error_reply(status: StatusCode, error: &TicksError) -> Response {
    let body = warp::reply::json(&serde_json::json!({ "error": error.to_string() }));
    warp::reply::with_status(body, status).into_response()
}

fn unavailable(error: TicksError) -> Response {
    tracing::error!(error = %error, "Presence hub did not answer");
    error_reply(StatusCode::SERVICE_UNAVAILABLE, &error)
}

fn with_hub(hub: HubHandle) -> impl Filter<Extract = (HubHandle,), Error = Infallible> + Clone {
    warp::any().map(move || hub.clone())
}

fn with_diagnostics(
    diagnostics: DiagnosticLog,
) -> impl Filter<Extract = (DiagnosticLog,), Error = Infallible> + Clone {
    warp::any().map(move || diagnostics.clone())
}
