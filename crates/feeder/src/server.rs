//! The HTTP side of jogging: the robot fetches its programs from here.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use scribit_planner::{Error, JogSession};

const TEXT: &str = "text/plain; charset=utf-8";

pub fn router(session: Arc<JogSession>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/g/:file", get(program))
        .with_state(session)
}

async fn health() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, TEXT)], "ok\n")
}

fn text(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, TEXT)], body).into_response()
}

async fn program(State(session): State<Arc<JogSession>>, Path(file): Path<String>) -> Response {
    let Some(name) = file.strip_suffix(".gcode") else {
        return text(StatusCode::NOT_FOUND, "not found\n".to_owned());
    };
    match session.program_by_name(name) {
        Ok(program) => {
            log::debug!("serving {name}");
            text(StatusCode::OK, program.to_string())
        }
        Err(e) => {
            log::warn!("request for {file}: {e}");
            let status = match e {
                Error::UnknownCommand(_) => StatusCode::BAD_REQUEST,
                Error::NotGenerated(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            text(status, format!("{e}\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use scribit_protocol::{CommandId, JogKey};
    use tower::ServiceExt;

    use super::*;

    async fn fetch(session: &Arc<JogSession>, uri: &str) -> (StatusCode, String) {
        let resp = router(Arc::clone(session))
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn routes() {
        let session = Arc::new(JogSession::new(JogKey::new(2.0, 900)));

        assert_eq!(fetch(&session, "/health").await, (StatusCode::OK, "ok\n".to_owned()));

        let (status, body) = fetch(&session, "/g/BOTH_IN.gcode").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "G21\nG91\nM17\nG1 X-2.000 Y2.000 F900\n");

        let (status, _) = fetch(&session, "/g/SIDEWAYS.gcode").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = fetch(&session, "/g/G77.gcode").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let issued = session.issue(CommandId::Home).unwrap();
        assert_eq!(fetch(&session, "/g/G77.gcode").await, (StatusCode::OK, issued.to_string()));

        let (status, _) = fetch(&session, "/g/BOTH_IN.txt").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = fetch(&session, "/nowhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
