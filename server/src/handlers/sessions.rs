use crate::Accumulator;
use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

pub fn configure_session_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/sessions/{session_id}/points")
            .name("session_points")
            .route(web::get().to(get_point_count)),
    );
}

async fn get_point_count(
    path: web::Path<String>,
    accumulator: web::Data<Accumulator>,
) -> impl Responder {
    let session_id = path.into_inner();
    let point_count = accumulator.point_count(&session_id);
    HttpResponse::Ok().json(json!({
        "sessionId": session_id,
        "pointCount": point_count,
    }))
}
