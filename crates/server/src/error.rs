use actix_web::HttpResponse;
use dlb_engine::EngineError;
use dlb_dto::response::ErrorResponse;

/// Maps an [`EngineError`] to the status code spec §7's error kinds
/// imply: `PreconditionFailed`→412, `Conflict`→409, `NotFound`→404,
/// `Transient`→503 (the caller may retry), `Fatal`→500.
pub fn respond(err: EngineError) -> HttpResponse {
    let body = ErrorResponse {
        code: err.code().to_owned(),
        message: err.to_string(),
    };
    match err {
        EngineError::PreconditionFailed { .. } => HttpResponse::PreconditionFailed().json(body),
        EngineError::Conflict { .. } => HttpResponse::Conflict().json(body),
        EngineError::NotFound(_) => HttpResponse::NotFound().json(body),
        EngineError::Transient(_) => HttpResponse::ServiceUnavailable().json(body),
        EngineError::Fatal(msg) => {
            log::error!("fatal engine error: {msg}");
            HttpResponse::InternalServerError().json(body)
        }
    }
}
