use actix_cors::Cors;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse},
    middleware::DefaultHeaders,
    web, App, Error,
};

use crate::error::ApiError;
use crate::routes::{self, AppState};

const ALLOWED_METHODS: [&str; 5] = ["GET", "POST", "PUT", "DELETE", "OPTIONS"];

// Preflights are answered by the OPTIONS routes so that bare OPTIONS requests
// without an Origin still get a 200.
fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allowed_methods(ALLOWED_METHODS)
        .allow_any_header()
        .disable_preflight()
}

fn cors_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", "*"))
        .add(("Access-Control-Allow-Methods", ALLOWED_METHODS.join(", ")))
        .add(("Access-Control-Allow-Headers", "Content-Type"))
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

/// Assembles the application with the group routes mounted under `base`.
pub fn build_app(
    state: web::Data<AppState>,
    base: &str,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(state)
        .app_data(json_config())
        .service(web::scope(base).configure(routes::configure))
        .default_service(web::to(routes::unknown_route))
        .wrap(cors())
        .wrap(cors_headers())
        .wrap_fn(|req, srv| {
            tracing::info!(method = %req.method(), path = %req.path(), "request");
            srv.call(req)
        })
}
