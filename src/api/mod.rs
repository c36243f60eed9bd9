mod chain;
pub mod error;
mod health;
pub mod models;
mod nodes;

use actix_web::web::{self, ServiceConfig};
use actix_web::{HttpResponse, error::InternalError};

pub use models::AppState;
use models::ErrorResponse;

pub fn init_routes(cfg: &mut ServiceConfig) {
    // Bodies are parsed as JSON whatever their content type; malformed or
    // incomplete bodies become a 400 with an `error` message.
    let json_config = web::JsonConfig::default()
        .content_type_required(false)
        .error_handler(|err, _req| {
            let resp = HttpResponse::BadRequest().json(ErrorResponse {
                error: format!("Invalid request body: {err}"),
            });
            InternalError::from_response(err, resp).into()
        });

    cfg.app_data(json_config)
        .service(health::health_check)
        .service(chain::get_chain)
        .service(chain::validate_chain)
        .service(chain::new_transaction)
        .service(chain::mine)
        .service(nodes::register_nodes)
        .service(nodes::list_nodes)
        .service(nodes::resolve_conflicts);
}
