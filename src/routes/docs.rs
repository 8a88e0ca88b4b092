use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

const DOCS_PATH: &str = "/docs";
const OPENAPI_PATH: &str = "/api-doc/openapi.json";

/// Swagger UI for the board, admin and stream routes.
pub fn router(state: SharedState) -> Router<SharedState> {
    let swagger = SwaggerUi::new(DOCS_PATH).url(OPENAPI_PATH, ApiDoc::openapi());
    Router::<SharedState>::from(swagger).with_state(state)
}
