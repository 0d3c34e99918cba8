//! services/api/src/bin/openapi.rs
//!
//! Prints the OpenAPI specification to stdout, for generating clients or
//! publishing docs without starting the server.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), serde_json::Error> {
    println!("{}", ApiDoc::openapi().to_pretty_json()?);
    Ok(())
}
