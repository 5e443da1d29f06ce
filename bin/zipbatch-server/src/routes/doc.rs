use utoipa::OpenApi;

use crate::routes::{archive, health, tasks};

#[derive(OpenApi)]
#[openapi(info(
    title = "zipbatch-server",
    description = "Collect remote files into downloadable zip archives",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(tasks::TasksApi::openapi());
    root.merge(archive::ArchiveApi::openapi());
    root
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = get_docs();
        for path in [
            "/health",
            "/api/task",
            "/api/task/{id}",
            "/api/task/{id}/add_file",
            "/archive/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing from OpenAPI doc");
        }
    }
}
