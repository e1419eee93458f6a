use actix_web::web;

pub mod uploads;

/// Registers the upload route and the route serving stored files under
/// `/<public_prefix>/{name}`.
pub fn routes(cfg: &mut web::ServiceConfig, public_prefix: &str) {
    let public_prefix = public_prefix.trim_matches('/');
    cfg.route(
        &format!("/{}", public_prefix),
        web::post().to(uploads::upload_image),
    )
    .service(
        web::resource(format!("/{}/{{name}}", public_prefix))
            .route(web::get().to(uploads::serve_upload))
            .route(web::head().to(uploads::serve_upload)),
    );
}
