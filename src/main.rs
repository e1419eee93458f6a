use actix_cors::Cors;
use actix_multipart::form::{tempfile::TempFileConfig, MultipartFormConfig};
use actix_web::{middleware::Logger, web, App, HttpServer};
use dedup_uploader::{config::Config, handlers, Uploader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dedup_uploader=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::new();
    config.validate().map_err(std::io::Error::other)?;

    let uploader = Uploader::with_default_slugger(config.uploader_config())
        .map_err(std::io::Error::other)?;
    let uploader = web::Data::new(uploader);

    let mut temp_file_config = TempFileConfig::default();
    if let Some(dir) = &config.upload_tmp_dir {
        temp_file_config = temp_file_config.directory(dir);
    }
    let multipart_config = MultipartFormConfig::default().total_limit(config.upload_max_bytes);

    tracing::info!(
        "Server started at http://{}:{}",
        config.app_url,
        config.service_port
    );

    let bind = (config.app_url.clone(), config.service_port);
    let workers = config.workers;
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&config))
            .wrap(Logger::default())
            .app_data(uploader.clone())
            .app_data(temp_file_config.clone())
            .app_data(multipart_config.clone())
            .configure(|cfg| handlers::routes(cfg, &config.upload_public_prefix))
    })
    .bind(bind)?
    .workers(workers)
    .run()
    .await
}

fn cors(config: &Config) -> Cors {
    if config.is_development {
        return Cors::permissive();
    }

    config
        .cors_domains
        .iter()
        .fold(Cors::default(), |cors, domain| cors.allowed_origin(domain))
        .allowed_methods(vec!["GET", "HEAD", "POST"])
        .max_age(3600)
}
