use actix_web::{web, App, HttpServer};
use backend::config::AppConfig;
use backend::services;
use backend::services::clients::cache::BundleCache;
use env_logger::Env;
use log::info;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let cfg = AppConfig::from_env();
    cfg.ensure_dirs()?;
    {
        let conn = backend::db::open(&cfg).map_err(std::io::Error::other)?;
        backend::db::init_schema(&conn).map_err(std::io::Error::other)?;
    }
    let cache = BundleCache::new(cfg.bundle_ttl);
    let bind_addr = cfg.bind_addr.clone();

    info!("server running at http://{}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(10 * 1024 * 1024)) // 10 MB
            .app_data(web::Data::new(cfg.clone()))
            .app_data(web::Data::new(cache.clone()))
            .service(services::templates::configure_routes())
            .service(services::profiles::configure_routes())
            .service(services::clients::configure_routes())
            .service(services::resolve::configure_routes())
            .service(services::generate::configure_routes())
            .service(services::documents::configure_routes())
            .service(services::approvals::configure_routes())
            .service(services::notifications::configure_routes())
    })
    .bind(bind_addr)?
    .run()
    .await
}
