use actix_cors::Cors;
use actix_web::{http::header, middleware::Compress, web, App, HttpServer};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use gitcomments::auth::IdentityVerifier;
use gitcomments::config::Config;
use gitcomments::openapi::ApiDoc;
use gitcomments::resolver::HttpThreadResolver;
use gitcomments::settings::{HttpSettingsSource, SettingsCache};
use gitcomments::store::GitHubStore;
use gitcomments::{routes, AppState, Publishing, RequireJson};

fn cors(origins: &[String]) -> Cors {
    let mut c = Cors::default()
        .allowed_methods(["GET", "POST", "PATCH", "PUT", "DELETE"])
        .allowed_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers(["Link", "X-Total-Count"])
        .supports_credentials()
        .max_age(3600);
    if origins.is_empty() {
        c = c.allow_any_origin();
    }
    for origin in origins {
        c = c.allowed_origin(origin);
    }
    c
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Environment variables must be set externally (shell, systemd, Docker, etc.)
    // Load .env automatically only in debug builds.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            eprintln!("Please copy .env.example to .env and configure it");
            std::process::exit(1);
        }
    };

    info!("Bootstrapping comment server");
    info!(
        repository = %format!("{}/{}", cfg.repository.owner, cfg.repository.repo),
        branch = %cfg.published_branch,
        site = %cfg.site_url,
        "content repository configured"
    );
    if cfg.github_token.is_none() {
        info!("GITHUB_TOKEN not set, repository writes will be unauthenticated");
    }

    let store = GitHubStore::new(&cfg.github_api_base, cfg.github_token.clone(), cfg.store_timeout)
        .map_err(std::io::Error::other)?;
    let resolver = HttpThreadResolver::new(&cfg.site_url, cfg.store_timeout).map_err(std::io::Error::other)?;
    let settings_source = HttpSettingsSource::new(&cfg.site_url, &cfg.settings_path, cfg.store_timeout)
        .map_err(std::io::Error::other)?;

    let state = AppState {
        store: Arc::new(store),
        resolver: Arc::new(resolver),
        settings: Arc::new(SettingsCache::new(Arc::new(settings_source), cfg.settings_ttl)),
        verifier: IdentityVerifier::new(cfg.jwt_secret.clone()),
        publishing: Publishing {
            repository: cfg.repository.clone(),
            published_branch: cfg.published_branch.clone(),
            threads_source: cfg.threads_source.clone(),
            store_timeout: cfg.store_timeout,
        },
    };

    let openapi = ApiDoc::openapi();
    let origins = cfg.cors_origins.clone();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequireJson)
            .wrap(Compress::default())
            .wrap(TracingLogger::default())
            .wrap(cors(&origins))
            .app_data(web::Data::new(state.clone()))
            .configure(routes::config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind((cfg.bind_addr.as_str(), cfg.port))?;

    info!("Listening on http://{}:{}", cfg.bind_addr, cfg.port);

    server.run().await
}
