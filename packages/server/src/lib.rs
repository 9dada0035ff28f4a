#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the atlas map application.
//!
//! Serves the REST API for resolving administrative units against the
//! GeoJSON/JSON reference catalog, plus the static map frontend.
//! Population figures come from an id-keyed store (a JSON row file, or
//! `DuckDB` behind the `duckdb` feature) with a name-keyed region map as
//! fallback; remote feature-layer statistics are proxied through the
//! layer client.

mod handlers;

use std::path::Path;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use atlas_map_gazetteer::catalog::SourceCatalog;
use atlas_map_layer::LayerClient;
use atlas_map_population::{FilePopulationStore, PopulationStore, RegionPopulations};

/// Remote feature layer queried when `LAYER_URL` is unset. A public
/// ArcGIS sample census layer, so the layer endpoints work in demos
/// without a configured data source.
const DEFAULT_LAYER_URL: &str =
    "https://sampleserver6.arcgisonline.com/arcgis/rest/services/Census/MapServer/3";

/// Layer settings applied when a request does not override them.
pub struct LayerDefaults {
    /// Layer query endpoint.
    pub url: String,
    /// Attribute holding the feature name.
    pub name_field: String,
    /// Attribute holding the population value.
    pub population_field: String,
}

/// Shared application state.
pub struct AppState {
    /// Reference source catalog with its in-memory cache.
    pub catalog: Arc<SourceCatalog>,
    /// Id-keyed population store.
    pub population: Arc<dyn PopulationStore>,
    /// Name-keyed region population fallback.
    pub region_populations: Arc<RegionPopulations>,
    /// Remote feature-layer client.
    pub layer: Arc<LayerClient>,
    /// Default layer settings.
    pub layer_defaults: LayerDefaults,
}

/// Registers every `/api` route on `config`.
pub fn configure_api(config: &mut web::ServiceConfig) {
    config.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/region", web::get().to(handlers::region))
            .route("/city", web::get().to(handlers::city))
            .route("/district", web::get().to(handlers::district))
            .route("/city_districts", web::get().to(handlers::city_districts))
            .route("/search", web::get().to(handlers::search_all))
            .route("/suggest", web::get().to(handlers::suggest))
            .route("/regions", web::get().to(handlers::regions))
            .route("/cities", web::get().to(handlers::cities))
            .route("/districts", web::get().to(handlers::districts))
            .route("/file_feature", web::get().to(handlers::file_feature))
            .route("/file_sum", web::get().to(handlers::file_sum))
            .route("/file_sums", web::get().to(handlers::file_sums))
            .route("/file_population", web::get().to(handlers::file_population))
            .route("/layer_stats", web::get().to(handlers::layer_stats))
            .route("/layer_stats_all", web::get().to(handlers::layer_stats_all)),
    );
}

/// Starts the atlas map API server.
///
/// Builds the source catalog from `ATLAS_DATA_DIR`, opens the population
/// stores, constructs the layer client, and starts the Actix-Web HTTP
/// server. The caller provides the async runtime, normally via
/// `#[actix_web::main]`.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
///
/// # Panics
///
/// Panics if the layer HTTP client cannot be constructed.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let data_dir = std::env::var("ATLAS_DATA_DIR").unwrap_or_else(|_| "data".to_string());
    log::info!("Serving reference sources from {data_dir}");
    let catalog = SourceCatalog::new(&data_dir);

    let population = population_store();

    let region_path = std::env::var("REGION_POPULATION_PATH")
        .unwrap_or_else(|_| "data/region_population.json".to_string());
    let region_populations = RegionPopulations::load(Path::new(&region_path));

    let layer = LayerClient::new().expect("Failed to build layer HTTP client");
    let layer_defaults = LayerDefaults {
        url: std::env::var("LAYER_URL").unwrap_or_else(|_| DEFAULT_LAYER_URL.to_string()),
        name_field: std::env::var("LAYER_NAME_FIELD").unwrap_or_else(|_| "NAME".to_string()),
        population_field: std::env::var("LAYER_POPULATION_FIELD")
            .unwrap_or_else(|_| "POP2000".to_string()),
    };

    let state = web::Data::new(AppState {
        catalog: Arc::new(catalog),
        population,
        region_populations: Arc::new(region_populations),
        layer: Arc::new(layer),
        layer_defaults,
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure_api)
            // Serve frontend static files (production)
            .service(Files::new("/", "web/dist").index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

/// Opens the id-keyed population store: `DuckDB` when the feature is on
/// and `POPULATION_DB_PATH` is set, otherwise the JSON row file named by
/// `POPULATION_PATH`. A missing or unreadable file degrades to an empty
/// store so population enrichment is simply skipped.
fn population_store() -> Arc<dyn PopulationStore> {
    #[cfg(feature = "duckdb")]
    if let Ok(path) = std::env::var("POPULATION_DB_PATH") {
        match atlas_map_population::DuckDbPopulationStore::open(Path::new(&path)) {
            Ok(store) => {
                log::info!("Using DuckDB population store at {path}");
                return Arc::new(store);
            }
            Err(e) => log::warn!("Failed to open population database {path}: {e}"),
        }
    }

    let path =
        std::env::var("POPULATION_PATH").unwrap_or_else(|_| "data/population.json".to_string());
    let store = FilePopulationStore::open(Path::new(&path)).unwrap_or_else(|e| {
        log::warn!("Failed to load population rows from {path}: {e}");
        FilePopulationStore::empty()
    });
    Arc::new(store)
}
