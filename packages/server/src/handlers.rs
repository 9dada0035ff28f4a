//! HTTP handler functions for the atlas map API.

use std::str::FromStr as _;

use actix_web::{HttpResponse, web};
use atlas_map_gazetteer::{listing, matching, resolve, search};
use atlas_map_gazetteer_models::{PlaceQuery, SourceKey};
use atlas_map_population::{PopulationFigures, PopulationQuery};
use atlas_map_server_models::{
    ApiHealth, BreakdownResponse, CityDistrictsParams, CityListResponse, CityParams,
    DistrictListResponse, DistrictParams, FileFeatureParams, FileFeatureResponse,
    FilePopulationParams, FileSumParams, FileSumsParams, GroupSumEntry, GroupSumResponse,
    LayerGroupEntry, LayerStatsAllParams, LayerStatsParams, LayerStatsResponse, ListCitiesParams,
    ListDistrictsParams, ListEntry, RegionListResponse, RegionParams, ResolveResponse,
    SearchParams, SourceSumResponse, SuggestParams, SuggestResponse,
};
use geojson::{FeatureCollection, JsonObject};

use crate::AppState;

/// Suggestion cap applied when the caller does not supply `limit`.
const DEFAULT_SUGGEST_LIMIT: usize = 50;

/// Field defaults for the source-scoped sum endpoints.
const DEFAULT_SUM_NAME_FIELD: &str = "NAME";
const DEFAULT_SUM_VALUE_FIELD: &str = "POP";

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/region`
///
/// Resolves a region by id or name. Population figures come from the
/// id-keyed store, falling back to the name-keyed region map.
pub async fn region(state: web::Data<AppState>, params: web::Query<RegionParams>) -> HttpResponse {
    let params = params.into_inner();
    let query = PlaceQuery::new(non_empty(params.region_id), non_empty(params.region_name));
    if query.is_empty() {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "missing region identifier"}));
    }

    let Some(place) = resolve::resolve_region(&state.catalog, &query) else {
        return HttpResponse::NotFound().json(serde_json::json!({"error": "region not found"}));
    };

    let figures = match store_population(&state, &place.properties).await {
        Some(figures) => Some(figures),
        None => state.region_populations.figures_for(&place.name),
    };
    HttpResponse::Ok().json(ResolveResponse::from(place).with_population(figures))
}

/// `GET /api/city`
///
/// Resolves a city by id or name, optionally scoped to a region.
pub async fn city(state: web::Data<AppState>, params: web::Query<CityParams>) -> HttpResponse {
    let params = params.into_inner();
    let query = PlaceQuery {
        id: non_empty(params.city_id),
        name: non_empty(params.city_name),
        scope_id: non_empty(params.region_id),
        scope_name: non_empty(params.region_name),
    };
    if query.is_empty() {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "missing city identifier"}));
    }

    let Some(place) = resolve::resolve_city(&state.catalog, &query) else {
        return HttpResponse::NotFound().json(serde_json::json!({"error": "city not found"}));
    };

    let figures = store_population(&state, &place.properties).await;
    HttpResponse::Ok().json(ResolveResponse::from(place).with_population(figures))
}

/// `GET /api/district`
///
/// Resolves a district by id or name, optionally scoped to a city.
pub async fn district(
    state: web::Data<AppState>,
    params: web::Query<DistrictParams>,
) -> HttpResponse {
    let params = params.into_inner();
    let query = PlaceQuery {
        id: non_empty(params.district_id),
        name: non_empty(params.district_name),
        scope_id: non_empty(params.city_id),
        scope_name: non_empty(params.city_name),
    };
    if query.is_empty() {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "missing district identifier"}));
    }

    let Some(place) = resolve::resolve_district(&state.catalog, &query) else {
        return HttpResponse::NotFound().json(serde_json::json!({"error": "district not found"}));
    };

    let figures = store_population(&state, &place.properties).await;
    HttpResponse::Ok().json(ResolveResponse::from(place).with_population(figures))
}

/// `GET /api/city_districts`
///
/// Returns a `FeatureCollection` of every district in one city. A valid
/// request never 404s; an unknown city is an empty collection.
pub async fn city_districts(
    state: web::Data<AppState>,
    params: web::Query<CityDistrictsParams>,
) -> HttpResponse {
    let params = params.into_inner();
    let query = PlaceQuery::new(non_empty(params.city_id), non_empty(params.city_name));
    if query.is_empty() {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "missing city identifier"}));
    }

    let features = resolve::districts_of_city(&state.catalog, &query);
    HttpResponse::Ok().json(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// `GET /api/search`
///
/// Searches every source in catalog order for the first name match.
pub async fn search_all(
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> HttpResponse {
    let params = params.into_inner();
    let Some(neighborhood) = non_empty(params.neighborhood) else {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "missing neighborhood parameter"}));
    };

    let fields = name_fields(params.name_field.as_deref());
    let field_refs: Vec<&str> = fields.iter().map(String::as_str).collect();
    let Some(place) = search::search_corpus(&state.catalog, &neighborhood, &field_refs) else {
        return HttpResponse::NotFound()
            .json(serde_json::json!({"error": "not found in allowed files"}));
    };

    let figures = match store_population(&state, &place.properties).await {
        Some(figures) => Some(figures),
        None => state.region_populations.figures_for(&place.name),
    };
    HttpResponse::Ok().json(ResolveResponse::from(place).with_population(figures))
}

/// `GET /api/suggest`
///
/// Returns autocomplete suggestions for a substring query.
pub async fn suggest(state: web::Data<AppState>, params: web::Query<SuggestParams>) -> HttpResponse {
    let params = params.into_inner();
    let Some(q) = non_empty(params.q) else {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "missing q parameter"}));
    };

    let limit = params.limit.unwrap_or(DEFAULT_SUGGEST_LIMIT);
    let suggestions = search::suggest(&state.catalog, &q, limit);
    HttpResponse::Ok().json(SuggestResponse { suggestions })
}

/// `GET /api/regions`
pub async fn regions(state: web::Data<AppState>) -> HttpResponse {
    let regions = listing::list_regions(&state.catalog)
        .into_iter()
        .map(ListEntry::from)
        .collect();
    HttpResponse::Ok().json(RegionListResponse { regions })
}

/// `GET /api/cities`
pub async fn cities(
    state: web::Data<AppState>,
    params: web::Query<ListCitiesParams>,
) -> HttpResponse {
    let params = params.into_inner();
    let cities = listing::list_cities(
        &state.catalog,
        non_empty(params.region_id).as_deref(),
        non_empty(params.region_name).as_deref(),
    )
    .into_iter()
    .map(ListEntry::from)
    .collect();
    HttpResponse::Ok().json(CityListResponse { cities })
}

/// `GET /api/districts`
pub async fn districts(
    state: web::Data<AppState>,
    params: web::Query<ListDistrictsParams>,
) -> HttpResponse {
    let params = params.into_inner();
    let districts = listing::list_districts(
        &state.catalog,
        non_empty(params.city_id).as_deref(),
        non_empty(params.city_name).as_deref(),
    )
    .into_iter()
    .map(ListEntry::from)
    .collect();
    HttpResponse::Ok().json(DistrictListResponse { districts })
}

/// `GET /api/file_feature`
///
/// Returns the first match for a name inside one allow-listed source,
/// with name-mapped population figures when available.
pub async fn file_feature(
    state: web::Data<AppState>,
    params: web::Query<FileFeatureParams>,
) -> HttpResponse {
    let params = params.into_inner();
    let Some(key) = parse_file_key(params.file.as_deref()) else {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "invalid or missing file parameter"}));
    };
    let Some(neighborhood) = non_empty(params.neighborhood) else {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "missing neighborhood parameter"}));
    };

    let fields = name_fields(params.name_field.as_deref());
    let field_refs: Vec<&str> = fields.iter().map(String::as_str).collect();
    let Some(place) = search::resolve_in_source(&state.catalog, key, &neighborhood, &field_refs)
    else {
        return HttpResponse::NotFound().json(serde_json::json!({"error": "feature not found"}));
    };

    let figures = state.region_populations.figures_for(&place.name);
    HttpResponse::Ok().json(FileFeatureResponse::from(place).with_population(figures))
}

/// `GET /api/file_sum`
///
/// Sums a numeric field over every record in one source matching a name.
pub async fn file_sum(
    state: web::Data<AppState>,
    params: web::Query<FileSumParams>,
) -> HttpResponse {
    let params = params.into_inner();
    let Some(key) = parse_file_key(params.file.as_deref()) else {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "invalid or missing file parameter"}));
    };
    let Some(neighborhood) = non_empty(params.neighborhood) else {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "missing neighborhood parameter"}));
    };

    let name_field = params
        .name_field
        .unwrap_or_else(|| DEFAULT_SUM_NAME_FIELD.to_string());
    let value_field = params
        .value_field
        .unwrap_or_else(|| DEFAULT_SUM_VALUE_FIELD.to_string());
    let sum = search::sum_for_name(&state.catalog, key, &name_field, &neighborhood, &value_field);
    HttpResponse::Ok().json(SourceSumResponse::from(sum))
}

/// `GET /api/file_sums`
///
/// Grouped sums of a numeric field over one source, largest first.
pub async fn file_sums(
    state: web::Data<AppState>,
    params: web::Query<FileSumsParams>,
) -> HttpResponse {
    let params = params.into_inner();
    let Some(key) = parse_file_key(params.file.as_deref()) else {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "invalid or missing file parameter"}));
    };

    let name_field = params
        .name_field
        .unwrap_or_else(|| DEFAULT_SUM_NAME_FIELD.to_string());
    let value_field = params
        .value_field
        .unwrap_or_else(|| DEFAULT_SUM_VALUE_FIELD.to_string());
    let stats = search::group_sum(&state.catalog, key, &name_field, &value_field)
        .into_iter()
        .map(GroupSumEntry::from)
        .collect();
    HttpResponse::Ok().json(GroupSumResponse { stats })
}

/// `GET /api/file_population`
///
/// Male/female population split for the first record in one source
/// matching a name.
pub async fn file_population(
    state: web::Data<AppState>,
    params: web::Query<FilePopulationParams>,
) -> HttpResponse {
    let params = params.into_inner();
    let Some(key) = parse_file_key(params.file.as_deref()) else {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "invalid or missing file parameter"}));
    };
    let Some(neighborhood) = non_empty(params.neighborhood) else {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "missing neighborhood parameter"}));
    };

    let name_field = params
        .name_field
        .unwrap_or_else(|| DEFAULT_SUM_NAME_FIELD.to_string());
    let Some(breakdown) =
        search::population_breakdown(&state.catalog, key, &name_field, &neighborhood)
    else {
        return HttpResponse::NotFound()
            .json(serde_json::json!({"error": "neighborhood not found"}));
    };
    HttpResponse::Ok().json(BreakdownResponse::from(breakdown))
}

/// `GET /api/layer_stats`
///
/// Sums a population field on the remote layer for one name.
pub async fn layer_stats(
    state: web::Data<AppState>,
    params: web::Query<LayerStatsParams>,
) -> HttpResponse {
    let params = params.into_inner();
    let Some(neighborhood) = non_empty(params.neighborhood) else {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "missing neighborhood parameter"}));
    };

    let defaults = &state.layer_defaults;
    let layer_url = params.layer_url.unwrap_or_else(|| defaults.url.clone());
    let name_field = params
        .neighborhood_field
        .unwrap_or_else(|| defaults.name_field.clone());
    let value_field = params
        .population_field
        .unwrap_or_else(|| defaults.population_field.clone());

    match state
        .layer
        .sum_for(&layer_url, &name_field, &neighborhood, &value_field)
        .await
    {
        Ok(sum) => HttpResponse::Ok().json(SourceSumResponse::from(sum)),
        Err(e) => {
            log::error!("Layer query failed: {e}");
            HttpResponse::BadGateway().json(serde_json::json!({
                "error": "failed to query layer",
                "details": e.to_string(),
            }))
        }
    }
}

/// `GET /api/layer_stats_all`
///
/// Grouped population sums across the remote layer, largest first.
pub async fn layer_stats_all(
    state: web::Data<AppState>,
    params: web::Query<LayerStatsAllParams>,
) -> HttpResponse {
    let params = params.into_inner();
    let defaults = &state.layer_defaults;
    let layer_url = params.layer_url.unwrap_or_else(|| defaults.url.clone());
    let name_field = params
        .neighborhood_field
        .unwrap_or_else(|| defaults.name_field.clone());
    let value_field = params
        .population_field
        .unwrap_or_else(|| defaults.population_field.clone());
    let where_clause = params.where_clause.unwrap_or_else(|| "1=1".to_string());

    match state
        .layer
        .grouped_sums(&layer_url, &name_field, &value_field, &where_clause)
        .await
    {
        Ok(sums) => {
            let stats = sums.into_iter().map(LayerGroupEntry::from).collect();
            HttpResponse::Ok().json(LayerStatsResponse { stats })
        }
        Err(e) => {
            log::error!("Layer query failed: {e}");
            HttpResponse::BadGateway().json(serde_json::json!({
                "error": "failed to query layer",
                "details": e.to_string(),
            }))
        }
    }
}

/// Population figures for a resolved property bag, best-effort. A store
/// failure costs a log line and an unenriched response, never an error.
async fn store_population(state: &AppState, props: &JsonObject) -> Option<PopulationFigures> {
    let query = PopulationQuery {
        region_id: matching::property_id(props, &["region_id"]),
        city_id: matching::property_id(props, &["city_id"]),
        district_id: matching::property_id(props, &["district_id"]),
    };
    if query.is_empty() {
        return None;
    }

    match state.population.lookup(&query).await {
        Ok(figures) => figures,
        Err(e) => {
            log::warn!("Population lookup failed: {e}");
            None
        }
    }
}

/// Treats empty query parameter values as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// Splits a comma-separated `name_field` parameter into candidate
/// fields, defaulting to the common name fields.
fn name_fields(param: Option<&str>) -> Vec<String> {
    param
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|fields| !fields.is_empty())
        .unwrap_or_else(|| {
            matching::DEFAULT_NAME_FIELDS
                .iter()
                .map(|field| (*field).to_string())
                .collect()
        })
}

/// Parses the `file` parameter against the source allow-list.
fn parse_file_key(param: Option<&str>) -> Option<SourceKey> {
    param.and_then(|raw| SourceKey::from_str(raw).ok())
}
