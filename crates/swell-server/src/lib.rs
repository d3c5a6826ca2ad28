//! HTTP surface of the Swell server.
//!
//! Three read-only routes sit on top of [`OceanicDataService`] and a
//! [`Geocoder`]; every failure is turned into a JSON `{ code, message }` body by
//! [`handle_rejection`].

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use swell_core::{AppError, Config};
use swell_marine::{
    Geocoder, Location, MarineClient, MarineError, OceanicDataService, OpenMeteoGeocoder,
    OpenMeteoMarineClient,
};
use warp::http::StatusCode;
use warp::reject::Reject;
use warp::{Filter, Rejection, Reply};

/// Shared per-server state handed to every request.
pub struct SurfContext<C, G> {
    oceanic: OceanicDataService<C>,
    geocoder: G,
}

impl<C: MarineClient, G: Geocoder> SurfContext<C, G> {
    pub fn new(oceanic: OceanicDataService<C>, geocoder: G) -> Self {
        Self { oceanic, geocoder }
    }
}

#[derive(Debug, Deserialize)]
pub struct SurfQuery {
    pub latitude: String,
    pub longitude: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub name: String,
}

/// Error body for every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

/// A [`MarineError`] travelling through warp's rejection path.
#[derive(Debug)]
pub struct ApiRejection(pub MarineError);

impl Reject for ApiRejection {}

fn reject(err: MarineError) -> Rejection {
    warp::reject::custom(ApiRejection(err))
}

/// Status code a marine failure maps to.
pub fn status_for(err: &MarineError) -> StatusCode {
    match err {
        MarineError::InvalidLocation(_) | MarineError::UnknownSeries(_) => StatusCode::BAD_REQUEST,
        e if e.is_upstream() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// All routes, with rejection recovery and request tracing applied.
///
/// - `GET /surf?latitude=..&longitude=..`
/// - `GET /surf/muizenberg`
/// - `GET /v1/search?name=..`
pub fn routes<C, G>(
    ctx: Arc<SurfContext<C, G>>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone
where
    C: MarineClient + 'static,
    G: Geocoder + 'static,
{
    let with_ctx = warp::any().map(move || ctx.clone());

    let surf = warp::path!("surf")
        .and(warp::get())
        .and(warp::query::<SurfQuery>())
        .and(with_ctx.clone())
        .and_then(|query: SurfQuery, ctx: Arc<SurfContext<C, G>>| async move {
            surf_handler(query, ctx).await
        });

    let muizenberg = warp::path!("surf" / "muizenberg")
        .and(warp::get())
        .and(with_ctx.clone())
        .and_then(|ctx: Arc<SurfContext<C, G>>| async move { muizenberg_handler(ctx).await });

    let search = warp::path!("v1" / "search")
        .and(warp::get())
        .and(warp::query::<SearchQuery>())
        .and(with_ctx)
        .and_then(|query: SearchQuery, ctx: Arc<SurfContext<C, G>>| async move {
            search_handler(query, ctx).await
        });

    surf.or(muizenberg)
        .or(search)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

async fn surf_handler<C: MarineClient, G: Geocoder>(
    query: SurfQuery,
    ctx: Arc<SurfContext<C, G>>,
) -> Result<warp::reply::Json, Rejection> {
    let location = Location::new(query.latitude, query.longitude).map_err(reject)?;
    fetch_oceanic(&ctx, &location).await
}

async fn muizenberg_handler<C: MarineClient, G: Geocoder>(
    ctx: Arc<SurfContext<C, G>>,
) -> Result<warp::reply::Json, Rejection> {
    fetch_oceanic(&ctx, &Location::muizenberg()).await
}

async fn fetch_oceanic<C: MarineClient, G: Geocoder>(
    ctx: &SurfContext<C, G>,
    location: &Location,
) -> Result<warp::reply::Json, Rejection> {
    let series = ctx
        .oceanic
        .get_oceanic_data(location)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&series))
}

async fn search_handler<C: MarineClient, G: Geocoder>(
    query: SearchQuery,
    ctx: Arc<SurfContext<C, G>>,
) -> Result<warp::reply::Json, Rejection> {
    let locations = ctx.geocoder.search(&query.name).await.map_err(reject)?;
    Ok(warp::reply::json(&locations))
}

/// Turn any rejection into a JSON error response.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(ApiRejection(e)) = err.find::<ApiRejection>() {
        let code = status_for(e);
        if code.is_server_error() {
            tracing::warn!("Request failed: {}", e);
        } else {
            tracing::debug!("Rejected request: {}", e);
        }
        (code, e.user_message())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed".to_string(),
        )
    } else {
        tracing::error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    let body = ErrorBody {
        code: code.as_u16(),
        message,
    };
    Ok(warp::reply::with_status(warp::reply::json(&body), code))
}

/// Build the Open-Meteo clients from `config` and serve until Ctrl-C.
pub async fn serve(config: &Config) -> Result<(), AppError> {
    let timeout = config.upstream.timeout();
    let marine = OpenMeteoMarineClient::new(timeout)
        .map_err(|e| AppError::Service(format!("Failed to build marine client: {}", e)))?;
    let geocoder = OpenMeteoGeocoder::new(timeout, config.upstream.geocoding_max_results)
        .map_err(|e| AppError::Service(format!("Failed to build geocoder: {}", e)))?;

    let ctx = Arc::new(SurfContext::new(OceanicDataService::new(marine), geocoder));
    let addr: SocketAddr = config.socket_addr()?;

    let (bound, server) = warp::serve(routes(ctx))
        .try_bind_with_graceful_shutdown(addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown signal received");
        })
        .map_err(|e| AppError::Service(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Swell server listening on http://{}", bound);
    server.await;
    tracing::info!("Swell server stopped");

    Ok(())
}
