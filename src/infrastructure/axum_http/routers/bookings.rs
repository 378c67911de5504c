use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    application::usercases::bookings::{BookingPolicy, BookingUseCase},
    config::config_model::DotEnvyConfig,
    domain::{
        repositories::{
            booking_cache::BookingCache, bookings::BookingRepository, places::PlaceCatalog,
            settlement::BookingSettlementRepository,
        },
        value_objects::{
            booking_list::ListBookingsQuery,
            bookings::{
                BookingRequester, CreateBookingModel, TransitionStatusModel, UpdateBookingModel,
            },
        },
    },
    infrastructure::{
        axum_http::auth::AuthUser,
        cache::in_memory::InMemoryBookingCache,
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{
                bookings::BookingPostgres, places::PlacePostgres,
                settlement::BookingSettlementPostgres,
            },
        },
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Arc<DotEnvyConfig>) -> Router {
    let statement_timeout_ms = config.database.statement_timeout_ms;

    let booking_repository = BookingPostgres::new(Arc::clone(&db_pool), statement_timeout_ms);
    let place_catalog = PlacePostgres::new(Arc::clone(&db_pool));
    let settlement_repository =
        BookingSettlementPostgres::new(Arc::clone(&db_pool), statement_timeout_ms);
    let cache = InMemoryBookingCache::new(config.booking.cache_max_entries);

    let bookings_usecase = BookingUseCase::new(
        Arc::new(booking_repository),
        Arc::new(place_catalog),
        Arc::new(settlement_repository),
        Arc::new(cache),
        BookingPolicy::from(&config.booking),
    );

    Router::new()
        .route("/", get(list).post(create))
        .route("/:booking_id", get(get_booking).patch(update).delete(remove))
        .route("/status/:booking_id", patch(transition))
        .with_state(Arc::new(bookings_usecase))
}

pub async fn create<B, P, S, C>(
    State(bookings_usecase): State<Arc<BookingUseCase<B, P, S, C>>>,
    auth: AuthUser,
    Json(create_booking_model): Json<CreateBookingModel>,
) -> impl IntoResponse
where
    B: BookingRepository + Send + Sync + 'static,
    P: PlaceCatalog + Send + Sync + 'static,
    S: BookingSettlementRepository + Send + Sync + 'static,
    C: BookingCache + Send + Sync + 'static,
{
    match bookings_usecase
        .create(auth.user_id, create_booking_model)
        .await
    {
        Ok(booking) => (StatusCode::CREATED, Json(booking)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_booking<B, P, S, C>(
    State(bookings_usecase): State<Arc<BookingUseCase<B, P, S, C>>>,
    auth: AuthUser,
    Path(booking_id): Path<Uuid>,
) -> impl IntoResponse
where
    B: BookingRepository + Send + Sync + 'static,
    P: PlaceCatalog + Send + Sync + 'static,
    S: BookingSettlementRepository + Send + Sync + 'static,
    C: BookingCache + Send + Sync + 'static,
{
    match bookings_usecase
        .get_booking(BookingRequester::from(&auth), booking_id)
        .await
    {
        Ok(details) => (StatusCode::OK, Json(details)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update<B, P, S, C>(
    State(bookings_usecase): State<Arc<BookingUseCase<B, P, S, C>>>,
    auth: AuthUser,
    Path(booking_id): Path<Uuid>,
    Json(update_booking_model): Json<UpdateBookingModel>,
) -> impl IntoResponse
where
    B: BookingRepository + Send + Sync + 'static,
    P: PlaceCatalog + Send + Sync + 'static,
    S: BookingSettlementRepository + Send + Sync + 'static,
    C: BookingCache + Send + Sync + 'static,
{
    match bookings_usecase
        .update(BookingRequester::from(&auth), booking_id, update_booking_model)
        .await
    {
        Ok(booking) => (StatusCode::OK, Json(booking)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn transition<B, P, S, C>(
    State(bookings_usecase): State<Arc<BookingUseCase<B, P, S, C>>>,
    auth: AuthUser,
    Path(booking_id): Path<Uuid>,
    Json(transition_status_model): Json<TransitionStatusModel>,
) -> impl IntoResponse
where
    B: BookingRepository + Send + Sync + 'static,
    P: PlaceCatalog + Send + Sync + 'static,
    S: BookingSettlementRepository + Send + Sync + 'static,
    C: BookingCache + Send + Sync + 'static,
{
    match bookings_usecase
        .transition(
            BookingRequester::from(&auth),
            booking_id,
            &transition_status_model.status,
        )
        .await
    {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn remove<B, P, S, C>(
    State(bookings_usecase): State<Arc<BookingUseCase<B, P, S, C>>>,
    auth: AuthUser,
    Path(booking_id): Path<Uuid>,
) -> impl IntoResponse
where
    B: BookingRepository + Send + Sync + 'static,
    P: PlaceCatalog + Send + Sync + 'static,
    S: BookingSettlementRepository + Send + Sync + 'static,
    C: BookingCache + Send + Sync + 'static,
{
    match bookings_usecase
        .delete(BookingRequester::from(&auth), booking_id)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list<B, P, S, C>(
    State(bookings_usecase): State<Arc<BookingUseCase<B, P, S, C>>>,
    _auth: AuthUser,
    Query(query): Query<ListBookingsQuery>,
) -> impl IntoResponse
where
    B: BookingRepository + Send + Sync + 'static,
    P: PlaceCatalog + Send + Sync + 'static,
    S: BookingSettlementRepository + Send + Sync + 'static,
    C: BookingCache + Send + Sync + 'static,
{
    match bookings_usecase.list(query).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => e.into_response(),
    }
}
