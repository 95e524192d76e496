use std::sync::Arc;

use carpool_core::bookings::BookingService;
use carpool_core::events::{EventSink, FanoutSink};
use carpool_core::matching::MatchConfig;
use carpool_core::notifications::NotificationService;
use carpool_core::repository::{CarRepository, Repositories, UserRepository};
use carpool_core::rides::RideService;
use carpool_store::app_config::RateLimitConfig;
use carpool_store::RedisClient;

use crate::metrics::ApiMetrics;
use crate::realtime::RealtimeHub;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingService>,
    pub rides: Arc<RideService>,
    pub notifications: Arc<NotificationService>,
    pub users: Arc<dyn UserRepository>,
    pub cars: Arc<dyn CarRepository>,
    pub realtime: RealtimeHub,
    pub redis: Option<Arc<RedisClient>>,
    pub metrics: Arc<ApiMetrics>,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
}

impl AppState {
    /// Wires the services over `repos`. Booking events go to the SSE hub
    /// and to every sink in `extra_sinks` (Kafka in production).
    pub fn new(
        repos: &Repositories,
        extra_sinks: Vec<Arc<dyn EventSink>>,
        matching: MatchConfig,
        auth: AuthConfig,
    ) -> anyhow::Result<Self> {
        let realtime = RealtimeHub::new(256);
        let sink = extra_sinks
            .into_iter()
            .fold(FanoutSink::new().with(Arc::new(realtime.clone())), FanoutSink::with);

        Ok(Self {
            bookings: Arc::new(BookingService::new(repos, Arc::new(sink))),
            rides: Arc::new(RideService::new(repos, matching)),
            notifications: Arc::new(NotificationService::new(repos)),
            users: repos.users.clone(),
            cars: repos.cars.clone(),
            realtime,
            redis: None,
            metrics: Arc::new(ApiMetrics::new()?),
            auth,
            rate_limit: RateLimitConfig::default(),
        })
    }

    pub fn with_rate_limit(mut self, redis: Arc<RedisClient>, rate_limit: RateLimitConfig) -> Self {
        self.redis = Some(redis);
        self.rate_limit = rate_limit;
        self
    }
}
