use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;

use picfeed::cache::CacheStats;
use picfeed::{Clock, SessionRegistry};

#[get("/stats")]
pub fn stats(registry: &State<SessionRegistry>) -> Json<CacheStats> {
    let context = registry.context();
    Json(context.cache.stats(context.clock.now(), context.settings.ttl))
}

#[delete("/")]
pub fn clear(registry: &State<SessionRegistry>) -> Status {
    registry.context().cache.clear();
    Status::NoContent
}
