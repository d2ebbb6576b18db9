//! Operator endpoints for the push side.

mod push;
mod queue;

use salvo::Router;

use super::ADMIN_ROUTE_COMPONENT;

#[must_use]
pub fn routes() -> Router {
    Router::with_path(ADMIN_ROUTE_COMPONENT)
        .push(Router::with_path("push").post(push::push_accounts))
        .push(Router::with_path("queue/{provider}").get(queue::queue_snapshot))
}
