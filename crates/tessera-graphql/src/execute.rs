//! Request execution against a converted schema.
//!
//! Each request carries one [`RequestContext`]. Every bridged resolver reads
//! it back from the request data, so plugin data created for the request is
//! shared by all fields the request resolves.

use async_graphql::dynamic::Schema;
use async_graphql::{Request, Response};
use futures_util::stream::{BoxStream, StreamExt};
use tracing::debug;

use tessera_core::RequestContext;

/// Executes a query or mutation with `context` attached.
pub async fn execute(
    schema: &Schema,
    request: impl Into<Request>,
    context: RequestContext,
) -> Response {
    let request_id = context.id();
    debug!(request_id = %request_id, "Executing GraphQL request");
    let response = schema.execute(request.into().data(context)).await;
    if response.is_err() {
        debug!(
            request_id = %request_id,
            errors = response.errors.len(),
            "GraphQL request completed with errors"
        );
    }
    response
}

/// Starts a subscription with `context` attached. One response is emitted
/// per event.
pub fn subscribe(
    schema: &Schema,
    request: impl Into<Request>,
    context: RequestContext,
) -> BoxStream<'static, Response> {
    debug!(request_id = %context.id(), "Starting GraphQL subscription");
    schema.execute_stream(request.into().data(context)).boxed()
}
