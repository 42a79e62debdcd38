use serde::Serialize;
use serde_json::Value;

use crate::gateway::error::{internal_error, GatewayResult};
use crate::gateway::{Filter, GatewayErrorCode, RemoteGateway, SelectQuery};

/// Flips the like row `like` in `table`: deletes it when present, inserts it
/// when absent. Every serialized field of `like` is part of the key. Returns
/// whether a like row exists afterwards.
pub(crate) async fn toggle_like_row<L: Serialize>(
    gateway: &dyn RemoteGateway,
    table: &str,
    like: &L,
) -> GatewayResult<bool> {
    let values = match serde_json::to_value(like) {
        Ok(Value::Object(values)) => values,
        Ok(other) => return Err(internal_error(format!("like row is not an object: {other}"))),
        Err(err) => return Err(internal_error(format!("could not encode like row: {err}"))),
    };
    let key: Vec<Filter> = values
        .iter()
        .map(|(column, value)| Filter::eq(column.as_str(), value.clone()))
        .collect();
    let columns: Vec<&str> = values.keys().map(String::as_str).collect();
    let mut lookup = SelectQuery::from(table).columns(&columns);
    for filter in &key {
        lookup = lookup.filter(filter.clone());
    }

    if gateway.maybe_single(&lookup).await?.is_some() {
        gateway.delete(table, &key).await?;
        return Ok(false);
    }

    match gateway.insert(table, values, &[]).await {
        Ok(_) => Ok(true),
        // Another client of the same viewer liked first; the row exists either way.
        Err(err) if err.code == GatewayErrorCode::Conflict => Ok(true),
        Err(err) => Err(err),
    }
}
