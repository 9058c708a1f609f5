//! Context protocol for agents.
//!
//! Agents discover the available functions through [`capabilities`] and call
//! them through [`invoke`]. Every outcome, including bad requests, is reported
//! in an [`InvocationResponse`] envelope rather than as a transport error.

mod functions;
mod protocol;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

pub use functions::{capabilities, catalogue};
pub use protocol::{
    Capabilities, ErrorDetail, FunctionParameter, FunctionSpec, Invocation, InvocationResponse,
    InvocationStatus, PROTOCOL_VERSION, PROVIDER,
};

use crate::facade::{CachedSleeperClient, DEFAULT_SPORT};
use crate::limiter::Throttle;
use crate::sleeper::{SleeperError, Upstream, UpstreamError, User, ValidationError};

/// Dispatch an invocation to the matching Sleeper operation.
pub async fn invoke<U, L>(
    client: &CachedSleeperClient<U, L>,
    invocation: &Invocation,
) -> InvocationResponse
where
    U: Upstream,
    L: Throttle,
{
    let name = invocation.function_name.as_str();
    debug!(function = name, "invoking function");

    match dispatch(client, name, &invocation.parameters).await {
        Ok(result) => InvocationResponse::success(result),
        Err(e) => {
            warn!(function = name, error = %e, "function invocation failed");
            InvocationResponse::error(&e)
        }
    }
}

async fn dispatch<U, L>(
    client: &CachedSleeperClient<U, L>,
    name: &str,
    parameters: &Map<String, Value>,
) -> Result<Value, SleeperError>
where
    U: Upstream,
    L: Throttle,
{
    let params = Params(parameters);

    match name {
        "get_user" => {
            let user = client.get_user(&params.required("identifier")?).await?;
            user_json(&user)
        }
        "get_user_leagues" => {
            let user_id = params.required("user_id")?;
            let season = params.required("season")?;
            let sport = params.optional("sport")?;
            let leagues = client
                .get_user_leagues_for_sport(
                    &user_id,
                    sport.as_deref().unwrap_or(DEFAULT_SPORT),
                    &season,
                )
                .await?;
            to_json(&leagues)
        }
        "get_league" => to_json(&client.get_league(&params.required("league_id")?).await?),
        "get_league_rosters" => to_json(
            &client
                .get_league_rosters(&params.required("league_id")?)
                .await?,
        ),
        "get_league_users" => {
            let users = client
                .get_league_users(&params.required("league_id")?)
                .await?;
            users
                .iter()
                .map(user_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "get_nfl_state" => to_json(&client.get_nfl_state().await?),
        other => Err(ValidationError::new(
            "function_name",
            format!("unknown function {other:?}"),
        )
        .into()),
    }
}

/// Invocation parameters, looked up by name.
struct Params<'a>(&'a Map<String, Value>);

impl Params<'_> {
    fn required(&self, name: &'static str) -> Result<String, ValidationError> {
        self.optional(name)?
            .ok_or_else(|| ValidationError::new(name, "is required"))
    }

    /// Strings are taken as-is; agents often send ids and seasons as numbers.
    fn optional(&self, name: &'static str) -> Result<Option<String>, ValidationError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(ValidationError::new(name, "must be a string")),
        }
    }
}

fn to_json<T: Serialize>(record: &T) -> Result<Value, SleeperError> {
    serde_json::to_value(record)
        .map_err(|e| UpstreamError::parse(format!("could not encode result: {e}"), "").into())
}

/// A user record with its avatar URLs filled in.
fn user_json(user: &User) -> Result<Value, SleeperError> {
    let mut value = to_json(user)?;
    if let Value::Object(map) = &mut value {
        if let Some(url) = user.avatar_url() {
            map.insert("avatar_url".to_string(), Value::String(url));
        }
        if let Some(url) = user.avatar_thumbnail_url() {
            map.insert("avatar_thumbnail_url".to_string(), Value::String(url));
        }
    }
    Ok(value)
}
