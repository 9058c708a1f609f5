//! The functions advertised to agents.

use super::protocol::{Capabilities, FunctionParameter, FunctionSpec, PROTOCOL_VERSION, PROVIDER};
use crate::facade::DEFAULT_SPORT;

fn required(name: &'static str, description: &'static str) -> FunctionParameter {
    FunctionParameter {
        name,
        param_type: "string",
        description,
        required: true,
        default: None,
    }
}

fn optional(
    name: &'static str,
    description: &'static str,
    default: &'static str,
) -> FunctionParameter {
    FunctionParameter {
        name,
        param_type: "string",
        description,
        required: false,
        default: Some(default),
    }
}

/// Every function `invoke` accepts, in advertised order.
pub fn catalogue() -> Vec<FunctionSpec> {
    vec![
        FunctionSpec {
            name: "get_user",
            description: "Get information about a Sleeper user by username or user ID",
            parameters: vec![required(
                "identifier",
                "Username or user_id of the user to look up",
            )],
        },
        FunctionSpec {
            name: "get_user_leagues",
            description: "Get all leagues for a specific user in a given season",
            parameters: vec![
                required("user_id", "User ID to look up leagues for"),
                required("season", "Season year (e.g., '2023')"),
                optional("sport", "Sport type", DEFAULT_SPORT),
            ],
        },
        FunctionSpec {
            name: "get_league",
            description: "Get detailed information about a specific league",
            parameters: vec![required("league_id", "League ID to look up")],
        },
        FunctionSpec {
            name: "get_league_rosters",
            description: "Get all rosters in a specific league",
            parameters: vec![required("league_id", "League ID to look up rosters for")],
        },
        FunctionSpec {
            name: "get_league_users",
            description: "Get all users in a specific league",
            parameters: vec![required("league_id", "League ID to look up users for")],
        },
        FunctionSpec {
            name: "get_nfl_state",
            description: "Get current NFL season state information",
            parameters: vec![],
        },
    ]
}

pub fn capabilities() -> Capabilities {
    Capabilities {
        functions: catalogue(),
        version: PROTOCOL_VERSION,
        provider: PROVIDER,
    }
}
