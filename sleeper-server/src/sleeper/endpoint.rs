//! The upstream endpoints the proxy republishes.

use crate::cache::CacheKey;

/// How quickly an endpoint's data goes stale, which picks its cache TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtlClass {
    /// Slow-moving reference data (the players directory).
    Reference,
    /// User identity and league membership.
    Identity,
    /// League, roster and season state that changes during games.
    Live,
}

/// A single upstream GET request, with its path parameters already validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    User { identifier: String },
    UserLeagues {
        user_id: String,
        sport: String,
        season: String,
    },
    League { league_id: String },
    LeagueRosters { league_id: String },
    LeagueUsers { league_id: String },
    NflState,
    Players { sport: String },
}

impl Endpoint {
    /// Stable endpoint name, used in cache keys and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::User { .. } => "user",
            Endpoint::UserLeagues { .. } => "user_leagues",
            Endpoint::League { .. } => "league",
            Endpoint::LeagueRosters { .. } => "league_rosters",
            Endpoint::LeagueUsers { .. } => "league_users",
            Endpoint::NflState => "nfl_state",
            Endpoint::Players { .. } => "players",
        }
    }

    /// Path segments below the API base URL. Parameters are single segments.
    pub fn segments(&self) -> Vec<&str> {
        match self {
            Endpoint::User { identifier } => vec!["user", identifier],
            Endpoint::UserLeagues {
                user_id,
                sport,
                season,
            } => vec!["user", user_id, "leagues", sport, season],
            Endpoint::League { league_id } => vec!["league", league_id],
            Endpoint::LeagueRosters { league_id } => vec!["league", league_id, "rosters"],
            Endpoint::LeagueUsers { league_id } => vec!["league", league_id, "users"],
            Endpoint::NflState => vec!["state", "nfl"],
            Endpoint::Players { sport } => vec!["players", sport],
        }
    }

    /// Path relative to the API base URL, with a leading slash.
    pub fn path(&self) -> String {
        format!("/{}", self.segments().join("/"))
    }

    /// Named parameters of the request.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Endpoint::User { identifier } => vec![("identifier", identifier.clone())],
            Endpoint::UserLeagues {
                user_id,
                sport,
                season,
            } => vec![
                ("user_id", user_id.clone()),
                ("sport", sport.clone()),
                ("season", season.clone()),
            ],
            Endpoint::League { league_id }
            | Endpoint::LeagueRosters { league_id }
            | Endpoint::LeagueUsers { league_id } => vec![("league_id", league_id.clone())],
            Endpoint::NflState => Vec::new(),
            Endpoint::Players { sport } => vec![("sport", sport.clone())],
        }
    }

    pub fn ttl_class(&self) -> TtlClass {
        match self {
            Endpoint::Players { .. } => TtlClass::Reference,
            Endpoint::User { .. } | Endpoint::UserLeagues { .. } | Endpoint::LeagueUsers { .. } => {
                TtlClass::Identity
            }
            Endpoint::League { .. } | Endpoint::LeagueRosters { .. } | Endpoint::NflState => {
                TtlClass::Live
            }
        }
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.name(), self.params())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths() {
        let user = Endpoint::User {
            identifier: "coolguy123".into(),
        };
        assert_eq!(user.path(), "/user/coolguy123");

        let leagues = Endpoint::UserLeagues {
            user_id: "12345".into(),
            sport: "nfl".into(),
            season: "2023".into(),
        };
        assert_eq!(leagues.path(), "/user/12345/leagues/nfl/2023");

        let rosters = Endpoint::LeagueRosters {
            league_id: "league1".into(),
        };
        assert_eq!(rosters.path(), "/league/league1/rosters");

        assert_eq!(Endpoint::NflState.path(), "/state/nfl");
        assert_eq!(
            Endpoint::Players {
                sport: "nfl".into()
            }
            .path(),
            "/players/nfl"
        );
    }

    #[test]
    fn parameters_are_single_segments() {
        let rosters = Endpoint::LeagueRosters {
            league_id: "a/b".into(),
        };
        assert_eq!(rosters.segments(), ["league", "a/b", "rosters"]);
    }

    #[test]
    fn ttl_classes() {
        assert_eq!(
            Endpoint::Players {
                sport: "nfl".into()
            }
            .ttl_class(),
            TtlClass::Reference
        );
        assert_eq!(
            Endpoint::User {
                identifier: "x".into()
            }
            .ttl_class(),
            TtlClass::Identity
        );
        assert_eq!(Endpoint::NflState.ttl_class(), TtlClass::Live);
    }

    #[test]
    fn distinct_endpoints_have_distinct_keys() {
        let league = Endpoint::League {
            league_id: "league1".into(),
        };
        let rosters = Endpoint::LeagueRosters {
            league_id: "league1".into(),
        };
        assert_ne!(league.cache_key(), rosters.cache_key());
        assert_eq!(
            league.cache_key(),
            Endpoint::League {
                league_id: "league1".into()
            }
            .cache_key()
        );
    }
}
