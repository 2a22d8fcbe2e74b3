//! Connection parameters captured during the upgrade handshake.

/// What a client declared while opening its connection.
///
/// Both fields are optional: a client without a token is an anonymous
/// viewer, a client without a game id only receives untargeted
/// broadcasts. Values are kept as raw strings; interpreting them is the
/// caller's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectParams {
    /// Bearer token from the `token` query parameter or the
    /// `Authorization: Bearer ...` header.
    pub token: Option<String>,
    /// The `game_id` query parameter.
    pub game_id: Option<String>,
}

impl ConnectParams {
    /// Builds params from a request's raw query string and `Authorization`
    /// header value.
    ///
    /// Query values are percent-decoded. The `token` query parameter wins
    /// over the header; empty values count as absent.
    pub fn from_parts(query: Option<&str>, authorization: Option<&str>) -> Self {
        let mut params = Self::default();

        // Percent-decoded pairs; the first non-empty value of a key wins.
        let pairs: Vec<(String, String)> = query
            .map(serde_urlencoded::from_str::<Vec<(String, String)>>)
            .transpose()
            .unwrap_or_else(|e| {
                tracing::debug!(error = %e, "unparseable query string ignored");
                None
            })
            .unwrap_or_default();
        for (key, value) in pairs {
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_str() {
                "token" => &mut params.token,
                "game_id" => &mut params.game_id,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        if params.token.is_none() {
            params.token = authorization
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string);
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_reads_query_parameters() {
        let params = ConnectParams::from_parts(Some("game_id=7&token=abc"), None);
        assert_eq!(params.game_id.as_deref(), Some("7"));
        assert_eq!(params.token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_from_parts_falls_back_to_bearer_header() {
        let params = ConnectParams::from_parts(Some("game_id=3"), Some("Bearer tok"));
        assert_eq!(params.token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_from_parts_query_token_wins_over_header() {
        let params = ConnectParams::from_parts(Some("token=q"), Some("Bearer h"));
        assert_eq!(params.token.as_deref(), Some("q"));
    }

    #[test]
    fn test_from_parts_empty_values_are_absent() {
        let params = ConnectParams::from_parts(Some("game_id=&token="), Some("Basic xyz"));
        assert_eq!(params, ConnectParams::default());
    }

    #[test]
    fn test_from_parts_percent_decodes_values() {
        let params = ConnectParams::from_parts(Some("game_id=%37&token=a%2Bb%3D"), None);
        assert_eq!(params.game_id.as_deref(), Some("7"));
        assert_eq!(params.token.as_deref(), Some("a+b="));
    }

    #[test]
    fn test_from_parts_first_value_of_repeated_key_wins() {
        let params = ConnectParams::from_parts(Some("game_id=&game_id=2&game_id=3"), None);
        assert_eq!(params.game_id.as_deref(), Some("2"));
    }

    #[test]
    fn test_from_parts_no_query_is_anonymous_lobby_viewer() {
        let params = ConnectParams::from_parts(None, None);
        assert!(params.token.is_none());
        assert!(params.game_id.is_none());
    }
}
