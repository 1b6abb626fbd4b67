//! Claims challenges.
//!
//! A server asking for stronger credentials answers `401 Unauthorized` with
//! a `WWW-Authenticate: Bearer ..., claims="<token>"` challenge. The call is
//! then replayed once, with the claims handed to the authentication
//! provider.

use crate::{AuthContext, RequestInformation, Response};

/// Claims carried by a logical call.
///
/// A call starts [`ClaimsState::Absent`] and becomes
/// [`ClaimsState::Populated`] at most once, when a claims challenge is
/// honoured. A populated call is never retried again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ClaimsState {
    /// No challenge answered yet.
    #[default]
    Absent,
    /// Claims of the challenge being answered.
    Populated(String),
}

impl ClaimsState {
    /// Claims, if populated.
    #[must_use]
    pub fn claims(&self) -> Option<&str> {
        match self {
            Self::Absent => None,
            Self::Populated(claims) => Some(claims),
        }
    }

    /// Returns `true` if no challenge was answered yet.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Authentication context for an attempt in this state.
    #[must_use]
    pub fn auth_context(&self) -> AuthContext {
        self.claims().map(AuthContext::with_claims).unwrap_or_default()
    }
}

/// Claims to retry with, if the response is a claims challenge the call may answer.
///
/// The call may answer when the response is a 401, no challenge was
/// answered yet, and the request content (if any) can be sent again.
#[must_use]
pub fn claims_from_response<B>(
    response: &Response<B>,
    request: &RequestInformation,
    state: &ClaimsState,
) -> Option<String> {
    if response.status() != 401 || !state.is_absent() || !request.is_replayable() {
        return None;
    }
    parse_claims_challenge(response.authenticate_challenges())
}

/// Extracts the claims of the first `Bearer` challenge.
///
/// # Example
///
/// ```
/// use grapnel_core::parse_claims_challenge;
///
/// let challenges = [
///     r#"Basic realm="legacy""#,
///     r#"Bearer authorization_uri="https://login.example.com", error="insufficient_claims", claims="eyJhY2Nlc3MiOnt9fQ==""#,
/// ];
/// assert_eq!(
///     parse_claims_challenge(challenges).as_deref(),
///     Some("eyJhY2Nlc3MiOnt9fQ==")
/// );
/// ```
#[must_use]
pub fn parse_claims_challenge<'a>(challenges: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let parameters = challenges.into_iter().find_map(bearer_parameters)?;
    parameters.split(',').find_map(claims_parameter)
}

/// Parameters of a `Bearer` challenge: the text after `Bearer` and whitespace.
fn bearer_parameters(challenge: &str) -> Option<&str> {
    let scheme = challenge.get(..6)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let rest = challenge.get(6..)?;
    let mut chars = rest.chars();
    chars.next().filter(|c| c.is_whitespace())?;
    Some(chars.as_str())
}

/// Token of a `claims="<token>"` parameter.
fn claims_parameter(parameter: &str) -> Option<String> {
    let parameter = parameter.trim_start();
    let key = parameter.get(..7)?;
    if !key.eq_ignore_ascii_case("claims=") {
        return None;
    }
    let token = parameter
        .get(7..)?
        .strip_prefix('"')?
        .strip_suffix('"')?;
    (!token.is_empty() && !token.contains('"')).then(|| token.to_string())
}
