use axum_extra::extract::cookie::{Cookie, CookieJar};

use super::tokens::TokenPair;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

fn token_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .build()
}

pub fn with_tokens(jar: CookieJar, tokens: &TokenPair, secure: bool) -> CookieJar {
    jar.add(token_cookie(ACCESS_TOKEN_COOKIE, tokens.access_token.clone(), secure))
        .add(token_cookie(REFRESH_TOKEN_COOKIE, tokens.refresh_token.clone(), secure))
}

/// Emits expired cookies even when the request did not carry them.
pub fn without_tokens(jar: CookieJar, secure: bool) -> CookieJar {
    let mut access = token_cookie(ACCESS_TOKEN_COOKIE, String::new(), secure);
    access.make_removal();
    let mut refresh = token_cookie(REFRESH_TOKEN_COOKIE, String::new(), secure);
    refresh.make_removal();
    jar.add(access).add(refresh)
}

/// Value of a cookie, ignoring empty ones left behind by a cleared session.
pub fn read(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
