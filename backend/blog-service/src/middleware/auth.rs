//! Token authentication.
//!
//! [`Authentication`] runs on every request. A valid HS256 token (bearer
//! header or `auth_token` cookie) attaches an [`AuthUser`] to the request
//! extensions; anything else leaves the request anonymous. Handlers opt into
//! protection by extracting [`CurrentUser`], which turns an anonymous request
//! into a login redirect.

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, FromRequest, HttpMessage, HttpRequest,
};
use chrono::Utc;
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::AppError;
use crate::models::User;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    pub exp: i64,
    pub iat: i64,
}

/// Identity attached to an authenticated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

/// Mint a token for `user`; used by the `token` subcommand and tests
pub fn issue_token(
    secret: &str,
    user: &User,
    ttl_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        iat: now,
        exp: now + ttl_secs as i64,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

fn decode_token(key: &DecodingKey, token: &str) -> Option<AuthUser> {
    let validation = Validation::new(Algorithm::HS256);
    let data = match decode::<Claims>(token, key, &validation) {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!("JWT validation failed: {}", e);
            return None;
        }
    };

    match data.claims.sub.parse::<i64>() {
        Ok(id) => Some(AuthUser {
            id,
            username: data.claims.username,
        }),
        Err(e) => {
            tracing::warn!("Invalid user id in token: {}", e);
            None
        }
    }
}

fn request_token(req: &ServiceRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());

    bearer.or_else(|| req.cookie(AUTH_COOKIE).map(|c| c.value().to_string()))
}

/// Optional authentication middleware
#[derive(Clone)]
pub struct Authentication {
    key: Arc<DecodingKey>,
}

impl Authentication {
    pub fn new(secret: &str) -> Self {
        Self {
            key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthenticationService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticationService {
            service: Rc::new(service),
            key: self.key.clone(),
        }))
    }
}

pub struct AuthenticationService<S> {
    service: Rc<S>,
    key: Arc<DecodingKey>,
}

impl<S, B> Service<ServiceRequest> for AuthenticationService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let key = self.key.clone();

        Box::pin(async move {
            if let Some(user) = request_token(&req).and_then(|token| decode_token(&key, &token)) {
                req.extensions_mut().insert(user);
            }
            service.call(req).await
        })
    }
}

/// Authenticated viewer; anonymous requests are redirected to the login page
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthUser);

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(CurrentUser(user.clone())));
        }

        let login_url = req
            .app_data::<web::Data<AppState>>()
            .map(|state| state.config.auth.login_url.clone())
            .unwrap_or_else(|| "/auth/login/".to_string());
        let next = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.path().to_string());

        ready(Err(AppError::LoginRequired { login_url, next }))
    }
}

/// Viewer of a public page, possibly anonymous
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<AuthUser>);

impl Viewer {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|user| user.id)
    }
}

impl FromRequest for Viewer {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(Viewer(req.extensions().get::<AuthUser>().cloned())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test as actix_test, App, HttpResponse};

    const SECRET: &str = "test-secret";

    fn user() -> User {
        User {
            id: 7,
            username: "leo".into(),
            created_at: Utc::now(),
        }
    }

    async fn whoami(viewer: Viewer) -> HttpResponse {
        match viewer.0 {
            Some(user) => HttpResponse::Ok().body(user.username),
            None => HttpResponse::Ok().body("anonymous"),
        }
    }

    #[test]
    fn issued_tokens_decode_to_the_same_user() {
        let token = issue_token(SECRET, &user(), 60).unwrap();
        let key = DecodingKey::from_secret(SECRET.as_bytes());
        assert_eq!(
            decode_token(&key, &token),
            Some(AuthUser {
                id: 7,
                username: "leo".into()
            })
        );

        let wrong = DecodingKey::from_secret(b"other");
        assert!(decode_token(&wrong, &token).is_none());
    }

    #[actix_web::test]
    async fn middleware_reads_bearer_and_cookie() {
        let app = actix_test::init_service(
            App::new()
                .wrap(Authentication::new(SECRET))
                .route("/", web::get().to(whoami)),
        )
        .await;
        let token = issue_token(SECRET, &user(), 60).unwrap();

        let req = actix_test::TestRequest::get()
            .uri("/")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        assert_eq!(actix_test::call_and_read_body(&app, req).await, "leo");

        let req = actix_test::TestRequest::get()
            .uri("/")
            .cookie(actix_web::cookie::Cookie::new(AUTH_COOKIE, token))
            .to_request();
        assert_eq!(actix_test::call_and_read_body(&app, req).await, "leo");

        let req = actix_test::TestRequest::get()
            .uri("/")
            .insert_header((header::AUTHORIZATION, "Bearer garbage"))
            .to_request();
        assert_eq!(actix_test::call_and_read_body(&app, req).await, "anonymous");
    }
}
