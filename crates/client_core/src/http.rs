//! Bearer-token HTTP implementation of the backend collaborators.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use shared::{
    domain::{Difficulty, LessonId, UnitId, UserId},
    error::{ApiException, ErrorBody, ErrorCode},
    protocol::{
        AuthSession, AuthUser, ChallengeCompletion, DailyChallenge, HeartPackage,
        HeartPurchaseReceipt, HeartRefresh, LessonDetail, LoginRequest, PracticeLevels,
        PracticeReceipt, PracticeReport, PracticeWallet, ProgressReceipt, ProgressSnapshot,
        ProgressUpdate, SignSummary, SignupRequest, UnitProgress, UnitSummary, UnlockStatus,
        UserStatus,
    },
};
use tokio::sync::Mutex;
use tracing::info;
use url::Url;

use crate::{AccountGateway, ChallengeGateway, LessonCatalog, PracticeGateway, ProgressStore};

#[derive(Clone)]
struct AuthState {
    access_token: String,
    user_id: UserId,
}

/// One authenticated client for the whole backend surface. `login`
/// populates the bearer token; every other call requires it.
pub struct HttpApi {
    http: Client,
    base_url: Url,
    auth: Mutex<Option<AuthState>>,
}

#[derive(Serialize)]
struct HeartPurchaseRequest {
    user_id: String,
    package_id: i64,
}

/// Turn a non-2xx response into an [`ApiException`] carrying the
/// backend's `detail` message.
async fn checked(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let code = ErrorCode::from_status(status.as_u16());
    let detail = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.detail)
        .unwrap_or_else(|| status.to_string());
    Err(ApiException::new(code, detail).into())
}

impl HttpApi {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("invalid backend url: {base_url}"))?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            auth: Mutex::new(None),
        })
    }

    /// Resume a previously issued bearer token without logging in again.
    pub fn with_credentials(base_url: &str, access_token: &str, user_id: UserId) -> Result<Self> {
        let mut api = Self::new(base_url)?;
        api.auth = Mutex::new(Some(AuthState {
            access_token: access_token.to_string(),
            user_id,
        }));
        Ok(api)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let response = self
            .http
            .post(self.endpoint("auth/login"))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let session: AuthSession = checked(response).await?.json().await?;

        {
            let mut guard = self.auth.lock().await;
            *guard = Some(AuthState {
                access_token: session.access_token.clone(),
                user_id: session.user.id,
            });
        }
        info!(user_id = session.user.id.0, "logged in");
        Ok(session)
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<AuthUser> {
        let response = self
            .http
            .post(self.endpoint("auth/signup"))
            .json(&request)
            .send()
            .await?;
        let user = checked(response).await?.json().await?;
        Ok(user)
    }

    pub async fn logout(&self) {
        let mut guard = self.auth.lock().await;
        *guard = None;
    }

    pub async fn user_id(&self) -> Option<UserId> {
        self.auth.lock().await.as_ref().map(|auth| auth.user_id)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}api/{path}", self.base_url)
    }

    async fn session(&self) -> Result<(String, UserId)> {
        let guard = self.auth.lock().await;
        let auth = guard
            .as_ref()
            .ok_or_else(|| anyhow!("not logged in: missing access token"))?;
        Ok((auth.access_token.clone(), auth.user_id))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (token, _) = self.session().await?;
        let response = self
            .http
            .get(self.endpoint(path))
            .bearer_auth(token)
            .send()
            .await?;
        let value = checked(response).await?.json().await?;
        Ok(value)
    }

    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let (token, _) = self.session().await?;
        let response = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        let value = checked(response).await?.json().await?;
        Ok(value)
    }

    async fn post_empty<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (token, _) = self.session().await?;
        let response = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(token)
            .send()
            .await?;
        let value = checked(response).await?.json().await?;
        Ok(value)
    }
}

#[async_trait]
impl LessonCatalog for HttpApi {
    async fn fetch_lesson(&self, lesson_id: LessonId) -> Result<LessonDetail> {
        self.get_json(&format!("lessons/{}", lesson_id.0)).await
    }

    async fn list_units(&self) -> Result<Vec<UnitSummary>> {
        self.get_json("lessons/units/").await
    }

    async fn unit_status(&self, unit_id: UnitId) -> Result<UnlockStatus> {
        let (_, user_id) = self.session().await?;
        self.get_json(&format!("lessons/unit-status/{}/{}", user_id.0, unit_id.0))
            .await
    }

    async fn lesson_status(&self, lesson_id: LessonId) -> Result<UnlockStatus> {
        let (_, user_id) = self.session().await?;
        self.get_json(&format!(
            "lessons/lesson-status/{}/{}",
            user_id.0, lesson_id.0
        ))
        .await
    }

    async fn unit_progress(&self, unit_id: UnitId) -> Result<UnitProgress> {
        let (_, user_id) = self.session().await?;
        self.get_json(&format!(
            "lessons/unit-progress/{}/{}",
            user_id.0, unit_id.0
        ))
        .await
    }
}

#[async_trait]
impl ProgressStore for HttpApi {
    async fn fetch_progress(&self, lesson_id: LessonId) -> Result<ProgressSnapshot> {
        let (_, user_id) = self.session().await?;
        self.get_json(&format!(
            "lessons/lesson-progress/{}/{}",
            user_id.0, lesson_id.0
        ))
        .await
    }

    async fn persist_progress(
        &self,
        lesson_id: LessonId,
        update: ProgressUpdate,
    ) -> Result<ProgressReceipt> {
        let (token, user_id) = self.session().await?;
        let response = self
            .http
            .patch(self.endpoint(&format!(
                "lessons/update-progress/{}/{}",
                user_id.0, lesson_id.0
            )))
            .bearer_auth(token)
            .json(&update)
            .send()
            .await?;
        let receipt = checked(response).await?.json().await?;
        Ok(receipt)
    }
}

#[async_trait]
impl AccountGateway for HttpApi {
    async fn fetch_status(&self) -> Result<UserStatus> {
        let (_, user_id) = self.session().await?;
        self.get_json(&format!("status/{}", user_id.0)).await
    }

    async fn refresh_hearts(&self) -> Result<HeartRefresh> {
        let (_, user_id) = self.session().await?;
        self.post_empty(&format!("lessons/refresh-hearts/{}", user_id.0))
            .await
    }

    async fn heart_packages(&self) -> Result<Vec<HeartPackage>> {
        self.get_json("shop/heart-packages").await
    }

    async fn purchase_hearts(&self, package_id: i64) -> Result<HeartPurchaseReceipt> {
        let (_, user_id) = self.session().await?;
        self.post_json(
            "shop/purchase-hearts",
            &HeartPurchaseRequest {
                user_id: user_id.0.to_string(),
                package_id,
            },
        )
        .await
    }
}

#[async_trait]
impl ChallengeGateway for HttpApi {
    async fn daily_challenge(&self) -> Result<DailyChallenge> {
        let (_, user_id) = self.session().await?;
        self.get_json(&format!("lessons/daily-challenges/{}", user_id.0))
            .await
    }

    async fn complete_daily_challenge(&self) -> Result<ChallengeCompletion> {
        let (_, user_id) = self.session().await?;
        self.post_empty(&format!("lessons/complete-daily-challenge/{}", user_id.0))
            .await
    }
}

#[async_trait]
impl PracticeGateway for HttpApi {
    async fn practice_signs(&self, difficulty: Difficulty) -> Result<Vec<SignSummary>> {
        let (_, user_id) = self.session().await?;
        let difficulty = match difficulty {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        };
        self.get_json(&format!("practice/signs/{}/{difficulty}", user_id.0))
            .await
    }

    async fn practice_levels(&self) -> Result<PracticeLevels> {
        let (_, user_id) = self.session().await?;
        self.get_json(&format!("practice/levels/{}", user_id.0))
            .await
    }

    async fn practice_wallet(&self) -> Result<PracticeWallet> {
        let (_, user_id) = self.session().await?;
        self.get_json(&format!("practice/hearts/{}", user_id.0))
            .await
    }

    async fn report_outcome(&self, report: PracticeReport) -> Result<PracticeReceipt> {
        let (_, user_id) = self.session().await?;
        self.post_json(&format!("practice/update-progress/{}", user_id.0), &report)
            .await
    }
}
