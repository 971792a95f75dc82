use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use validator::Validate;

use crate::auth::password::generate_api_key;
use crate::auth::{
    authorize, authorize_trainer_login, authorize_user_list, AuthResponse, AuthService,
    CurrentUser, Principal, UserAction, LOGIN_URL,
};
use crate::errors::{ApiError, ApiResult, MessageResponse};
use crate::models::{
    ApiToken, PersonalInformationRequest, PreferencesRequest, UpdatePersonalInformation, User,
    UserProfile, UserSummary, WeightEntry,
};
use crate::store::GymStore;

/// Number of weight entries shown on a member overview
const OVERVIEW_WEIGHT_ENTRIES: i64 = 5;

pub fn user_overview_url(user_id: i64) -> String {
    format!("/api/user/{user_id}/overview")
}

pub fn gym_user_list_url(gym_id: Option<i64>) -> String {
    match gym_id {
        Some(gym_id) => format!("/gym/{gym_id}/user-list"),
        None => "/api/user/list".to_string(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserOverview {
    pub user: User,
    pub profile: UserProfile,
    pub weight_entries: Vec<WeightEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserList {
    pub active_members: Vec<UserSummary>,
    pub inactive_members: Vec<UserSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonalInformation {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for PersonalInformation {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PreferencesView {
    pub personal_information: PersonalInformation,
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    #[serde(flatten)]
    pub message: MessageResponse,
    /// The caller deleted their own account and is logged out
    pub session_ended: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainerLoginOutcome {
    #[serde(flatten)]
    pub auth: AuthResponse,
    pub redirect_to: String,
}

/// Account administration for members and gym staff
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn GymStore>,
    auth: AuthService,
}

impl UserService {
    pub fn new(store: Arc<dyn GymStore>, auth: AuthService) -> Self {
        Self { store, auth }
    }

    async fn load_user(&self, user_id: i64) -> ApiResult<(User, UserProfile)> {
        let user = self.store.get_user(user_id).await?.ok_or(ApiError::NotFound)?;
        let profile = self.store.get_profile(user_id).await?.ok_or(ApiError::NotFound)?;
        Ok((user, profile))
    }

    async fn load_authorized(
        &self,
        actor: &CurrentUser,
        target_id: i64,
        action: UserAction,
    ) -> ApiResult<(User, UserProfile)> {
        let (user, profile) = self.load_user(target_id).await?;

        let decision = authorize(
            Some(&Principal::new(&actor.user, actor.gym_id())),
            &Principal::new(&user, profile.gym_id),
            action,
        );
        ApiError::from_decision(decision)?;

        Ok((user, profile))
    }

    /// Set `is_active` on another user; repeating the call changes nothing
    pub async fn set_active(
        &self,
        actor: &CurrentUser,
        target_id: i64,
        is_active: bool,
    ) -> ApiResult<MessageResponse> {
        let action = if is_active {
            UserAction::Activate
        } else {
            UserAction::Deactivate
        };
        let (user, _) = self.load_authorized(actor, target_id, action).await?;

        if user.is_active != is_active {
            self.store.set_user_active(user.id, is_active).await?;
            info!(actor = actor.id(), target = user.id, is_active, "changed account state");
        }

        let message = if is_active {
            format!("The user {} was activated", user.username)
        } else {
            format!("The user {} was deactivated", user.username)
        };

        Ok(MessageResponse::success(message).redirect_to(user_overview_url(user.id)))
    }

    /// Current personal information, as shown on the edit form
    pub async fn edit_form(&self, actor: &CurrentUser, target_id: i64) -> ApiResult<PersonalInformation> {
        let (user, _) = self.load_authorized(actor, target_id, UserAction::Edit).await?;
        Ok(PersonalInformation::from(&user))
    }

    pub async fn edit(
        &self,
        actor: &CurrentUser,
        target_id: i64,
        request: PersonalInformationRequest,
    ) -> ApiResult<MessageResponse> {
        let (user, _) = self.load_authorized(actor, target_id, UserAction::Edit).await?;

        request.validate()?;
        let update = request.to_update();
        self.ensure_email_available(&update, user.id).await?;

        self.store.update_personal_information(user.id, &update).await?;
        info!(actor = actor.id(), target = user.id, "edited personal information");

        Ok(MessageResponse::success("Personal information updated")
            .redirect_to(user_overview_url(user.id)))
    }

    pub async fn overview(&self, actor: &CurrentUser, target_id: i64) -> ApiResult<UserOverview> {
        let (user, profile) = self.load_authorized(actor, target_id, UserAction::View).await?;
        let weight_entries = self
            .store
            .recent_weight_entries(user.id, OVERVIEW_WEIGHT_ENTRIES)
            .await?;

        Ok(UserOverview {
            user,
            profile,
            weight_entries,
        })
    }

    pub async fn list(&self, actor: &CurrentUser) -> ApiResult<UserList> {
        ApiError::from_decision(authorize_user_list(Some(&actor.user)))?;

        Ok(UserList {
            active_members: self.store.list_users(true).await?,
            inactive_members: self.store.list_users(false).await?,
        })
    }

    /// Delete `target_id`, or the caller's own account when it is `None`.
    ///
    /// The acting user always confirms with their own password.
    pub async fn delete(
        &self,
        actor: &CurrentUser,
        target_id: Option<i64>,
        password: &str,
    ) -> ApiResult<DeleteOutcome> {
        let target = match target_id {
            Some(id) if id != actor.id() => {
                Some(self.load_authorized(actor, id, UserAction::Delete).await?.0)
            }
            _ => None,
        };

        if !self.auth.check_password(&actor.user, password)? {
            return Err(ApiError::field("password", "Invalid password"));
        }

        match target {
            Some(user) => {
                self.store.delete_user(user.id).await?;
                info!(actor = actor.id(), target = user.id, "deleted account");

                Ok(DeleteOutcome {
                    message: MessageResponse::success(format!(
                        "Account \"{}\" was successfully deleted",
                        user.username
                    ))
                    .redirect_to(gym_user_list_url(actor.gym_id())),
                    session_ended: false,
                })
            }
            None => {
                self.auth.revoke(&actor.session).await?;
                self.store.delete_user(actor.id()).await?;
                info!(user_id = actor.id(), "deleted own account");

                Ok(DeleteOutcome {
                    message: MessageResponse::success(format!(
                        "Account \"{}\" was successfully deleted",
                        actor.user.username
                    ))
                    .redirect_to("/"),
                    session_ended: true,
                })
            }
        }
    }

    pub async fn preferences(&self, actor: &CurrentUser) -> ApiResult<PreferencesView> {
        let (user, profile) = self.load_user(actor.id()).await?;

        Ok(PreferencesView {
            personal_information: PersonalInformation::from(&user),
            profile,
        })
    }

    /// Save preferences and personal information together; nothing is
    /// written unless both validate
    pub async fn update_preferences(
        &self,
        actor: &CurrentUser,
        request: PreferencesRequest,
    ) -> ApiResult<MessageResponse> {
        request.validate()?;
        let personal = request.personal_information();
        self.ensure_email_available(&personal, actor.id()).await?;

        let (_, mut profile) = self.load_user(actor.id()).await?;
        profile.apply_preferences(&request.preferences());

        self.store.update_profile(&profile).await?;
        self.store.update_personal_information(actor.id(), &personal).await?;

        Ok(MessageResponse::success("Settings successfully updated").redirect_to("/api/user/preferences"))
    }

    /// Apply preference changes to the caller's profile and return it
    pub async fn update_own_profile(
        &self,
        actor: &CurrentUser,
        request: PreferencesRequest,
    ) -> ApiResult<UserProfile> {
        request.validate()?;

        let (_, mut profile) = self.load_user(actor.id()).await?;
        profile.apply_preferences(&request.preferences());
        self.store.update_profile(&profile).await?;

        Ok(profile)
    }

    pub async fn api_key(&self, actor: &CurrentUser) -> ApiResult<Option<ApiToken>> {
        Ok(self.store.get_api_token(actor.id()).await?)
    }

    /// Replace the caller's API key with a fresh one
    pub async fn regenerate_api_key(&self, actor: &CurrentUser) -> ApiResult<ApiToken> {
        let token = self
            .store
            .replace_api_token(actor.id(), &generate_api_key())
            .await?;
        info!(user_id = actor.id(), "generated new API key");
        Ok(token)
    }

    /// End the session; guest accounts are removed entirely
    pub async fn logout(&self, actor: &CurrentUser) -> ApiResult<MessageResponse> {
        self.auth.revoke(&actor.session).await?;

        if actor.profile.is_temporary {
            self.store.delete_user(actor.id()).await?;
            info!(user_id = actor.id(), "removed temporary user on logout");
        }

        Ok(MessageResponse::success("You have been logged out").redirect_to(LOGIN_URL))
    }

    /// Switch into a member's account, or back to the original trainer
    pub async fn trainer_login(&self, actor: &CurrentUser, target_id: i64) -> ApiResult<TrainerLoginOutcome> {
        let (user, profile) = self.load_user(target_id).await?;

        let decision = authorize_trainer_login(
            Some(&Principal::new(&actor.user, actor.gym_id())),
            &Principal::new(&user, profile.gym_id),
            actor.session.trainer_identity,
        );
        ApiError::from_decision(decision)?;

        let switching_back = actor.session.trainer_identity == Some(user.id);
        let trainer_identity = if switching_back { None } else { Some(actor.id()) };

        let auth = self.auth.issue_token(&user, trainer_identity).await?;
        self.auth.revoke(&actor.session).await?;

        info!(actor = actor.id(), target = user.id, switching_back, "trainer login");

        let redirect_to = if switching_back {
            gym_user_list_url(profile.gym_id)
        } else {
            "/".to_string()
        };

        Ok(TrainerLoginOutcome { auth, redirect_to })
    }

    async fn ensure_email_available(&self, update: &UpdatePersonalInformation, user_id: i64) -> ApiResult<()> {
        if let Some(email) = update.email.as_deref().filter(|e| !e.is_empty()) {
            if self.store.email_in_use(email, Some(user_id)).await? {
                return Err(ApiError::field("email", "This email is already used"));
            }
        }
        Ok(())
    }
}
