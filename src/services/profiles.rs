//! Delivery profile reads and upserts.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::domain::profile::{Profile, ProfileInput};
use crate::domain::value_objects::UserId;
use crate::store::AccountStore;
use crate::Result;

#[derive(Clone)]
pub struct ProfileService {
    accounts: Arc<dyn AccountStore>,
}

impl ProfileService {
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self { Self { accounts } }

    pub async fn profile(&self, user: UserId) -> Result<Option<Profile>> {
        Ok(self.accounts.profile(user).await?)
    }

    pub async fn save(&self, user: UserId, input: ProfileInput) -> Result<Profile> {
        let profile = input.into_profile(user, Utc::now())?;
        let saved = self.accounts.upsert_profile(&profile).await?;
        info!(user_id = %user, complete = saved.is_complete(), "profile saved");
        Ok(saved)
    }
}
