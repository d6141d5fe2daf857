//! # Onboarding
//!
//! New owners go through two steps after their first login: give a first
//! name, then name their restaurant. The current step is derived from the
//! user record; nothing extra is stored.

use crate::types::{PLACEHOLDER_FIRST_NAME, User};
use serde::Serialize;

/// Where a user stands in the onboarding flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    /// Step 1: the account still carries the placeholder first name.
    FirstName,
    /// Step 2: named, but no restaurant yet.
    RestaurantName,
    /// A restaurant is attached.
    Completed,
}

impl OnboardingStep {
    #[must_use]
    pub fn assess(user: &User) -> Self {
        if user.has_completed_onboarding() {
            Self::Completed
        } else if !user.first_name.is_empty() && user.first_name != PLACEHOLDER_FIRST_NAME {
            Self::RestaurantName
        } else {
            Self::FirstName
        }
    }

    /// 1-based step number shown by the onboarding page.
    #[must_use]
    pub fn number(&self) -> u8 {
        match self {
            Self::FirstName => 1,
            Self::RestaurantName => 2,
            Self::Completed => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RestaurantId;
    use chrono::Utc;

    #[test]
    fn fresh_login_starts_at_step_one() {
        let user = User::from_login("0700000000", Utc::now());
        assert_eq!(OnboardingStep::assess(&user), OnboardingStep::FirstName);
        assert_eq!(OnboardingStep::assess(&user).number(), 1);
    }

    #[test]
    fn named_user_moves_to_step_two() {
        let mut user = User::from_login("0700000000", Utc::now());
        user.first_name = "Awa".into();
        assert_eq!(OnboardingStep::assess(&user), OnboardingStep::RestaurantName);
    }

    #[test]
    fn restaurant_completes_onboarding() {
        let mut user = User::from_login("0700000000", Utc::now());
        user.restaurant_id = Some(RestaurantId::new());
        assert_eq!(OnboardingStep::assess(&user), OnboardingStep::Completed);
    }
}
