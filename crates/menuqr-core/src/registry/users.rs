//! User accounts: login, onboarding and the admin user table.

use super::{Registry, newest_first, required};
use crate::error::{CoreError, CoreResult};
use crate::page::{Page, PageRequest, matches_any, search_term};
use crate::phone;
use crate::slug::restaurant_slug;
use crate::storage::{Batch, Store, StoreExt};
use crate::types::{Restaurant, RestaurantId, User, UserId};
use crate::views::UserRow;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::info;

/// Input of the admin "create user" form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub restaurant_id: Option<RestaurantId>,
}

impl<S: Store> Registry<S> {
    pub fn user(&self, id: UserId) -> CoreResult<Option<User>> {
        self.find(id.as_bytes())
    }

    /// Look up by phone number; `phone_number` is normalized first.
    pub fn user_by_phone(&self, phone_number: &str) -> CoreResult<Option<User>> {
        let phone_number = phone::normalize(phone_number)?;
        let users: Vec<User> = self.store.all()?;
        Ok(users.into_iter().find(|u| u.phone_number == phone_number))
    }

    /// Find the account for a login attempt, creating it on first contact.
    pub fn login_user(&self, raw_phone: &str, now: DateTime<Utc>) -> CoreResult<User> {
        let phone_number = phone::normalize(raw_phone)?;
        let _guard = self.lock_writer()?;

        if let Some(user) = self.user_by_phone(&phone_number)? {
            return Ok(user);
        }

        let user = User::from_login(&phone_number, now);
        self.save(&user)?;
        info!(phone_number = %user.phone_number, user_id = %user.id, "New user created");
        Ok(user)
    }

    pub fn mark_verified(&self, id: UserId) -> CoreResult<User> {
        let _guard = self.lock_writer()?;
        let mut user: User = self.require(id.as_bytes(), "User")?;
        if !user.is_verified {
            user.is_verified = true;
            self.save(&user)?;
        }
        Ok(user)
    }

    /// Create a verified account from the admin back-office.
    ///
    /// An unknown `restaurant_id` is ignored rather than rejected; a
    /// restaurant that already has an owner is a conflict.
    pub fn admin_create_user(&self, input: NewUser, now: DateTime<Utc>) -> CoreResult<User> {
        if input.phone_number.trim().is_empty() {
            return Err(CoreError::validation("Phone number is required"));
        }
        let phone_number = phone::normalize(&input.phone_number)?;
        let first_name = input.first_name.trim();
        let last_name = input.last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(CoreError::validation("First and last name are required"));
        }

        let _guard = self.lock_writer()?;
        if self.user_by_phone(&phone_number)?.is_some() {
            return Err(CoreError::conflict(
                "A user with this phone number already exists",
            ));
        }

        let restaurant_id = match input.restaurant_id {
            Some(id) => self.find::<Restaurant>(id.as_bytes())?.map(|r| r.id),
            None => None,
        };
        let owned = match restaurant_id {
            Some(rid) => self.owner_of(rid)?.is_some(),
            None => false,
        };
        if owned {
            return Err(CoreError::conflict("Restaurant already has an owner"));
        }

        let user = User {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            is_admin: input.is_admin,
            is_verified: true,
            restaurant_id,
            ..User::from_login(phone_number, now)
        };
        self.save(&user)?;
        info!(
            phone_number = %user.phone_number,
            is_admin = user.is_admin,
            "User created by admin"
        );
        Ok(user)
    }

    /// Admin user table: newest first, filtered by phone, names or
    /// restaurant name.
    pub fn list_users(&self, search: Option<&str>, page: PageRequest) -> CoreResult<Page<UserRow>> {
        let mut users: Vec<User> = self.store.all()?;
        let restaurants: BTreeMap<RestaurantId, Restaurant> = self
            .store
            .all::<Restaurant>()?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();
        let restaurant_of = |user: &User| user.restaurant_id.and_then(|id| restaurants.get(&id));

        if let Some(term) = search_term(search) {
            users.retain(|u| {
                matches_any(
                    &term,
                    [
                        Some(u.phone_number.as_str()),
                        Some(u.first_name.as_str()),
                        Some(u.last_name.as_str()),
                        restaurant_of(u).map(|r| r.name.as_str()),
                    ],
                )
            });
        }
        newest_first(&mut users, |u| (u.created_at, u.id.as_bytes().to_vec()));

        let rows = users
            .iter()
            .map(|u| UserRow::new(u, restaurant_of(u)))
            .collect();
        Ok(page.slice(rows))
    }

    // ===== ONBOARDING =====

    /// Step 1: replace the placeholder first name.
    pub fn onboarding_first_name(&self, id: UserId, first_name: &str) -> CoreResult<User> {
        let first_name = required(first_name, "First name is required")?;
        let _guard = self.lock_writer()?;
        let mut user: User = self.require(id.as_bytes(), "User")?;
        user.first_name = first_name;
        self.save(&user)?;
        info!(user_id = %user.id, "Onboarding first name saved");
        Ok(user)
    }

    /// Step 2: create the restaurant, attach it and verify the account.
    pub fn onboarding_restaurant(
        &self,
        id: UserId,
        restaurant_name: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<(User, Restaurant)> {
        let restaurant_name = required(restaurant_name, "Restaurant name is required")?;
        let _guard = self.lock_writer()?;
        let mut user: User = self.require(id.as_bytes(), "User")?;
        if user.has_completed_onboarding() {
            return Err(CoreError::conflict("Onboarding already completed"));
        }

        let slug = self.free_slug(&restaurant_slug(&restaurant_name), None)?;
        let restaurant = Restaurant::new(restaurant_name, slug, now);
        user.restaurant_id = Some(restaurant.id);
        user.is_verified = true;

        let mut batch = Batch::new();
        batch.put(&restaurant)?.put(&user)?;
        self.commit(batch)?;

        info!(user_id = %user.id, restaurant_id = %restaurant.id, "User completed onboarding");
        Ok((user, restaurant))
    }
}
