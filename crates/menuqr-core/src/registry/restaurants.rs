//! Restaurants: creation, profile edits and the admin restaurant table.

use super::{Registry, newest_first, optional, required};
use crate::error::CoreResult;
use crate::page::{Page, PageRequest, matches_any, search_term};
use crate::slug::{restaurant_slug, unique_slug};
use crate::storage::{Store, StoreExt};
use crate::types::{Restaurant, RestaurantId, User};
use crate::views::{RestaurantOption, RestaurantRow};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::info;

const NAME_REQUIRED: &str = "Name is required";

impl<S: Store> Registry<S> {
    pub fn restaurant(&self, id: RestaurantId) -> CoreResult<Option<Restaurant>> {
        self.find(id.as_bytes())
    }

    /// Like [`Registry::restaurant`] but missing is an error.
    pub fn require_restaurant(&self, id: RestaurantId) -> CoreResult<Restaurant> {
        self.require(id.as_bytes(), "Restaurant")
    }

    pub fn restaurant_by_slug(&self, slug: &str) -> CoreResult<Option<Restaurant>> {
        let restaurants: Vec<Restaurant> = self.store.all()?;
        Ok(restaurants.into_iter().find(|r| r.slug == slug))
    }

    /// The user whose account points at this restaurant.
    pub fn owner_of(&self, id: RestaurantId) -> CoreResult<Option<User>> {
        let users: Vec<User> = self.store.all()?;
        Ok(users.into_iter().find(|u| u.restaurant_id == Some(id)))
    }

    /// First free slug derived from `base`, ignoring `exclude`'s own slug.
    pub(super) fn free_slug(&self, base: &str, exclude: Option<RestaurantId>) -> CoreResult<String> {
        let taken: BTreeSet<String> = self
            .store
            .all::<Restaurant>()?
            .into_iter()
            .filter(|r| Some(r.id) != exclude)
            .map(|r| r.slug)
            .collect();
        Ok(unique_slug(base, |candidate| taken.contains(candidate)))
    }

    /// Admin creation. The slug is derived from the name and never changes.
    pub fn create_restaurant(
        &self,
        name: &str,
        description: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<Restaurant> {
        let name = required(name, NAME_REQUIRED)?;
        let _guard = self.lock_writer()?;

        let slug = self.free_slug(&restaurant_slug(&name), None)?;
        let restaurant = Restaurant {
            description: optional(description),
            ..Restaurant::new(name, slug, now)
        };
        self.save(&restaurant)?;
        info!(restaurant_id = %restaurant.id, slug = %restaurant.slug, "Restaurant created");
        Ok(restaurant)
    }

    /// Rename and redescribe. A blank description clears it.
    pub fn update_restaurant(
        &self,
        id: RestaurantId,
        name: &str,
        description: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<Restaurant> {
        let name = required(name, NAME_REQUIRED)?;
        let _guard = self.lock_writer()?;

        let mut restaurant = self.require_restaurant(id)?;
        restaurant.name = name;
        restaurant.description = optional(description);
        restaurant.updated_at = Some(now);
        self.save(&restaurant)?;
        info!(restaurant_id = %restaurant.id, "Restaurant updated");
        Ok(restaurant)
    }

    /// Point the logo and/or cover at newly stored files.
    ///
    /// `None` leaves a photo as is. Returns the paths that were replaced so
    /// the caller can delete the old files.
    pub fn set_photos(
        &self,
        id: RestaurantId,
        photo_path: Option<String>,
        background_photo_path: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<(Restaurant, Vec<String>)> {
        let _guard = self.lock_writer()?;
        let mut restaurant = self.require_restaurant(id)?;
        let mut replaced = Vec::new();

        if let Some(path) = photo_path {
            replaced.extend(restaurant.photo_path.replace(path));
        }
        if let Some(path) = background_photo_path {
            replaced.extend(restaurant.background_photo_path.replace(path));
        }
        restaurant.updated_at = Some(now);
        self.save(&restaurant)?;
        Ok((restaurant, replaced))
    }

    /// Admin restaurant table: newest first, filtered by name, slug or
    /// owner phone.
    pub fn list_restaurants(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> CoreResult<Page<RestaurantRow>> {
        let users: Vec<User> = self.store.all()?;
        let owner = |r: &Restaurant| users.iter().find(|u| u.restaurant_id == Some(r.id));

        let mut restaurants: Vec<Restaurant> = self.store.all()?;
        if let Some(term) = search_term(search) {
            restaurants.retain(|r| {
                matches_any(
                    &term,
                    [
                        Some(r.name.as_str()),
                        Some(r.slug.as_str()),
                        owner(r).map(|u| u.phone_number.as_str()),
                    ],
                )
            });
        }
        newest_first(&mut restaurants, |r| (r.created_at, r.id.as_bytes().to_vec()));

        let rows = restaurants
            .iter()
            .map(|r| RestaurantRow::new(r, owner(r)))
            .collect();
        Ok(page.slice(rows))
    }

    /// Every restaurant by name, for assignment dropdowns.
    pub fn restaurant_options(&self) -> CoreResult<Vec<RestaurantOption>> {
        let mut restaurants: Vec<Restaurant> = self.store.all()?;
        restaurants.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(restaurants.iter().map(RestaurantOption::from).collect())
    }
}
