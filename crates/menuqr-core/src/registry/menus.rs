//! Menus of a restaurant and their display order.

use super::{Registry, required};
use crate::error::{CoreError, CoreResult};
use crate::storage::{Batch, Store, StoreExt};
use crate::types::{Menu, MenuId, MenuKind, RestaurantId};
use crate::views::{MenuView, PublicRestaurant, RestaurantDetail};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::info;

const NAME_REQUIRED: &str = "Name is required";

impl<S: Store> Registry<S> {
    /// Menus of one restaurant by display order, then creation time.
    pub fn menus_for(&self, restaurant_id: RestaurantId) -> CoreResult<Vec<Menu>> {
        let mut menus: Vec<Menu> = self.store.all()?;
        menus.retain(|m| m.restaurant_id == restaurant_id);
        menus.sort_by(|a, b| {
            (a.display_order, a.created_at, a.id).cmp(&(b.display_order, b.created_at, b.id))
        });
        Ok(menus)
    }

    /// A menu, provided it belongs to `restaurant_id`.
    pub fn menu(&self, restaurant_id: RestaurantId, menu_id: MenuId) -> CoreResult<Menu> {
        self.find::<Menu>(menu_id.as_bytes())?
            .filter(|m| m.restaurant_id == restaurant_id)
            .ok_or_else(|| CoreError::not_found("Menu not found"))
    }

    /// Append a menu after the existing ones.
    pub fn create_menu(
        &self,
        restaurant_id: RestaurantId,
        name: &str,
        kind: MenuKind,
        file_path: String,
        now: DateTime<Utc>,
    ) -> CoreResult<Menu> {
        let name = required(name, NAME_REQUIRED)?;
        let _guard = self.lock_writer()?;
        self.require_restaurant(restaurant_id)?;

        let display_order = self
            .menus_for(restaurant_id)?
            .iter()
            .map(|m| m.display_order.saturating_add(1))
            .max()
            .unwrap_or(0);

        let menu = Menu {
            id: MenuId::new(),
            restaurant_id,
            name,
            kind,
            file_path,
            display_order,
            created_at: now,
            updated_at: None,
        };
        self.save(&menu)?;
        info!(
            restaurant_id = %restaurant_id,
            menu_id = %menu.id,
            kind = %menu.kind,
            "Menu created"
        );
        Ok(menu)
    }

    /// Rename a menu and optionally swap its file.
    ///
    /// Returns the replaced file path, if any, for the caller to delete.
    pub fn update_menu(
        &self,
        restaurant_id: RestaurantId,
        menu_id: MenuId,
        name: &str,
        new_file_path: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<(Menu, Option<String>)> {
        let name = required(name, NAME_REQUIRED)?;
        let _guard = self.lock_writer()?;

        let mut menu = self.menu(restaurant_id, menu_id)?;
        menu.name = name;
        let replaced = new_file_path.map(|path| std::mem::replace(&mut menu.file_path, path));
        menu.updated_at = Some(now);
        self.save(&menu)?;
        info!(restaurant_id = %restaurant_id, menu_id = %menu.id, "Menu updated");
        Ok((menu, replaced))
    }

    /// Remove a menu. Returns its file path for the caller to delete.
    pub fn delete_menu(&self, restaurant_id: RestaurantId, menu_id: MenuId) -> CoreResult<String> {
        let _guard = self.lock_writer()?;
        let menu = self.menu(restaurant_id, menu_id)?;
        self.store.delete(&menu)?;
        info!(restaurant_id = %restaurant_id, menu_id = %menu.id, "Menu deleted");
        Ok(menu.file_path)
    }

    /// Apply explicit `(id, order)` pairs.
    ///
    /// Ids belonging to other restaurants are skipped. Returns how many
    /// menus changed.
    pub fn reorder_menus(
        &self,
        restaurant_id: RestaurantId,
        order: &[(MenuId, u32)],
        now: DateTime<Utc>,
    ) -> CoreResult<usize> {
        if order.is_empty() {
            return Err(CoreError::validation("No menus provided"));
        }
        let _guard = self.lock_writer()?;

        let mut menus: BTreeMap<MenuId, Menu> = self
            .menus_for(restaurant_id)?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();

        let mut batch = Batch::new();
        for (id, display_order) in order {
            if let Some(menu) = menus.get_mut(id) {
                menu.display_order = *display_order;
                menu.updated_at = Some(now);
                batch.put(&*menu)?;
            }
        }
        let updated = batch.len();
        self.commit(batch)?;

        info!(restaurant_id = %restaurant_id, count = order.len(), "Menu order updated");
        Ok(updated)
    }

    /// Position in `ids` becomes the display order. An empty list is a no-op.
    pub fn reorder_menus_by_position(
        &self,
        restaurant_id: RestaurantId,
        ids: &[MenuId],
        now: DateTime<Utc>,
    ) -> CoreResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let order: Vec<(MenuId, u32)> = ids
            .iter()
            .enumerate()
            .map(|(position, id)| (*id, position as u32))
            .collect();
        self.reorder_menus(restaurant_id, &order, now)
    }

    /// The public page of a restaurant, by slug.
    pub fn public_restaurant(&self, slug: &str) -> CoreResult<Option<PublicRestaurant>> {
        let Some(restaurant) = self.restaurant_by_slug(slug)? else {
            return Ok(None);
        };
        let menus = self.menus_for(restaurant.id)?;
        Ok(Some(PublicRestaurant {
            restaurant: RestaurantDetail::from(&restaurant),
            menus: menus.iter().map(MenuView::from).collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use crate::error::CoreError;
    use crate::types::{MenuId, MenuKind};

    #[test]
    fn create_appends_in_order() {
        let registry = registry();
        let (_, r) = owner(&registry, "0711111111");

        let a = registry
            .create_menu(r.id, "Boissons", MenuKind::Pdf, "menus/a.pdf".into(), at(2, 9))
            .unwrap();
        let b = registry
            .create_menu(r.id, "Plats", MenuKind::Image, "menus/b.png".into(), at(2, 10))
            .unwrap();
        assert_eq!(a.display_order, 0);
        assert_eq!(b.display_order, 1);

        let names: Vec<_> = registry
            .menus_for(r.id)
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, ["Boissons", "Plats"]);
    }

    #[test]
    fn create_requires_name_and_restaurant() {
        let registry = registry();
        let (_, r) = owner(&registry, "0711111111");
        assert!(matches!(
            registry.create_menu(r.id, " ", MenuKind::Pdf, "x.pdf".into(), at(2, 9)),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            registry.create_menu(
                crate::types::RestaurantId::new(),
                "Carte",
                MenuKind::Pdf,
                "x.pdf".into(),
                at(2, 9)
            ),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn update_returns_replaced_file() {
        let registry = registry();
        let (_, r) = owner(&registry, "0711111111");
        let menu = registry
            .create_menu(r.id, "Carte", MenuKind::Pdf, "menus/old.pdf".into(), at(2, 9))
            .unwrap();

        let (renamed, replaced) = registry
            .update_menu(r.id, menu.id, "Carte du soir", None, at(2, 10))
            .unwrap();
        assert_eq!(renamed.name, "Carte du soir");
        assert_eq!(replaced, None);

        let (swapped, replaced) = registry
            .update_menu(r.id, menu.id, "Carte", Some("menus/new.pdf".into()), at(2, 11))
            .unwrap();
        assert_eq!(swapped.file_path, "menus/new.pdf");
        assert_eq!(replaced.as_deref(), Some("menus/old.pdf"));
    }

    #[test]
    fn foreign_menu_is_not_found() {
        let registry = registry();
        let (_, mine) = owner(&registry, "0711111111");
        let (_, theirs) = owner(&registry, "0722222222");
        let menu = registry
            .create_menu(theirs.id, "Carte", MenuKind::Pdf, "m.pdf".into(), at(2, 9))
            .unwrap();

        assert!(matches!(
            registry.update_menu(mine.id, menu.id, "Mine", None, at(2, 9)),
            Err(CoreError::NotFound(_))
        ));
        assert!(registry.delete_menu(mine.id, menu.id).is_err());
        assert_eq!(registry.delete_menu(theirs.id, menu.id).unwrap(), "m.pdf");
        assert!(registry.menus_for(theirs.id).unwrap().is_empty());
    }

    #[test]
    fn reorder_ignores_foreign_ids_and_rejects_empty() {
        let registry = registry();
        let (_, r) = owner(&registry, "0711111111");
        let a = registry
            .create_menu(r.id, "A", MenuKind::Pdf, "a.pdf".into(), at(2, 9))
            .unwrap();
        let b = registry
            .create_menu(r.id, "B", MenuKind::Pdf, "b.pdf".into(), at(2, 9))
            .unwrap();

        assert!(matches!(
            registry.reorder_menus(r.id, &[], at(2, 9)),
            Err(CoreError::Validation(m)) if m == "No menus provided"
        ));

        let updated = registry
            .reorder_menus(r.id, &[(a.id, 5), (b.id, 1), (MenuId::new(), 0)], at(2, 10))
            .unwrap();
        assert_eq!(updated, 2);
        let names: Vec<_> = registry
            .menus_for(r.id)
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, ["B", "A"]);
    }

    #[test]
    fn reorder_by_position_uses_index() {
        let registry = registry();
        let (_, r) = owner(&registry, "0711111111");
        let a = registry
            .create_menu(r.id, "A", MenuKind::Pdf, "a.pdf".into(), at(2, 9))
            .unwrap();
        let b = registry
            .create_menu(r.id, "B", MenuKind::Pdf, "b.pdf".into(), at(2, 9))
            .unwrap();
        let c = registry
            .create_menu(r.id, "C", MenuKind::Pdf, "c.pdf".into(), at(2, 9))
            .unwrap();

        registry
            .reorder_menus_by_position(r.id, &[c.id, a.id, b.id], at(2, 10))
            .unwrap();
        let orders: Vec<_> = registry
            .menus_for(r.id)
            .unwrap()
            .into_iter()
            .map(|m| (m.name, m.display_order))
            .collect();
        assert_eq!(
            orders,
            [("C".to_string(), 0), ("A".to_string(), 1), ("B".to_string(), 2)]
        );
    }

    #[test]
    fn public_restaurant_lists_ordered_menus() {
        let registry = registry();
        let (_, r) = owner(&registry, "0711111111");
        registry
            .create_menu(r.id, "Carte", MenuKind::Image, "c.png".into(), at(2, 9))
            .unwrap();

        let page = registry.public_restaurant(&r.slug).unwrap().unwrap();
        assert_eq!(page.restaurant.name, r.name);
        assert_eq!(page.menus.len(), 1);
        assert!(registry.public_restaurant("missing").unwrap().is_none());
    }
}
