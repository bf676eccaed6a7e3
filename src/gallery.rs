// src/gallery.rs
//
// Stan galerii kategorii: aktywny przedmiot, aktywne zdjęcie w przedmiocie,
// przenikanie między zdjęciami i gest przesunięcia palcem.

use crate::catalog::CatalogItem;

/// Minimalne przesunięcie poziome (px), które uznajemy za gest.
pub const SWIPE_THRESHOLD_PX: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Swipe {
    Next,
    Previous,
}

impl Swipe {
    /// Przesunięcie w lewo pokazuje następny przedmiot, w prawo poprzedni.
    pub fn from_delta(delta_x: f64, delta_y: f64) -> Option<Swipe> {
        if delta_x.abs() < SWIPE_THRESHOLD_PX || delta_x.abs() < delta_y.abs() {
            return None;
        }
        if delta_x < 0.0 {
            Some(Swipe::Next)
        } else {
            Some(Swipe::Previous)
        }
    }
}

/// Trwające przenikanie: poprzedni adres zostaje na ekranie,
/// dopóki nowe zdjęcie się nie wczyta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crossfade {
    pub previous_url: String,
    pub next_url: String,
    pub ticket: u64,
}

#[derive(Debug, Clone)]
pub struct GalleryState {
    /// Dla każdego przedmiotu: adresy zdjęć i indeks zdjęcia głównego.
    items: Vec<(Vec<String>, usize)>,
    active_item: usize,
    active_image: usize,
    crossfade: Option<Crossfade>,
    generation: u64,
}

impl GalleryState {
    pub fn new(items: &[&CatalogItem]) -> Self {
        let items = items
            .iter()
            .map(|item| {
                let urls = item.images.iter().map(|img| img.url.clone()).collect();
                (urls, item.primary_index())
            })
            .collect::<Vec<_>>();
        let active_image = items.first().map_or(0, |(_, primary)| *primary);
        GalleryState {
            items,
            active_item: 0,
            active_image,
            crossfade: None,
            generation: 0,
        }
    }

    /// Odtwarza stan z parametrów zapytania, przycinając indeksy do zakresu.
    /// `generation` to ostatni bilet wydany klientowi; kolejne przejście dostaje następny.
    pub fn restore(
        items: &[&CatalogItem],
        item: usize,
        image: Option<usize>,
        generation: u64,
    ) -> Self {
        let mut state = GalleryState::new(items);
        state.generation = generation;
        if state.items.is_empty() {
            return state;
        }
        state.active_item = item.min(state.items.len() - 1);
        let (urls, primary) = &state.items[state.active_item];
        state.active_image = match image {
            Some(idx) if idx < urls.len() => idx,
            _ => *primary,
        };
        state
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn active_item(&self) -> usize {
        self.active_item
    }

    pub fn active_image(&self) -> usize {
        self.active_image
    }

    /// Bilet bieżącego widoku. Rośnie z każdym przejściem.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn crossfade(&self) -> Option<&Crossfade> {
        self.crossfade.as_ref()
    }

    pub fn current_url(&self) -> Option<&str> {
        self.items
            .get(self.active_item)
            .and_then(|(urls, _)| urls.get(self.active_image))
            .map(String::as_str)
    }

    /// Adres widoczny na ekranie: przy przenikaniu wciąż poprzedni.
    pub fn displayed_url(&self) -> Option<&str> {
        match &self.crossfade {
            Some(fade) => Some(fade.previous_url.as_str()),
            None => self.current_url(),
        }
    }

    pub fn next_item_index(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            (self.active_item + 1) % self.items.len()
        }
    }

    pub fn previous_item_index(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            (self.active_item + self.items.len() - 1) % self.items.len()
        }
    }

    pub fn next_item(&mut self) -> Option<u64> {
        let idx = self.next_item_index();
        self.select_item(idx)
    }

    pub fn previous_item(&mut self) -> Option<u64> {
        let idx = self.previous_item_index();
        self.select_item(idx)
    }

    pub fn swipe(&mut self, gesture: Swipe) -> Option<u64> {
        match gesture {
            Swipe::Next => self.next_item(),
            Swipe::Previous => self.previous_item(),
        }
    }

    /// Zmienia aktywny przedmiot i ustawia jego zdjęcie główne.
    /// Zwraca bilet ładowania, jeśli adres na ekranie się zmienia.
    pub fn select_item(&mut self, index: usize) -> Option<u64> {
        if index >= self.items.len() {
            return None;
        }
        let previous = self.displayed_url().map(str::to_owned);
        self.active_item = index;
        self.active_image = self.items[index].1;
        self.begin_transition(previous)
    }

    pub fn select_image(&mut self, index: usize) -> Option<u64> {
        let count = self
            .items
            .get(self.active_item)
            .map_or(0, |(urls, _)| urls.len());
        if index >= count {
            return None;
        }
        let previous = self.displayed_url().map(str::to_owned);
        self.active_image = index;
        self.begin_transition(previous)
    }

    fn begin_transition(&mut self, previous: Option<String>) -> Option<u64> {
        let next = self.current_url()?.to_owned();
        self.generation += 1;
        match previous {
            Some(prev) if prev != next => {
                self.crossfade = Some(Crossfade {
                    previous_url: prev,
                    next_url: next,
                    ticket: self.generation,
                });
                Some(self.generation)
            }
            _ => {
                self.crossfade = None;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{category, image, item};

    fn items() -> Vec<CatalogItem> {
        let cat = category("Paski", 0);
        vec![
            CatalogItem::from_item(item(
                cat.id,
                1,
                vec![image("1a.jpg", false, None), image("1b.jpg", true, None)],
            )),
            CatalogItem::from_item(item(cat.id, 2, vec![image("2a.jpg", false, None)])),
            CatalogItem::from_item(item(
                cat.id,
                3,
                vec![image("3a.jpg", false, None), image("3b.jpg", false, None)],
            )),
        ]
    }

    #[test]
    fn starts_on_primary_image_of_first_item() {
        let owned = items();
        let refs: Vec<&CatalogItem> = owned.iter().collect();
        let state = GalleryState::new(&refs);
        assert_eq!(state.active_item(), 0);
        assert_eq!(state.current_url(), Some("1b.jpg"));
        assert!(state.crossfade().is_none());
    }

    #[test]
    fn navigation_wraps_around() {
        let owned = items();
        let refs: Vec<&CatalogItem> = owned.iter().collect();
        let mut state = GalleryState::new(&refs);

        state.previous_item();
        assert_eq!(state.active_item(), 2);
        state.next_item();
        assert_eq!(state.active_item(), 0);
    }

    #[test]
    fn crossfade_keeps_previous_on_screen() {
        let owned = items();
        let refs: Vec<&CatalogItem> = owned.iter().collect();
        let mut state = GalleryState::new(&refs);

        let ticket = state.next_item().unwrap();
        assert_eq!(ticket, state.generation());
        assert_eq!(state.current_url(), Some("2a.jpg"));
        assert_eq!(state.displayed_url(), Some("1b.jpg"));
        let fade = state.crossfade().unwrap();
        assert_eq!(fade.next_url, "2a.jpg");
        assert_eq!(fade.ticket, ticket);
    }

    #[test]
    fn tickets_keep_growing_across_restored_requests() {
        let owned = items();
        let refs: Vec<&CatalogItem> = owned.iter().collect();

        let mut first = GalleryState::restore(&refs, 0, None, 0);
        let first_ticket = first.next_item().unwrap();

        // następne kliknięcie przychodzi z biletem z poprzedniego fragmentu
        let mut second = GalleryState::restore(
            &refs,
            first.active_item(),
            Some(first.active_image()),
            first.generation(),
        );
        let second_ticket = second.next_item().unwrap();
        assert!(second_ticket > first_ticket);
        assert_eq!(second.current_url(), Some("3a.jpg"));
        assert_eq!(second.displayed_url(), Some("2a.jpg"));
    }

    #[test]
    fn selecting_image_within_item() {
        let owned = items();
        let refs: Vec<&CatalogItem> = owned.iter().collect();
        let mut state = GalleryState::new(&refs);

        assert!(state.select_image(5).is_none());
        assert!(state.select_image(0).is_some());
        assert_eq!(state.active_image(), 0);
        // to samo zdjęcie - bez przenikania
        assert!(state.select_image(0).is_none());
        assert!(state.crossfade().is_none());
    }

    #[test]
    fn swipe_maps_to_item_navigation() {
        assert_eq!(Swipe::from_delta(-80.0, 5.0), Some(Swipe::Next));
        assert_eq!(Swipe::from_delta(80.0, -5.0), Some(Swipe::Previous));
        assert_eq!(Swipe::from_delta(20.0, 0.0), None);
        assert_eq!(Swipe::from_delta(60.0, 120.0), None);

        let owned = items();
        let refs: Vec<&CatalogItem> = owned.iter().collect();
        let mut state = GalleryState::new(&refs);
        state.swipe(Swipe::Next);
        assert_eq!(state.active_item(), 1);
        state.swipe(Swipe::Previous);
        assert_eq!(state.active_item(), 0);
    }

    #[test]
    fn restore_clamps_indices() {
        let owned = items();
        let refs: Vec<&CatalogItem> = owned.iter().collect();
        let state = GalleryState::restore(&refs, 10, Some(7), 4);
        assert_eq!(state.active_item(), 2);
        assert_eq!(state.active_image(), 0);
        assert_eq!(state.generation(), 4);

        let state = GalleryState::restore(&refs, 0, Some(0), 0);
        assert_eq!(state.current_url(), Some("1a.jpg"));

        let empty = GalleryState::restore(&[], 3, None, 0);
        assert!(empty.is_empty());
        assert_eq!(empty.current_url(), None);
    }
}
