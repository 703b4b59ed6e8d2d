use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;

use crate::core::Color;

/// Category label to color assignment for one column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Palette {
    assignments: IndexMap<String, Color>,
}

impl Palette {
    #[must_use]
    pub fn color(&self, label: &str) -> Option<Color> {
        self.assignments.get(label).copied()
    }

    /// Returns the label's color, assigning the next base color if new.
    pub fn assign(&mut self, label: &str, base: &[Color]) -> Color {
        if let Some(color) = self.assignments.get(label) {
            return *color;
        }
        let color = if base.is_empty() {
            Color::GRAY
        } else {
            base[self.assignments.len() % base.len()]
        };
        self.assignments.insert(label.to_owned(), color);
        color
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Process-wide categorical color cache shared by independently generated
/// charts, keyed by (source identity, column).
///
/// Created once by the host and injected into every generator. The lock is
/// only held to read or write one palette, never across a generation.
#[derive(Debug, Default)]
pub struct PaletteCache {
    entries: Mutex<HashMap<(String, String), Palette>>,
}

impl PaletteCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, source: &str, column: &str) -> Option<Palette> {
        self.lock()
            .get(&(source.to_owned(), column.to_owned()))
            .cloned()
    }

    pub fn put(&self, source: &str, column: &str, palette: Palette) {
        self.lock()
            .insert((source.to_owned(), column.to_owned()), palette);
    }

    /// Assigns colors to `labels` in order, reusing cached assignments, and
    /// stores the extended palette in one critical section.
    pub fn assign(&self, source: &str, column: &str, labels: &[String], base: &[Color]) -> Palette {
        let mut entries = self.lock();
        let palette = entries
            .entry((source.to_owned(), column.to_owned()))
            .or_default();
        for label in labels {
            palette.assign(label, base);
        }
        palette.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(String, String), Palette>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{Palette, PaletteCache};
    use crate::core::Color;

    #[test]
    fn assignments_are_stable_and_cycle() {
        let base = [Color::BLACK, Color::GRAY];
        let mut palette = Palette::default();
        assert_eq!(palette.assign("a", &base), Color::BLACK);
        assert_eq!(palette.assign("b", &base), Color::GRAY);
        assert_eq!(palette.assign("c", &base), Color::BLACK);
        assert_eq!(palette.assign("a", &base), Color::BLACK);
        assert_eq!(palette.len(), 3);
    }

    #[test]
    fn cache_extends_existing_palette() {
        let cache = PaletteCache::new();
        let base = [Color::BLACK, Color::GRAY, Color::ACCENT];
        cache.assign("dash", "Region", &["East".to_owned()], &base);
        let palette = cache.assign(
            "dash",
            "Region",
            &["West".to_owned(), "East".to_owned()],
            &base,
        );
        assert_eq!(palette.color("East"), Some(Color::BLACK));
        assert_eq!(palette.color("West"), Some(Color::GRAY));
        assert!(cache.get("other", "Region").is_none());
    }
}
