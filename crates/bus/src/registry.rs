use std::collections::HashMap;

use meridian_core::EventKind;
use meridian_ports::{HandlerRef, same_handler};

/// Global and per-kind handler lists.
///
/// A handler appears at most once in any single list. The same handler may
/// sit in the global list and in typed lists at the same time; it is then
/// invoked once per list.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    global: Vec<HandlerRef>,
    typed: HashMap<EventKind, Vec<HandlerRef>>,
}

fn insert_once(list: &mut Vec<HandlerRef>, handler: HandlerRef) -> bool {
    if list.iter().any(|h| same_handler(h, &handler)) {
        return false;
    }
    list.push(handler);
    true
}

fn remove_from(list: &mut Vec<HandlerRef>, handler: &HandlerRef) -> bool {
    let before = list.len();
    list.retain(|h| !same_handler(h, handler));
    list.len() != before
}

impl HandlerRegistry {
    pub fn add_global(&mut self, handler: HandlerRef) -> bool {
        insert_once(&mut self.global, handler)
    }

    /// Remove from the global list and from every typed list.
    pub fn remove_global(&mut self, handler: &HandlerRef) -> bool {
        let mut removed = remove_from(&mut self.global, handler);
        for list in self.typed.values_mut() {
            removed |= remove_from(list, handler);
        }
        self.typed.retain(|_, list| !list.is_empty());
        removed
    }

    pub fn add_typed(&mut self, kind: EventKind, handler: HandlerRef) -> bool {
        insert_once(self.typed.entry(kind).or_default(), handler)
    }

    pub fn remove_typed(&mut self, kind: EventKind, handler: &HandlerRef) -> bool {
        let Some(list) = self.typed.get_mut(&kind) else {
            return false;
        };
        let removed = remove_from(list, handler);
        if list.is_empty() {
            self.typed.remove(&kind);
        }
        removed
    }

    /// Handlers for one event: typed first, then global, each in
    /// registration order.
    pub fn targets_for(&self, kind: EventKind) -> Vec<HandlerRef> {
        let typed = self.typed.get(&kind).map(Vec::as_slice).unwrap_or_default();
        typed.iter().chain(self.global.iter()).cloned().collect()
    }

    pub fn global_count(&self) -> usize {
        self.global.len()
    }

    pub fn typed_count(&self, kind: EventKind) -> usize {
        self.typed.get(&kind).map_or(0, Vec::len)
    }

    pub fn contains(&self, handler: &HandlerRef) -> bool {
        self.global
            .iter()
            .chain(self.typed.values().flatten())
            .any(|h| same_handler(h, handler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::FnHandler;

    fn noop(name: &str) -> HandlerRef {
        FnHandler::new(name, |_| Ok(()))
    }

    fn names(list: &[HandlerRef]) -> Vec<String> {
        list.iter().map(|h| h.name().to_string()).collect()
    }

    #[test]
    fn test_register_twice_is_noop() {
        let mut registry = HandlerRegistry::default();
        let h = noop("a");
        assert!(registry.add_global(h.clone()));
        assert!(!registry.add_global(h.clone()));
        assert!(registry.add_typed(EventKind::Order, h.clone()));
        assert!(!registry.add_typed(EventKind::Order, h));
        assert_eq!(registry.global_count(), 1);
        assert_eq!(registry.typed_count(EventKind::Order), 1);
    }

    #[test]
    fn test_typed_before_global_in_registration_order() {
        let mut registry = HandlerRegistry::default();
        registry.add_global(noop("g1"));
        registry.add_typed(EventKind::Trade, noop("t1"));
        registry.add_global(noop("g2"));
        registry.add_typed(EventKind::Trade, noop("t2"));
        registry.add_typed(EventKind::Order, noop("o1"));

        assert_eq!(
            names(&registry.targets_for(EventKind::Trade)),
            vec!["t1", "t2", "g1", "g2"]
        );
        assert_eq!(names(&registry.targets_for(EventKind::Risk)), vec!["g1", "g2"]);
    }

    #[test]
    fn test_global_removal_clears_typed_lists() {
        let mut registry = HandlerRegistry::default();
        let h = noop("h");
        registry.add_global(h.clone());
        registry.add_typed(EventKind::Order, h.clone());
        registry.add_typed(EventKind::MarketData, h.clone());

        assert!(registry.remove_global(&h));
        assert!(!registry.contains(&h));
        assert!(registry.targets_for(EventKind::Order).is_empty());
        assert!(!registry.remove_global(&h));
    }

    #[test]
    fn test_typed_removal_leaves_global() {
        let mut registry = HandlerRegistry::default();
        let h = noop("h");
        registry.add_global(h.clone());
        registry.add_typed(EventKind::Order, h.clone());

        assert!(registry.remove_typed(EventKind::Order, &h));
        assert!(!registry.remove_typed(EventKind::Order, &h));
        assert!(registry.contains(&h));
        assert_eq!(registry.global_count(), 1);
    }
}
