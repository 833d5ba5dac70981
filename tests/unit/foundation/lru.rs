use super::*;

#[test]
fn evicts_least_recently_inserted() {
    let mut c = BoundedLru::new(2);
    assert!(c.put(1, "a").is_none());
    assert!(c.put(2, "b").is_none());
    assert_eq!(c.put(3, "c"), Some((1, "a")));
    assert!(!c.contains(&1));
    assert!(c.contains(&2));
    assert!(c.contains(&3));
    assert_eq!(c.evictions(), 1);
}

#[test]
fn get_refreshes_recency() {
    let mut c = BoundedLru::new(2);
    c.put(1, "a");
    c.put(2, "b");
    assert_eq!(c.get(&1), Some(&"a"));
    assert_eq!(c.put(3, "c"), Some((2, "b")));
    assert!(c.contains(&1));
}

#[test]
fn peek_does_not_refresh() {
    let mut c = BoundedLru::new(2);
    c.put(1, "a");
    c.put(2, "b");
    assert_eq!(c.peek(&1), Some(&"a"));
    assert_eq!(c.put(3, "c"), Some((1, "a")));
}

#[test]
fn reinsert_replaces_value_without_counting_an_eviction() {
    let mut c = BoundedLru::new(2);
    c.put(1, "a");
    c.put(2, "b");
    assert!(c.put(1, "z").is_none());
    assert_eq!(c.len(), 2);
    assert_eq!(c.evictions(), 0);
    c.put(3, "c");
    assert_eq!(c.peek(&1), Some(&"z"));
    assert!(!c.contains(&2));
    assert_eq!(c.keys_by_recency().copied().collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(c.evictions(), 1);
}

#[test]
fn zero_capacity_is_clamped() {
    let mut c = BoundedLru::new(0);
    assert_eq!(c.capacity(), 1);
    c.put(1, ());
    c.put(2, ());
    assert_eq!(c.len(), 1);
    assert!(c.contains(&2));
}

#[test]
fn clear_drops_everything() {
    let mut c = BoundedLru::new(3);
    c.put(1, 10);
    c.put(2, 20);
    assert_eq!(c.values().sum::<i32>(), 30);
    c.clear();
    assert!(c.is_empty());
    assert_eq!(c.keys_by_recency().count(), 0);
}
