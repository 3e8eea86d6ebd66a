use std::cmp::Ordering;
use std::collections::BinaryHeap;

use als::Model;
use types::ItemSet;

/// A scored candidate item, ordered for use in a bounded max-heap that
/// keeps the top-k predictions.
#[derive(PartialEq, Debug)]
pub struct ScoredItem {
    pub item: u32,
    pub score: f64,
}

/// Ordering for our max-heap, note that we must use a special
/// implementation here as there is no total order on floating point
/// numbers.
fn cmp_reverse(scored_item_a: &ScoredItem, scored_item_b: &ScoredItem) -> Ordering {
    match scored_item_a.score.partial_cmp(&scored_item_b.score) {
        Some(Ordering::Less) => Ordering::Greater,
        Some(Ordering::Greater) => Ordering::Less,
        Some(Ordering::Equal) => Ordering::Equal,
        None => Ordering::Equal,
    }
}

impl Eq for ScoredItem {}

impl Ord for ScoredItem {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_reverse(self, other)
    }
}

impl PartialOrd for ScoredItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(cmp_reverse(self, other))
    }
}

/// The `n` items with the highest predicted score for this user, best
/// first, excluding items the user has already rated. Unknown users get an
/// empty list.
pub fn top_n(model: &Model, user: u32, rated: &ItemSet, n: usize) -> Vec<ScoredItem> {

    if n == 0 {
        return Vec::new();
    }

    let mut heap = BinaryHeap::with_capacity(n);

    for item in 0..model.num_items() as u32 {

        if rated.contains(&item) {
            continue;
        }

        let score = match model.predict(user, item) {
            Some(score) => score,
            None => return Vec::new(),
        };

        let scored_item = ScoredItem { item, score };

        if heap.len() < n {
            heap.push(scored_item);
        } else {
            let mut top = heap.peek_mut().unwrap();
            if scored_item < *top {
                *top = scored_item;
            }
        }
    }

    heap.into_sorted_vec()
}
