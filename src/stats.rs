extern crate fnv;

use fnv::FnvHashSet;

use types::Rating;

/// Basic statistics of a rating set, collected in a single pass. The
/// implied shape (`max id + 1` per axis) is what the matrix builder uses
/// when no shape is configured explicitly.
#[derive(Clone, Debug)]
pub struct DataStats {
    num_ratings: u64,
    num_users: usize,
    num_items: usize,
    max_user: u32,
    max_item: u32,
}

impl DataStats {

    pub fn from_ratings(ratings: &[Rating]) -> Self {

        let mut users: FnvHashSet<u32> =
            FnvHashSet::with_capacity_and_hasher(100, Default::default());
        let mut items: FnvHashSet<u32> =
            FnvHashSet::with_capacity_and_hasher(100, Default::default());

        let mut max_user: u32 = 0;
        let mut max_item: u32 = 0;

        for rating in ratings {
            users.insert(rating.user);
            items.insert(rating.item);

            if rating.user > max_user {
                max_user = rating.user;
            }
            if rating.item > max_item {
                max_item = rating.item;
            }
        }

        DataStats {
            num_ratings: ratings.len() as u64,
            num_users: users.len(),
            num_items: items.len(),
            max_user,
            max_item,
        }
    }

    pub fn num_ratings(&self) -> u64 {
        self.num_ratings
    }

    pub fn num_users(&self) -> usize {
        self.num_users
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.max_user as usize + 1, self.max_item as usize + 1)
    }
}

#[cfg(test)]
mod tests {

    use super::DataStats;
    use types::Rating;

    #[test]
    fn counts_distinct_ids_and_derives_shape() {
        let ratings = vec![
            Rating::new(0, 0, 5.0, 0),
            Rating::new(0, 7, 1.0, 1),
            Rating::new(3, 0, 2.0, 2),
            Rating::new(3, 7, 4.0, 3),
        ];

        let stats = DataStats::from_ratings(&ratings);

        assert_eq!(stats.num_ratings(), 4);
        assert_eq!(stats.num_users(), 2);
        assert_eq!(stats.num_items(), 2);
        assert_eq!(stats.shape(), (4, 8));
    }

    #[test]
    fn empty_input_implies_unit_shape() {
        let stats = DataStats::from_ratings(&[]);

        assert_eq!(stats.num_ratings(), 0);
        assert_eq!(stats.shape(), (1, 1));
    }
}
