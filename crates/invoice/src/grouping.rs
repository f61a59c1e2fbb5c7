use std::collections::HashMap;

use crate::model::Transaction;

/// Transactions sharing one normalized (restaurant, platform) key.
#[derive(Debug, Clone)]
pub struct PlatformGroup {
    pub key: String,
    /// Display name as first seen.
    pub name: String,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone)]
pub struct RestaurantGroup {
    pub key: String,
    pub name: String,
    /// First non-blank location seen for this restaurant.
    pub location: Option<String>,
    pub platforms: Vec<PlatformGroup>,
    platform_index: HashMap<String, usize>,
}

impl RestaurantGroup {
    fn new(txn: &Transaction) -> Self {
        Self {
            key: txn.restaurant_key(),
            name: txn.restaurant_name.clone(),
            location: None,
            platforms: Vec::new(),
            platform_index: HashMap::new(),
        }
    }

    fn push(&mut self, txn: Transaction) {
        if self.location.is_none() {
            self.location = txn.location.clone();
        }
        let key = txn.platform_key();
        let pos = match self.platform_index.get(&key) {
            Some(&pos) => pos,
            None => {
                self.platforms.push(PlatformGroup {
                    key: key.clone(),
                    name: txn.platform.clone(),
                    transactions: Vec::new(),
                });
                self.platform_index.insert(key, self.platforms.len() - 1);
                self.platforms.len() - 1
            }
        };
        self.platforms[pos].transactions.push(txn);
    }

    /// Every transaction of this restaurant, across platforms.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.platforms.iter().flat_map(|p| p.transactions.iter())
    }
}

/// Two-level partition of transactions in first-seen order.
///
/// Order is carried by the `Vec`s; the maps only locate an existing entry.
/// Nothing here depends on hash iteration order.
#[derive(Debug, Clone, Default)]
pub struct GroupingIndex {
    pub restaurants: Vec<RestaurantGroup>,
    restaurant_index: HashMap<String, usize>,
}

impl GroupingIndex {
    pub fn build(transactions: &[Transaction]) -> Self {
        let mut index = Self::default();
        for txn in transactions {
            index.insert(txn.clone());
        }
        index
    }

    pub fn insert(&mut self, txn: Transaction) {
        let key = txn.restaurant_key();
        let pos = match self.restaurant_index.get(&key) {
            Some(&pos) => pos,
            None => {
                self.restaurants.push(RestaurantGroup::new(&txn));
                self.restaurant_index.insert(key, self.restaurants.len() - 1);
                self.restaurants.len() - 1
            }
        };
        self.restaurants[pos].push(txn);
    }

    pub fn get(&self, restaurant: &str, platform: &str) -> Option<&PlatformGroup> {
        let r = &self.restaurants[*self.restaurant_index.get(&crate::normalize::normalize_key(restaurant))?];
        let p = *r.platform_index.get(&crate::normalize::normalize_key(platform))?;
        Some(&r.platforms[p])
    }

    pub fn group_count(&self) -> usize {
        self.restaurants.iter().map(|r| r.platforms.len()).sum()
    }

    pub fn transaction_count(&self) -> usize {
        self.restaurants.iter().map(|r| r.transactions().count()).sum()
    }
}
