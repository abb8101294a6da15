//! Cache key construction.
//!
//! Every key the facade touches is produced here, so prefixes stay namespaced
//! per entity and callers never format keys by hand.

use std::fmt;

use crate::error::ConfigError;

/// Entity namespaces in the key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Products,
    Categories,
    Producers,
    Orders,
    Users,
    B2b,
    Invoices,
}

impl Entity {
    pub const ALL: [Entity; 7] = [
        Entity::Products,
        Entity::Categories,
        Entity::Producers,
        Entity::Orders,
        Entity::Users,
        Entity::B2b,
        Entity::Invoices,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Entity::Products => "products",
            Entity::Categories => "categories",
            Entity::Producers => "producers",
            Entity::Orders => "orders",
            Entity::Users => "users",
            Entity::B2b => "b2b",
            Entity::Invoices => "invoices",
        }
    }
}

/// A fully composed cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Per-entity key prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPrefixes {
    pub products: String,
    pub categories: String,
    pub producers: String,
    pub orders: String,
    pub users: String,
    pub b2b: String,
    pub invoices: String,
}

impl Default for KeyPrefixes {
    fn default() -> Self {
        Self {
            products: "products:".to_string(),
            categories: "categories:".to_string(),
            producers: "producers:".to_string(),
            orders: "orders:".to_string(),
            users: "users:".to_string(),
            b2b: "b2b:".to_string(),
            invoices: "invoices:".to_string(),
        }
    }
}

impl KeyPrefixes {
    pub fn get(&self, entity: Entity) -> &str {
        match entity {
            Entity::Products => &self.products,
            Entity::Categories => &self.categories,
            Entity::Producers => &self.producers,
            Entity::Orders => &self.orders,
            Entity::Users => &self.users,
            Entity::B2b => &self.b2b,
            Entity::Invoices => &self.invoices,
        }
    }

    /// Reject prefixes that could make keys of two entities overlap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for entity in Entity::ALL {
            let prefix = self.get(entity);
            if prefix.is_empty() {
                return Err(ConfigError::InvalidPrefix {
                    entity: entity.name(),
                    reason: "prefix is empty".to_string(),
                });
            }
            if prefix.contains(['*', '?', '[', ']']) || prefix.contains(char::is_whitespace) {
                return Err(ConfigError::InvalidPrefix {
                    entity: entity.name(),
                    reason: format!("prefix {prefix:?} contains whitespace or glob characters"),
                });
            }
        }

        for (i, a) in Entity::ALL.iter().enumerate() {
            for b in Entity::ALL.iter().skip(i + 1) {
                let (pa, pb) = (self.get(*a), self.get(*b));
                if pa.starts_with(pb) || pb.starts_with(pa) {
                    return Err(ConfigError::InvalidPrefix {
                        entity: a.name(),
                        reason: format!("collides with {} prefix {pb:?}", b.name()),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Builds every key the facade reads or writes.
#[derive(Debug, Clone)]
pub struct KeySpace {
    prefixes: KeyPrefixes,
}

impl KeySpace {
    pub fn new(prefixes: KeyPrefixes) -> Self {
        Self { prefixes }
    }

    fn key(&self, entity: Entity, rest: impl fmt::Display) -> CacheKey {
        CacheKey(format!("{}{}", self.prefixes.get(entity), rest))
    }

    /// Free-form key inside an entity namespace, for read-through and tagged entries.
    pub fn scoped(&self, entity: Entity, suffix: &str) -> CacheKey {
        self.key(entity, suffix)
    }

    pub fn product(&self, product_id: u64) -> CacheKey {
        self.key(Entity::Products, product_id)
    }

    pub fn product_slug(&self, slug: &str) -> CacheKey {
        self.key(Entity::Products, format_args!("slug:{slug}"))
    }

    pub fn featured_products(&self) -> CacheKey {
        self.key(Entity::Products, "featured")
    }

    pub fn category_tree(&self) -> CacheKey {
        self.key(Entity::Categories, "tree")
    }

    pub fn producer(&self, producer_id: u64) -> CacheKey {
        self.key(Entity::Producers, producer_id)
    }

    pub fn user_orders(&self, user_id: u64) -> CacheKey {
        self.key(Entity::Orders, format_args!("user:{user_id}"))
    }

    pub fn b2b_user(&self, user_id: u64) -> CacheKey {
        self.key(Entity::B2b, format_args!("user:{user_id}"))
    }

    pub fn b2b_pricing(&self, user_id: u64, product_id: u64) -> CacheKey {
        self.key(Entity::B2b, format_args!("pricing:{user_id}:{product_id}"))
    }

    /// Glob matching every pricing key of one user.
    pub fn b2b_pricing_pattern(&self, user_id: u64) -> String {
        format!("{}pricing:{user_id}:*", self.prefixes.b2b)
    }

    pub fn invoice(&self, invoice_id: u64) -> CacheKey {
        self.key(Entity::Invoices, invoice_id)
    }

    pub fn user_invoices(&self, user_id: u64) -> CacheKey {
        self.key(Entity::Invoices, format_args!("user:{user_id}"))
    }
}
