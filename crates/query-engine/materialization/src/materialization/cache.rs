//! Mapping plans shared by every execution that owns the cache.

use std::any::{type_name, TypeId};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use query_engine_metadata::metadata::{Column, ColumnSignature};

use super::builder::{build_plan, BuilderSettings};
use super::error::ShapeMismatchError;
use super::plan::MappingPlan;
use super::shape::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PlanKey {
    destination: TypeId,
    signature: ColumnSignature,
}

#[derive(Debug)]
struct CachedPlan {
    plan: Arc<MappingPlan>,
    sequence: u64,
}

/// Whether a lookup found a plan or had to build one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Hit,
    Built,
}

/// Counters describing cache traffic since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub builds: u64,
    pub entries: usize,
}

/// Plans keyed by destination type and column signature.
///
/// At most one plan is ever built per key: concurrent misses on the same key
/// wait on the entry lock and then share the winner's plan. Failed builds are
/// not stored, so the next lookup tries again. Unbounded unless a capacity is
/// given, in which case the oldest inserted plan is evicted first. Concurrent
/// misses may overshoot the capacity only until their lookups return.
#[derive(Debug)]
pub struct PlanCache {
    plans: DashMap<PlanKey, CachedPlan>,
    settings: BuilderSettings,
    capacity: Option<NonZeroUsize>,
    sequence: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    builds: AtomicU64,
}

impl Default for PlanCache {
    fn default() -> Self {
        PlanCache::new()
    }
}

impl PlanCache {
    pub fn new() -> Self {
        PlanCache::with_settings(BuilderSettings::default(), None)
    }

    pub fn with_settings(settings: BuilderSettings, capacity: Option<NonZeroUsize>) -> Self {
        PlanCache {
            plans: DashMap::new(),
            settings,
            capacity,
            sequence: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            builds: AtomicU64::new(0),
        }
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        PlanCache::with_settings(BuilderSettings::default(), Some(capacity))
    }

    pub fn settings(&self) -> &BuilderSettings {
        &self.settings
    }

    /// The plan for `T` over these columns, building it on first use.
    pub fn get_or_build<T: FromRow>(
        &self,
        columns: &[Column],
    ) -> Result<Arc<MappingPlan>, ShapeMismatchError> {
        self.lookup::<T>(columns).map(|(plan, _)| plan)
    }

    /// Like [`PlanCache::get_or_build`], also reporting whether a build happened.
    pub fn lookup<T: FromRow>(
        &self,
        columns: &[Column],
    ) -> Result<(Arc<MappingPlan>, Lookup), ShapeMismatchError> {
        let key = PlanKey {
            destination: TypeId::of::<T>(),
            signature: ColumnSignature::of(columns),
        };

        if let Some(cached) = self.plans.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok((cached.plan.clone(), Lookup::Hit));
        }

        // evicting takes shard locks, so it must happen before the entry is held
        self.evict_for_insert(&key);

        match self.plans.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok((occupied.get().plan.clone(), Lookup::Hit))
            }
            Entry::Vacant(vacant) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let plan = tracing::info_span!(
                    "Build mapping plan",
                    destination = type_name::<T>(),
                    columns = columns.len(),
                )
                .in_scope(|| build_plan::<T>(columns, &self.settings))?;
                self.builds.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    destination = type_name::<T>(),
                    signature = %plan.signature,
                    "built mapping plan"
                );

                let plan = Arc::new(plan);
                vacant.insert(CachedPlan {
                    plan: plan.clone(),
                    sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
                });
                // concurrent misses on other keys may have filled the cache meanwhile
                self.trim_to_capacity(&key);
                Ok((plan, Lookup::Built))
            }
        }
    }

    /// The cached plan for `T` over these columns, without building one.
    pub fn get<T: FromRow>(&self, columns: &[Column]) -> Option<Arc<MappingPlan>> {
        let key = PlanKey {
            destination: TypeId::of::<T>(),
            signature: ColumnSignature::of(columns),
        };
        self.plans.get(&key).map(|cached| cached.plan.clone())
    }

    pub fn contains<T: FromRow>(&self, columns: &[Column]) -> bool {
        self.get::<T>(columns).is_some()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Drop every plan. Plans already handed out stay valid.
    pub fn clear(&self) {
        self.plans.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            entries: self.plans.len(),
        }
    }

    fn evict_for_insert(&self, key: &PlanKey) {
        let Some(capacity) = self.capacity else {
            return;
        };
        while self.plans.len() >= capacity.get() && !self.plans.contains_key(key) {
            let oldest = self
                .plans
                .iter()
                .min_by_key(|entry| entry.value().sequence)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(oldest) => {
                    self.plans.remove(&oldest);
                }
                None => return,
            }
        }
    }

    fn trim_to_capacity(&self, keep: &PlanKey) {
        let Some(capacity) = self.capacity else {
            return;
        };
        while self.plans.len() > capacity.get() {
            let oldest = self
                .plans
                .iter()
                .filter(|entry| entry.key() != keep)
                .min_by_key(|entry| entry.value().sequence)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(oldest) => {
                    self.plans.remove(&oldest);
                }
                None => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use query_engine_metadata::metadata::ColumnType;

    use super::*;
    use crate::{Input, MaterializationError, Member, Shape};

    fn columns(names: &[&str]) -> Vec<Column> {
        names
            .iter()
            .map(|name| Column::new(*name, ColumnType::Integer))
            .collect()
    }

    static COUNTED_SHAPES: AtomicUsize = AtomicUsize::new(0);

    /// Counts how often its shape is consulted, i.e. how often a plan is built.
    struct Counted;

    impl FromRow for Counted {
        fn shape() -> Shape {
            COUNTED_SHAPES.fetch_add(1, Ordering::SeqCst);
            Shape::positional("Counted", vec![Member::new::<i32>("id")])
        }

        fn construct(input: Input<'_>) -> Result<Self, MaterializationError> {
            match input {
                Input::Arguments(mut arguments) => arguments.next::<i32>().map(|_| Counted),
                other => Err(other.unexpected("Counted", "constructor arguments")),
            }
        }
    }

    #[test]
    fn second_lookup_reuses_the_same_plan() {
        let cache = PlanCache::new();
        let first = cache.get_or_build::<(i32, i32)>(&columns(&["a", "b"])).unwrap();
        let second = cache.lookup::<(i32, i32)>(&columns(&["a", "b"])).unwrap();

        assert!(Arc::ptr_eq(&first, &second.0));
        assert_eq!(second.1, Lookup::Hit);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                builds: 1,
                entries: 1,
            }
        );
    }

    #[test]
    fn keys_separate_types_and_signatures() {
        let cache = PlanCache::new();
        cache.get_or_build::<(i32, i32)>(&columns(&["a", "b"])).unwrap();
        cache.get_or_build::<(i64, i64)>(&columns(&["a", "b"])).unwrap();
        cache.get_or_build::<(i32, i32)>(&columns(&["a", "c"])).unwrap();

        assert_eq!(cache.len(), 3);
        assert!(cache.contains::<(i64, i64)>(&columns(&["a", "b"])));
        assert!(!cache.contains::<(i64, i64)>(&columns(&["a", "c"])));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn failed_builds_are_not_cached() {
        let cache = PlanCache::new();
        let failed = cache.get_or_build::<(i32, i32)>(&columns(&["a"]));
        assert!(matches!(failed, Err(ShapeMismatchError::TooFewColumns { .. })));
        assert!(cache.is_empty());

        let stats = cache.stats();
        assert_eq!((stats.misses, stats.builds), (1, 0));
    }

    #[test]
    fn full_cache_evicts_the_oldest_plan() {
        let cache = PlanCache::with_capacity(NonZeroUsize::new(2).unwrap());
        cache.get_or_build::<(i32,)>(&columns(&["a"])).unwrap();
        cache.get_or_build::<(i32,)>(&columns(&["b"])).unwrap();
        cache.get_or_build::<(i32,)>(&columns(&["c"])).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains::<(i32,)>(&columns(&["a"])));
        assert!(cache.contains::<(i32,)>(&columns(&["b"])));
        assert!(cache.contains::<(i32,)>(&columns(&["c"])));
    }

    #[test]
    fn concurrent_misses_build_once() {
        let cache = PlanCache::new();
        let cols = columns(&["id"]);

        let plans: Vec<Arc<MappingPlan>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.get_or_build::<Counted>(&cols).unwrap()))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        assert_eq!(COUNTED_SHAPES.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().builds, 1);
        assert!(plans.iter().all(|plan| Arc::ptr_eq(plan, &plans[0])));
    }

    #[test]
    fn concurrent_misses_on_different_keys_respect_the_capacity() {
        let cache = PlanCache::with_capacity(NonZeroUsize::new(2).unwrap());
        let names = ["a", "b", "c", "d", "e", "f", "g", "h"];

        std::thread::scope(|scope| {
            for name in names {
                let cache = &cache;
                scope.spawn(move || cache.get_or_build::<(i32,)>(&columns(&[name])).unwrap());
            }
        });

        assert!(cache.len() <= 2);
        assert_eq!(cache.stats().builds, 8);
    }
}
