//! Work-unit pool: access-mode-gated container plus scheduler association.
//!
//! A [`Pool`] wraps a caller-supplied container (the [`PoolOps`] vtable) with
//! the access-mode bookkeeping, migration admission, and scheduler
//! association protocol every pool needs regardless of container.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use esched_core::{kdebug, kerror};
use esched_core::{AccessMode, CoreError, CoreResult, EsId, Unit, UnitKind};

use crate::fifo::FifoQueue;

/// Container operations a pool's vtable must provide.
///
/// The hot-path trio (`push`/`pop`/`remove`) is all [`Pool`] calls directly;
/// everything else (access-mode bookkeeping, counters) lives on `Pool`
/// itself so a container implementation only has to know how to store and
/// retrieve units.
pub trait PoolOps: Send + Sync {
    fn push(&self, unit: Unit);
    fn pop(&self) -> Option<Unit>;
    fn remove(&self, unit: Unit) -> CoreResult<()>;
    fn get_size(&self) -> usize;

    /// Run once, right after the pool handle wrapping this vtable is built
    /// (§4.1). Receives the opaque config passed to `create_custom`, if any.
    /// Default no-op; a container with no construction-time setup need not
    /// override it.
    fn init(&self, _pool: &PoolHandle, _config: Option<&(dyn Any + Send + Sync)>) {}
}

/// What a unit actually runs once a host's `SchedHost::run_unit` dispatches
/// it.
pub type UnitBody = Box<dyn FnMut() + Send>;

/// Wraps an already-created external thread/task as a [`Unit`] (§6.1
/// `unit_create_from_thread`/`unit_create_from_task`).
///
/// Supplied by whatever owns ULT/task creation (outside this crate's scope,
/// per the pool and scheduler design); `add_sched` uses it to wrap the
/// thread or task it creates to run a stacked scheduler's own loop.
pub trait UnitAdapters: Send + Sync {
    /// Wrap a thread running `body` as a unit.
    fn create_unit_from_thread(&self, body: UnitBody) -> CoreResult<Unit>;
    /// Wrap a task running `body` as a unit.
    fn create_unit_from_task(&self, body: UnitBody) -> CoreResult<Unit>;
    /// The kind of unit `create_unit_from_thread`/`create_unit_from_task`
    /// produced for `unit` (§6.1 `unit_get_type`).
    fn unit_kind(&self, unit: Unit) -> CoreResult<UnitKind>;
    fn free_unit(&self, unit: Unit);
}

/// Predefined pool containers `create_basic` knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Fifo,
}

struct Pool {
    access: AccessMode,
    automatic: AtomicBool,
    num_scheds: AtomicI32,
    /// 0 = unset, else `EsId::as_u64()` of the bound reader.
    reader: AtomicU64,
    /// 0 = unset, else `EsId::as_u64()` of the bound writer.
    writer: AtomicU64,
    num_blocked: AtomicU32,
    num_migrations: AtomicI32,
    vtable: Arc<dyn PoolOps>,
    data: Mutex<Option<Box<dyn Any + Send + Sync>>>,
}

/// Handle to a pool. `PoolHandle::NULL` is the sentinel "no pool" value,
/// mirroring `ABT_POOL_NULL`.
#[derive(Clone)]
pub struct PoolHandle(Option<Arc<Pool>>);

impl fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => write!(f, "PoolHandle(NULL)"),
            Some(p) => write!(
                f,
                "PoolHandle(access={}, size={})",
                p.access,
                p.vtable.get_size()
            ),
        }
    }
}

impl PartialEq for PoolHandle {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PoolHandle {
    pub const NULL: PoolHandle = PoolHandle(None);

    #[inline]
    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    fn pool(&self) -> CoreResult<&Arc<Pool>> {
        self.0.as_ref().ok_or(CoreError::InvalidPool)
    }

    /// Create a pool around a caller-supplied container plus an opaque
    /// construction-time config (§4.1). If the vtable has an `init`, it is
    /// called with the new pool handle and `config` once the pool exists.
    pub fn create_custom(
        vtable: Arc<dyn PoolOps>,
        access: AccessMode,
        config: Option<Box<dyn Any + Send + Sync>>,
    ) -> PoolHandle {
        let handle = PoolHandle(Some(Arc::new(Pool {
            access,
            automatic: AtomicBool::new(false),
            num_scheds: AtomicI32::new(0),
            reader: AtomicU64::new(0),
            writer: AtomicU64::new(0),
            num_blocked: AtomicU32::new(0),
            num_migrations: AtomicI32::new(0),
            vtable: vtable.clone(),
            data: Mutex::new(None),
        })));
        vtable.init(&handle, config.as_deref());
        handle
    }

    /// Create a pool from a predefined kind (§4.1). Unlike the source this
    /// was distilled from, a failed call writes nothing at all: there is no
    /// out-parameter to leave in a corrupted state, so the
    /// `ABT_pool_create_basic` sentinel bug has no Rust equivalent to
    /// reproduce.
    pub fn create_basic(kind: PoolKind, access: AccessMode) -> CoreResult<PoolHandle> {
        let vtable: Arc<dyn PoolOps> = match kind {
            PoolKind::Fifo => Arc::new(FifoQueue::new()),
        };
        let handle = Self::create_custom(vtable, access, None);
        handle.pool()?.automatic.store(true, Ordering::Relaxed);
        Ok(handle)
    }

    /// Whether this pool is freed automatically once it is no longer
    /// referenced by any scheduler (I6), as opposed to requiring an explicit
    /// external `free()`. Set by `create_basic`; `create_custom` pools
    /// default to `false`.
    pub fn is_automatic(&self) -> CoreResult<bool> {
        Ok(self.pool()?.automatic.load(Ordering::Relaxed))
    }

    /// Free the pool. Errors with `Pool` if any scheduler still references
    /// it (I6: a pool frees only when unreferenced).
    pub fn free(&mut self) -> CoreResult<()> {
        let pool = self.pool()?;
        if pool.num_scheds.load(Ordering::Relaxed) != 0 {
            kerror!("ABT_pool_free: pool still referenced by a scheduler");
            return Err(CoreError::Pool);
        }
        self.0 = None;
        Ok(())
    }

    /// Mark the pool as referenced by one more scheduler (I1).
    pub(crate) fn retain(&self) -> CoreResult<()> {
        self.pool()?.num_scheds.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Release one scheduler's reference (I1: must not go negative).
    pub(crate) fn release(&self) -> CoreResult<()> {
        let pool = self.pool()?;
        let prev = pool.num_scheds.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
            if n <= 0 {
                None
            } else {
                Some(n - 1)
            }
        });
        if prev.is_err() {
            kerror!("ABTI_pool_release: num_scheds would go negative");
            return Err(CoreError::InvalidPool);
        }
        Ok(())
    }

    pub fn access(&self) -> CoreResult<AccessMode> {
        Ok(self.pool()?.access)
    }

    pub fn get_size(&self) -> CoreResult<usize> {
        Ok(self.pool()?.vtable.get_size())
    }

    /// Size plus blocked and migrating units (I5); a best-effort snapshot,
    /// not an atomic read of all three counters at once.
    pub fn get_total_size(&self) -> CoreResult<usize> {
        let pool = self.pool()?;
        let size = pool.vtable.get_size();
        let blocked = pool.num_blocked.load(Ordering::Relaxed) as usize;
        let migrations = pool.num_migrations.load(Ordering::Relaxed).max(0) as usize;
        Ok(size + blocked + migrations)
    }

    pub fn push(&self, unit: Unit) -> CoreResult<()> {
        if unit.is_null() {
            return Err(CoreError::Unit);
        }
        let pool = self.pool()?;
        set_writer(pool, EsId::current())?;
        pool.vtable.push(unit);
        Ok(())
    }

    /// Does not bind reader: the scheduler draining this pool runs on the
    /// pool's reader by construction (§4.3, §4.5), so `pop` itself performs
    /// no access check, matching `ABT_pool_pop` in the source this was
    /// distilled from.
    pub fn pop(&self) -> CoreResult<Unit> {
        let pool = self.pool()?;
        Ok(pool.vtable.pop().unwrap_or(Unit::NULL))
    }

    pub fn remove(&self, unit: Unit) -> CoreResult<()> {
        let pool = self.pool()?;
        set_reader(pool, EsId::current())?;
        pool.vtable.remove(unit)
    }

    pub fn set_data(&self, data: Box<dyn Any + Send + Sync>) -> CoreResult<()> {
        let pool = self.pool()?;
        *pool.data.lock().unwrap() = Some(data);
        Ok(())
    }

    pub fn with_data<R>(&self, f: impl FnOnce(Option<&(dyn Any + Send + Sync)>) -> R) -> CoreResult<R> {
        let pool = self.pool()?;
        let guard = pool.data.lock().unwrap();
        Ok(f(guard.as_deref()))
    }

    pub(crate) fn inc_num_blocked(&self) -> CoreResult<()> {
        self.pool()?.num_blocked.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub(crate) fn dec_num_blocked(&self) -> CoreResult<()> {
        self.pool()?.num_blocked.fetch_sub(1, Ordering::Relaxed);
        Ok(())
    }

    pub(crate) fn inc_num_migrations(&self) -> CoreResult<()> {
        self.pool()?.num_migrations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub(crate) fn dec_num_migrations(&self) -> CoreResult<()> {
        self.pool()?.num_migrations.fetch_sub(1, Ordering::Relaxed);
        Ok(())
    }

    /// Whether this pool will accept a unit migrating from `source` (§4.4).
    /// A private-write destination only accepts a migration whose source
    /// writer is the same ES already bound as this pool's reader.
    pub fn accept_migration(&self, source: &PoolHandle) -> CoreResult<bool> {
        let dst = self.pool()?;
        let src = source.pool()?;
        Ok(match dst.access {
            AccessMode::Prw | AccessMode::PrPw | AccessMode::SrPw => {
                let dst_reader = dst.reader.load(Ordering::Relaxed);
                let src_writer = src.writer.load(Ordering::Relaxed);
                dst_reader != 0 && dst_reader == src_writer
            }
            AccessMode::PrSw | AccessMode::SrSw => true,
        })
    }

    /// Associate a scheduler with this pool (§4.5). `propagate_to` receives
    /// every pool already in the scheduler's pool set so their reader
    /// binding can be synchronised to this pool's reader (`PR_*` branch), or
    /// is scanned for a disallowed private nested pool (`SR_*` branch).
    pub(crate) fn admit_sched(&self, sibling_pools: &[PoolHandle]) -> CoreResult<()> {
        let pool = self.pool()?;
        match pool.access {
            AccessMode::Prw | AccessMode::PrPw | AccessMode::PrSw => {
                let reader = pool.reader.load(Ordering::Relaxed);
                if reader == 0 {
                    kerror!("ABT_pool_add_sched: pool has no associated ES yet");
                    return Err(CoreError::Pool);
                }
                for sibling in sibling_pools {
                    let sibling_pool = sibling.pool()?;
                    set_reader_raw(sibling_pool, reader)?;
                }
            }
            AccessMode::SrPw | AccessMode::SrSw => {
                for sibling in sibling_pools {
                    let sibling_access = sibling.access()?;
                    if sibling_access.has_private_reader() {
                        kerror!("ABT_pool_add_sched: shared-read scheduler cannot host a private-read pool");
                        return Err(CoreError::Pool);
                    }
                }
            }
        }
        Ok(())
    }
}

/// `ABTI_pool_set_reader`. `Prw` falls through into the `PR_*` check-and-set
/// after its extra writer check, matching the source's `switch`
/// fall-through exactly (§4.2, §9).
fn set_reader(pool: &Pool, es: EsId) -> CoreResult<()> {
    match pool.access {
        AccessMode::Prw => {
            let writer = pool.writer.load(Ordering::Relaxed);
            if writer != 0 && writer != es.as_u64() {
                kdebug!("set_reader: PRW writer mismatch");
                return Err(CoreError::InvalidPoolAccess);
            }
            set_reader_raw(pool, es.as_u64())
        }
        AccessMode::PrPw | AccessMode::PrSw => set_reader_raw(pool, es.as_u64()),
        AccessMode::SrPw | AccessMode::SrSw => {
            pool.reader.store(es.as_u64(), Ordering::Relaxed);
            Ok(())
        }
    }
}

fn set_reader_raw(pool: &Pool, es_raw: u64) -> CoreResult<()> {
    let reader = pool.reader.load(Ordering::Relaxed);
    if reader != 0 && reader != es_raw {
        kdebug!("set_reader: reader mismatch");
        return Err(CoreError::InvalidPoolAccess);
    }
    pool.reader.store(es_raw, Ordering::Relaxed);
    Ok(())
}

/// `ABTI_pool_set_writer`. `Prw` falls through into the `PR_PW`/`SR_PW`
/// check-and-set after its extra reader check, matching the source (§4.2,
/// §9).
fn set_writer(pool: &Pool, es: EsId) -> CoreResult<()> {
    match pool.access {
        AccessMode::Prw => {
            let reader = pool.reader.load(Ordering::Relaxed);
            if reader != 0 && reader != es.as_u64() {
                kdebug!("set_writer: PRW reader mismatch");
                return Err(CoreError::InvalidPoolAccess);
            }
            set_writer_raw(pool, es.as_u64())
        }
        AccessMode::PrPw | AccessMode::SrPw => set_writer_raw(pool, es.as_u64()),
        AccessMode::PrSw | AccessMode::SrSw => {
            pool.writer.store(es.as_u64(), Ordering::Relaxed);
            Ok(())
        }
    }
}

fn set_writer_raw(pool: &Pool, es_raw: u64) -> CoreResult<()> {
    let writer = pool.writer.load(Ordering::Relaxed);
    if writer != 0 && writer != es_raw {
        kdebug!("set_writer: writer mismatch");
        return Err(CoreError::InvalidPoolAccess);
    }
    pool.writer.store(es_raw, Ordering::Relaxed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prw_pool() -> PoolHandle {
        PoolHandle::create_basic(PoolKind::Fifo, AccessMode::Prw).unwrap()
    }

    #[test]
    fn test_null_ops_fail() {
        let h = PoolHandle::NULL;
        assert_eq!(h.get_size(), Err(CoreError::InvalidPool));
        assert_eq!(h.push(Unit::new(1)), Err(CoreError::InvalidPool));
    }

    #[test]
    fn test_push_pop_fifo_order() {
        let pool = prw_pool();
        pool.push(Unit::new(1)).unwrap();
        pool.push(Unit::new(2)).unwrap();
        assert_eq!(pool.pop().unwrap(), Unit::new(1));
        assert_eq!(pool.pop().unwrap(), Unit::new(2));
        assert_eq!(pool.pop().unwrap(), Unit::NULL);
    }

    #[test]
    fn test_total_size_includes_blocked_and_migrations() {
        let pool = prw_pool();
        pool.push(Unit::new(1)).unwrap();
        pool.inc_num_blocked().unwrap();
        pool.inc_num_migrations().unwrap();
        assert_eq!(pool.get_total_size().unwrap(), 3);
    }

    #[test]
    fn test_retain_release_tracks_num_scheds() {
        let mut pool = prw_pool();
        pool.retain().unwrap();
        assert!(pool.free().is_err());
        pool.release().unwrap();
        assert!(pool.free().is_ok());
        assert!(pool.is_null());
    }

    #[test]
    fn test_release_below_zero_is_invalid_pool() {
        let pool = prw_pool();
        assert_eq!(pool.release(), Err(CoreError::InvalidPool));
    }

    #[test]
    fn test_prw_writer_bound_by_other_es_rejected() {
        let pool = prw_pool();
        pool.push(Unit::new(1)).unwrap(); // binds writer to this thread
        std::thread::spawn(move || {
            assert_eq!(pool.push(Unit::new(2)), Err(CoreError::InvalidPoolAccess));
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_sr_sw_allows_any_es() {
        let pool = PoolHandle::create_basic(PoolKind::Fifo, AccessMode::SrSw).unwrap();
        pool.push(Unit::new(1)).unwrap();
        std::thread::spawn(move || {
            pool.push(Unit::new(2)).unwrap();
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_accept_migration_sw_always_true() {
        let dst = PoolHandle::create_basic(PoolKind::Fifo, AccessMode::PrSw).unwrap();
        let src = prw_pool();
        assert!(dst.accept_migration(&src).unwrap());
    }

    #[test]
    fn test_accept_migration_pw_requires_matching_es() {
        let dst = prw_pool();
        let src = prw_pool();
        // neither pool has a bound reader/writer yet
        assert!(!dst.accept_migration(&src).unwrap());
        dst.push(Unit::new(1)).unwrap(); // binds dst.writer to this ES
        dst.remove(Unit::new(1)).unwrap(); // binds dst.reader to this ES too
        src.push(Unit::new(1)).unwrap(); // binds src.writer to this ES
        assert!(dst.accept_migration(&src).unwrap());
    }

    #[test]
    fn test_admit_sched_pr_requires_reader_bound() {
        let pool = prw_pool();
        assert_eq!(pool.admit_sched(&[]), Err(CoreError::Pool));
        pool.push(Unit::new(1)).unwrap();
        pool.remove(Unit::new(1)).unwrap(); // bind reader
        assert!(pool.admit_sched(&[]).is_ok());
    }

    #[test]
    fn test_admit_sched_sr_rejects_private_sibling() {
        let pool = PoolHandle::create_basic(PoolKind::Fifo, AccessMode::SrSw).unwrap();
        let sibling = prw_pool();
        assert_eq!(pool.admit_sched(&[sibling]), Err(CoreError::Pool));
    }

    struct RecordingOps {
        inner: FifoQueue,
        seen_config: Mutex<Option<i32>>,
    }

    impl PoolOps for RecordingOps {
        fn push(&self, unit: Unit) {
            self.inner.push(unit);
        }
        fn pop(&self) -> Option<Unit> {
            self.inner.pop()
        }
        fn remove(&self, unit: Unit) -> CoreResult<()> {
            self.inner.remove(unit)
        }
        fn get_size(&self) -> usize {
            self.inner.get_size()
        }
        fn init(&self, pool: &PoolHandle, config: Option<&(dyn Any + Send + Sync)>) {
            assert!(!pool.is_null());
            *self.seen_config.lock().unwrap() = config.and_then(|c| c.downcast_ref::<i32>().copied());
        }
    }

    #[test]
    fn test_create_custom_runs_init_with_config() {
        let vtable = Arc::new(RecordingOps {
            inner: FifoQueue::new(),
            seen_config: Mutex::new(None),
        });
        let config: Box<dyn Any + Send + Sync> = Box::new(7i32);
        let _pool = PoolHandle::create_custom(vtable.clone(), AccessMode::Prw, Some(config));
        assert_eq!(*vtable.seen_config.lock().unwrap(), Some(7));
    }

    #[test]
    fn test_create_custom_defaults_not_automatic() {
        let vtable = Arc::new(FifoQueue::new());
        let pool = PoolHandle::create_custom(vtable, AccessMode::Prw, None);
        assert!(!pool.is_automatic().unwrap());
    }

    #[test]
    fn test_create_basic_is_automatic() {
        let pool = prw_pool();
        assert!(pool.is_automatic().unwrap());
    }
}
