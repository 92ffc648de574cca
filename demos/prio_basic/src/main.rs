//! Basic priority scheduler example
//!
//! Demonstrates two FIFO pools stacked behind a single priority scheduler:
//! work pushed onto the high-priority pool always drains before the low
//! one, even though the low pool was filled first.

use esched::{
    AccessMode, CoreResult, PoolHandle, PoolKind, PrioSchedConfig, SchedHandle, SchedHost,
    SchedKind, Unit,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Maps the opaque [`Unit`] ids pushed onto a pool back to the closure each
/// one represents. The pool/scheduler core only ever moves `Unit` values
/// around; resolving what a unit actually *runs* is left to whatever owns
/// execution streams, which here is just this demo.
struct WorkRegistry {
    next_id: AtomicU64,
    jobs: Mutex<HashMap<u64, Box<dyn FnMut() + Send>>>,
}

impl WorkRegistry {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    fn spawn(&self, pool: &PoolHandle, job: impl FnMut() + Send + 'static) -> CoreResult<Unit> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.jobs.lock().unwrap().insert(id, Box::new(job));
        let unit = Unit::new(id);
        pool.push(unit)?;
        Ok(unit)
    }

    fn run(&self, unit: Unit) {
        if let Some(mut job) = self.jobs.lock().unwrap().remove(&unit.as_u64()) {
            job();
        }
    }
}

struct DemoHost {
    registry: WorkRegistry,
    completed: Arc<AtomicUsize>,
    total: usize,
}

impl SchedHost for DemoHost {
    fn has_to_stop(&self) -> bool {
        self.completed.load(Ordering::SeqCst) >= self.total
    }

    fn check_events(&self) {}

    fn run_unit(&self, unit: Unit, _pool: &PoolHandle) {
        self.registry.run(unit);
    }
}

fn main() {
    println!("=== Priority Scheduler Basic Example ===\n");

    let config = PrioSchedConfig::new().event_freq(1).sleep_time(None);

    let high = PoolHandle::create_basic(PoolKind::Fifo, AccessMode::Prw).unwrap();
    let low = PoolHandle::create_basic(PoolKind::Fifo, AccessMode::Prw).unwrap();

    let sched = SchedHandle::new(vec![high.clone(), low.clone()], SchedKind::Task, &config).unwrap();

    let completed = Arc::new(AtomicUsize::new(0));
    let host = DemoHost {
        registry: WorkRegistry::new(),
        completed: completed.clone(),
        total: 3,
    };

    println!("Spawning work onto the low-priority pool...\n");
    let c1 = completed.clone();
    host.registry
        .spawn(&low, move || {
            println!("[low-1] running");
            c1.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let c2 = completed.clone();
    host.registry
        .spawn(&low, move || {
            println!("[low-2] running");
            c2.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    println!("Spawning work onto the high-priority pool...\n");
    let c3 = completed.clone();
    host.registry
        .spawn(&high, move || {
            println!("[high-1] running");
            c3.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    sched.run(&host).unwrap();

    println!(
        "\n{}/{} units ran; high-priority pool drained first even though it was filled last ({} left on the low pool)",
        completed.load(Ordering::SeqCst),
        host.total,
        low.get_size().unwrap()
    );

    sched.free().unwrap();
    println!("\n=== Example Complete ===");
}
