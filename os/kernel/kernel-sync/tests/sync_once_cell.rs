use kernel_sync::{OnceInitError, SpinLock, SyncOnceCell};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn empty_until_initialized() {
    let cell = SyncOnceCell::<u32>::new();
    assert!(cell.get().is_none());
    assert!(!cell.is_initialized());

    assert_eq!(cell.try_init(|| Ok::<_, ()>(7)), Ok(&7));
    assert!(cell.is_initialized());
    assert_eq!(cell.get(), Some(&7));
}

#[test]
fn try_init_refuses_second_initialization() {
    let cell = SyncOnceCell::new();
    assert_eq!(cell.try_init(|| Ok::<_, ()>(5)), Ok(&5));

    let mut ran = false;
    let second = cell.try_init(|| {
        ran = true;
        Ok::<_, ()>(6)
    });
    assert_eq!(second, Err(OnceInitError::AlreadyInitialized));
    assert!(!ran, "initializer must not run against an initialized cell");
    assert_eq!(cell.get(), Some(&5));
}

#[test]
fn failed_try_init_leaves_cell_empty() {
    let cell = SyncOnceCell::<u8>::new();
    assert_eq!(
        cell.try_init(|| Err("no memory")),
        Err(OnceInitError::Init("no memory"))
    );
    assert!(cell.get().is_none());

    // a later attempt may still succeed
    assert_eq!(cell.try_init(|| Ok::<_, &str>(9)), Ok(&9));
}

#[test]
fn error_messages() {
    let err: OnceInitError<&str> = OnceInitError::Init("bad chain");
    assert_eq!(err.to_string(), "initialization failed: bad chain");
    let err: OnceInitError<&str> = OnceInitError::AlreadyInitialized;
    assert_eq!(err.to_string(), "the cell is already initialized");
}

#[test]
fn static_cell_holding_a_lock() {
    static CELL: SyncOnceCell<SpinLock<u64>> = SyncOnceCell::new();

    let threads = 4;
    let start = Arc::new(Barrier::new(threads));
    let winners = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let start = Arc::clone(&start);
            let winners = Arc::clone(&winners);
            thread::spawn(move || {
                start.wait();
                if CELL.try_init(|| Ok::<_, ()>(SpinLock::new(i as u64))).is_ok() {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(winners.load(Ordering::SeqCst), 1);
    let lock = CELL.get().expect("one thread initialized the cell");
    lock.with_lock(|v| *v += 100);
    assert!(lock.with_lock(|v| *v) >= 100);
}
