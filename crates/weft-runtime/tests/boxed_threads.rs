//! Managed boxes are released from whichever thread owns them last; tracking
//! must balance across threads.

use weft_runtime::alloc_track::{delta, enable_tracking, is_enabled, live_count, snapshot};
use weft_runtime::{copy_boxed, free_boxed, new_boxed};

const SLOT: u32 = 11;

#[test]
fn copies_freed_on_other_threads_balance() {
    enable_tracking();
    assert!(is_enabled());
    let snap = snapshot();
    let before = live_count(SLOT);

    let original = new_boxed(SLOT, String::from("weft"));
    let copies: Vec<usize> = (0..8)
        .map(|_| copy_boxed::<String>(SLOT, original) as usize)
        .collect();
    assert_eq!(live_count(SLOT), before + 9);
    assert_eq!(delta(snap), 9);

    std::thread::scope(|scope| {
        for &copy in &copies {
            scope.spawn(move || free_boxed::<String>(SLOT, copy as *mut _));
        }
    });

    free_boxed::<String>(SLOT, original);
    assert_eq!(live_count(SLOT), before);
    assert_eq!(delta(snap), 0);
}
