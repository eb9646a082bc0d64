//! Property tests over the pointer table and collector, independent of any
//! particular mutator program shape.

use proptest::prelude::*;
use std::collections::HashSet;
use tgc::{Collector, Flags};

proptest! {
    /// Round-trip insert/lookup: every address tracked via `alloc_opt`
    /// reports back the same flags until explicitly freed.
    #[test]
    fn round_trip_insert_lookup(n in 1usize..200) {
        let anchor = 0usize;
        let mut gc = Collector::start(&anchor);
        let mut tracked = Vec::new();
        for i in 0..n {
            let size = 8 + (i % 5) * 8;
            let flags = if i % 7 == 0 { Flags::ROOT } else { Flags::empty() };
            let p = gc.alloc_opt(size, flags, None).unwrap();
            tracked.push((p, flags));
        }
        for (p, flags) in &tracked {
            prop_assert_eq!(gc.get_flags(*p), *flags);
        }
        for (p, _) in tracked {
            gc.free(Some(p));
        }
        prop_assert_eq!(gc.len(), 0);
    }

    /// No duplicates: across an interleaved sequence of inserts, removes
    /// and collections, the live set never contains the same base address
    /// twice.
    #[test]
    fn no_duplicate_bases(ops in prop::collection::vec(0usize..3, 1..300)) {
        let anchor = 0usize;
        let mut gc = Collector::start(&anchor);
        let mut live: Vec<std::ptr::NonNull<u8>> = Vec::new();
        for op in ops {
            match op {
                0 => {
                    if let Some(p) = gc.alloc_opt(8, Flags::ROOT, None) {
                        live.push(p);
                    }
                }
                1 => {
                    if !live.is_empty() {
                        let idx = live.len() / 2;
                        let p = live.remove(idx);
                        gc.free(Some(p));
                    }
                }
                _ => gc.run(),
            }
        }
        let mut seen = HashSet::new();
        for p in &live {
            prop_assert!(seen.insert(p.as_ptr() as usize), "duplicate base address in live set");
        }
        prop_assert_eq!(seen.len(), gc.len());
        for p in live {
            gc.free(Some(p));
        }
    }

    /// No false frees: a collection cycle never changes the tracked set
    /// when every block is reachable from a root.
    #[test]
    fn no_false_frees_when_everything_is_rooted(n in 1usize..100) {
        let anchor = 0usize;
        let mut gc = Collector::start(&anchor);
        for _ in 0..n {
            gc.alloc_opt(8, Flags::ROOT, None).unwrap();
        }
        let before = gc.len();
        gc.run();
        prop_assert_eq!(gc.len(), before);
    }

    /// Every block handed back by `alloc` remains independently lookupable
    /// until freed. A lookup miss here would mean the min/max pre-filter (or
    /// the table itself) silently dropped a live block.
    #[test]
    fn every_allocated_block_stays_lookupable(n in 1usize..150) {
        let anchor = 0usize;
        let mut gc = Collector::start(&anchor);
        let mut ptrs = Vec::new();
        for _ in 0..n {
            ptrs.push(gc.alloc_opt(8, Flags::ROOT, None).unwrap());
        }
        for p in &ptrs {
            prop_assert!(gc.get_flags(*p).contains(Flags::ROOT));
        }
        for p in ptrs {
            gc.free(Some(p));
        }
    }

}

/// No false retains: dropping the only pointer to a subtree makes that
/// whole subtree, and only that subtree, disappear on the next cycle.
#[test]
fn dropping_a_subtree_reference_collects_exactly_that_subtree() {
    let anchor = 0usize;
    let mut gc = Collector::start(&anchor);

    let root = gc.alloc_opt(std::mem::size_of::<usize>() * 2, Flags::ROOT, None).unwrap();
    let kept_child = gc.alloc(std::mem::size_of::<usize>()).unwrap();
    let dropped_child = gc.alloc(std::mem::size_of::<usize>()).unwrap();
    let grandchild = gc.alloc(8).unwrap();
    unsafe {
        *(dropped_child.as_ptr() as *mut usize) = grandchild.as_ptr() as usize;
        let slots = root.as_ptr() as *mut usize;
        *slots = kept_child.as_ptr() as usize;
        *slots.add(1) = dropped_child.as_ptr() as usize;
    }

    gc.run();
    assert_eq!(gc.len(), 4, "every block is still reachable from root");

    unsafe {
        let slots = root.as_ptr() as *mut usize;
        *slots.add(1) = 0;
    }
    let scratch = [0usize; 64];
    std::hint::black_box(scratch);

    gc.run();
    assert_eq!(gc.len(), 2, "dropped_child and grandchild must both be collected");
    let _ = kept_child;
}
