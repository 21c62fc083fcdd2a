mod common;

use common::{RAM_BASE, frame};
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress};
use kernel_vm::VmError;
use proptest::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn released_run_is_reused_first_fit() {
    let frames = common::frames(5);
    let a = frames.acquire(3).unwrap();
    let b = frames.acquire(2).unwrap();
    assert_eq!(a, frame(0));
    assert_eq!(b, frame(3));

    frames.release(a).unwrap();
    assert_eq!(frames.acquire(3).unwrap(), a);
    assert_eq!(frames.free_frames(), Some(0));
}

#[test]
fn exhausted_directory_reports_out_of_memory() {
    let frames = common::frames(4);
    frames.acquire(3).unwrap();
    assert_eq!(frames.acquire(2), Err(VmError::OutOfMemory));
    assert_eq!(frames.acquire(1), Ok(frame(3)));
    assert_eq!(frames.acquire(1), Err(VmError::OutOfMemory));
}

#[test]
fn fragmentation_blocks_large_runs() {
    let frames = common::frames(6);
    let runs: Vec<_> = (0..6).map(|_| frames.acquire(1).unwrap()).collect();
    for pa in runs.iter().step_by(2) {
        frames.release(*pa).unwrap();
    }
    assert_eq!(frames.free_frames(), Some(3));
    assert_eq!(frames.acquire(2), Err(VmError::OutOfMemory));
}

#[test]
fn release_of_mid_run_frame_frees_nothing() {
    let frames = common::frames(4);
    let base = frames.acquire(4).unwrap();
    assert_eq!(frames.release(frame(2)), Err(VmError::InvalidArgument));
    assert_eq!(frames.free_frames(), Some(0));
    frames.release(base).unwrap();
    assert_eq!(frames.free_frames(), Some(4));
}

#[test]
fn releasing_null_is_a_no_op() {
    let frames = common::frames(2);
    frames.acquire(2).unwrap();
    assert_eq!(frames.release(PhysicalAddress::zero()), Ok(()));
    assert_eq!(frames.free_frames(), Some(0));
}

#[test]
fn run_heads_are_recorded_in_the_directory() {
    let frames = common::frames(8);
    frames.acquire(2).unwrap();
    frames.acquire(3).unwrap();
    let runs: Vec<_> = frames
        .with_directory_ref(|dir| dir.runs().collect::<Vec<_>>())
        .unwrap();
    assert_eq!(runs, [(frame(0), 2), (frame(2), 3)]);
}

#[test]
fn concurrent_acquire_and_release_never_overlap() {
    const THREADS: usize = 8;
    const OPS: usize = 2000;
    const TOTAL: usize = 256;

    let frames = Arc::new(common::frames(TOTAL));
    let start = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let frames = Arc::clone(&frames);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                let mut held: Vec<(PhysicalAddress, u32)> = Vec::new();
                for i in 0..OPS {
                    let npages = 1 + ((t * 7 + i * 3) % 5) as u32;
                    let give_back = i % 3 == 2 || held.len() >= 6;
                    if give_back && !held.is_empty() {
                        let (base, _) = held.swap_remove(i % held.len());
                        frames.release(base).unwrap();
                        continue;
                    }
                    match frames.acquire(npages) {
                        Ok(base) => held.push((base, npages)),
                        Err(VmError::OutOfMemory) => {}
                        Err(e) => panic!("unexpected {e}"),
                    }
                }
                held
            })
        })
        .collect();

    let mut held: Vec<(PhysicalAddress, u32)> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    held.sort_unstable();

    for pair in held.windows(2) {
        let (a, n) = pair[0];
        assert!(
            a.as_u32() + n * PAGE_SIZE <= pair[1].0.as_u32(),
            "{a:?}+{n} overlaps {:?}",
            pair[1].0
        );
    }

    let runs: Vec<_> = frames
        .with_directory_ref(|dir| dir.runs().collect::<Vec<_>>())
        .unwrap();
    assert_eq!(runs, held);

    let used: usize = held.iter().map(|&(_, n)| n as usize).sum();
    assert_eq!(frames.free_frames().unwrap() + used, TOTAL);
}

fn longest_free_run(frames: &kernel_vm::FrameAllocator) -> u32 {
    frames
        .with_directory_ref(|dir| {
            let mut best = 0;
            let mut cur = 0;
            for e in dir.entries() {
                cur = if e.in_use() { 0 } else { cur + 1 };
                best = best.max(cur);
            }
            best
        })
        .unwrap()
}

proptest! {
    #[test]
    fn live_runs_are_disjoint_and_exact(ops in prop::collection::vec((any::<bool>(), 1u32..6), 1..64)) {
        const FRAMES: u32 = 32;
        let frames = common::frames(FRAMES as usize);
        let mut live: Vec<(u32, u32)> = Vec::new();

        for (acquire, n) in ops {
            if acquire || live.is_empty() {
                match frames.acquire(n) {
                    Ok(pa) => {
                        let start = pa.as_u32();
                        let end = start + n * PAGE_SIZE;
                        prop_assert!(start >= RAM_BASE && end <= RAM_BASE + FRAMES * PAGE_SIZE);
                        for &(s, e) in &live {
                            prop_assert!(end <= s || start >= e, "{start:#x}..{end:#x} overlaps {s:#x}..{e:#x}");
                        }
                        live.push((start, end));
                    }
                    Err(e) => {
                        prop_assert_eq!(e, VmError::OutOfMemory);
                        prop_assert!(longest_free_run(&frames) < n);
                    }
                }
            } else {
                let (start, _) = live.remove(n as usize % live.len());
                prop_assert_eq!(frames.release(PhysicalAddress::new(start)), Ok(()));
            }
        }

        let used: u32 = live.iter().map(|(s, e)| (e - s) / PAGE_SIZE).sum();
        prop_assert_eq!(frames.free_frames().unwrap() as u32 + used, FRAMES);
    }
}
