//! Pointer descriptors: generated code must call copy/free exactly as often as
//! ownership requires. Every test compiles small functions, runs them, and
//! checks callback counts.

use std::ffi::c_void;
use std::sync::Arc;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};

use weft_codegen::{JitContext, PointerDescriptor, TypeDescriptor, ValueHandle};

const DEFAULT_PAYLOAD: u64 = 0xD5;

type SlotFn = extern "C" fn(*mut *mut c_void);
type TwoSlotFn = extern "C" fn(*mut *mut c_void, *mut *mut c_void);

#[derive(Default)]
struct Counters {
    copies: AtomicUsize,
    frees: AtomicUsize,
    defaults: AtomicUsize,
    live: AtomicIsize,
}

impl Counters {
    fn copies(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }
    fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }
    fn defaults(&self) -> usize {
        self.defaults.load(Ordering::SeqCst)
    }
    fn live(&self) -> isize {
        self.live.load(Ordering::SeqCst)
    }
}

fn counting_descriptor(counters: &Arc<Counters>) -> PointerDescriptor {
    let (on_copy, on_free, on_default) = (counters.clone(), counters.clone(), counters.clone());
    PointerDescriptor::new(
        move |ptr| {
            on_copy.copies.fetch_add(1, Ordering::SeqCst);
            on_copy.live.fetch_add(1, Ordering::SeqCst);
            let payload = unsafe { *ptr.cast::<u64>() };
            Box::into_raw(Box::new(payload)).cast()
        },
        move |ptr| {
            on_free.frees.fetch_add(1, Ordering::SeqCst);
            on_free.live.fetch_sub(1, Ordering::SeqCst);
            drop(unsafe { Box::from_raw(ptr.cast::<u64>()) });
        },
        move || {
            on_default.defaults.fetch_add(1, Ordering::SeqCst);
            on_default.live.fetch_add(1, Ordering::SeqCst);
            Box::into_raw(Box::new(DEFAULT_PAYLOAD)).cast()
        },
    )
    .with_label("counted")
}

fn payload(ptr: *mut c_void) -> u64 {
    unsafe { *ptr.cast::<u64>() }
}

fn fn_ptr<F>(jit: &JitContext, name: &str) -> F {
    let ptr = jit.get_function_ptr(name).unwrap();
    assert_eq!(size_of::<F>(), size_of::<*const u8>());
    unsafe { std::mem::transmute_copy(&ptr) }
}

#[test]
fn default_relocate_copy_free_scenario() {
    let counters = Arc::new(Counters::default());
    let desc = counting_descriptor(&counters);
    let mut jit = JitContext::new();
    let ptr_ty = jit.pointer_type();

    jit.build_function("init", &[ptr_ty], &[], |cg, params| {
        let value = desc.emit_default(cg)?;
        desc.emit_store_relocate(cg, value, params[0])?;
        Ok(vec![])
    })
    .unwrap();
    jit.build_function("dup_and_drop", &[ptr_ty], &[], |cg, params| {
        let dup = desc.emit_load_copy(cg, params[0])?;
        desc.emit_free(cg, dup)?;
        Ok(vec![])
    })
    .unwrap();
    jit.build_function("take_and_drop", &[ptr_ty], &[], |cg, params| {
        let owned = desc.emit_load_relocate(cg, params[0])?;
        desc.emit_free(cg, owned)?;
        Ok(vec![])
    })
    .unwrap();
    jit.finalize().unwrap();

    let init: SlotFn = fn_ptr(&jit, "init");
    let dup_and_drop: SlotFn = fn_ptr(&jit, "dup_and_drop");
    let take_and_drop: SlotFn = fn_ptr(&jit, "take_and_drop");

    let mut slot: *mut c_void = std::ptr::null_mut();

    init(&mut slot);
    assert_eq!(counters.defaults(), 1);
    assert_eq!((counters.copies(), counters.frees()), (0, 0));
    assert!(!slot.is_null());
    assert_eq!(payload(slot), DEFAULT_PAYLOAD);

    let stored = slot;
    dup_and_drop(&mut slot);
    assert_eq!((counters.copies(), counters.frees()), (1, 1));
    assert_eq!(slot, stored);
    assert_eq!(payload(slot), DEFAULT_PAYLOAD);

    take_and_drop(&mut slot);
    assert_eq!(counters.frees(), 2);
    assert_eq!(counters.defaults() + counters.copies(), counters.frees());
    assert_eq!(counters.live(), 0);
}

#[test]
fn copy_then_free_both_releases_each_once() {
    let counters = Arc::new(Counters::default());
    let desc = counting_descriptor(&counters);
    let mut jit = JitContext::new();
    let ptr_ty = jit.pointer_type();

    jit.build_function("copy_free_both", &[ptr_ty], &[], |cg, params| {
        let original = desc.emit_load_relocate(cg, params[0])?;
        let duplicate = desc.emit_copy(cg, &original)?;
        desc.emit_free(cg, original)?;
        desc.emit_free(cg, duplicate)?;
        Ok(vec![])
    })
    .unwrap();
    jit.finalize().unwrap();
    let copy_free_both: SlotFn = fn_ptr(&jit, "copy_free_both");

    counters.live.fetch_add(1, Ordering::SeqCst);
    let mut slot: *mut c_void = Box::into_raw(Box::new(42u64)).cast();

    copy_free_both(&mut slot);
    assert_eq!(counters.copies(), 1);
    assert_eq!(counters.frees(), 2);
    assert_eq!(counters.live(), 0);
}

#[test]
fn store_copy_gives_destination_its_own_instance() {
    let counters = Arc::new(Counters::default());
    let desc = counting_descriptor(&counters);
    let mut jit = JitContext::new();
    let ptr_ty = jit.pointer_type();

    jit.build_function("copy_slot", &[ptr_ty, ptr_ty], &[], |cg, params| {
        let value = desc.emit_load_copy(cg, params[0])?;
        desc.emit_store_copy(cg, &value, params[1])?;
        desc.emit_free(cg, value)?;
        Ok(vec![])
    })
    .unwrap();
    jit.build_function("drop_slot", &[ptr_ty], &[], |cg, params| {
        let value = desc.emit_load_relocate(cg, params[0])?;
        desc.emit_free(cg, value)?;
        Ok(vec![])
    })
    .unwrap();
    jit.finalize().unwrap();
    let copy_slot: TwoSlotFn = fn_ptr(&jit, "copy_slot");
    let drop_slot: SlotFn = fn_ptr(&jit, "drop_slot");

    counters.live.fetch_add(1, Ordering::SeqCst);
    let mut src: *mut c_void = Box::into_raw(Box::new(7u64)).cast();
    let mut dst: *mut c_void = std::ptr::null_mut();

    copy_slot(&mut src, &mut dst);
    assert_eq!(counters.copies(), 2);
    assert_eq!(counters.frees(), 1);
    assert_ne!(src, dst);
    assert_eq!(payload(src), 7);
    assert_eq!(payload(dst), 7);

    drop_slot(&mut src);
    drop_slot(&mut dst);
    assert_eq!(counters.live(), 0);
}

#[test]
fn relocation_moves_bits_without_calls() {
    let counters = Arc::new(Counters::default());
    let desc = counting_descriptor(&counters);
    let mut jit = JitContext::new();
    let ptr_ty = jit.pointer_type();

    jit.build_function("move_slot", &[ptr_ty, ptr_ty], &[], |cg, params| {
        let value = desc.emit_load_relocate(cg, params[0])?;
        desc.emit_store_relocate(cg, value, params[1])?;
        Ok(vec![])
    })
    .unwrap();
    jit.build_function("publish", &[ptr_ty, ptr_ty], &[], |cg, params| {
        desc.emit_store_relocate(cg, ValueHandle::scalar(params[0]), params[1])?;
        Ok(vec![])
    })
    .unwrap();
    jit.finalize().unwrap();
    let move_slot: TwoSlotFn = fn_ptr(&jit, "move_slot");
    let publish: extern "C" fn(*mut c_void, *mut *mut c_void) = fn_ptr(&jit, "publish");

    let value: *mut c_void = Box::into_raw(Box::new(9u64)).cast();
    let mut first: *mut c_void = std::ptr::null_mut();
    let mut second: *mut c_void = std::ptr::null_mut();

    publish(value, &mut first);
    move_slot(&mut first, &mut second);
    assert_eq!(first, value);
    assert_eq!(second, value);
    assert_eq!((counters.copies(), counters.frees()), (0, 0));

    drop(unsafe { Box::from_raw(value.cast::<u64>()) });
}

#[test]
fn boxed_float_list_copies_are_independent() {
    use weft_runtime::alloc_track::{enable_tracking, live_count};
    use weft_runtime::{TYPE_FLOAT_LIST, boxed_ref, new_boxed, take_boxed};

    enable_tracking();
    let before = live_count(TYPE_FLOAT_LIST);
    let desc = PointerDescriptor::boxed::<Vec<f32>>(TYPE_FLOAT_LIST);
    let mut jit = JitContext::new();
    let ptr_ty = jit.pointer_type();

    jit.build_function("clone_into", &[ptr_ty, ptr_ty], &[], |cg, params| {
        let value = desc.emit_load_copy(cg, params[0])?;
        desc.emit_store_relocate(cg, value, params[1])?;
        Ok(vec![])
    })
    .unwrap();
    jit.finalize().unwrap();
    let clone_into: TwoSlotFn = fn_ptr(&jit, "clone_into");

    let mut src = new_boxed(TYPE_FLOAT_LIST, vec![0.5f32, 1.5]);
    let mut dst: *mut c_void = std::ptr::null_mut();
    clone_into(&mut src, &mut dst);
    assert_eq!(live_count(TYPE_FLOAT_LIST), before + 2);

    let mut cloned = take_boxed::<Vec<f32>>(TYPE_FLOAT_LIST, dst).unwrap();
    cloned.push(2.5);
    assert_eq!(
        unsafe { boxed_ref::<Vec<f32>>(src) }.unwrap(),
        &vec![0.5, 1.5]
    );

    take_boxed::<Vec<f32>>(TYPE_FLOAT_LIST, src).unwrap();
    assert_eq!(live_count(TYPE_FLOAT_LIST), before);
}
