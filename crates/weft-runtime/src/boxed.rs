// src/boxed.rs
//
// Heap-boxed managed values. Generated code only ever sees these as opaque
// pointers; the functions here are the host side of their copy/free/default
// callbacks. Every allocation and release is reported to alloc_track under
// the caller's runtime type id.

use std::ffi::c_void;

use crate::alloc_track;

/// Move `value` onto the heap and return it as an owned opaque pointer.
pub fn new_boxed<T>(type_id: u32, value: T) -> *mut c_void {
    alloc_track::track_alloc(type_id);
    Box::into_raw(Box::new(value)).cast()
}

/// Allocate a default-constructed `T`.
pub fn default_boxed<T: Default>(type_id: u32) -> *mut c_void {
    new_boxed(type_id, T::default())
}

/// Deep-copy the `T` behind `ptr` into a new, independently owned box.
/// A null pointer copies to null.
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub fn copy_boxed<T: Clone>(type_id: u32, ptr: *mut c_void) -> *mut c_void {
    if ptr.is_null() {
        return ptr;
    }
    // SAFETY: non-null pointers handed to this function were produced by
    // `new_boxed::<T>` and are still owned by the caller.
    let value = unsafe { &*ptr.cast::<T>() };
    new_boxed(type_id, value.clone())
}

/// Release the box behind `ptr`. Null is ignored.
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub fn free_boxed<T>(type_id: u32, ptr: *mut c_void) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: the caller transfers ownership of a pointer produced by
    // `new_boxed::<T>`; it is never used again after this call.
    drop(unsafe { Box::from_raw(ptr.cast::<T>()) });
    alloc_track::track_dealloc(type_id);
}

/// Take the value back out of its box, consuming ownership.
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub fn take_boxed<T>(type_id: u32, ptr: *mut c_void) -> Option<T> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: same contract as `free_boxed`.
    let boxed = unsafe { Box::from_raw(ptr.cast::<T>()) };
    alloc_track::track_dealloc(type_id);
    Some(*boxed)
}

/// Borrow the value behind `ptr`.
///
/// # Safety
///
/// `ptr` must be null or a live pointer produced by `new_boxed::<T>`, and it
/// must stay live for `'a`.
pub unsafe fn boxed_ref<'a, T>(ptr: *const c_void) -> Option<&'a T> {
    // SAFETY: upheld by the caller.
    unsafe { ptr.cast::<T>().as_ref() }
}
