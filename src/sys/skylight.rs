// credits
// https://github.com/asmagill/hs._asm.undocumented.spaces/blob/master/CGSSpace.h.
// https://github.com/koekeishiya/yabai/blob/d55a647913ab72d8d8b348bee2d3e59e52ce4a5d/src/misc/extern.h.

use std::ffi::c_int;

use objc2_foundation::NSArray;
use once_cell::sync::Lazy;

pub static G_CONNECTION: Lazy<cid_t> = Lazy::new(|| unsafe { SLSMainConnectionID() });

#[allow(non_camel_case_types)]
pub type cid_t = i32;

unsafe extern "C" {
    pub fn SLSMainConnectionID() -> cid_t;

    /// Returns one dictionary per managed display, each with its `Spaces`
    /// array and `Current Space`. Follows the copy rule.
    pub fn CGSCopyManagedDisplaySpaces(cid: c_int) -> *mut NSArray;

    pub fn SLSGetSpaceManagementMode(cid: cid_t) -> c_int;
}

/// Whether "Displays have separate Spaces" is enabled. With it disabled the
/// window server reports a single pseudo display spanning every screen.
pub fn displays_have_separate_spaces() -> bool {
    unsafe { SLSGetSpaceManagementMode(*G_CONNECTION) == 1 }
}
