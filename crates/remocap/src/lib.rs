#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use remocap_core as geometry;

#[doc(inline)]
pub use remocap_repair as repair;
