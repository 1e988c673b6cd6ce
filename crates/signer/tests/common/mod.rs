pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::{csp_blob, public_key, sign, signed_document, test_key};
