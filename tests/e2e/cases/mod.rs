//! xsend end-to-end test cases

mod cancel;
mod failures;
mod resume;
mod transfer;
