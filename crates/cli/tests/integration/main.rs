mod common;
mod merge_tests;
mod sync_tests;
