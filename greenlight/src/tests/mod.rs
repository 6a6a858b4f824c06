mod dedup_tests;
mod roi_tests;
