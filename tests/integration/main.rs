//! Integration tests for Sumi-Recrawl

mod common;
mod crawl_tests;
mod queue_tests;
