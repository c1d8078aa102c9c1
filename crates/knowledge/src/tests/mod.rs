//! Searcher tests against scripted adapters.

mod mocks;
mod searcher;
