//! Skill-gap analysis: requirement matching, prioritisation and the phased roadmap.

pub mod config;
pub mod engine;
pub mod handlers;
pub mod matching;
pub mod models;
pub mod narrative;
pub mod pipeline;
pub mod prompts;
pub mod roadmap;
