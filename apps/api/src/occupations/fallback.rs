//! Ordered fallback chain: run named stages one at a time, first `Ok` wins.
//!
//! Stage futures are lazy, so later stages never start unless every earlier one
//! failed. Failures are kept (stage name + message) so callers can report which
//! stages were skipped over.

use std::fmt::Display;

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::debug;

pub struct Stage<'a, T, E> {
    pub name: &'static str,
    pub run: BoxFuture<'a, Result<T, E>>,
}

impl<'a, T, E> Stage<'a, T, E> {
    pub fn new(name: &'static str, run: BoxFuture<'a, Result<T, E>>) -> Self {
        Self { name, run }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageFailure {
    pub stage: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ChainOutcome<T> {
    pub value: T,
    pub stage: &'static str,
    pub failures: Vec<StageFailure>,
}

#[derive(Debug, Error)]
#[error("all {} fallback stages failed", failures.len())]
pub struct ChainExhausted {
    pub failures: Vec<StageFailure>,
}

pub async fn first_success<T, E: Display>(
    stages: Vec<Stage<'_, T, E>>,
) -> Result<ChainOutcome<T>, ChainExhausted> {
    let mut failures = Vec::new();
    for stage in stages {
        match stage.run.await {
            Ok(value) => {
                return Ok(ChainOutcome {
                    value,
                    stage: stage.name,
                    failures,
                })
            }
            Err(e) => {
                debug!("Fallback stage '{}' failed: {e}", stage.name);
                failures.push(StageFailure {
                    stage: stage.name,
                    message: e.to_string(),
                });
            }
        }
    }
    Err(ChainExhausted { failures })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_first_ok_wins_and_later_stages_never_run() {
        let ran_last = AtomicUsize::new(0);
        let stages: Vec<Stage<'_, u32, String>> = vec![
            Stage::new("cache", async { Err("miss".to_string()) }.boxed()),
            Stage::new("remote", async { Ok(7) }.boxed()),
            Stage::new(
                "mock",
                async {
                    ran_last.fetch_add(1, Ordering::SeqCst);
                    Ok(0)
                }
                .boxed(),
            ),
        ];

        let outcome = first_success(stages).await.unwrap();
        assert_eq!(outcome.value, 7);
        assert_eq!(outcome.stage, "remote");
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].stage, "cache");
        assert_eq!(ran_last.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exhausted_chain_reports_every_failure() {
        let stages: Vec<Stage<'_, u32, String>> = vec![
            Stage::new("a", async { Err("one".to_string()) }.boxed()),
            Stage::new("b", async { Err("two".to_string()) }.boxed()),
        ];
        let err = first_success(stages).await.unwrap_err();
        assert_eq!(err.failures.len(), 2);
        assert_eq!(err.failures[1].message, "two");
    }

    #[tokio::test]
    async fn test_empty_chain_is_exhausted() {
        let stages: Vec<Stage<'_, u32, String>> = vec![];
        assert!(first_success(stages).await.is_err());
    }
}
