//! Invocation of user-supplied functions.

use crate::traits::{RddError, RddId, RddResult, TransformKind};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Runs `f` on behalf of RDD `rdd_id`, turning both a returned error and a
/// panic into [`RddError::Transformation`] attributed to `partition`.
pub(crate) fn run_user_fn<R>(
    rdd_id: RddId,
    kind: TransformKind,
    partition: usize,
    f: impl FnOnce() -> anyhow::Result<R>,
) -> RddResult<R> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(anyhow::anyhow!("panicked: {}", panic_message(&*payload))));

    outcome.map_err(|source| RddError::Transformation {
        rdd_id,
        kind,
        partition,
        source,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_passes_through() {
        let value = run_user_fn(1, TransformKind::Map, 0, || Ok(5)).unwrap();
        assert_eq!(value, 5);
    }

    #[test]
    fn test_error_is_attributed() {
        let err = run_user_fn::<()>(4, TransformKind::Filter, 3, || anyhow::bail!("nope"))
            .unwrap_err();
        match err {
            RddError::Transformation {
                rdd_id,
                kind,
                partition,
                source,
            } => {
                assert_eq!((rdd_id, kind, partition), (4, TransformKind::Filter, 3));
                assert_eq!(source.to_string(), "nope");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_panic_is_caught() {
        let err = run_user_fn::<()>(2, TransformKind::Map, 1, || panic!("bad record {}", 7))
            .unwrap_err();
        assert_eq!(err.partition(), Some(1));
        assert!(err.to_string().contains("panicked: bad record 7"));
    }
}
