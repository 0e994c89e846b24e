use std::future::Future;

use crate::errors::Result;

/// Run `per_item` over every item, one after the other, and keep one result
/// per input in input order. A failed item does not stop the rest.
pub async fn fan_out<I, T, F, Fut>(items: &[I], mut per_item: F) -> Vec<Result<T>>
where
    F: FnMut(usize, &I) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut out = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let res = per_item(idx, item).await;
        if let Err(e) = &res {
            tracing::warn!(item = idx + 1, error = %e, "fan-out item failed");
        }
        out.push(res);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ArtefactError;

    #[tokio::test]
    async fn preserves_order_and_isolates_failures() {
        let steps = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let results = fan_out(&steps, |idx, s| {
            let s = s.clone();
            async move {
                if idx == 1 {
                    Err(ArtefactError::Provider("boom".into()))
                } else {
                    Ok(s.to_uppercase())
                }
            }
        })
        .await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_deref().unwrap(), "A");
        assert!(results[1].is_err());
        assert_eq!(results[2].as_deref().unwrap(), "C");
    }

    #[tokio::test]
    async fn empty_input_yields_nothing() {
        let steps: Vec<String> = Vec::new();
        let results = fan_out(&steps, |_, _| async { Ok(()) }).await;
        assert!(results.is_empty());
    }
}
