use crate::error::DeckError;
use serde::{Serialize, Serializer, ser::SerializeStruct};
use std::future::Future;
use tracing::debug;

/// A single item that failed within a bulk call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    pub id: String,
    pub error: String,
}

/// Outcome of a bulk call: how many items went through and which did not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResult {
    pub success_count: usize,
    pub failures: Vec<BulkFailure>,
}

impl BulkResult {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn fail(&mut self, id: impl Into<String>, err: &DeckError) {
        self.failures.push(BulkFailure {
            id: id.into(),
            error: err.to_string(),
        });
    }

    /// Append the outcome of a later pass.
    pub fn absorb(&mut self, other: BulkResult) {
        self.success_count += other.success_count;
        self.failures.extend(other.failures);
    }
}

impl Serialize for BulkResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("BulkResult", 3)?;
        s.serialize_field("success", &self.is_success())?;
        s.serialize_field("success_count", &self.success_count)?;
        s.serialize_field("failures", &self.failures)?;
        s.end()
    }
}

/// Run `op` for every id in order. A failing item is recorded and the rest
/// still run.
pub async fn run_bulk<I, S, F, Fut>(ids: I, op: F) -> BulkResult
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<(), DeckError>>,
{
    run_bulk_with(ids.into_iter().map(Into::<String>::into), String::clone, op).await
}

/// [`run_bulk`] over arbitrary items; `id_of` names an item in the failure list.
pub async fn run_bulk_with<I, T, K, F, Fut>(items: I, id_of: K, mut op: F) -> BulkResult
where
    I: IntoIterator<Item = T>,
    K: Fn(&T) -> String,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<(), DeckError>>,
{
    let mut result = BulkResult::default();
    for item in items {
        let id = id_of(&item);
        match op(item).await {
            Ok(()) => result.success_count += 1,
            Err(e) => {
                debug!(id = %id, error = %e, "bulk item failed");
                result.fail(id, &e);
            }
        }
    }
    result
}
