use crate::explorer::transport::GenerateError;

/// Runs the streaming attempt first; any failure there is discarded and the
/// buffered attempt runs instead. Partial text from a failed streaming
/// attempt is never kept. If the buffered attempt also fails, its error is
/// returned wrapped as `Exhausted` so callers see a single failure for the
/// whole generation.
pub(crate) fn resolve<S, B>(streaming: S, buffered: B) -> Result<String, GenerateError>
where
    S: FnOnce() -> Result<String, GenerateError>,
    B: FnOnce() -> Result<String, GenerateError>,
{
    match streaming() {
        Ok(text) => Ok(text),
        Err(err) => {
            tracing::warn!("streaming attempt failed, trying buffered: {err}");
            buffered().map_err(|buffered_err| GenerateError::Exhausted(Box::new(buffered_err)))
        }
    }
}
