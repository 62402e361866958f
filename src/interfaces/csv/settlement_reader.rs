use crate::application::orders::SettlementRow;
use crate::error::{OrderError, Result};
use std::io::Read;

/// Reads the gateway's settlement export.
///
/// Expects a header row of `tx_ref, amount, method`. Whitespace around
/// fields is trimmed.
pub struct SettlementReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> SettlementReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes rows; a malformed row yields an error and the
    /// iterator carries on with the next one.
    pub fn rows(self) -> impl Iterator<Item = Result<SettlementRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(OrderError::from))
    }
}
