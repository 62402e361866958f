use crate::domain::order::LedgerSummary;
use crate::error::Result;
use std::io::Write;

pub const HEADER: [&str; 6] = [
    "order",
    "total",
    "paid",
    "outstanding",
    "payment_status",
    "order_status",
];

/// Writes order ledger summaries as CSV.
pub struct LedgerWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> LedgerWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().has_headers(false).from_writer(sink),
        }
    }

    /// Writes the header followed by one row per summary.
    pub fn write_summaries(
        &mut self,
        summaries: impl IntoIterator<Item = LedgerSummary>,
    ) -> Result<()> {
        self.writer.write_record(HEADER)?;
        for summary in summaries {
            self.writer.write_record([
                summary.order.to_string(),
                summary.total.to_string(),
                summary.paid.to_string(),
                summary.outstanding.to_string(),
                summary.payment_status.to_string(),
                summary.order_status.to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Money;
    use crate::domain::order::{OrderId, OrderStatus, PaymentStatus};
    use rust_decimal_macros::dec;

    #[test]
    fn test_writes_header_and_rows() {
        let order = OrderId::generate();
        let mut out = Vec::new();
        LedgerWriter::new(&mut out)
            .write_summaries([LedgerSummary {
                order,
                total: Money::new(dec!(100.00)),
                paid: Money::new(dec!(40.00)),
                outstanding: Money::new(dec!(60.00)),
                payment_status: PaymentStatus::PartiallyPaid,
                order_status: OrderStatus::Ready,
            }])
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("order,total,paid,outstanding,payment_status,order_status")
        );
        assert_eq!(
            lines.next(),
            Some(format!("{order},100,40,60,partially_paid,ready").as_str())
        );
    }

    #[test]
    fn test_empty_input_still_has_header() {
        let mut out = Vec::new();
        LedgerWriter::new(&mut out).write_summaries([]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap().trim(),
            "order,total,paid,outstanding,payment_status,order_status"
        );
    }
}
