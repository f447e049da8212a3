/*!
Per-round metrics and the appearance of simulation result data.

A [RoundMetrics] row is recorded for every simulated round; a
[MetricsTable] renders the rows through its [`Display`] implementation,
either comma-separated or human-readable:

```
use fee_market_sim::prelude::*;

let group = SimulationBuilder::new()
    .share(1.0, UserFactory::patient())
    .constant_demand(100.0)
    .with_rounds(5)
    .build()
    .unwrap();

let output = group.run_all().unwrap().remove(0);
println!("{}", output.metrics_table(Format::CSV));
```
*/

use std::fmt::Display;

use crate::simulation::SimulationOutput;

/// Floating point precision of results data.
pub const FLOAT_PRECISION_DIGITS: usize = 6;

/// Per-round snapshot of the fee market. Fee and tip figures are in Gwei.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundMetrics {
    pub round: u64,
    /// Basefee in force this round.
    pub basefee: f64,
    /// Users that woke up this round.
    pub spawned_users: usize,
    /// Of those, how many decided to bid.
    pub decided_txs: usize,
    /// Transactions included in this round's block.
    pub included_txs: usize,
    /// Pending transactions withdrawn this round.
    pub cancelled_txs: usize,
    pub block_avg_tip: f64,
    pub block_avg_gas_price: f64,
    pub block_avg_waiting_time: f64,
    pub block_min_premium: f64,
    /// Pool size after the block was carved out.
    pub pool_length: usize,
    pub pool_avg_tip: f64,
}

/// Describes the appearance of a [MetricsTable] as given by its
/// [`Display`] implementation.
#[derive(Debug, Clone, Copy, Default)]
pub enum Format {
    /// Comma-separated, without extra whitespace.
    CSV,
    /// Human-readable.
    #[default]
    PrettyPrint,
}

impl SimulationOutput {
    /// The run's per-round metrics as a formattable table.
    pub fn metrics_table(&self, format: Format) -> MetricsTable {
        MetricsTable { rows: self.metrics.clone(), format }
    }
}

/// Formatted per-round metrics from a completed simulation. The table is
/// given by the struct's [`Display`] implementation, as specified by its
/// [`Format`].
#[derive(Debug, Clone)]
pub struct MetricsTable {
    rows: Vec<RoundMetrics>,
    format: Format,
}

impl MetricsTable {
    const SEPARATOR_VERTICAL: char = '|';
    const SEPARATOR_HORIZONTAL: char = '-';

    const TITLES: [&'static str; 12] = [
        "Round",
        "Basefee",
        "Users",
        "Decided Txs",
        "Included Txs",
        "Cancelled Txs",
        "Block Avg Tip",
        "Block Avg Gas Price",
        "Block Avg Waiting Time",
        "Block Min Premium",
        "Pool Length",
        "Pool Avg Tip",
    ];

    pub fn new(rows: Vec<RoundMetrics>) -> Self {
        MetricsTable { rows, format: Format::default() }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn set_format(&mut self, format: Format) {
        self.format = format;
    }

    fn values(row: &RoundMetrics) -> Vec<String> {
        let float = |x: f64| format!("{:.1$}", x, FLOAT_PRECISION_DIGITS);

        vec![
            row.round.to_string(),
            float(row.basefee),
            row.spawned_users.to_string(),
            row.decided_txs.to_string(),
            row.included_txs.to_string(),
            row.cancelled_txs.to_string(),
            float(row.block_avg_tip),
            float(row.block_avg_gas_price),
            float(row.block_avg_waiting_time),
            float(row.block_min_premium),
            row.pool_length.to_string(),
            float(row.pool_avg_tip),
        ]
    }
}

impl Display for MetricsTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.format {
            Format::CSV => {
                write!(f, "{}", Self::TITLES.join(","))?;

                for row in self.rows.iter() {
                    writeln!(f)?;
                    write!(f, "{}", Self::values(row).join(","))?;
                }
            }
            Format::PrettyPrint => {
                let mut text_widths: Vec<_> =
                    Self::TITLES.iter().map(|title| title.len()).collect();

                let rows: Vec<Vec<String>> =
                    self.rows.iter().map(Self::values).collect();
                for row in rows.iter() {
                    for (i, val) in row.iter().enumerate() {
                        text_widths[i] = text_widths[i].max(val.len());
                    }
                }

                for (i, title) in Self::TITLES.into_iter().enumerate() {
                    write!(
                        f,
                        " {:1$} {2}",
                        title,
                        text_widths[i],
                        Self::SEPARATOR_VERTICAL
                    )?;
                }
                writeln!(f)?;

                let total_width = text_widths.iter().map(|x| x + 3).sum();
                for _ in 0..total_width {
                    write!(f, "{}", Self::SEPARATOR_HORIZONTAL)?;
                }

                for row in rows.iter() {
                    writeln!(f)?;

                    for (i, val) in row.iter().enumerate() {
                        write!(
                            f,
                            " {:1$} {2}",
                            val,
                            text_widths[i],
                            Self::SEPARATOR_VERTICAL
                        )?;
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Format, MetricsTable, RoundMetrics};

    fn row(round: u64) -> RoundMetrics {
        RoundMetrics {
            round,
            basefee: 1.0,
            spawned_users: 10,
            decided_txs: 8,
            included_txs: 5,
            cancelled_txs: 0,
            block_avg_tip: 1.5,
            block_avg_gas_price: 2.5,
            block_avg_waiting_time: 0.4,
            block_min_premium: 1.0,
            pool_length: 3,
            pool_avg_tip: 1.0,
        }
    }

    #[test]
    fn csv_has_one_line_per_row_plus_headers() {
        let mut table = MetricsTable::new(vec![row(0), row(1)]);
        table.set_format(Format::CSV);

        let text = table.to_string();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Round,Basefee,"));
        assert!(lines[1].starts_with("0,1.000000,10,8,5,0,"));
        assert!(lines[2].starts_with("1,"));
    }

    #[test]
    fn pretty_print_pads_columns() {
        let table = MetricsTable::new(vec![row(0)]);
        let text = table.to_string();

        assert!(text.contains("Round"));
        assert!(text.contains('|'));
        assert!(text.contains('-'));
    }
}
