// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use std::io::Write;

use average::Estimate;

use crate::customer::CustomerRecord;
use crate::utils::CsvFriend;

pub struct Avg {
    sum: kahan::KahanSum<f64>,
    num: u64,
}

impl Default for Avg {
    fn default() -> Self {
        Self {
            sum: kahan::KahanSum::new(),
            num: 0,
        }
    }
}

impl Avg {
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.num += 1;
    }
    pub fn sum(&self) -> f64 {
        self.sum.sum()
    }
    pub fn num(&self) -> u64 {
        self.num
    }
    /// Return None if no value was added.
    pub fn avg(&self) -> Option<f64> {
        if self.num == 0 {
            None
        } else {
            Some(self.sum.sum() / self.num as f64)
        }
    }
}

/// Time average of a piecewise-constant value.
/// The integral is not accumulated until `enable()` is called, but the value
/// is always tracked.
pub struct TimeAvg {
    last_update: Option<f64>,
    last_value: f64,
    sum_values: kahan::KahanSum<f64>,
    sum_time: kahan::KahanSum<f64>,
}

impl Default for TimeAvg {
    fn default() -> Self {
        Self {
            last_update: None,
            last_value: 0.0,
            sum_values: kahan::KahanSum::new(),
            sum_time: kahan::KahanSum::new(),
        }
    }
}

impl TimeAvg {
    /// Set the value to `value` at time `now`.
    pub fn add(&mut self, now: f64, value: f64) {
        if let Some(last_update) = self.last_update {
            assert!(now >= last_update, "time going backwards: {} < {}", now, last_update);
            let delta = now - last_update;
            self.sum_values += delta * self.last_value;
            self.sum_time += delta;
            self.last_update = Some(now);
        }
        self.last_value = value;
    }
    pub fn enable(&mut self, now: f64) {
        self.last_update = Some(now);
    }
    pub fn finish(&mut self, now: f64) {
        self.add(now, self.last_value);
    }
    /// Integral of the value over the enabled period.
    pub fn area(&self) -> f64 {
        self.sum_values.sum()
    }
    pub fn elapsed(&self) -> f64 {
        self.sum_time.sum()
    }
    /// Return None if no time has elapsed since `enable()`.
    pub fn avg(&self) -> Option<f64> {
        let elapsed = self.elapsed();
        if elapsed > 0.0 {
            Some(self.area() / elapsed)
        } else {
            None
        }
    }
}

/// State of the system right after an event.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TraceSample {
    pub time: f64,
    pub num_in_system: u64,
    pub queue_length: u64,
}

impl CsvFriend for TraceSample {
    fn header(&self) -> String {
        String::from("time,num_in_system,queue_length")
    }
    fn to_csv(&self) -> String {
        format!("{},{},{}", self.time, self.num_in_system, self.queue_length)
    }
}

/// Statistics of the customers of a given kind, collected after the warm-up
/// period. All zeros if no customer of that kind arrived.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct KindResult {
    pub customers_served: u64,
    pub customers_balked: u64,
    pub mean_wait_time: f64,
    pub mean_system_time: f64,
    /// Time average of the number of customers of this kind in the system.
    pub mean_number_in_system: f64,
    pub mean_queue_length: f64,
    pub balking_probability: f64,
    pub mean_cost: f64,
}

impl KindResult {
    fn header(prefix: &str) -> String {
        [
            "customers_served",
            "customers_balked",
            "mean_wait_time",
            "mean_system_time",
            "mean_number_in_system",
            "mean_queue_length",
            "balking_probability",
            "mean_cost",
        ]
        .iter()
        .map(|x| format!("{}_{}", prefix, x))
        .collect::<Vec<String>>()
        .join(",")
    }

    fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{}",
            self.customers_served,
            self.customers_balked,
            self.mean_wait_time,
            self.mean_system_time,
            self.mean_number_in_system,
            self.mean_queue_length,
            self.balking_probability,
            self.mean_cost
        )
    }
}

/// Statistics collected after the warm-up period.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SimulationResult {
    /// Average time from arrival to service start of served customers.
    pub mean_wait_time: f64,
    /// Time average of the number of customers in the system.
    pub mean_number_in_system: f64,
    /// Fraction of time the server was busy.
    pub server_utilization: f64,
    /// Number of customers that completed service.
    pub customers_served: u64,
    /// Time average of the number of customers waiting.
    pub mean_queue_length: f64,
    pub mean_service_time: f64,
    /// Average of wait plus service time of served customers.
    pub mean_system_time: f64,
    /// Number of customers arrived after the warm-up period that did not join.
    pub customers_balked: u64,
    /// Ratio of balked customers over balked plus served ones.
    pub balking_probability: f64,
    /// Average cost in time units: the value of service for balked
    /// customers, the time in system for served ones.
    pub mean_cost: f64,
    /// Duration of the measurement period.
    pub elapsed_time: f64,
    /// Selfish customers only.
    pub selfish: KindResult,
    /// Optimal customers only.
    pub optimal: KindResult,
    // The counters below cover the whole run, including the warm-up period.
    pub num_arrivals: u64,
    pub num_admitted: u64,
    pub num_balked: u64,
    pub num_departures: u64,
    pub num_in_system_at_end: u64,
    pub num_events: u64,
}

impl CsvFriend for SimulationResult {
    fn header(&self) -> String {
        format!(
            "mean_wait_time,mean_number_in_system,server_utilization,customers_served,\
mean_queue_length,mean_service_time,mean_system_time,customers_balked,\
balking_probability,mean_cost,elapsed_time,{},{},num_arrivals,num_admitted,\
num_balked,num_departures,num_in_system_at_end,num_events",
            KindResult::header("selfish"),
            KindResult::header("optimal")
        )
    }
    fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.mean_wait_time,
            self.mean_number_in_system,
            self.server_utilization,
            self.customers_served,
            self.mean_queue_length,
            self.mean_service_time,
            self.mean_system_time,
            self.customers_balked,
            self.balking_probability,
            self.mean_cost,
            self.elapsed_time,
            self.selfish.to_csv(),
            self.optimal.to_csv(),
            self.num_arrivals,
            self.num_admitted,
            self.num_balked,
            self.num_departures,
            self.num_in_system_at_end,
            self.num_events
        )
    }
}

/// Everything produced by a single simulation run.
#[derive(Debug, Clone)]
pub struct Output {
    pub result: SimulationResult,
    /// Number in system over time, empty unless the trace is enabled.
    pub trace: Vec<TraceSample>,
    /// Customers served after warm-up, empty unless the trace is enabled.
    pub customers: Vec<CustomerRecord>,
    pub config_csv: String,
}

fn write_rows<T: CsvFriend>(
    file: &mut std::fs::File,
    prefix: &str,
    rows: &[T],
) -> anyhow::Result<()> {
    for row in rows {
        writeln!(file, "{}{}", prefix, row.to_csv())?;
    }
    Ok(())
}

/// Save all the outputs to files.
///
/// Parameters:
/// - `outputs`: the outputs of the simulations, must not be empty.
/// - `output_path`: directory prefix of the files, with trailing slash.
/// - `append`: append to existing files, the header is written only to empty ones.
/// - `config_csv_header`: header of the configuration fields.
/// - `additional_header`, `additional_fields`: user-defined columns.
pub fn save_outputs(
    outputs: &[Output],
    output_path: &str,
    append: bool,
    config_csv_header: &str,
    additional_header: &str,
    additional_fields: &str,
) -> anyhow::Result<()> {
    let first = outputs
        .first()
        .ok_or_else(|| anyhow::anyhow!("no simulation output to save"))?;

    let header_comma = if additional_header.is_empty() {
        ""
    } else {
        ","
    };
    let header_prefix = format!("{}{}{},", additional_header, header_comma, config_csv_header);

    let mut scalar_file = crate::utils::open_output_file(
        output_path,
        "scalar.csv",
        append,
        format!("{}{}", header_prefix, first.result.header()).as_str(),
    )?;

    let mut trace_file = match outputs.iter().find_map(|x| x.trace.first()) {
        Some(sample) => Some(crate::utils::open_output_file(
            output_path,
            "trace.csv",
            append,
            format!("{}{}", header_prefix, sample.header()).as_str(),
        )?),
        None => None,
    };
    let mut customers_file = match outputs.iter().find_map(|x| x.customers.first()) {
        Some(record) => Some(crate::utils::open_output_file(
            output_path,
            "customers.csv",
            append,
            format!("{}{}", header_prefix, record.header()).as_str(),
        )?),
        None => None,
    };

    for output in outputs {
        let prefix = format!(
            "{}{}{},",
            additional_fields, header_comma, output.config_csv
        );
        writeln!(&mut scalar_file, "{}{}", prefix, output.result.to_csv())?;
        if let Some(trace_file) = &mut trace_file {
            write_rows(trace_file, &prefix, &output.trace)?;
        }
        if let Some(customers_file) = &mut customers_file {
            write_rows(customers_file, &prefix, &output.customers)?;
        }
    }

    Ok(())
}

/// Mean and standard error of the main metrics across independent runs.
pub struct Summary {
    metrics: Vec<(&'static str, average::MeanWithError)>,
}

impl Summary {
    pub fn new(outputs: &[Output]) -> Self {
        let getters: [(&'static str, fn(&SimulationResult) -> f64); 6] = [
            ("mean_wait_time", |x: &SimulationResult| x.mean_wait_time),
            ("mean_system_time", |x: &SimulationResult| x.mean_system_time),
            ("mean_number_in_system", |x: &SimulationResult| x.mean_number_in_system),
            ("mean_queue_length", |x: &SimulationResult| x.mean_queue_length),
            ("server_utilization", |x: &SimulationResult| x.server_utilization),
            ("balking_probability", |x: &SimulationResult| x.balking_probability),
        ];
        let metrics = getters
            .iter()
            .map(|(name, getter)| {
                let mut value = average::MeanWithError::new();
                for output in outputs {
                    value.add(getter(&output.result));
                }
                (*name, value)
            })
            .collect();
        Self { metrics }
    }

    /// Return the mean and standard error of a metric, if known.
    pub fn get(&self, name: &str) -> Option<(f64, f64)> {
        self.metrics
            .iter()
            .find(|(metric, _)| *metric == name)
            .map(|(_, value)| (value.mean(), value.error()))
    }

    pub fn len(&self) -> u64 {
        self.metrics.first().map_or(0, |(_, value)| value.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (name, value) in &self.metrics {
            writeln!(f, "{:<24}{:.4} ± {:.4}", name, value.mean(), value.error())?;
        }
        Ok(())
    }
}
