// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use rand::SeedableRng;

use crate::balking::BalkingPolicy;
use crate::config::Config;
use crate::customer::{Customer, CustomerKind, CustomerRecord};
use crate::error::SimulationError;
use crate::event::{Event, EventType};
use crate::event_queue::EventQueue;
use crate::output::{Avg, KindResult, Output, SimulationResult, TimeAvg, TraceSample};
use crate::random::{Exponential, UniformSource};
use crate::user_config::{StopCondition, UserConfig};

/// Run a single M/M/1 simulation without warm-up and balking.
///
/// Parameters:
/// - `arrival_rate`: the rate of Poisson arrivals, lambda.
/// - `service_rate`: the rate of exponential service times, mu.
/// - `stop_condition`: when to stop the simulation.
/// - `seed`: seed of the pseudo-random number generator, if None then it
///   is drawn from the operating system entropy source.
pub fn run(
    arrival_rate: f64,
    service_rate: f64,
    stop_condition: StopCondition,
    seed: Option<u64>,
) -> Result<SimulationResult, SimulationError> {
    let seed = match seed {
        Some(seed) => seed,
        None => {
            let seed = rand::random::<u64>();
            log::debug!("using seed {} drawn from entropy", seed);
            seed
        }
    };
    let sim = Simulation::new(Config {
        seed,
        user_config: UserConfig::new(arrival_rate, service_rate, stop_condition),
    })?;
    Ok(sim.run()?.result)
}

pub struct Simulation {
    // configuration
    config: Config,
}

/// Metrics of the customers of a given kind.
#[derive(Default)]
struct KindMetrics {
    wait: Avg,
    sojourn: Avg,
    num_in_system: TimeAvg,
    queue_length: TimeAvg,
    // customers of this kind currently waiting, measured or not
    num_waiting: u64,
    customers_balked: u64,
}

impl KindMetrics {
    fn update(&mut self, now: f64, in_service: bool) {
        self.num_in_system
            .add(now, (self.num_waiting + in_service as u64) as f64);
        self.queue_length.add(now, self.num_waiting as f64);
    }

    fn enable(&mut self, now: f64) {
        self.num_in_system.enable(now);
        self.queue_length.enable(now);
    }

    fn finish(&mut self, now: f64) {
        self.num_in_system.finish(now);
        self.queue_length.finish(now);
    }

    fn result(&self, service_value: f64) -> KindResult {
        let customers_served = self.sojourn.num();
        let num_customers = customers_served + self.customers_balked;
        let (balking_probability, mean_cost) = if num_customers == 0 {
            (0.0, 0.0)
        } else {
            (
                self.customers_balked as f64 / num_customers as f64,
                (self.customers_balked as f64 * service_value + self.sojourn.sum())
                    / num_customers as f64,
            )
        };
        KindResult {
            customers_served,
            customers_balked: self.customers_balked,
            mean_wait_time: self.wait.avg().unwrap_or_default(),
            mean_system_time: self.sojourn.avg().unwrap_or_default(),
            mean_number_in_system: self.num_in_system.avg().unwrap_or_default(),
            mean_queue_length: self.queue_length.avg().unwrap_or_default(),
            balking_probability,
            mean_cost,
        }
    }
}

/// State of a single run, discarded when the run ends.
struct State<'a, U: UniformSource + ?Sized> {
    now: f64,
    warmup_period: f64,
    source: &'a mut U,
    rv_arrival: Exponential,
    rv_service: Exponential,
    balking: Option<BalkingPolicy>,
    events: EventQueue,

    // customers
    waiting: std::collections::VecDeque<Customer>,
    in_service: Option<Customer>,
    next_customer_id: u64,

    // metrics
    wait: Avg,
    service: Avg,
    sojourn: Avg,
    num_in_system: TimeAvg,
    queue_length: TimeAvg,
    busy: TimeAvg,
    selfish: KindMetrics,
    optimal: KindMetrics,
    customers_served: u64,
    customers_balked: u64,
    num_arrivals: u64,
    num_admitted: u64,
    num_balked: u64,
    num_departures: u64,
    num_events: u64,
    trace: Option<Vec<TraceSample>>,
    customers: Vec<CustomerRecord>,
}

impl<'a, U: UniformSource + ?Sized> State<'a, U> {
    fn new(conf: &UserConfig, source: &'a mut U) -> Self {
        Self {
            now: 0.0,
            warmup_period: conf.warmup_period,
            source,
            rv_arrival: Exponential::new(conf.arrival_rate),
            rv_service: Exponential::new(conf.service_rate),
            balking: conf
                .balking
                .as_ref()
                .map(|x| BalkingPolicy::new(x, conf.arrival_rate, conf.service_rate)),
            events: EventQueue::default(),
            waiting: std::collections::VecDeque::new(),
            in_service: None,
            next_customer_id: 0,
            wait: Avg::default(),
            service: Avg::default(),
            sojourn: Avg::default(),
            num_in_system: TimeAvg::default(),
            queue_length: TimeAvg::default(),
            busy: TimeAvg::default(),
            selfish: KindMetrics::default(),
            optimal: KindMetrics::default(),
            customers_served: 0,
            customers_balked: 0,
            num_arrivals: 0,
            num_admitted: 0,
            num_balked: 0,
            num_departures: 0,
            num_events: 0,
            trace: if conf.save_trace { Some(vec![]) } else { None },
            customers: vec![],
        }
    }

    fn num_in_system(&self) -> u64 {
        self.waiting.len() as u64 + self.in_service.is_some() as u64
    }

    fn kind_metrics(&mut self, kind: CustomerKind) -> Option<&mut KindMetrics> {
        match kind {
            CustomerKind::Basic => None,
            CustomerKind::Selfish => Some(&mut self.selfish),
            CustomerKind::Optimal => Some(&mut self.optimal),
        }
    }

    /// Start collecting time averages.
    fn enable(&mut self) {
        self.num_in_system.enable(self.now);
        self.queue_length.enable(self.now);
        self.busy.enable(self.now);
        self.selfish.enable(self.now);
        self.optimal.enable(self.now);
    }

    /// Close the time averages at the current time.
    fn finish(&mut self) {
        self.num_in_system.finish(self.now);
        self.queue_length.finish(self.now);
        self.busy.finish(self.now);
        self.selfish.finish(self.now);
        self.optimal.finish(self.now);
    }

    /// Record the system state after a change at the current time.
    fn update_metrics(&mut self) {
        let num_in_system = self.num_in_system();
        let queue_length = self.waiting.len() as u64;
        self.num_in_system.add(self.now, num_in_system as f64);
        self.queue_length.add(self.now, queue_length as f64);
        self.busy
            .add(self.now, if self.in_service.is_some() { 1.0 } else { 0.0 });
        let serving = self.in_service.as_ref().map(|x| x.kind);
        self.selfish
            .update(self.now, serving == Some(CustomerKind::Selfish));
        self.optimal
            .update(self.now, serving == Some(CustomerKind::Optimal));
        if let Some(trace) = &mut self.trace {
            trace.push(TraceSample {
                time: self.now,
                num_in_system,
                queue_length,
            });
        }
    }

    fn schedule_next_arrival(&mut self) {
        let time = self.now + self.rv_arrival.sample(&mut *self.source);
        self.events.push(Event::new(time, EventType::Arrival));
    }

    fn start_service(&mut self, mut customer: Customer) {
        assert!(
            self.in_service.is_none(),
            "customer {} entering a busy server",
            customer.id
        );
        let service_time = self.rv_service.sample(&mut *self.source);
        let end = customer.start_service(self.now, service_time);
        self.events.push(Event::new(end, EventType::Departure));
        self.in_service = Some(customer);
    }

    fn handle_arrival(&mut self) {
        self.num_arrivals += 1;
        let measured = self.now >= self.warmup_period;

        let kind = match &self.balking {
            Some(policy) => policy.draw_kind(&mut *self.source),
            None => CustomerKind::Basic,
        };
        let joins = match &self.balking {
            Some(policy) => policy.joins(kind, self.num_in_system()),
            None => true,
        };

        if joins {
            self.num_admitted += 1;
            let customer = Customer::new(self.next_customer_id, kind, self.now, measured);
            self.next_customer_id += 1;
            if self.in_service.is_none() {
                assert!(self.waiting.is_empty());
                self.start_service(customer);
            } else {
                if let Some(metrics) = self.kind_metrics(kind) {
                    metrics.num_waiting += 1;
                }
                self.waiting.push_back(customer);
            }
        } else {
            self.num_balked += 1;
            if measured {
                self.customers_balked += 1;
                if let Some(metrics) = self.kind_metrics(kind) {
                    metrics.customers_balked += 1;
                }
            }
        }

        self.schedule_next_arrival();
        self.update_metrics();
    }

    fn handle_departure(&mut self) {
        let customer = self
            .in_service
            .take()
            .unwrap_or_else(|| panic!("departure at {} with an idle server", self.now));
        self.num_departures += 1;

        if customer.measured {
            let record = customer.record();
            self.wait.add(record.wait());
            self.service.add(record.service_time);
            self.sojourn.add(record.sojourn());
            self.customers_served += 1;
            if let Some(metrics) = self.kind_metrics(record.kind) {
                metrics.wait.add(record.wait());
                metrics.sojourn.add(record.sojourn());
            }
            if self.trace.is_some() {
                self.customers.push(record);
            }
        }

        if let Some(next) = self.waiting.pop_front() {
            if let Some(metrics) = self.kind_metrics(next.kind) {
                metrics.num_waiting -= 1;
            }
            self.start_service(next);
        }

        self.update_metrics();
    }

    fn result(&self) -> Result<SimulationResult, SimulationError> {
        let elapsed_time = self.num_in_system.elapsed();
        if self.customers_served == 0 || elapsed_time <= 0.0 {
            return Err(SimulationError::DegenerateResult {
                elapsed: elapsed_time,
            });
        }

        let service_value = self.balking.as_ref().map_or(0.0, |x| x.service_value());
        let num_customers = (self.customers_balked + self.customers_served) as f64;

        Ok(SimulationResult {
            mean_wait_time: self.wait.avg().unwrap_or_default(),
            mean_number_in_system: self.num_in_system.avg().unwrap_or_default(),
            server_utilization: self.busy.avg().unwrap_or_default().clamp(0.0, 1.0),
            customers_served: self.customers_served,
            mean_queue_length: self.queue_length.avg().unwrap_or_default(),
            mean_service_time: self.service.avg().unwrap_or_default(),
            mean_system_time: self.sojourn.avg().unwrap_or_default(),
            customers_balked: self.customers_balked,
            balking_probability: self.customers_balked as f64 / num_customers,
            mean_cost: (self.customers_balked as f64 * service_value + self.sojourn.sum())
                / num_customers,
            elapsed_time,
            selfish: self.selfish.result(service_value),
            optimal: self.optimal.result(service_value),
            num_arrivals: self.num_arrivals,
            num_admitted: self.num_admitted,
            num_balked: self.num_balked,
            num_departures: self.num_departures,
            num_in_system_at_end: self.num_in_system(),
            num_events: self.num_events,
        })
    }
}

impl Simulation {
    /// Create a simulation, after checking that the configuration is valid.
    pub fn new(config: Config) -> Result<Self, SimulationError> {
        config.user_config.validate()?;
        Ok(Self { config })
    }

    /// Run a simulation with a pseudo-random number generator initialized
    /// with the configured seed.
    pub fn run(&self) -> Result<Output, SimulationError> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(self.config.seed);
        self.run_with(&mut rng)
    }

    /// Run a simulation drawing all the random values from `source`.
    pub fn run_with<U: UniformSource + ?Sized>(
        &self,
        source: &mut U,
    ) -> Result<Output, SimulationError> {
        let conf = &self.config.user_config;
        let mut state = State::new(conf, source);

        // push initial events
        if let StopCondition::MaxTime(max_time) = conf.stop_condition {
            state
                .events
                .push(Event::new(max_time, EventType::ExperimentEnd));
            for i in 1..100 {
                state.events.push(Event::new(
                    i as f64 * max_time / 100.0,
                    EventType::Progress(i),
                ));
            }
        }
        if conf.warmup_period > 0.0 {
            state
                .events
                .push(Event::new(conf.warmup_period, EventType::WarmupPeriodEnd));
        } else {
            state.enable();
        }
        state.update_metrics();
        state.schedule_next_arrival();

        // simulation loop
        let real_now = std::time::Instant::now();
        let mut last_time = 0.0;
        while let Some(event) = state.events.pop() {
            state.now = event.time();

            // make sure we never go back in time
            assert!(state.now >= last_time);
            last_time = state.now;

            // count the number of events
            state.num_events += 1;

            log::trace!("{}", event);

            // handle the current event
            match event.event_type {
                EventType::Arrival => state.handle_arrival(),
                EventType::Departure => {
                    state.handle_departure();
                    if let StopCondition::MaxCustomers(max_customers) = conf.stop_condition {
                        if state.customers_served >= max_customers {
                            log::debug!("{} customers served at {}", max_customers, state.now);
                            break;
                        }
                    }
                }
                EventType::WarmupPeriodEnd => {
                    log::debug!("{}", event);
                    state.enable();
                }
                EventType::ExperimentEnd => {
                    log::debug!("{}", event);
                    if let Some(trace) = &mut state.trace {
                        if let Some(last) = trace.last().cloned() {
                            trace.push(TraceSample {
                                time: state.now,
                                ..last
                            });
                        }
                    }
                    break;
                }
                EventType::Progress(percentage) => {
                    log::info!("seed {} completed {}%", self.config.seed, percentage);
                }
            }
        }
        state.finish();

        log::debug!(
            "seed {}: {} events, {} customers served, {} pending events discarded, execution time {} s",
            self.config.seed,
            state.num_events,
            state.customers_served,
            state.events.len(),
            real_now.elapsed().as_secs_f64()
        );

        let result = state.result()?;

        // return the simulation output
        Ok(Output {
            result,
            trace: state.trace.take().unwrap_or_default(),
            customers: std::mem::take(&mut state.customers),
            config_csv: self.config.to_csv(),
        })
    }
}
