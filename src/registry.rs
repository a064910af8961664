//! In-process metric registry backed by the `prometheus` crate.
//!
//! The registry is constructed once at startup and shared by reference with
//! the request interceptor, the system sampler and the `/metrics` handler.
//! Every series is updated through atomics owned by the `prometheus` types,
//! so concurrent writers never contend on a registry-wide lock.

use prometheus::proto::MetricFamily;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::debug;

/// Content type of the text exposition format served on `/metrics`.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Initial capacity of the render buffer.
const RENDER_BUFFER_CAP: usize = 16 * 1024;

/// Errors raised while defining, updating or rendering metrics.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metric '{metric}' expects {expected} label values, got {got}")]
    LabelArity {
        metric: String,
        expected: usize,
        got: usize,
    },

    #[error("invalid buckets for '{metric}': {reason}")]
    InvalidBuckets { metric: String, reason: String },

    #[error("exposition output is not valid UTF-8")]
    NonUtf8Output,

    #[error(transparent)]
    Prometheus(#[from] prometheus::Error),
}

/// Exposition type of a defined family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

#[derive(Debug, Clone)]
struct FamilyDesc {
    help: String,
    kind: MetricKind,
}

/// Process-wide collection of named metrics.
#[derive(Clone, Default)]
pub struct MetricRegistry {
    inner: Registry,
    // Keyed by name so families render in name order.
    families: Arc<RwLock<BTreeMap<String, FamilyDesc>>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn remember(&self, name: &str, help: &str, kind: MetricKind) {
        let mut families = self.families.write().unwrap_or_else(|e| e.into_inner());
        families.insert(
            name.to_string(),
            FamilyDesc {
                help: help.to_string(),
                kind,
            },
        );
    }

    /// Defines a counter with a fixed, ordered set of label keys.
    pub fn define_counter(
        &self,
        name: &str,
        help: &str,
        label_keys: &[&str],
    ) -> Result<CounterHandle, MetricsError> {
        let vec = CounterVec::new(Opts::new(name, help), label_keys)?;
        self.inner.register(Box::new(vec.clone()))?;
        self.remember(name, help, MetricKind::Counter);
        debug!("Defined counter {} with labels {:?}", name, label_keys);

        Ok(CounterHandle {
            name: name.to_string(),
            label_count: label_keys.len(),
            vec,
        })
    }

    /// Defines an unlabeled gauge.
    pub fn define_gauge(&self, name: &str, help: &str) -> Result<GaugeHandle, MetricsError> {
        let gauge = Gauge::new(name, help)?;
        self.inner.register(Box::new(gauge.clone()))?;
        self.remember(name, help, MetricKind::Gauge);
        debug!("Defined gauge {}", name);

        Ok(GaugeHandle { gauge })
    }

    /// Defines a histogram. `buckets` must be non-empty, strictly ascending
    /// and positive; the `+Inf` bucket is implicit.
    pub fn define_histogram(
        &self,
        name: &str,
        help: &str,
        label_keys: &[&str],
        buckets: &[f64],
    ) -> Result<HistogramHandle, MetricsError> {
        check_buckets(buckets).map_err(|reason| MetricsError::InvalidBuckets {
            metric: name.to_string(),
            reason,
        })?;

        let opts = HistogramOpts::new(name, help).buckets(buckets.to_vec());
        let vec = HistogramVec::new(opts, label_keys)?;
        self.inner.register(Box::new(vec.clone()))?;
        self.remember(name, help, MetricKind::Histogram);
        debug!(
            "Defined histogram {} with labels {:?} and {} buckets",
            name,
            label_keys,
            buckets.len()
        );

        Ok(HistogramHandle {
            name: name.to_string(),
            label_count: label_keys.len(),
            vec,
        })
    }

    /// Renders every defined metric and every realized label tuple in the
    /// text exposition format. Families are sorted by name and series by
    /// label values, so the output is deterministic for a given state.
    ///
    /// A labeled family with no series yet is rendered as its `# HELP` and
    /// `# TYPE` lines only.
    pub fn render(&self) -> Result<String, MetricsError> {
        // Snapshot the definitions before gathering: every listed family is
        // already registered, so gather() sees all of its realized series.
        let defined = self
            .families
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let gathered = self.inner.gather();
        let mut by_name: HashMap<&str, &MetricFamily> =
            gathered.iter().map(|mf| (mf.get_name(), mf)).collect();

        let encoder = TextEncoder::new();
        let mut buffer = Vec::with_capacity(RENDER_BUFFER_CAP);
        for (name, desc) in &defined {
            match by_name.remove(name.as_str()) {
                Some(mf) => encoder.encode(std::slice::from_ref(mf), &mut buffer)?,
                None => {
                    let header = format!(
                        "# HELP {} {}\n# TYPE {} {}\n",
                        name,
                        escape_help(&desc.help),
                        name,
                        desc.kind.as_str()
                    );
                    buffer.extend_from_slice(header.as_bytes());
                }
            }
        }
        String::from_utf8(buffer).map_err(|_| MetricsError::NonUtf8Output)
    }
}

/// Escapes `\` and newlines in help text.
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Validates a bucket list before handing it to the histogram.
pub fn check_buckets(buckets: &[f64]) -> Result<(), String> {
    if buckets.is_empty() {
        return Err("bucket list is empty".into());
    }
    if let Some(b) = buckets.iter().find(|b| !b.is_finite() || **b <= 0.0) {
        return Err(format!("bucket bound {} is not a positive finite number", b));
    }
    if let Some(pair) = buckets.windows(2).find(|w| w[0] >= w[1]) {
        return Err(format!(
            "bucket bounds must be strictly ascending ({} >= {})",
            pair[0], pair[1]
        ));
    }
    Ok(())
}

fn check_arity(metric: &str, expected: usize, label_values: &[&str]) -> Result<(), MetricsError> {
    if label_values.len() != expected {
        return Err(MetricsError::LabelArity {
            metric: metric.to_string(),
            expected,
            got: label_values.len(),
        });
    }
    Ok(())
}

/// Handle to a labeled counter.
#[derive(Clone)]
pub struct CounterHandle {
    name: String,
    label_count: usize,
    vec: CounterVec,
}

impl CounterHandle {
    /// Increments the series for `label_values` by one, creating it on first use.
    pub fn increment(&self, label_values: &[&str]) -> Result<(), MetricsError> {
        check_arity(&self.name, self.label_count, label_values)?;
        self.vec.get_metric_with_label_values(label_values)?.inc();
        Ok(())
    }

    /// Current value of one series. Reading an unseen tuple realizes it at 0.
    pub fn get(&self, label_values: &[&str]) -> Result<f64, MetricsError> {
        check_arity(&self.name, self.label_count, label_values)?;
        Ok(self.vec.get_metric_with_label_values(label_values)?.get())
    }
}

/// Handle to an unlabeled gauge.
#[derive(Clone)]
pub struct GaugeHandle {
    gauge: Gauge,
}

impl GaugeHandle {
    pub fn set(&self, value: f64) {
        self.gauge.set(value);
    }

    pub fn get(&self) -> f64 {
        self.gauge.get()
    }
}

/// Handle to a labeled histogram with cumulative buckets.
#[derive(Clone)]
pub struct HistogramHandle {
    name: String,
    label_count: usize,
    vec: HistogramVec,
}

impl HistogramHandle {
    /// Records `value`: every bucket whose upper bound is >= `value` gains one,
    /// as do the total count and the running sum.
    pub fn observe(&self, label_values: &[&str], value: f64) -> Result<(), MetricsError> {
        check_arity(&self.name, self.label_count, label_values)?;
        self.vec
            .get_metric_with_label_values(label_values)?
            .observe(value);
        Ok(())
    }

    pub fn sample_count(&self, label_values: &[&str]) -> Result<u64, MetricsError> {
        check_arity(&self.name, self.label_count, label_values)?;
        Ok(self
            .vec
            .get_metric_with_label_values(label_values)?
            .get_sample_count())
    }

    pub fn sample_sum(&self, label_values: &[&str]) -> Result<f64, MetricsError> {
        check_arity(&self.name, self.label_count, label_values)?;
        Ok(self
            .vec
            .get_metric_with_label_values(label_values)?
            .get_sample_sum())
    }
}
