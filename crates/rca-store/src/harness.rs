use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use rca_core::{Sample, SampleFormat, Signature, Value, VarType, Variable};

/// Seeded generator of random samples over a signature, for exercising a
/// monitor without a system under test.
pub struct RandomHarness {
    variables: Vec<Variable>,
    rng: SmallRng,
    /// Inclusive bound on each time delta.
    pub max_delta: u64,
    /// Inclusive range for integer variables.
    pub int_range: (i64, i64),
}

impl RandomHarness {
    pub fn new(signature: &Signature, seed: u64) -> Self {
        Self {
            variables: signature.observed().cloned().collect(),
            rng: SmallRng::seed_from_u64(seed),
            max_delta: 3,
            int_range: (-5, 5),
        }
    }

    pub fn with_max_delta(mut self, max_delta: u64) -> Self {
        self.max_delta = max_delta;
        self
    }

    pub fn with_int_range(mut self, low: i64, high: i64) -> Self {
        self.int_range = (low.min(high), low.max(high));
        self
    }

    fn value(&mut self, ty: &VarType) -> Value {
        match ty {
            VarType::Bool => Value::Bool(self.rng.random_bool(0.5)),
            VarType::Int => Value::Int(self.rng.random_range(self.int_range.0..=self.int_range.1)),
            VarType::Enum(labels) if labels.is_empty() => Value::Int(0),
            VarType::Enum(labels) => Value::Int(self.rng.random_range(0..labels.len()) as i64),
        }
    }

    pub fn next_sample(&mut self) -> Sample {
        let mut sample = Sample::new(
            self.rng.random_range(0..=self.max_delta),
            self.rng.random_range(0..=self.max_delta),
        );
        let variables = std::mem::take(&mut self.variables);
        for var in &variables {
            let value = self.value(&var.ty);
            sample.values.insert(var.name.clone(), value);
        }
        self.variables = variables;
        sample
    }

    pub fn next_line(&mut self, format: &SampleFormat) -> String {
        self.next_sample().to_line(format)
    }
}
