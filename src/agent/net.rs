use crate::error::Error;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A single hidden layer network with sigmoid hidden units and a linear
/// output layer, used as the Q-value approximator.
///
/// Weight matrices are stored row-major by source unit: `w1[i][j]` connects
/// input `i` to hidden unit `j`, and `w2[i][j]` connects hidden unit `i` to
/// output `j`.
#[derive(Clone, Debug)]
pub struct NeuralNetwork {
    /// The number of inputs.
    input_size: usize,
    /// The number of hidden units.
    hidden_size: usize,
    /// The number of outputs.
    output_size: usize,
    /// Gradient step size.
    learning_rate: f64,
    w1: Vec<Vec<f64>>,
    b1: Vec<f64>,
    w2: Vec<Vec<f64>>,
    b2: Vec<f64>,
}

/// The serializable weight state of a [NeuralNetwork].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkWeights {
    pub w1: Vec<Vec<f64>>,
    pub b1: Vec<f64>,
    pub w2: Vec<Vec<f64>>,
    pub b2: Vec<f64>,
}

impl NeuralNetwork {
    /// Creates a network with weights drawn uniformly from `[-1, 1)` and
    /// zeroed biases.
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        learning_rate: f64,
        rng: &mut impl Rng,
    ) -> Self {
        let mut layer = |rows: usize, cols: usize| -> Vec<Vec<f64>> {
            (0..rows)
                .map(|_| (0..cols).map(|_| rng.gen_range(-1.0..1.0)).collect())
                .collect()
        };
        let w1 = layer(input_size, hidden_size);
        let w2 = layer(hidden_size, output_size);
        Self {
            input_size,
            hidden_size,
            output_size,
            learning_rate,
            w1,
            b1: vec![0.0; hidden_size],
            w2,
            b2: vec![0.0; output_size],
        }
    }

    /// The number of output units.
    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// Runs the forward pass and returns the predicted Q-values.
    pub fn predict(&self, input: &[f64]) -> Vec<f64> {
        let (_, output) = self.forward(input);
        output
    }

    /// Computes the hidden activations and outputs for an input.
    fn forward(&self, input: &[f64]) -> (Vec<f64>, Vec<f64>) {
        debug_assert_eq!(input.len(), self.input_size);
        let hidden: Vec<f64> = (0..self.hidden_size)
            .map(|j| {
                let sum: f64 = input.iter().zip(&self.w1).map(|(x, row)| x * row[j]).sum();
                sigmoid(sum + self.b1[j])
            })
            .collect();
        let output = (0..self.output_size)
            .map(|j| {
                let sum: f64 = hidden.iter().zip(&self.w2).map(|(h, row)| h * row[j]).sum();
                sum + self.b2[j]
            })
            .collect();
        (hidden, output)
    }

    /// One stochastic gradient step pulling the outputs for `input` towards
    /// `target` under a squared error objective.
    pub fn train(&mut self, input: &[f64], target: &[f64]) {
        debug_assert_eq!(target.len(), self.output_size);
        let (hidden, output) = self.forward(input);

        let errors: Vec<f64> = target.iter().zip(&output).map(|(t, o)| t - o).collect();

        // Output layer first. The hidden error then accumulates against the
        // freshly updated output weights.
        let mut hidden_errors = vec![0.0; self.hidden_size];
        for j in 0..self.output_size {
            for i in 0..self.hidden_size {
                self.w2[i][j] += self.learning_rate * errors[j] * hidden[i];
                hidden_errors[i] += errors[j] * self.w2[i][j];
            }
            self.b2[j] += self.learning_rate * errors[j];
        }

        for i in 0..self.hidden_size {
            let grad = hidden_errors[i] * hidden[i] * (1.0 - hidden[i]);
            for (k, x) in input.iter().enumerate() {
                self.w1[k][i] += self.learning_rate * grad * x;
            }
            self.b1[i] += self.learning_rate * grad;
        }
    }

    /// Copies out the full weight state.
    pub fn weights(&self) -> NetworkWeights {
        NetworkWeights {
            w1: self.w1.clone(),
            b1: self.b1.clone(),
            w2: self.w2.clone(),
            b2: self.b2.clone(),
        }
    }

    /// Replaces the weight state. Dimensions are validated up front, so a
    /// mismatched structure leaves the live weights untouched.
    pub fn restore(&mut self, weights: NetworkWeights) -> Result<(), Error> {
        let valid = weights.w1.len() == self.input_size
            && weights.w1.iter().all(|row| row.len() == self.hidden_size)
            && weights.b1.len() == self.hidden_size
            && weights.w2.len() == self.hidden_size
            && weights.w2.iter().all(|row| row.len() == self.output_size)
            && weights.b2.len() == self.output_size;
        if !valid {
            return Err(Error::WeightShape {
                input: self.input_size,
                hidden: self.hidden_size,
                output: self.output_size,
            });
        }
        self.w1 = weights.w1;
        self.b1 = weights.b1;
        self.w2 = weights.w2;
        self.b2 = weights.b2;
        Ok(())
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn sigmoid_midpoint_and_saturation() {
        assert_approx_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(8.0) > 0.99);
        assert!(sigmoid(-8.0) < 0.01);
    }

    #[test]
    fn training_reduces_prediction_error() {
        let mut rng = StdRng::seed_from_u64(71);
        let mut net = NeuralNetwork::new(4, 14, 3, 0.05, &mut rng);
        let input = [0.5, -1.0, 2.0, 0.0];
        let target = [1.0, -1.0, 0.25];

        let error = |net: &NeuralNetwork| -> f64 {
            net.predict(&input)
                .iter()
                .zip(&target)
                .map(|(o, t)| (t - o).powi(2))
                .sum()
        };

        let before = error(&net);
        for _ in 0..300 {
            net.train(&input, &target);
        }
        let after = error(&net);
        assert!(after < before);
        assert!(after < 0.05);
    }

    #[test]
    fn weights_round_trip_bit_identically() {
        let mut rng = StdRng::seed_from_u64(72);
        let a = NeuralNetwork::new(4, 6, 3, 0.01, &mut rng);
        let mut b = NeuralNetwork::new(4, 6, 3, 0.01, &mut rng);
        b.restore(a.weights()).unwrap();
        let input = [0.1, 0.2, 0.3, 0.4];
        assert_eq!(a.predict(&input), b.predict(&input));
    }

    #[test]
    fn restore_validates_dimensions() {
        let mut rng = StdRng::seed_from_u64(73);
        let mut net = NeuralNetwork::new(4, 6, 3, 0.01, &mut rng);
        let before = net.predict(&[1.0; 4]);

        let mut weights = net.weights();
        weights.w2.pop();
        assert!(net.restore(weights).is_err());
        assert_eq!(net.predict(&[1.0; 4]), before);
    }
}
