use crate::sampler::{Sampler, TokenLogit};

/// Divides every logit by a temperature.
///
/// Values above 1.0 flatten the distribution, values below sharpen it.
pub struct TemperatureSampler {
    temperature: f32,
}

impl TemperatureSampler {
    /// Non-positive temperatures are clamped to a tiny positive value.
    pub fn new(temperature: f32) -> Self {
        Self {
            temperature: if temperature <= 0.0 { 1e-7 } else { temperature },
        }
    }
}

impl Sampler for TemperatureSampler {
    fn name(&self) -> &str {
        "temperature"
    }

    fn apply(&mut self, logits: &mut Vec<TokenLogit>) {
        for token in logits.iter_mut() {
            token.logit /= self.temperature;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scales_logits() {
        let mut logits = vec![
            TokenLogit { token_id: 0, logit: 1.0 },
            TokenLogit { token_id: 1, logit: -2.0 },
        ];
        TemperatureSampler::new(0.5).apply(&mut logits);
        assert_relative_eq!(logits[0].logit, 2.0);
        assert_relative_eq!(logits[1].logit, -4.0);
    }
}
