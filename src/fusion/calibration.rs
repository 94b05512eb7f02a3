use crate::scoring::RawScore;

/// Keeps `logit` finite at the edges of `[0, 1]`.
const PROBABILITY_EPSILON: f64 = 1e-7;

pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

pub fn logit(p: f64) -> f64 {
    let p = p.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
    (p / (1.0 - p)).ln()
}

/// `softmax([real/T, fake/T])[fake]`, computed without overflow.
pub fn two_class_softmax(real: f64, fake: f64, temperature: f64) -> f64 {
    let a = real / temperature;
    let b = fake / temperature;
    let m = a.max(b);
    let ea = (a - m).exp();
    let eb = (b - m).exp();
    eb / (ea + eb)
}

/// Turns a backend's raw output into a probability that the sample is synthetic.
///
/// Logits are always softmaxed (T defaults to 1). Probabilities pass through untouched
/// unless a temperature is set, in which case they are rescaled via `sigmoid(logit(p)/T)`.
/// Returns `None` for non-finite input, out-of-range probabilities, or `T <= 0`.
pub fn calibrate(raw: RawScore, temperature: Option<f64>) -> Option<f64> {
    if let Some(t) = temperature {
        if !(t.is_finite() && t > 0.0) {
            return None;
        }
    }

    let p = match raw {
        RawScore::Probability { value } => {
            if !(0.0..=1.0).contains(&value) {
                return None;
            }
            match temperature {
                Some(t) => sigmoid(logit(value) / t),
                None => value,
            }
        }
        RawScore::Logits { real, fake } => {
            if !(real.is_finite() && fake.is_finite()) {
                return None;
            }
            two_class_softmax(real, fake, temperature.unwrap_or(1.0))
        }
    };

    p.is_finite().then_some(p)
}
