use crate::error::Error;
use crate::pool::Exposure;

/// The disease side of a step: reports who is infectious and turns exposure
/// into new infections.
pub trait TransmissionHook {
    fn infectious(&self) -> &[bool];

    fn transmit(&mut self, exposure: &Exposure, beta: f64) -> Result<(), Error>;
}

/// Probability that a person with `exposure` is infected over a step of length `dt`.
pub fn infection_probability(exposure: f64, beta: f64, dt: f64) -> f64 {
    1.0 - (-beta * exposure * dt).exp()
}
