//! Goal projections: retirement (SWR sizing) and savings (annuity solving).

mod retirement;
mod savings;

pub use retirement::{RetirementProgress, compute_retirement};
pub use savings::{SavingsProjection, compute_savings};
