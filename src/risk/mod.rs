//! Risk fusion and action decision.

mod engine;

pub use engine::{
    anomaly_score, fuse, Action, ConstantTrust, RiskDecision, RiskEngine, RiskResult, TrustProvider,
    ANOMALY_WEIGHT,
};
